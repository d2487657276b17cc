use std::collections::BTreeMap;

use daedal_core::{DaedalError, DaedalResult, NodeId, PartitionId};
use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::registry::NodeTypeDef;

/// Typed collection of sibling Nodes. Every node under a partition has the
/// partition's declared type. NodeIds grow monotonically and are never
/// reused within the Document's lifetime, so stale cross-references fail
/// lookup instead of silently resolving to a newer node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Partition {
    id: PartitionId,
    type_name: String,
    nodes: BTreeMap<NodeId, Node>,
    next_node: u32,
}

impl Partition {
    pub(crate) fn new(id: PartitionId, type_name: String) -> Self {
        Self {
            id,
            type_name,
            nodes: BTreeMap::new(),
            next_node: 1,
        }
    }

    /// Rebuild a partition from persisted state (persistence layer use).
    pub fn restore(
        id: PartitionId,
        type_name: String,
        nodes: Vec<Node>,
        next_node: u32,
    ) -> DaedalResult<Self> {
        if let Some(max) = nodes.iter().map(|node| node.id().0).max() {
            if next_node <= max {
                return Err(DaedalError::storage(format!(
                    "partition {id}: next node id {next_node} not past max node id {max}"
                )));
            }
        }
        Ok(Self {
            id,
            type_name,
            nodes: nodes.into_iter().map(|node| (node.id(), node)).collect(),
            next_node,
        })
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn next_node(&self) -> u32 {
        self.next_node
    }

    /// Re-insert a node snapshot under its original id (transaction replay).
    /// The id counter is left alone so the id is still never handed out again.
    pub(crate) fn reinsert(&mut self, node: Node) {
        self.nodes.insert(node.id(), node);
    }

    pub(crate) fn ensure_next_past(&mut self, id: NodeId) {
        self.next_node = self.next_node.max(id.0 + 1);
    }

    pub(crate) fn take(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Nodes in ascending id order, which is creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

/// Generate a display name unique among the partition's current nodes, in
/// the "Base", "Base (1)", "Base (2)" progression.
pub fn unique_node_name(partition: &Partition, def: &NodeTypeDef, base: &str) -> String {
    let taken: Vec<&str> = partition
        .nodes()
        .filter_map(|node| node.display_name(def))
        .collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    let mut index = 1usize;
    loop {
        let candidate = format!("{base} ({index})");
        if !taken.iter().any(|name| *name == candidate) {
            return candidate;
        }
        index += 1;
    }
}
