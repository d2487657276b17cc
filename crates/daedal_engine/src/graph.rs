use std::collections::{BTreeMap, BTreeSet};

use daedal_core::{DaedalError, DaedalResult, FuncId, ParamRef};
use daedal_model::Document;

/// Directed graph over a set of Tree-Function instances: edge A -> B exists
/// when an output Parameter of A is an input Parameter of B, labeled with
/// that Parameter so cycle reports can name the offending chain.
pub struct DependencyGraph {
    members: BTreeSet<FuncId>,
    successors: BTreeMap<FuncId, Vec<(FuncId, ParamRef)>>,
    order_keys: BTreeMap<FuncId, (Option<ParamRef>, FuncId)>,
}

impl DependencyGraph {
    pub fn build(doc: &Document, members: &BTreeSet<FuncId>) -> DaedalResult<Self> {
        let mut writers: BTreeMap<ParamRef, FuncId> = BTreeMap::new();
        for id in members {
            let instance = doc.instance(*id)?;
            for output in &instance.outputs {
                writers.insert(*output, *id);
            }
        }
        let mut successors: BTreeMap<FuncId, Vec<(FuncId, ParamRef)>> =
            members.iter().map(|id| (*id, Vec::new())).collect();
        let mut order_keys = BTreeMap::new();
        for id in members {
            let instance = doc.instance(*id)?;
            order_keys.insert(*id, instance.order_key());
            // A function reading its own output is a self-loop and must be
            // reported as a cycle like any other.
            for input in &instance.inputs {
                if let Some(writer) = writers.get(input) {
                    successors.entry(*writer).or_default().push((*id, *input));
                }
            }
        }
        Ok(Self {
            members: members.clone(),
            successors,
            order_keys,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Fail `CyclicDependency` if the graph contains a directed cycle,
    /// naming the parameter chain that closes it. Diamonds are fine.
    pub fn check_cycles(&self) -> DaedalResult<()> {
        enum Frame {
            Enter { func: FuncId, via: Option<ParamRef> },
            Exit,
        }
        let mut visited: BTreeSet<FuncId> = BTreeSet::new();
        let mut on_path: BTreeSet<FuncId> = BTreeSet::new();
        let mut path: Vec<(FuncId, Option<ParamRef>)> = Vec::new();

        for root in &self.members {
            if visited.contains(root) {
                continue;
            }
            let mut stack = vec![Frame::Enter {
                func: *root,
                via: None,
            }];
            while let Some(frame) = stack.pop() {
                match frame {
                    Frame::Enter { func, via } => {
                        if on_path.contains(&func) {
                            let start = path
                                .iter()
                                .position(|(entry, _)| *entry == func)
                                .unwrap_or(0);
                            let mut chain: Vec<ParamRef> = path[start..]
                                .iter()
                                .filter_map(|(_, via)| *via)
                                .collect();
                            if let Some(via) = via {
                                chain.push(via);
                            }
                            return Err(DaedalError::cyclic(chain));
                        }
                        if !visited.insert(func) {
                            continue;
                        }
                        on_path.insert(func);
                        path.push((func, via));
                        stack.push(Frame::Exit);
                        if let Some(successors) = self.successors.get(&func) {
                            for (next, via) in successors.iter().rev() {
                                stack.push(Frame::Enter {
                                    func: *next,
                                    via: Some(*via),
                                });
                            }
                        }
                    }
                    Frame::Exit => {
                        if let Some((func, _)) = path.pop() {
                            on_path.remove(&func);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Deterministic topological order: dependencies first, ties broken by
    /// ascending declaration order (smallest output reference, then instance
    /// id). Assumes `check_cycles` has passed.
    pub fn topo_order(&self) -> Vec<FuncId> {
        let mut indegree: BTreeMap<FuncId, usize> =
            self.members.iter().map(|id| (*id, 0)).collect();
        for successors in self.successors.values() {
            for (next, _) in successors {
                if let Some(count) = indegree.get_mut(next) {
                    *count += 1;
                }
            }
        }
        let mut ready: BTreeSet<((Option<ParamRef>, FuncId), FuncId)> = indegree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| (self.order_keys[id], *id))
            .collect();
        let mut order = Vec::with_capacity(self.members.len());
        while let Some(entry) = ready.iter().next().copied() {
            ready.remove(&entry);
            let (_, func) = entry;
            order.push(func);
            if let Some(successors) = self.successors.get(&func) {
                for (next, _) in successors {
                    if let Some(count) = indegree.get_mut(next) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert((self.order_keys[next], *next));
                        }
                    }
                }
            }
        }
        order
    }
}
