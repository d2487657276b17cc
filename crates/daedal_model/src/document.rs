use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use daedal_core::{
    DaedalError, DaedalResult, FuncId, NodeId, ParamRef, ParamValue, PartitionId,
};
use log::debug;

use crate::function::{FuncState, FunctionSignature, TreeFunctionInstance};
use crate::node::Node;
use crate::param::Parameter;
use crate::partition::Partition;
use crate::registry::NodeTypeRegistry;
use crate::transaction::{TransactionEngine, TxOp};

/// Version of the persisted document format produced by this build. Loads of
/// older stamps go through the conversion chain; newer stamps are rejected.
pub const CURRENT_FORMAT_VERSION: u32 = 3;

/// Root container of the data model: Partitions, the Tree-Function instance
/// table, the schema-version stamps, and the transaction engine.
///
/// A Document is exclusively owned by one logical thread. Every structural
/// mutation must happen between `begin_transaction` and `commit_transaction`;
/// a rollback restores parameter values, validity flags, function states, and
/// structure exactly.
#[derive(Debug)]
pub struct Document {
    registry: Arc<NodeTypeRegistry>,
    partitions: BTreeMap<PartitionId, Partition>,
    next_partition: u32,
    functions: BTreeMap<FuncId, TreeFunctionInstance>,
    next_func: u32,
    app_version: u32,
    tx: TransactionEngine,
}

impl Document {
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self {
            registry,
            partitions: BTreeMap::new(),
            next_partition: 1,
            functions: BTreeMap::new(),
            next_func: 1,
            app_version: 0,
            tx: TransactionEngine::new(),
        }
    }

    /// Rebuild a Document from persisted state. Used by the persistence
    /// layer after the conversion chain has normalized the raw records.
    pub fn restore(
        registry: Arc<NodeTypeRegistry>,
        partitions: Vec<Partition>,
        next_partition: u32,
        functions: Vec<TreeFunctionInstance>,
        next_func: u32,
        app_version: u32,
    ) -> DaedalResult<Self> {
        let mut partition_table = BTreeMap::new();
        for partition in partitions {
            let def = registry.require(partition.type_name())?;
            for node in partition.nodes() {
                for slot in &def.slots {
                    match node.param(slot.slot) {
                        Some(param) if param.kind() == slot.kind => {}
                        Some(param) => {
                            return Err(DaedalError::storage(format!(
                                "node {}:{} slot {}: stored kind {:?} disagrees with schema {:?}",
                                partition.id(),
                                node.id(),
                                slot.slot,
                                param.kind(),
                                slot.kind
                            )));
                        }
                        None => {
                            return Err(DaedalError::storage(format!(
                                "node {}:{} misses declared slot {}",
                                partition.id(),
                                node.id(),
                                slot.slot
                            )));
                        }
                    }
                }
            }
            if next_partition <= partition.id().0 {
                return Err(DaedalError::storage(format!(
                    "partition counter {next_partition} not past partition id {}",
                    partition.id()
                )));
            }
            if partition_table.insert(partition.id(), partition).is_some() {
                return Err(DaedalError::storage("duplicate partition id in storage"));
            }
        }
        let mut function_table = BTreeMap::new();
        for instance in functions {
            if next_func <= instance.id.0 {
                return Err(DaedalError::storage(format!(
                    "function counter {next_func} not past instance id {}",
                    instance.id
                )));
            }
            if function_table.insert(instance.id, instance).is_some() {
                return Err(DaedalError::storage("duplicate function id in storage"));
            }
        }
        Ok(Self {
            registry,
            partitions: partition_table,
            next_partition,
            functions: function_table,
            next_func,
            app_version,
            tx: TransactionEngine::new(),
        })
    }

    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    pub fn format_version(&self) -> u32 {
        CURRENT_FORMAT_VERSION
    }

    pub fn app_version(&self) -> u32 {
        self.app_version
    }

    pub fn set_app_version(&mut self, version: u32) {
        self.app_version = version;
    }

    pub fn next_partition_id(&self) -> u32 {
        self.next_partition
    }

    pub fn next_func_id(&self) -> u32 {
        self.next_func
    }

    // ── Transactions ────────────────────────────────────────────────────

    pub fn begin_transaction(&mut self, name: &str) -> DaedalResult<()> {
        debug!("doc: begin transaction '{name}'");
        self.tx.begin(name)
    }

    pub fn commit_transaction(&mut self) -> DaedalResult<()> {
        debug!("doc: commit transaction");
        self.tx.commit()
    }

    pub fn rollback_transaction(&mut self) -> DaedalResult<()> {
        let tx = self
            .tx
            .take_open()
            .ok_or_else(|| DaedalError::validation("rollback without an open transaction"))?;
        debug!("doc: rollback transaction '{}' ({} ops)", tx.name, tx.ops.len());
        for op in tx.ops.iter().rev() {
            self.apply_inverse(op);
        }
        Ok(())
    }

    pub fn transaction_open(&self) -> bool {
        self.tx.is_open()
    }

    /// Run `f` inside its own transaction: commit on success, roll back on
    /// error.
    pub fn with_transaction<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> DaedalResult<T>,
    ) -> DaedalResult<T> {
        self.begin_transaction(name)?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(err) => {
                self.rollback_transaction()?;
                Err(err)
            }
        }
    }

    pub fn undo(&mut self) -> DaedalResult<()> {
        if self.tx.is_open() {
            return Err(DaedalError::validation("undo with a transaction open"));
        }
        let tx = self
            .tx
            .pop_undo()
            .ok_or_else(|| DaedalError::validation("nothing to undo"))?;
        debug!("doc: undo '{}'", tx.name);
        for op in tx.ops.iter().rev() {
            self.apply_inverse(op);
        }
        self.tx.push_redo(tx);
        Ok(())
    }

    pub fn redo(&mut self) -> DaedalResult<()> {
        if self.tx.is_open() {
            return Err(DaedalError::validation("redo with a transaction open"));
        }
        let tx = self
            .tx
            .pop_redo()
            .ok_or_else(|| DaedalError::validation("nothing to redo"))?;
        debug!("doc: redo '{}'", tx.name);
        for op in &tx.ops {
            self.apply_forward(op);
        }
        self.tx.push_undo(tx);
        Ok(())
    }

    pub fn undo_depth(&self) -> usize {
        self.tx.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.tx.redo_depth()
    }

    // ── Structure ───────────────────────────────────────────────────────

    pub fn add_partition(&mut self, type_name: &str) -> DaedalResult<PartitionId> {
        self.require_transaction()?;
        self.registry.require(type_name)?;
        let id = PartitionId(self.next_partition);
        self.record_and_apply(TxOp::AddPartition {
            id,
            type_name: type_name.to_string(),
        })?;
        Ok(id)
    }

    pub fn partition(&self, id: PartitionId) -> DaedalResult<&Partition> {
        self.partitions
            .get(&id)
            .ok_or_else(|| DaedalError::not_found(format!("partition {id}")))
    }

    /// Partitions in registration order.
    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.values()
    }

    pub fn find_partition(&self, type_name: &str) -> Option<PartitionId> {
        self.partitions
            .values()
            .find(|partition| partition.type_name() == type_name)
            .map(|partition| partition.id())
    }

    pub fn add_node(&mut self, partition: PartitionId) -> DaedalResult<NodeId> {
        self.require_transaction()?;
        let registry = Arc::clone(&self.registry);
        let target = self.partition(partition)?;
        let def = registry.require(target.type_name())?;
        let id = NodeId(target.next_node());
        let node = Node::instantiate(id, def);
        self.record_and_apply(TxOp::AddNode {
            partition,
            node,
        })?;
        Ok(id)
    }

    /// Add a node and link it as the last child of `parent`.
    pub fn add_node_under(
        &mut self,
        partition: PartitionId,
        parent: NodeId,
    ) -> DaedalResult<NodeId> {
        self.require_transaction()?;
        if self.partition(partition)?.node(parent).is_none() {
            return Err(DaedalError::not_found(format!(
                "parent node {partition}:{parent}"
            )));
        }
        self.guarded(|doc| {
            let child = doc.add_node(partition)?;
            doc.record_and_apply(TxOp::LinkChild {
                partition,
                parent,
                child,
            })?;
            Ok(child)
        })
    }

    pub fn node(&self, partition: PartitionId, node: NodeId) -> DaedalResult<&Node> {
        self.partition(partition)?
            .node(node)
            .ok_or_else(|| DaedalError::not_found(format!("node {partition}:{node}")))
    }

    /// Remove a node and its subtree. Every Tree-Function instance whose
    /// inputs or outputs reference a removed node is removed with it, and
    /// everything downstream of the removed outputs is invalidated.
    pub fn remove_node(&mut self, partition: PartitionId, node: NodeId) -> DaedalResult<()> {
        self.require_transaction()?;
        self.node(partition, node)?;
        self.guarded(|doc| {
            let subtree = doc.collect_subtree(partition, node)?;

            let doomed: Vec<FuncId> = doc
                .functions
                .values()
                .filter(|instance| {
                    subtree
                        .iter()
                        .any(|id| instance.touches_node(partition, *id))
                })
                .map(|instance| instance.id)
                .collect();

            let removed: BTreeSet<NodeId> = subtree.iter().copied().collect();
            let mut seeds: Vec<ParamRef> = Vec::new();
            for func in &doomed {
                let instance = doc.instance(*func)?.clone();
                for output in &instance.outputs {
                    if !(output.partition == partition && removed.contains(&output.node)) {
                        seeds.push(*output);
                    }
                }
                doc.record_and_apply(TxOp::RemoveFunc { instance })?;
            }

            // Children first, so reversal rebuilds parents before children.
            for id in subtree.iter().rev() {
                let parent = doc.parent_of(partition, *id);
                let snapshot = doc
                    .partition(partition)?
                    .node(*id)
                    .cloned()
                    .ok_or_else(|| DaedalError::not_found(format!("node {partition}:{id}")))?;
                doc.record_and_apply(TxOp::RemoveNode {
                    partition,
                    parent,
                    node: snapshot,
                })?;
            }

            seeds.sort();
            seeds.dedup();
            debug!(
                "doc: removed node {partition}:{node} ({} nodes, {} functions cascaded)",
                removed.len(),
                doomed.len()
            );
            for seed in seeds {
                doc.invalidate_if_present(seed)?;
                doc.propagate_from(seed)?;
            }
            Ok(())
        })
    }

    // ── Parameters ──────────────────────────────────────────────────────

    pub fn param(&self, at: ParamRef) -> DaedalResult<&Parameter> {
        self.node(at.partition, at.node)?
            .param(at.slot)
            .ok_or_else(|| DaedalError::not_found(format!("parameter {at}")))
    }

    pub fn value(&self, at: ParamRef) -> DaedalResult<&ParamValue> {
        Ok(self.param(at)?.value())
    }

    pub fn is_valid(&self, at: ParamRef) -> DaedalResult<bool> {
        Ok(self.param(at)?.is_valid())
    }

    /// Assign a Parameter and eagerly walk the dependency graph forward,
    /// marking every reachable Tree-Function instance pending and every
    /// output parameter along the way invalid, to a fixed point. The target
    /// itself becomes valid: its new payload is the fresh source of truth.
    pub fn set_value(&mut self, at: ParamRef, value: ParamValue) -> DaedalResult<()> {
        self.require_transaction()?;
        self.guarded(|doc| {
            let param = doc.param(at)?;
            if value.kind() != param.kind() {
                return Err(DaedalError::kind_mismatch(param.kind(), value.kind(), at));
            }
            let prev = param.value().clone();
            let prev_valid = param.is_valid();
            doc.record_and_apply(TxOp::SetValue {
                at,
                prev,
                prev_valid,
                next: value,
                next_valid: true,
            })?;
            doc.propagate_from(at)
        })
    }

    /// Explicitly mark a Parameter stale and walk the dependency graph
    /// forward from it, re-pending every reachable instance.
    pub fn invalidate(&mut self, at: ParamRef) -> DaedalResult<()> {
        self.require_transaction()?;
        self.param(at)?;
        self.guarded(|doc| {
            doc.invalidate_if_present(at)?;
            doc.propagate_from(at)
        })
    }

    /// Raw output write used by the execution engine when committing a
    /// function's results: kind-checked and recorded, but with no downstream
    /// propagation (dependents are scheduled by the engine itself).
    pub fn write_output(&mut self, at: ParamRef, value: ParamValue) -> DaedalResult<()> {
        self.require_transaction()?;
        let param = self.param(at)?;
        if value.kind() != param.kind() {
            return Err(DaedalError::kind_mismatch(param.kind(), value.kind(), at));
        }
        let prev = param.value().clone();
        let prev_valid = param.is_valid();
        self.record_and_apply(TxOp::SetValue {
            at,
            prev,
            prev_valid,
            next: value,
            next_valid: true,
        })
    }

    // ── Tree-Function instances ─────────────────────────────────────────

    /// Bind a registered function to concrete parameter references. The
    /// wiring is validated against the signature here, at bind time; a
    /// mismatch never reaches execution. The new instance starts pending and
    /// its outputs (plus everything downstream) are invalidated eagerly.
    pub fn bind_function(
        &mut self,
        signature: &FunctionSignature,
        inputs: Vec<ParamRef>,
        outputs: Vec<ParamRef>,
        args: Vec<u8>,
    ) -> DaedalResult<FuncId> {
        self.require_transaction()?;
        if inputs.len() != signature.inputs.len() {
            return Err(DaedalError::validation(format!(
                "function '{}' expects {} inputs, got {}",
                signature.name,
                signature.inputs.len(),
                inputs.len()
            )));
        }
        if outputs.len() != signature.outputs.len() {
            return Err(DaedalError::validation(format!(
                "function '{}' expects {} outputs, got {}",
                signature.name,
                signature.outputs.len(),
                outputs.len()
            )));
        }
        for (at, expected) in inputs.iter().zip(&signature.inputs) {
            let param = self.param(*at)?;
            if param.kind() != *expected {
                return Err(DaedalError::kind_mismatch(*expected, param.kind(), *at));
            }
        }
        for (index, (at, expected)) in outputs.iter().zip(&signature.outputs).enumerate() {
            let param = self.param(*at)?;
            if param.kind() != *expected {
                return Err(DaedalError::kind_mismatch(*expected, param.kind(), *at));
            }
            if outputs[..index].contains(at) {
                return Err(DaedalError::validation(format!(
                    "parameter {at} listed twice as an output"
                )));
            }
            if let Some(writer) = self.writer_of(*at) {
                return Err(DaedalError::validation(format!(
                    "parameter {at} already driven by function {writer}"
                )));
            }
        }
        self.guarded(|doc| {
            let id = FuncId(doc.next_func);
            let instance = TreeFunctionInstance {
                id,
                guid: signature.guid,
                inputs,
                outputs: outputs.clone(),
                args,
                state: FuncState::Pending,
            };
            doc.record_and_apply(TxOp::AddFunc { instance })?;
            for output in &outputs {
                doc.invalidate_if_present(*output)?;
                doc.propagate_from(*output)?;
            }
            debug!("doc: bound function {} as {id}", signature.guid);
            Ok(id)
        })
    }

    /// Remove an instance; its outputs become stale and downstream consumers
    /// go pending.
    pub fn remove_function(&mut self, id: FuncId) -> DaedalResult<()> {
        self.require_transaction()?;
        let instance = self.instance(id)?.clone();
        self.guarded(|doc| {
            doc.record_and_apply(TxOp::RemoveFunc {
                instance: instance.clone(),
            })?;
            for output in &instance.outputs {
                doc.invalidate_if_present(*output)?;
                doc.propagate_from(*output)?;
            }
            Ok(())
        })
    }

    /// Mark a clean instance for re-execution without any input change.
    pub fn force_function(&mut self, id: FuncId) -> DaedalResult<()> {
        self.require_transaction()?;
        self.instance(id)?;
        self.guarded(|doc| {
            doc.mark_pending(id)?;
            let outputs = doc.instance(id)?.outputs.clone();
            for output in &outputs {
                doc.invalidate_if_present(*output)?;
                doc.propagate_from(*output)?;
            }
            Ok(())
        })
    }

    pub fn instance(&self, id: FuncId) -> DaedalResult<&TreeFunctionInstance> {
        self.functions
            .get(&id)
            .ok_or_else(|| DaedalError::not_found(format!("function instance {id}")))
    }

    /// Instances in ascending id (binding) order.
    pub fn instances(&self) -> impl Iterator<Item = &TreeFunctionInstance> {
        self.functions.values()
    }

    /// Instances listing `at` among their inputs, in ascending id order.
    pub fn readers_of(&self, at: ParamRef) -> Vec<FuncId> {
        self.functions
            .values()
            .filter(|instance| instance.reads(at))
            .map(|instance| instance.id)
            .collect()
    }

    /// The single instance driving `at`, if any.
    pub fn writer_of(&self, at: ParamRef) -> Option<FuncId> {
        self.functions
            .values()
            .find(|instance| instance.writes(at))
            .map(|instance| instance.id)
    }

    /// Record a state flip for one instance (execution-engine use).
    pub fn set_func_state(&mut self, id: FuncId, state: FuncState) -> DaedalResult<()> {
        self.require_transaction()?;
        let prev = self.instance(id)?.state;
        if prev == state {
            return Ok(());
        }
        self.record_and_apply(TxOp::SetFuncState {
            id,
            prev,
            next: state,
        })
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn require_transaction(&self) -> DaedalResult<()> {
        if self.tx.is_open() {
            Ok(())
        } else {
            Err(DaedalError::validation(
                "document mutation outside a transaction",
            ))
        }
    }

    /// Run `f`; on error, unwind every op it recorded so a failed operation
    /// leaves the open transaction exactly as it found it.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> DaedalResult<T>) -> DaedalResult<T> {
        let mark = self.tx.open_ops_len();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                let ops = self.tx.drain_from(mark);
                for op in ops.iter().rev() {
                    self.apply_inverse(op);
                }
                Err(err)
            }
        }
    }

    fn record_and_apply(&mut self, op: TxOp) -> DaedalResult<()> {
        self.require_transaction()?;
        self.apply_forward(&op);
        self.tx.record(op)
    }

    fn mark_pending(&mut self, id: FuncId) -> DaedalResult<()> {
        let prev = self.instance(id)?.state;
        if prev == FuncState::Pending {
            return Ok(());
        }
        self.record_and_apply(TxOp::SetFuncState {
            id,
            prev,
            next: FuncState::Pending,
        })
    }

    fn invalidate_if_present(&mut self, at: ParamRef) -> DaedalResult<()> {
        match self.param(at) {
            Ok(param) if param.is_valid() => self.record_and_apply(TxOp::SetValidity {
                at,
                prev: true,
                next: false,
            }),
            // Already invalid, or the target is gone; nothing left to mark.
            _ => Ok(()),
        }
    }

    /// Forward walk from a mutated parameter: every reachable instance goes
    /// pending and every output along the way invalid, visited once per walk
    /// (diamonds are legal). Re-entering an instance still on the DFS path
    /// is a genuine cycle and fails with the offending parameter chain.
    fn propagate_from(&mut self, origin: ParamRef) -> DaedalResult<()> {
        enum Frame {
            Enter { func: FuncId, via: ParamRef },
            Exit,
        }
        let mut stack: Vec<Frame> = Vec::new();
        let mut path: Vec<(FuncId, ParamRef)> = Vec::new();
        let mut on_path: BTreeSet<FuncId> = BTreeSet::new();
        let mut visited: BTreeSet<FuncId> = BTreeSet::new();

        for func in self.readers_of(origin).into_iter().rev() {
            stack.push(Frame::Enter { func, via: origin });
        }
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter { func, via } => {
                    if on_path.contains(&func) {
                        let start = path
                            .iter()
                            .position(|(entry, _)| *entry == func)
                            .unwrap_or(0);
                        let mut chain: Vec<ParamRef> =
                            path[start..].iter().map(|(_, via)| *via).collect();
                        chain.push(via);
                        return Err(DaedalError::cyclic(chain));
                    }
                    if !visited.insert(func) {
                        continue;
                    }
                    on_path.insert(func);
                    path.push((func, via));
                    stack.push(Frame::Exit);

                    self.mark_pending(func)?;
                    let outputs = self.instance(func)?.outputs.clone();
                    for output in &outputs {
                        self.invalidate_if_present(*output)?;
                    }
                    for output in outputs.iter().rev() {
                        for reader in self.readers_of(*output).into_iter().rev() {
                            stack.push(Frame::Enter {
                                func: reader,
                                via: *output,
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
        Ok(())
    }

    fn collect_subtree(&self, partition: PartitionId, root: NodeId) -> DaedalResult<Vec<NodeId>> {
        let target = self.partition(partition)?;
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = target
                .node(id)
                .ok_or_else(|| DaedalError::not_found(format!("node {partition}:{id}")))?;
            order.push(id);
            for child in node.children() {
                stack.push(*child);
            }
        }
        Ok(order)
    }

    fn parent_of(&self, partition: PartitionId, child: NodeId) -> Option<(NodeId, usize)> {
        let target = self.partitions.get(&partition)?;
        for node in target.nodes() {
            if let Some(index) = node.children().iter().position(|id| *id == child) {
                return Some((node.id(), index));
            }
        }
        None
    }

    fn apply_forward(&mut self, op: &TxOp) {
        match op {
            TxOp::SetValue {
                at,
                next,
                next_valid,
                ..
            } => {
                if let Some(param) = self.param_mut(*at) {
                    param.write(next.clone());
                    param.set_valid(*next_valid);
                }
            }
            TxOp::SetValidity { at, next, .. } => {
                if let Some(param) = self.param_mut(*at) {
                    param.set_valid(*next);
                }
            }
            TxOp::SetFuncState { id, next, .. } => {
                if let Some(instance) = self.functions.get_mut(id) {
                    instance.state = *next;
                }
            }
            TxOp::AddPartition { id, type_name } => {
                self.partitions
                    .insert(*id, Partition::new(*id, type_name.clone()));
                self.next_partition = self.next_partition.max(id.0 + 1);
            }
            TxOp::AddNode { partition, node } => {
                if let Some(target) = self.partitions.get_mut(partition) {
                    target.ensure_next_past(node.id());
                    target.reinsert(node.clone());
                }
            }
            TxOp::LinkChild {
                partition,
                parent,
                child,
            } => {
                if let Some(node) = self
                    .partitions
                    .get_mut(partition)
                    .and_then(|target| target.node_mut(*parent))
                {
                    node.add_child(*child);
                }
            }
            TxOp::RemoveNode {
                partition,
                parent,
                node,
            } => {
                if let Some(target) = self.partitions.get_mut(partition) {
                    target.take(node.id());
                    if let Some((parent, _)) = parent {
                        if let Some(parent) = target.node_mut(*parent) {
                            parent.remove_child(node.id());
                        }
                    }
                }
            }
            TxOp::AddFunc { instance } => {
                self.functions.insert(instance.id, instance.clone());
                self.next_func = self.next_func.max(instance.id.0 + 1);
            }
            TxOp::RemoveFunc { instance } => {
                self.functions.remove(&instance.id);
            }
        }
    }

    fn apply_inverse(&mut self, op: &TxOp) {
        match op {
            TxOp::SetValue {
                at,
                prev,
                prev_valid,
                ..
            } => {
                if let Some(param) = self.param_mut(*at) {
                    param.write(prev.clone());
                    param.set_valid(*prev_valid);
                }
            }
            TxOp::SetValidity { at, prev, .. } => {
                if let Some(param) = self.param_mut(*at) {
                    param.set_valid(*prev);
                }
            }
            TxOp::SetFuncState { id, prev, .. } => {
                if let Some(instance) = self.functions.get_mut(id) {
                    instance.state = *prev;
                }
            }
            TxOp::AddPartition { id, .. } => {
                // The id counter stays put: partition ids are never reused.
                self.partitions.remove(id);
            }
            TxOp::AddNode { partition, node } => {
                if let Some(target) = self.partitions.get_mut(partition) {
                    target.take(node.id());
                }
            }
            TxOp::LinkChild {
                partition,
                parent,
                child,
            } => {
                if let Some(node) = self
                    .partitions
                    .get_mut(partition)
                    .and_then(|target| target.node_mut(*parent))
                {
                    node.remove_child(*child);
                }
            }
            TxOp::RemoveNode {
                partition,
                parent,
                node,
            } => {
                if let Some(target) = self.partitions.get_mut(partition) {
                    target.reinsert(node.clone());
                    if let Some((parent, index)) = parent {
                        if let Some(parent) = target.node_mut(*parent) {
                            parent.insert_child_at(*index, node.id());
                        }
                    }
                }
            }
            TxOp::AddFunc { instance } => {
                self.functions.remove(&instance.id);
            }
            TxOp::RemoveFunc { instance } => {
                self.functions.insert(instance.id, instance.clone());
            }
        }
    }

    fn param_mut(&mut self, at: ParamRef) -> Option<&mut Parameter> {
        self.partitions
            .get_mut(&at.partition)?
            .node_mut(at.node)?
            .param_mut(at.slot)
    }
}
