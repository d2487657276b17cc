use daedal_core::{DaedalError, DaedalResult, FuncId, NodeId, ParamRef, ParamValue, PartitionId};

use crate::function::{FuncState, TreeFunctionInstance};
use crate::node::Node;

/// One recorded mutation, carrying both the pre- and post-image so it can be
/// applied in either direction (rollback/undo walk the list in reverse; redo
/// replays it forward).
#[derive(Clone, Debug)]
pub enum TxOp {
    SetValue {
        at: ParamRef,
        prev: ParamValue,
        prev_valid: bool,
        next: ParamValue,
        next_valid: bool,
    },
    SetValidity {
        at: ParamRef,
        prev: bool,
        next: bool,
    },
    SetFuncState {
        id: FuncId,
        prev: FuncState,
        next: FuncState,
    },
    AddPartition {
        id: PartitionId,
        type_name: String,
    },
    AddNode {
        partition: PartitionId,
        node: Node,
    },
    LinkChild {
        partition: PartitionId,
        parent: NodeId,
        child: NodeId,
    },
    RemoveNode {
        partition: PartitionId,
        parent: Option<(NodeId, usize)>,
        node: Node,
    },
    AddFunc {
        instance: TreeFunctionInstance,
    },
    RemoveFunc {
        instance: TreeFunctionInstance,
    },
}

/// A named, committed batch of operations.
#[derive(Clone, Debug)]
pub struct TxRecord {
    pub name: String,
    pub ops: Vec<TxOp>,
}

const DEFAULT_UNDO_LIMIT: usize = 100;

/// Transaction boundary manager. Exactly one transaction may be open at a
/// time; committed transactions feed the undo stack, and a fresh commit
/// clears the redo stack.
#[derive(Debug)]
pub struct TransactionEngine {
    open: Option<TxRecord>,
    undo: Vec<TxRecord>,
    redo: Vec<TxRecord>,
    undo_limit: usize,
}

impl Default for TransactionEngine {
    fn default() -> Self {
        Self {
            open: None,
            undo: Vec::new(),
            redo: Vec::new(),
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

impl TransactionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn begin(&mut self, name: &str) -> DaedalResult<()> {
        if self.open.is_some() {
            return Err(DaedalError::validation(format!(
                "transaction '{name}' requested while another is open"
            )));
        }
        self.open = Some(TxRecord {
            name: name.to_string(),
            ops: Vec::new(),
        });
        Ok(())
    }

    pub fn record(&mut self, op: TxOp) -> DaedalResult<()> {
        match self.open.as_mut() {
            Some(tx) => {
                tx.ops.push(op);
                Ok(())
            }
            None => Err(DaedalError::validation(
                "document mutation outside a transaction",
            )),
        }
    }

    pub fn open_ops_len(&self) -> usize {
        self.open.as_ref().map_or(0, |tx| tx.ops.len())
    }

    /// Hand back the ops recorded past `mark`, removing them from the open
    /// transaction. Used to unwind a single failed operation without
    /// aborting the whole transaction.
    pub fn drain_from(&mut self, mark: usize) -> Vec<TxOp> {
        match self.open.as_mut() {
            Some(tx) => tx.ops.split_off(mark),
            None => Vec::new(),
        }
    }

    pub fn take_open(&mut self) -> Option<TxRecord> {
        self.open.take()
    }

    pub fn commit(&mut self) -> DaedalResult<()> {
        let tx = self
            .open
            .take()
            .ok_or_else(|| DaedalError::validation("commit without an open transaction"))?;
        self.redo.clear();
        self.undo.push(tx);
        if self.undo.len() > self.undo_limit {
            self.undo.remove(0);
        }
        Ok(())
    }

    pub fn pop_undo(&mut self) -> Option<TxRecord> {
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<TxRecord> {
        self.redo.pop()
    }

    pub fn push_undo(&mut self, tx: TxRecord) {
        self.undo.push(tx);
    }

    pub fn push_redo(&mut self, tx: TxRecord) {
        self.redo.push(tx);
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_transactions_are_rejected() {
        let mut tx = TransactionEngine::new();
        tx.begin("outer").expect("begin");
        let err = tx.begin("inner").expect_err("nested");
        assert!(matches!(err, DaedalError::Validation { .. }));
    }

    #[test]
    fn recording_outside_a_transaction_is_rejected() {
        let mut tx = TransactionEngine::new();
        let err = tx
            .record(TxOp::SetValidity {
                at: ParamRef::new(PartitionId(0), NodeId(1), daedal_core::SlotId(0)),
                prev: true,
                next: false,
            })
            .expect_err("no transaction");
        assert!(matches!(err, DaedalError::Validation { .. }));
    }

    #[test]
    fn commit_clears_redo_history() {
        let mut tx = TransactionEngine::new();
        tx.begin("first").expect("begin");
        tx.commit().expect("commit");
        let undone = tx.pop_undo().expect("one committed tx");
        tx.push_redo(undone);
        assert_eq!(tx.redo_depth(), 1);

        tx.begin("second").expect("begin");
        tx.commit().expect("commit");
        assert_eq!(tx.redo_depth(), 0, "a fresh commit invalidates redo");
    }
}
