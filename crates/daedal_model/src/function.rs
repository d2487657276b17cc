use daedal_core::{FuncGuid, FuncId, ParamKind, ParamRef};
use serde::{Deserialize, Serialize};

/// Declared shape of a registered Tree-Function computation: input and
/// output arity with a kind per slot. Bind-time validation compares instance
/// wiring against this, so signature mismatches never reach execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub guid: FuncGuid,
    pub name: String,
    pub inputs: Vec<ParamKind>,
    pub outputs: Vec<ParamKind>,
    pub is_heavy: bool,
}

/// Execution state of one Tree-Function instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FuncState {
    /// Outputs reflect the last successful run of the current inputs.
    Clean = 0,
    /// An input changed (or the instance was just bound/forced); the next
    /// execution pass must run it.
    Pending = 1,
    /// The last background run failed; outputs are stale.
    Failed = 2,
}

impl FuncState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(FuncState::Clean),
            1 => Some(FuncState::Pending),
            2 => Some(FuncState::Failed),
            _ => None,
        }
    }
}

/// One bound computation: a registered function GUID wired to concrete
/// input and output Parameter references, plus an opaque scalar-arguments
/// blob interpreted by the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeFunctionInstance {
    pub id: FuncId,
    pub guid: FuncGuid,
    pub inputs: Vec<ParamRef>,
    pub outputs: Vec<ParamRef>,
    pub args: Vec<u8>,
    pub state: FuncState,
}

impl TreeFunctionInstance {
    pub fn reads(&self, at: ParamRef) -> bool {
        self.inputs.contains(&at)
    }

    pub fn writes(&self, at: ParamRef) -> bool {
        self.outputs.contains(&at)
    }

    pub fn touches_node(&self, partition: daedal_core::PartitionId, node: daedal_core::NodeId) -> bool {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .any(|at| at.partition == partition && at.node == node)
    }

    /// Deterministic scheduling key: the smallest output reference in
    /// (partition registration, node, slot) order. Declaration-order ties in
    /// the execution engine are broken by this, then by instance id.
    pub fn order_key(&self) -> (Option<ParamRef>, FuncId) {
        (self.outputs.iter().min().copied(), self.id)
    }
}
