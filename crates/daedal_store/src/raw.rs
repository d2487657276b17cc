use daedal_core::{ParamRef, ParamValue};

/// Partially-reconstructed document as read from storage, before the
/// conversion chain has normalized it to the current format version. Legacy
/// fields (`pending`, `valid_mask`, `timestamp_slots`) are populated by the
/// decoder for old stamps and cleared by the routine that retires them.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDocument {
    pub format_version: u32,
    pub app_version: u32,
    pub next_partition: u32,
    pub next_func: u32,
    pub partitions: Vec<RawPartition>,
    pub functions: Vec<RawFunction>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawPartition {
    pub id: u32,
    pub type_name: String,
    pub next_node: u32,
    pub nodes: Vec<RawNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawNode {
    pub id: u32,
    pub children: Vec<u32>,
    pub params: Vec<RawParam>,
    /// v1/v2: per-node slot bitmask carrying parameter validity.
    pub valid_mask: Option<u64>,
    /// v1/v2: slots whose Int payload is really a timestamp in microseconds.
    pub timestamp_slots: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawParam {
    pub slot: u16,
    pub value: ParamValue,
    /// Per-parameter validity flag; absent until the v2 -> v3 routine (or a
    /// v3 decode) fills it.
    pub valid: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawFunction {
    pub id: u32,
    pub guid: [u8; 16],
    /// v1: single pending flag, retired by the v1 -> v2 routine.
    pub pending: Option<bool>,
    /// v2+: three-state Clean/Pending/Failed byte.
    pub state: Option<u8>,
    pub inputs: Vec<ParamRef>,
    pub outputs: Vec<ParamRef>,
    pub args: Vec<u8>,
}
