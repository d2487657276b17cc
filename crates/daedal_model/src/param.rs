use daedal_core::{DaedalError, DaedalResult, ParamKind, ParamRef, ParamValue, SlotId};
use serde::{Deserialize, Serialize};

/// A typed value cell owned by exactly one Node.
///
/// The kind is fixed at creation; assignments carrying a different kind tag
/// are rejected. `is_valid` tracks whether the current payload reflects the
/// cell's upstream dependencies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    slot: SlotId,
    kind: ParamKind,
    value: ParamValue,
    is_valid: bool,
}

impl Parameter {
    /// Fresh cell holding the kind's default payload. Cells start valid; it
    /// is binding a function output over them that first invalidates them.
    pub fn new(slot: SlotId, kind: ParamKind) -> Self {
        Self {
            slot,
            kind,
            value: ParamValue::default_for(kind),
            is_valid: true,
        }
    }

    /// Rebuild a cell from persisted state (persistence layer use).
    pub fn restore(slot: SlotId, value: ParamValue, is_valid: bool) -> Self {
        Self {
            slot,
            kind: value.kind(),
            value,
            is_valid,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Replace the payload, returning the previous one. Fails `KindMismatch`
    /// if the incoming tag disagrees with the declared kind; `at` locates the
    /// cell in the error.
    pub fn assign(&mut self, value: ParamValue, at: ParamRef) -> DaedalResult<ParamValue> {
        if value.kind() != self.kind {
            return Err(DaedalError::kind_mismatch(self.kind, value.kind(), at));
        }
        Ok(std::mem::replace(&mut self.value, value))
    }

    pub(crate) fn write(&mut self, value: ParamValue) {
        self.value = value;
    }

    pub(crate) fn set_valid(&mut self, is_valid: bool) {
        self.is_valid = is_valid;
    }

    /// True when the payload matches the declared kind and all mandatory
    /// sub-fields are populated.
    pub fn is_well_formed(&self) -> bool {
        self.value.kind() == self.kind && self.value.is_complete()
    }
}
