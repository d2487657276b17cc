use thiserror::Error;

use crate::{FuncGuid, ParamKind, ParamRef};

#[derive(Debug, Error)]
pub enum DaedalError {
    #[error("kind mismatch at {at}: expected {expected:?}, found {found:?}")]
    KindMismatch {
        expected: ParamKind,
        found: ParamKind,
        at: ParamRef,
    },
    #[error("unknown node type '{type_name}'")]
    UnknownNodeType { type_name: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("cyclic dependency through {}", render_chain(.chain))]
    CyclicDependency { chain: Vec<ParamRef> },
    #[error("unsupported schema: stored version {stored}, current version {current}")]
    UnsupportedSchema { stored: u32, current: u32 },
    #[error("execution of {guid} failed: {message}")]
    ExecutionFailed { guid: FuncGuid, message: String },
    #[error("heavy execution of {guid} failed: {message}")]
    HeavyExecutionFailed { guid: FuncGuid, message: String },
    #[error("transaction aborted: {message}")]
    TransactionAborted { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("validation error: {message}")]
    Validation { message: String },
}

fn render_chain(chain: &[ParamRef]) -> String {
    chain
        .iter()
        .map(|at| at.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl DaedalError {
    pub fn kind_mismatch(expected: ParamKind, found: ParamKind, at: ParamRef) -> Self {
        Self::KindMismatch {
            expected,
            found,
            at,
        }
    }

    pub fn unknown_node_type(type_name: impl Into<String>) -> Self {
        Self::UnknownNodeType {
            type_name: type_name.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn cyclic(chain: Vec<ParamRef>) -> Self {
        Self::CyclicDependency { chain }
    }

    pub fn unsupported_schema(stored: u32, current: u32) -> Self {
        Self::UnsupportedSchema { stored, current }
    }

    pub fn execution_failed(guid: FuncGuid, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            guid,
            message: message.into(),
        }
    }

    pub fn heavy_failed(guid: FuncGuid, message: impl Into<String>) -> Self {
        Self::HeavyExecutionFailed {
            guid,
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::TransactionAborted {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type DaedalResult<T> = Result<T, DaedalError>;

impl From<std::io::Error> for DaedalError {
    fn from(value: std::io::Error) -> Self {
        DaedalError::storage(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::DaedalError;
    use crate::{NodeId, ParamKind, ParamRef, PartitionId, SlotId};

    #[test]
    fn helper_constructors_set_variants() {
        let at = ParamRef::new(PartitionId(0), NodeId(1), SlotId(2));
        let err = DaedalError::kind_mismatch(ParamKind::Int, ParamKind::Real, at);
        assert!(matches!(err, DaedalError::KindMismatch { .. }));
        let err = DaedalError::unknown_node_type("Surface");
        assert!(matches!(err, DaedalError::UnknownNodeType { .. }));
        let err = DaedalError::not_found("missing");
        assert!(matches!(err, DaedalError::NotFound { .. }));
        let err = DaedalError::unsupported_schema(9, 3);
        assert!(matches!(err, DaedalError::UnsupportedSchema { .. }));
        let err = DaedalError::aborted("rolled back");
        assert!(matches!(err, DaedalError::TransactionAborted { .. }));
    }

    #[test]
    fn cycle_message_names_the_parameter_chain() {
        let a = ParamRef::new(PartitionId(0), NodeId(1), SlotId(0));
        let b = ParamRef::new(PartitionId(0), NodeId(2), SlotId(0));
        let err = DaedalError::cyclic(vec![a, b, a]);
        let text = err.to_string();
        assert!(
            text.contains("p0:n1:s0 -> p0:n2:s0 -> p0:n1:s0"),
            "chain should be rendered in order: {text}"
        );
    }
}
