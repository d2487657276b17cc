//! Daedal: a persistent, versioned application-data framework.
//!
//! Typed Parameters live in Nodes, Nodes in typed Partitions, Partitions in
//! a transactional Document. Tree Functions bind pure computations over
//! Parameter references into a dependency graph that the execution engine
//! keeps consistent under mutation. Documents persist as a stamped binary
//! container with an ordered conversion chain for older stamps.
//!
//! This crate is a facade: each component crate is re-exported under a
//! stable module name, with the common surface lifted to the root.

/// Re-export the core ids/values/errors crate.
pub mod core {
    pub use daedal_core::*;
}

/// Re-export the document-model crate.
pub mod model {
    pub use daedal_model::*;
}

/// Re-export the execution-engine crate.
pub mod engine {
    pub use daedal_engine::*;
}

/// Re-export the persistence crate.
pub mod store {
    pub use daedal_store::*;
}

pub use daedal_core::{
    CancelFlag, DaedalError, DaedalResult, FuncGuid, FuncId, NodeId, NullProgress, ParamKind,
    ParamRef, ParamValue, PartitionId, ProgressChannel, SlotId, Timestamp,
};
pub use daedal_engine::{execute, ExecutionReport, FunctionRegistry};
pub use daedal_model::{
    Document, FuncState, FunctionSignature, NodeTypeRegistry, CURRENT_FORMAT_VERSION,
};
pub use daedal_store::{load, save};
