//! Daedal document model.
//!
//! This crate owns the label-tree-shaped data organization of the framework:
//! typed Parameters grouped into Nodes, Nodes grouped into typed Partitions,
//! Partitions owned by a Document together with the Tree-Function instance
//! table, the schema-version stamps, and the transaction engine.

pub mod document;
pub mod function;
pub mod node;
pub mod param;
pub mod partition;
pub mod registry;
pub mod transaction;

pub use document::{Document, CURRENT_FORMAT_VERSION};
pub use function::{FuncState, FunctionSignature, TreeFunctionInstance};
pub use node::Node;
pub use param::Parameter;
pub use partition::{unique_node_name, Partition};
pub use registry::{NodeTypeDef, NodeTypeRegistry, SlotDef};
pub use transaction::{TransactionEngine, TxOp, TxRecord};
