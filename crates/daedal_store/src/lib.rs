//! Daedal document persistence.
//!
//! Documents are persisted as a single binary container: a stamped header,
//! one record per Partition/Node/Parameter (each Parameter kind has a fixed
//! tag and a length-prefixed payload), and the Tree-Function instance list.
//! Loading a container stamped at an older format version runs it through
//! the ordered conversion chain in `migration` before materializing.

pub mod codec;
pub mod dump;
pub mod migration;
pub mod raw;
pub mod store;

pub use dump::dump_json;
pub use migration::{ConversionRoutine, Converter};
pub use raw::{RawDocument, RawFunction, RawNode, RawParam, RawPartition};
pub use store::{load, load_from_bytes, save, save_to_bytes, FILE_EXTENSION, FORMAT_NAME};
