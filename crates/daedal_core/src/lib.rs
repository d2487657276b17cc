pub mod error;
pub mod ids;
pub mod progress;
pub mod time;
pub mod value;

pub use error::{DaedalError, DaedalResult};
pub use ids::*;
pub use progress::*;
pub use time::*;
pub use value::*;
