//! Build log access: data model, remote source, cached store

pub mod error;
pub mod record;
pub mod source;
pub mod store;

pub use error::LogError;
pub use record::{Architecture, BuildRecord, LogDocument, Recipe, Reproducibility};
pub use source::{HttpLogSource, LogSource};
pub use store::{FlatRecord, LogFilter, LogStore};
