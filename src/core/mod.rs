pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, Ttl, TtlTable};
pub use error::{JobError, Result, Severity};
