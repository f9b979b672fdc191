use thiserror::Error;

use crate::actions::catalog::ActionKind;
use crate::cache::state_cache::Category;
use crate::core::types::{ObjectId, ZoneId};
use crate::policy::capabilities::Role;
use crate::world::entity::EntityKind;

/// How a failure is treated by the tick driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Misconfiguration or programmer error; logged, aborts only the current worker's turn
    Fatal,
    /// Stale or missing target, full destination, empty source; cleared silently
    Recoverable,
    /// Worth one low-severity log line, nothing more
    Informational,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("No assignment policy registered for role {0:?}")]
    NoPolicy(Role),

    #[error("Action {action:?} cannot be performed on {kind:?}")]
    BadTarget { kind: EntityKind, action: ActionKind },

    #[error("Unexpected {kind:?} while refreshing {category:?}")]
    UnexpectedEntity { category: Category, kind: EntityKind },

    #[error("Invalid TTL {0}: must be -1 or a positive tick count")]
    InvalidTtl(i64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Job target disappeared: {0}")]
    TargetLost(ObjectId),

    #[error("Unknown zone: {0}")]
    UnknownZone(ZoneId),

    #[error("Worker not found: {0}")]
    WorkerNotFound(ObjectId),

    #[error("Zone store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl JobError {
    pub fn severity(&self) -> Severity {
        match self {
            JobError::TargetLost(_) | JobError::UnknownZone(_) => Severity::Informational,
            JobError::WorkerNotFound(_) => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
