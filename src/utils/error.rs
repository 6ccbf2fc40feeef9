use crate::domain::model::{ClaimId, EntityId, GroupKey, LevelId, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Rank {value} is out of range (must be 1-50)")]
    InvalidRank { value: i64 },

    #[error("Entity {entity} in {group} is not eligible for ranking: {reason}")]
    IneligibleEntity {
        entity: EntityId,
        group: GroupKey,
        reason: String,
    },

    #[error("No entity {entity} in population {group}")]
    NotFound { entity: EntityId, group: GroupKey },

    #[error("Population {group} changed underneath this call (expected version {expected}, found {found})")]
    ConcurrentModification {
        group: GroupKey,
        expected: u64,
        found: u64,
    },

    #[error("Unknown level {0}")]
    UnknownLevel(LevelId),

    #[error("Unknown claim {0}")]
    UnknownClaim(ClaimId),

    #[error("Unknown user {0}")]
    UnknownUser(UserId),

    #[error("User {user} already has approved claim {existing} for level {level}")]
    DuplicateApproval {
        user: UserId,
        level: LevelId,
        existing: ClaimId,
    },

    #[error("A level named \"{name}\" already exists")]
    NameTaken { name: String },

    #[error("Level {level} still has {claims} claim(s) and cannot be deleted")]
    LevelInUse { level: LevelId, claims: usize },

    #[error("Validation error on {field}: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Config file parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Caller mistake; nothing on the board changed.
    Low,
    /// Lost race; safe to retry the call.
    Medium,
    /// Data or environment problem; needs a human.
    High,
}

impl BoardError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BoardError::InvalidRank { .. }
            | BoardError::IneligibleEntity { .. }
            | BoardError::NotFound { .. }
            | BoardError::UnknownLevel(_)
            | BoardError::UnknownClaim(_)
            | BoardError::UnknownUser(_)
            | BoardError::DuplicateApproval { .. }
            | BoardError::NameTaken { .. }
            | BoardError::LevelInUse { .. }
            | BoardError::ValidationError { .. } => ErrorSeverity::Low,
            BoardError::ConcurrentModification { .. } => ErrorSeverity::Medium,
            BoardError::ConfigError { .. }
            | BoardError::IoError(_)
            | BoardError::SerializationError(_)
            | BoardError::CsvError(_)
            | BoardError::ZipError(_)
            | BoardError::TomlError(_) => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BoardError::InvalidRank { .. } => "Pick a rank between 1 and 50, or omit it to unrank",
            BoardError::IneligibleEntity { .. } => "Only approved claims can be ranked",
            BoardError::NotFound { .. }
            | BoardError::UnknownLevel(_)
            | BoardError::UnknownClaim(_)
            | BoardError::UnknownUser(_) => "Check the id against `rankboard stats`",
            BoardError::ConcurrentModification { .. } => {
                "Another writer finished first; re-read the board and retry"
            }
            BoardError::DuplicateApproval { .. } => {
                "Reject or unapprove the existing claim before approving this one"
            }
            BoardError::NameTaken { .. } => "Choose a different level name",
            BoardError::LevelInUse { .. } => "Remove or reassign its claims first",
            BoardError::ValidationError { .. } => "Fix the reported field and resubmit",
            BoardError::ConfigError { .. } | BoardError::TomlError(_) => {
                "Check the config file against the documented schema"
            }
            BoardError::IoError(_) => "Check that the data path exists and is writable",
            BoardError::SerializationError(_) => "The board file may be corrupt; restore a backup",
            BoardError::CsvError(_) | BoardError::ZipError(_) => {
                "Check the export destination and retry"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
