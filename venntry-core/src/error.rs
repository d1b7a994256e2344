//! Error types for catalog operations

use crate::EntityType;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
///
/// Relational failures keep the raw driver SQLSTATE and message; mapping them
/// into user-facing categories goes through [`DbErrorKind::classify`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Database error during {operation}: {message}")]
    Database {
        operation: String,
        sqlstate: Option<String>,
        message: String,
    },

    #[error("Connection pool error: {reason}")]
    Pool { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Build a database error from an operation name and raw driver details.
    pub fn database(
        operation: impl Into<String>,
        sqlstate: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        StorageError::Database {
            operation: operation.into(),
            sqlstate,
            message: message.into(),
        }
    }

    /// Classified kind for database errors, `None` for everything else.
    pub fn db_kind(&self) -> Option<DbErrorKind> {
        match self {
            StorageError::Database {
                sqlstate, message, ..
            } => Some(DbErrorKind::classify(sqlstate.as_deref(), message)),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Invalid(String),
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Cache backend errors. A miss is not an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Cache serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Cache deserialization failed for {key}: {reason}")]
    Deserialization { key: String, reason: String },
}

/// Master error type for all catalog errors.
#[derive(Debug, Clone, Error)]
pub enum VenntryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Conflict: {message}")]
    Conflict { message: String },
}

/// Result type alias for catalog operations.
pub type VenntryResult<T> = Result<T, VenntryError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// ============================================================================
// DATABASE ERROR CLASSIFICATION
// ============================================================================

/// Category of a relational failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbErrorKind {
    DuplicateEntry,
    ForeignKey,
    ValueTooLong,
    InvalidSyntax,
    NullValue,
    DivisionByZero,
    OutOfRange,
    ConcurrentUpdate,
    NoRows,
    Operational,
}

const TEXT_PATTERNS: &[(&str, DbErrorKind)] = &[
    (
        "duplicate key value violates unique constraint",
        DbErrorKind::DuplicateEntry,
    ),
    ("violates foreign key constraint", DbErrorKind::ForeignKey),
    ("value too long for type", DbErrorKind::ValueTooLong),
    ("invalid input syntax", DbErrorKind::InvalidSyntax),
    ("null value in column", DbErrorKind::NullValue),
    ("division by zero", DbErrorKind::DivisionByZero),
    ("out of range", DbErrorKind::OutOfRange),
    (
        "could not serialize access due to concurrent update",
        DbErrorKind::ConcurrentUpdate,
    ),
    ("no rows in result set", DbErrorKind::NoRows),
    ("query returned an unexpected number of rows", DbErrorKind::NoRows),
];

impl DbErrorKind {
    /// Classify a driver error. The SQLSTATE code wins when it is known;
    /// otherwise the message text is matched against known phrasings.
    pub fn classify(sqlstate: Option<&str>, message: &str) -> Self {
        if let Some(kind) = sqlstate.and_then(Self::from_sqlstate) {
            return kind;
        }
        let lowered = message.to_lowercase();
        TEXT_PATTERNS
            .iter()
            .find(|(pattern, _)| lowered.contains(pattern))
            .map(|(_, kind)| *kind)
            .unwrap_or(DbErrorKind::Operational)
    }

    fn from_sqlstate(code: &str) -> Option<Self> {
        match code {
            "23505" => Some(DbErrorKind::DuplicateEntry),
            "23503" => Some(DbErrorKind::ForeignKey),
            "22001" => Some(DbErrorKind::ValueTooLong),
            "22P02" => Some(DbErrorKind::InvalidSyntax),
            "23502" => Some(DbErrorKind::NullValue),
            "22012" => Some(DbErrorKind::DivisionByZero),
            "22003" | "22008" => Some(DbErrorKind::OutOfRange),
            "40001" => Some(DbErrorKind::ConcurrentUpdate),
            _ => None,
        }
    }

    /// True for kinds caused by bad caller input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DbErrorKind::ForeignKey
                | DbErrorKind::ValueTooLong
                | DbErrorKind::InvalidSyntax
                | DbErrorKind::NullValue
                | DbErrorKind::DivisionByZero
                | DbErrorKind::OutOfRange
        )
    }

    /// Message shown to API callers for this kind.
    pub fn public_message(&self) -> &'static str {
        match self {
            DbErrorKind::DuplicateEntry => "Duplicate entry",
            DbErrorKind::ForeignKey => "Referenced item not found",
            DbErrorKind::ValueTooLong => "Value too long",
            DbErrorKind::InvalidSyntax => "Invalid input format",
            DbErrorKind::NullValue => "Required field missing",
            DbErrorKind::DivisionByZero => "Division by zero",
            DbErrorKind::OutOfRange => "Value out of range",
            DbErrorKind::ConcurrentUpdate => "Concurrent update, please retry",
            DbErrorKind::NoRows => "Item not found",
            DbErrorKind::Operational => "Database error",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
