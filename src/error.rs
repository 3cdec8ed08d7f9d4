//! Error types for the policy rule store.
//!
//! Every storage failure is surfaced to the caller unchanged; the variants
//! below only classify what the relational store reported so callers can
//! react (retry a `StoreUnavailable`, report a `ConstraintViolation`, ...).

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// SQLSTATE / SQLite extended codes treated as constraint violations when the
/// driver does not classify the error itself. MySQL reports `23000` for
/// duplicate keys.
const CONSTRAINT_CODES: &[&str] = &[
    "23000", "23505", "23503", "23514", "2067", "1555", "787", "275",
];

/// SQLSTATE codes for serialization failures and deadlocks.
const ABORT_CODES: &[&str] = &["40001", "40P01"];

/// Main error type for the policy rule store.
#[derive(Error, Debug)]
pub enum Error {
    /// A rule has more elements than there are storable fields
    #[error("Invalid rule arity {arity}: at most {max} fields can be stored")]
    InvalidArity {
        /// Number of elements in the offending rule
        arity: usize,
        /// Number of storable fields
        max: usize,
    },

    /// A rule is malformed in some other way (e.g. empty element)
    #[error("Invalid rule: {message}")]
    InvalidRule {
        /// Detailed error message
        message: String,
    },

    /// A policy type that belongs to neither the policy nor the grouping section
    #[error("Unknown section for policy type '{policy_type}'")]
    UnknownSection {
        /// The offending policy type
        policy_type: String,
    },

    /// Old and new rule batches of an update differ in length
    #[error("Mismatched update batch: {old} old rules, {new} new rules")]
    MismatchedBatch {
        /// Number of old rules
        old: usize,
        /// Number of new rules
        new: usize,
    },

    /// An insert or update collided with a uniqueness/key constraint
    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        /// Message reported by the database
        message: String,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Connectivity or transport failure talking to the store
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Detailed error message
        message: String,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// A multi-statement operation failed to commit or was aborted by the database
    #[error("Transaction aborted during {operation}: {message}")]
    TransactionAborted {
        /// The store operation running in the transaction
        operation: String,
        /// Detailed error message
        message: String,
        /// Underlying driver error, when the database reported one
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Any other database error, passed through unchanged
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// Error while parsing a policy document
    #[error("Parse error: {message}")]
    Parse {
        /// Detailed error message
        message: String,
        /// Line number where error occurred, if applicable
        line: Option<usize>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create an invalid arity error.
    pub fn invalid_arity(arity: usize, max: usize) -> Self {
        Error::InvalidArity { arity, max }
    }

    /// Create an invalid rule error.
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Error::InvalidRule {
            message: message.into(),
        }
    }

    /// Create an unknown section error.
    pub fn unknown_section(policy_type: impl Into<String>) -> Self {
        Error::UnknownSection {
            policy_type: policy_type.into(),
        }
    }

    /// Create a transaction aborted error.
    pub fn transaction_aborted(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::TransactionAborted {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transaction aborted error carrying the driver error.
    pub fn transaction_aborted_by(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Error::TransactionAborted {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a parse error with line context.
    pub fn parse_at(message: impl Into<String>, line: usize) -> Self {
        Error::Parse {
            message: message.into(),
            line: Some(line),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable by retrying the same call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable { .. } | Error::TransactionAborted { .. }
        )
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidArity { .. } => "invalid_arity",
            Error::InvalidRule { .. } => "invalid_rule",
            Error::UnknownSection { .. } => "unknown_section",
            Error::MismatchedBatch { .. } => "mismatched_batch",
            Error::ConstraintViolation { .. } => "constraint_violation",
            Error::StoreUnavailable { .. } => "store_unavailable",
            Error::TransactionAborted { .. } => "transaction_aborted",
            Error::Database(_) => "database",
            Error::Config { .. } => "config",
            Error::Parse { .. } => "parse",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Internal { .. } => "internal",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if matches!(
            err,
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
        ) {
            return Error::StoreUnavailable {
                message: err.to_string(),
                source: err,
            };
        }

        let reported = err.as_database_error().map(|db| {
            let violation = db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation();
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            (violation, code, db.message().to_string())
        });

        match reported {
            Some((true, _, message)) => Error::ConstraintViolation {
                message,
                source: err,
            },
            Some((_, code, message)) if CONSTRAINT_CODES.contains(&code.as_str()) => {
                Error::ConstraintViolation {
                    message,
                    source: err,
                }
            }
            Some((_, code, message)) if ABORT_CODES.contains(&code.as_str()) => {
                Error::TransactionAborted {
                    operation: "statement".to_string(),
                    message,
                    source: Some(err),
                }
            }
            _ => Error::Database(err),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => Error::config_key("missing value", key),
            other => Error::config(other.to_string()),
        }
    }
}
