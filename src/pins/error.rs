//! Error types for the pinned-anime list.

use std::fmt;

use thiserror::Error;

/// Structured classification for pin store database failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDbErrorKind {
    /// `SQLite` returned busy/locked under concurrent access.
    BusyOrLocked,
    /// Constraint failure other than the handled duplicate URL.
    ConstraintViolation,
    /// Connection pool is closed or timed out.
    Pool,
    /// Unclassified database failure.
    Other,
}

impl PinDbErrorKind {
    /// Classifies a sqlx error by pool state and `SQLite` result code.
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Pool,
            sqlx::Error::Database(database_error) => {
                let code = database_error.code();
                if matches!(code.as_deref(), Some("5" | "6")) {
                    Self::BusyOrLocked
                } else if database_error.is_unique_violation()
                    || database_error.is_check_violation()
                {
                    Self::ConstraintViolation
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for PinDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::Pool => "pool",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// Errors from pin store operations.
#[derive(Debug, Clone, Error)]
pub enum PinError {
    /// Database operation failed.
    #[error("pin store database error ({kind}): {message}")]
    Database {
        /// Typed classification.
        kind: PinDbErrorKind,
        /// Human-readable database error text.
        message: String,
    },

    /// The pin was rejected before reaching storage.
    #[error("invalid pin: {reason}\n  Suggestion: Provide a non-empty name and an http(s) URL")]
    Invalid {
        /// Why the pin was rejected.
        reason: String,
    },
}

impl From<sqlx::Error> for PinError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: PinDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl PinError {
    /// Creates an invalid pin error.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}
