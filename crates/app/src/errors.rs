//! Error taxonomy shared by every service.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis::{conflicts::ConflictRulesError, discounts::normalize::NormalizeError};

use crate::{store::StoreError, writer::WriteError};

/// Coarse classification of a failure, stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, caught locally.
    Validation,

    /// The encoded value would not round-trip to the requested one.
    Precision,

    /// Credentials were rejected.
    Authentication,

    /// Credentials lack a required scope.
    Permission,

    /// The store rejected one or more input fields.
    StoreValidation,

    /// The network or the store was unavailable.
    Transport,

    /// The store answered without the entity or data we expected.
    OpaqueFailure,

    /// The pipeline ran out of time.
    DeadlineExceeded,

    /// Existing discounts cannot be edited.
    UpdateUnsupported,
}

impl ErrorKind {
    /// Snake-case name, as serialized.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Precision => "precision",
            Self::Authentication => "authentication",
            Self::Permission => "permission",
            Self::StoreValidation => "store_validation",
            Self::Transport => "transport",
            Self::OpaqueFailure => "opaque_failure",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::UpdateUnsupported => "update_unsupported",
        }
    }

    /// What the operator should do next.
    pub const fn remediation(self) -> &'static str {
        match self {
            Self::Validation => "Fix the highlighted field and resubmit.",
            Self::Precision => {
                "Use a value with at most 2 decimal places (4 for percentage fractions)."
            }
            Self::Authentication => "Log in to the store admin again and retry.",
            Self::Permission => {
                "Reinstall the app and accept all requested permissions (write_discounts)."
            }
            Self::StoreValidation => "Correct the rejected field and resubmit.",
            Self::Transport => "Retry shortly; the store could not be reached.",
            Self::OpaqueFailure => {
                "Check the discount in the store admin; contact support if this persists."
            }
            Self::DeadlineExceeded => "Re-run cleanup, then retry the request.",
            Self::UpdateUnsupported => "Delete the discount and create a new one.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StoreError {
    /// Taxonomy kind for this store failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Throttled => ErrorKind::Transport,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Permission(_) => ErrorKind::Permission,
            Self::UserErrors(_) => ErrorKind::StoreValidation,
            Self::Protocol(_) | Self::MissingEntity(_) => ErrorKind::OpaqueFailure,
        }
    }
}

/// Any failure surfaced by the pipeline or the validator.
#[derive(Debug, Error)]
pub enum DiscountError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    ConflictRules(#[from] ConflictRulesError),

    #[error("pipeline did not finish within {}s", .0.as_secs())]
    DeadlineExceeded(Duration),

    #[error("discounts cannot be edited in place")]
    UpdateUnsupported,
}

impl DiscountError {
    /// Taxonomy kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Normalize(NormalizeError::Validation(_)) | Self::ConflictRules(_) => {
                ErrorKind::Validation
            }
            Self::Normalize(NormalizeError::Precision { .. }) => ErrorKind::Precision,
            Self::Store(error) => error.kind(),
            Self::Write(error) => error.kind(),
            Self::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            Self::UpdateUnsupported => ErrorKind::UpdateUnsupported,
        }
    }

    /// What the operator should do next.
    pub fn remediation(&self) -> &'static str {
        self.kind().remediation()
    }
}

/// Serializable summary of a [`DiscountError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    /// Taxonomy kind.
    pub kind: ErrorKind,

    /// Full error message.
    pub message: String,

    /// Suggested next step.
    pub remediation: &'static str,
}

impl From<&DiscountError> for ErrorSummary {
    fn from(error: &DiscountError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            remediation: error.remediation(),
        }
    }
}
