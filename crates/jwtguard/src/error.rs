//! Error types for the token and scope gates
//!
//! [`GateError`] is the outward-facing taxonomy handed to error responders. Token validation
//! failures are collapsed onto [`GateError::TokenInvalid`]; the specific cause only reaches the
//! log.

use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::claims::ClaimsError;

/// Boxed error returned by caller-supplied hooks (extractors, key resolvers, custom checks,
/// context augmenters, scope derivations).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical rejection kinds produced by the token and scope gates
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A credential was presented but could not be parsed (wrong scheme, extra or missing parts)
    #[error("error extracting token")]
    ExtractionFailed,

    /// No credential was presented; the only kind optional mode can suppress
    #[error("missing token")]
    TokenMissing,

    /// Signature, structure, algorithm pin, claims self-check or custom check failure
    #[error("invalid token")]
    TokenInvalid,

    /// The scope gate could not derive a capability list from the verified token
    #[error("error extracting claims")]
    ClaimsExtractionFailed,

    /// The scope gate's policy rejected the candidate capabilities
    #[error("insufficient privileges")]
    InsufficientPrivileges,

    /// The context augmenter failed after the token was accepted. Surfaced verbatim.
    #[error(transparent)]
    Augmentation(BoxError),
}

impl GateError {
    /// Returns `true` for the kind optional mode is allowed to downgrade
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::TokenMissing)
    }

    /// Stable machine-readable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExtractionFailed => "extraction_failed",
            Self::TokenMissing => "token_missing",
            Self::TokenInvalid => "token_invalid",
            Self::ClaimsExtractionFailed => "claims_extraction_failed",
            Self::InsufficientPrivileges => "insufficient_privileges",
            Self::Augmentation(_) => "augmentation_failed",
        }
    }
}

/// Setup-time configuration errors. Raised while building a gate, never per request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A scope gate was built with no required scopes
    #[error("required scopes must contain at least one scope")]
    EmptyScopes,

    /// The configured credential header is not a valid HTTP header name
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),
}

/// Why a token was rejected. Logged as-is, reported as its [`GateError`] kind.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Rejection {
    #[error("error extracting token: {0}")]
    Extraction(BoxError),

    #[error("missing token")]
    Missing,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("key resolution failed: {0}")]
    KeyResolution(BoxError),

    #[error("key resolution timed out after {0:?}")]
    KeyResolutionTimeout(Duration),

    #[error("error parsing token: {0}")]
    Verification(jsonwebtoken::errors::Error),

    #[error("invalid signing algorithm, expected '{expected:?}' but got '{actual:?}'")]
    AlgorithmMismatch {
        expected: Algorithm,
        actual: Algorithm,
    },

    #[error("invalid claims: {0}")]
    Claims(ClaimsError),

    #[error("custom validation failed: {0}")]
    Custom(BoxError),
}

impl Rejection {
    /// Collapse the specific cause onto the outward-facing kind
    pub(crate) fn into_gate_error(self) -> GateError {
        match self {
            Self::Extraction(_) => GateError::ExtractionFailed,
            Self::Missing => GateError::TokenMissing,
            Self::Malformed(_)
            | Self::KeyResolution(_)
            | Self::KeyResolutionTimeout(_)
            | Self::Verification(_)
            | Self::AlgorithmMismatch { .. }
            | Self::Claims(_)
            | Self::Custom(_) => GateError::TokenInvalid,
        }
    }
}
