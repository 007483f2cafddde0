//! Credential extraction
//!
//! An extractor has three outcomes, and callers depend on telling them apart:
//!
//! - `Ok(None)`: no credential was offered (anonymous request)
//! - `Ok(Some(token))`: a well-formed credential was offered
//! - `Err(_)`: a credential was offered but is malformed
//!
//! The default [`BearerExtractor`] reads `Authorization: Bearer <token>`. Any
//! `Fn(&Parts) -> Result<Option<String>, BoxError>` is also an extractor, which covers cookies,
//! query parameters and vendor headers.

use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderName};
use http::request::Parts;

use crate::error::{BoxError, ConfigError};

/// Default authentication scheme
pub const BEARER_SCHEME: &str = "Bearer";

/// Pulls a credential string out of a request
pub trait TokenExtractor: Send + Sync + 'static {
    /// Extract the credential from the request head
    ///
    /// # Errors
    ///
    /// Returns an error when a credential is present but malformed. An absent credential is
    /// `Ok(None)`, not an error.
    fn extract(&self, parts: &Parts) -> Result<Option<String>, BoxError>;
}

impl<F> TokenExtractor for F
where
    F: Fn(&Parts) -> Result<Option<String>, BoxError> + Send + Sync + 'static,
{
    fn extract(&self, parts: &Parts) -> Result<Option<String>, BoxError> {
        self(parts)
    }
}

/// Reasons a presented credential is rejected by [`BearerExtractor`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// Header value contains bytes that are not visible ASCII
    #[error("credential header is not valid text")]
    NotText,

    /// Header value is not exactly `<scheme> <token>`
    #[error("expected '<scheme> <token>' but got {0} part(s)")]
    Malformed(usize),

    /// Scheme does not match the configured one
    #[error("expected scheme '{expected}' but got '{actual}'")]
    SchemeMismatch {
        /// Configured scheme
        expected: String,
        /// Scheme found in the header
        actual: String,
    },

    /// Scheme is present but the token part is empty
    #[error("empty credential")]
    Empty,
}

/// Extracts `<scheme> <token>` credentials from a request header
///
/// The scheme comparison is case-insensitive, so `bearer x`, `BEARER x` and `BeAReR x` all yield
/// `x`. The value must consist of exactly two parts separated by a single space.
#[derive(Debug, Clone)]
pub struct BearerExtractor {
    header: HeaderName,
    scheme: String,
}

impl Default for BearerExtractor {
    fn default() -> Self {
        Self {
            header: AUTHORIZATION,
            scheme: BEARER_SCHEME.to_string(),
        }
    }
}

impl BearerExtractor {
    /// Create an extractor for `Authorization: Bearer <token>`
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the credential from a different header
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] if `header` is not a valid header name.
    pub fn with_header(mut self, header: &str) -> Result<Self, ConfigError> {
        self.header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(header.to_string()))?;
        Ok(self)
    }

    /// Expect a different authentication scheme
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Header the credential is read from
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Expected scheme
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Extract the credential from a header map
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] if the header is present but malformed.
    pub fn extract_from_headers(&self, headers: &HeaderMap) -> Result<Option<String>, ExtractError> {
        let Some(value) = headers.get(&self.header) else {
            return Ok(None);
        };
        if value.is_empty() {
            return Ok(None);
        }

        let value = value.to_str().map_err(|_| ExtractError::NotText)?;
        let parts: Vec<&str> = value.split(' ').collect();
        let [scheme, token] = parts.as_slice() else {
            return Err(ExtractError::Malformed(parts.len()));
        };

        if !scheme.eq_ignore_ascii_case(&self.scheme) {
            return Err(ExtractError::SchemeMismatch {
                expected: self.scheme.clone(),
                actual: (*scheme).to_string(),
            });
        }
        if token.is_empty() {
            return Err(ExtractError::Empty);
        }

        Ok(Some((*token).to_string()))
    }
}

impl TokenExtractor for BearerExtractor {
    fn extract(&self, parts: &Parts) -> Result<Option<String>, BoxError> {
        Ok(self.extract_from_headers(&parts.headers)?)
    }
}
