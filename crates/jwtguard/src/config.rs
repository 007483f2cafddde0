//! Token gate configuration
//!
//! Configuration is assembled once, when a gate is built. Callers describe what they want to
//! change in one or more [`ValidatorOptions`]; [`ValidatorConfig::merge`] folds them, in order,
//! over the defaults. The result is immutable and shared by every request.
//!
//! | Field            | Default                                   |
//! |------------------|-------------------------------------------|
//! | extractor        | [`BearerExtractor`] (`Authorization`)     |
//! | key resolver     | [`NoKeyResolver`] (rejects every token)   |
//! | algorithm        | not pinned                                |
//! | custom check     | none                                      |
//! | optional         | `false` (token required)                  |
//! | error responder  | error message as `text/plain`, 401        |
//! | token key        | [`DEFAULT_TOKEN_KEY`]                     |
//! | augmenter        | [`PassThrough`]                           |
//! | resolve timeout  | none                                      |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::request::Parts;
use http::{Extensions, HeaderValue, Response, StatusCode, header};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::claims::{Claims, MapClaims};
use crate::error::{BoxError, ConfigError, GateError};
use crate::extract::{BearerExtractor, TokenExtractor};
use crate::key::{KeyResolver, NoKeyResolver};
use crate::token::{DEFAULT_TOKEN_KEY, TokenKey, VerifiedToken};

/// Renders a rejection into a response
///
/// Receives the original request head and the canonical error. The body is converted into the
/// wrapped service's body type.
pub type ErrorResponder = Arc<dyn Fn(&Parts, &GateError) -> Response<String> + Send + Sync>;

/// Responder writing the error message as plain text with `status`
pub fn plain_text_responder(status: StatusCode) -> ErrorResponder {
    Arc::new(move |_parts, err| {
        let mut response = Response::new(err.to_string());
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response.headers_mut().insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response
    })
}

/// Caller-defined check run after every built-in check passed
///
/// A failure rejects the token as [`GateError::TokenInvalid`]; the returned error itself is only
/// logged.
pub trait TokenCheck<C>: Send + Sync + 'static {
    /// Inspect the request and the verified token
    ///
    /// # Errors
    ///
    /// Returns an error to reject the token.
    fn check(&self, parts: &Parts, token: &VerifiedToken<C>) -> Result<(), BoxError>;
}

impl<C, F> TokenCheck<C> for F
where
    F: Fn(&Parts, &VerifiedToken<C>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn check(&self, parts: &Parts, token: &VerifiedToken<C>) -> Result<(), BoxError> {
        self(parts, token)
    }
}

/// Enriches the request context once the token is stored in it
///
/// Typical use is attaching an identity derived from the token. The token is available through
/// the gate's [`TokenKey`].
#[async_trait]
pub trait ContextAugmenter: Send + Sync + 'static {
    /// Modify the request extensions
    ///
    /// # Errors
    ///
    /// Returns an error to abort the request. It reaches the error responder as
    /// [`GateError::Augmentation`].
    async fn augment(&self, extensions: &mut Extensions) -> Result<(), BoxError>;
}

/// Augmenter leaving the context unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl ContextAugmenter for PassThrough {
    async fn augment(&self, _extensions: &mut Extensions) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Partial token gate configuration
///
/// Every field is optional; absent fields leave the value of earlier options (or the default)
/// untouched.
pub struct ValidatorOptions<C = MapClaims> {
    /// Credential extractor
    pub extractor: Option<Arc<dyn TokenExtractor>>,
    /// Verification key resolver
    pub key_resolver: Option<Arc<dyn KeyResolver>>,
    /// Required signing algorithm
    pub algorithm: Option<Algorithm>,
    /// Custom check
    pub check: Option<Arc<dyn TokenCheck<C>>>,
    /// Let requests without a credential through
    pub optional: Option<bool>,
    /// Rejection renderer
    pub error_responder: Option<ErrorResponder>,
    /// Key the verified token is stored under
    pub token_key: Option<TokenKey>,
    /// Context augmenter
    pub augmenter: Option<Arc<dyn ContextAugmenter>>,
    /// Upper bound on key resolution
    pub resolve_timeout: Option<Duration>,
}

impl<C> Default for ValidatorOptions<C> {
    fn default() -> Self {
        Self {
            extractor: None,
            key_resolver: None,
            algorithm: None,
            check: None,
            optional: None,
            error_responder: None,
            token_key: None,
            augmenter: None,
            resolve_timeout: None,
        }
    }
}

impl<C> Clone for ValidatorOptions<C> {
    fn clone(&self) -> Self {
        Self {
            extractor: self.extractor.clone(),
            key_resolver: self.key_resolver.clone(),
            algorithm: self.algorithm,
            check: self.check.clone(),
            optional: self.optional,
            error_responder: self.error_responder.clone(),
            token_key: self.token_key,
            augmenter: self.augmenter.clone(),
            resolve_timeout: self.resolve_timeout,
        }
    }
}

impl<C> fmt::Debug for ValidatorOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorOptions")
            .field("extractor", &self.extractor.as_ref().map(|_| "<extractor>"))
            .field("key_resolver", &self.key_resolver.as_ref().map(|_| "<resolver>"))
            .field("algorithm", &self.algorithm)
            .field("check", &self.check.as_ref().map(|_| "<check>"))
            .field("optional", &self.optional)
            .field(
                "error_responder",
                &self.error_responder.as_ref().map(|_| "<responder>"),
            )
            .field("token_key", &self.token_key)
            .field("augmenter", &self.augmenter.as_ref().map(|_| "<augmenter>"))
            .field("resolve_timeout", &self.resolve_timeout)
            .finish()
    }
}

impl<C: Claims> ValidatorOptions<C> {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credential extractor
    #[must_use]
    pub fn extractor(mut self, extractor: impl TokenExtractor) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Set the key resolver
    #[must_use]
    pub fn key_resolver(mut self, resolver: impl KeyResolver) -> Self {
        self.key_resolver = Some(Arc::new(resolver));
        self
    }

    /// Set a shared key resolver
    #[must_use]
    pub fn shared_key_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.key_resolver = Some(resolver);
        self
    }

    /// Require tokens to be signed with `algorithm`
    #[must_use]
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the custom check
    #[must_use]
    pub fn check(mut self, check: impl TokenCheck<C>) -> Self {
        self.check = Some(Arc::new(check));
        self
    }

    /// Let requests without a credential through, with no token in context
    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    /// Set the rejection renderer
    #[must_use]
    pub fn error_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Parts, &GateError) -> Response<String> + Send + Sync + 'static,
    {
        self.error_responder = Some(Arc::new(responder));
        self
    }

    /// Store the verified token under `key`
    #[must_use]
    pub fn token_key(mut self, key: TokenKey) -> Self {
        self.token_key = Some(key);
        self
    }

    /// Set the context augmenter
    #[must_use]
    pub fn augmenter(mut self, augmenter: impl ContextAugmenter) -> Self {
        self.augmenter = Some(Arc::new(augmenter));
        self
    }

    /// Bound key resolution to `timeout`
    #[must_use]
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }
}

/// Fully resolved token gate configuration
pub struct ValidatorConfig<C = MapClaims> {
    /// Credential extractor
    pub extractor: Arc<dyn TokenExtractor>,
    /// Verification key resolver
    pub key_resolver: Arc<dyn KeyResolver>,
    /// Required signing algorithm, if pinned
    pub algorithm: Option<Algorithm>,
    /// Custom check, if any
    pub check: Option<Arc<dyn TokenCheck<C>>>,
    /// Whether requests without a credential are let through
    pub optional: bool,
    /// Rejection renderer
    pub error_responder: ErrorResponder,
    /// Key the verified token is stored under
    pub token_key: TokenKey,
    /// Context augmenter
    pub augmenter: Arc<dyn ContextAugmenter>,
    /// Upper bound on key resolution, if any
    pub resolve_timeout: Option<Duration>,
}

impl<C> Clone for ValidatorConfig<C> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            key_resolver: Arc::clone(&self.key_resolver),
            algorithm: self.algorithm,
            check: self.check.clone(),
            optional: self.optional,
            error_responder: Arc::clone(&self.error_responder),
            token_key: self.token_key,
            augmenter: Arc::clone(&self.augmenter),
            resolve_timeout: self.resolve_timeout,
        }
    }
}

impl<C> fmt::Debug for ValidatorConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("algorithm", &self.algorithm)
            .field("check", &self.check.as_ref().map(|_| "<check>"))
            .field("optional", &self.optional)
            .field("token_key", &self.token_key)
            .field("resolve_timeout", &self.resolve_timeout)
            .finish_non_exhaustive()
    }
}

impl<C: Claims> Default for ValidatorConfig<C> {
    fn default() -> Self {
        Self {
            extractor: Arc::new(BearerExtractor::default()),
            key_resolver: Arc::new(NoKeyResolver),
            algorithm: None,
            check: None,
            optional: false,
            error_responder: plain_text_responder(StatusCode::UNAUTHORIZED),
            token_key: DEFAULT_TOKEN_KEY,
            augmenter: Arc::new(PassThrough),
            resolve_timeout: None,
        }
    }
}

impl<C: Claims> ValidatorConfig<C> {
    /// Fold `overrides` over the defaults
    ///
    /// Absent entries are skipped. For each field the last override that sets it wins.
    pub fn merge<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a ValidatorOptions<C>>>,
    {
        overrides
            .into_iter()
            .flatten()
            .fold(Self::default(), |config, options| config.apply(options))
    }

    /// Apply the fields `options` sets
    #[must_use]
    pub fn apply(mut self, options: &ValidatorOptions<C>) -> Self {
        if let Some(extractor) = &options.extractor {
            self.extractor = Arc::clone(extractor);
        }
        if let Some(resolver) = &options.key_resolver {
            self.key_resolver = Arc::clone(resolver);
        }
        if let Some(algorithm) = options.algorithm {
            self.algorithm = Some(algorithm);
        }
        if let Some(check) = &options.check {
            self.check = Some(Arc::clone(check));
        }
        if let Some(optional) = options.optional {
            self.optional = optional;
        }
        if let Some(responder) = &options.error_responder {
            self.error_responder = Arc::clone(responder);
        }
        if let Some(key) = options.token_key {
            self.token_key = key;
        }
        if let Some(augmenter) = &options.augmenter {
            self.augmenter = Arc::clone(augmenter);
        }
        if let Some(timeout) = options.resolve_timeout {
            self.resolve_timeout = Some(timeout);
        }
        self
    }
}

impl<C: Claims> From<ValidatorOptions<C>> for ValidatorConfig<C> {
    fn from(options: ValidatorOptions<C>) -> Self {
        Self::merge([Some(&options)])
    }
}

/// Declarative token gate settings, loadable from a config file
///
/// Covers the fields that are plain data. Hooks (key resolver, custom check, augmenter,
/// responder) are added to the resulting [`ValidatorOptions`] in code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSettings {
    /// Let requests without a credential through
    pub optional: Option<bool>,
    /// Required signing algorithm (e.g. `"RS256"`)
    pub algorithm: Option<Algorithm>,
    /// Header carrying the credential
    pub header: Option<String>,
    /// Expected authentication scheme
    pub scheme: Option<String>,
    /// Upper bound on key resolution, in milliseconds
    pub resolve_timeout_ms: Option<u64>,
}

impl ValidatorSettings {
    /// Convert into options
    ///
    /// An extractor is only set when `header` or `scheme` is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] if `header` is not a valid header name.
    pub fn into_options<C: Claims>(self) -> Result<ValidatorOptions<C>, ConfigError> {
        let mut options = ValidatorOptions::new();

        if self.header.is_some() || self.scheme.is_some() {
            let mut extractor = BearerExtractor::new();
            if let Some(header) = &self.header {
                extractor = extractor.with_header(header)?;
            }
            if let Some(scheme) = self.scheme {
                extractor = extractor.with_scheme(scheme);
            }
            options = options.extractor(extractor);
        }

        options.optional = self.optional;
        options.algorithm = self.algorithm;
        options.resolve_timeout = self.resolve_timeout_ms.map(Duration::from_millis);
        Ok(options)
    }
}
