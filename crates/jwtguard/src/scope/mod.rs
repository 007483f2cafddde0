//! Scope authorization
//!
//! The scope gate runs after a token gate. It reads the verified token from the request
//! extensions, derives the token's scopes and checks them against a fixed, non-empty set of
//! required scopes. It never modifies the request.
//!
//! Scope gates stack: wrap nested routes in further `ScopeLayer`s
//! with their own requirements, and the token is validated only once.

pub mod policy;

use std::fmt;
use std::sync::Arc;

use http::request::Parts;
use http::{Extensions, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::claims::{Claims, MapClaims};
use crate::config::{ErrorResponder, plain_text_responder};
use crate::error::{BoxError, ConfigError, GateError};
use crate::token::{DEFAULT_TOKEN_KEY, TokenKey, VerifiedToken};

pub use policy::{Conjunction, ScopePolicy, all_of, any_of};

/// Derives the scope list from a verified token
pub type ScopeDeriver<C> =
    Arc<dyn Fn(&VerifiedToken<C>) -> Result<Vec<String>, BoxError> + Send + Sync>;

/// Custom lookup of the verified token in the request extensions
pub type TokenLookupFn<C> =
    Arc<dyn Fn(&Extensions) -> Option<Arc<VerifiedToken<C>>> + Send + Sync>;

enum TokenLookup<C> {
    Key(TokenKey),
    Custom(TokenLookupFn<C>),
}

impl<C> Clone for TokenLookup<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Key(key) => Self::Key(*key),
            Self::Custom(lookup) => Self::Custom(Arc::clone(lookup)),
        }
    }
}

impl<C> fmt::Debug for TokenLookup<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl<C: Claims> TokenLookup<C> {
    fn find(&self, extensions: &Extensions) -> Option<Arc<VerifiedToken<C>>> {
        match self {
            Self::Key(key) => key.get(extensions),
            Self::Custom(lookup) => lookup(extensions),
        }
    }
}

/// Checks a verified token's scopes against a required set
///
/// ```rust
/// use jwtguard::scope::{Conjunction, ScopeAuthorizer};
///
/// let authorizer: ScopeAuthorizer = ScopeAuthorizer::new(["read", "write"])
///     .unwrap()
///     .conjunction(Conjunction::Any);
/// assert_eq!(authorizer.required(), ["read", "write"]);
/// ```
pub struct ScopeAuthorizer<C = MapClaims> {
    required: Vec<String>,
    lookup: TokenLookup<C>,
    derive: ScopeDeriver<C>,
    policy: Arc<dyn ScopePolicy>,
    error_responder: ErrorResponder,
}

impl<C> Clone for ScopeAuthorizer<C> {
    fn clone(&self) -> Self {
        Self {
            required: self.required.clone(),
            lookup: self.lookup.clone(),
            derive: Arc::clone(&self.derive),
            policy: Arc::clone(&self.policy),
            error_responder: Arc::clone(&self.error_responder),
        }
    }
}

impl<C> fmt::Debug for ScopeAuthorizer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeAuthorizer")
            .field("required", &self.required)
            .field("lookup", &self.lookup)
            .finish_non_exhaustive()
    }
}

impl<C: Claims> ScopeAuthorizer<C> {
    /// Create an authorizer requiring every scope in `required`
    ///
    /// Defaults: token under [`DEFAULT_TOKEN_KEY`], scopes from [`Claims::scopes`],
    /// [`Conjunction::All`], plain-text 403 responses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyScopes`] if `required` is empty.
    pub fn new<I, S>(required: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: Vec<String> = required.into_iter().map(Into::into).collect();
        if required.is_empty() {
            return Err(ConfigError::EmptyScopes);
        }

        Ok(Self {
            required,
            lookup: TokenLookup::Key(DEFAULT_TOKEN_KEY),
            derive: Arc::new(claim_scopes::<C>),
            policy: Arc::new(Conjunction::All),
            error_responder: plain_text_responder(StatusCode::FORBIDDEN),
        })
    }

    /// Combine the required scopes with `conjunction`
    #[must_use]
    pub fn conjunction(self, conjunction: Conjunction) -> Self {
        self.policy(conjunction)
    }

    /// Use a custom scope policy
    #[must_use]
    pub fn policy(mut self, policy: impl ScopePolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Read the token stored under `key`
    #[must_use]
    pub fn token_key(mut self, key: TokenKey) -> Self {
        self.lookup = TokenLookup::Key(key);
        self
    }

    /// Find the token with a custom lookup
    #[must_use]
    pub fn token_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&Extensions) -> Option<Arc<VerifiedToken<C>>> + Send + Sync + 'static,
    {
        self.lookup = TokenLookup::Custom(Arc::new(lookup));
        self
    }

    /// Derive scopes with a custom function
    #[must_use]
    pub fn derive_scopes<F>(mut self, derive: F) -> Self
    where
        F: Fn(&VerifiedToken<C>) -> Result<Vec<String>, BoxError> + Send + Sync + 'static,
    {
        self.derive = Arc::new(derive);
        self
    }

    /// Render rejections with `responder`
    #[must_use]
    pub fn error_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Parts, &GateError) -> Response<String> + Send + Sync + 'static,
    {
        self.error_responder = Arc::new(responder);
        self
    }

    /// Required scopes, in configured order
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Authorize a request head
    ///
    /// # Errors
    ///
    /// - [`GateError::TokenMissing`] if no verified token is in the request extensions
    /// - [`GateError::ClaimsExtractionFailed`] if the scopes cannot be derived
    /// - [`GateError::InsufficientPrivileges`] if the policy rejects the scopes
    pub fn authorize(&self, parts: &Parts) -> Result<(), GateError> {
        let Some(token) = self.lookup.find(&parts.extensions) else {
            info!("no verified token in request context");
            return Err(GateError::TokenMissing);
        };

        let scopes = match (self.derive)(&*token) {
            Ok(scopes) => scopes,
            Err(err) => {
                info!(error = %err, "error extracting scopes from claims");
                return Err(GateError::ClaimsExtractionFailed);
            }
        };

        if !self.policy.admits(&self.required, &scopes) {
            info!(
                required = ?self.required,
                scopes = ?scopes,
                "insufficient privileges"
            );
            return Err(GateError::InsufficientPrivileges);
        }

        debug!(required = ?self.required, "scopes authorized");
        Ok(())
    }

    /// Render a rejection with the configured error responder
    pub fn reject(&self, parts: &Parts, err: &GateError) -> Response<String> {
        (self.error_responder)(parts, err)
    }
}

fn claim_scopes<C: Claims>(token: &VerifiedToken<C>) -> Result<Vec<String>, BoxError> {
    Ok(token.claims().scopes()?)
}

/// Declarative scope gate settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSettings {
    /// Required scopes
    pub required: Vec<String>,
    /// How the required scopes combine
    #[serde(default)]
    pub conjunction: Conjunction,
}

impl ScopeSettings {
    /// Build an authorizer from these settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyScopes`] if no scopes are required.
    pub fn into_authorizer<C: Claims>(self) -> Result<ScopeAuthorizer<C>, ConfigError> {
        Ok(ScopeAuthorizer::new(self.required)?.conjunction(self.conjunction))
    }
}
