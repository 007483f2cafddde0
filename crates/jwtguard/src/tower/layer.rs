//! Tower Layer implementations for the token and scope gates

use std::sync::Arc;

use tower::Layer;

use crate::claims::{Claims, MapClaims};
use crate::config::ValidatorOptions;
use crate::error::ConfigError;
use crate::scope::{Conjunction, ScopeAuthorizer};
use crate::validator::TokenValidator;

use super::service::{JwtService, ScopeService};

/// Tower Layer that validates bearer tokens
///
/// Wraps inner services with [`JwtService`]. The validator is shared by every service the layer
/// produces.
///
/// # Example
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use jwtguard::tower::JwtLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(JwtLayer::new(options))
///     .service(my_inner_service);
/// ```
#[derive(Debug)]
pub struct JwtLayer<C = MapClaims> {
    validator: Arc<TokenValidator<C>>,
}

impl<C> Clone for JwtLayer<C> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<C: Claims> JwtLayer<C> {
    /// Create a layer from a single set of options
    pub fn new(options: ValidatorOptions<C>) -> Self {
        Self::with_validator(TokenValidator::new(options))
    }

    /// Create a layer by merging `overrides` over the defaults
    pub fn from_options<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a ValidatorOptions<C>>>,
    {
        Self::with_validator(TokenValidator::from_options(overrides))
    }

    /// Create a layer around an existing validator
    pub fn with_validator(validator: TokenValidator<C>) -> Self {
        Self::from_arc(Arc::new(validator))
    }

    /// Create a layer from an Arc'd validator
    pub fn from_arc(validator: Arc<TokenValidator<C>>) -> Self {
        Self { validator }
    }

    /// The shared validator
    pub fn validator(&self) -> &Arc<TokenValidator<C>> {
        &self.validator
    }
}

impl<S, C> Layer<S> for JwtLayer<C> {
    type Service = JwtService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtService::new(inner, Arc::clone(&self.validator))
    }
}

/// Tower Layer that authorizes token scopes
///
/// Must sit inside a [`JwtLayer`] storing the token under the key this layer reads.
#[derive(Debug)]
pub struct ScopeLayer<C = MapClaims> {
    authorizer: Arc<ScopeAuthorizer<C>>,
}

impl<C> Clone for ScopeLayer<C> {
    fn clone(&self) -> Self {
        Self {
            authorizer: Arc::clone(&self.authorizer),
        }
    }
}

impl<C: Claims> ScopeLayer<C> {
    /// Create a layer around an authorizer
    pub fn new(authorizer: ScopeAuthorizer<C>) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }

    /// Require every scope in `scopes`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyScopes`] if `scopes` is empty.
    pub fn require<I, S>(scopes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(ScopeAuthorizer::new(scopes)?))
    }

    /// Require at least one scope in `scopes`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyScopes`] if `scopes` is empty.
    pub fn require_any<I, S>(scopes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(
            ScopeAuthorizer::new(scopes)?.conjunction(Conjunction::Any),
        ))
    }

    /// The shared authorizer
    pub fn authorizer(&self) -> &Arc<ScopeAuthorizer<C>> {
        &self.authorizer
    }
}

impl<S, C> Layer<S> for ScopeLayer<C> {
    type Service = ScopeService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        ScopeService::new(inner, Arc::clone(&self.authorizer))
    }
}
