//! Key resolution
//!
//! The token gate never fetches or caches keys itself. A [`KeyResolver`] receives the request
//! head and the still-unverified token and returns the [`DecodingKey`] to check the signature
//! with. Resolvers backed by a remote JWK set own their fetching, caching and refresh policy.

use async_trait::async_trait;
use http::request::Parts;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;

use crate::error::BoxError;
use crate::token::UnverifiedToken;

/// Resolves the key a token's signature is verified with
#[async_trait]
pub trait KeyResolver: Send + Sync + 'static {
    /// Return the verification key for `token`
    ///
    /// `parts` carries the request's extensions, so trace or deadline information attached by
    /// earlier layers is available for correlating the lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if no key can be resolved. The token is then rejected as invalid.
    async fn resolve(
        &self,
        parts: &Parts,
        token: &UnverifiedToken<'_>,
    ) -> Result<DecodingKey, BoxError>;
}

/// Key resolution errors raised by the resolvers in this module
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// No resolver was configured on the token gate
    #[error("no key resolver configured")]
    NotConfigured,

    /// The token header has no `kid`
    #[error("token header has no kid")]
    MissingKeyId,

    /// The `kid` is not in the key set
    #[error("key id '{0}' not found in key set")]
    UnknownKeyId(String),

    /// The JWK could not be turned into a decoding key
    #[error("invalid JWK: {0}")]
    InvalidJwk(#[from] jsonwebtoken::errors::Error),
}

/// Resolver used when none is configured. Rejects every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeyResolver;

#[async_trait]
impl KeyResolver for NoKeyResolver {
    async fn resolve(
        &self,
        _parts: &Parts,
        _token: &UnverifiedToken<'_>,
    ) -> Result<DecodingKey, BoxError> {
        Err(KeyError::NotConfigured.into())
    }
}

/// Verifies every token with one fixed key
///
/// ```rust
/// use jwtguard::key::StaticKey;
/// use jsonwebtoken::DecodingKey;
///
/// let resolver = StaticKey::new(DecodingKey::from_secret(b"secret"));
/// ```
#[derive(Clone)]
pub struct StaticKey {
    key: DecodingKey,
}

impl StaticKey {
    /// Create a resolver returning `key`
    pub fn new(key: DecodingKey) -> Self {
        Self { key }
    }

    /// Shared HMAC secret
    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(DecodingKey::from_secret(secret))
    }
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKey").finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyResolver for StaticKey {
    async fn resolve(
        &self,
        _parts: &Parts,
        _token: &UnverifiedToken<'_>,
    ) -> Result<DecodingKey, BoxError> {
        Ok(self.key.clone())
    }
}

/// Looks keys up by `kid` in an in-memory JWK set
///
/// Refreshing the set on rotation is up to the owner; build a new resolver with the new set.
#[derive(Debug, Clone)]
pub struct JwkSetResolver {
    jwks: JwkSet,
}

impl JwkSetResolver {
    /// Create a resolver over `jwks`
    pub fn new(jwks: JwkSet) -> Self {
        Self { jwks }
    }

    /// Find the decoding key for a key ID
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::UnknownKeyId`] if the set has no such key, or
    /// [`KeyError::InvalidJwk`] if the key cannot be used for verification.
    pub fn decoding_key(&self, key_id: &str) -> Result<DecodingKey, KeyError> {
        let jwk = self
            .jwks
            .find(key_id)
            .ok_or_else(|| KeyError::UnknownKeyId(key_id.to_string()))?;
        Ok(DecodingKey::from_jwk(jwk)?)
    }
}

#[async_trait]
impl KeyResolver for JwkSetResolver {
    async fn resolve(
        &self,
        _parts: &Parts,
        token: &UnverifiedToken<'_>,
    ) -> Result<DecodingKey, BoxError> {
        let key_id = token.key_id().ok_or(KeyError::MissingKeyId)?;
        Ok(self.decoding_key(key_id)?)
    }
}
