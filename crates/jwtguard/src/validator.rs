//! Token validation
//!
//! [`TokenValidator`] runs the token gate's checks in a fixed order:
//!
//! 1. Extract the credential. A malformed credential is [`GateError::ExtractionFailed`], an
//!    absent one is [`GateError::TokenMissing`].
//! 2. Decode the header and payload, and ask the [`KeyResolver`](crate::key::KeyResolver) for the
//!    verification key.
//! 3. Verify the signature with the algorithm the header advertises.
//! 4. Compare that algorithm against the configured pin, if any.
//! 5. Run the claim set's own [`Claims::validate`].
//! 6. Run the custom [`TokenCheck`](crate::config::TokenCheck), if any.
//!
//! Failures in steps 2 to 6 all surface as [`GateError::TokenInvalid`]; the specific cause is
//! logged. On success [`TokenValidator::admit`] stores the token in the request extensions and
//! runs the context augmenter.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http::request::Parts;
use http::{Extensions, Response};
use jsonwebtoken::{DecodingKey, TokenData, Validation, decode, decode_header};
use serde_json::Value;
use tracing::{debug, info};

use crate::claims::{Claims, MapClaims};
use crate::config::{ValidatorConfig, ValidatorOptions};
use crate::error::{GateError, Rejection};
use crate::token::{UnverifiedToken, VerifiedToken};

/// Validates bearer tokens against a fixed configuration
///
/// # Example
///
/// ```rust
/// use jsonwebtoken::Algorithm;
/// use jwtguard::{MapClaims, StaticKey, TokenValidator, ValidatorOptions};
///
/// let validator: TokenValidator<MapClaims> = TokenValidator::new(
///     ValidatorOptions::new()
///         .key_resolver(StaticKey::from_secret(b"secret"))
///         .algorithm(Algorithm::HS256),
/// );
/// assert!(!validator.config().optional);
/// ```
pub struct TokenValidator<C = MapClaims> {
    config: ValidatorConfig<C>,
}

impl<C> std::fmt::Debug for TokenValidator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Claims> TokenValidator<C> {
    /// Create a validator from a single set of options
    pub fn new(options: ValidatorOptions<C>) -> Self {
        Self::from_config(options.into())
    }

    /// Create a validator by merging `overrides` over the defaults
    pub fn from_options<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a ValidatorOptions<C>>>,
    {
        Self::from_config(ValidatorConfig::merge(overrides))
    }

    /// Create a validator from a resolved configuration
    pub fn from_config(config: ValidatorConfig<C>) -> Self {
        Self { config }
    }

    /// Resolved configuration
    pub fn config(&self) -> &ValidatorConfig<C> {
        &self.config
    }

    /// Token stored by this validator in `extensions`, if any
    pub fn token(&self, extensions: &Extensions) -> Option<Arc<VerifiedToken<C>>> {
        self.config.token_key.get(extensions)
    }

    /// Validate the credential carried by a request
    ///
    /// Does not consult optional mode and does not touch the request context.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ExtractionFailed`], [`GateError::TokenMissing`] or
    /// [`GateError::TokenInvalid`].
    pub async fn validate(&self, parts: &Parts) -> Result<VerifiedToken<C>, GateError> {
        self.verify(parts).await.map_err(|rejection| {
            info!(reason = %rejection, "token rejected");
            rejection.into_gate_error()
        })
    }

    /// Run the token gate on a request head
    ///
    /// On success the verified token is stored under the configured key and the context
    /// augmenter has run. In optional mode a request without a credential succeeds with nothing
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns the canonical rejection, or [`GateError::Augmentation`] if the augmenter failed
    /// after the token was accepted.
    pub async fn admit(&self, parts: &mut Parts) -> Result<(), GateError> {
        let token = match self.verify(parts).await {
            Ok(token) => token,
            Err(Rejection::Missing) if self.config.optional => {
                debug!("missing token, continuing without one");
                return Ok(());
            }
            Err(rejection) => {
                info!(reason = %rejection, "token rejected");
                return Err(rejection.into_gate_error());
            }
        };

        let algorithm = token.algorithm();
        self.config.token_key.insert(&mut parts.extensions, token);

        if let Err(err) = self.config.augmenter.augment(&mut parts.extensions).await {
            debug!(error = %err, "context augmentation failed");
            return Err(GateError::Augmentation(err));
        }

        debug!(
            algorithm = ?algorithm,
            key = %self.config.token_key,
            "token accepted"
        );
        Ok(())
    }

    /// Render a rejection with the configured error responder
    pub fn reject(&self, parts: &Parts, err: &GateError) -> Response<String> {
        (self.config.error_responder)(parts, err)
    }

    async fn verify(&self, parts: &Parts) -> Result<VerifiedToken<C>, Rejection> {
        let raw = self
            .config
            .extractor
            .extract(parts)
            .map_err(Rejection::Extraction)?
            .filter(|token| !token.is_empty())
            .ok_or(Rejection::Missing)?;

        let header =
            decode_header(raw.as_str()).map_err(|e| Rejection::Malformed(e.to_string()))?;
        let payload = decode_payload(&raw)?;
        let unverified = UnverifiedToken::new(&raw, &header, &payload);
        let key = self.resolve_key(parts, &unverified).await?;

        // Temporal and audience checks belong to the claim set, not the decoder
        let mut validation = Validation::new(header.alg);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let TokenData { header, claims } =
            decode::<C>(raw.as_str(), &key, &validation).map_err(Rejection::Verification)?;

        if let Some(expected) = self.config.algorithm
            && expected != header.alg
        {
            return Err(Rejection::AlgorithmMismatch {
                expected,
                actual: header.alg,
            });
        }

        claims.validate().map_err(Rejection::Claims)?;

        let token = VerifiedToken::new(raw, header, claims);
        if let Some(check) = &self.config.check {
            check.check(parts, &token).map_err(Rejection::Custom)?;
        }
        Ok(token)
    }

    async fn resolve_key(
        &self,
        parts: &Parts,
        token: &UnverifiedToken<'_>,
    ) -> Result<DecodingKey, Rejection> {
        let resolving = self.config.key_resolver.resolve(parts, token);
        let resolved = match self.config.resolve_timeout {
            Some(limit) => tokio::time::timeout(limit, resolving)
                .await
                .map_err(|_| Rejection::KeyResolutionTimeout(limit))?,
            None => resolving.await,
        };
        resolved.map_err(Rejection::KeyResolution)
    }
}

/// Decode the payload segment without verifying anything
fn decode_payload(raw: &str) -> Result<Value, Rejection> {
    let segments: Vec<&str> = raw.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(Rejection::Malformed(format!(
            "expected 3 segments but got {}",
            segments.len()
        )));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Rejection::Malformed(format!("invalid payload encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| Rejection::Malformed(format!("invalid payload: {e}")))
}
