//! Claim shapes
//!
//! A claim set is anything deserializable from the JWT payload that can check itself
//! ([`Claims::validate`]) and, optionally, list the scopes it grants ([`Claims::scopes`]).
//! Temporal checks live here rather than in the validator so that each claim shape decides its
//! own tolerance; a caller-defined shape may ignore `exp` entirely.
//!
//! Two shapes ship with the crate:
//!
//! - [`MapClaims`] - an untyped JSON object; scopes are read from the `scp` claim
//! - [`RegisteredClaims`] - the typed RFC 7519 registered claims

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim consulted by [`MapClaims::scopes`]
pub const SCOPES_CLAIM: &str = "scp";

/// Claim self-check and scope derivation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
    /// `exp` is at or before the current time
    #[error("token is expired")]
    Expired,

    /// `iat` is after the current time
    #[error("token used before issued")]
    UsedBeforeIssued,

    /// `nbf` is after the current time
    #[error("token is not valid yet")]
    NotYetValid,

    /// A registered claim is present but is not a numeric date
    #[error("claim '{0}' is not a numeric date")]
    InvalidNumericDate(&'static str),

    /// The scopes claim is present but is not an array of strings
    #[error("claim '{0}' must be an array of strings")]
    InvalidScopes(String),

    /// The claim shape does not know how to list its scopes
    #[error("claim type '{0}' has no scopes, configure a custom scope derivation")]
    ScopesUnsupported(&'static str),

    /// Caller-defined failure
    #[error("{0}")]
    Custom(String),
}

/// A decoded JWT claim set
pub trait Claims: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Structural and temporal self-check, run after the signature is verified
    ///
    /// # Errors
    ///
    /// Returns a [`ClaimsError`] describing the first violated constraint.
    fn validate(&self) -> Result<(), ClaimsError>;

    /// Scopes granted by this claim set, in claim order
    ///
    /// # Errors
    ///
    /// The default implementation always fails with [`ClaimsError::ScopesUnsupported`]; shapes
    /// used behind a scope gate without a custom derivation must override it.
    fn scopes(&self) -> Result<Vec<String>, ClaimsError> {
        Err(ClaimsError::ScopesUnsupported(std::any::type_name::<Self>()))
    }
}

/// Registered date claims of a token, in seconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemporalClaims {
    /// Expiration time
    pub exp: Option<f64>,
    /// Issued at
    pub iat: Option<f64>,
    /// Not before
    pub nbf: Option<f64>,
}

impl TemporalClaims {
    /// Check the dates against the current time
    ///
    /// A token is accepted while `now < exp + leeway`, `iat <= now + leeway` and
    /// `nbf <= now + leeway`. Absent claims are not required.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint, checking `exp`, then `iat`, then `nbf`.
    pub fn validate(&self, leeway: Duration) -> Result<(), ClaimsError> {
        self.validate_at(SystemTime::now(), leeway)
    }

    /// Check the dates against a fixed point in time
    ///
    /// # Errors
    ///
    /// See [`TemporalClaims::validate`].
    pub fn validate_at(&self, now: SystemTime, leeway: Duration) -> Result<(), ClaimsError> {
        let now = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let leeway = leeway.as_secs_f64();

        if let Some(exp) = self.exp
            && now >= exp + leeway
        {
            return Err(ClaimsError::Expired);
        }
        if let Some(iat) = self.iat
            && iat > now + leeway
        {
            return Err(ClaimsError::UsedBeforeIssued);
        }
        if let Some(nbf) = self.nbf
            && nbf > now + leeway
        {
            return Err(ClaimsError::NotYetValid);
        }
        Ok(())
    }
}

/// Untyped claim set backed by a JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapClaims(pub Map<String, Value>);

impl MapClaims {
    /// Create an empty claim set
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a claim
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// Look up a string claim
    pub fn get_str(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }

    /// Underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Read `exp`, `iat` and `nbf`
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::InvalidNumericDate`] if one of them is present but not a number.
    pub fn temporal(&self) -> Result<TemporalClaims, ClaimsError> {
        Ok(TemporalClaims {
            exp: self.numeric_date("exp")?,
            iat: self.numeric_date("iat")?,
            nbf: self.numeric_date("nbf")?,
        })
    }

    fn numeric_date(&self, claim: &'static str) -> Result<Option<f64>, ClaimsError> {
        match self.0.get(claim) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or(ClaimsError::InvalidNumericDate(claim)),
        }
    }

    /// Self-check with a clock skew tolerance
    ///
    /// # Errors
    ///
    /// See [`TemporalClaims::validate`].
    pub fn validate_with_leeway(&self, leeway: Duration) -> Result<(), ClaimsError> {
        self.temporal()?.validate(leeway)
    }

    /// Read scopes from an arbitrary claim
    ///
    /// An absent claim yields no scopes. An array must contain only strings; any other value is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsError::InvalidScopes`] if the claim has the wrong shape.
    pub fn scopes_in(&self, claim: &str) -> Result<Vec<String>, ClaimsError> {
        match self.0.get(claim) {
            None => Ok(Vec::new()),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| ClaimsError::InvalidScopes(claim.to_string()))
                })
                .collect(),
            Some(_) => Err(ClaimsError::InvalidScopes(claim.to_string())),
        }
    }

    /// Returns `true` if `iss` equals `issuer`
    pub fn verify_issuer(&self, issuer: &str) -> bool {
        self.get_str("iss") == Some(issuer)
    }

    /// Returns `true` if `aud` is `audience`, or an array containing it
    pub fn verify_audience(&self, audience: &str) -> bool {
        match self.0.get("aud") {
            Some(Value::String(aud)) => aud == audience,
            Some(Value::Array(values)) => values.iter().any(|v| v.as_str() == Some(audience)),
            _ => false,
        }
    }
}

impl From<Map<String, Value>> for MapClaims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Claims for MapClaims {
    fn validate(&self) -> Result<(), ClaimsError> {
        self.validate_with_leeway(Duration::ZERO)
    }

    fn scopes(&self) -> Result<Vec<String>, ClaimsError> {
        self.scopes_in(SCOPES_CLAIM)
    }
}

/// The `aud` claim, a single audience or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience
    One(String),
    /// Audience list
    Many(Vec<String>),
}

impl Audience {
    /// Returns `true` if `audience` is one of the token's audiences
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::One(aud) => aud == audience,
            Self::Many(values) => values.iter().any(|v| v == audience),
        }
    }
}

/// Registered claims per RFC 7519 Section 4.1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration time (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not before (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// JWT ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl RegisteredClaims {
    /// Date claims as [`TemporalClaims`]
    #[allow(clippy::cast_precision_loss)]
    pub fn temporal(&self) -> TemporalClaims {
        TemporalClaims {
            exp: self.exp.map(|v| v as f64),
            iat: self.iat.map(|v| v as f64),
            nbf: self.nbf.map(|v| v as f64),
        }
    }

    /// Returns `true` if `iss` equals `issuer`
    pub fn verify_issuer(&self, issuer: &str) -> bool {
        self.iss.as_deref() == Some(issuer)
    }

    /// Returns `true` if `audience` is one of the token's audiences
    pub fn verify_audience(&self, audience: &str) -> bool {
        self.aud.as_ref().is_some_and(|aud| aud.contains(audience))
    }
}

impl Claims for RegisteredClaims {
    fn validate(&self) -> Result<(), ClaimsError> {
        self.temporal().validate(Duration::ZERO)
    }
}
