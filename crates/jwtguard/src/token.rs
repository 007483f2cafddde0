//! Verified tokens and their request-scoped storage
//!
//! The token gate stores each [`VerifiedToken`] in the request's [`Extensions`] under a
//! [`TokenKey`]. Keys let several token gates coexist on one request (for example an access
//! token and an ID token), and let the scope gate find the token it should authorize.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Extensions;
use jsonwebtoken::{Algorithm, Header};
use serde_json::Value;

use crate::claims::{Claims, MapClaims};

/// Key a verified token is stored under in the request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenKey(&'static str);

/// Key used unless another one is configured
pub const DEFAULT_TOKEN_KEY: TokenKey = TokenKey::new("jwtguard.token");

impl TokenKey {
    /// Create a key
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Key name
    pub fn name(&self) -> &'static str {
        self.0
    }

    /// Store `token` under this key, replacing any previous token
    pub fn insert<C: Claims>(&self, extensions: &mut Extensions, token: VerifiedToken<C>) {
        self.insert_shared(extensions, Arc::new(token));
    }

    /// Store an already shared token under this key
    pub fn insert_shared<C: Claims>(&self, extensions: &mut Extensions, token: Arc<VerifiedToken<C>>) {
        let mut slots = extensions.remove::<TokenSlots>().unwrap_or_default();
        slots.0.insert(*self, token);
        extensions.insert(slots);
    }

    /// Fetch the token stored under this key
    ///
    /// Returns `None` if nothing is stored, or if the stored token carries a different claim
    /// type than `C`.
    pub fn get<C: Claims>(&self, extensions: &Extensions) -> Option<Arc<VerifiedToken<C>>> {
        let slot = extensions.get::<TokenSlots>()?.0.get(self)?;
        Arc::clone(slot).downcast::<VerifiedToken<C>>().ok()
    }

    /// Returns `true` if any token is stored under this key
    pub fn is_present(&self, extensions: &Extensions) -> bool {
        extensions
            .get::<TokenSlots>()
            .is_some_and(|slots| slots.0.contains_key(self))
    }
}

impl Default for TokenKey {
    fn default() -> Self {
        DEFAULT_TOKEN_KEY
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Default)]
struct TokenSlots(HashMap<TokenKey, Arc<dyn Any + Send + Sync>>);

/// A token whose signature has not been checked yet
///
/// Handed to key resolvers so they can pick a key by `kid`, issuer or any other claim. Nothing
/// in it is trustworthy.
#[derive(Debug)]
pub struct UnverifiedToken<'a> {
    raw: &'a str,
    header: &'a Header,
    claims: &'a Value,
}

impl<'a> UnverifiedToken<'a> {
    pub(crate) fn new(raw: &'a str, header: &'a Header, claims: &'a Value) -> Self {
        Self { raw, header, claims }
    }

    /// Compact serialization as presented by the client
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Decoded JOSE header
    pub fn header(&self) -> &'a Header {
        self.header
    }

    /// Advertised signing algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// Key ID, if the header has one
    pub fn key_id(&self) -> Option<&'a str> {
        self.header.kid.as_deref()
    }

    /// Decoded payload
    pub fn claims(&self) -> &'a Value {
        self.claims
    }
}

/// A token that passed signature verification and every configured check
///
/// Immutable once built. Downstream handlers receive it as `Arc<VerifiedToken<C>>`.
#[derive(Debug, Clone)]
pub struct VerifiedToken<C = MapClaims> {
    raw: String,
    header: Header,
    claims: C,
}

impl<C: Claims> VerifiedToken<C> {
    pub(crate) fn new(raw: String, header: Header, claims: C) -> Self {
        Self { raw, header, claims }
    }

    /// Compact serialization of the token
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// JOSE header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Signing algorithm from the header
    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// Decoded claims
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// Always `true`: a `VerifiedToken` only exists once validation succeeded
    pub fn is_valid(&self) -> bool {
        true
    }
}
