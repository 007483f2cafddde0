//! # jwtguard - Bearer JWT Gates for Tower
//!
//! Request authentication and scope authorization middleware for `http` services built on
//! Tower.
//!
//! ## Design Principles
//!
//! - **Two Composable Stages**: a token gate validates the credential, scope gates authorize it
//! - **Caller-Owned Keys**: signature keys come from a [`KeyResolver`]; the crate never fetches
//!   or caches key material
//! - **Opaque Rejections**: every verification failure surfaces as "invalid token"; the specific
//!   cause only reaches the logs
//! - **Immutable Configuration**: options are merged once per gate and shared by all requests
//!
//! ## Architecture
//!
//! - [`extract`] - Credential extraction (`Authorization: Bearer <token>` by default)
//! - [`claims`] - The [`Claims`] capability plus [`MapClaims`] and [`RegisteredClaims`]
//! - [`token`] - [`VerifiedToken`] and the [`TokenKey`] it is stored under
//! - [`key`] - [`KeyResolver`] with static and JWK set implementations
//! - [`config`] - [`ValidatorOptions`] and their merge into a [`ValidatorConfig`]
//! - [`validator`] - The [`TokenValidator`] state machine
//! - [`scope`] - [`ScopeAuthorizer`] and the ALL / ANY conjunction policies
//! - `tower` - `JwtLayer` and `ScopeLayer` (feature `middleware`, on by default)
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - Tower layers; `tower` is an alias. Without it the crate exposes
//!   [`TokenValidator`] and [`ScopeAuthorizer`] for other transports.
//!
//! ## Quick Start
//!
//! ```rust
//! # #[cfg(feature = "middleware")] {
//! use jsonwebtoken::Algorithm;
//! use jwtguard::tower::{JwtLayer, ScopeLayer};
//! use jwtguard::{MapClaims, StaticKey, ValidatorOptions};
//!
//! let auth: JwtLayer<MapClaims> = JwtLayer::new(
//!     ValidatorOptions::new()
//!         .key_resolver(StaticKey::from_secret(b"secret"))
//!         .algorithm(Algorithm::HS256),
//! );
//! let orders: ScopeLayer<MapClaims> = ScopeLayer::require(["orders:read"]).unwrap();
//!
//! // let service = ServiceBuilder::new().layer(auth).layer(orders).service(handler);
//! # let _ = (auth, orders);
//! # }
//! ```
//!
//! ## Logging
//!
//! Every terminal outcome emits one `tracing` event: `info` for rejections, `debug` for
//! admissions, optional-mode pass-through and augmentation failures. Without a subscriber the
//! crate logs nothing.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod claims;
pub mod config;
pub mod error;
pub mod extract;
pub mod key;
pub mod scope;
pub mod token;
#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;
pub mod validator;

#[doc(inline)]
pub use claims::{Audience, Claims, ClaimsError, MapClaims, RegisteredClaims, TemporalClaims};
#[doc(inline)]
pub use config::{
    ContextAugmenter, ErrorResponder, PassThrough, TokenCheck, ValidatorConfig, ValidatorOptions,
    ValidatorSettings, plain_text_responder,
};
#[doc(inline)]
pub use error::{BoxError, ConfigError, GateError};
#[doc(inline)]
pub use extract::{BearerExtractor, ExtractError, TokenExtractor};
#[doc(inline)]
pub use key::{JwkSetResolver, KeyError, KeyResolver, NoKeyResolver, StaticKey};
#[doc(inline)]
pub use scope::{Conjunction, ScopeAuthorizer, ScopePolicy, ScopeSettings};
#[doc(inline)]
pub use token::{DEFAULT_TOKEN_KEY, TokenKey, UnverifiedToken, VerifiedToken};
#[cfg(feature = "middleware")]
#[doc(inline)]
pub use self::tower::{JwtLayer, JwtService, ScopeLayer, ScopeService};
#[doc(inline)]
pub use validator::TokenValidator;
