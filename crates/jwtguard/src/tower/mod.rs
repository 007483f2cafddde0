//! # Tower middleware
//!
//! Both gates are exposed as Tower layers over `http` requests:
//!
//! - [`JwtLayer`] / [`JwtService`] validate the bearer token and store it in the request
//!   extensions
//! - [`ScopeLayer`] / [`ScopeService`] authorize the stored token's scopes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use jwtguard::tower::{JwtLayer, ScopeLayer};
//! use jwtguard::{StaticKey, ValidatorOptions};
//!
//! let service = ServiceBuilder::new()
//!     .layer(JwtLayer::new(
//!         ValidatorOptions::new().key_resolver(StaticKey::from_secret(b"secret")),
//!     ))
//!     .layer(ScopeLayer::require(["orders:read"])?)
//!     .service(my_handler);
//! ```
//!
//! Rejections are rendered by the gate's error responder and returned as ordinary responses;
//! the wrapped service is not called. Errors from the wrapped service pass through unchanged.
//!
//! ## Request Extensions
//!
//! Handlers read the verified token back through its key:
//!
//! ```rust,ignore
//! use jwtguard::{DEFAULT_TOKEN_KEY, MapClaims};
//!
//! if let Some(token) = DEFAULT_TOKEN_KEY.get::<MapClaims>(req.extensions()) {
//!     println!("subject: {:?}", token.claims().get_str("sub"));
//! }
//! ```

mod layer;
mod service;

pub use layer::{JwtLayer, ScopeLayer};
pub use service::{GateFuture, JwtService, ScopeService};
