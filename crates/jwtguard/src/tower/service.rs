//! Tower Service implementations for the token and scope gates
//!
//! Both services work on `http::Request<B>` for any body type and wrap any inner service
//! returning `http::Response<ResBody>` where `ResBody: From<String>`. A rejected request is
//! answered with the gate's error response and never reaches the inner service.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::{Request, Response};
use tower_service::Service;

use crate::claims::Claims;
use crate::scope::ScopeAuthorizer;
use crate::validator::TokenValidator;

/// Future returned by the gate services
pub type GateFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Tower Service that validates bearer tokens
///
/// Runs [`TokenValidator::admit`] on the request head, then forwards the request (with the
/// verified token in its extensions) to the inner service.
///
/// # Type Parameters
///
/// * `S` - The inner service type
/// * `C` - The claim set type
#[derive(Debug)]
pub struct JwtService<S, C> {
    inner: S,
    validator: Arc<TokenValidator<C>>,
}

impl<S: Clone, C> Clone for JwtService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<S, C> JwtService<S, C> {
    /// Create a new token gate service
    pub fn new(inner: S, validator: Arc<TokenValidator<C>>) -> Self {
        Self { inner, validator }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S, C, B, ResBody> Service<Request<B>> for JwtService<S, C>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    C: Claims,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = GateFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let validator = Arc::clone(&self.validator);
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            match validator.admit(&mut parts).await {
                Ok(()) => inner.call(Request::from_parts(parts, body)).await,
                Err(err) => Ok(validator.reject(&parts, &err).map(ResBody::from)),
            }
        })
    }
}

/// Tower Service that authorizes token scopes
///
/// # Type Parameters
///
/// * `S` - The inner service type
/// * `C` - The claim set type
#[derive(Debug)]
pub struct ScopeService<S, C> {
    inner: S,
    authorizer: Arc<ScopeAuthorizer<C>>,
}

impl<S: Clone, C> Clone for ScopeService<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            authorizer: Arc::clone(&self.authorizer),
        }
    }
}

impl<S, C> ScopeService<S, C> {
    /// Create a new scope gate service
    pub fn new(inner: S, authorizer: Arc<ScopeAuthorizer<C>>) -> Self {
        Self { inner, authorizer }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S, C, B, ResBody> Service<Request<B>> for ScopeService<S, C>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    C: Claims,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = GateFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let (parts, body) = req.into_parts();

        if let Err(err) = self.authorizer.authorize(&parts) {
            let response = self.authorizer.reject(&parts, &err).map(ResBody::from);
            return Box::pin(async move { Ok(response) });
        }

        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);
        Box::pin(async move { inner.call(Request::from_parts(parts, body)).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::MapClaims;
    use crate::config::ValidatorOptions;
    use crate::key::StaticKey;
    use std::convert::Infallible;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_jwt_service_rejects_without_calling_inner() {
        let validator = Arc::new(TokenValidator::<MapClaims>::new(
            ValidatorOptions::new().key_resolver(StaticKey::from_secret(b"secret")),
        ));
        let inner = tower::service_fn(|_req: Request<String>| async move {
            Ok::<_, Infallible>(Response::new("inner".to_string()))
        });

        let response = JwtService::new(inner, validator)
            .oneshot(Request::new(String::new()))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(response.body(), "missing token");
    }

    #[tokio::test]
    async fn test_scope_service_passes_inner_errors_through() {
        let authorizer = Arc::new(
            ScopeAuthorizer::<MapClaims>::new(["read"])
                .unwrap()
                .policy(|_: &[String], _: &[String]| true)
                .token_lookup(|_| {
                    Some(Arc::new(crate::token::VerifiedToken::new(
                        "a.b.c".into(),
                        jsonwebtoken::Header::default(),
                        MapClaims::new(),
                    )))
                }),
        );
        let inner = tower::service_fn(|_req: Request<String>| async move {
            Err::<Response<String>, _>("inner failure")
        });

        let err = ScopeService::new(inner, authorizer)
            .oneshot(Request::new(String::new()))
            .await
            .unwrap_err();
        assert_eq!(err, "inner failure");
    }
}
