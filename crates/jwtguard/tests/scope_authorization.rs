//! Scope gate integration tests
//!
//! These tests stack `ScopeLayer`s under a `JwtLayer` and check the authorization outcome.
//! Tests cover:
//! - ALL and ANY conjunctions
//! - Scope gates without a preceding token gate
//! - Stacked scope gates with different requirements
//! - Custom policies, derivations and token keys
//! - Malformed and absent scope claims

mod common;

use std::convert::Infallible;

use common::{SECRET, bearer, echo_claims, request, sign_hs256};
use http::{Request, Response, StatusCode};
use jwtguard::{
    BoxError, Conjunction, DEFAULT_TOKEN_KEY, JwtLayer, MapClaims, RegisteredClaims,
    ScopeAuthorizer, ScopeLayer, ScopeSettings, StaticKey, TokenKey, ValidatorOptions,
    VerifiedToken,
};
use serde_json::{Value, json};
use tower::{ServiceBuilder, ServiceExt, service_fn};

fn jwt_layer() -> JwtLayer {
    JwtLayer::new(ValidatorOptions::new().key_resolver(StaticKey::from_secret(SECRET)))
}

/// Send a request carrying a token with `claims` through the token gate and `scope`
async fn send_with_claims(scope: ScopeLayer, claims: Value) -> Response<String> {
    ServiceBuilder::new()
        .layer(jwt_layer())
        .layer(scope)
        .service(service_fn(echo_claims))
        .oneshot(bearer(&sign_hs256(&claims)))
        .await
        .expect("Service failed")
}

fn assert_forbidden(response: &Response<String>, message: &str) {
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.body(), message);
}

/// Test: ALL requires every scope, in any order
#[tokio::test]
async fn test_all_conjunction() {
    let scope = || ScopeLayer::require(["a", "b"]).expect("Invalid scopes");

    let response = send_with_claims(scope(), json!({"scp": ["a"]})).await;
    assert_forbidden(&response, "insufficient privileges");

    let response = send_with_claims(scope(), json!({"scp": []})).await;
    assert_forbidden(&response, "insufficient privileges");

    let response = send_with_claims(scope(), json!({"scp": ["b", "a", "c"]})).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Test: ANY requires one matching scope
#[tokio::test]
async fn test_any_conjunction() {
    let scope = || ScopeLayer::require_any(["a", "b"]).expect("Invalid scopes");

    let response = send_with_claims(scope(), json!({"scp": ["c"]})).await;
    assert_forbidden(&response, "insufficient privileges");

    let response = send_with_claims(scope(), json!({"scp": ["c", "a"]})).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Test: Only arrays of strings are valid scope claims
#[tokio::test]
async fn test_scope_claim_shapes() {
    let scope = || ScopeLayer::require(["read"]).expect("Invalid scopes");

    // A space-delimited string is not the default claim shape
    let response = send_with_claims(scope(), json!({"scp": "read write"})).await;
    assert_forbidden(&response, "error extracting claims");

    let response = send_with_claims(scope(), json!({"scp": ["read", 42]})).await;
    assert_forbidden(&response, "error extracting claims");

    let response = send_with_claims(scope(), json!({"scp": {"read": true}})).await;
    assert_forbidden(&response, "error extracting claims");
}

/// Test: A token without a scopes claim is treated as having no scopes
///
/// Absence of `scp` derives an empty list rather than failing derivation, so the request is
/// rejected for insufficient privileges instead of a claims error.
#[tokio::test]
async fn test_absent_scope_claim_reads_as_empty() {
    let scope = ScopeLayer::require(["read"]).expect("Invalid scopes");

    let response = send_with_claims(scope, json!({"sub": "user123"})).await;
    assert_forbidden(&response, "insufficient privileges");
}

/// Test: A scope gate without a token gate rejects with the missing-token error
#[tokio::test]
async fn test_scope_without_token_gate() {
    let scope: ScopeLayer = ScopeLayer::require(["read"]).expect("Invalid scopes");
    let token = sign_hs256(&json!({"scp": ["read"]}));

    // The credential is on the request but nothing validated it
    let response = ServiceBuilder::new()
        .layer(scope)
        .service(service_fn(echo_claims))
        .oneshot(bearer(&token))
        .await
        .unwrap();

    assert_forbidden(&response, "missing token");
}

/// Test: An anonymous request let through by optional mode is stopped by the scope gate
#[tokio::test]
async fn test_optional_token_gate_then_scope() {
    let jwt: JwtLayer = JwtLayer::new(
        ValidatorOptions::new()
            .key_resolver(StaticKey::from_secret(SECRET))
            .optional(true),
    );
    let scope: ScopeLayer = ScopeLayer::require(["read"]).expect("Invalid scopes");

    let response = ServiceBuilder::new()
        .layer(jwt)
        .layer(scope)
        .service(service_fn(echo_claims))
        .oneshot(request(None))
        .await
        .unwrap();

    assert_forbidden(&response, "missing token");
}

/// Test: Stacked scope gates each enforce their own requirement
#[tokio::test]
async fn test_stacked_scope_gates() {
    let stack = || {
        ServiceBuilder::new()
            .layer(jwt_layer())
            .layer(ScopeLayer::<MapClaims>::require(["orders:read"]).unwrap())
            .layer(ScopeLayer::<MapClaims>::require(["orders:admin"]).unwrap())
            .service(service_fn(echo_claims))
    };

    let reader = bearer(&sign_hs256(&json!({"scp": ["orders:read"]})));
    let response = stack().oneshot(reader).await.unwrap();
    assert_forbidden(&response, "insufficient privileges");

    let admin = bearer(&sign_hs256(&json!({"scp": ["orders:read", "orders:admin"]})));
    let response = stack().oneshot(admin).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Test: The scope gate leaves the request context untouched
#[tokio::test]
async fn test_scope_gate_does_not_mutate_context() {
    let claims = json!({"sub": "user123", "scp": ["read"]});
    let scope = ScopeLayer::require(["read"]).expect("Invalid scopes");

    let response = send_with_claims(scope, claims.clone()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let echoed: Value = serde_json::from_str(response.body()).unwrap();
    assert_eq!(echoed, claims);
}

/// Test: Closure policies replace the conjunction
#[tokio::test]
async fn test_custom_policy() {
    // Every candidate scope must be among the required ones
    let subset = |required: &[String], candidates: &[String]| {
        candidates.iter().all(|scope| required.contains(scope))
    };
    let scope = || {
        ScopeLayer::new(
            ScopeAuthorizer::new(["read", "write"])
                .unwrap()
                .policy(subset),
        )
    };

    let response = send_with_claims(scope(), json!({"scp": ["read"]})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_with_claims(scope(), json!({"scp": ["read", "admin"]})).await;
    assert_forbidden(&response, "insufficient privileges");
}

/// Test: Custom derivation reads an OAuth-style space-delimited `scope` claim
#[tokio::test]
async fn test_custom_derivation() {
    let scope = || {
        ScopeLayer::new(
            ScopeAuthorizer::new(["read"])
                .unwrap()
                .derive_scopes(|token: &VerifiedToken| -> Result<Vec<String>, BoxError> {
                    let scope = token
                        .claims()
                        .get_str("scope")
                        .ok_or("scope claim missing")?;
                    Ok(scope.split_whitespace().map(str::to_string).collect())
                }),
        )
    };

    let response = send_with_claims(scope(), json!({"scope": "read write"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_with_claims(scope(), json!({"sub": "user123"})).await;
    assert_forbidden(&response, "error extracting claims");
}

/// Test: Scopes can come from any claim name
#[tokio::test]
async fn test_scopes_from_other_claim() {
    let scope = ScopeLayer::new(
        ScopeAuthorizer::new(["admin"])
            .unwrap()
            .derive_scopes(|token: &VerifiedToken| Ok(token.claims().scopes_in("roles")?)),
    );

    let response = send_with_claims(scope, json!({"roles": ["admin"]})).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Test: A scope gate reads the token under its configured key
#[tokio::test]
async fn test_custom_token_key() {
    const ACCESS: TokenKey = TokenKey::new("access");

    let jwt: JwtLayer = JwtLayer::new(
        ValidatorOptions::new()
            .key_resolver(StaticKey::from_secret(SECRET))
            .token_key(ACCESS),
    );
    let claims = json!({"scp": ["read"]});

    // Reading the default key finds nothing
    let response = ServiceBuilder::new()
        .layer(jwt.clone())
        .layer(ScopeLayer::<MapClaims>::require(["read"]).unwrap())
        .service(service_fn(echo_claims))
        .oneshot(bearer(&sign_hs256(&claims)))
        .await
        .unwrap();
    assert_forbidden(&response, "missing token");

    let scope = ScopeLayer::new(
        ScopeAuthorizer::<MapClaims>::new(["read"])
            .unwrap()
            .token_key(ACCESS),
    );
    let response = ServiceBuilder::new()
        .layer(jwt)
        .layer(scope)
        .service(service_fn(|req: Request<String>| async move {
            assert!(DEFAULT_TOKEN_KEY.get::<MapClaims>(req.extensions()).is_none());
            assert!(ACCESS.get::<MapClaims>(req.extensions()).is_some());
            Ok::<_, Infallible>(Response::new(String::new()))
        }))
        .oneshot(bearer(&sign_hs256(&claims)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Test: Claim types without scope support fail derivation
#[tokio::test]
async fn test_claims_without_scope_support() {
    let jwt: JwtLayer<RegisteredClaims> =
        JwtLayer::new(ValidatorOptions::new().key_resolver(StaticKey::from_secret(SECRET)));
    let scope: ScopeLayer<RegisteredClaims> =
        ScopeLayer::require(["read"]).expect("Invalid scopes");

    let response = ServiceBuilder::new()
        .layer(jwt)
        .layer(scope)
        .service(service_fn(|_req: Request<String>| async move {
            Ok::<_, Infallible>(Response::new(String::new()))
        }))
        .oneshot(bearer(&sign_hs256(&json!({"sub": "user123", "scp": ["read"]}))))
        .await
        .unwrap();

    assert_forbidden(&response, "error extracting claims");
}

/// Test: A custom responder renders scope rejections
#[tokio::test]
async fn test_custom_scope_responder() {
    let scope = ScopeLayer::new(ScopeAuthorizer::new(["admin"]).unwrap().error_responder(
        |_parts, err| {
            let mut response = Response::new(format!("denied: {err}"));
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            response
        },
    ));

    let response = send_with_claims(scope, json!({"scp": ["read"]})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.body(), "denied: insufficient privileges");
}

/// Test: Scope gates load from declarative settings
#[tokio::test]
async fn test_scope_settings() {
    let settings: ScopeSettings = serde_json::from_value(json!({
        "required": ["read", "write"],
        "conjunction": "any",
    }))
    .unwrap();
    assert_eq!(settings.conjunction, Conjunction::Any);

    let scope = ScopeLayer::new(settings.into_authorizer().unwrap());
    let response = send_with_claims(scope, json!({"scp": ["write"]})).await;
    assert_eq!(response.status(), StatusCode::OK);
}
