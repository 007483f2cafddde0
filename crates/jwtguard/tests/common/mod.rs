//! Common test utilities for integration tests
//!
//! Token minting with the checked-in test keys, request builders and a handler echoing the
//! verified claims back.

#![allow(dead_code)]

use std::convert::Infallible;
use std::time::{SystemTime, UNIX_EPOCH};

use http::{Request, Response, header};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
use jwtguard::{DEFAULT_TOKEN_KEY, MapClaims};
use serde::Serialize;

pub const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes_long_12345678";

const RSA_PRIVATE: &str = include_str!("../keys/rsa_private.pem");
const RSA_PUBLIC: &str = include_str!("../keys/rsa_public.pem");
const EC_PRIVATE: &str = include_str!("../keys/ec_private.pem");
const EC_PUBLIC: &str = include_str!("../keys/ec_public.pem");

/// Current Unix timestamp in seconds
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64
}

/// Sign `claims` with the shared HMAC secret
pub fn sign_hs256(claims: &impl Serialize) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(SECRET),
    )
    .expect("Failed to encode JWT")
}

/// Sign `claims` with the RSA test key
pub fn sign_rs256(claims: &impl Serialize) -> String {
    let key = EncodingKey::from_rsa_pem(RSA_PRIVATE.as_bytes()).expect("Invalid RSA key");
    encode(&Header::new(Algorithm::RS256), claims, &key).expect("Failed to encode JWT")
}

/// Sign `claims` with the P-256 test key
pub fn sign_es256(claims: &impl Serialize) -> String {
    let key = EncodingKey::from_ec_pem(EC_PRIVATE.as_bytes()).expect("Invalid EC key");
    encode(&Header::new(Algorithm::ES256), claims, &key).expect("Failed to encode JWT")
}

/// Sign `claims` with the HMAC secret and a `kid` header
pub fn sign_hs256_with_kid(claims: &impl Serialize, kid: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_secret(SECRET)).expect("Failed to encode JWT")
}

pub fn rsa_public_key() -> DecodingKey {
    DecodingKey::from_rsa_pem(RSA_PUBLIC.as_bytes()).expect("Invalid RSA public key")
}

pub fn ec_public_key() -> DecodingKey {
    DecodingKey::from_ec_pem(EC_PUBLIC.as_bytes()).expect("Invalid EC public key")
}

/// GET request with an optional raw `Authorization` value
pub fn request(authorization: Option<&str>) -> Request<String> {
    let mut builder = Request::get("/protected");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(String::new()).expect("Failed to build request")
}

/// GET request carrying `token` as a bearer credential
pub fn bearer(token: &str) -> Request<String> {
    request(Some(&format!("Bearer {token}")))
}

/// Handler answering with the verified claims as JSON, or `anonymous`
pub async fn echo_claims(req: Request<String>) -> Result<Response<String>, Infallible> {
    let body = match DEFAULT_TOKEN_KEY.get::<MapClaims>(req.extensions()) {
        Some(token) => serde_json::to_string(token.claims()).expect("Failed to serialize claims"),
        None => "anonymous".to_string(),
    };
    Ok(Response::new(body))
}
