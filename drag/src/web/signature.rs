//! Webhook authentication against the shared secret.
//!
//! Two schemes are accepted, either one is sufficient:
//! - GitLab: `X-Gitlab-Token` carries the secret itself.
//! - GitHub: `X-Hub-Signature` carries `sha1=` + hex HMAC-SHA1 of the raw body.
//!
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

pub const GITLAB_TOKEN_HEADER: &str = "x-gitlab-token";
pub const HUB_SIGNATURE_HEADER: &str = "x-hub-signature";

/// Scheme that accepted a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    GitlabToken,
    HubSignature,
}

/// Why a request was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no GitLab token or GitHub signature")]
    MissingCredentials,

    #[error("invalid GitLab token/GitHub signature")]
    InvalidCredentials,
}

/// Authenticate a webhook request.
///
/// The body must be the complete raw payload; it is never parsed. Logging
/// the rejection is left to the caller.
pub fn verify_webhook(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AuthScheme, AuthError> {
    let token = headers.get(GITLAB_TOKEN_HEADER).map(|v| v.as_bytes());
    let signature = headers.get(HUB_SIGNATURE_HEADER).map(|v| v.as_bytes());

    if token.is_some_and(|t| verify_gitlab_token(secret, t)) {
        return Ok(AuthScheme::GitlabToken);
    }
    if signature.is_some_and(|s| verify_hub_signature(secret, body, s)) {
        return Ok(AuthScheme::HubSignature);
    }

    if token.is_none() && signature.is_none() {
        Err(AuthError::MissingCredentials)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// Constant-time check of a GitLab token against the secret.
pub fn verify_gitlab_token(secret: &str, provided: &[u8]) -> bool {
    secret.as_bytes().ct_eq(provided).into()
}

/// Expected `X-Hub-Signature` value for `body`.
pub fn hub_signature(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of an `X-Hub-Signature` header value.
///
/// The comparison is over the whole `sha1=<hex>` string, so the hex digest
/// must be lowercase.
pub fn verify_hub_signature(secret: &str, body: &[u8], provided: &[u8]) -> bool {
    let expected = hub_signature(secret, body);
    expected.as_bytes().ct_eq(provided).into()
}
