//! Web server module for handling inbound webhooks.
//!
//! This module provides the webhook listener that:
//! - Accepts POST on any path
//! - Verifies the GitLab token or GitHub HMAC signature
//! - Runs the configured command under the execution gate
//! - Returns 200, 403 or 500 depending on the outcome

pub mod handlers;
pub mod server;
pub mod signature;

pub use handlers::{webhook, AppState, WebhookResponse, MAX_REQUEST_LEN};
pub use server::{listen, router, serve, server_banner};
pub use signature::{
    hub_signature, verify_gitlab_token, verify_hub_signature, verify_webhook, AuthError,
    AuthScheme,
};
