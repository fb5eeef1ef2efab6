//! CV CRM access: the token lifecycle manager, the authenticated request
//! pipeline built on it, and the wire types both speak.

pub mod auth;
pub mod client;
pub mod types;

use std::time::Duration;

use crate::config::{APP_NAME, APP_VERSION, REQUEST_TIMEOUT_MS};

pub use auth::{AuthManager, AuthStatus};
pub use client::CrmClient;

/// Outbound HTTP client shared by the auth manager and the pipeline.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
        .user_agent(format!("{}/{}", APP_NAME.replace(' ', "-"), APP_VERSION))
        .build()
}

pub(crate) fn request_timeout() -> Duration {
    Duration::from_millis(REQUEST_TIMEOUT_MS)
}
