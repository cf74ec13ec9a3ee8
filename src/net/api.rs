//! HTTP client for the gallery backend.
//!
//! ERROR HANDLING
//! ==============
//! Every call is a single request: no retry, no caching. Transport failures,
//! non-2xx statuses, and bodies that do not match the expected record are
//! distinct `ApiError` kinds so callers can decide policy (the session store
//! treats all three as "signed out"; the login flow surfaces `Rejected`).
//!
//! Response parsing is split into pure `parse_*` functions so it can be
//! tested without a server.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::types::{
    ActiveSubscriptionBody, Blog, BlogsPage, Catalogue, CataloguesPage, ErrorBody, Identity, LoginRequest,
    LoginResponse, PendingPhotosPage, Photo, PhotographerStats, PhotosPage, ProfileEnvelope, Subscription,
};
use crate::config::{ClientConfig, Timeouts};

pub const PROFILE_PATH: &str = "/api/user/get-user-profile-by-token";
pub const LOGIN_PATH: &str = "/api/photographer/login";
pub const STATS_PATH: &str = "/api/photographeranalytics/get-photographer-analytics";
pub const PHOTOS_PATH: &str = "/api/images/get-images-by-photographer";
pub const PENDING_PHOTOS_PATH: &str = "/api/photographer/get-pending-images-by-photographer";
pub const CATALOGUES_PATH: &str = "/api/catalogue/get-catalogues-by-photographer";
pub const BLOGS_PATH: &str = "/api/blog/get-my-blogs";
pub const SUBSCRIPTION_PATH: &str = "/api/subscriptions/get-user-active-subscription";

/// Header carrying the session token on authenticated requests.
pub const AUTH_HEADER: &str = "x-auth-token";

const PAGE_SIZE: &str = "1000";
const DEFAULT_LOGIN_FAILURE: &str = "Login failed";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never completed (DNS, connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },

    /// The body did not match the expected record.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// The backend refused the request with a user-facing message.
    #[error("{message}")]
    Rejected { message: String },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// SEAMS
// =============================================================================

/// Profile lookup used by the session store.
#[async_trait::async_trait]
pub trait ProfileApi: Send + Sync {
    async fn fetch_profile(&self, token: &str) -> Result<Identity, ApiError>;
}

/// Credential exchange used by the login flow.
#[async_trait::async_trait]
pub trait LoginApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;
}

/// Read-only photographer dashboard endpoints, keyed by photographer id.
#[async_trait::async_trait]
pub trait PhotographerApi: Send + Sync {
    async fn photographer_stats(&self, photographer_id: &str) -> Result<PhotographerStats, ApiError>;
    async fn photos(&self, photographer_id: &str) -> Result<Vec<Photo>, ApiError>;
    async fn pending_photos(&self, photographer_id: &str) -> Result<Vec<Photo>, ApiError>;
    async fn catalogues(&self, photographer_id: &str) -> Result<Vec<Catalogue>, ApiError>;
    async fn blogs(&self, author_id: &str) -> Result<Vec<Blog>, ApiError>;
    async fn active_subscription(&self, photographer_id: &str) -> Result<Option<Subscription>, ApiError>;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `base_url` (no trailing slash expected).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_owned() })
    }

    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.timeouts)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_json_response(status, &body)
    }
}

#[async_trait::async_trait]
impl ProfileApi for ApiClient {
    async fn fetch_profile(&self, token: &str) -> Result<Identity, ApiError> {
        let resp = self
            .http
            .get(self.url(PROFILE_PATH))
            .header(AUTH_HEADER, token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_profile_response(status, &body)
    }
}

#[async_trait::async_trait]
impl LoginApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let resp = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_login_response(status, &body)
    }
}

#[async_trait::async_trait]
impl PhotographerApi for ApiClient {
    async fn photographer_stats(&self, photographer_id: &str) -> Result<PhotographerStats, ApiError> {
        self.get_json(STATS_PATH, &[("photographer", photographer_id)])
            .await
    }

    async fn photos(&self, photographer_id: &str) -> Result<Vec<Photo>, ApiError> {
        let page: PhotosPage = self
            .get_json(PHOTOS_PATH, &[("photographer", photographer_id), ("pageSize", PAGE_SIZE)])
            .await?;
        Ok(page.photos)
    }

    async fn pending_photos(&self, photographer_id: &str) -> Result<Vec<Photo>, ApiError> {
        let page: PendingPhotosPage = self
            .get_json(PENDING_PHOTOS_PATH, &[("photographer", photographer_id)])
            .await?;
        Ok(page.pending_images)
    }

    async fn catalogues(&self, photographer_id: &str) -> Result<Vec<Catalogue>, ApiError> {
        let page: CataloguesPage = self
            .get_json(CATALOGUES_PATH, &[("photographer", photographer_id), ("pageSize", PAGE_SIZE)])
            .await?;
        Ok(page.catalogues)
    }

    async fn blogs(&self, author_id: &str) -> Result<Vec<Blog>, ApiError> {
        let page: BlogsPage = self
            .get_json(BLOGS_PATH, &[("author", author_id), ("pageSize", PAGE_SIZE)])
            .await?;
        Ok(page.blogs)
    }

    async fn active_subscription(&self, photographer_id: &str) -> Result<Option<Subscription>, ApiError> {
        let body: ActiveSubscriptionBody = self
            .get_json(SUBSCRIPTION_PATH, &[("photographer", photographer_id)])
            .await?;
        Ok(body.subscription)
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

pub(crate) fn parse_json_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if !is_success(status) {
        return Err(ApiError::Status { status, body: body.to_owned() });
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Parse a profile-lookup response into the `user` record.
pub(crate) fn parse_profile_response(status: u16, body: &str) -> Result<Identity, ApiError> {
    parse_json_response::<ProfileEnvelope>(status, body).map(|envelope| envelope.user)
}

/// Parse a login response. Non-2xx bodies become `Rejected` with the
/// backend's `message`, or a generic message when there is none.
pub(crate) fn parse_login_response(status: u16, body: &str) -> Result<LoginResponse, ApiError> {
    if !is_success(status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_owned());
        return Err(ApiError::Rejected { message });
    }
    let resp: LoginResponse = parse_json_response(status, body)?;
    if resp.token.is_empty() {
        return Err(ApiError::Decode("login response carried an empty token".into()));
    }
    Ok(resp)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
