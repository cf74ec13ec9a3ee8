//! Login flow — exchange credentials for a token and start the session.
//!
//! Mirrors what the login screen does around the session store: validate the
//! form, POST credentials, keep a snapshot of the returned profile, then hand
//! the token to `SessionStore::signin`. A failed login never touches the
//! session.

use tracing::{info, warn};

use crate::net::{ApiError, LoginApi};
use crate::session::{Session, SessionStore};
use crate::storage::{KeyValueStore, PROFILE_SNAPSHOT_KEY, StorageError};

const GENERIC_FAILURE: &str = "Login failed";

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("{0}")]
    InvalidInput(&'static str),

    /// The backend refused the credentials; the message is user-facing.
    #[error("{message}")]
    Rejected { message: String },

    #[error("login request failed: {0}")]
    Api(ApiError),

    #[error("failed to store profile snapshot: {0}")]
    Storage(#[from] StorageError),

    #[error("signed in but the profile could not be loaded")]
    ProfileUnavailable,
}

impl From<ApiError> for LoginError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message } => Self::Rejected { message },
            other => Self::Api(other),
        }
    }
}

impl LoginError {
    /// Text suitable for showing to the person logging in.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => (*msg).to_owned(),
            Self::Rejected { message } => message.clone(),
            _ => GENERIC_FAILURE.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Same rules as the login form: email required and shaped like
    /// `local@domain.tld`, password required.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::InvalidInput` naming the first failing field.
    pub fn validate(&self) -> Result<(), LoginError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(LoginError::InvalidInput("Email is required"));
        }
        if !looks_like_email(email) {
            return Err(LoginError::InvalidInput("Invalid email"));
        }
        if self.password.is_empty() {
            return Err(LoginError::InvalidInput("Password is required"));
        }
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !tld.is_empty()
}

/// Log in and start the session. Returns the session after sign-in.
///
/// # Errors
///
/// Returns an error if the input is invalid, the backend refuses the
/// credentials, the request fails, the snapshot cannot be stored, or the
/// profile lookup after sign-in leaves the session empty.
pub async fn login(
    api: &dyn LoginApi,
    storage: &dyn KeyValueStore,
    session: &SessionStore,
    credentials: &Credentials,
) -> Result<Session, LoginError> {
    credentials.validate()?;
    let email = credentials.email.trim();

    let resp = match api.login(email, &credentials.password).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(error = %e, "login failed");
            return Err(e.into());
        }
    };

    let snapshot = serde_json::to_string(&resp.photographer).map_err(StorageError::from)?;
    storage.set(PROFILE_SNAPSHOT_KEY, &snapshot).await?;

    session.signin(&resp.token).await;
    let current = session.snapshot();
    if !current.is_authenticated() {
        return Err(LoginError::ProfileUnavailable);
    }

    info!(photographer = %resp.photographer.id, "login successful");
    Ok(current)
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;
