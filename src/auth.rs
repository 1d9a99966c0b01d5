//! Credentials and the login exchange
//!
//! The API accepts either a short-lived bearer token obtained from
//! `POST /user/session`, or a long-lived API key. Both end up as the value of
//! the `Authorization` header; only the scheme differs.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{QueryError, Result};
use crate::http::ApiClient;
use crate::sanitize::mask_secret;

const SESSION_PATH: &str = "user/session";

/// The one credential active for an invocation
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Token returned by the session endpoint, sent as `Bearer <token>`
    Bearer(String),
    /// Static API key, sent as `Token <key>`
    ApiKey(String),
}

impl Credential {
    /// Value for the `Authorization` header
    ///
    /// ```
    /// use orca_query::auth::Credential;
    ///
    /// assert_eq!(Credential::Bearer("abc".into()).authorization_header(), "Bearer abc");
    /// assert_eq!(Credential::ApiKey("xyz".into()).authorization_header(), "Token xyz");
    /// ```
    pub fn authorization_header(&self) -> String {
        match self {
            Credential::Bearer(token) => format!("Bearer {}", token),
            Credential::ApiKey(key) => format!("Token {}", key),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(token) => write!(f, "Bearer({})", mask_secret(token)),
            Credential::ApiKey(key) => write!(f, "ApiKey({})", mask_secret(key)),
        }
    }
}

/// How the caller wants to authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Exchange email and password for a bearer token first
    Login { email: String, password: String },
    /// Use a static API key directly
    ApiToken(String),
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Login { email, .. } => write!(f, "Login({}, ****)", email),
            AuthMethod::ApiToken(key) => write!(f, "ApiToken({})", mask_secret(key)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    jwt: Jwt,
}

#[derive(Debug, Deserialize)]
struct Jwt {
    access: String,
}

/// Exchanges an email/password pair for a bearer credential
///
/// Any status other than 200 is an [`QueryError::AuthenticationFailed`]; there is
/// no retry.
///
/// # Arguments
/// * `client` - API client bound to the platform base URL
/// * `email` - Account email
/// * `password` - Account password
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<Credential> {
    info!("Logging in as {}", email);

    let response = client
        .post_form(SESSION_PATH, &[("email", email), ("password", password)])
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        debug!("Login rejected with HTTP {}", status);
        return Err(QueryError::AuthenticationFailed {
            status: status.as_u16(),
        });
    }

    let session: SessionResponse = response.json().await?;
    info!("Login succeeded");
    Ok(Credential::Bearer(session.jwt.access))
}

/// Resolves an [`AuthMethod`] into the credential used for queries
pub async fn authenticate(client: &ApiClient, method: &AuthMethod) -> Result<Credential> {
    match method {
        AuthMethod::Login { email, password } => login(client, email, password).await,
        AuthMethod::ApiToken(key) => Ok(Credential::ApiKey(key.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_secrets() {
        let credential = Credential::Bearer("eyJhbGciOiJIUzI1NiJ9.payload".to_string());
        assert_eq!(format!("{:?}", credential), "Bearer(eyJh****)");

        let method = AuthMethod::Login {
            email: "analyst@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        assert!(!format!("{:?}", method).contains("hunter2"));
    }
}
