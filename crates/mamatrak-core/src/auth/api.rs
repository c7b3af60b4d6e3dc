//! Auth API contract and its HTTP client.
//!
//! `POST {base}/signin` with `{ "username", "password" }`. A 2xx body carries
//! the session fields (wire name `access_token`); a non-2xx body may carry
//! `{ "message" }`, which is shown to the user verbatim.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use super::credentials::Credentials;
use super::error::SignInError;
use crate::session::Session;

/// Path appended to the API base URL.
pub const SIGNIN_PATH: &str = "/signin";

/// User-Agent for Auth API requests.
const USER_AGENT: &str = concat!("mamatrak/", env!("CARGO_PKG_VERSION"));

/// The remote authority that exchanges credentials for a session.
pub trait AuthApi: Send + Sync {
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SignInResponse, SignInError>> + Send;
}

impl<T: AuthApi> AuthApi for Arc<T> {
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SignInResponse, SignInError>> + Send {
        (**self).sign_in(credentials)
    }
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// 2xx body of the sign-in endpoint.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: String,
    #[serde(rename = "access_token")]
    pub access_token: String,
    pub state: String,
    pub community: String,
}

impl SignInResponse {
    /// Splits the body into the session to persist and the banner message.
    pub fn into_parts(self) -> (Session, Option<String>) {
        let Self {
            message,
            first_name,
            last_name,
            email,
            phone_number,
            role,
            access_token,
            state,
            community,
        } = self;

        let session = Session {
            first_name,
            last_name,
            email,
            phone_number,
            role,
            access_token,
            state,
            community,
        };
        (session, message)
    }
}

impl fmt::Debug for SignInResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInResponse")
            .field("message", &self.message)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Pulls a usable `message` out of an error body. Non-JSON bodies and blank
/// messages count as absent.
fn rejection_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
}

/// reqwest-backed Auth API client.
///
/// Keeps a cookie store so a cookie-based session set by the API rides along
/// with later requests.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    signin_url: Url,
}

impl HttpAuthApi {
    /// # Errors
    /// Returns an error if `base_url` is invalid or the client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Self::with_client(client, base_url)
    }

    /// # Errors
    /// Returns an error if `base_url` is invalid.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');
        let signin_url = Url::parse(&format!("{base}{SIGNIN_PATH}"))
            .with_context(|| format!("Invalid Auth API base URL: {base_url}"))?;
        Ok(Self { client, signin_url })
    }

    pub fn signin_url(&self) -> &Url {
        &self.signin_url
    }
}

impl AuthApi for HttpAuthApi {
    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInResponse, SignInError> {
        let request = SignInRequest {
            username: credentials.identifier(),
            password: credentials.secret(),
        };

        let response = self
            .client
            .post(self.signin_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(SignInError::transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(SignInError::transport)?;

        if !status.is_success() {
            return Err(SignInError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        serde_json::from_slice(&body).map_err(SignInError::MalformedResponse)
    }
}
