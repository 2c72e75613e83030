//! Login strategies.
//!
//! # Responsibilities
//! - Exchange a Credential for a LoginResult (endpoint + session token)
//! - Report rejected credentials distinctly from transport failures

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::session::{Credential, LoginResult};

/// Login handshake errors. Never retried by the executor.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Login rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Login transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed login response: {0}")]
    Malformed(String),
}

/// Performs the login handshake for a stub.
pub trait LoginStrategy: Send + Sync {
    fn login<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, Result<LoginResult, LoginError>>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Logs in by posting the credential as JSON to a login URL.
#[derive(Debug, Clone)]
pub struct HttpLogin {
    client: reqwest::Client,
    login_url: Url,
}

impl HttpLogin {
    pub fn new(login_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, login_url })
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    async fn login_inner(&self, credential: &Credential) -> Result<LoginResult, LoginError> {
        let request = LoginRequest {
            username: credential.username(),
            password: credential.password(),
        };
        let response = self
            .client
            .post(self.login_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LoginError::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }

        let result: LoginResult = serde_json::from_str(&text).map_err(|e| LoginError::Malformed(e.to_string()))?;
        tracing::info!(
            username = credential.username(),
            server_url = %result.server_url,
            "Login succeeded"
        );
        Ok(result)
    }
}

impl LoginStrategy for HttpLogin {
    fn login<'a>(&'a self, credential: &'a Credential) -> BoxFuture<'a, Result<LoginResult, LoginError>> {
        Box::pin(self.login_inner(credential))
    }
}
