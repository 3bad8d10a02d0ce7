//! OAuth 2.0 installed-app flow against Google.
//!
//! Opens the browser on the consent page, captures the redirect on a loopback
//! listener, exchanges the code for tokens and keeps them fresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::UserProfile;
use crate::config::GoogleConfig;

pub const SCOPES: &[&str] = &[
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/tasks",
];

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token expired or revoked")]
    AuthExpired,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("OAuth flow cancelled")]
    FlowCancelled,
    #[error("OAuth state mismatch")]
    StateMismatch,
}

/// Token as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl GoogleToken {
    /// Expired, or close enough that a request started now might fail.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            None => false,
            Some(expiry) => expiry <= now + chrono::Duration::seconds(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> GoogleToken {
        let expires_in = self.expires_in.unwrap_or(3600);
        GoogleToken {
            access_token: self.access_token,
            // Refresh responses usually omit the refresh token; keep the old one.
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: Some(Utc::now() + chrono::Duration::seconds(expires_in)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Clone)]
pub struct OAuthClient {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            config: config.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, GoogleApiError> {
        let mut url = url::Url::parse(&self.config.auth_url)
            .map_err(|e| GoogleApiError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Run the browser consent flow and return a fresh token.
    pub async fn run_consent_flow(&self) -> Result<GoogleToken, GoogleApiError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);
        let state = uuid::Uuid::new_v4().to_string();
        let auth_url = self.authorization_url(&redirect_uri, &state)?;

        log::info!("Opening browser for Google consent");
        if let Err(e) = open::that(&auth_url) {
            log::warn!("Failed to open browser: {}. URL: {}", e, auth_url);
        }

        let code = wait_for_auth_code(&listener, &state).await?;
        self.exchange_code(&code, &redirect_uri).await
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<GoogleToken, GoogleApiError> {
        let mut form = vec![
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        if !self.config.client_secret.is_empty() {
            form.push(("client_secret", self.config.client_secret.as_str()));
        }

        let resp = self.http.post(&self.config.token_url).form(&form).send().await?;
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::RefreshFailed(format!(
                "Token exchange failed: {}",
                body
            )));
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.into_token(None))
    }

    pub async fn refresh(&self, token: &GoogleToken) -> Result<GoogleToken, GoogleApiError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(GoogleApiError::AuthExpired)?;

        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if !self.config.client_secret.is_empty() {
            form.push(("client_secret", self.config.client_secret.as_str()));
        }

        let resp = self.http.post(&self.config.token_url).form(&form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status.as_u16() == 400 && body.contains("invalid_grant") {
                return Err(GoogleApiError::AuthExpired);
            }
            return Err(GoogleApiError::RefreshFailed(format!("{}: {}", status, body)));
        }
        let fresh: TokenResponse = resp.json().await?;
        log::debug!("Refreshed Google access token");
        Ok(fresh.into_token(token.refresh_token.clone()))
    }

    pub async fn revoke(&self, token: &GoogleToken) -> Result<(), GoogleApiError> {
        // Revoking the refresh token also invalidates its access tokens.
        let value = token.refresh_token.as_deref().unwrap_or(&token.access_token);
        let resp = self
            .http
            .post(&self.config.revoke_url)
            .form(&[("token", value)])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::Api { status, message });
        }
        Ok(())
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, GoogleApiError> {
        let resp = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GoogleApiError::AuthExpired);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GoogleApiError::Api { status, message });
        }
        let info: UserInfo = resp.json().await?;
        let name = info
            .name
            .clone()
            .or_else(|| info.email.clone())
            .unwrap_or_else(|| "Google user".to_string());
        Ok(UserProfile {
            name,
            email: info.email,
            picture: info.picture,
        })
    }
}

/// Wait for the browser redirect and pull the code out of the query string.
async fn wait_for_auth_code(listener: &TcpListener, expected_state: &str) -> Result<String, GoogleApiError> {
    // Browsers may open speculative connections that close without a request.
    let (mut stream, request) = loop {
        let (mut stream, _) = listener.accept().await?;
        let mut buffer = [0u8; 4096];
        let n = match stream.read(&mut buffer).await {
            Ok(n) => n,
            Err(e) => {
                log::debug!("Dropped loopback connection: {}", e);
                continue;
            }
        };
        let request = String::from_utf8_lossy(&buffer[..n]).into_owned();
        if request_target(&request).is_some() {
            break (stream, request);
        }
        log::debug!("Ignoring loopback connection without a request line");
    };

    let outcome = parse_redirect(&request, expected_state);
    let message = match &outcome {
        Ok(_) => "Signed in. You can close this tab and return to Gleaner.",
        Err(GoogleApiError::StateMismatch) => "Sign-in could not be verified. You can close this tab.",
        Err(_) => "Authorization denied. You can close this tab.",
    };
    send_response(&mut stream, message).await;
    outcome
}

/// Extract the authorization code from `GET /?code=...&state=... HTTP/1.1`.
fn request_target(request: &str) -> Option<&str> {
    request.lines().next().and_then(|line| line.split_whitespace().nth(1))
}

fn parse_redirect(request: &str, expected_state: &str) -> Result<String, GoogleApiError> {
    let target = request_target(request).ok_or(GoogleApiError::FlowCancelled)?;
    let url = url::Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| GoogleApiError::InvalidUrl(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                log::warn!("Consent denied: {}", value);
                return Err(GoogleApiError::FlowCancelled);
            }
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(GoogleApiError::StateMismatch);
    }
    code.filter(|c| !c.is_empty()).ok_or(GoogleApiError::FlowCancelled)
}

async fn send_response(stream: &mut tokio::net::TcpStream, message: &str) {
    let body = format!(
        "<html><body style=\"font-family: system-ui; text-align: center; padding: 40px;\">\
         <h2>{}</h2></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        log::debug!("Failed to answer OAuth redirect: {}", e);
    }
    let _ = stream.flush().await;
}
