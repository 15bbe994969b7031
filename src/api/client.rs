use std::error::Error;
use std::fmt;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Response, StatusCode};
use tracing::debug;

use crate::api::{
    Conversation, ConversationsResponse, ErrorDetail, LoginRequest, ModelDescriptor,
    ModelsResponse, RegisterRequest, UploadPageRequest,
};
use crate::auth::SessionToken;
use crate::utils::url::construct_api_url;

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Failures surfaced by [`ServiceClient`] calls.
#[derive(Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    Transport(reqwest::Error),

    /// The service answered 401; the session identity is gone or expired.
    Unauthenticated,

    /// Any other non-success status, with the best message we could extract.
    Rejected { status: u16, message: String },

    /// Success status, but the body did not have the expected shape.
    Malformed(String),
}

impl ApiError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }

    /// Message suitable for a notification. Never exposes raw parse errors.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "Could not reach the service.".to_string(),
            ApiError::Unauthenticated => "Please log in again.".to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Malformed(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "request failed: {err}"),
            ApiError::Unauthenticated => write!(f, "session expired"),
            ApiError::Rejected { message, .. } => write!(f, "{message}"),
            ApiError::Malformed(reason) => write!(f, "unexpected response body: {reason}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

/// HTTP client for the chat service endpoints.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<SessionToken>,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, session: Option<SessionToken>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, session)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: Option<SessionToken>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn get(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.attach_session(self.http.get(construct_api_url(&self.base_url, endpoint)))
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.attach_session(self.http.post(construct_api_url(&self.base_url, endpoint)))
    }

    fn attach_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session {
            Some(token) => request.header(COOKIE, token.expose()),
            None => request,
        }
    }

    pub async fn fetch_models(&self) -> Result<Vec<ModelDescriptor>, ApiError> {
        debug!(endpoint = "models", "fetching model catalog");
        let response = self.get("models").send().await?;
        let response = check_status(response, status_fallback).await?;
        let body: ModelsResponse = parse_json(response).await?;
        Ok(body.models)
    }

    pub async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        debug!(endpoint = "conversations", "fetching conversation list");
        let response = self.get("conversations").send().await?;
        let response = check_status(response, |_| "Failed to load conversations.".to_string())
            .await?;
        let body: ConversationsResponse = parse_json(response).await?;
        Ok(body.conversations)
    }

    pub async fn upload_page(&self, request: &UploadPageRequest) -> Result<(), ApiError> {
        debug!(
            endpoint = "upload_page",
            unique_id = %request.unique_id,
            html_len = request.html.len(),
            stylesheets = request.stylesheets.len(),
            "uploading snapshot"
        );
        let response = self.post("upload_page").json(request).send().await?;
        check_status(response, status_fallback).await?;
        Ok(())
    }

    /// Returns the session identity carried by the response cookies, if any.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<SessionToken>, ApiError> {
        debug!(endpoint = "login", "submitting credentials");
        let response = self
            .post("login")
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let response =
            check_credentials_status(response, |_| UNKNOWN_ERROR_MESSAGE.to_string()).await?;
        Ok(session_from_cookies(&response))
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        debug!(endpoint = "register", "creating account");
        let response = self
            .post("register")
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;
        check_credentials_status(response, |_| UNKNOWN_ERROR_MESSAGE.to_string()).await?;
        Ok(())
    }
}

fn status_fallback(status: StatusCode) -> String {
    status.as_u16().to_string()
}

/// Status check for calls made under a session identity: 401 means that
/// identity expired.
async fn check_status(
    response: Response,
    fallback: impl FnOnce(StatusCode) -> String,
) -> Result<Response, ApiError> {
    if response.status() == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthenticated);
    }
    check_credentials_status(response, fallback).await
}

/// Status check for login and registration. These carry no session, so a
/// 401 is an ordinary rejection with the service's detail.
async fn check_credentials_status(
    response: Response,
    fallback: impl FnOnce(StatusCode) -> String,
) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ErrorDetail>(&body)
            .ok()
            .and_then(|detail| detail.message()),
        Err(_) => None,
    };
    let message = detail.unwrap_or_else(|| fallback(status));
    debug!(status = status.as_u16(), %message, "request rejected");
    Err(ApiError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Malformed(err.to_string()))
}

fn session_from_cookies(response: &Response) -> Option<SessionToken> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(SessionToken::new(pairs.join("; ")))
    }
}

#[cfg(test)]
mod tests;
