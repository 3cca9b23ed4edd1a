//! HTTP access to the chat backend.

use std::future::Future;

use ei_core::error::{BackendError, messages};
use ei_core::wire::{
    ChatReply, ChatRequest, CredentialsRequest, EditMessageRequest, GamificationUpdate,
    HistoryEntry, SessionSummary, UserProfile,
};
use reqwest::header::{COOKIE, SET_COOKIE};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::util::client;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not reach the chat backend: {0}")]
    Connection(#[source] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Backend { status: u16, message: String },
    #[error("authentication required")]
    AuthRequired,
    #[error("unexpected response from the chat backend: {0}")]
    Decode(String),
    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ClientError {
    /// Text for an inline error bubble.
    pub fn bubble_text(&self) -> String {
        match self {
            ClientError::Connection(_) | ClientError::Url { .. } => {
                messages::CONNECTION_FAILED.to_string()
            }
            ClientError::Backend { message, .. } => message.clone(),
            ClientError::AuthRequired | ClientError::Decode(_) => messages::NO_REPLY.to_string(),
        }
    }
}

/// The remote profile and chat service. All calls are independent; callers
/// may run several concurrently.
pub trait ChatService: Send + Sync + 'static {
    fn user_profile(&self) -> impl Future<Output = Result<UserProfile, ClientError>> + Send;

    fn update_gamification(
        &self,
        update: GamificationUpdate,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn chat(&self, request: ChatRequest)
    -> impl Future<Output = Result<ChatReply, ClientError>> + Send;

    fn sessions(&self) -> impl Future<Output = Result<Vec<SessionSummary>, ClientError>> + Send;

    fn history(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = Result<Vec<HistoryEntry>, ClientError>> + Send;

    fn delete_session(&self, session_id: Uuid)
    -> impl Future<Output = Result<(), ClientError>> + Send;

    fn edit_message(
        &self,
        message_id: &str,
        new_message: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// `ChatService` over reqwest, authenticated with the stored session cookie.
#[derive(Debug, Clone)]
pub struct HttpChatService {
    api_url: String,
    session_cookie: Option<String>,
    http: reqwest::Client,
}

impl HttpChatService {
    pub fn new(api_url: &str, session_cookie: Option<String>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            session_cookie,
            http: client(),
        }
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, ClientError> {
        let raw = format!("{}{path}", self.api_url);
        reqwest::Url::parse(&raw).map_err(|source| ClientError::Url { url: raw, source })
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        let req = self.http.request(method, url);
        match &self.session_cookie {
            Some(cookie) => req.header(COOKIE, cookie.as_str()),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<(u16, String), ClientError> {
        let resp = req.send().await.map_err(ClientError::Connection)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(ClientError::Connection)?;
        Ok((status, body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let (status, body) = self.send(req).await?;
        decode_body(status, &body)
    }

    async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let (status, body) = self.send(req).await?;
        check_status(status, &body)
    }
}

impl ChatService for HttpChatService {
    async fn user_profile(&self) -> Result<UserProfile, ClientError> {
        let url = self.url("/get_user_profile")?;
        self.send_json(self.request(reqwest::Method::GET, url)).await
    }

    async fn update_gamification(&self, update: GamificationUpdate) -> Result<(), ClientError> {
        let url = self.url("/update_gamification")?;
        self.send_empty(self.request(reqwest::Method::POST, url).json(&update))
            .await
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ClientError> {
        let url = self.url("/chat")?;
        self.send_json(self.request(reqwest::Method::POST, url).json(&request))
            .await
    }

    async fn sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let url = self.url("/get_sessions")?;
        self.send_json(self.request(reqwest::Method::GET, url)).await
    }

    async fn history(&self, session_id: Uuid) -> Result<Vec<HistoryEntry>, ClientError> {
        let mut url = self.url("/get_history")?;
        url.query_pairs_mut()
            .append_pair("session_id", &session_id.to_string());
        self.send_json(self.request(reqwest::Method::GET, url)).await
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), ClientError> {
        let url = self.url(&format!("/delete_session/{session_id}"))?;
        self.send_empty(self.request(reqwest::Method::DELETE, url))
            .await
    }

    async fn edit_message(&self, message_id: &str, new_message: &str) -> Result<(), ClientError> {
        let mut url = self.url("/edit_message")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Decode("base URL cannot carry a path".to_string()))?
            .push(message_id);
        let body = EditMessageRequest {
            new_message: new_message.to_string(),
        };
        self.send_empty(self.request(reqwest::Method::PUT, url).json(&body))
            .await
    }
}

/// `POST /login`. Returns the session cookie to store.
pub async fn login(api_url: &str, username: &str, password: &str) -> Result<String, ClientError> {
    let service = HttpChatService::new(api_url, None);
    let url = service.url("/login")?;
    let resp = service
        .http
        .post(url)
        .json(&CredentialsRequest { username, password })
        .send()
        .await
        .map_err(ClientError::Connection)?;

    let status = resp.status().as_u16();
    let cookie = session_cookie(resp.headers());
    let body = resp.text().await.map_err(ClientError::Connection)?;
    check_credentials_status(status, &body)?;

    cookie.ok_or_else(|| ClientError::Decode("login succeeded but no session cookie was set".to_string()))
}

/// `POST /register`.
pub async fn register(api_url: &str, username: &str, password: &str) -> Result<(), ClientError> {
    let service = HttpChatService::new(api_url, None);
    let url = service.url("/register")?;
    let (status, body) = service
        .send(service.http.post(url).json(&CredentialsRequest { username, password }))
        .await?;
    check_credentials_status(status, &body)
}

/// Collapse every `Set-Cookie` header into a single `Cookie` header value.
fn session_cookie(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

fn check_status(status: u16, body: &str) -> Result<(), ClientError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    if status == 401 {
        return Err(ClientError::AuthRequired);
    }
    Err(ClientError::Backend {
        status,
        message: BackendError::from_body(body).error,
    })
}

/// Login and registration answer 401/409 with a message meant for the user,
/// so no status maps to `AuthRequired` here.
fn check_credentials_status(status: u16, body: &str) -> Result<(), ClientError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    Err(ClientError::Backend {
        status,
        message: BackendError::from_body(body).error,
    })
}

/// Decode a success body as `T`. Some endpoints answer 200 with an `{error}`
/// object instead of the expected payload; that is surfaced as a backend
/// error too.
fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    check_status(status, body)?;
    match serde_json::from_str::<T>(body) {
        Ok(value) => Ok(value),
        Err(decode_err) => match serde_json::from_str::<BackendError>(body) {
            Ok(backend) => Err(ClientError::Backend {
                status,
                message: backend.error,
            }),
            Err(_) => Err(ClientError::Decode(decode_err.to_string())),
        },
    }
}
