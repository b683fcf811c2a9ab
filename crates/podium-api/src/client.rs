//! The API client: one method per endpoint.

use std::sync::Arc;

use podium_protocol::{
    validate_score, Codec, ConfirmRequest, ErrorBody, JsonCodec, LoginRequest,
    LoginResponse, MessageResponse, NotificationKind, ProfileResponse,
    ProtocolError, RegisterRequest, RegisterResponse, SubmissionStatus,
    SubmitScoreRequest, TestNotificationRequest, TopScoreResponse,
    TopScoresResponse, VerifyResponse,
};
use podium_transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::ApiError;

/// Where the API lives when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/dev";

/// Typed client for the leaderboard API.
///
/// Cloning is cheap and clones share the transport, so a clone can be moved
/// into every spawned fetch.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), podium_api::ApiError> {
/// use podium_api::ApiClient;
/// use podium_transport::ReqwestTransport;
///
/// let api = ApiClient::new(ReqwestTransport::new()?, "https://api.example.com/dev");
/// let board = api.get_top_scores(10).await?;
/// for entry in board.top_scores {
///     println!("{} {}", entry.username, entry.score);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApiClient<T, C = JsonCodec> {
    inner: Arc<Inner<T, C>>,
}

struct Inner<T, C> {
    transport: T,
    codec: C,
    base_url: String,
}

impl<T, C> Clone for ApiClient<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: HttpTransport> ApiClient<T, JsonCodec> {
    /// Creates a client for `base_url`. A trailing slash is ignored.
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self::with_codec(transport, JsonCodec, base_url)
    }
}

impl<T: HttpTransport, C: Codec> ApiClient<T, C> {
    /// Creates a client with a custom body codec.
    pub fn with_codec(transport: T, codec: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(Inner {
                transport,
                codec,
                base_url,
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    // -- auth ---------------------------------------------------------------

    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, ApiError> {
        self.post("/api/auth/register", None, Some(request)).await
    }

    pub async fn confirm_email(
        &self,
        request: &ConfirmRequest,
    ) -> Result<MessageResponse, ApiError> {
        self.post("/api/auth/confirm", None, Some(request)).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post("/api/auth/login", None, Some(request)).await
    }

    /// Checks that `token` is still accepted and returns who it belongs to.
    pub async fn verify_token(&self, token: &str) -> Result<VerifyResponse, ApiError> {
        self.post::<_, ()>("/api/auth/verify", Some(token), None).await
    }

    pub async fn get_profile(&self, token: &str) -> Result<ProfileResponse, ApiError> {
        self.get("/api/auth/profile", Some(token)).await
    }

    // -- leaderboard --------------------------------------------------------

    /// The single best score, if any has been posted.
    pub async fn get_top_score(&self) -> Result<TopScoreResponse, ApiError> {
        self.get("/api/leaderboard/top", None).await
    }

    /// The top `limit` scores in server order.
    pub async fn get_top_scores(&self, limit: usize) -> Result<TopScoresResponse, ApiError> {
        self.get(&format!("/api/leaderboard/top/{limit}"), None).await
    }

    /// Connection statistics of the push service.
    pub async fn get_ws_stats(&self) -> Result<Value, ApiError> {
        self.get("/api/leaderboard/ws/stats", None).await
    }

    /// Asks the server to broadcast a `notification` event to every
    /// subscriber of the leaderboard channel.
    pub async fn send_test_notification(
        &self,
        message: &str,
        kind: NotificationKind,
    ) -> Result<Value, ApiError> {
        let body = TestNotificationRequest {
            message: message.to_string(),
            kind,
        };
        self.post("/api/leaderboard/ws/test-notification", None, Some(&body))
            .await
    }

    /// Asks the server to push the current leaderboard to every subscriber.
    pub async fn broadcast_leaderboard_update(&self) -> Result<Value, ApiError> {
        self.post::<_, ()>("/api/leaderboard/ws/broadcast-leaderboard", None, None)
            .await
    }

    // -- scores -------------------------------------------------------------

    /// Posts a score. The range is checked before anything is sent.
    ///
    /// The success body is server-defined and returned untouched.
    pub async fn submit_score(&self, score: u64, token: &str) -> Result<Value, ApiError> {
        let score = validate_score(score)?;
        self.post(
            "/api/scores/submit",
            Some(token),
            Some(&SubmitScoreRequest { score }),
        )
        .await
    }

    /// Whether the signed-in player may submit right now.
    pub async fn can_submit(&self, token: &str) -> Result<SubmissionStatus, ApiError> {
        self.get("/api/scores/can-submit", Some(token)).await
    }

    /// The signed-in player's own score record (server-defined shape).
    pub async fn get_my_score(&self, token: &str) -> Result<Value, ApiError> {
        self.get("/api/scores/my-score", Some(token)).await
    }

    // -- plumbing -----------------------------------------------------------

    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<R, ApiError> {
        let request = self.request(Method::Get, path, token);
        self.execute(request).await
    }

    async fn post<R: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<R, ApiError> {
        let mut request = self
            .request(Method::Post, path, token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.body(self.inner.codec.encode(body)?);
        }
        self.execute(request).await
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> HttpRequest {
        let request = HttpRequest::new(method, format!("{}{path}", self.inner.base_url))
            .header("Accept", "application/json");
        match token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn execute<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let endpoint = format!("{} {}", request.method, request.path());
        tracing::debug!(%endpoint, "api request");

        let response = self.inner.transport.send(request).await.map_err(|e| {
            tracing::warn!(%endpoint, error = %e, "api request failed");
            ApiError::Network(e)
        })?;

        self.parse(&endpoint, response)
    }

    fn parse<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: HttpResponse,
    ) -> Result<R, ApiError> {
        if !response.is_success() {
            let message = self.server_message(&response);
            tracing::debug!(endpoint, status = response.status, %message, "api error response");
            return Err(ApiError::Server {
                status: response.status,
                message,
            });
        }

        let empty = || ApiError::EmptyResponse {
            endpoint: endpoint.to_string(),
        };
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Err(empty());
        }
        let value: Value = self
            .inner
            .codec
            .decode(&response.body)
            .map_err(|_| empty())?;
        if value.is_null() {
            return Err(empty());
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::Protocol(ProtocolError::Decode(e)))
    }

    fn server_message(&self, response: &HttpResponse) -> String {
        self.inner
            .codec
            .decode::<ErrorBody>(&response.body)
            .ok()
            .and_then(|body| body.error)
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| format!("{} {}", response.status, response.reason).trim_end().to_string())
    }
}
