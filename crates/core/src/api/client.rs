use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::api::session::Session;
use crate::errors::CoreError;
use crate::models::auth::TokenResponse;
use crate::models::settings::Settings;

const REFRESH_PATH: &str = "/auth/refresh";

/// HTTP client for the portfolio backend.
///
/// Authenticated calls carry `Authorization: Bearer <token>` from the shared
/// [`Session`]. When the backend answers 401, the client refreshes the access
/// token once (the refresh token travels as an HTTP-only cookie) and replays
/// the request. If the refresh fails, or the replay is rejected again, the
/// session is torn down and the call fails with [`CoreError::SessionExpired`].
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiClient {
    pub fn new(settings: &Settings, session: Arc<Session>) -> Result<Self, CoreError> {
        settings.validate()?;

        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .cookie_store(true);

        Ok(Self {
            http: builder.build()?,
            base_url: settings.base_url().to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Authenticated requests ──────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoreError> {
        let response = self.execute_authorized(Method::GET, path, None).await?;
        decode(path, response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_json(path, body)?;
        let response = self.execute_authorized(Method::POST, path, Some(&body)).await?;
        decode(path, response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = to_json(path, body)?;
        let response = self.execute_authorized(Method::PUT, path, Some(&body)).await?;
        decode(path, response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), CoreError> {
        let response = self.execute_authorized(Method::DELETE, path, None).await?;
        expect_success(path, response).await
    }

    /// POST without a meaningful response body.
    pub async fn post_empty(&self, path: &str) -> Result<(), CoreError> {
        let body = serde_json::json!({});
        let response = self.execute_authorized(Method::POST, path, Some(&body)).await?;
        expect_success(path, response).await
    }

    // ── Anonymous requests (login, register, market data) ───────────

    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoreError> {
        let response = self.http.get(self.url(path)).send().await?;
        decode(path, response).await
    }

    /// GET a public route ending in a caller-supplied segment, which is
    /// percent-encoded so `/`, `?` and `#` stay inside it.
    pub async fn get_public_segment<T: DeserializeOwned>(
        &self,
        prefix: &str,
        segment: &str,
    ) -> Result<T, CoreError> {
        let url = self.segment_url(prefix, segment)?;
        let path = url.path().to_string();
        let response = self.http.get(url).send().await?;
        decode(&path, response).await
    }

    pub async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        decode(path, response).await
    }

    pub async fn post_form<B, T>(&self, path: &str, form: &B) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(self.url(path)).form(form).send().await?;
        decode(path, response).await
    }

    /// Exchange the refresh cookie for a new access token and store it.
    pub async fn refresh_token(&self) -> Result<String, CoreError> {
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let tokens: TokenResponse = decode(REFRESH_PATH, response).await?;
        self.session.set_token(&tokens.access_token)?;
        Ok(tokens.access_token)
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn execute_authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, CoreError> {
        let response = self
            .build(method.clone(), path, body, self.session.token())
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        log::info!("{path} answered 401, refreshing access token");
        let token = match self.refresh_token().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Access token refresh failed: {e}");
                self.end_session();
                return Err(CoreError::SessionExpired);
            }
        };

        let retried = self.build(method, path, body, Some(token)).send().await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            log::warn!("{path} still unauthorized after token refresh");
            self.end_session();
            return Err(CoreError::SessionExpired);
        }
        Ok(retried)
    }

    fn build(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<String>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    fn segment_url(&self, prefix: &str, segment: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.url(prefix))
            .map_err(|e| CoreError::Validation(format!("Invalid API URL '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| {
                CoreError::Validation(format!("API URL '{}' cannot carry a path", self.base_url))
            })?
            .push(segment);
        Ok(url)
    }

    fn end_session(&self) {
        if let Err(e) = self.session.teardown() {
            log::warn!("Failed to clear stored access token: {e}");
        }
    }
}

fn to_json<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(body)
        .map_err(|e| CoreError::Serialization(format!("Failed to encode request for {path}: {e}")))
}

/// Parse a successful JSON response, or turn an error status into `CoreError::Api`.
async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, CoreError> {
    let response = check_status(path, response).await?;
    response
        .json()
        .await
        .map_err(|e| CoreError::Deserialization(format!("Unexpected response from {path}: {e}")))
}

async fn expect_success(path: &str, response: Response) -> Result<(), CoreError> {
    check_status(path, response).await.map(|_| ())
}

async fn check_status(path: &str, response: Response) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => text,
    };

    Err(CoreError::Api {
        endpoint: path.to_string(),
        status: status.as_u16(),
        message,
    })
}
