use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::errors::CoreError;
use crate::models::auth::{Credentials, Registration, TokenResponse, User};

/// Account endpoints under `/auth`.
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Log in with username (or e-mail) and password, then load the user.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, CoreError> {
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let tokens: TokenResponse = self.client.post_form("/auth/login", &form).await?;
        self.client.session().set_token(&tokens.access_token)?;
        log::info!("Logged in as {}", credentials.username);
        self.me().await
    }

    /// Create an account. The backend logs the new user in right away.
    pub async fn register(&self, registration: &Registration) -> Result<User, CoreError> {
        let tokens: TokenResponse = self
            .client
            .post_public("/auth/register", registration)
            .await?;
        self.client.session().set_token(&tokens.access_token)?;
        log::info!("Registered account {}", registration.username);
        self.me().await
    }

    /// Trade the refresh cookie for a fresh access token.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.client.refresh_token().await.map(|_| ())
    }

    /// End the session. The local token is dropped even if the backend call fails.
    pub async fn logout(&self) -> Result<(), CoreError> {
        if let Err(e) = self.client.post_empty("/auth/logout").await {
            log::warn!("Logout request failed: {e}");
        }
        self.client.session().teardown()
    }

    /// The logged-in user.
    pub async fn me(&self) -> Result<User, CoreError> {
        if !self.client.session().is_authenticated() {
            return Err(CoreError::Unauthorized("no access token".into()));
        }
        self.client.get("/auth/me").await
    }
}
