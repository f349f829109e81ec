/**
 * Account API
 *
 * Login, registration, logout and the current-user lookup. Login stores the
 * returned token in the session; logout always clears it.
 */

use crate::client::http::{ApiClient, Auth};
use crate::client::membership::MembershipCache;
use crate::client::types::{LoginRequest, LoginResponse, RegisterRequest, UserProfile};
use crate::shared::error::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct AccountApi {
    api: ApiClient,
    cache: MembershipCache,
}

impl AccountApi {
    pub fn new(api: ApiClient, cache: MembershipCache) -> Self {
        Self { api, cache }
    }

    /// Log in and keep the returned token as the session credential
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<String> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let value = self
            .api
            .post("/api/login", Some(&request), Auth::Public)
            .await
            .map_err(|e| {
                tracing::warn!("[Auth] Login failed for {}: {}", email, e);
                e
            })?;

        let response: LoginResponse = serde_json::from_value(value)?;
        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::malformed("login response has no token"))?;

        // A previous user's memberships must not leak into this session
        self.cache.reset().await;
        self.api.session().set_credential(token.clone()).await?;
        tracing::info!("[Auth] Logged in as {}", email);
        Ok(token)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<()> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.api
            .post("/api/register", Some(&request), Auth::Public)
            .await?;
        tracing::info!("[Auth] Registered account {}", email);
        Ok(())
    }

    /// Log out. The credential is cleared and the cache reset whatever the
    /// server answers; the server's result is returned afterwards.
    pub async fn logout(&self) -> ClientResult<()> {
        let remote = self
            .api
            .post("/api/logout", None::<&()>, Auth::Bearer)
            .await
            .map(|_| ());

        let cleared = self.api.session().clear().await;
        self.cache.reset().await;

        match &remote {
            Ok(()) => tracing::info!("[Auth] Logged out"),
            Err(e) => tracing::warn!("[Auth] Logout request failed, credential cleared anyway: {}", e),
        }
        remote.and(cleared)
    }

    pub async fn me(&self) -> ClientResult<UserProfile> {
        self.api.get_json("/api/me", Auth::Bearer).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.api.session().is_authenticated().await
    }
}
