//! Machine-identity session management.
//!
//! [`SessionManager`] implements [`TokenManager`]: it logs in with the
//! configured client id/secret, caches the session token, and renews it once
//! it has expired.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use keysmith_core::{
    KeysmithError, MachineIdentity, Result, SessionToken, TokenInfo, TokenManager,
};

use crate::transport::{ApiRequest, Transport};

const LOGIN_PATH: &str = "/v1/auth/universal-auth/login";
const RENEW_PATH: &str = "/v1/auth/token/renew";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewRequest<'a> {
    access_token: &'a str,
}

/// Body returned by both login and renewal.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default, rename = "accessTokenMaxTTL")]
    access_token_max_ttl: i64,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    fn into_token(self) -> Result<SessionToken> {
        SessionToken::issued(
            self.access_token,
            self.token_type,
            Utc::now(),
            self.expires_in,
            self.access_token_max_ttl,
        )
    }
}

/// Token manager for a universal-auth machine identity.
///
/// The cached token sits behind an async mutex that is held across the
/// login or renewal round trip, so concurrent callers that find it expired
/// share one renewal.
pub struct SessionManager {
    identity: MachineIdentity,
    transport: Arc<dyn Transport>,
    current: Mutex<Option<Arc<SessionToken>>>,
    expiry_buffer: Duration,
}

impl SessionManager {
    pub fn new(identity: MachineIdentity, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity,
            transport,
            current: Mutex::new(None),
            expiry_buffer: Duration::zero(),
        }
    }

    /// Treat tokens as expired this long before their actual expiry.
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    fn is_stale(&self, token: &SessionToken) -> bool {
        token.expires_within(self.expiry_buffer)
    }

    async fn request_login(&self) -> Result<SessionToken> {
        let body = LoginRequest {
            client_id: &self.identity.client_id,
            client_secret: self.identity.client_secret.expose(),
        };
        let request = ApiRequest::post(LOGIN_PATH).with_json(&body)?;

        self.transport
            .execute(request)
            .await
            .and_then(|response| response.json::<TokenResponse>())
            .and_then(TokenResponse::into_token)
            .map_err(|e| KeysmithError::AuthenticationFailed {
                message: e.to_string(),
            })
    }

    async fn request_renewal(&self, token: &SessionToken) -> Result<SessionToken> {
        let body = RenewRequest {
            access_token: token.access_token.expose(),
        };
        let request = ApiRequest::post(RENEW_PATH).with_json(&body)?;

        self.transport
            .execute(request)
            .await
            .and_then(|response| response.json::<TokenResponse>())
            .and_then(TokenResponse::into_token)
            .map_err(|e| KeysmithError::TokenRefreshFailed {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl TokenManager for SessionManager {
    async fn ensure_access_token(&self) -> Result<Arc<SessionToken>> {
        let mut current = self.current.lock().await;

        let next = match current.as_ref() {
            Some(token) if !self.is_stale(token) => {
                debug!(expires_at = %token.expires_at, "Using cached session token");
                return Ok(Arc::clone(token));
            }
            Some(token) => {
                info!(client_id = %self.identity.client_id, "Session token expired, renewing");
                self.request_renewal(token).await.map_err(|e| {
                    error!("Session token renewal failed: {}", e);
                    e
                })?
            }
            None => {
                info!(client_id = %self.identity.client_id, "Logging in with machine identity");
                self.request_login().await?
            }
        };

        let next = Arc::new(next);
        *current = Some(Arc::clone(&next));
        Ok(next)
    }

    async fn login(&self) -> Result<Arc<SessionToken>> {
        let mut current = self.current.lock().await;
        info!(client_id = %self.identity.client_id, "Logging in with machine identity");

        let token = Arc::new(self.request_login().await?);
        *current = Some(Arc::clone(&token));
        Ok(token)
    }

    async fn introspect(&self) -> Option<TokenInfo> {
        self.current
            .lock()
            .await
            .as_deref()
            .map(TokenInfo::from)
    }
}
