//! Session token for machine-identity access.
//!
//! This module provides:
//! - [`SessionToken`] - A bearer token with its absolute expiry
//! - [`TokenInfo`] - Introspection info about the cached token
//! - [`TokenManager`] - Trait for session token lifecycle management

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{KeysmithError, Result};
use crate::sensitive::Sensitive;

/// A bearer token issued by login or renewal.
///
/// Tokens are replaced wholesale and never modified after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// The token value.
    pub access_token: Sensitive,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// Instant from which the token must not be used.
    pub expires_at: DateTime<Utc>,

    /// Upper bound on the lifetime reachable through renewals.
    pub max_ttl: Duration,

    /// When this token was received.
    pub issued_at: DateTime<Utc>,
}

impl SessionToken {
    /// Build a token received at `issued_at` that lives `expires_in` seconds.
    ///
    /// Lifetimes come from the service; values that do not fit a timestamp
    /// are rejected with `InvalidTokenLifetime`.
    pub fn issued(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in: i64,
        max_ttl: i64,
    ) -> Result<Self> {
        let invalid = || KeysmithError::InvalidTokenLifetime {
            expires_in,
            max_ttl,
        };
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(invalid)?;
        let max_ttl = Duration::try_seconds(max_ttl).ok_or_else(invalid)?;

        Ok(Self {
            access_token: Sensitive::new(access_token),
            token_type: token_type.into(),
            expires_at,
            max_ttl,
            issued_at,
        })
    }

    /// Whether the token is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if this token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if this token will expire within the given duration.
    pub fn expires_within(&self, duration: Duration) -> bool {
        Utc::now()
            .checked_add_signed(duration)
            .is_none_or(|deadline| self.is_expired_at(deadline))
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }
}

/// Information about the cached session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Whether the token is currently usable.
    pub active: bool,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// When this token expires.
    pub expires_at: DateTime<Utc>,

    /// When this token was received.
    pub issued_at: DateTime<Utc>,
}

impl From<&SessionToken> for TokenInfo {
    fn from(token: &SessionToken) -> Self {
        Self {
            active: !token.is_expired(),
            token_type: token.token_type.clone(),
            expires_at: token.expires_at,
            issued_at: token.issued_at,
        }
    }
}

/// Trait for managing the session token lifecycle.
///
/// Implementations hold one token at a time and swap it atomically.
///
/// # Example
///
/// ```rust,ignore
/// use keysmith_core::TokenManager;
///
/// async fn bearer(manager: &impl TokenManager) -> keysmith_core::Result<String> {
///     let token = manager.ensure_access_token().await?;
///     Ok(token.authorization_header())
/// }
/// ```
#[async_trait]
pub trait TokenManager: Send + Sync {
    /// Get a usable token, logging in or renewing as needed.
    ///
    /// With no cached token this logs in. With an expired token this renews
    /// it; a failed renewal surfaces `TokenRefreshFailed` and does not log in
    /// again on its own. Call this immediately before building the request
    /// header that carries the token.
    async fn ensure_access_token(&self) -> Result<Arc<SessionToken>>;

    /// Start a new session, replacing any cached token.
    async fn login(&self) -> Result<Arc<SessionToken>>;

    /// Introspect the cached token without contacting the service.
    ///
    /// Returns `None` if no session has been established.
    async fn introspect(&self) -> Option<TokenInfo>;
}
