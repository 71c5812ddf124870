//! Per-endpoint credential resolution.
//!
//! [`plan`] is the pure decision table: which headers an [`AuthRequirement`]
//! needs given which credentials exist. [`AuthResolver`] turns a plan into
//! header values, obtaining a bearer token only when the plan calls for one.

use std::sync::Arc;
use tracing::debug;

use keysmith_core::{
    AuthRequirement, CredentialKind, CredentialStore, KeysmithError, Result, Sensitive,
    TokenManager, WorkspaceId,
};

use crate::transport::{ApiRequest, API_KEY_HEADER, AUTHORIZATION_HEADER};

/// Which headers a request will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthPlan {
    pub api_key: bool,
    pub token: bool,
}

/// Decide the header set for `requirement`.
///
/// `operation` names the call in the error when a credential is missing.
pub fn plan(
    requirement: AuthRequirement,
    has_api_key: bool,
    has_token: bool,
    operation: &str,
) -> Result<AuthPlan> {
    let missing = |credential| KeysmithError::MissingCredential {
        credential,
        operation: operation.to_string(),
    };

    match requirement {
        AuthRequirement::None => Ok(AuthPlan::default()),
        AuthRequirement::ApiKeyOnly if has_api_key => Ok(AuthPlan { api_key: true, token: false }),
        AuthRequirement::ApiKeyOnly => Err(missing(CredentialKind::ApiKey)),
        AuthRequirement::TokenOnly if has_token => Ok(AuthPlan { api_key: false, token: true }),
        AuthRequirement::TokenOnly => Err(missing(CredentialKind::BearerToken)),
        AuthRequirement::EitherPreferToken if has_token => {
            Ok(AuthPlan { api_key: false, token: true })
        }
        AuthRequirement::EitherPreferToken if has_api_key => {
            Ok(AuthPlan { api_key: true, token: false })
        }
        AuthRequirement::EitherPreferToken => Err(missing(CredentialKind::BearerToken)),
        AuthRequirement::Both if !has_api_key => Err(missing(CredentialKind::ApiKey)),
        AuthRequirement::Both if !has_token => Err(missing(CredentialKind::BearerToken)),
        AuthRequirement::Both => Ok(AuthPlan { api_key: true, token: true }),
    }
}

/// Resolved header values for one request.
#[derive(Debug, Clone, Default)]
pub struct AuthHeaders {
    api_key: Option<Sensitive>,
    authorization: Option<Sensitive>,
}

impl AuthHeaders {
    pub fn api_key(&self) -> Option<&Sensitive> {
        self.api_key.as_ref()
    }

    pub fn authorization(&self) -> Option<&Sensitive> {
        self.authorization.as_ref()
    }

    /// Attach the resolved headers to a request.
    pub fn apply(self, mut request: ApiRequest) -> ApiRequest {
        if let Some(key) = self.api_key {
            request = request.with_header(API_KEY_HEADER, key);
        }
        if let Some(authorization) = self.authorization {
            request = request.with_header(AUTHORIZATION_HEADER, authorization);
        }
        request
    }
}

/// Resolves credentials into headers.
///
/// A workspace token for the target workspace takes priority over the
/// machine-identity session.
pub struct AuthResolver {
    credentials: CredentialStore,
    session: Option<Arc<dyn TokenManager>>,
}

impl AuthResolver {
    pub fn new(credentials: CredentialStore, session: Option<Arc<dyn TokenManager>>) -> Self {
        Self { credentials, session }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Whether a bearer token could be obtained for `workspace`.
    pub fn has_token_source(&self, workspace: Option<&WorkspaceId>) -> bool {
        let workspace_token = workspace
            .map(|w| self.credentials.workspace_token(w).is_some())
            .unwrap_or(false);
        workspace_token || self.session.is_some()
    }

    /// Check a requirement without touching the network.
    pub fn check(
        &self,
        requirement: AuthRequirement,
        workspace: Option<&WorkspaceId>,
        operation: &str,
    ) -> Result<AuthPlan> {
        plan(
            requirement,
            self.credentials.has_api_key(),
            self.has_token_source(workspace),
            operation,
        )
    }

    /// Resolve the headers for one request.
    ///
    /// May log in or renew the session. Call immediately before sending.
    /// Token acquisition errors are surfaced, never replaced by the API key.
    pub async fn resolve(
        &self,
        requirement: AuthRequirement,
        workspace: Option<&WorkspaceId>,
        operation: &str,
    ) -> Result<AuthHeaders> {
        let plan = self.check(requirement, workspace, operation)?;
        let mut headers = AuthHeaders::default();

        if plan.api_key {
            headers.api_key = self.credentials.api_key().cloned();
        }
        if plan.token {
            headers.authorization = Some(self.bearer(workspace, operation).await?);
        }

        debug!(
            operation,
            api_key = plan.api_key,
            token = plan.token,
            "Resolved request credentials"
        );
        Ok(headers)
    }

    async fn bearer(&self, workspace: Option<&WorkspaceId>, operation: &str) -> Result<Sensitive> {
        if let Some(token) = workspace.and_then(|w| self.credentials.workspace_token(w)) {
            return Ok(Sensitive::new(format!("Bearer {}", token.token.expose())));
        }
        match &self.session {
            Some(session) => {
                let token = session.ensure_access_token().await?;
                Ok(Sensitive::new(token.authorization_header()))
            }
            None => Err(KeysmithError::MissingCredential {
                credential: CredentialKind::BearerToken,
                operation: operation.to_string(),
            }),
        }
    }
}
