//! The client facade and its builder.

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use keysmith_core::{
    AuthRequirement, Credential, CredentialKind, CredentialStore, KeysmithError, MachineIdentity,
    ProjectKey, Result, Sensitive, SessionToken, TokenInfo, TokenManager, WorkspaceId,
    WorkspaceToken,
};

use crate::api::ServiceToken;
use crate::auth::AuthResolver;
use crate::config::ClientConfig;
use crate::project_key::{fetch_service_token, ProjectKeyCache};
use crate::session::SessionManager;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Client for a remote secrets-management service.
///
/// Credentials are fixed at construction. The client owns the session token
/// and the per-workspace project keys; it is cheap to share behind an `Arc`
/// and safe to use from concurrent tasks.
///
/// # Example
///
/// ```no_run
/// use keysmith_client::{KeysmithClient, ListSecretsOptions};
///
/// #[tokio::main]
/// async fn main() -> keysmith_client::Result<()> {
///     let client = KeysmithClient::builder()
///         .machine_identity("client-id", "client-secret")
///         .build()?;
///
///     let secrets = client
///         .retrieve_secrets(&"workspace-id".into(), "dev", &ListSecretsOptions::new())
///         .await?;
///     for secret in secrets {
///         println!("{}", secret.key_path());
///     }
///     Ok(())
/// }
/// ```
pub struct KeysmithClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) auth: AuthResolver,
    session: Option<Arc<SessionManager>>,
    pub(crate) project_keys: ProjectKeyCache,
}

impl KeysmithClient {
    pub fn builder() -> KeysmithClientBuilder {
        KeysmithClientBuilder::new()
    }

    /// Build a client from a loaded configuration file.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = KeysmithClientBuilder::new()
            .credentials(config.credentials())
            .base_url(config.base_url.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .verbose(config.verbose);
        if let Some(secs) = config.expiry_buffer_secs {
            let buffer = ChronoDuration::try_seconds(secs).ok_or_else(|| KeysmithError::Config {
                message: format!("expiry_buffer_secs out of range: {}", secs),
            })?;
            builder = builder.expiry_buffer(buffer);
        }
        builder.build()
    }

    /// The credentials this client was built with.
    pub fn credentials(&self) -> &CredentialStore {
        self.auth.credentials()
    }

    /// Start a new machine-identity session, replacing the cached token.
    ///
    /// Use this to recover after `TokenRefreshFailed`.
    pub async fn login(&self) -> Result<Arc<SessionToken>> {
        match &self.session {
            Some(session) => session.login().await,
            None => Err(KeysmithError::MissingCredential {
                credential: CredentialKind::MachineIdentity,
                operation: "login".to_string(),
            }),
        }
    }

    /// Introspect the cached session token, if any.
    pub async fn session_info(&self) -> Option<TokenInfo> {
        match &self.session {
            Some(session) => session.introspect().await,
            None => None,
        }
    }

    /// Whether secrets of `workspace` are end-to-end encrypted.
    pub fn is_e2ee(&self, workspace: &WorkspaceId) -> bool {
        self.credentials().is_e2ee(workspace)
    }

    /// Service-token metadata for the configured token of `workspace`.
    pub async fn retrieve_service_token(&self, workspace: &WorkspaceId) -> Result<ServiceToken> {
        fetch_service_token(self.transport.as_ref(), &self.auth, workspace).await
    }

    /// The project key of an E2EE workspace, resolved on first use.
    pub async fn project_key(&self, workspace: &WorkspaceId) -> Result<Arc<ProjectKey>> {
        self.project_keys
            .resolve(self.transport.as_ref(), &self.auth, workspace)
            .await
    }

    /// Authorize, send, and reject non-2xx answers.
    pub(crate) async fn send(
        &self,
        request: ApiRequest,
        requirement: AuthRequirement,
        workspace: Option<&WorkspaceId>,
        operation: &str,
    ) -> Result<ApiResponse> {
        let headers = self.auth.resolve(requirement, workspace, operation).await?;
        debug!(operation, method = %request.method, path = %request.path, "Issuing request");
        self.transport
            .execute(headers.apply(request))
            .await?
            .error_for_status()
    }
}

/// Builder for [`KeysmithClient`].
pub struct KeysmithClientBuilder {
    credentials: CredentialStore,
    base_url: String,
    timeout: Duration,
    verbose: bool,
    expiry_buffer: ChronoDuration,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for KeysmithClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeysmithClientBuilder {
    pub fn new() -> Self {
        Self {
            credentials: CredentialStore::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
            expiry_buffer: ChronoDuration::zero(),
            transport: None,
        }
    }

    /// Replace all credentials at once.
    pub fn credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.credentials = self
            .credentials
            .with(Credential::ApiKey(Sensitive::new(api_key)));
        self
    }

    pub fn workspace_token(mut self, workspace: impl Into<WorkspaceId>, token: WorkspaceToken) -> Self {
        self.credentials = self.credentials.with(Credential::WorkspaceToken {
            workspace: workspace.into(),
            token,
        });
        self
    }

    pub fn machine_identity(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.credentials = self
            .credentials
            .with(Credential::MachineIdentity(MachineIdentity::new(client_id, client_secret)));
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dump requests and responses (never headers) at debug level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Renew session tokens this long before they expire.
    pub fn expiry_buffer(mut self, buffer: ChronoDuration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Use a custom transport instead of HTTP. `base_url`, `timeout` and
    /// `verbose` are then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<KeysmithClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransport::new(&self.base_url, self.timeout)?.with_verbose(self.verbose),
            ),
        };

        let session = self.credentials.machine_identity().cloned().map(|identity| {
            Arc::new(
                SessionManager::new(identity, Arc::clone(&transport))
                    .with_expiry_buffer(self.expiry_buffer),
            )
        });
        let token_manager = session
            .as_ref()
            .map(|session| Arc::clone(session) as Arc<dyn TokenManager>);

        Ok(KeysmithClient {
            auth: AuthResolver::new(self.credentials, token_manager),
            transport,
            session,
            project_keys: ProjectKeyCache::new(),
        })
    }
}
