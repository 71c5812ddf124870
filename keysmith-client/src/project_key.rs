//! Per-workspace project key resolution.
//!
//! The project key of an E2EE workspace is sealed inside its service-token
//! metadata under the last `.` segment of the workspace token. It is fetched
//! and opened on first use and kept for the lifetime of the client.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use keysmith_core::crypto::decrypt_project_key;
use keysmith_core::{
    AuthRequirement, CredentialKind, KeysmithError, ProjectKey, Result, WorkspaceId,
};

use crate::api::ServiceToken;
use crate::auth::AuthResolver;
use crate::transport::{ApiRequest, Transport};

const SERVICE_TOKEN_PATH: &str = "/v2/service-token/";

/// Fetch service-token metadata for the workspace token of `workspace`.
pub(crate) async fn fetch_service_token(
    transport: &dyn Transport,
    auth: &AuthResolver,
    workspace: &WorkspaceId,
) -> Result<ServiceToken> {
    let headers = auth
        .resolve(AuthRequirement::TokenOnly, Some(workspace), "retrieve service token")
        .await?;
    transport
        .execute(headers.apply(ApiRequest::get(SERVICE_TOKEN_PATH)))
        .await?
        .json()
}

/// Caches one project key per workspace.
///
/// Resolution for a workspace is single-flight; a failed attempt leaves the
/// slot empty so the next call tries again.
#[derive(Default)]
pub struct ProjectKeyCache {
    slots: Mutex<HashMap<WorkspaceId, Arc<OnceCell<Arc<ProjectKey>>>>>,
}

impl ProjectKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, workspace: &WorkspaceId) -> Arc<OnceCell<Arc<ProjectKey>>> {
        Arc::clone(self.slots.lock().entry(workspace.clone()).or_default())
    }

    /// Whether a key for `workspace` has been resolved.
    pub fn contains(&self, workspace: &WorkspaceId) -> bool {
        self.slots
            .lock()
            .get(workspace)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Return the cached key for `workspace`, resolving it on first use.
    pub async fn resolve(
        &self,
        transport: &dyn Transport,
        auth: &AuthResolver,
        workspace: &WorkspaceId,
    ) -> Result<Arc<ProjectKey>> {
        let slot = self.slot(workspace);
        if let Some(key) = slot.get() {
            debug!(workspace = %workspace, "Using cached project key");
            return Ok(Arc::clone(key));
        }

        let key = slot
            .get_or_try_init(|| async {
                resolve_project_key(transport, auth, workspace)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(key))
    }
}

/// Fetch the service-token metadata and open the project key.
async fn resolve_project_key(
    transport: &dyn Transport,
    auth: &AuthResolver,
    workspace: &WorkspaceId,
) -> Result<ProjectKey> {
    let token = auth
        .credentials()
        .workspace_token(workspace)
        .ok_or_else(|| KeysmithError::MissingCredential {
            credential: CredentialKind::WorkspaceToken,
            operation: format!("decrypting secrets of workspace {}", workspace),
        })?;

    let metadata = fetch_service_token(transport, auth, workspace).await?;
    let sealed = metadata.key_material()?;

    let key = decrypt_project_key(token.token.expose(), &sealed).map_err(|source| {
        KeysmithError::ProjectKeyDecryptionFailed {
            workspace: workspace.to_string(),
            source,
        }
    })?;
    info!(workspace = %workspace, "Resolved project key");
    Ok(key)
}
