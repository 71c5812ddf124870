//! Organization and workspace listing. Both need the API key.

use keysmith_core::{AuthRequirement, Result};

use crate::api::{Organization, OrganizationsEnvelope, Workspace, WorkspacesEnvelope};
use crate::client::KeysmithClient;
use crate::transport::ApiRequest;

impl KeysmithClient {
    /// Organizations the API key's user belongs to.
    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let request = ApiRequest::get("/v2/users/me/organizations");
        let envelope: OrganizationsEnvelope = self
            .send(request, AuthRequirement::ApiKeyOnly, None, "list organizations")
            .await?
            .json()?;
        Ok(envelope.organizations)
    }

    /// Workspaces (projects) of an organization, with their environments.
    pub async fn list_workspaces(&self, organization_id: &str) -> Result<Vec<Workspace>> {
        let request = ApiRequest::get("/v2/organizations")
            .with_segment(organization_id)
            .with_segment("workspaces");
        let envelope: WorkspacesEnvelope = self
            .send(request, AuthRequirement::ApiKeyOnly, None, "list workspaces")
            .await?
            .json()?;
        Ok(envelope.workspaces)
    }
}
