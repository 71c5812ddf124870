//! Folder listing and management.

use async_trait::async_trait;
use tracing::info;

use keysmith_core::{
    walk_folders, AuthRequirement, Folder, FolderPath, FolderSource, Result, WorkspaceId,
};

use crate::api::{CreateFolderBody, DeleteFolderBody, FolderEnvelope, FoldersEnvelope, UpdateFolderBody};
use crate::client::KeysmithClient;
use crate::transport::ApiRequest;

const FOLDERS_PATH: &str = "/v1/folders";

impl KeysmithClient {
    /// List the immediate child folders of `parent`.
    ///
    /// Each returned folder has `path` filled in.
    pub async fn list_folders(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        parent: &FolderPath,
    ) -> Result<Vec<Folder>> {
        let request = ApiRequest::get(FOLDERS_PATH)
            .with_query("workspaceId", workspace.as_str())
            .with_query("environment", environment)
            .with_query("path", parent.as_str());

        let envelope: FoldersEnvelope = self
            .send(request, AuthRequirement::EitherPreferToken, Some(workspace), "list folders")
            .await?
            .json()?;

        Ok(envelope
            .folders
            .into_iter()
            .map(|mut folder| {
                folder.path = Some(parent.join(&folder.name));
                folder
            })
            .collect())
    }

    /// Every folder path below the root, in walk order.
    pub async fn list_all_folder_paths(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
    ) -> Result<Vec<FolderPath>> {
        walk_folders(self, workspace, environment, &FolderPath::root()).await
    }

    /// Create a folder named `name` under `parent`.
    pub async fn create_folder(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        name: &str,
        parent: &FolderPath,
    ) -> Result<Folder> {
        let body = CreateFolderBody {
            workspace_id: workspace.as_str(),
            environment,
            name,
            path: parent.as_str(),
        };
        let request = ApiRequest::post(FOLDERS_PATH).with_json(&body)?;

        let mut folder = self
            .send(request, AuthRequirement::EitherPreferToken, Some(workspace), "create folder")
            .await?
            .json::<FolderEnvelope>()?
            .folder;
        folder.path = Some(parent.join(&folder.name));

        info!(workspace = %workspace, path = %parent.join(name), "Created folder");
        Ok(folder)
    }

    /// Rename the folder `folder_id` under `parent` to `name`.
    pub async fn update_folder(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        folder_id: &str,
        name: &str,
        parent: &FolderPath,
    ) -> Result<Folder> {
        let body = UpdateFolderBody {
            workspace_id: workspace.as_str(),
            environment,
            name,
            path: parent.as_str(),
        };
        let request = ApiRequest::patch(FOLDERS_PATH)
            .with_segment(folder_id)
            .with_json(&body)?;

        let mut folder = self
            .send(request, AuthRequirement::EitherPreferToken, Some(workspace), "update folder")
            .await?
            .json::<FolderEnvelope>()?
            .folder;
        folder.path = Some(parent.join(&folder.name));

        info!(workspace = %workspace, folder_id, "Renamed folder");
        Ok(folder)
    }

    /// Delete the folder `folder_id` under `parent`.
    pub async fn delete_folder(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        folder_id: &str,
        parent: &FolderPath,
    ) -> Result<()> {
        let body = DeleteFolderBody {
            workspace_id: workspace.as_str(),
            environment,
            path: parent.as_str(),
        };
        let request = ApiRequest::delete(FOLDERS_PATH)
            .with_segment(folder_id)
            .with_json(&body)?;

        self.send(request, AuthRequirement::EitherPreferToken, Some(workspace), "delete folder")
            .await?;

        info!(workspace = %workspace, folder_id, "Deleted folder");
        Ok(())
    }
}

#[async_trait]
impl FolderSource for KeysmithClient {
    async fn folder_children(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        path: &FolderPath,
    ) -> Result<Vec<Folder>> {
        self.list_folders(workspace, environment, path).await
    }
}
