//! Depth-first enumeration of a workspace's folder tree.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{KeysmithError, Result};
use crate::model::WorkspaceId;
use crate::path::{Folder, FolderPath};

/// Lists the immediate child folders of a path.
#[async_trait]
pub trait FolderSource: Send + Sync {
    async fn folder_children(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        path: &FolderPath,
    ) -> Result<Vec<Folder>>;
}

/// Collect every folder path under `start`, excluding `start` itself.
///
/// Each folder's children are appended in listing order before any of them
/// is descended into, so root -> {A, B}, A -> {A1} yields
/// `["/A", "/B", "/A/A1"]`. A listing failure at any node aborts the walk
/// with [`KeysmithError::TraversalFailed`] and discards what was collected.
pub async fn walk_folders<S>(
    source: &S,
    workspace: &WorkspaceId,
    environment: &str,
    start: &FolderPath,
) -> Result<Vec<FolderPath>>
where
    S: FolderSource + ?Sized,
{
    let mut found = Vec::new();
    let mut pending: Vec<std::vec::IntoIter<FolderPath>> = Vec::new();
    let mut current = Some(start.clone());

    loop {
        if let Some(path) = current.take() {
            let children = source
                .folder_children(workspace, environment, &path)
                .await
                .map_err(|source| KeysmithError::TraversalFailed {
                    path: path.to_string(),
                    source: Box::new(source),
                })?;
            debug!(path = %path, children = children.len(), "Listed folder");

            // A nameless child would resolve back to its parent.
            let child_paths: Vec<FolderPath> = children
                .iter()
                .filter(|child| !child.name.trim().is_empty())
                .map(|child| path.join(&child.name))
                .collect();
            found.extend(child_paths.iter().cloned());
            pending.push(child_paths.into_iter());
        }

        match pending.last_mut() {
            Some(siblings) => match siblings.next() {
                Some(next) => current = Some(next),
                None => {
                    pending.pop();
                }
            },
            None => break,
        }
    }

    Ok(found)
}
