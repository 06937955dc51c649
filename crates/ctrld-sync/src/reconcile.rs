use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::api::{PolicyApi, RequestError};
use crate::definition::{ActionMode, ActionStatus};

/// Default wait after a folder is created, so the remote index catches up
/// before rules are pushed against the new id.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// The remote state could not be enumerated.
#[derive(Debug, thiserror::Error)]
#[error("failed to list folders: {0}")]
pub struct ListError(#[from] pub RequestError);

/// A folder could not be created, or could not be found after creation.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("create request failed: {0}")]
    Request(RequestError),

    #[error("failed to list folders after creation: {0}")]
    Relist(ListError),

    #[error("folder '{0}' was not found after creation")]
    NotFound(String),
}

/// Every hostname already present in a profile, root scope included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleIndex {
    hostnames: HashSet<String>,
}

impl RuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.hostnames.contains(hostname)
    }

    pub fn len(&self) -> usize {
        self.hostnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RuleIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            hostnames: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for RuleIndex {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.hostnames.extend(iter.into_iter().map(Into::into));
    }
}

/// List, delete and create folders in one profile.
pub struct FolderReconciler<'a> {
    api: &'a dyn PolicyApi,
    settle_delay: Duration,
}

impl<'a> FolderReconciler<'a> {
    pub fn new(api: &'a dyn PolicyApi, settle_delay: Duration) -> Self {
        Self { api, settle_delay }
    }

    /// Map of trimmed folder name to id. Entries without a name or id are
    /// dropped; if a name repeats, the last id seen wins.
    pub async fn list_folders(&self, profile: &str) -> Result<HashMap<String, String>, ListError> {
        let folders = self.api.list_folders(profile).await?;

        Ok(folders
            .into_iter()
            .filter_map(|folder| {
                let name = folder.name.trim();
                if name.is_empty() || folder.id.is_empty() {
                    return None;
                }
                Some((name.to_owned(), folder.id))
            })
            .collect())
    }

    /// Delete a folder. Failure is logged and reported as `false`, never
    /// propagated: creation proceeds either way.
    pub async fn delete_folder(&self, profile: &str, name: &str, folder_id: &str) -> bool {
        match self.api.delete_folder(profile, folder_id).await {
            Ok(()) => {
                tracing::info!(profile, folder = name, id = folder_id, "deleted folder");
                true
            }
            Err(e) => {
                tracing::error!(
                    profile,
                    folder = name,
                    id = folder_id,
                    error = %e,
                    "failed to delete folder"
                );
                false
            }
        }
    }

    /// Create a folder and resolve its id by re-listing, then wait for the
    /// settle delay.
    pub async fn create_folder(
        &self,
        profile: &str,
        name: &str,
        action_mode: ActionMode,
        action_status: ActionStatus,
    ) -> Result<String, CreateError> {
        self.api
            .create_folder(profile, name, action_mode, action_status)
            .await
            .map_err(CreateError::Request)?;

        let folders = self
            .list_folders(profile)
            .await
            .map_err(CreateError::Relist)?;

        let folder_id = folders
            .get(name.trim())
            .cloned()
            .ok_or_else(|| CreateError::NotFound(name.to_owned()))?;

        tracing::info!(profile, folder = name, id = %folder_id, "created folder");

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        Ok(folder_id)
    }

    /// Collect every hostname in the profile: the root scope plus each
    /// folder from a fresh listing.
    ///
    /// Only a failing folder listing is fatal. An unreadable root scope or
    /// folder is logged and skipped.
    pub async fn build_rule_index(&self, profile: &str) -> Result<RuleIndex, ListError> {
        let mut index = RuleIndex::new();

        match self.api.list_rules(profile, None).await {
            Ok(rules) => {
                tracing::info!(profile, count = rules.len(), "found rules in root folder");
                index.extend(rules);
            }
            Err(e) => {
                tracing::warn!(profile, error = %e, "failed to get root folder rules");
            }
        }

        let folders = self.list_folders(profile).await?;

        for (name, folder_id) in &folders {
            match self.api.list_rules(profile, Some(folder_id)).await {
                Ok(rules) => {
                    tracing::info!(profile, folder = %name, count = rules.len(), "found rules in folder");
                    index.extend(rules);
                }
                Err(e) => {
                    tracing::warn!(profile, folder = %name, error = %e, "failed to get folder rules");
                }
            }
        }

        tracing::info!(profile, total = index.len(), "indexed existing rules");
        Ok(index)
    }
}
