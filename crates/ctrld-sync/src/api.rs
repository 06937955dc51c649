use std::sync::Arc;

use crate::definition::{ActionMode, ActionStatus};

/// A folder as currently held by the policy API.
///
/// `id` is the stringified remote primary key; it is empty when the remote
/// returned something that could not be turned into an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub name: String,
    pub id: String,
}

/// One submission of rules into a single folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBatch {
    pub folder_id: String,
    pub action_mode: ActionMode,
    pub action_status: ActionStatus,
    pub hostnames: Vec<String>,
}

/// A policy API call that failed, after any retries were exhausted.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// The remote policy API holding each profile's folders and rules.
///
/// Implementations are expected to route every call through a retrying
/// executor; callers treat an error as final.
#[async_trait::async_trait]
pub trait PolicyApi: Send + Sync {
    /// List every folder in the profile.
    async fn list_folders(&self, profile: &str) -> Result<Vec<RemoteFolder>, RequestError>;

    /// Delete the folder with the given id.
    async fn delete_folder(&self, profile: &str, folder_id: &str) -> Result<(), RequestError>;

    /// Create a folder. The remote does not return the new id.
    async fn create_folder(
        &self,
        profile: &str,
        name: &str,
        action_mode: ActionMode,
        action_status: ActionStatus,
    ) -> Result<(), RequestError>;

    /// List rule hostnames in a folder, or in the profile root when
    /// `folder_id` is `None`.
    async fn list_rules(
        &self,
        profile: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<String>, RequestError>;

    /// Submit one batch of rules.
    async fn push_rules(&self, profile: &str, batch: &RuleBatch) -> Result<(), RequestError>;
}

#[async_trait::async_trait]
impl<T: PolicyApi + ?Sized> PolicyApi for Arc<T> {
    async fn list_folders(&self, profile: &str) -> Result<Vec<RemoteFolder>, RequestError> {
        (**self).list_folders(profile).await
    }

    async fn delete_folder(&self, profile: &str, folder_id: &str) -> Result<(), RequestError> {
        (**self).delete_folder(profile, folder_id).await
    }

    async fn create_folder(
        &self,
        profile: &str,
        name: &str,
        action_mode: ActionMode,
        action_status: ActionStatus,
    ) -> Result<(), RequestError> {
        (**self)
            .create_folder(profile, name, action_mode, action_status)
            .await
    }

    async fn list_rules(
        &self,
        profile: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<String>, RequestError> {
        (**self).list_rules(profile, folder_id).await
    }

    async fn push_rules(&self, profile: &str, batch: &RuleBatch) -> Result<(), RequestError> {
        (**self).push_rules(profile, batch).await
    }
}
