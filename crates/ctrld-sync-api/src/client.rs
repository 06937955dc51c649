use ctrld_sync::{
    ActionMode, ActionStatus, PolicyApi, RemoteFolder, RequestError, RuleBatch,
};

use crate::executor::RequestExecutor;
use crate::responses::{GroupsResponse, RulesResponse};

pub const DEFAULT_API_BASE: &str = "https://api.controld.com/profiles";

/// Control D policy API client. Every call goes through the retrying
/// executor.
pub struct ControlDClient {
    executor: RequestExecutor,
    token: String,
    api_base_url: Option<String>,
}

impl ControlDClient {
    pub fn new(
        executor: RequestExecutor,
        token: impl Into<String>,
        api_base_url: Option<String>,
    ) -> Self {
        Self {
            executor,
            token: token.into(),
            api_base_url,
        }
    }

    fn api_base(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    fn url(&self, profile: &str, path: &str) -> String {
        format!("{}/{}/{}", self.api_base(), profile, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        label: &str,
        url: &str,
    ) -> Result<T, RequestError> {
        self.executor
            .execute(label, |client| {
                self.authorize(client.get(url).header("Accept", "application/json"))
            })
            .await?
            .json()
            .await
            .map_err(|e| RequestError::Parse(e.to_string()))
    }

    async fn post_form(
        &self,
        label: &str,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<(), RequestError> {
        self.executor
            .execute(label, |client| self.authorize(client.post(url).form(fields)))
            .await?;
        Ok(())
    }
}

/// Form fields for one rule batch: the shared action and folder, then each
/// hostname as `hostnames[i]`.
pub fn rule_batch_form(batch: &RuleBatch) -> Vec<(String, String)> {
    let mut fields = Vec::with_capacity(batch.hostnames.len() + 3);
    fields.push(("do".to_owned(), batch.action_mode.code().to_string()));
    fields.push(("status".to_owned(), batch.action_status.code().to_string()));
    fields.push(("group".to_owned(), batch.folder_id.clone()));
    fields.extend(
        batch
            .hostnames
            .iter()
            .enumerate()
            .map(|(i, hostname)| (format!("hostnames[{i}]"), hostname.clone())),
    );
    fields
}

#[async_trait::async_trait]
impl PolicyApi for ControlDClient {
    async fn list_folders(&self, profile: &str) -> Result<Vec<RemoteFolder>, RequestError> {
        let url = self.url(profile, "groups");
        let response: GroupsResponse = self.get_json("list folders", &url).await?;

        Ok(response
            .body
            .groups
            .into_iter()
            .map(|entry| RemoteFolder {
                id: entry.id(),
                name: entry.group,
            })
            .collect())
    }

    async fn delete_folder(&self, profile: &str, folder_id: &str) -> Result<(), RequestError> {
        let url = self.url(profile, &format!("groups/{folder_id}"));
        self.executor
            .execute("delete folder", |client| self.authorize(client.delete(&url)))
            .await?;
        Ok(())
    }

    async fn create_folder(
        &self,
        profile: &str,
        name: &str,
        action_mode: ActionMode,
        action_status: ActionStatus,
    ) -> Result<(), RequestError> {
        let url = self.url(profile, "groups");
        let fields = vec![
            ("name".to_owned(), name.to_owned()),
            ("do".to_owned(), action_mode.code().to_string()),
            ("status".to_owned(), action_status.code().to_string()),
        ];
        self.post_form("create folder", &url, &fields).await
    }

    async fn list_rules(
        &self,
        profile: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<String>, RequestError> {
        let url = match folder_id {
            Some(id) => self.url(profile, &format!("rules/{id}")),
            None => self.url(profile, "rules"),
        };
        let response: RulesResponse = self.get_json("list rules", &url).await?;

        Ok(response
            .body
            .rules
            .into_iter()
            .map(|rule| rule.pk)
            .filter(|pk| !pk.is_empty())
            .collect())
    }

    async fn push_rules(&self, profile: &str, batch: &RuleBatch) -> Result<(), RequestError> {
        let url = self.url(profile, "rules");
        let fields = rule_batch_form(batch);
        self.post_form("push rules", &url, &fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_form_enumerates_hostnames() {
        let batch = RuleBatch {
            folder_id: "42".into(),
            action_mode: ActionMode::Allow,
            action_status: ActionStatus::Enabled,
            hostnames: vec!["a.com".into(), "b.com".into()],
        };

        let fields = rule_batch_form(&batch);

        assert_eq!(
            fields,
            vec![
                ("do".to_owned(), "1".to_owned()),
                ("status".to_owned(), "1".to_owned()),
                ("group".to_owned(), "42".to_owned()),
                ("hostnames[0]".to_owned(), "a.com".to_owned()),
                ("hostnames[1]".to_owned(), "b.com".to_owned()),
            ]
        );
    }
}
