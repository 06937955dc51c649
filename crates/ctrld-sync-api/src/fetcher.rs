use ctrld_sync::{ActionMode, ActionStatus, DefinitionSource, FetchError, RuleSetDefinition};

use crate::responses::FolderDocument;

/// Fetches published rule-set documents over plain HTTP.
///
/// One GET per call and no retries: a list that cannot be fetched is
/// dropped by the caller rather than holding up the profile. Pair with a
/// `DefinitionCache` to avoid refetching.
pub struct HttpDefinitionSource {
    client: reqwest::Client,
}

impl HttpDefinitionSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Parse a published document into a definition.
pub fn parse_definition(raw: &str) -> Result<RuleSetDefinition, FetchError> {
    if raw.trim().is_empty() {
        return Err(FetchError::Empty);
    }

    let document: FolderDocument =
        serde_json::from_str(raw).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(RuleSetDefinition::new(
        &document.group.group,
        ActionMode::from_code(document.group.action.mode),
        ActionStatus::from_code(document.group.action.status),
        document.rules.into_iter().map(|rule| rule.pk),
    ))
}

#[async_trait::async_trait]
impl DefinitionSource for HttpDefinitionSource {
    async fn fetch(&self, url: &str) -> Result<RuleSetDefinition, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status().as_u16() != 200 {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let definition = parse_definition(&body)?;
        tracing::info!(
            url,
            folder = %definition.name,
            rules = definition.hostnames.len(),
            "fetched folder data"
        );
        Ok(definition)
    }
}
