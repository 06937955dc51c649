use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::definition::{DefinitionSource, FetchError, RuleSetDefinition};

/// Memoizes definitions by URL for the lifetime of the process.
///
/// Shared by every profile pipeline in a run. Lookups only take the read
/// lock, so concurrent readers never wait on each other; the network fetch
/// itself happens with no lock held. If two pipelines miss on the same URL
/// at once, the first insert wins and both receive the stored value.
/// Failures are never cached.
pub struct DefinitionCache {
    source: Arc<dyn DefinitionSource>,
    entries: RwLock<HashMap<String, Arc<RuleSetDefinition>>>,
}

impl DefinitionCache {
    pub fn new(source: Arc<dyn DefinitionSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, url: &str) -> Result<Arc<RuleSetDefinition>, FetchError> {
        if let Some(hit) = self.entries.read().await.get(url) {
            tracing::debug!(url, "definition cache hit");
            return Ok(Arc::clone(hit));
        }

        let fetched = Arc::new(self.source.fetch(url).await?);

        let mut entries = self.entries.write().await;
        let stored = entries.entry(url.to_owned()).or_insert(fetched);
        Ok(Arc::clone(stored))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
