use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::api::PolicyApi;
use crate::cache::DefinitionCache;
use crate::definition::RuleSetDefinition;
use crate::outcome::{FolderOutcome, ProfileOutcome, RunReport};
use crate::push::{PushTarget, push_rules};
use crate::reconcile::{DEFAULT_SETTLE_DELAY, FolderReconciler, ListError, RuleIndex};

/// Stages of one profile's pipeline, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    DefinitionsFetched,
    FoldersListed,
    Reconciled,
    ExistingIndexed,
    Done,
}

/// Failures that abort a whole profile. Anything narrower is recorded on
/// the folder it happened to.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no valid folder data found")]
    NoDefinitions,

    #[error("failed to list existing folders: {0}")]
    ListFolders(ListError),

    #[error("failed to get existing rules: {0}")]
    IndexRules(ListError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Profiles allowed to run at once; the rest queue for a slot.
    pub max_concurrent_profiles: usize,
    /// Wait after each folder creation.
    pub settle_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_profiles: 3,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Drives delete-then-recreate reconciliation for any number of profiles.
///
/// Cheap to clone; clones share the API client and the definition cache.
#[derive(Clone)]
pub struct SyncEngine {
    api: Arc<dyn PolicyApi>,
    definitions: Arc<DefinitionCache>,
    urls: Arc<[String]>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(
        api: Arc<dyn PolicyApi>,
        definitions: Arc<DefinitionCache>,
        urls: Vec<String>,
        config: EngineConfig,
    ) -> Self {
        Self {
            api,
            definitions,
            urls: urls.into(),
            config,
        }
    }

    /// Sync every profile, at most `max_concurrent_profiles` at a time.
    ///
    /// Every profile is attempted regardless of how the others fare.
    /// Outcomes come back in the order `profiles` was given.
    pub async fn run(&self, profiles: &[String]) -> RunReport {
        let limit = Arc::new(Semaphore::new(self.config.max_concurrent_profiles.max(1)));
        let succeeded = Arc::new(AtomicUsize::new(0));

        tracing::info!(
            profiles = profiles.len(),
            max_concurrent = self.config.max_concurrent_profiles,
            "starting sync"
        );

        let handles: Vec<_> = profiles
            .iter()
            .map(|profile| {
                let engine = self.clone();
                let limit = Arc::clone(&limit);
                let succeeded = Arc::clone(&succeeded);
                let profile = profile.clone();

                tokio::spawn(async move {
                    let outcome = engine.sync_limited(&limit, &profile).await;
                    if outcome.success {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                    outcome
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(profiles.len());
        for (profile, handle) in profiles.iter().zip(handles) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(profile = %profile, error = %e, "profile pipeline aborted");
                    outcomes.push(ProfileOutcome::aborted(profile));
                }
            }
        }

        let succeeded = succeeded.load(Ordering::SeqCst);
        tracing::info!(
            succeeded,
            total = profiles.len(),
            "all profiles processed"
        );

        RunReport {
            profiles: outcomes,
            succeeded,
        }
    }

    /// Wait for a slot in `limit`, then sync the profile while holding it.
    ///
    /// A closed limiter fails the profile without touching the API.
    async fn sync_limited(&self, limit: &Arc<Semaphore>, profile: &str) -> ProfileOutcome {
        let Ok(_permit) = Arc::clone(limit).acquire_owned().await else {
            tracing::error!(profile, "concurrency limiter closed");
            return ProfileOutcome::aborted(profile);
        };

        self.sync_profile(profile).await
    }

    /// Run the full pipeline for one profile.
    pub async fn sync_profile(&self, profile: &str) -> ProfileOutcome {
        tracing::info!(profile, "starting sync for profile");

        let mut pipeline = ProfilePipeline {
            engine: self,
            profile,
            stage: Stage::Start,
            folders: Vec::new(),
        };

        let result = pipeline.run().await;
        if let Err(e) = &result {
            tracing::error!(profile, stage = ?pipeline.stage, error = %e, "profile sync aborted");
        }

        pipeline.finish(result.is_ok())
    }
}

struct ProfilePipeline<'a> {
    engine: &'a SyncEngine,
    profile: &'a str,
    stage: Stage,
    folders: Vec<FolderOutcome>,
}

impl<'a> ProfilePipeline<'a> {
    fn advance(&mut self, next: Stage) {
        tracing::debug!(profile = self.profile, from = ?self.stage, to = ?next, "pipeline stage");
        self.stage = next;
    }

    async fn run(&mut self) -> Result<(), PipelineError> {
        let engine = self.engine;
        let profile = self.profile;
        let reconciler = FolderReconciler::new(engine.api.as_ref(), engine.config.settle_delay);

        let definitions = self.fetch_definitions().await?;
        self.advance(Stage::DefinitionsFetched);

        let existing = reconciler
            .list_folders(profile)
            .await
            .map_err(PipelineError::ListFolders)?;
        self.advance(Stage::FoldersListed);

        for definition in &definitions {
            if let Some(folder_id) = existing.get(&definition.name) {
                reconciler
                    .delete_folder(profile, &definition.name, folder_id)
                    .await;
            }
        }
        self.advance(Stage::Reconciled);

        // Must happen after deletions: rules in folders about to be replaced
        // would otherwise count as duplicates and never be re-pushed.
        let mut index = reconciler
            .build_rule_index(profile)
            .await
            .map_err(PipelineError::IndexRules)?;
        self.advance(Stage::ExistingIndexed);

        for definition in &definitions {
            let outcome = self.sync_folder(&reconciler, definition, &mut index).await;
            self.folders.push(outcome);
        }
        self.advance(Stage::Done);

        Ok(())
    }

    async fn fetch_definitions(&self) -> Result<Vec<Arc<RuleSetDefinition>>, PipelineError> {
        let mut definitions = Vec::with_capacity(self.engine.urls.len());

        for url in self.engine.urls.iter() {
            match self.engine.definitions.get(url).await {
                Ok(definition) => definitions.push(definition),
                Err(e) => {
                    tracing::warn!(
                        profile = self.profile,
                        url = %url,
                        error = %e,
                        "failed to fetch folder data, skipping"
                    );
                }
            }
        }

        if definitions.is_empty() {
            return Err(PipelineError::NoDefinitions);
        }
        Ok(definitions)
    }

    async fn sync_folder(
        &self,
        reconciler: &FolderReconciler<'_>,
        definition: &RuleSetDefinition,
        index: &mut RuleIndex,
    ) -> FolderOutcome {
        let name = definition.name.as_str();

        let folder_id = match reconciler
            .create_folder(
                self.profile,
                name,
                definition.action_mode,
                definition.action_status,
            )
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(profile = self.profile, folder = name, error = %e, "failed to create folder");
                return FolderOutcome::failed(name);
            }
        };

        let target = PushTarget {
            profile: self.profile,
            folder_name: name,
            folder_id: &folder_id,
            action_mode: definition.action_mode,
            action_status: definition.action_status,
        };
        let pushed = push_rules(self.engine.api.as_ref(), target, &definition.hostnames, index).await;

        FolderOutcome {
            name: name.to_owned(),
            rules_pushed: pushed.pushed,
            duplicates_skipped: pushed.duplicates,
            success: pushed.success,
        }
    }

    fn finish(self, completed: bool) -> ProfileOutcome {
        let succeeded = self.folders.iter().filter(|f| f.success).count();
        let success = completed && succeeded == self.folders.len();

        if completed {
            tracing::info!(
                profile = self.profile,
                succeeded,
                total = self.folders.len(),
                "sync complete"
            );
        }

        ProfileOutcome {
            profile_id: self.profile.to_owned(),
            folders: self.folders,
            success,
            stage: self.stage,
        }
    }
}
