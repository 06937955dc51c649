pub mod api;
pub mod cache;
pub mod definition;
pub mod engine;
pub mod outcome;
pub mod push;
pub mod reconcile;
pub mod retry;

pub use api::{PolicyApi, RemoteFolder, RequestError, RuleBatch};
pub use cache::DefinitionCache;
pub use definition::{ActionMode, ActionStatus, DefinitionSource, FetchError, RuleSetDefinition};
pub use engine::{EngineConfig, PipelineError, Stage, SyncEngine};
pub use outcome::{FolderOutcome, ProfileOutcome, RunReport};
pub use push::{BATCH_SIZE, PushOutcome, PushTarget, push_rules};
pub use reconcile::{CreateError, DEFAULT_SETTLE_DELAY, FolderReconciler, ListError, RuleIndex};
pub use retry::{RetryPolicy, retry};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
