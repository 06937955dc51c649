use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{PolicyApi, RemoteFolder, RequestError, RuleBatch};
use crate::definition::{
    ActionMode, ActionStatus, DefinitionSource, FetchError, RuleSetDefinition,
};

/// A push the in-memory API received, accepted or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPush {
    pub profile: String,
    pub batch: RuleBatch,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
struct StoredFolder {
    id: String,
    name: String,
    rules: Vec<String>,
}

#[derive(Debug, Default)]
struct ProfileState {
    folders: Vec<StoredFolder>,
    root_rules: Vec<String>,
}

#[derive(Debug, Default)]
struct ApiState {
    profiles: HashMap<String, ProfileState>,
    next_id: u64,
    pushes: Vec<RecordedPush>,
    push_calls: usize,
    failing_push_calls: HashSet<usize>,
    failing_folder_listings: HashSet<String>,
    failing_rule_listings: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_creates: HashSet<String>,
    lost_creates: HashSet<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory policy API for testing.
///
/// Behaves like the remote: folders get sequential ids, deleting a folder
/// drops its rules, pushes land in the target folder. Individual calls can
/// be scripted to fail.
pub struct InMemoryPolicyApi {
    state: Mutex<ApiState>,
    latency: Duration,
}

impl Default for InMemoryPolicyApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ApiState::default()),
            latency: Duration::ZERO,
        }
    }

    /// Every call sleeps this long while counted as in flight.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ApiState> {
        self.state.lock().unwrap()
    }

    fn failure(what: &str) -> RequestError {
        RequestError::Status {
            status: 500,
            body: format!("{what} failed"),
        }
    }

    /// Add a folder holding `rules`, returning its id.
    pub fn add_folder(&self, profile: &str, name: &str, rules: &[&str]) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id.to_string();
        state
            .profiles
            .entry(profile.to_owned())
            .or_default()
            .folders
            .push(StoredFolder {
                id: id.clone(),
                name: name.to_owned(),
                rules: rules.iter().map(|r| (*r).to_owned()).collect(),
            });
        id
    }

    /// Add a listing entry verbatim, without touching the id counter.
    pub fn add_raw_folder(&self, profile: &str, name: &str, id: &str) {
        self.state()
            .profiles
            .entry(profile.to_owned())
            .or_default()
            .folders
            .push(StoredFolder {
                id: id.to_owned(),
                name: name.to_owned(),
                rules: Vec::new(),
            });
    }

    pub fn add_root_rules(&self, profile: &str, rules: &[&str]) {
        self.state()
            .profiles
            .entry(profile.to_owned())
            .or_default()
            .root_rules
            .extend(rules.iter().map(|r| (*r).to_owned()));
    }

    /// Fail every folder listing for `profile`.
    pub fn fail_folder_listing(&self, profile: &str) {
        self.state()
            .failing_folder_listings
            .insert(profile.to_owned());
    }

    /// Fail rule listings for the folder with this id.
    pub fn fail_rule_listing(&self, folder_id: &str) {
        self.state()
            .failing_rule_listings
            .insert(folder_id.to_owned());
    }

    pub fn fail_delete(&self, folder_id: &str) {
        self.state().failing_deletes.insert(folder_id.to_owned());
    }

    pub fn fail_create(&self, name: &str) {
        self.state().failing_creates.insert(name.to_owned());
    }

    /// Accept creation of `name` but never show it in listings.
    pub fn lose_created_folder(&self, name: &str) {
        self.state().lost_creates.insert(name.to_owned());
    }

    /// Fail the n-th push call (1-based, counted across all profiles).
    pub fn fail_push_call(&self, call: usize) {
        self.state().failing_push_calls.insert(call);
    }

    pub fn pushes(&self) -> Vec<RecordedPush> {
        self.state().pushes.clone()
    }

    pub fn folder_names(&self, profile: &str) -> Vec<String> {
        self.state()
            .profiles
            .get(profile)
            .map(|p| p.folders.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Rules currently held by the named folder (first match).
    pub fn folder_rules(&self, profile: &str, name: &str) -> Option<Vec<String>> {
        self.state()
            .profiles
            .get(profile)?
            .folders
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.rules.clone())
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    async fn enter(&self) {
        {
            let mut state = self.state();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn leave(&self) {
        self.state().in_flight -= 1;
    }

    async fn call<T>(&self, f: impl FnOnce(&mut ApiState) -> Result<T, RequestError>) -> Result<T, RequestError> {
        self.enter().await;
        let result = f(&mut self.state());
        self.leave();
        result
    }
}

#[async_trait::async_trait]
impl PolicyApi for InMemoryPolicyApi {
    async fn list_folders(&self, profile: &str) -> Result<Vec<RemoteFolder>, RequestError> {
        self.call(|state| {
            if state.failing_folder_listings.contains(profile) {
                return Err(Self::failure("list folders"));
            }
            let lost = &state.lost_creates;
            Ok(state
                .profiles
                .get(profile)
                .map(|p| {
                    p.folders
                        .iter()
                        .filter(|f| !lost.contains(&f.name))
                        .map(|f| RemoteFolder {
                            name: f.name.clone(),
                            id: f.id.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        })
        .await
    }

    async fn delete_folder(&self, profile: &str, folder_id: &str) -> Result<(), RequestError> {
        self.call(|state| {
            if state.failing_deletes.contains(folder_id) {
                return Err(Self::failure("delete folder"));
            }
            let profile = state.profiles.entry(profile.to_owned()).or_default();
            let before = profile.folders.len();
            profile.folders.retain(|f| f.id != folder_id);
            if profile.folders.len() == before {
                return Err(RequestError::Status {
                    status: 404,
                    body: "no such folder".into(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn create_folder(
        &self,
        profile: &str,
        name: &str,
        _action_mode: ActionMode,
        _action_status: ActionStatus,
    ) -> Result<(), RequestError> {
        self.call(|state| {
            if state.failing_creates.contains(name) {
                return Err(Self::failure("create folder"));
            }
            state.next_id += 1;
            let id = state.next_id.to_string();
            state
                .profiles
                .entry(profile.to_owned())
                .or_default()
                .folders
                .push(StoredFolder {
                    id,
                    name: name.to_owned(),
                    rules: Vec::new(),
                });
            Ok(())
        })
        .await
    }

    async fn list_rules(
        &self,
        profile: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<String>, RequestError> {
        self.call(|state| {
            let Some(p) = state.profiles.get(profile) else {
                return Ok(Vec::new());
            };
            match folder_id {
                None => Ok(p.root_rules.clone()),
                Some(id) if state.failing_rule_listings.contains(id) => {
                    Err(Self::failure("list rules"))
                }
                Some(id) => Ok(p
                    .folders
                    .iter()
                    .find(|f| f.id == id)
                    .map(|f| f.rules.clone())
                    .unwrap_or_default()),
            }
        })
        .await
    }

    async fn push_rules(&self, profile: &str, batch: &RuleBatch) -> Result<(), RequestError> {
        self.call(|state| {
            state.push_calls += 1;
            let accepted = !state.failing_push_calls.contains(&state.push_calls);
            state.pushes.push(RecordedPush {
                profile: profile.to_owned(),
                batch: batch.clone(),
                accepted,
            });
            if !accepted {
                return Err(Self::failure("push rules"));
            }
            if let Some(folder) = state
                .profiles
                .entry(profile.to_owned())
                .or_default()
                .folders
                .iter_mut()
                .find(|f| f.id == batch.folder_id)
            {
                folder.rules.extend(batch.hostnames.iter().cloned());
            }
            Ok(())
        })
        .await
    }
}

/// Definition source backed by a fixed map; unknown URLs fail with 404.
#[derive(Default)]
pub struct StaticDefinitionSource {
    definitions: Mutex<HashMap<String, RuleSetDefinition>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl StaticDefinitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: &str, definition: RuleSetDefinition) {
        self.definitions
            .lock()
            .unwrap()
            .insert(url.to_owned(), definition);
    }

    /// How many times `url` was fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl DefinitionSource for StaticDefinitionSource {
    async fn fetch(&self, url: &str) -> Result<RuleSetDefinition, FetchError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default() += 1;

        self.definitions
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}
