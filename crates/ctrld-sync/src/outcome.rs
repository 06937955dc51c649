use serde::Serialize;

use crate::engine::Stage;

/// Final result for one rule set in one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderOutcome {
    pub name: String,
    pub rules_pushed: usize,
    pub duplicates_skipped: usize,
    pub success: bool,
}

impl FolderOutcome {
    /// Outcome for a folder that never got as far as pushing.
    pub fn failed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules_pushed: 0,
            duplicates_skipped: 0,
            success: false,
        }
    }
}

/// Final result for one profile's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOutcome {
    pub profile_id: String,
    pub folders: Vec<FolderOutcome>,
    pub success: bool,
    /// Last pipeline stage reached; `Done` unless the profile aborted.
    pub stage: Stage,
}

impl ProfileOutcome {
    /// A profile that never got past the start of its pipeline.
    pub fn aborted(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            folders: Vec::new(),
            success: false,
            stage: Stage::Start,
        }
    }

    pub fn total_pushed(&self) -> usize {
        self.folders.iter().map(|f| f.rules_pushed).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.folders.iter().map(|f| f.duplicates_skipped).sum()
    }
}

/// Results across every profile in a run, in the order profiles were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub profiles: Vec<ProfileOutcome>,
    pub succeeded: usize,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.profiles.len() - self.succeeded
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.profiles.len()
    }
}
