use std::fmt;

/// What a folder does with the hostnames it holds (`do` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "i64")]
pub enum ActionMode {
    Block,
    Allow,
    Spoof,
    Redirect,
    Other(i64),
}

impl ActionMode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Block,
            1 => Self::Allow,
            2 => Self::Spoof,
            3 => Self::Redirect,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Block => 0,
            Self::Allow => 1,
            Self::Spoof => 2,
            Self::Redirect => 3,
            Self::Other(code) => *code,
        }
    }
}

impl From<ActionMode> for i64 {
    fn from(mode: ActionMode) -> Self {
        mode.code()
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Allow => write!(f, "allow"),
            Self::Spoof => write!(f, "spoof"),
            Self::Redirect => write!(f, "redirect"),
            Self::Other(code) => write!(f, "do={code}"),
        }
    }
}

/// Whether a folder's rules are active (`status` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(into = "i64")]
pub enum ActionStatus {
    Disabled,
    Enabled,
    Other(i64),
}

impl ActionStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Disabled,
            1 => Self::Enabled,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::Other(code) => *code,
        }
    }
}

impl From<ActionStatus> for i64 {
    fn from(status: ActionStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Enabled => write!(f, "enabled"),
            Self::Other(code) => write!(f, "status={code}"),
        }
    }
}

/// A published rule set: one folder's worth of hostnames plus the action
/// they share. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetDefinition {
    pub name: String,
    pub action_mode: ActionMode,
    pub action_status: ActionStatus,
    pub hostnames: Vec<String>,
}

impl RuleSetDefinition {
    /// Build a definition from raw document fields.
    ///
    /// The name is trimmed and rule entries with an empty key are dropped;
    /// hostname order is preserved.
    pub fn new(
        name: &str,
        action_mode: ActionMode,
        action_status: ActionStatus,
        hostnames: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.trim().to_owned(),
            action_mode,
            action_status,
            hostnames: hostnames.into_iter().filter(|h| !h.is_empty()).collect(),
        }
    }
}

/// Errors that can occur while fetching a rule-set definition.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("empty response body")]
    Empty,

    #[error("parse error: {0}")]
    Parse(String),
}

/// A remote location that publishes rule-set definitions by URL.
#[async_trait::async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Fetch and parse the definition published at `url`.
    async fn fetch(&self, url: &str) -> Result<RuleSetDefinition, FetchError>;
}

#[async_trait::async_trait]
impl<T: DefinitionSource + ?Sized> DefinitionSource for std::sync::Arc<T> {
    async fn fetch(&self, url: &str) -> Result<RuleSetDefinition, FetchError> {
        (**self).fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_round_trip() {
        for code in [0, 1, 2, 3, 7] {
            assert_eq!(ActionMode::from_code(code).code(), code);
        }
        for code in [0, 1, 5] {
            assert_eq!(ActionStatus::from_code(code).code(), code);
        }
        assert_eq!(ActionMode::from_code(0), ActionMode::Block);
        assert_eq!(ActionMode::from_code(1), ActionMode::Allow);
        assert_eq!(ActionStatus::from_code(1), ActionStatus::Enabled);
    }

    #[test]
    fn new_trims_name_and_drops_empty_hostnames() {
        let def = RuleSetDefinition::new(
            "  Native Tracker  ",
            ActionMode::Block,
            ActionStatus::Enabled,
            vec!["a.com".to_owned(), String::new(), "b.com".to_owned()],
        );

        assert_eq!(def.name, "Native Tracker");
        assert_eq!(def.hostnames, vec!["a.com", "b.com"]);
    }

    #[test]
    fn display_names_known_modes() {
        assert_eq!(ActionMode::Block.to_string(), "block");
        assert_eq!(ActionMode::Other(9).to_string(), "do=9");
        assert_eq!(ActionStatus::Disabled.to_string(), "disabled");
    }
}
