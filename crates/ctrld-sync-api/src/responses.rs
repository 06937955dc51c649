use serde::Deserialize;

/// A published rule-set document.
/// `{"group": {"group": ..., "action": {"do": .., "status": ..}}, "rules": [{"PK": ..}]}`
#[derive(Debug, Deserialize)]
pub struct FolderDocument {
    pub group: GroupDescriptor,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
pub struct GroupDescriptor {
    pub group: String,
    #[serde(default)]
    pub action: GroupAction,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupAction {
    #[serde(rename = "do", default)]
    pub mode: i64,
    #[serde(default)]
    pub status: i64,
}

/// A rule as it appears both in published documents and API listings.
#[derive(Debug, Deserialize)]
pub struct RuleEntry {
    #[serde(rename = "PK", default)]
    pub pk: String,
}

/// Response from `GET /{profile}/groups`.
#[derive(Debug, Deserialize)]
pub struct GroupsResponse {
    pub body: GroupsBody,
}

#[derive(Debug, Deserialize)]
pub struct GroupsBody {
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

/// A folder in a listing. The API returns `PK` as a number or a string.
#[derive(Debug, Deserialize)]
pub struct GroupEntry {
    #[serde(default)]
    pub group: String,
    #[serde(rename = "PK", default)]
    pub pk: serde_json::Value,
}

impl GroupEntry {
    /// The primary key as a string; empty if absent or null.
    pub fn id(&self) -> String {
        match &self.pk {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => i.to_string(),
                (None, Some(u), _) => u.to_string(),
                (None, None, Some(f)) => format!("{f:.0}"),
                _ => n.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Response from `GET /{profile}/rules` and `GET /{profile}/rules/{group}`.
#[derive(Debug, Deserialize)]
pub struct RulesResponse {
    pub body: RulesBody,
}

#[derive(Debug, Deserialize)]
pub struct RulesBody {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(json: &str) -> GroupEntry {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn group_id_accepts_strings_and_numbers() {
        assert_eq!(entry(r#"{"group":"a","PK":"abc"}"#).id(), "abc");
        assert_eq!(entry(r#"{"group":"a","PK":123}"#).id(), "123");
        assert_eq!(entry(r#"{"group":"a","PK":123.0}"#).id(), "123");
        assert_eq!(entry(r#"{"group":"a","PK":null}"#).id(), "");
        assert_eq!(entry(r#"{"group":"a"}"#).id(), "");
    }

    #[test]
    fn document_without_rules_parses() {
        let doc: FolderDocument =
            serde_json::from_str(r#"{"group":{"group":"Ads","action":{"do":0,"status":1}}}"#)
                .unwrap();
        assert_eq!(doc.group.group, "Ads");
        assert_eq!(doc.group.action.status, 1);
        assert!(doc.rules.is_empty());
    }
}
