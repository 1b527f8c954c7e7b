//! Project configuration consumed by prompt composition, validation and
//! the export/sync adapters.

use serde::{Deserialize, Serialize};

/// Language names that select Vietnamese output.
const VIETNAMESE_NAMES: &[&str] = &["vietnamese", "tiếng việt", "tieng viet", "vi"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityLevels {
    #[serde(default)]
    pub critical: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub low: String,
}

impl PriorityLevels {
    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.high.is_empty() && self.medium.is_empty() && self.low.is_empty()
    }
}

/// Jira/Xray connection for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraSettings {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub username: String,
    /// API token (cloud) or password (server/data center).
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub project_key: String,
    /// Custom field that holds Xray manual test steps.
    #[serde(default = "default_steps_field")]
    pub test_steps_field: String,
    /// Custom field linking a Test to its Pre-Conditions, if the instance has one.
    #[serde(default)]
    pub precondition_field: Option<String>,
}

fn default_steps_field() -> String {
    "customfield_11203".to_string()
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            username: String::new(),
            token: String::new(),
            project_key: String::new(),
            test_steps_field: default_steps_field(),
            precondition_field: None,
        }
    }
}

impl JiraSettings {
    pub fn is_configured(&self) -> bool {
        !self.server.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.token.trim().is_empty()
    }
}

/// User-defined project configuration. Immutable for one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub testing_types: Vec<String>,
    #[serde(default)]
    pub writing_style: String,
    #[serde(default)]
    pub detail_level: String,
    #[serde(default)]
    pub priorities: PriorityLevels,
    #[serde(default)]
    pub exclusion_rules: Vec<String>,
    #[serde(default)]
    pub steps_detail: String,
    #[serde(default)]
    pub jira: JiraSettings,
}

impl ProjectSettings {
    /// Vietnamese output requested by any of the configured languages.
    pub fn wants_vietnamese(&self) -> bool {
        self.languages.iter().any(|l| {
            let l = l.trim().to_lowercase();
            VIETNAMESE_NAMES.contains(&l.as_str())
        })
    }

    /// Non-empty settings as `(key, value)` lines for the prompt context.
    pub fn context_lines(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();

        let mut push = |key: &'static str, value: String| {
            if !value.trim().is_empty() {
                out.push((key, value));
            }
        };

        push("project", self.name.clone());
        push("project_description", self.description.clone());
        push("languages", self.languages.join(", "));
        push("testing_types", self.testing_types.join(", "));
        push("writing_style", self.writing_style.clone());
        push("detail_level", self.detail_level.clone());
        push("priority_critical", self.priorities.critical.clone());
        push("priority_high", self.priorities.high.clone());
        push("priority_medium", self.priorities.medium.clone());
        push("priority_low", self.priorities.low.clone());
        push("exclusion_rules", self.exclusion_rules.join("; "));
        push("steps_detail", self.steps_detail.clone());

        out
    }
}
