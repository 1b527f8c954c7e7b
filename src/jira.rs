//! Push test cases to Jira as Xray `Test` issues.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::project::JiraSettings;
use crate::testgen::case::TestCase;
use crate::testgen::steps::number_steps;

const API: &str = "rest/api/2/";
const TEST_ISSUE_TYPE: &str = "Test";
const PRECONDITION_ISSUE_TYPE: &str = "Pre-Condition";
const TEST_LABELS: &[&str] = &["test-case", "automated-sync", "xray"];
const PRECONDITION_LABELS: &[&str] = &["precondition", "automated-sync"];

#[derive(Debug, Error)]
pub enum JiraError {
    #[error("Jira is not configured (server, username and token are required)")]
    NotConfigured,
    #[error("invalid Jira server URL `{0}`")]
    InvalidServer(String),
    #[error("Jira authentication failed: check username and API token")]
    Authentication,
    #[error("Jira access forbidden: {0}")]
    Forbidden(String),
    #[error("Jira resource not found: {0}")]
    NotFound(String),
    #[error("Jira request timed out")]
    Timeout,
    #[error("Jira request failed: {0}")]
    Network(String),
    #[error("Jira API error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("issue type `{issue_type}` not found in project {project}; check the Xray setup")]
    MissingIssueType { project: String, issue_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedIssue {
    pub test_case_id: u32,
    pub key: String,
    pub summary: String,
    pub url: String,
    pub precondition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCase {
    pub test_case_id: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub project_key: String,
    pub created: Vec<CreatedIssue>,
    pub failed: Vec<FailedCase>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct JiraClient {
    base: Url,
    username: String,
    token: String,
    steps_field: String,
    precondition_field: Option<String>,
    http: Client,
}

impl JiraClient {
    pub fn new(settings: &JiraSettings) -> Result<Self, JiraError> {
        if !settings.is_configured() {
            return Err(JiraError::NotConfigured);
        }

        let base = normalize_server(&settings.server)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("storycase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JiraError::Network(e.to_string()))?;

        Ok(Self {
            base,
            username: settings.username.trim().to_string(),
            token: settings.token.trim().to_string(),
            steps_field: settings.test_steps_field.clone(),
            precondition_field: settings.precondition_field.clone(),
            http,
        })
    }

    pub fn server(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Returns the display name of the authenticated user.
    pub fn check_connection(&self) -> Result<String, JiraError> {
        let me = self.send(self.http.get(self.api_url("myself")?))?;
        let name = me
            .get("displayName")
            .or_else(|| me.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(user = %name, server = %self.server(), "Jira connection ok");
        Ok(name)
    }

    /// Create one Test issue per case. A failing case is recorded, not fatal.
    pub fn sync(&self, project_key: &str, cases: &[TestCase]) -> Result<SyncReport, JiraError> {
        let issue_types = self.project_issue_types(project_key)?;
        let has = |name: &str| issue_types.iter().any(|t| t.eq_ignore_ascii_case(name));

        if !has(TEST_ISSUE_TYPE) {
            return Err(JiraError::MissingIssueType {
                project: project_key.to_string(),
                issue_type: TEST_ISSUE_TYPE.to_string(),
            });
        }
        let preconditions_enabled = has(PRECONDITION_ISSUE_TYPE);
        if !preconditions_enabled {
            debug!(project_key, "no Pre-Condition issue type; skipping preconditions");
        }

        let mut report = SyncReport {
            project_key: project_key.to_string(),
            ..Default::default()
        };
        let mut precondition_keys: HashMap<String, String> = HashMap::new();

        for (i, case) in cases.iter().enumerate() {
            let precondition = if preconditions_enabled {
                self.precondition_for(project_key, &case.preconditions, &mut precondition_keys)
            } else {
                None
            };

            let summary = issue_summary(case, i + 1);
            let fields = self.test_fields(project_key, case, &summary, precondition.as_deref());

            match self.create_issue(fields) {
                Ok(key) => {
                    debug!(key = %key, case = case.test_case_id, "created Test issue");
                    report.created.push(CreatedIssue {
                        test_case_id: case.test_case_id,
                        url: format!("{}/browse/{}", self.server(), key),
                        key,
                        summary,
                        precondition,
                    });
                }
                Err(e) => {
                    warn!(case = case.test_case_id, error = %e, "failed to create Test issue");
                    report.failed.push(FailedCase {
                        test_case_id: case.test_case_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            project_key,
            created = report.created.len(),
            failed = report.failed.len(),
            "Jira sync finished"
        );
        Ok(report)
    }

    fn project_issue_types(&self, project_key: &str) -> Result<Vec<String>, JiraError> {
        let project = self.send(self.http.get(self.api_url(&format!("project/{project_key}"))?))?;
        Ok(project
            .get("issueTypes")
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Existing or new Pre-Condition key. Lookup failures only skip the link.
    fn precondition_for(
        &self,
        project_key: &str,
        text: &str,
        seen: &mut HashMap<String, String>,
    ) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(key) = seen.get(text) {
            return Some(key.clone());
        }

        let found = match self.find_precondition(project_key, text) {
            Ok(Some(key)) => Ok(key),
            Ok(None) => self.create_issue(json!({
                "project": { "key": project_key },
                "summary": text,
                "issuetype": { "name": PRECONDITION_ISSUE_TYPE },
                "labels": PRECONDITION_LABELS,
            })),
            Err(e) => Err(e),
        };

        match found {
            Ok(key) => {
                seen.insert(text.to_string(), key.clone());
                Some(key)
            }
            Err(e) => {
                warn!(error = %e, "could not resolve Pre-Condition");
                None
            }
        }
    }

    fn find_precondition(&self, project_key: &str, text: &str) -> Result<Option<String>, JiraError> {
        let jql = format!(
            "project = \"{}\" AND issuetype = \"{}\" AND summary ~ \"{}\"",
            jql_escape(project_key),
            PRECONDITION_ISSUE_TYPE,
            jql_escape(text)
        );

        let mut url = self.api_url("search")?;
        url.query_pairs_mut()
            .append_pair("jql", &jql)
            .append_pair("maxResults", "1")
            .append_pair("fields", "summary");

        let found = self.send(self.http.get(url))?;
        Ok(found
            .pointer("/issues/0/key")
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    fn test_fields(&self, project_key: &str, case: &TestCase, summary: &str, precondition: Option<&str>) -> Value {
        let mut fields = json!({
            "project": { "key": project_key },
            "summary": summary,
            "issuetype": { "name": TEST_ISSUE_TYPE },
            "labels": TEST_LABELS,
        });

        if !case.test_steps.trim().is_empty() && !self.steps_field.is_empty() {
            fields[self.steps_field.as_str()] = xray_steps(case);
        }
        if let (Some(field), Some(key)) = (&self.precondition_field, precondition) {
            fields[field.as_str()] = json!([key]);
        }
        fields
    }

    fn create_issue(&self, fields: Value) -> Result<String, JiraError> {
        let created = self.send(self.http.post(self.api_url("issue")?).json(&json!({ "fields": fields })))?;
        created
            .get("key")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| JiraError::Http {
                status: 200,
                body: "created issue has no key".into(),
            })
    }

    fn api_url(&self, path: &str) -> Result<Url, JiraError> {
        self.base
            .join(API)
            .and_then(|u| u.join(path))
            .map_err(|_| JiraError::InvalidServer(self.base.to_string()))
    }

    fn send(&self, req: RequestBuilder) -> Result<Value, JiraError> {
        let resp = req
            .basic_auth(&self.username, Some(&self.token))
            .header("Accept", "application/json")
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    JiraError::Timeout
                } else {
                    JiraError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp.text().unwrap_or_default();

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => JiraError::Authentication,
                403 => JiraError::Forbidden(body),
                404 => JiraError::NotFound(body),
                408 | 504 => JiraError::Timeout,
                code => JiraError::Http { status: code, body },
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| JiraError::Http {
            status: status.as_u16(),
            body: format!("unparseable response: {e}"),
        })
    }
}

/// Accepts `jira.example.com`, `https://jira.example.com/` or a URL with a context path.
pub fn normalize_server(server: &str) -> Result<Url, JiraError> {
    let trimmed = server.trim();
    if trimmed.is_empty() {
        return Err(JiraError::NotConfigured);
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|_| JiraError::InvalidServer(trimmed.to_string()))?;
    if url.host_str().is_none() {
        return Err(JiraError::InvalidServer(trimmed.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Summary is the description, then the title, then `Test Case N`.
pub fn issue_summary(case: &TestCase, position: usize) -> String {
    [&case.description, &case.test_title]
        .into_iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(|s| s.chars().take(255).collect())
        .unwrap_or_else(|| format!("Test Case {position}"))
}

/// Xray manual steps: a single step carrying the whole procedure.
pub fn xray_steps(case: &TestCase) -> Value {
    json!({
        "steps": [{
            "id": 1,
            "index": 1,
            "fields": {
                "Action": number_steps(case.steps()),
                "Data": case.test_data.trim(),
                "Expected Result": case.expected_result.trim(),
            },
            "attachments": [],
            "testVersionId": 1
        }]
    })
}

fn jql_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings(server: String) -> JiraSettings {
        JiraSettings {
            server,
            username: "qa@example.com".into(),
            token: "secret".into(),
            project_key: "QA".into(),
            ..Default::default()
        }
    }

    fn case(id: u32, description: &str, preconditions: &str) -> TestCase {
        TestCase {
            test_case_id: id,
            test_title: "Email Field".into(),
            description: description.into(),
            preconditions: preconditions.into(),
            test_steps: "1. Open login page\n2. Enter email".into(),
            test_data: "Email: an@example.com".into(),
            expected_result: "Logged in".into(),
            comments: String::new(),
        }
    }

    #[test]
    fn server_urls_are_normalized() {
        assert_eq!(normalize_server("jira.example.com").unwrap().as_str(), "https://jira.example.com/");
        assert_eq!(normalize_server(" https://jira.example.com/ ").unwrap().as_str(), "https://jira.example.com/");
        assert_eq!(normalize_server("http://host:8080/jira").unwrap().as_str(), "http://host:8080/jira/");
        assert!(matches!(normalize_server(""), Err(JiraError::NotConfigured)));
    }

    #[test]
    fn unconfigured_settings_are_rejected() {
        assert!(matches!(
            JiraClient::new(&JiraSettings::default()),
            Err(JiraError::NotConfigured)
        ));
    }

    #[test]
    fn summary_falls_back_to_title_then_position() {
        let mut c = case(1, "Valid login", "");
        assert_eq!(issue_summary(&c, 1), "Valid login");
        c.description = "  ".into();
        assert_eq!(issue_summary(&c, 1), "Email Field");
        c.test_title.clear();
        assert_eq!(issue_summary(&c, 4), "Test Case 4");
    }

    #[test]
    fn xray_payload_has_one_step() {
        let v = xray_steps(&case(1, "d", ""));
        assert_eq!(v["steps"].as_array().unwrap().len(), 1);
        assert_eq!(v["steps"][0]["fields"]["Action"], "1. Open login page\n2. Enter email");
        assert_eq!(v["steps"][0]["fields"]["Data"], "Email: an@example.com");
        assert_eq!(v["steps"][0]["fields"]["Expected Result"], "Logged in");
    }

    #[test]
    fn check_connection_maps_auth_failure() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/rest/api/2/myself").with_status(401).create();

        let client = JiraClient::new(&settings(server.url())).unwrap();
        assert!(matches!(client.check_connection(), Err(JiraError::Authentication)));
    }

    #[test]
    fn check_connection_returns_display_name() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/rest/api/2/myself")
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_body(r#"{"name":"qa","displayName":"QA Bot"}"#)
            .create();

        let client = JiraClient::new(&settings(server.url())).unwrap();
        assert_eq!(client.check_connection().unwrap(), "QA Bot");
    }

    #[test]
    fn sync_requires_test_issue_type() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/rest/api/2/project/QA")
            .with_status(200)
            .with_body(r#"{"key":"QA","issueTypes":[{"name":"Bug"},{"name":"Story"}]}"#)
            .create();

        let client = JiraClient::new(&settings(server.url())).unwrap();
        let err = client.sync("QA", &[case(1, "d", "")]).unwrap_err();
        assert!(matches!(err, JiraError::MissingIssueType { .. }));
    }

    #[test]
    fn sync_creates_tests_and_reuses_preconditions() {
        let mut server = mockito::Server::new();
        let _project = server
            .mock("GET", "/rest/api/2/project/QA")
            .with_status(200)
            .with_body(r#"{"key":"QA","issueTypes":[{"name":"Test"},{"name":"Pre-Condition"}]}"#)
            .create();
        let search = server
            .mock("GET", "/rest/api/2/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"issues":[]}"#)
            .expect(1)
            .create();
        let pre = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(json!({
                "fields": { "issuetype": { "name": "Pre-Condition" } }
            })))
            .with_status(201)
            .with_body(r#"{"id":"1","key":"QA-1"}"#)
            .expect(1)
            .create();
        let test = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(json!({
                "fields": { "issuetype": { "name": "Test" } }
            })))
            .with_status(201)
            .with_body(r#"{"id":"2","key":"QA-2"}"#)
            .expect(2)
            .create();

        let client = JiraClient::new(&settings(server.url())).unwrap();
        let report = client
            .sync(
                "QA",
                &[case(1, "Valid login", "User has an account"), case(2, "Wrong password", "User has an account")],
            )
            .unwrap();

        search.assert();
        pre.assert();
        test.assert();
        assert!(report.is_complete());
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.created[0].precondition.as_deref(), Some("QA-1"));
        assert_eq!(report.created[1].precondition.as_deref(), Some("QA-1"));
        assert!(report.created[0].url.ends_with("/browse/QA-2"));
    }

    #[test]
    fn failed_case_does_not_stop_batch() {
        let mut server = mockito::Server::new();
        let _project = server
            .mock("GET", "/rest/api/2/project/QA")
            .with_status(200)
            .with_body(r#"{"issueTypes":[{"name":"Test"}]}"#)
            .create();
        let _bad = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(json!({ "fields": { "summary": "Broken" } })))
            .with_status(400)
            .with_body(r#"{"errors":{"summary":"bad"}}"#)
            .create();
        let _ok = server
            .mock("POST", "/rest/api/2/issue")
            .match_body(Matcher::PartialJson(json!({ "fields": { "summary": "Fine" } })))
            .with_status(201)
            .with_body(r#"{"key":"QA-9"}"#)
            .create();

        let client = JiraClient::new(&settings(server.url())).unwrap();
        let report = client.sync("QA", &[case(1, "Broken", ""), case(2, "Fine", "")]).unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].test_case_id, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].key, "QA-9");
    }
}
