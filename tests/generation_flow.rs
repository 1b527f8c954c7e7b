use std::cell::RefCell;

use pretty_assertions::assert_eq;
use regex::Regex;
use serde_json::{json, Value};

use storycase::llm::backend::{FailingBackend, MockBackend};
use storycase::llm::client::{Decoding, LlmError};
use storycase::llm::orchestrator::FallbackReason;
use storycase::llm::prompt::LlmPrompt;
use storycase::state::GenerationPhase;
use storycase::testgen::fallback::FallbackPolicy;
use storycase::testgen::FALLBACK_MARKER;
use storycase::{generate, CaseSource, CompletionBackend, GenerationOptions, ProjectSettings, TestCase};

const LOGIN_STORY: &str = "As a user I want to log in with email and password";

fn settings(language: &str) -> ProjectSettings {
    ProjectSettings {
        name: "Shop".into(),
        languages: vec![language.into()],
        testing_types: vec!["Functional".into()],
        ..Default::default()
    }
}

fn completion(cases: Vec<Value>) -> String {
    json!({ "test_cases": cases }).to_string()
}

fn record(id: Value, title: &str, steps: Value) -> Value {
    json!({
        "test_case_id": id,
        "test_title": title,
        "description": "Verify login with a registered email",
        "preconditions": "User has an account",
        "test_steps": steps,
        "test_data": "Email: an@example.com; Password: Secr3t!",
        "expected_result": "User lands on the dashboard",
        "comments": ""
    })
}

fn assert_steps_well_formed(cases: &[TestCase]) {
    let shape = Regex::new(r"^1\. .+(\n\d+\. .+)*$").unwrap();
    for case in cases {
        assert!(shape.is_match(&case.test_steps), "bad steps: {:?}", case.test_steps);
        for (i, line) in case.test_steps.lines().enumerate() {
            assert!(line.starts_with(&format!("{}. ", i + 1)), "gap in numbering: {:?}", case.test_steps);
        }
    }
}

fn assert_ids_sequential(cases: &[TestCase]) {
    let ids: Vec<u32> = cases.iter().map(|c| c.test_case_id).collect();
    let expected: Vec<u32> = (1..=cases.len() as u32).collect();
    assert_eq!(ids, expected);
}

/// Records every prompt it is given.
struct RecordingBackend {
    response: String,
    prompts: RefCell<Vec<LlmPrompt>>,
}

impl CompletionBackend for RecordingBackend {
    fn complete(&self, prompt: &LlmPrompt, _decoding: Decoding) -> Result<String, LlmError> {
        self.prompts.borrow_mut().push(prompt.clone());
        Ok(self.response.clone())
    }
}

struct ErrBackend(fn() -> LlmError);

impl CompletionBackend for ErrBackend {
    fn complete(&self, _prompt: &LlmPrompt, _decoding: Decoding) -> Result<String, LlmError> {
        Err((self.0)())
    }
}

#[test]
fn english_login_story_yields_numbered_cases() {
    let raw = completion(
        (1..=5)
            .map(|i| record(json!(i), "Email Field", json!(["Open the login page", "Enter email", "Click Log in"])))
            .collect(),
    );
    let backend = RecordingBackend {
        response: raw,
        prompts: RefCell::new(Vec::new()),
    };

    let out = generate(&backend, LOGIN_STORY, 5, &settings("English"), &GenerationOptions::default());

    assert!(!out.is_fallback());
    assert_eq!(out.cases.len(), 5);
    assert_steps_well_formed(&out.cases);
    assert_ids_sequential(&out.cases);
    assert!(out.cases.iter().any(|c| {
        let text = format!("{} {} {}", c.test_title, c.description, c.test_steps).to_lowercase();
        text.contains("login") || text.contains("log in")
    }));

    let prompts = backend.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].user.contains(LOGIN_STORY));
    assert!(prompts[0].user.contains("Generate exactly 5 test cases."));
}

#[test]
fn vietnamese_titles_are_substituted() {
    let raw = completion(vec![record(json!(1), "Email Field", json!("1. Mở trang đăng nhập\n2. Nhập email"))]);

    let out = generate(
        &MockBackend::new(raw),
        "Người dùng muốn đăng nhập bằng email",
        3,
        &settings("Vietnamese"),
        &GenerationOptions::default(),
    );

    assert_eq!(out.cases[0].test_title, "Trường Email");
    for case in &out.cases {
        assert!(!case.test_title.contains("Email Field"));
    }
}

#[test]
fn fenced_completion_with_trailing_comma_is_recovered() {
    let raw = "Here you go:\n```json\n{\"test_cases\": [{\"test_case_id\":1, \"test_title\":\"Password Field\", \
               \"description\":\"Log in with wrong password\", \"preconditions\":\"\", \
               \"test_steps\":\"1. Enter email; 2. Enter wrong password; 3. Click Log in\", \
               \"test_data\":\"Password: wrong123\", \"expected_result\":\"Error shown\", \"comments\":\"\",}]}\n```";

    let out = generate(&MockBackend::new(raw), LOGIN_STORY, 5, &settings("English"), &GenerationOptions::default());

    assert!(matches!(out.source, CaseSource::Model { .. }));
    assert_eq!(out.cases.len(), 1);
    assert_eq!(out.cases[0].test_steps, "1. Enter email\n2. Enter wrong password\n3. Click Log in");
}

#[test]
fn connection_error_falls_back_with_language_floor() {
    let en = generate(&FailingBackend, LOGIN_STORY, 1, &settings("English"), &GenerationOptions::default());
    assert_eq!(en.cases.len(), 1);

    let vi = generate(&FailingBackend, LOGIN_STORY, 5, &settings("Vietnamese"), &GenerationOptions::default());
    assert!(vi.cases.len() >= 3);

    for out in [&en, &vi] {
        assert!(out.is_fallback());
        assert!(out.cases.iter().all(|c| c.comments.contains(FALLBACK_MARKER)));
        assert_steps_well_formed(&out.cases);
        assert_ids_sequential(&out.cases);
        assert_eq!(
            out.trail.phases(),
            &[
                GenerationPhase::Requested,
                GenerationPhase::Failed,
                GenerationPhase::Fallback,
                GenerationPhase::Delivered,
            ]
        );
    }
}

#[test]
fn requested_count_caps_model_and_fallback_output() {
    let raw = completion((1..=3).map(|i| record(json!(i), "Email Field", json!(["Open page", "Type email"]))).collect());
    let out = generate(&MockBackend::new(raw), LOGIN_STORY, 1, &settings("English"), &GenerationOptions::default());
    assert_eq!(out.cases.len(), 1);

    // the Vietnamese floor never pushes past the requested count
    let out = generate(&FailingBackend, LOGIN_STORY, 1, &settings("Vietnamese"), &GenerationOptions::default());
    assert_eq!(out.cases.len(), 1);
}

#[test]
fn duplicate_model_ids_are_reassigned() {
    let raw = completion(vec![
        record(json!(1), "Email Field", json!(["Open page", "Type email"])),
        record(json!(1), "Password Field", json!(["Open page", "Type password"])),
        record(json!("TC-7"), "Login Button", json!(["Open page", "Click Log in"])),
    ]);

    let out = generate(&MockBackend::new(raw), LOGIN_STORY, 5, &settings("English"), &GenerationOptions::default());

    assert_ids_sequential(&out.cases);
    assert_eq!(out.cases.len(), 3);
}

#[test]
fn malformed_record_is_dropped_not_fatal() {
    let raw = completion(vec![
        record(json!(1), "Email Field", json!(["Open page", "Type email"])),
        json!("not an object"),
        record(json!(null), "No Id", json!(["Open page"])),
        record(json!(3), "Password Field", json!(["Open page", "Type password"])),
    ]);

    let out = generate(&MockBackend::new(raw), LOGIN_STORY, 5, &settings("English"), &GenerationOptions::default());

    match out.source {
        CaseSource::Model { dropped, .. } => assert_eq!(dropped, 2),
        other => panic!("expected model output, got {other:?}"),
    }
    let titles: Vec<&str> = out.cases.iter().map(|c| c.test_title.as_str()).collect();
    assert_eq!(titles, vec!["Email Field", "Password Field"]);
}

#[test]
fn fallback_is_deterministic() {
    let a = generate(&FailingBackend, LOGIN_STORY, 4, &settings("Vietnamese"), &GenerationOptions::default());
    let b = generate(&FailingBackend, LOGIN_STORY, 4, &settings("Vietnamese"), &GenerationOptions::default());
    assert_eq!(a.cases, b.cases);
}

#[test]
fn configured_floor_is_respected() {
    let options = GenerationOptions {
        policy: FallbackPolicy {
            min_cases_vietnamese: 1,
            min_cases_default: 1,
        },
        ..Default::default()
    };
    let out = generate(&FailingBackend, LOGIN_STORY, 5, &settings("Vietnamese"), &options);
    assert_eq!(out.cases.len(), 5);
}

#[test]
fn fallback_reason_keeps_error_kind() {
    let out = generate(
        &ErrBackend(|| LlmError::Authentication {
            status: 401,
            body: "bad key".into(),
        }),
        LOGIN_STORY,
        2,
        &settings("English"),
        &GenerationOptions::default(),
    );

    assert!(matches!(
        out.source,
        CaseSource::Fallback {
            reason: FallbackReason::Unavailable(LlmError::Authentication { status: 401, .. })
        }
    ));
}

#[test]
fn unrelated_cases_get_story_context() {
    let mut unrelated = record(json!(1), "Footer Links", json!(["Scroll to the bottom", "Read the footer"]));
    unrelated["description"] = json!("Footer shows copyright");
    let raw = completion(vec![unrelated]);

    let out = generate(&MockBackend::new(raw), LOGIN_STORY, 1, &settings("English"), &GenerationOptions::default());

    assert_eq!(out.cases[0].description, "[Story context: login] Footer shows copyright");
}
