//! Story-match check.
//!
//! A heuristic nudge, not semantic validation: find the action verbs the
//! story uses, and annotate any case whose title, description and steps
//! mention none of them.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::testgen::case::TestCase;

/// One action, with its English and Vietnamese spellings.
pub struct ActionTerm {
    pub english: &'static str,
    pub vietnamese: &'static str,
    pub variants: &'static [&'static str],
}

pub const ACTION_TERMS: &[ActionTerm] = &[
    ActionTerm { english: "login", vietnamese: "đăng nhập", variants: &["login", "log in", "logging in", "sign in", "signin", "đăng nhập"] },
    ActionTerm { english: "logout", vietnamese: "đăng xuất", variants: &["logout", "log out", "sign out", "đăng xuất"] },
    ActionTerm { english: "register", vietnamese: "đăng ký", variants: &["register", "registration", "sign up", "signup", "đăng ký"] },
    ActionTerm { english: "submit", vietnamese: "gửi", variants: &["submit", "submits", "submitting", "gửi"] },
    ActionTerm { english: "click", vietnamese: "nhấp", variants: &["click", "clicks", "tap", "press", "nhấp", "nhấn", "bấm"] },
    ActionTerm { english: "search", vietnamese: "tìm kiếm", variants: &["search", "searches", "searching", "find", "tìm kiếm"] },
    ActionTerm { english: "upload", vietnamese: "tải lên", variants: &["upload", "uploads", "uploading", "tải lên"] },
    ActionTerm { english: "download", vietnamese: "tải xuống", variants: &["download", "downloads", "downloading", "tải xuống"] },
    ActionTerm { english: "delete", vietnamese: "xóa", variants: &["delete", "deletes", "remove", "xóa", "xoá"] },
    ActionTerm { english: "update", vietnamese: "cập nhật", variants: &["update", "updates", "edit", "modify", "cập nhật", "chỉnh sửa"] },
    ActionTerm { english: "create", vietnamese: "tạo", variants: &["create", "creates", "add", "adds", "tạo", "thêm"] },
    ActionTerm { english: "pay", vietnamese: "thanh toán", variants: &["pay", "payment", "checkout", "check out", "thanh toán"] },
    ActionTerm { english: "reset password", vietnamese: "đặt lại mật khẩu", variants: &["reset password", "reset my password", "forgot password", "đặt lại mật khẩu", "quên mật khẩu"] },
    ActionTerm { english: "filter", vietnamese: "lọc", variants: &["filter", "filters", "filtering", "lọc"] },
    ActionTerm { english: "sort", vietnamese: "sắp xếp", variants: &["sort", "sorts", "sorting", "sắp xếp"] },
    ActionTerm { english: "export", vietnamese: "xuất", variants: &["export", "exports", "exporting", "xuất"] },
];

fn term_patterns() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        ACTION_TERMS
            .iter()
            .map(|term| {
                let alternatives: Vec<String> =
                    term.variants.iter().map(|v| regex::escape(v)).collect();
                Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
                    .expect("action term regex")
            })
            .collect()
    })
}

/// Indices into `ACTION_TERMS` found in `text`.
pub fn detect_actions(text: &str) -> Vec<usize> {
    term_patterns()
        .iter()
        .enumerate()
        .filter(|(_, re)| re.is_match(text))
        .map(|(i, _)| i)
        .collect()
}

/// Prepend a context note to cases that mention none of the story's actions.
/// Returns how many cases were annotated. No structural change, no deletion.
pub fn validate_against_story(cases: &mut [TestCase], story: &str, vietnamese: bool) -> usize {
    let story_actions = detect_actions(story);
    if story_actions.is_empty() {
        return 0;
    }

    let names: Vec<&str> = story_actions
        .iter()
        .map(|&i| {
            if vietnamese {
                ACTION_TERMS[i].vietnamese
            } else {
                ACTION_TERMS[i].english
            }
        })
        .collect();

    let note = if vietnamese {
        format!("[Liên quan đến câu chuyện: {}] ", names.join(", "))
    } else {
        format!("[Story context: {}] ", names.join(", "))
    };

    let patterns = term_patterns();
    let mut annotated = 0;

    for case in cases.iter_mut() {
        let combined = format!("{}\n{}\n{}", case.test_title, case.description, case.test_steps);
        let related = story_actions.iter().any(|&i| patterns[i].is_match(&combined));

        if !related && !case.description.starts_with(note.as_str()) {
            case.description.insert_str(0, &note);
            annotated += 1;
        }
    }

    if annotated > 0 {
        debug!(annotated, "annotated cases unrelated to story actions");
    }
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(title: &str, steps: &str) -> TestCase {
        TestCase {
            test_case_id: 1,
            test_title: title.into(),
            description: "Checks the page".into(),
            preconditions: String::new(),
            test_steps: steps.into(),
            test_data: String::new(),
            expected_result: String::new(),
            comments: String::new(),
        }
    }

    #[test]
    fn detects_english_and_vietnamese_actions() {
        let found = detect_actions("As a user I want to log in and search products");
        let names: Vec<&str> = found.iter().map(|&i| ACTION_TERMS[i].english).collect();
        assert_eq!(names, vec!["login", "search"]);

        let found = detect_actions("Người dùng muốn đăng nhập bằng email");
        assert_eq!(ACTION_TERMS[found[0]].english, "login");
    }

    #[test]
    fn word_boundaries_prevent_false_hits() {
        // "address" must not count as "add"
        assert!(detect_actions("Shows the address").is_empty());
    }

    #[test]
    fn unrelated_cases_are_annotated() {
        let mut cases = vec![
            case("Email Field", "1. Open login form\n2. Enter email"),
            case("Footer Links", "1. Scroll down\n2. Read footer"),
        ];

        let n = validate_against_story(&mut cases, "I want to log in with email", false);

        assert_eq!(n, 1);
        assert_eq!(cases[0].description, "Checks the page");
        assert_eq!(cases[1].description, "[Story context: login] Checks the page");
    }

    #[test]
    fn vietnamese_note_uses_vietnamese_terms() {
        let mut cases = vec![case("Trường Email", "1. Mở trang chủ")];
        validate_against_story(&mut cases, "Người dùng đăng nhập", true);
        assert!(cases[0].description.starts_with("[Liên quan đến câu chuyện: đăng nhập]"));
    }

    #[test]
    fn story_without_actions_is_a_no_op() {
        let mut cases = vec![case("Footer Links", "1. Scroll down")];
        let before = cases.clone();
        assert_eq!(validate_against_story(&mut cases, "The footer is blue", false), 0);
        assert_eq!(cases, before);
    }

    #[test]
    fn annotation_is_not_repeated() {
        let mut cases = vec![case("Footer Links", "1. Scroll down")];
        validate_against_story(&mut cases, "log in", false);
        validate_against_story(&mut cases, "log in", false);
        assert_eq!(cases[0].description.matches("[Story context").count(), 1);
    }
}
