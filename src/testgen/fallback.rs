//! Deterministic test cases for when the model gives us nothing usable.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::testgen::case::TestCase;
use crate::testgen::steps::number_steps;

/// Every synthesized case carries this in `comments`.
pub const FALLBACK_MARKER: &str = "fallback generated";

/// Minimum number of synthesized cases, per output language.
///
/// The requested count still caps what the pipeline delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    pub min_cases_vietnamese: usize,
    pub min_cases_default: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            min_cases_vietnamese: 3,
            min_cases_default: 1,
        }
    }
}

impl FallbackPolicy {
    pub fn floor(&self, vietnamese: bool) -> usize {
        let floor = if vietnamese {
            self.min_cases_vietnamese
        } else {
            self.min_cases_default
        };
        floor.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    PositiveFlow,
    InvalidCredentials,
    BoundaryValues,
    ErrorHandling,
    DataValidation,
}

struct Template {
    title: &'static str,
    description: &'static str,
    preconditions: &'static str,
    steps: &'static [&'static str],
    test_data: &'static str,
    expected_result: &'static str,
}

struct Entry {
    archetype: Archetype,
    english: Template,
    vietnamese: Template,
}

const CATALOGUE: [Entry; 5] = [
    Entry {
        archetype: Archetype::PositiveFlow,
        english: Template {
            title: "Main Flow",
            description: "Verify the main flow of the story completes with valid input",
            preconditions: "The application is reachable and the user has a valid account",
            steps: &[
                "Open the application in the browser",
                "Fill every required field with valid values",
                "Click the primary action button",
                "Observe the resulting page",
            ],
            test_data: "Email: nguyen.an@example.com; Password: Secr3t!Pass",
            expected_result: "The action succeeds and a confirmation is shown",
        },
        vietnamese: Template {
            title: "Luồng chính",
            description: "Kiểm tra luồng chính của câu chuyện hoàn tất với dữ liệu hợp lệ",
            preconditions: "Ứng dụng truy cập được và người dùng có tài khoản hợp lệ",
            steps: &[
                "Mở ứng dụng trên trình duyệt",
                "Nhập giá trị hợp lệ vào tất cả trường bắt buộc",
                "Nhấn nút thao tác chính",
                "Quan sát trang kết quả",
            ],
            test_data: "Email: nguyen.an@example.com; Mật khẩu: Secr3t!Pass",
            expected_result: "Thao tác thành công và hiển thị thông báo xác nhận",
        },
    },
    Entry {
        archetype: Archetype::InvalidCredentials,
        english: Template {
            title: "Credentials Field",
            description: "Verify the system rejects invalid credentials",
            preconditions: "The user is on the sign-in screen",
            steps: &[
                "Enter a registered email address",
                "Enter an incorrect password",
                "Click the sign-in button",
            ],
            test_data: "Email: nguyen.an@example.com; Password: wrongPass123",
            expected_result: "Access is denied and an error about invalid credentials is shown",
        },
        vietnamese: Template {
            title: "Trường thông tin đăng nhập",
            description: "Kiểm tra hệ thống từ chối thông tin đăng nhập không hợp lệ",
            preconditions: "Người dùng đang ở màn hình đăng nhập",
            steps: &[
                "Nhập địa chỉ email đã đăng ký",
                "Nhập mật khẩu sai",
                "Nhấn nút đăng nhập",
            ],
            test_data: "Email: nguyen.an@example.com; Mật khẩu: wrongPass123",
            expected_result: "Truy cập bị từ chối và hiển thị lỗi thông tin đăng nhập không hợp lệ",
        },
    },
    Entry {
        archetype: Archetype::BoundaryValues,
        english: Template {
            title: "Input Length Limits",
            description: "Verify inputs at the minimum and maximum allowed length",
            preconditions: "The form under test is open",
            steps: &[
                "Enter a value with exactly the minimum allowed length",
                "Submit the form and note the result",
                "Enter a value one character over the maximum length",
                "Submit the form again",
            ],
            test_data: "Min: \"abcdef\" (6 chars); Max+1: 256 x \"a\"",
            expected_result: "The minimum-length value is accepted; the over-length value is rejected with a length message",
        },
        vietnamese: Template {
            title: "Giới hạn độ dài dữ liệu",
            description: "Kiểm tra dữ liệu ở độ dài tối thiểu và tối đa cho phép",
            preconditions: "Biểu mẫu cần kiểm tra đang mở",
            steps: &[
                "Nhập giá trị có độ dài đúng bằng mức tối thiểu",
                "Gửi biểu mẫu và ghi nhận kết quả",
                "Nhập giá trị dài hơn mức tối đa một ký tự",
                "Gửi biểu mẫu lần nữa",
            ],
            test_data: "Tối thiểu: \"abcdef\" (6 ký tự); Tối đa+1: 256 ký tự \"a\"",
            expected_result: "Giá trị tối thiểu được chấp nhận; giá trị vượt quá bị từ chối kèm thông báo độ dài",
        },
    },
    Entry {
        archetype: Archetype::ErrorHandling,
        english: Template {
            title: "Server Error Message",
            description: "Verify the user sees a clear message when the server fails",
            preconditions: "The backend is configured to return an error",
            steps: &[
                "Open the feature under test",
                "Trigger the main action",
                "Wait for the response",
            ],
            test_data: "Simulated response: HTTP 500",
            expected_result: "A friendly error message is shown and no data is lost",
        },
        vietnamese: Template {
            title: "Thông báo lỗi máy chủ",
            description: "Kiểm tra người dùng thấy thông báo rõ ràng khi máy chủ gặp lỗi",
            preconditions: "Hệ thống phía sau được cấu hình để trả về lỗi",
            steps: &[
                "Mở chức năng cần kiểm tra",
                "Thực hiện thao tác chính",
                "Chờ phản hồi",
            ],
            test_data: "Phản hồi giả lập: HTTP 500",
            expected_result: "Hiển thị thông báo lỗi thân thiện và không mất dữ liệu",
        },
    },
    Entry {
        archetype: Archetype::DataValidation,
        english: Template {
            title: "Email Format",
            description: "Verify malformed input is rejected by field validation",
            preconditions: "The form under test is open",
            steps: &[
                "Enter a malformed email address",
                "Leave a required field empty",
                "Submit the form",
            ],
            test_data: "Email: nguyen.an@@example; Name: (empty)",
            expected_result: "Each invalid field shows its own validation message and nothing is saved",
        },
        vietnamese: Template {
            title: "Định dạng email",
            description: "Kiểm tra dữ liệu sai định dạng bị từ chối bởi kiểm tra trường",
            preconditions: "Biểu mẫu cần kiểm tra đang mở",
            steps: &[
                "Nhập địa chỉ email sai định dạng",
                "Để trống một trường bắt buộc",
                "Gửi biểu mẫu",
            ],
            test_data: "Email: nguyen.an@@example; Họ tên: (để trống)",
            expected_result: "Mỗi trường không hợp lệ hiển thị thông báo riêng và không có dữ liệu nào được lưu",
        },
    },
];

/// Archetype assigned to the `index`-th synthesized case.
pub fn archetype_for(index: usize) -> Archetype {
    CATALOGUE[index % CATALOGUE.len()].archetype
}

/// Build `max(requested, floor)` cases, cycling the catalogue. Never empty.
pub fn synthesize(requested: usize, vietnamese: bool, policy: &FallbackPolicy) -> Vec<TestCase> {
    let total = requested.max(policy.floor(vietnamese));
    info!(total, vietnamese, "synthesizing fallback test cases");

    (0..total)
        .map(|i| {
            let entry = &CATALOGUE[i % CATALOGUE.len()];
            let round = i / CATALOGUE.len();
            let t = if vietnamese { &entry.vietnamese } else { &entry.english };

            let test_title = if round == 0 {
                t.title.to_string()
            } else {
                format!("{} (#{})", t.title, round + 1)
            };

            let comments = if vietnamese {
                format!("{FALLBACK_MARKER}: test case dự phòng do không nhận được phản hồi hợp lệ từ AI")
            } else {
                format!("{FALLBACK_MARKER}: the AI response was unavailable or unusable")
            };

            TestCase {
                test_case_id: i as u32 + 1,
                test_title,
                description: t.description.to_string(),
                preconditions: t.preconditions.to_string(),
                test_steps: number_steps(t.steps.iter()),
                test_data: t.test_data.to_string(),
                expected_result: t.expected_result.to_string(),
                comments,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_empty() {
        let policy = FallbackPolicy::default();
        assert_eq!(synthesize(0, false, &policy).len(), 1);
        assert_eq!(synthesize(1, false, &policy).len(), 1);
    }

    #[test]
    fn vietnamese_floor_applies() {
        let policy = FallbackPolicy::default();
        assert_eq!(synthesize(1, true, &policy).len(), 3);
        assert_eq!(synthesize(7, true, &policy).len(), 7);
    }

    #[test]
    fn floor_is_configurable() {
        let policy = FallbackPolicy {
            min_cases_vietnamese: 1,
            min_cases_default: 4,
        };
        assert_eq!(synthesize(1, true, &policy).len(), 1);
        assert_eq!(synthesize(1, false, &policy).len(), 4);
    }

    #[test]
    fn catalogue_is_cycled_round_robin() {
        let cases = synthesize(7, false, &FallbackPolicy::default());
        assert_eq!(archetype_for(0), Archetype::PositiveFlow);
        assert_eq!(archetype_for(5), Archetype::PositiveFlow);
        assert_eq!(archetype_for(6), Archetype::InvalidCredentials);
        assert_eq!(cases[5].test_title, "Main Flow (#2)");
        assert_eq!(cases[6].test_title, "Credentials Field (#2)");
    }

    #[test]
    fn output_is_deterministic() {
        let policy = FallbackPolicy::default();
        assert_eq!(synthesize(6, true, &policy), synthesize(6, true, &policy));
    }

    #[test]
    fn every_case_is_marked_and_well_formed() {
        for vietnamese in [false, true] {
            let cases = synthesize(5, vietnamese, &FallbackPolicy::default());
            for (i, case) in cases.iter().enumerate() {
                assert_eq!(case.test_case_id, i as u32 + 1);
                assert!(case.comments.starts_with(FALLBACK_MARKER));
                assert!(case.test_steps.starts_with("1. "));
                assert!(!case.test_title.is_empty());
            }
        }
    }
}
