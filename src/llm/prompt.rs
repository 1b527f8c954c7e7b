use crate::project::ProjectSettings;

#[derive(Debug, Clone)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(story: &str, count: usize, settings: &ProjectSettings) -> LlmPrompt {
    let vietnamese = settings.wants_vietnamese();
    let system = system_prompt(vietnamese);
    let user = user_prompt(story, count, settings, vietnamese);

    LlmPrompt { system, user }
}

/* ============================================================
   System prompt (stable, reused)
   ============================================================ */

fn system_prompt(vietnamese: bool) -> String {
    let mut out = String::from(
        r#"
You are an expert software tester. Analyse the given user story in depth and generate
a comprehensive set of test cases, including functional, edge and boundary cases, to
ensure complete test coverage of the functionality.

Respond with a single JSON object and nothing else:
{
  "test_cases": [
    {
      "test_case_id": 1,
      "test_title": "...",
      "description": "...",
      "preconditions": "...",
      "test_steps": "1. ...\n2. ...",
      "test_data": "...",
      "expected_result": "...",
      "comments": "..."
    }
  ]
}
"#
        .trim(),
    );

    if vietnamese {
        out.push_str("\n\n");
        out.push_str(&language_mandate());
    }

    out
}

fn language_mandate() -> String {
    "LANGUAGE REQUIREMENT (MANDATORY)\n\
     - Write EVERY field value in Vietnamese (tiếng Việt).\n\
     - Do NOT write English titles such as \"Email Field\"; write \"Trường Email\".\n\
     - Only JSON keys stay in English.\n\
     BẮT BUỘC: Viết toàn bộ nội dung test case bằng tiếng Việt!"
        .to_string()
}

/* ============================================================
   User prompt
   ============================================================ */

fn user_prompt(story: &str, count: usize, settings: &ProjectSettings, vietnamese: bool) -> String {
    let mut out = String::new();

    /* ---------- STORY ---------- */
    out.push_str("USER STORY\n");
    out.push_str(story.trim());
    out.push_str("\n\n");

    /* ---------- CONTEXT ---------- */
    let context = settings.context_lines();
    if !context.is_empty() {
        out.push_str("PROJECT CONTEXT\n");
        for (key, value) in context {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        out.push('\n');
    }

    /* ---------- COUNT ---------- */
    out.push_str(&format!("Generate exactly {} test cases.\n\n", count));

    /* ---------- FORMAT RULES ---------- */
    out.push_str(
        "FORMAT RULES\n\
         - test_title must be exactly the name of the single field or component under test \
         (e.g. \"Email Field\", \"Login Button\"), nothing else.\n\
         - test_steps must be ONE string of numbered lines joined by \\n \
         (\"1. ...\\n2. ...\"), never a JSON array.\n\
         - test_data must contain concrete example values \
         (e.g. \"Email: nguyen.an@example.com\"), never placeholders like \"valid email\".\n\
         - test_case_id values are sequential integers starting at 1.\n",
    );

    /* ---------- LANGUAGE (repeated on purpose) ---------- */
    if vietnamese {
        out.push('\n');
        out.push_str(&language_mandate());
        out.push('\n');
    }

    out
}

/* ============================================================
   Specification analysis (spec document → user story)
   ============================================================ */

pub fn build_spec_analysis_prompt(spec_text: &str, settings: &ProjectSettings) -> LlmPrompt {
    let testing_types = settings.testing_types.join(", ");
    let languages = settings.languages.join(", ");

    if settings.wants_vietnamese() {
        let style = non_empty_or(&settings.writing_style, "Chuyên nghiệp và rõ ràng");
        return LlmPrompt {
            system: "Bạn là một chuyên gia phân tích nghiệp vụ và kiểm thử phần mềm.".to_string(),
            user: format!(
                "Hãy phân tích tài liệu đặc tả sau và trích xuất các yêu cầu chức năng chính \
                 để tạo ra một câu chuyện người dùng toàn diện.\n\n\
                 Bối cảnh Dự án:\n\
                 - Loại Kiểm thử: {testing_types}\n\
                 - Ngôn ngữ: {languages}\n\
                 - Phong cách Viết: {style}\n\n\
                 Tài liệu Đặc tả:\n{spec}\n\n\
                 Câu chuyện người dùng cần bao gồm:\n\
                 1. Personas Người dùng\n\
                 2. Tính năng Cốt lõi\n\
                 3. Quy trình Người dùng\n\
                 4. Tiêu chí Chấp nhận\n\
                 5. Quy tắc Nghiệp vụ\n\
                 6. Điểm Tích hợp\n\n\
                 Tập trung vào các yêu cầu có thể kiểm thử, bao gồm cả kịch bản tích cực và tiêu cực.\n\n\
                 QUAN TRỌNG: Viết toàn bộ phản hồi bằng tiếng Việt!",
                spec = spec_text.trim(),
            ),
        };
    }

    let style = non_empty_or(&settings.writing_style, "Professional and clear");
    LlmPrompt {
        system: "You are an expert business analyst and software tester.".to_string(),
        user: format!(
            "Analyze the following specification document and extract the key functional \
             requirements to create a comprehensive user story.\n\n\
             Project Context:\n\
             - Testing Types: {testing_types}\n\
             - Languages: {languages}\n\
             - Writing Style: {style}\n\n\
             Specification Document:\n{spec}\n\n\
             The user story must cover:\n\
             1. User Personas\n\
             2. Core Features\n\
             3. User Workflows\n\
             4. Acceptance Criteria\n\
             5. Business Rules\n\
             6. Integration Points\n\n\
             Focus on actionable, testable requirements covering both positive and negative scenarios.",
            spec = spec_text.trim(),
        ),
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}
