//! Turn a specification document into a user story fit for generation.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::llm::backend::CompletionBackend;
use crate::llm::client::Decoding;
use crate::llm::prompt::build_spec_analysis_prompt;
use crate::project::ProjectSettings;

const ANALYSIS_TEMPERATURE: f32 = 0.3;
const SUMMARY_CHARS: usize = 300;
const FALLBACK_CHARS: usize = 500;

/// Plain-text formats we read directly.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

/// Read a plain-text or markdown spec.
pub fn read_spec_file(path: &Path) -> io::Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !ext.is_empty() && !TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported spec format `.{ext}`; convert it to .txt or .md first"),
        ));
    }

    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "specification file is empty"));
    }
    Ok(text)
}

/// Never fails: a backend error yields a manual-review document instead.
pub fn analyze_spec(backend: &dyn CompletionBackend, spec_text: &str, settings: &ProjectSettings) -> String {
    let vietnamese = settings.wants_vietnamese();
    let prompt = build_spec_analysis_prompt(spec_text, settings);
    let decoding = Decoding {
        temperature: Some(ANALYSIS_TEMPERATURE),
        max_tokens: None,
    };

    match backend.complete(&prompt, decoding) {
        Ok(analysis) => {
            info!(chars = analysis.len(), "specification analyzed");
            wrap_analysis(analysis.trim(), spec_text, vietnamese)
        }
        Err(e) => {
            warn!(error = %e, "specification analysis failed");
            fallback_document(&e.to_string(), spec_text, vietnamese)
        }
    }
}

fn wrap_analysis(analysis: &str, spec_text: &str, vietnamese: bool) -> String {
    let excerpt = excerpt(spec_text, SUMMARY_CHARS);
    if vietnamese {
        format!(
            "# Câu Chuyện Người Dùng Được Tạo Từ Đặc Tả (AI)\n\n{analysis}\n\n---\n\n\
             **Tóm Tắt Đặc Tả Gốc:**\n{excerpt}\n\n\
             **Lưu Ý:** Nội dung được tạo tự động, hãy rà soát trước khi sinh test case."
        )
    } else {
        format!(
            "# AI-Generated User Story from Specification\n\n{analysis}\n\n---\n\n\
             **Original Specification Summary:**\n{excerpt}\n\n\
             **Note:** Generated automatically; review it before generating test cases."
        )
    }
}

fn fallback_document(error: &str, spec_text: &str, vietnamese: bool) -> String {
    let excerpt = excerpt(spec_text, FALLBACK_CHARS);
    if vietnamese {
        format!(
            "# Phân Tích Đặc Tả (Dự phòng)\n\n**Lỗi Phân Tích AI:** {error}\n\n\
             **Nội dung Đặc tả:**\n{excerpt}\n\n\
             **Cần Xem Xét Thủ Công:** Hãy tự viết câu chuyện người dùng từ nội dung trên."
        )
    } else {
        format!(
            "# Specification Analysis (Fallback)\n\n**AI Analysis Error:** {error}\n\n\
             **Specification Content:**\n{excerpt}\n\n\
             **Manual Review Required:** Write the user story by hand from the content above."
        )
    }
}

/// First `limit` characters, with `...` when cut.
fn excerpt(text: &str, limit: usize) -> String {
    let text = text.trim();
    let mut out: String = text.chars().take(limit).collect();
    if text.chars().count() > limit {
        out.push_str("...");
    }
    out
}
