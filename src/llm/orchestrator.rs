use std::fmt;

use tracing::{info, warn};

use crate::llm::backend::CompletionBackend;
use crate::llm::client::{Decoding, LlmError};
use crate::llm::prompt::build_prompt;
use crate::project::ProjectSettings;
use crate::state::{GenerationPhase, PhaseTrail};
use crate::testgen::case::{renumber, TestCase};
use crate::testgen::extract::ParseTier;
use crate::testgen::fallback::{synthesize, FallbackPolicy};
use crate::testgen::language::{enforce_language, SubstitutionTable};
use crate::testgen::normalize::normalize_completion;
use crate::testgen::relevance::validate_against_story;

/// Upper bound on cases per call. Larger requests are clamped.
pub const MAX_CASES: usize = 100;

/// Knobs for one `generate` call that do not come from the project.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub policy: FallbackPolicy,
    pub substitutions: SubstitutionTable,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            policy: FallbackPolicy::default(),
            substitutions: SubstitutionTable::builtin(),
        }
    }
}

#[derive(Debug)]
pub enum FallbackReason {
    Unavailable(LlmError),
    Unparsable,
    Empty,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Unavailable(e) => write!(f, "generation unavailable: {e}"),
            FallbackReason::Unparsable => f.write_str("completion could not be parsed"),
            FallbackReason::Empty => f.write_str("no usable test cases in completion"),
        }
    }
}

#[derive(Debug)]
pub enum CaseSource {
    Model { tier: ParseTier, dropped: usize },
    Fallback { reason: FallbackReason },
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub cases: Vec<TestCase>,
    pub source: CaseSource,
    pub trail: PhaseTrail,
}

impl GenerationOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, CaseSource::Fallback { .. })
    }
}

/// Story → test cases. Always returns between 1 and `count.clamp(1, MAX_CASES)` cases.
pub fn generate(
    backend: &dyn CompletionBackend,
    story: &str,
    count: usize,
    settings: &ProjectSettings,
    options: &GenerationOptions,
) -> GenerationOutcome {
    let count = count.clamp(1, MAX_CASES);
    let vietnamese = settings.wants_vietnamese();
    let mut trail = PhaseTrail::new();

    info!(count, vietnamese, backend = backend.name(), "generation requested");

    /* ================= PROMPT + COMPLETION ================= */

    let prompt = build_prompt(story, count, settings);

    let raw = match backend.complete(&prompt, Decoding::default()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "completion failed");
            trail.advance(GenerationPhase::Failed);
            return deliver_fallback(count, vietnamese, options, trail, FallbackReason::Unavailable(e));
        }
    };

    /* ================= NORMALIZE ================= */

    trail.advance(GenerationPhase::Parsing);
    let normalized = normalize_completion(&raw, count);

    let Some(tier) = normalized.tier else {
        trail.advance(GenerationPhase::Failed);
        return deliver_fallback(count, vietnamese, options, trail, FallbackReason::Unparsable);
    };
    if normalized.cases.is_empty() {
        trail.advance(GenerationPhase::Failed);
        return deliver_fallback(count, vietnamese, options, trail, FallbackReason::Empty);
    }
    trail.advance(GenerationPhase::Normalized);

    let mut cases = normalized.cases;

    /* ================= LANGUAGE + RELEVANCE ================= */

    let substituted = enforce_language(&mut cases, vietnamese, &options.substitutions);
    let annotated = validate_against_story(&mut cases, story, vietnamese);
    trail.advance(GenerationPhase::Validated);

    trail.advance(GenerationPhase::Delivered);
    info!(
        delivered = cases.len(),
        ?tier,
        dropped = normalized.dropped,
        substituted,
        annotated,
        "generation delivered"
    );

    GenerationOutcome {
        cases,
        source: CaseSource::Model {
            tier,
            dropped: normalized.dropped,
        },
        trail,
    }
}

fn deliver_fallback(
    count: usize,
    vietnamese: bool,
    options: &GenerationOptions,
    mut trail: PhaseTrail,
    reason: FallbackReason,
) -> GenerationOutcome {
    warn!(%reason, "falling back to synthesized test cases");
    trail.advance(GenerationPhase::Fallback);

    let mut cases = synthesize(count, vietnamese, &options.policy);
    cases.truncate(count);
    renumber(&mut cases);

    trail.advance(GenerationPhase::Delivered);
    info!(delivered = cases.len(), "fallback delivered");

    GenerationOutcome {
        cases,
        source: CaseSource::Fallback { reason },
        trail,
    }
}
