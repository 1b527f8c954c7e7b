use std::fmt;

/* ---------- lifecycle ---------- */

/// Phase of one generation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationPhase {
    Requested,
    Parsing,
    Normalized,
    Validated,
    Delivered,
    Failed,
    Fallback,
}

impl GenerationPhase {
    pub fn can_transition_to(self, next: GenerationPhase) -> bool {
        use GenerationPhase::*;

        matches!(
            (self, next),
            (Requested, Parsing)
                | (Requested, Failed)
                | (Parsing, Normalized)
                | (Parsing, Failed)
                | (Normalized, Validated)
                | (Validated, Delivered)
                // zero usable cases after validation
                | (Validated, Failed)
                | (Failed, Fallback)
                | (Fallback, Delivered)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == GenerationPhase::Delivered
    }
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationPhase::Requested => "REQUESTED",
            GenerationPhase::Parsing => "PARSING",
            GenerationPhase::Normalized => "NORMALIZED",
            GenerationPhase::Validated => "VALIDATED",
            GenerationPhase::Delivered => "DELIVERED",
            GenerationPhase::Failed => "FAILED",
            GenerationPhase::Fallback => "FALLBACK",
        };
        f.write_str(s)
    }
}

/* ---------- trail ---------- */

/// Ordered record of the phases one call went through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseTrail {
    phases: Vec<GenerationPhase>,
}

impl Default for PhaseTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTrail {
    pub fn new() -> Self {
        Self {
            phases: vec![GenerationPhase::Requested],
        }
    }

    pub fn current(&self) -> GenerationPhase {
        self.phases
            .last()
            .copied()
            .unwrap_or(GenerationPhase::Requested)
    }

    /// Advance to `next`. Illegal moves are refused and leave the trail as is.
    pub fn advance(&mut self, next: GenerationPhase) -> bool {
        let from = self.current();
        if !from.can_transition_to(next) {
            tracing::error!(%from, to = %next, "illegal generation phase transition");
            return false;
        }
        tracing::debug!(phase = %next, "generation phase");
        self.phases.push(next);
        true
    }

    pub fn phases(&self) -> &[GenerationPhase] {
        &self.phases
    }

    pub fn went_through(&self, phase: GenerationPhase) -> bool {
        self.phases.contains(&phase)
    }
}

impl fmt::Display for PhaseTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.phases.iter().enumerate() {
            if i > 0 {
                f.write_str(" → ")?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}
