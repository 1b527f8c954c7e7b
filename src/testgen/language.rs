//! Output-language enforcement.
//!
//! Best-effort: known English phrases are swapped for curated Vietnamese
//! equivalents by literal substring replacement. Anything not in the table
//! passes through untouched; this is a patch layer, not a translator.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::testgen::case::TestCase;

const BUILTIN_TERMS: &str = include_str!("vi_terms.toml");

#[derive(Debug, Deserialize)]
struct TermsFile {
    #[serde(default)]
    terms: BTreeMap<String, String>,
}

/// Ordered pattern → replacement table.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    // longest pattern first
    entries: Vec<(String, String)>,
}

impl SubstitutionTable {
    pub fn builtin() -> Self {
        // the embedded table is covered by tests; an empty table is the only
        // sane degradation if it ever stops parsing
        Self::from_toml_str(BUILTIN_TERMS).unwrap_or_default()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let file: TermsFile = toml::from_str(raw)?;
        Ok(Self::from_pairs(file.terms))
    }

    fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut table = Self::default();
        table.merge(pairs);
        table
    }

    /// Built-ins plus an optional user file. A broken user file is logged
    /// and ignored.
    pub fn load(user_file: Option<&Path>) -> Self {
        let mut table = Self::builtin();

        let Some(path) = user_file else {
            return table;
        };

        match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| toml::from_str::<TermsFile>(&raw).map_err(|e| e.to_string()))
        {
            Ok(file) => {
                debug!(path = %path.display(), terms = file.terms.len(), "loaded user substitutions");
                table.merge(file.terms);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "ignoring substitutions file"),
        }

        table
    }

    /// Add or override entries. Empty patterns are skipped.
    pub fn merge(&mut self, pairs: impl IntoIterator<Item = (String, String)>) {
        for (pattern, replacement) in pairs {
            if pattern.is_empty() {
                continue;
            }
            match self.entries.iter_mut().find(|(p, _)| *p == pattern) {
                Some(entry) => entry.1 = replacement,
                None => self.entries.push((pattern, replacement)),
            }
        }

        self.entries.sort_by(|a, b| {
            b.0.chars()
                .count()
                .cmp(&a.0.chars().count())
                .then_with(|| a.0.cmp(&b.0))
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// Replace in place; returns how many patterns matched.
    pub fn apply(&self, text: &mut String) -> usize {
        let mut hits = 0;
        for (pattern, replacement) in &self.entries {
            if text.contains(pattern.as_str()) {
                *text = text.replace(pattern.as_str(), replacement);
                hits += 1;
            }
        }
        hits
    }
}

/// Apply the table to every prose field of every case when Vietnamese output
/// is requested. `test_data` is left alone: it holds literal input values.
pub fn enforce_language(cases: &mut [TestCase], vietnamese: bool, table: &SubstitutionTable) -> usize {
    if !vietnamese {
        return 0;
    }

    let mut hits = 0;
    for case in cases.iter_mut() {
        for field in case.prose_fields_mut() {
            hits += table.apply(field);
        }
    }

    if hits > 0 {
        debug!(hits, "applied Vietnamese substitutions");
    }
    hits
}
