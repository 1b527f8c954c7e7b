pub mod case;
pub mod extract;
pub mod fallback;
pub mod language;
pub mod normalize;
pub mod relevance;
pub mod steps;

pub use case::TestCase;
pub use fallback::{FallbackPolicy, FALLBACK_MARKER};
pub use language::SubstitutionTable;
