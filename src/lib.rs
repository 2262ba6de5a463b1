//! SkillMatch - pairwise seeker/provider matching engine
//!
//! Scores every (seeker, provider) pair by a weighted combination of semantic
//! text similarity and categorical compatibility, then serves top-N
//! recommendations, a dense score matrix and a delimited export of the table.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    get_top_matches, industry_score, project, timeline_score, top_matches, EngineError,
    MatchEngine, MatchTable, Matcher, ScoreMatrix, SimilarityProvider,
};
pub use models::{PairScore, Population, Provider, RankedMatch, ScoringWeights, Seeker};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        assert_eq!(industry_score("Fintech", "Any"), 70);
        assert!(top_matches("F1", &MatchTable::default(), 3).is_empty());
    }
}
