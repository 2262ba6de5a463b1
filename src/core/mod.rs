// Core algorithm exports
pub mod categorical;
pub mod delimited;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod matrix;
pub mod scoring;
pub mod similarity;
pub mod table;

pub use categorical::{industry_score, timeline_score, CategoricalRules};
pub use engine::MatchEngine;
pub use error::{EngineError, SimilarityError};
pub use matcher::{get_top_matches, top_matches, Matcher};
pub use matrix::{project, ScoreMatrix};
pub use scoring::calculate_pair_score;
pub use similarity::{
    cosine_similarity, EmbeddingSimilarity, SimilarityProvider, TextEmbedder, TimeoutSimilarity,
};
pub use table::MatchTable;
