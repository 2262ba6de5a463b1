// Service exports
pub mod dataset;
pub mod embedding;

pub use dataset::{load_population, parse_population, DatasetError};
pub use embedding::{EmbeddingClientError, HttpEmbeddingClient, LexicalEmbedder};
