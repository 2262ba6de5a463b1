use serde::{Deserialize, Serialize};
use crate::models::domain::{RankedMatch, Role};

/// Response for the top-N endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopMatchesResponse {
    pub identity: String,
    pub role: Role,
    pub matches: Vec<RankedMatch>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub seekers: usize,
    pub providers: usize,
    pub pairs: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
