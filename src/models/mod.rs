// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    EntityRecord, PairScore, Population, Provider, ProviderView, RankedMatch, Role,
    ScoreBreakdown, ScoringWeights, Seeker, SeekerView, PROVIDER_PREFIX, SEEKER_PREFIX,
};
pub use requests::TopMatchesQuery;
pub use responses::{ErrorResponse, HealthResponse, TopMatchesResponse};
