use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string of the top-N endpoint
///
/// `n` falls back to the configured default when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TopMatchesQuery {
    #[validate(range(min = 1))]
    #[serde(default)]
    pub n: Option<usize>,
}
