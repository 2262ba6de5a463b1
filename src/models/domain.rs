use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;

/// Identity prefix marking a seeker record
pub const SEEKER_PREFIX: char = 'F';

/// Identity prefix marking a provider record
pub const PROVIDER_PREFIX: char = 'S';

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Which population an entity belongs to, derived from its identity prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Seeker,
    Provider,
}

impl Role {
    pub fn from_identity(identity: &str) -> Option<Self> {
        match identity.chars().next() {
            Some(SEEKER_PREFIX) => Some(Role::Seeker),
            Some(PROVIDER_PREFIX) => Some(Role::Provider),
            _ => None,
        }
    }

    pub fn prefix(self) -> char {
        match self {
            Role::Seeker => SEEKER_PREFIX,
            Role::Provider => PROVIDER_PREFIX,
        }
    }
}

/// Entity requesting a skill/service match
///
/// Attributes are optional on the way in so that loaders can represent
/// missing cells; the matcher refuses to score a seeker with any of them unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seeker {
    #[serde(rename = "user_id")]
    pub identity: String,
    #[serde(default)]
    pub tech_requirement: Option<String>,
    #[serde(default)]
    pub project_need: Option<String>,
    #[serde(rename = "startup_industry", default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub project_deadline: Option<String>,
}

impl Seeker {
    pub fn new(
        identity: impl Into<String>,
        tech_requirement: impl Into<String>,
        project_need: impl Into<String>,
        industry: impl Into<String>,
        project_deadline: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            tech_requirement: Some(tech_requirement.into()),
            project_need: Some(project_need.into()),
            industry: Some(industry.into()),
            project_deadline: Some(project_deadline.into()),
        }
    }

    /// Borrow the attributes as a fully populated view
    pub fn view(&self) -> Result<SeekerView<'_>, EngineError> {
        if Role::from_identity(&self.identity) != Some(Role::Seeker) {
            return Err(EngineError::MisplacedEntity {
                identity: self.identity.clone(),
                expected: Role::Seeker,
            });
        }

        Ok(SeekerView {
            identity: &self.identity,
            tech_requirement: required(&self.identity, "tech_requirement", &self.tech_requirement)?,
            project_need: required(&self.identity, "project_need", &self.project_need)?,
            industry: required(&self.identity, "industry", &self.industry)?,
            project_deadline: required(&self.identity, "project_deadline", &self.project_deadline)?,
        })
    }
}

/// Entity offering a skill/service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provider {
    #[serde(rename = "user_id")]
    pub identity: String,
    #[serde(default)]
    pub core_skill: Option<String>,
    #[serde(default)]
    pub expertise_area: Option<String>,
    #[serde(default)]
    pub industry_preference: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
}

impl Provider {
    pub fn new(
        identity: impl Into<String>,
        core_skill: impl Into<String>,
        expertise_area: impl Into<String>,
        industry_preference: impl Into<String>,
        availability: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            core_skill: Some(core_skill.into()),
            expertise_area: Some(expertise_area.into()),
            industry_preference: Some(industry_preference.into()),
            availability: Some(availability.into()),
        }
    }

    pub fn view(&self) -> Result<ProviderView<'_>, EngineError> {
        if Role::from_identity(&self.identity) != Some(Role::Provider) {
            return Err(EngineError::MisplacedEntity {
                identity: self.identity.clone(),
                expected: Role::Provider,
            });
        }

        Ok(ProviderView {
            identity: &self.identity,
            core_skill: required(&self.identity, "core_skill", &self.core_skill)?,
            expertise_area: required(&self.identity, "expertise_area", &self.expertise_area)?,
            industry_preference: required(
                &self.identity,
                "industry_preference",
                &self.industry_preference,
            )?,
            availability: required(&self.identity, "availability", &self.availability)?,
        })
    }
}

fn required<'a>(
    identity: &str,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, EngineError> {
    value.as_deref().ok_or_else(|| EngineError::MalformedEntity {
        identity: identity.to_string(),
        field,
    })
}

/// Validated, borrowed seeker attributes
#[derive(Debug, Clone, Copy)]
pub struct SeekerView<'a> {
    pub identity: &'a str,
    pub tech_requirement: &'a str,
    pub project_need: &'a str,
    pub industry: &'a str,
    pub project_deadline: &'a str,
}

/// Validated, borrowed provider attributes
#[derive(Debug, Clone, Copy)]
pub struct ProviderView<'a> {
    pub identity: &'a str,
    pub core_skill: &'a str,
    pub expertise_area: &'a str,
    pub industry_preference: &'a str,
    pub availability: &'a str,
}

/// Either kind of entity, as served by the profile lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum EntityRecord {
    Seeker(Seeker),
    Provider(Provider),
}

impl EntityRecord {
    pub fn identity(&self) -> &str {
        match self {
            EntityRecord::Seeker(s) => &s.identity,
            EntityRecord::Provider(p) => &p.identity,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            EntityRecord::Seeker(_) => Role::Seeker,
            EntityRecord::Provider(_) => Role::Provider,
        }
    }
}

/// Both input populations of one computation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Population {
    pub seekers: Vec<Seeker>,
    pub providers: Vec<Provider>,
}

impl Population {
    pub fn new(seekers: Vec<Seeker>, providers: Vec<Provider>) -> Self {
        Self { seekers, providers }
    }

    pub fn find(&self, identity: &str) -> Option<EntityRecord> {
        match Role::from_identity(identity)? {
            Role::Seeker => self
                .seekers
                .iter()
                .find(|s| s.identity == identity)
                .cloned()
                .map(EntityRecord::Seeker),
            Role::Provider => self
                .providers
                .iter()
                .find(|p| p.identity == identity)
                .cloned()
                .map(EntityRecord::Provider),
        }
    }
}

/// Final score of one (seeker, provider) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairScore {
    pub seeker_id: String,
    pub provider_id: String,
    pub final_score: u8,
}

/// Sub-scores behind a final score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Mean of the two scaled text similarities, 0-100 (may be fractional)
    pub semantic_score: f64,
    pub industry_score: u8,
    pub timeline_score: u8,
    pub final_score: u8,
}

/// One row of a top-N answer, seen from the queried entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub counterpart_id: String,
    pub final_score: u8,
}

/// Weights of the final score
///
/// Fields are private: every instance has been checked to be finite,
/// non-negative and to sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    semantic: f64,
    industry: f64,
    timeline: f64,
}

impl ScoringWeights {
    pub fn new(semantic: f64, industry: f64, timeline: f64) -> Result<Self, EngineError> {
        for (name, value) in [
            ("semantic", semantic),
            ("industry", industry),
            ("timeline", timeline),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidWeights(format!(
                    "{} weight must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let sum = semantic + industry + timeline;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EngineError::InvalidWeights(format!(
                "weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(Self {
            semantic,
            industry,
            timeline,
        })
    }

    pub fn semantic(&self) -> f64 {
        self.semantic
    }

    pub fn industry(&self) -> f64 {
        self.industry
    }

    pub fn timeline(&self) -> f64 {
        self.timeline
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.50,
            industry: 0.30,
            timeline: 0.20,
        }
    }
}
