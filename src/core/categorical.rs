use std::collections::HashMap;
use std::sync::LazyLock;

/// Rules for the discrete sub-scores
///
/// Unrecognised deadline or availability labels resolve to rank 0 instead of
/// failing. That lenient default is part of the scoring semantics: a seeker
/// with an unknown deadline is satisfied by anyone, a provider with an unknown
/// availability only satisfies seekers who are themselves unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalRules {
    pub industry_wildcard: String,
    pub exact_industry_score: u8,
    pub wildcard_industry_score: u8,
    pub deadline_ranks: HashMap<String, u8>,
    pub availability_ranks: HashMap<String, u8>,
}

static DEFAULT_RULES: LazyLock<CategoricalRules> = LazyLock::new(CategoricalRules::default);

impl Default for CategoricalRules {
    fn default() -> Self {
        Self {
            industry_wildcard: "Any".to_string(),
            exact_industry_score: 100,
            wildcard_industry_score: 70,
            deadline_ranks: default_deadline_ranks(),
            availability_ranks: default_availability_ranks(),
        }
    }
}

pub fn default_deadline_ranks() -> HashMap<String, u8> {
    [("Immediate", 3), ("Within 1 Month", 2), ("Flexible", 1)]
        .into_iter()
        .map(|(label, rank)| (label.to_string(), rank))
        .collect()
}

pub fn default_availability_ranks() -> HashMap<String, u8> {
    [
        ("Immediate", 3),
        ("Within 2 Weeks", 2),
        ("In 1-2 Months", 1),
        ("Unavailable", 0),
    ]
    .into_iter()
    .map(|(label, rank)| (label.to_string(), rank))
    .collect()
}

impl CategoricalRules {
    /// 100 on exact match, 70 when the provider accepts any industry, else 0
    pub fn industry_score(&self, seeker_industry: &str, provider_preference: &str) -> u8 {
        if seeker_industry == provider_preference {
            self.exact_industry_score
        } else if provider_preference == self.industry_wildcard {
            self.wildcard_industry_score
        } else {
            0
        }
    }

    /// 100 when the provider can start at least as urgently as the seeker needs
    pub fn timeline_score(&self, seeker_deadline: &str, provider_availability: &str) -> u8 {
        let required = self.deadline_rank(seeker_deadline);
        let offered = self.availability_rank(provider_availability);

        if offered >= required {
            100
        } else {
            0
        }
    }

    #[inline]
    pub fn deadline_rank(&self, deadline: &str) -> u8 {
        self.deadline_ranks.get(deadline).copied().unwrap_or(0)
    }

    #[inline]
    pub fn availability_rank(&self, availability: &str) -> u8 {
        self.availability_ranks.get(availability).copied().unwrap_or(0)
    }

    pub fn is_known_deadline(&self, deadline: &str) -> bool {
        self.deadline_ranks.contains_key(deadline)
    }

    pub fn is_known_availability(&self, availability: &str) -> bool {
        self.availability_ranks.contains_key(availability)
    }
}

/// Industry sub-score under the default rules
pub fn industry_score(seeker_industry: &str, provider_preference: &str) -> u8 {
    DEFAULT_RULES.industry_score(seeker_industry, provider_preference)
}

/// Timeline sub-score under the default rank tables
pub fn timeline_score(seeker_deadline: &str, provider_availability: &str) -> u8 {
    DEFAULT_RULES.timeline_score(seeker_deadline, provider_availability)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDUSTRIES: [&str; 4] = ["Fintech", "Healthtech", "Edtech", "Any"];

    #[test]
    fn test_industry_score_exhaustive() {
        for seeker in INDUSTRIES {
            for provider in INDUSTRIES {
                let expected = if seeker == provider {
                    100
                } else if provider == "Any" {
                    70
                } else {
                    0
                };
                assert_eq!(
                    industry_score(seeker, provider),
                    expected,
                    "seeker={} provider={}",
                    seeker,
                    provider
                );
            }
        }
    }

    #[test]
    fn test_industry_score_is_case_sensitive() {
        assert_eq!(industry_score("fintech", "Fintech"), 0);
        assert_eq!(industry_score("Fintech", "any"), 0);
    }

    #[test]
    fn test_timeline_score_all_combinations() {
        // (deadline, availability, expected)
        let cases = [
            ("Immediate", "Immediate", 100),
            ("Immediate", "Within 2 Weeks", 0),
            ("Immediate", "In 1-2 Months", 0),
            ("Immediate", "Unavailable", 0),
            ("Within 1 Month", "Immediate", 100),
            ("Within 1 Month", "Within 2 Weeks", 100),
            ("Within 1 Month", "In 1-2 Months", 0),
            ("Within 1 Month", "Unavailable", 0),
            ("Flexible", "Immediate", 100),
            ("Flexible", "Within 2 Weeks", 100),
            ("Flexible", "In 1-2 Months", 100),
            ("Flexible", "Unavailable", 0),
        ];

        for (deadline, availability, expected) in cases {
            assert_eq!(
                timeline_score(deadline, availability),
                expected,
                "deadline={} availability={}",
                deadline,
                availability
            );
        }
    }

    #[test]
    fn test_unknown_labels_rank_zero() {
        let rules = CategoricalRules::default();
        assert_eq!(rules.deadline_rank("Yesterday"), 0);
        assert_eq!(rules.availability_rank("Sometime"), 0);
        assert!(!rules.is_known_deadline("Yesterday"));

        // Unknown deadline requires nothing
        assert_eq!(timeline_score("Yesterday", "Unavailable"), 100);
        // Unknown availability only meets an unknown deadline
        assert_eq!(timeline_score("Flexible", "Sometime"), 0);
        assert_eq!(timeline_score("", ""), 100);
    }

    #[test]
    fn test_custom_wildcard() {
        let rules = CategoricalRules {
            industry_wildcard: "*".to_string(),
            ..CategoricalRules::default()
        };
        assert_eq!(rules.industry_score("Fintech", "*"), 70);
        assert_eq!(rules.industry_score("Fintech", "Any"), 0);
    }
}
