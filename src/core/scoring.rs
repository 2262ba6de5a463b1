use tracing::{debug, warn};

use crate::core::categorical::CategoricalRules;
use crate::core::similarity::SimilarityProvider;
use crate::models::{ProviderView, ScoreBreakdown, ScoringWeights, SeekerView};

/// Calculate the final score (0-100) of one seeker/provider pair
///
/// Scoring formula:
/// semantic = mean(
///     scale(sim(tech_requirement, core_skill)),
///     scale(sim(project_need, expertise_area)),
/// )
/// score = round(
///     semantic * 0.50 +     # Text similarity of needs vs. skills
///     industry * 0.30 +     # Exact / wildcard industry match
///     timeline * 0.20       # Provider can start soon enough
/// )
///
/// A failing similarity call contributes 0 to its half of the semantic score;
/// the pair is still scored.
pub async fn calculate_pair_score(
    similarity: &dyn SimilarityProvider,
    seeker: &SeekerView<'_>,
    provider: &ProviderView<'_>,
    weights: &ScoringWeights,
    rules: &CategoricalRules,
) -> ScoreBreakdown {
    let (skill_score, project_score) = futures::join!(
        scaled_similarity(similarity, seeker.tech_requirement, provider.core_skill, seeker, provider),
        scaled_similarity(similarity, seeker.project_need, provider.expertise_area, seeker, provider),
    );
    let semantic_score = (skill_score as f64 + project_score as f64) / 2.0;

    let industry_score = rules.industry_score(seeker.industry, provider.industry_preference);
    let timeline_score = rules.timeline_score(seeker.project_deadline, provider.availability);

    let final_score = combine(semantic_score, industry_score, timeline_score, weights);

    debug!(
        "Scored {} x {}: semantic={} industry={} timeline={} final={}",
        seeker.identity, provider.identity, semantic_score, industry_score, timeline_score, final_score
    );

    ScoreBreakdown {
        semantic_score,
        industry_score,
        timeline_score,
        final_score,
    }
}

/// Weighted sum, rounded half-to-even and kept inside 0-100
#[inline]
pub fn combine(semantic: f64, industry: u8, timeline: u8, weights: &ScoringWeights) -> u8 {
    let total = semantic * weights.semantic()
        + industry as f64 * weights.industry()
        + timeline as f64 * weights.timeline();

    total.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Map a similarity in [0, 1] onto a 0-100 integer by truncation
///
/// Out-of-range and non-finite inputs are clamped (NaN to 0). The small bias
/// keeps float noise such as 0.9999999999 from truncating one point low.
#[inline]
pub fn scale_similarity(similarity: f64) -> u8 {
    if !similarity.is_finite() {
        return 0;
    }
    let scaled = similarity.clamp(0.0, 1.0) * 100.0 + 1e-6;
    scaled.trunc().min(100.0) as u8
}

async fn scaled_similarity(
    similarity: &dyn SimilarityProvider,
    text_a: &str,
    text_b: &str,
    seeker: &SeekerView<'_>,
    provider: &ProviderView<'_>,
) -> u8 {
    match similarity.similarity(text_a, text_b).await {
        Ok(value) => scale_similarity(value),
        Err(e) => {
            warn!(
                "Similarity failed for {} x {}, substituting 0: {}",
                seeker.identity, provider.identity, e
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SimilarityError;
    use crate::models::{Provider, Seeker};
    use async_trait::async_trait;

    /// 1.0 for identical texts, otherwise a fixed value
    struct FixedSimilarity(f64);

    #[async_trait]
    impl SimilarityProvider for FixedSimilarity {
        async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
            Ok(if a == b { 1.0 } else { self.0 })
        }
    }

    struct BrokenSimilarity;

    #[async_trait]
    impl SimilarityProvider for BrokenSimilarity {
        async fn similarity(&self, _a: &str, _b: &str) -> Result<f64, SimilarityError> {
            Err(SimilarityError::Backend("boom".to_string()))
        }
    }

    fn seeker(industry: &str, deadline: &str) -> Seeker {
        Seeker::new(
            "F1",
            "Python backend development",
            "API platform",
            industry,
            deadline,
        )
    }

    fn provider(preference: &str, availability: &str) -> Provider {
        Provider::new(
            "S1",
            "Python backend development",
            "API platform",
            preference,
            availability,
        )
    }

    async fn score(sim: &dyn SimilarityProvider, s: &Seeker, p: &Provider) -> ScoreBreakdown {
        calculate_pair_score(
            sim,
            &s.view().unwrap(),
            &p.view().unwrap(),
            &ScoringWeights::default(),
            &CategoricalRules::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_perfect_match_scores_100() {
        let s = seeker("Fintech", "Immediate");
        let p = provider("Fintech", "Immediate");

        let breakdown = score(&FixedSimilarity(0.0), &s, &p).await;

        assert_eq!(breakdown.semantic_score, 100.0);
        assert_eq!(breakdown.industry_score, 100);
        assert_eq!(breakdown.timeline_score, 100);
        assert_eq!(breakdown.final_score, 100);
    }

    #[tokio::test]
    async fn test_wildcard_industry() {
        let s = seeker("Healthtech", "Flexible");
        let p = provider("Any", "Immediate");

        let breakdown = score(&FixedSimilarity(0.0), &s, &p).await;

        assert_eq!(breakdown.industry_score, 70);
        // 100 * 0.5 + 70 * 0.3 + 100 * 0.2
        assert_eq!(breakdown.final_score, 91);
    }

    #[tokio::test]
    async fn test_unavailable_provider_zero_timeline() {
        let s = seeker("Fintech", "Immediate");
        let p = provider("Fintech", "Unavailable");

        let breakdown = score(&FixedSimilarity(0.0), &s, &p).await;

        assert_eq!(breakdown.timeline_score, 0);
        assert_eq!(breakdown.final_score, 80);
    }

    #[tokio::test]
    async fn test_similarity_failure_substitutes_zero() {
        let s = seeker("Fintech", "Immediate");
        let p = provider("Fintech", "Immediate");

        let breakdown = score(&BrokenSimilarity, &s, &p).await;

        assert_eq!(breakdown.semantic_score, 0.0);
        assert_eq!(breakdown.final_score, 50);
    }

    #[test]
    fn test_scale_similarity() {
        assert_eq!(scale_similarity(1.0), 100);
        assert_eq!(scale_similarity(0.999_999_999_9), 100);
        assert_eq!(scale_similarity(0.876), 87);
        assert_eq!(scale_similarity(0.29), 29);
        assert_eq!(scale_similarity(-0.3), 0);
        assert_eq!(scale_similarity(1.7), 100);
        assert_eq!(scale_similarity(f64::NAN), 0);
    }

    #[test]
    fn test_combine_rounds_half_to_even() {
        let weights = ScoringWeights::default();
        // 45 * 0.5 = 22.5
        assert_eq!(combine(45.0, 0, 0, &weights), 22);
        // 47 * 0.5 = 23.5
        assert_eq!(combine(47.0, 0, 0, &weights), 24);
        assert_eq!(combine(100.0, 100, 100, &weights), 100);
        assert_eq!(combine(0.0, 0, 0, &weights), 0);
    }

    #[test]
    fn test_combine_stays_in_range() {
        let weights = ScoringWeights::default();
        for semantic in (0..=200).map(|x| x as f64 * 0.5) {
            for industry in [0, 70, 100] {
                for timeline in [0, 100] {
                    let score = combine(semantic, industry, timeline, &weights);
                    assert!(score <= 100);
                }
            }
        }
    }
}
