use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{
    categorical::CategoricalRules,
    error::EngineError,
    scoring::calculate_pair_score,
    similarity::SimilarityProvider,
    table::MatchTable,
};
use crate::models::{
    PairScore, Provider, ProviderView, RankedMatch, Role, ScoreBreakdown, ScoringWeights, Seeker,
    SeekerView,
};

/// Builds match tables over the full seeker x provider cross-product
///
/// # Pipeline Stages
/// 1. Validation of both populations (fails fast, nothing is scored)
/// 2. Pair scoring, up to `concurrency` pairs in flight
/// 3. Collection into a seeker-major [`MatchTable`]
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    rules: CategoricalRules,
    concurrency: usize,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, rules: CategoricalRules) -> Self {
        Self {
            weights,
            rules,
            concurrency: 1,
        }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default(), CategoricalRules::default())
    }

    /// Score up to `concurrency` pairs at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, EngineError> {
        if concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn rules(&self) -> &CategoricalRules {
        &self.rules
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Check both populations before any scoring begins
    ///
    /// Every entity must carry all role attributes and the identity prefix of
    /// its population, and identities must be unique across both. Unknown
    /// deadline/availability labels are allowed (they rank 0) but logged.
    pub fn validate<'a>(
        &self,
        seekers: &'a [Seeker],
        providers: &'a [Provider],
    ) -> Result<(Vec<SeekerView<'a>>, Vec<ProviderView<'a>>), EngineError> {
        let mut seen = HashSet::with_capacity(seekers.len() + providers.len());

        let seeker_views = seekers
            .iter()
            .map(|seeker| {
                let view = seeker.view()?;
                if !seen.insert(view.identity) {
                    return Err(EngineError::DuplicateIdentity(view.identity.to_string()));
                }
                if !self.rules.is_known_deadline(view.project_deadline) {
                    warn!(
                        "Seeker {} has unrecognised project_deadline {:?}; ranking it 0",
                        view.identity, view.project_deadline
                    );
                }
                Ok(view)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let provider_views = providers
            .iter()
            .map(|provider| {
                let view = provider.view()?;
                if !seen.insert(view.identity) {
                    return Err(EngineError::DuplicateIdentity(view.identity.to_string()));
                }
                if !self.rules.is_known_availability(view.availability) {
                    warn!(
                        "Provider {} has unrecognised availability {:?}; ranking it 0",
                        view.identity, view.availability
                    );
                }
                Ok(view)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((seeker_views, provider_views))
    }

    /// Score a single pair
    pub async fn score_pair(
        &self,
        similarity: &dyn SimilarityProvider,
        seeker: &Seeker,
        provider: &Provider,
    ) -> Result<ScoreBreakdown, EngineError> {
        let seeker = seeker.view()?;
        let provider = provider.view()?;
        Ok(calculate_pair_score(similarity, &seeker, &provider, &self.weights, &self.rules).await)
    }

    /// Score every (seeker, provider) pair
    ///
    /// No pruning and no early exit: the table has exactly
    /// `seekers.len() * providers.len()` entries, seeker-major, in input order,
    /// whatever the concurrency. Each pair is scored on its own runtime task,
    /// at most `concurrency` at a time, and the table is returned only once
    /// every pair has resolved.
    pub async fn build(
        &self,
        similarity: Arc<dyn SimilarityProvider>,
        seekers: &[Seeker],
        providers: &[Provider],
    ) -> Result<MatchTable, EngineError> {
        let (seeker_views, provider_views) = self.validate(seekers, providers)?;
        let started = Instant::now();

        let shared_seekers: Arc<[Seeker]> = seekers.into();
        let shared_providers: Arc<[Provider]> = providers.into();
        let rules = Arc::new(self.rules.clone());
        let weights = self.weights;

        let pairs = (0..seekers.len()).flat_map(|s| (0..providers.len()).map(move |p| (s, p)));

        let scores: Vec<PairScore> = stream::iter(pairs)
            .map(|(s, p)| {
                let seeker_id = shared_seekers[s].identity.clone();
                let provider_id = shared_providers[p].identity.clone();
                let similarity = Arc::clone(&similarity);
                let seekers = Arc::clone(&shared_seekers);
                let providers = Arc::clone(&shared_providers);
                let rules = Arc::clone(&rules);

                let task = tokio::spawn(async move {
                    let seeker = seekers[s].view()?;
                    let provider = providers[p].view()?;
                    let breakdown = calculate_pair_score(
                        similarity.as_ref(),
                        &seeker,
                        &provider,
                        &weights,
                        &rules,
                    )
                    .await;
                    Ok::<_, EngineError>(breakdown.final_score)
                });

                async move {
                    match task.await {
                        Ok(result) => result.map(|final_score| PairScore {
                            seeker_id,
                            provider_id,
                            final_score,
                        }),
                        Err(e) => Err(EngineError::Worker {
                            seeker_id,
                            provider_id,
                            reason: e.to_string(),
                        }),
                    }
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        info!(
            "Built match table: {} seekers x {} providers = {} pairs in {:?} (concurrency {})",
            seeker_views.len(),
            provider_views.len(),
            scores.len(),
            started.elapsed(),
            self.concurrency
        );

        Ok(MatchTable::from_scores(scores))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Best `n` pair scores involving `identity`
///
/// The role comes from the identity prefix. Sorted by score descending, ties
/// broken by the counterpart identity ascending. An unknown prefix or an
/// identity absent from the table yields an empty result.
pub fn top_matches(identity: &str, table: &MatchTable, n: usize) -> Vec<PairScore> {
    let Some(role) = Role::from_identity(identity) else {
        debug!("Top-N query for {} with no role prefix", identity);
        return Vec::new();
    };

    let mut matches: Vec<&PairScore> = table
        .iter()
        .filter(|score| match role {
            Role::Seeker => score.seeker_id == identity,
            Role::Provider => score.provider_id == identity,
        })
        .collect();

    matches.sort_by(|a, b| {
        b.final_score
            .cmp(&a.final_score)
            .then_with(|| counterpart(role, a).cmp(counterpart(role, b)))
    });

    matches.truncate(n);
    matches.into_iter().cloned().collect()
}

fn counterpart(role: Role, score: &PairScore) -> &str {
    match role {
        Role::Seeker => &score.provider_id,
        Role::Provider => &score.seeker_id,
    }
}

/// [`top_matches`] as (counterpart, score) rows
pub fn get_top_matches(identity: &str, table: &MatchTable, n: usize) -> Vec<RankedMatch> {
    let role = Role::from_identity(identity);
    top_matches(identity, table, n)
        .into_iter()
        .map(|score| RankedMatch {
            counterpart_id: if role == Some(Role::Seeker) {
                score.provider_id
            } else {
                score.seeker_id
            },
            final_score: score.final_score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SimilarityError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 1.0 for identical texts, 0.5 otherwise
    struct EqualitySimilarity;

    #[async_trait]
    impl SimilarityProvider for EqualitySimilarity {
        async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
            Ok(if a == b { 1.0 } else { 0.5 })
        }
    }

    /// Blocks its thread for a while and records the peak number of calls in flight
    #[derive(Default)]
    struct BusySimilarity {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SimilarityProvider for BusySimilarity {
        async fn similarity(&self, _a: &str, _b: &str) -> Result<f64, SimilarityError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(0.5)
        }
    }

    fn create_seeker(id: &str, industry: &str, deadline: &str) -> Seeker {
        Seeker::new(id, "Python backend development", "API platform", industry, deadline)
    }

    fn create_provider(id: &str, skill: &str, preference: &str, availability: &str) -> Provider {
        Provider::new(id, skill, "API platform", preference, availability)
    }

    fn pair(seeker: &str, provider: &str, score: u8) -> PairScore {
        PairScore {
            seeker_id: seeker.to_string(),
            provider_id: provider.to_string(),
            final_score: score,
        }
    }

    #[tokio::test]
    async fn test_build_full_cross_product() {
        let matcher = Matcher::with_default_weights();
        let seekers = vec![
            create_seeker("F1", "Fintech", "Immediate"),
            create_seeker("F2", "Edtech", "Flexible"),
        ];
        let providers = vec![
            create_provider("S1", "Python backend development", "Fintech", "Immediate"),
            create_provider("S2", "iOS apps", "Any", "Unavailable"),
            create_provider("S3", "Data pipelines", "Healthtech", "In 1-2 Months"),
        ];

        let table = matcher
            .build(Arc::new(EqualitySimilarity), &seekers, &providers)
            .await
            .unwrap();

        assert_eq!(table.len(), 6);
        let order: Vec<(&str, &str)> = table
            .iter()
            .map(|s| (s.seeker_id.as_str(), s.provider_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("F1", "S1"),
                ("F1", "S2"),
                ("F1", "S3"),
                ("F2", "S1"),
                ("F2", "S2"),
                ("F2", "S3"),
            ]
        );
        assert_eq!(table.get("F1", "S1"), Some(100));
        // semantic (50 + 100) / 2 = 75, wildcard 70, unavailable 0: 58.5 rounds to even
        assert_eq!(table.get("F1", "S2"), Some(58));
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_result() {
        let seekers: Vec<Seeker> = (0..6)
            .map(|i| create_seeker(&format!("F{}", i), "Fintech", "Within 1 Month"))
            .collect();
        let providers: Vec<Provider> = (0..5)
            .map(|i| {
                create_provider(
                    &format!("S{}", i),
                    if i % 2 == 0 { "Python backend development" } else { "Go" },
                    if i % 3 == 0 { "Any" } else { "Fintech" },
                    "Within 2 Weeks",
                )
            })
            .collect();

        let sequential = Matcher::with_default_weights()
            .build(Arc::new(EqualitySimilarity), &seekers, &providers)
            .await
            .unwrap();
        let parallel = Matcher::with_default_weights()
            .with_concurrency(8)
            .unwrap()
            .build(Arc::new(EqualitySimilarity), &seekers, &providers)
            .await
            .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pairs_are_scored_in_parallel() {
        let seekers: Vec<Seeker> = (0..4)
            .map(|i| create_seeker(&format!("F{}", i), "Fintech", "Immediate"))
            .collect();
        let providers: Vec<Provider> = (0..4)
            .map(|i| create_provider(&format!("S{}", i), "Go", "Fintech", "Immediate"))
            .collect();

        let sequential = Arc::new(BusySimilarity::default());
        let table = Matcher::with_default_weights()
            .build(sequential.clone(), &seekers, &providers)
            .await
            .unwrap();
        assert_eq!(table.len(), 16);
        assert_eq!(sequential.peak.load(Ordering::SeqCst), 1);

        let parallel = Arc::new(BusySimilarity::default());
        let table = Matcher::with_default_weights()
            .with_concurrency(4)
            .unwrap()
            .build(parallel.clone(), &seekers, &providers)
            .await
            .unwrap();
        assert_eq!(table.len(), 16);
        assert!(parallel.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_empty_population_gives_empty_table() {
        let matcher = Matcher::with_default_weights();
        let seekers = vec![create_seeker("F1", "Fintech", "Immediate")];

        let table = matcher.build(Arc::new(EqualitySimilarity), &seekers, &[]).await.unwrap();

        assert!(table.is_empty());
        assert!(top_matches("F1", &table, 3).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entity_fails_fast() {
        let matcher = Matcher::with_default_weights();
        let seekers = vec![create_seeker("F1", "Fintech", "Immediate")];
        let mut broken = create_provider("S7", "Go", "Any", "Immediate");
        broken.core_skill = None;

        let err = matcher
            .build(Arc::new(EqualitySimilarity), &seekers, &[broken])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EngineError::MalformedEntity {
                identity: "S7".to_string(),
                field: "core_skill",
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let matcher = Matcher::with_default_weights();
        let seekers = vec![
            create_seeker("F1", "Fintech", "Immediate"),
            create_seeker("F1", "Edtech", "Flexible"),
        ];

        let err = matcher
            .build(Arc::new(EqualitySimilarity), &seekers, &[])
            .await
            .unwrap_err();

        assert_eq!(err, EngineError::DuplicateIdentity("F1".to_string()));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Matcher::with_default_weights().with_concurrency(0).is_err());
    }

    #[test]
    fn test_top_matches_for_seeker() {
        let table = MatchTable::from_scores(vec![
            pair("F1", "S3", 70),
            pair("F1", "S1", 90),
            pair("F1", "S2", 70),
            pair("F2", "S1", 99),
        ]);

        let top = get_top_matches("F1", &table, 2);

        assert_eq!(
            top,
            vec![
                RankedMatch { counterpart_id: "S1".to_string(), final_score: 90 },
                RankedMatch { counterpart_id: "S2".to_string(), final_score: 70 },
            ]
        );
    }

    #[test]
    fn test_top_matches_for_provider() {
        let table = MatchTable::from_scores(vec![
            pair("F2", "S1", 40),
            pair("F1", "S1", 40),
            pair("F3", "S1", 80),
            pair("F1", "S2", 100),
        ]);

        let top = top_matches("S1", &table, 10);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].seeker_id, "F3");
        assert_eq!(top[1].seeker_id, "F1");
        assert_eq!(top[2].seeker_id, "F2");
    }

    #[test]
    fn test_top_matches_edge_cases() {
        let table = MatchTable::from_scores(vec![pair("F1", "S1", 40)]);

        assert!(top_matches("F1", &table, 0).is_empty());
        assert!(top_matches("X1", &table, 3).is_empty());
        assert!(top_matches("F9", &table, 3).is_empty());
        assert!(top_matches("F1", &MatchTable::default(), 3).is_empty());
    }
}
