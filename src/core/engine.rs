use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{
    error::EngineError,
    matcher::{get_top_matches, Matcher},
    matrix::{project, ScoreMatrix},
    similarity::SimilarityProvider,
    table::MatchTable,
};
use crate::models::{Provider, RankedMatch, ScoreBreakdown, Seeker};

/// Distinct populations whose tables are kept
const TABLE_CACHE_CAPACITY: u64 = 16;

/// A built table together with the populations it was built from
struct CachedTable {
    seekers: Vec<Seeker>,
    providers: Vec<Provider>,
    table: Arc<MatchTable>,
}

impl CachedTable {
    fn built_from(&self, seekers: &[Seeker], providers: &[Provider]) -> bool {
        self.seekers == seekers && self.providers == providers
    }
}

/// Entry point for callers: a similarity capability plus a configured matcher
///
/// Built tables are cached per (seekers, providers) content, so asking again
/// for unchanged populations returns the same table without rescoring.
/// Concurrent requests for the same populations share a single build.
pub struct MatchEngine {
    similarity: Arc<dyn SimilarityProvider>,
    matcher: Matcher,
    tables: Cache<u64, Arc<CachedTable>>,
}

impl MatchEngine {
    pub fn new(similarity: Arc<dyn SimilarityProvider>, matcher: Matcher) -> Self {
        Self {
            similarity,
            matcher,
            tables: Cache::new(TABLE_CACHE_CAPACITY),
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Match table for these populations, built on first request
    pub async fn compute_all_matches(
        &self,
        seekers: &[Seeker],
        providers: &[Provider],
    ) -> Result<Arc<MatchTable>, EngineError> {
        self.table_for(fingerprint(seekers, providers), seekers, providers)
            .await
    }

    async fn table_for(
        &self,
        key: u64,
        seekers: &[Seeker],
        providers: &[Provider],
    ) -> Result<Arc<MatchTable>, EngineError> {
        let entry = self
            .tables
            .try_get_with(key, async {
                let table = self.build(seekers, providers).await?;
                Ok::<_, EngineError>(Arc::new(CachedTable {
                    seekers: seekers.to_vec(),
                    providers: providers.to_vec(),
                    table,
                }))
            })
            .await
            .map_err(|shared| Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))?;

        if entry.built_from(seekers, providers) {
            debug!("Match table cache hit ({} pairs)", entry.table.len());
            return Ok(Arc::clone(&entry.table));
        }

        warn!("Match table fingerprint {:016x} collides with another population; rebuilding", key);
        self.build(seekers, providers).await
    }

    async fn build(
        &self,
        seekers: &[Seeker],
        providers: &[Provider],
    ) -> Result<Arc<MatchTable>, EngineError> {
        let table = self
            .matcher
            .build(Arc::clone(&self.similarity), seekers, providers)
            .await?;
        Ok(Arc::new(table))
    }

    pub fn get_top_matches(&self, identity: &str, table: &MatchTable, n: usize) -> Vec<RankedMatch> {
        get_top_matches(identity, table, n)
    }

    pub fn to_matrix(&self, table: &MatchTable) -> ScoreMatrix {
        project(table)
    }

    /// Sub-scores behind one pair's final score
    pub async fn explain(
        &self,
        seeker: &Seeker,
        provider: &Provider,
    ) -> Result<ScoreBreakdown, EngineError> {
        self.matcher
            .score_pair(self.similarity.as_ref(), seeker, provider)
            .await
    }
}

fn fingerprint(seekers: &[Seeker], providers: &[Provider]) -> u64 {
    let mut hasher = DefaultHasher::new();
    seekers.hash(&mut hasher);
    providers.hash(&mut hasher);
    hasher.finish()
}
