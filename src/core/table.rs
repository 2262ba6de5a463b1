use std::collections::HashMap;

use crate::core::delimited::{parse_rows, write_row};
use crate::core::error::EngineError;
use crate::models::{PairScore, Role};

/// Header of the exported match table
pub const EXPORT_HEADER: [&str; 3] = ["seeker_id", "provider_id", "final_score"];

/// Every pair score of one computation pass, in seeker-major order
///
/// Holds at most one score per (seeker, provider); a later score for the same
/// pair replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchTable {
    scores: Vec<PairScore>,
    index: HashMap<(String, String), usize>,
}

impl MatchTable {
    pub fn from_scores(scores: impl IntoIterator<Item = PairScore>) -> Self {
        let mut table = Self::default();
        for score in scores {
            table.upsert(score);
        }
        table
    }

    fn upsert(&mut self, score: PairScore) -> bool {
        let key = (score.seeker_id.clone(), score.provider_id.clone());
        match self.index.get(&key) {
            Some(&slot) => {
                self.scores[slot] = score;
                false
            }
            None => {
                self.index.insert(key, self.scores.len());
                self.scores.push(score);
                true
            }
        }
    }

    pub fn scores(&self) -> &[PairScore] {
        &self.scores
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PairScore> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, seeker_id: &str, provider_id: &str) -> Option<u8> {
        self.index
            .get(&(seeker_id.to_string(), provider_id.to_string()))
            .map(|&slot| self.scores[slot].final_score)
    }

    /// Serialize as `seeker_id,provider_id,final_score` rows under a header
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(32 * (self.scores.len() + 1));
        write_row(&mut out, &EXPORT_HEADER);
        for score in &self.scores {
            write_row(
                &mut out,
                &[
                    &score.seeker_id,
                    &score.provider_id,
                    &score.final_score.to_string(),
                ],
            );
        }
        out
    }

    /// Parse the export format back into a table
    ///
    /// Rejects a missing or different header, wrong column counts, scores
    /// outside 0-100, identities with the wrong role prefix and repeated pairs.
    pub fn from_csv(input: &str) -> Result<Self, EngineError> {
        let rows = parse_rows(input).map_err(|e| EngineError::TableFormat {
            line: e.line,
            reason: e.reason,
        })?;

        let mut rows = rows.into_iter();
        match rows.next() {
            Some(header) if header.fields == EXPORT_HEADER => {}
            Some(header) => {
                return Err(EngineError::TableFormat {
                    line: header.line,
                    reason: format!("expected header {}", EXPORT_HEADER.join(",")),
                })
            }
            None => {
                return Err(EngineError::TableFormat {
                    line: 1,
                    reason: "missing header".to_string(),
                })
            }
        }

        let mut table = Self::default();
        for row in rows {
            let line = row.line;
            let format_err = |reason: String| EngineError::TableFormat { line, reason };

            let [seeker_id, provider_id, score]: [String; 3] = row
                .fields
                .try_into()
                .map_err(|fields: Vec<String>| format_err(format!("expected 3 fields, got {}", fields.len())))?;

            if Role::from_identity(&seeker_id) != Some(Role::Seeker) {
                return Err(format_err(format!("{} is not a seeker identity", seeker_id)));
            }
            if Role::from_identity(&provider_id) != Some(Role::Provider) {
                return Err(format_err(format!("{} is not a provider identity", provider_id)));
            }

            let final_score: u8 = score
                .trim()
                .parse()
                .ok()
                .filter(|s| *s <= 100)
                .ok_or_else(|| format_err(format!("invalid score {:?}", score)))?;

            let pair = format!("{} x {}", seeker_id, provider_id);
            if !table.upsert(PairScore {
                seeker_id,
                provider_id,
                final_score,
            }) {
                return Err(format_err(format!("duplicate pair {}", pair)));
            }
        }

        Ok(table)
    }
}

impl<'a> IntoIterator for &'a MatchTable {
    type Item = &'a PairScore;
    type IntoIter = std::slice::Iter<'a, PairScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.scores.iter()
    }
}
