use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::core::table::MatchTable;

/// Dense seeker x provider view of a match table
///
/// Rows and columns are in ascending identity order. A cell is `None` when the
/// table holds no score for that pair; it is never filled with a synthetic 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMatrix {
    pub seekers: Vec<String>,
    pub providers: Vec<String>,
    pub cells: Vec<Vec<Option<u8>>>,
}

impl ScoreMatrix {
    pub fn get(&self, seeker_id: &str, provider_id: &str) -> Option<u8> {
        let row = self.seekers.iter().position(|s| s == seeker_id)?;
        let col = self.providers.iter().position(|p| p == provider_id)?;
        self.cells[row][col]
    }

    /// True when every (seeker, provider) cell holds a score
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(Option::is_some))
    }
}

/// Pivot a match table into a [`ScoreMatrix`]
pub fn project(table: &MatchTable) -> ScoreMatrix {
    let seekers: Vec<String> = table
        .iter()
        .map(|s| s.seeker_id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let providers: Vec<String> = table
        .iter()
        .map(|s| s.provider_id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let row_of: HashMap<&str, usize> = seekers.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
    let col_of: HashMap<&str, usize> = providers.iter().enumerate().map(|(i, p)| (p.as_str(), i)).collect();

    let mut cells = vec![vec![None; providers.len()]; seekers.len()];
    for score in table {
        let row = row_of[score.seeker_id.as_str()];
        let col = col_of[score.provider_id.as_str()];
        cells[row][col] = Some(score.final_score);
    }

    ScoreMatrix {
        seekers,
        providers,
        cells,
    }
}
