use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::delimited::{parse_rows, DelimitedError};
use crate::models::{Population, Provider, Role, Seeker};

/// Errors that can occur while loading entity records
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset at {0}")]
    Format(#[from] DelimitedError),

    #[error("Dataset has no `{0}` column")]
    MissingColumn(&'static str),

    #[error("Dataset is empty")]
    Empty,
}

const IDENTITY_COLUMN: &str = "user_id";

/// Load both populations from one delimited file
///
/// Rows are split by identity prefix; rows with any other prefix are skipped.
/// Empty cells and absent columns become missing attributes, which the
/// matcher rejects when the table is built.
pub fn load_population<P: AsRef<Path>>(path: P) -> Result<Population, DatasetError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let population = parse_population(&input)?;

    info!(
        "Loaded {} seekers and {} providers from {}",
        population.seekers.len(),
        population.providers.len(),
        path.display()
    );

    Ok(population)
}

pub fn parse_population(input: &str) -> Result<Population, DatasetError> {
    // Spreadsheet exports often lead with a byte order mark
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut rows = parse_rows(input)?.into_iter();
    let header = rows.next().ok_or(DatasetError::Empty)?;

    let columns: HashMap<&str, usize> = header
        .fields
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let identity_col = *columns
        .get(IDENTITY_COLUMN)
        .ok_or(DatasetError::MissingColumn(IDENTITY_COLUMN))?;

    let mut population = Population::default();

    for row in rows {
        if row.fields.len() > header.fields.len() {
            return Err(DelimitedError {
                line: row.line,
                reason: format!(
                    "{} fields, header has {}",
                    row.fields.len(),
                    header.fields.len()
                ),
            }
            .into());
        }

        let cell = |name: &str| -> Option<String> {
            columns
                .get(name)
                .and_then(|&i| row.fields.get(i))
                .filter(|value| !value.trim().is_empty())
                .cloned()
        };

        let identity = row
            .fields
            .get(identity_col)
            .map(|id| id.trim().to_string())
            .unwrap_or_default();

        match Role::from_identity(&identity) {
            Some(Role::Seeker) => population.seekers.push(Seeker {
                tech_requirement: cell("tech_requirement"),
                project_need: cell("project_need"),
                industry: cell("startup_industry"),
                project_deadline: cell("project_deadline"),
                identity,
            }),
            Some(Role::Provider) => population.providers.push(Provider {
                core_skill: cell("core_skill"),
                expertise_area: cell("expertise_area"),
                industry_preference: cell("industry_preference"),
                availability: cell("availability"),
                identity,
            }),
            None => warn!(
                "Skipping row at line {} with unrecognised identity {:?}",
                row.line, identity
            ),
        }
    }

    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
user_id,tech_requirement,project_need,startup_industry,project_deadline,core_skill,expertise_area,industry_preference,availability
F1,Python backend development,\"Payments API, ledger\",Fintech,Immediate,,,,
F2,React frontend,Dashboard,Edtech,,,,,
S1,,,,,Python backend development,Payment systems,Fintech,Immediate
S2,,,,,iOS,Mobile apps,Any,Within 2 Weeks
X9,,,,,,,,
";

    #[test]
    fn test_parse_population_splits_by_prefix() {
        let population = parse_population(SAMPLE).unwrap();

        assert_eq!(population.seekers.len(), 2);
        assert_eq!(population.providers.len(), 2);
        assert_eq!(
            population.seekers[0].project_need.as_deref(),
            Some("Payments API, ledger")
        );
        assert_eq!(population.providers[1].industry_preference.as_deref(), Some("Any"));
    }

    #[test]
    fn test_empty_cell_is_missing() {
        let population = parse_population(SAMPLE).unwrap();
        assert_eq!(population.seekers[1].project_deadline, None);
        assert!(population.seekers[1].view().is_err());
        assert!(population.seekers[0].view().is_ok());
    }

    #[test]
    fn test_missing_identity_column() {
        let err = parse_population("id,core_skill\nS1,Go\n").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn("user_id")));
    }

    #[test]
    fn test_leading_byte_order_mark_ignored() {
        let with_bom = format!("\u{feff}{}", SAMPLE);
        let population = parse_population(&with_bom).unwrap();

        assert_eq!(population, parse_population(SAMPLE).unwrap());
        assert_eq!(population.seekers[0].identity, "F1");
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_population(""), Err(DatasetError::Empty)));
    }

    #[test]
    fn test_too_many_fields() {
        let err = parse_population("user_id,core_skill\nS1,Go,extra\n").unwrap_err();
        assert!(matches!(err, DatasetError::Format(DelimitedError { line: 2, .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = load_population("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
