// Seed data loading from CSV.
//
// Three files: nominations, precursor award results, and external references
// (betting odds, market prices). Rows are validated against the catalog and
// against each other before anything reaches the database.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use oscar_core::catalog::{Catalog, CatalogError};
use oscar_core::model::{AwardWin, Nomination, NominationType, Reference, ReferenceType};
use oscar_core::odds::odds_to_probability;

use crate::config::DataPaths;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything read from the seed files, already validated.
#[derive(Debug, Clone, Default)]
pub struct SeedRecords {
    pub nominations: Vec<Nomination>,
    pub award_wins: Vec<AwardWin>,
    pub references: Vec<Reference>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("invalid seed record: {0}")]
    Catalog(#[from] CatalogError),

    #[error("duplicate {table} id {id}")]
    DuplicateId { table: &'static str, id: i64 },

    #[error("{table} row {id} references missing nomination {nomination_id}")]
    Orphaned {
        table: &'static str,
        id: i64,
        nomination_id: i64,
    },

    #[error("{table} row {id}: malformed {column} value {value:?}")]
    MalformedValue {
        table: &'static str,
        id: i64,
        column: &'static str,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawNomination {
    id: i64,
    year: i32,
    category: String,
    nomination_type: String,
    nominee_name: String,
    film_title: Option<String>,
    won_oscar: String,
}

#[derive(Debug, Deserialize)]
struct RawAwardWin {
    id: i64,
    nomination_id: i64,
    award_venue: String,
    award_category: Option<String>,
    won: String,
}

/// `value` stays text: betting odds may be written as fractional odds.
#[derive(Debug, Deserialize)]
struct RawReference {
    id: i64,
    nomination_id: i64,
    reference_type: String,
    value: String,
    source: Option<String>,
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Trim an optional cell; blank becomes `None`.
fn non_blank(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" | "" => Some(false),
        _ => None,
    }
}

fn flag(table: &'static str, id: i64, column: &'static str, value: &str) -> Result<bool, SeedError> {
    parse_flag(value).ok_or_else(|| SeedError::MalformedValue {
        table,
        id,
        column,
        value: value.to_string(),
    })
}

/// Numeric reference value on the 0-100 scale. Betting odds may also be
/// fractional ("5/2"); an unparseable odds string degrades to 0.
fn reference_value(
    id: i64,
    reference_type: ReferenceType,
    value: &str,
) -> Result<f64, SeedError> {
    let trimmed = value.trim();
    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() {
            return Ok(number);
        }
    }
    if reference_type == ReferenceType::BettingOdds {
        return Ok(odds_to_probability(trimmed));
    }
    Err(SeedError::MalformedValue {
        table: "references",
        id,
        column: "value",
        value: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn read_nominations<R: Read>(
    rdr: R,
    path: &str,
    created_at: DateTime<Utc>,
) -> Result<Vec<Nomination>, SeedError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawNomination>() {
        let raw = result.map_err(|e| SeedError::Csv {
            path: path.to_string(),
            source: e,
        })?;
        let nomination_type: NominationType =
            raw.nomination_type
                .parse()
                .map_err(|_| SeedError::MalformedValue {
                    table: "nominations",
                    id: raw.id,
                    column: "nomination_type",
                    value: raw.nomination_type.clone(),
                })?;
        out.push(Nomination {
            id: raw.id,
            year: raw.year,
            category: raw.category.trim().to_string(),
            nomination_type,
            nominee_name: raw.nominee_name.trim().to_string(),
            film_title: non_blank(raw.film_title),
            won_oscar: flag("nominations", raw.id, "won_oscar", &raw.won_oscar)?,
            created_at,
        });
    }
    Ok(out)
}

fn read_award_wins<R: Read>(rdr: R, path: &str) -> Result<Vec<AwardWin>, SeedError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawAwardWin>() {
        let raw = result.map_err(|e| SeedError::Csv {
            path: path.to_string(),
            source: e,
        })?;
        out.push(AwardWin {
            id: raw.id,
            nomination_id: raw.nomination_id,
            award_venue: raw.award_venue.trim().to_string(),
            award_category: non_blank(raw.award_category),
            won: flag("award_wins", raw.id, "won", &raw.won)?,
        });
    }
    Ok(out)
}

fn read_references<R: Read>(rdr: R, path: &str) -> Result<Vec<Reference>, SeedError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawReference>() {
        let raw = result.map_err(|e| SeedError::Csv {
            path: path.to_string(),
            source: e,
        })?;
        let reference_type: ReferenceType =
            raw.reference_type
                .parse()
                .map_err(|_| SeedError::MalformedValue {
                    table: "references",
                    id: raw.id,
                    column: "reference_type",
                    value: raw.reference_type.clone(),
                })?;
        out.push(Reference {
            id: raw.id,
            nomination_id: raw.nomination_id,
            reference_type,
            value: reference_value(raw.id, reference_type, &raw.value)?,
            source: non_blank(raw.source),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check seed records against the catalog, for unique ids, and for rows that
/// point at a nomination that does not exist.
pub fn validate(catalog: &Catalog, records: &SeedRecords) -> Result<(), SeedError> {
    let mut nomination_ids = HashSet::new();
    for nomination in &records.nominations {
        catalog.validate_nomination(nomination)?;
        if !nomination_ids.insert(nomination.id) {
            return Err(SeedError::DuplicateId {
                table: "nominations",
                id: nomination.id,
            });
        }
    }

    let mut seen = HashSet::new();
    for win in &records.award_wins {
        catalog.validate_award_win(win)?;
        if !seen.insert(win.id) {
            return Err(SeedError::DuplicateId {
                table: "award_wins",
                id: win.id,
            });
        }
        if !nomination_ids.contains(&win.nomination_id) {
            return Err(SeedError::Orphaned {
                table: "award_wins",
                id: win.id,
                nomination_id: win.nomination_id,
            });
        }
    }

    seen.clear();
    for reference in &records.references {
        if !seen.insert(reference.id) {
            return Err(SeedError::DuplicateId {
                table: "references",
                id: reference.id,
            });
        }
        if !nomination_ids.contains(&reference.nomination_id) {
            return Err(SeedError::Orphaned {
                table: "references",
                id: reference.id,
                nomination_id: reference.nomination_id,
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Public loaders
// ---------------------------------------------------------------------------

/// Parse and validate seed records from in-memory readers.
pub fn load_from_readers<N: Read, W: Read, R: Read>(
    catalog: &Catalog,
    nominations: N,
    award_wins: W,
    references: R,
) -> Result<SeedRecords, SeedError> {
    let records = SeedRecords {
        nominations: read_nominations(nominations, "<nominations>", Utc::now())?,
        award_wins: read_award_wins(award_wins, "<award_wins>")?,
        references: read_references(references, "<references>")?,
    };
    validate(catalog, &records)?;
    Ok(records)
}

fn open(path: &Path) -> Result<std::fs::File, SeedError> {
    std::fs::File::open(path).map_err(|e| SeedError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the seed files named in `paths`.
///
/// The nominations file is required. A missing award-results or references
/// file is treated as empty.
pub fn load_seed(catalog: &Catalog, paths: &DataPaths) -> Result<SeedRecords, SeedError> {
    let nominations_path = Path::new(&paths.nominations);
    let created_at = Utc::now();
    let nominations = read_nominations(
        open(nominations_path)?,
        &nominations_path.display().to_string(),
        created_at,
    )?;

    let award_wins_path = Path::new(&paths.award_wins);
    let award_wins = if award_wins_path.exists() {
        read_award_wins(open(award_wins_path)?, &award_wins_path.display().to_string())?
    } else {
        warn!("award results file {} not found, importing none", award_wins_path.display());
        Vec::new()
    };

    let references_path = Path::new(&paths.references);
    let references = if references_path.exists() {
        read_references(open(references_path)?, &references_path.display().to_string())?
    } else {
        warn!("references file {} not found, importing none", references_path.display());
        Vec::new()
    };

    let records = SeedRecords {
        nominations,
        award_wins,
        references,
    };
    validate(catalog, &records)?;
    info!(
        "Loaded seed data: {} nominations, {} award results, {} references",
        records.nominations.len(),
        records.award_wins.len(),
        records.references.len()
    );
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
