// SQLite persistence layer for nominations, venue results, references, and
// trained model weights.

use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::debug;

use oscar_core::model::{AwardWin, ModelWeight, Nomination, NominationType, Reference, ReferenceType};

/// Which nomination years a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    All,
    Exactly(i32),
    /// Strictly earlier years; the training set for a prediction year.
    Before(i32),
}

impl YearFilter {
    fn clause(&self, column: &str) -> String {
        match self {
            YearFilter::All => "1 = 1".to_string(),
            YearFilter::Exactly(_) => format!("{column} = ?1"),
            YearFilter::Before(_) => format!("{column} < ?1"),
        }
    }

    fn param(&self) -> Option<i32> {
        match self {
            YearFilter::All => None,
            YearFilter::Exactly(year) | YearFilter::Before(year) => Some(*year),
        }
    }
}

/// SQLite-backed store for the engine's inputs and outputs.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS nominations (
                id              INTEGER PRIMARY KEY,
                year            INTEGER NOT NULL,
                category        TEXT NOT NULL,
                nomination_type TEXT NOT NULL,
                nominee_name    TEXT NOT NULL,
                film_title      TEXT,
                won_oscar       INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS award_wins (
                id             INTEGER PRIMARY KEY,
                nomination_id  INTEGER NOT NULL REFERENCES nominations(id),
                award_venue    TEXT NOT NULL,
                award_category TEXT,
                won            INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS nomination_references (
                id             INTEGER PRIMARY KEY,
                nomination_id  INTEGER NOT NULL REFERENCES nominations(id),
                reference_type TEXT NOT NULL,
                value          REAL NOT NULL,
                source         TEXT
            );

            CREATE TABLE IF NOT EXISTS model_weights (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                year        INTEGER NOT NULL,
                category    TEXT NOT NULL,
                award_venue TEXT NOT NULL,
                weight      REAL NOT NULL,
                accuracy    REAL,
                UNIQUE(year, category, award_venue)
            );

            CREATE INDEX IF NOT EXISTS idx_nominations_year ON nominations(year);
            CREATE INDEX IF NOT EXISTS idx_award_wins_nomination ON award_wins(nomination_id);
            CREATE INDEX IF NOT EXISTS idx_references_nomination
                ON nomination_references(nomination_id, reference_type);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Seed records
    // ------------------------------------------------------------------

    /// Insert nominations, venue results, and references in a single
    /// transaction. Rows pointing at a missing nomination fail the whole
    /// import (foreign keys are enforced).
    pub fn import_records(
        &self,
        nominations: &[Nomination],
        award_wins: &[AwardWin],
        references: &[Reference],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for n in nominations {
            tx.execute(
                "INSERT INTO nominations
                    (id, year, category, nomination_type, nominee_name, film_title, won_oscar, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    n.id,
                    n.year,
                    n.category,
                    n.nomination_type.as_str(),
                    n.nominee_name,
                    n.film_title,
                    n.won_oscar,
                    n.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert nomination {}", n.id))?;
        }

        for w in award_wins {
            tx.execute(
                "INSERT INTO award_wins (id, nomination_id, award_venue, award_category, won)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![w.id, w.nomination_id, w.award_venue, w.award_category, w.won],
            )
            .with_context(|| format!("failed to insert award win {}", w.id))?;
        }

        for r in references {
            tx.execute(
                "INSERT INTO nomination_references (id, nomination_id, reference_type, value, source)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    r.id,
                    r.nomination_id,
                    r.reference_type.as_str(),
                    r.value,
                    r.source
                ],
            )
            .with_context(|| format!("failed to insert reference {}", r.id))?;
        }

        tx.commit().context("failed to commit import")?;
        Ok(())
    }

    pub fn nomination_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM nominations", [], |row| row.get(0))
            .context("failed to count nominations")?;
        Ok(count as usize)
    }

    /// Load nominations for the given years, ordered by id.
    pub fn load_nominations(&self, years: YearFilter) -> Result<Vec<Nomination>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT id, year, category, nomination_type, nominee_name, film_title, won_oscar, created_at
             FROM nominations n WHERE {} ORDER BY id",
            years.clause("n.year")
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare load_nominations query")?;
        let rows = stmt
            .query_map(params_from_iter(years.param()), nomination_from_row)
            .context("failed to query nominations")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read nomination row")?;
        Ok(rows)
    }

    /// Load venue results for nominations in the given years, ordered by id.
    pub fn load_award_wins(&self, years: YearFilter) -> Result<Vec<AwardWin>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT a.id, a.nomination_id, a.award_venue, a.award_category, a.won
             FROM award_wins a JOIN nominations n ON n.id = a.nomination_id
             WHERE {} ORDER BY a.id",
            years.clause("n.year")
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare load_award_wins query")?;
        let rows = stmt
            .query_map(params_from_iter(years.param()), |row| {
                Ok(AwardWin {
                    id: row.get(0)?,
                    nomination_id: row.get(1)?,
                    award_venue: row.get(2)?,
                    award_category: row.get(3)?,
                    won: row.get(4)?,
                })
            })
            .context("failed to query award wins")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read award win row")?;
        Ok(rows)
    }

    /// Load references for nominations in the given years, ordered by id so
    /// first-encountered semantics are stable.
    pub fn load_references(&self, years: YearFilter) -> Result<Vec<Reference>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT r.id, r.nomination_id, r.reference_type, r.value, r.source
             FROM nomination_references r JOIN nominations n ON n.id = r.nomination_id
             WHERE {} ORDER BY r.id",
            years.clause("n.year")
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare load_references query")?;
        let rows = stmt
            .query_map(params_from_iter(years.param()), |row| {
                Ok(Reference {
                    id: row.get(0)?,
                    nomination_id: row.get(1)?,
                    reference_type: parse_column::<ReferenceType>(row, 2)?,
                    value: row.get(3)?,
                    source: row.get(4)?,
                })
            })
            .context("failed to query references")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read reference row")?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Model output
    // ------------------------------------------------------------------

    /// Replace every weight row for `year` with `rows` in one transaction.
    /// Row ids from the trainer are discarded; SQLite assigns new ones.
    pub fn replace_model_weights(&self, year: i32, rows: &[ModelWeight]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM model_weights WHERE year = ?1", params![year])
            .context("failed to delete previous model weights")?;
        for row in rows {
            tx.execute(
                "INSERT INTO model_weights (year, category, award_venue, weight, accuracy)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![year, row.category, row.award_venue, row.weight, row.accuracy],
            )
            .context("failed to insert model weight")?;
        }
        tx.commit().context("failed to commit model weights")?;
        Ok(rows.len())
    }

    /// Load weight rows for one year, or for every year when `year` is `None`.
    pub fn load_model_weights(&self, year: Option<i32>) -> Result<Vec<ModelWeight>> {
        let years = year.map_or(YearFilter::All, YearFilter::Exactly);
        let conn = self.conn();
        let sql = format!(
            "SELECT id, year, category, award_venue, weight, accuracy
             FROM model_weights WHERE {} ORDER BY year, category, id",
            years.clause("year")
        );
        let mut stmt = conn
            .prepare(&sql)
            .context("failed to prepare load_model_weights query")?;
        let rows = stmt
            .query_map(params_from_iter(years.param()), |row| {
                Ok(ModelWeight {
                    id: row.get(0)?,
                    year: row.get(1)?,
                    category: row.get(2)?,
                    award_venue: row.get(3)?,
                    weight: row.get(4)?,
                    accuracy: row.get(5)?,
                })
            })
            .context("failed to query model weights")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read model weight row")?;
        Ok(rows)
    }

    /// Write computed likelihoods into each nomination's `model_likelihood`
    /// reference, updating it in place if it already exists. Returns the
    /// number of rows written.
    pub fn upsert_model_likelihoods(&self, likelihoods: &[(i64, f64)], source: &str) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        write_model_likelihoods(&tx, likelihoods, source)?;
        tx.commit().context("failed to commit model likelihoods")?;
        Ok(likelihoods.len())
    }

    /// Replace every `model_likelihood` reference of `year`'s nominations with
    /// `likelihoods`. Nominations left out of `likelihoods` end up with none.
    /// Other years and other reference types are untouched.
    pub fn replace_model_likelihoods(
        &self,
        year: i32,
        likelihoods: &[(i64, f64)],
        source: &str,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        let cleared = tx
            .execute(
                "DELETE FROM nomination_references
                 WHERE reference_type = ?1
                   AND nomination_id IN (SELECT id FROM nominations WHERE year = ?2)",
                params![ReferenceType::ModelLikelihood.as_str(), year],
            )
            .context("failed to delete previous model likelihoods")?;
        debug!("Cleared {cleared} model likelihoods for {year}");
        write_model_likelihoods(&tx, likelihoods, source)?;
        tx.commit().context("failed to commit model likelihoods")?;
        Ok(likelihoods.len())
    }
}

fn write_model_likelihoods(conn: &Connection, likelihoods: &[(i64, f64)], source: &str) -> Result<()> {
    for &(nomination_id, value) in likelihoods {
        let updated = conn
            .execute(
                "UPDATE nomination_references SET value = ?3, source = ?4
                 WHERE id = (
                    SELECT id FROM nomination_references
                    WHERE nomination_id = ?1 AND reference_type = ?2
                    ORDER BY id LIMIT 1
                 )",
                params![
                    nomination_id,
                    ReferenceType::ModelLikelihood.as_str(),
                    value,
                    source
                ],
            )
            .context("failed to update model likelihood")?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO nomination_references (nomination_id, reference_type, value, source)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    nomination_id,
                    ReferenceType::ModelLikelihood.as_str(),
                    value,
                    source
                ],
            )
            .with_context(|| {
                format!("failed to insert model likelihood for nomination {nomination_id}")
            })?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn nomination_from_row(row: &Row<'_>) -> rusqlite::Result<Nomination> {
    let created_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(Nomination {
        id: row.get(0)?,
        year: row.get(1)?,
        category: row.get(2)?,
        nomination_type: parse_column::<NominationType>(row, 3)?,
        nominee_name: row.get(4)?,
        film_title: row.get(5)?,
        won_oscar: row.get(6)?,
        created_at,
    })
}

/// Read a text column and parse it with `FromStr`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn nomination(id: i64, year: i32, won_oscar: bool) -> Nomination {
        Nomination {
            id,
            year,
            category: "Best Picture".into(),
            nomination_type: NominationType::Maker,
            nominee_name: format!("Film {id}"),
            film_title: (id % 2 == 0).then(|| format!("Film {id}")),
            won_oscar,
            created_at: DateTime::parse_from_rfc3339("2025-01-23T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn award_win(id: i64, nomination_id: i64, venue: &str) -> AwardWin {
        AwardWin {
            id,
            nomination_id,
            award_venue: venue.into(),
            award_category: Some("Best Film".into()),
            won: true,
        }
    }

    fn reference(id: i64, nomination_id: i64, reference_type: ReferenceType, value: f64) -> Reference {
        Reference {
            id,
            nomination_id,
            reference_type,
            value,
            source: None,
        }
    }

    fn seeded() -> Database {
        let db = test_db();
        db.import_records(
            &[
                nomination(1, 2023, true),
                nomination(2, 2023, false),
                nomination(3, 2024, true),
                nomination(4, 2025, false),
            ],
            &[
                award_win(10, 1, "BAFTA"),
                award_win(11, 3, "SAG"),
                award_win(12, 4, "BAFTA"),
            ],
            &[
                reference(20, 4, ReferenceType::BettingOdds, 40.0),
                reference(21, 4, ReferenceType::PredictiveMarket, 38.5),
                reference(22, 1, ReferenceType::BettingOdds, 70.0),
            ],
        )
        .unwrap();
        db
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["nominations", "award_wins", "nomination_references", "model_weights"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    // ------------------------------------------------------------------
    // Seed records
    // ------------------------------------------------------------------

    #[test]
    fn import_and_load_round_trip() {
        let db = seeded();
        assert_eq!(db.nomination_count().unwrap(), 4);

        let all = db.load_nominations(YearFilter::All).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], nomination(1, 2023, true));
        assert_eq!(all[1].film_title.as_deref(), Some("Film 2"));
        assert_eq!(all[0].film_title, None);

        let wins = db.load_award_wins(YearFilter::All).unwrap();
        assert_eq!(wins.len(), 3);
        assert_eq!(wins[0], award_win(10, 1, "BAFTA"));

        let refs = db.load_references(YearFilter::All).unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[1].reference_type, ReferenceType::PredictiveMarket);
    }

    #[test]
    fn year_filters_select_training_and_current_sets() {
        let db = seeded();
        let history = db.load_nominations(YearFilter::Before(2025)).unwrap();
        assert_eq!(history.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let current = db.load_nominations(YearFilter::Exactly(2025)).unwrap();
        assert_eq!(current.iter().map(|n| n.id).collect::<Vec<_>>(), vec![4]);

        let wins = db.load_award_wins(YearFilter::Before(2025)).unwrap();
        assert_eq!(wins.iter().map(|w| w.id).collect::<Vec<_>>(), vec![10, 11]);

        let refs = db.load_references(YearFilter::Exactly(2025)).unwrap();
        assert_eq!(refs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![20, 21]);
    }

    #[test]
    fn orphaned_award_win_rejects_whole_import() {
        let db = test_db();
        let result = db.import_records(
            &[nomination(1, 2024, true)],
            &[award_win(10, 99, "BAFTA")],
            &[],
        );
        assert!(result.is_err());
        assert_eq!(db.nomination_count().unwrap(), 0);
    }

    // ------------------------------------------------------------------
    // Model output
    // ------------------------------------------------------------------

    fn weight(category: &str, venue: &str, weight: f64) -> ModelWeight {
        ModelWeight {
            id: 1,
            year: 2025,
            category: category.into(),
            award_venue: venue.into(),
            weight,
            accuracy: Some(weight * 100.0),
        }
    }

    #[test]
    fn replace_model_weights_is_wholesale() {
        let db = test_db();
        db.replace_model_weights(
            2025,
            &[weight("Best Picture", "BAFTA", 0.7), weight("Best Picture", "SAG", 0.3)],
        )
        .unwrap();
        db.replace_model_weights(2024, &[weight("Sound", "BAFTA", 1.0)])
            .unwrap();

        let written = db
            .replace_model_weights(2025, &[weight("Directing", "DGA", 1.0)])
            .unwrap();
        assert_eq!(written, 1);

        let rows = db.load_model_weights(Some(2025)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "Directing");
        assert_eq!(rows[0].accuracy, Some(100.0));

        assert_eq!(db.load_model_weights(Some(2024)).unwrap().len(), 1);
        assert_eq!(db.load_model_weights(None).unwrap().len(), 2);
    }

    #[test]
    fn model_likelihood_is_upserted_in_place() {
        let db = seeded();
        db.upsert_model_likelihoods(&[(4, 55.0), (1, 80.0)], "model")
            .unwrap();
        db.upsert_model_likelihoods(&[(4, 61.0)], "model").unwrap();

        let refs = db.load_references(YearFilter::All).unwrap();
        let likelihoods: Vec<&Reference> = refs
            .iter()
            .filter(|r| r.reference_type == ReferenceType::ModelLikelihood)
            .collect();
        assert_eq!(likelihoods.len(), 2);
        let for_4 = likelihoods.iter().find(|r| r.nomination_id == 4).unwrap();
        assert_eq!(for_4.value, 61.0);
        assert_eq!(for_4.source.as_deref(), Some("model"));

        // External references are untouched.
        assert_eq!(
            refs.iter()
                .filter(|r| r.reference_type != ReferenceType::ModelLikelihood)
                .count(),
            3
        );
    }

    #[test]
    fn replacing_likelihoods_clears_only_that_year() {
        let db = seeded();
        db.upsert_model_likelihoods(&[(1, 80.0), (2, 20.0), (4, 55.0)], "model")
            .unwrap();

        let written = db.replace_model_likelihoods(2023, &[(1, 90.0)], "model").unwrap();
        assert_eq!(written, 1);

        let refs = db.load_references(YearFilter::All).unwrap();
        let mut likelihoods: Vec<(i64, f64)> = refs
            .iter()
            .filter(|r| r.reference_type == ReferenceType::ModelLikelihood)
            .map(|r| (r.nomination_id, r.value))
            .collect();
        likelihoods.sort_by_key(|(id, _)| *id);
        // Nomination 2 lost its stale value; 2025 kept its own.
        assert_eq!(likelihoods, vec![(1, 90.0), (4, 55.0)]);
        assert_eq!(refs.len(), 5);
    }

    #[test]
    fn model_likelihood_for_unknown_nomination_fails() {
        let db = seeded();
        assert!(db.upsert_model_likelihoods(&[(404, 10.0)], "model").is_err());
    }
}
