// Request-shaping layer between the transport and the engine/store.
//
// Every route returns a `ServiceResponse`: a status code plus a JSON body.
// Failures never escape as errors; they become `{error, details}` bodies.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use oscar_core::catalog::Catalog;
use oscar_core::model::{NominationType, ReferenceType};
use oscar_core::predictor::{self, OscarPredictor};
use oscar_core::strength;
use oscar_core::trainer::TrainedModel;

use crate::db::{Database, YearFilter};

/// Source tag written on likelihoods produced by a prediction run.
pub const MODEL_SOURCE: &str = "model";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn failure(status: u16, summary: &str, details: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": summary, "details": details.to_string() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Filters for the nominees listing. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineesQuery {
    pub year: Option<i32>,
    pub category: Option<String>,
    pub nomination_type: Option<NominationType>,
}

/// One stored weight as shown in the weights view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct VenueWeight {
    venue: String,
    weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
}

/// What a prediction run did, for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRun {
    pub year: i32,
    pub trained_categories: usize,
    pub skipped_categories: usize,
    pub likelihoods_written: usize,
}

pub struct Service {
    db: Database,
    catalog: Catalog,
    current_year: i32,
}

impl Service {
    pub fn new(db: Database, catalog: Catalog, current_year: i32) -> Self {
        Self {
            db,
            catalog,
            current_year,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    // ------------------------------------------------------------------
    // Routes
    // ------------------------------------------------------------------

    /// Ranked nominees per category, using the likelihoods stored by the
    /// last prediction run.
    pub fn nominees(&self, query: &NomineesQuery) -> ServiceResponse {
        respond("Failed to load nominees", self.load_nominees(query))
    }

    /// Stored weights for a year, keyed by category.
    pub fn model_weights(&self, year: Option<i32>) -> ServiceResponse {
        respond("Failed to load model weights", self.load_weights(year))
    }

    /// Per-venue accuracy summary across every stored year.
    pub fn historical_accuracy(&self) -> ServiceResponse {
        let result = self
            .db
            .load_model_weights(None)
            .map(|rows| strength::historical_accuracy(self.catalog.venues(), &rows))
            .and_then(|summary| serde_json::to_value(summary).context("failed to encode summary"));
        respond("Failed to load historical accuracy", result)
    }

    /// Venue strength tuples rebuilt from a year's stored weights.
    pub fn venue_strength(&self, year: Option<i32>) -> ServiceResponse {
        respond("Failed to load venue strength", self.load_venue_strength(year))
    }

    /// Train on earlier years, store the weights, and write likelihoods for
    /// the target year's nominees.
    pub fn run_predictions(&self, year: Option<i32>) -> ServiceResponse {
        let year = year.unwrap_or(self.current_year);
        match self.run_prediction_cycle(year) {
            Ok(run) => {
                info!(
                    "Prediction run for {} finished: {} categories trained, {} skipped, {} likelihoods written",
                    run.year, run.trained_categories, run.skipped_categories, run.likelihoods_written
                );
                ServiceResponse::ok(json!({ "success": true }))
            }
            Err(e) => {
                error!("Prediction run for {year} failed: {e:#}");
                ServiceResponse::failure(500, "Failed to run predictions", format!("{e:#}"))
            }
        }
    }

    // ------------------------------------------------------------------
    // Route bodies
    // ------------------------------------------------------------------

    fn load_nominees(&self, query: &NomineesQuery) -> Result<Value> {
        let year = query.year.unwrap_or(self.current_year);
        let years = YearFilter::Exactly(year);

        let mut nominations = self.db.load_nominations(years)?;
        if let Some(category) = &query.category {
            nominations.retain(|n| &n.category == category);
        }
        if let Some(nomination_type) = query.nomination_type {
            nominations.retain(|n| n.nomination_type == nomination_type);
        }

        let award_wins = self.db.load_award_wins(years)?;
        let references = self.db.load_references(years)?;
        let ranked =
            predictor::from_stored_likelihoods(&self.catalog, &nominations, &award_wins, &references);
        serde_json::to_value(ranked).context("failed to encode nominees")
    }

    fn load_weights(&self, year: Option<i32>) -> Result<Value> {
        let year = year.unwrap_or(self.current_year);
        let rows = self.db.load_model_weights(Some(year))?;

        let mut by_category: BTreeMap<String, Vec<VenueWeight>> = BTreeMap::new();
        for row in rows {
            by_category.entry(row.category).or_default().push(VenueWeight {
                venue: row.award_venue,
                weight: row.weight,
                accuracy: row.accuracy,
            });
        }
        serde_json::to_value(by_category).context("failed to encode model weights")
    }

    fn load_venue_strength(&self, year: Option<i32>) -> Result<Value> {
        let year = year.unwrap_or(self.current_year);
        let rows = self.db.load_model_weights(Some(year))?;
        let model = TrainedModel::from_model_weights(self.catalog.venues(), &rows);
        let predictor = OscarPredictor::with_model(self.catalog.clone(), model);
        let report = predictor.analyze_venue_strength()?;
        serde_json::to_value(report).context("failed to encode venue strength")
    }

    /// One full train/store/predict/write cycle for `year`.
    pub fn run_prediction_cycle(&self, year: i32) -> Result<PredictionRun> {
        let history = self
            .db
            .load_nominations(YearFilter::Before(year))
            .context("failed to load training nominations")?;
        let history_wins = self
            .db
            .load_award_wins(YearFilter::Before(year))
            .context("failed to load training award results")?;
        if history.is_empty() {
            warn!("No nominations before {year}; every category will be untrained");
        }

        let mut engine = OscarPredictor::new(self.catalog.clone());
        let model = engine.train(&history, &history_wins);
        let trained_categories = model.categories().count();
        let skipped_categories = model.skipped_categories().len();
        let weights = model.model_weights(year);
        self.db
            .replace_model_weights(year, &weights)
            .context("failed to store model weights")?;

        let years = YearFilter::Exactly(year);
        let nominations = self.db.load_nominations(years)?;
        let award_wins = self.db.load_award_wins(years)?;
        let references = self.db.load_references(years)?;
        let (betting, market): (Vec<_>, Vec<_>) = references
            .into_iter()
            .filter(|r| r.reference_type != ReferenceType::ModelLikelihood)
            .partition(|r| r.reference_type == ReferenceType::BettingOdds);

        let predictions = engine.predict(&nominations, &award_wins, &betting, &market)?;
        let likelihoods: Vec<(i64, f64)> = predictions
            .values()
            .flatten()
            .filter_map(|n| n.likelihood.map(|l| (n.id, f64::from(l))))
            .collect();
        let likelihoods_written = self
            .db
            .replace_model_likelihoods(year, &likelihoods, MODEL_SOURCE)
            .context("failed to store likelihoods")?;

        Ok(PredictionRun {
            year,
            trained_categories,
            skipped_categories,
            likelihoods_written,
        })
    }
}

fn respond(summary: &str, result: Result<Value>) -> ServiceResponse {
    match result {
        Ok(body) => ServiceResponse::ok(body),
        Err(e) => {
            error!("{summary}: {e:#}");
            ServiceResponse::failure(500, summary, format!("{e:#}"))
        }
    }
}
