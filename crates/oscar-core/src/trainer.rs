// Venue weight trainer.
//
// For every category with enough history, measures how often each venue's
// winner went on to win the Oscar, then normalizes those hit rates into a
// weight vector over venues.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::Catalog;
use crate::model::{AwardWin, ModelWeight, Nomination, Reference};
use crate::odds::PERCENT_SCALE;
use crate::signals::SignalIndex;

/// Categories with fewer historical nominations than this are not trained.
pub const MIN_CATEGORY_NOMINATIONS: usize = 10;

// ---------------------------------------------------------------------------
// Trained model
// ---------------------------------------------------------------------------

/// Trained weight and accuracy for one venue within one category.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueScore {
    pub venue: String,
    /// Normalized weight; the category's weights sum to 1 or are all 0.
    pub weight: f64,
    /// Percentage of qualifying years where the venue's winner won the Oscar.
    pub accuracy: f64,
}

/// Hit counts for a venue across the qualifying years of a category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VenueTally {
    pub correct_predictions: u32,
    pub total_predictions: u32,
}

impl VenueTally {
    /// Fraction of qualifying years the venue called correctly; 0 without data.
    pub fn hit_rate(&self) -> f64 {
        if self.total_predictions == 0 {
            return 0.0;
        }
        self.correct_predictions as f64 / self.total_predictions as f64
    }
}

/// Immutable result of a training run.
///
/// Holds one [`VenueScore`] per catalog venue (in catalog order) for every
/// trained category. Categories are ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    categories: BTreeMap<String, Vec<VenueScore>>,
    skipped: Vec<String>,
}

impl TrainedModel {
    /// Rebuild a model from persisted weight rows.
    ///
    /// Every category present in `rows` gets one score per catalog venue;
    /// venues without a row score zero.
    pub fn from_model_weights(venues: &[String], rows: &[ModelWeight]) -> Self {
        let mut categories: BTreeMap<String, Vec<VenueScore>> = BTreeMap::new();
        for row in rows {
            categories.entry(row.category.clone()).or_insert_with(|| {
                venues
                    .iter()
                    .map(|venue| VenueScore {
                        venue: venue.clone(),
                        weight: 0.0,
                        accuracy: 0.0,
                    })
                    .collect()
            });
        }
        for row in rows {
            let Some(scores) = categories.get_mut(&row.category) else {
                continue;
            };
            if let Some(score) = scores.iter_mut().find(|s| s.venue == row.award_venue) {
                score.weight = row.weight;
                score.accuracy = row.accuracy.unwrap_or(0.0);
            }
        }
        Self {
            categories,
            skipped: Vec::new(),
        }
    }

    /// Venue scores for a category, or `None` if it was not trained.
    pub fn category(&self, category: &str) -> Option<&[VenueScore]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[VenueScore])> {
        self.categories
            .iter()
            .map(|(name, scores)| (name.as_str(), scores.as_slice()))
    }

    pub fn is_trained(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Categories left out for having fewer than
    /// [`MIN_CATEGORY_NOMINATIONS`] nominations, sorted by name.
    pub fn skipped_categories(&self) -> &[String] {
        &self.skipped
    }

    /// Flatten into storable rows tagged with the prediction year.
    pub fn model_weights(&self, year: i32) -> Vec<ModelWeight> {
        self.categories()
            .flat_map(|(category, scores)| {
                scores.iter().map(move |score| (category, score))
            })
            .enumerate()
            .map(|(i, (category, score))| ModelWeight {
                id: i as i64 + 1,
                year,
                category: category.to_string(),
                award_venue: score.venue.clone(),
                weight: score.weight,
                accuracy: Some(score.accuracy),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Train per-category venue weights from historical nominations.
///
/// Sparse data degrades instead of failing: undersized categories are
/// skipped, and a category where no venue ever matched the Oscar winner gets
/// all-zero weights.
pub fn train(catalog: &Catalog, nominations: &[Nomination], award_wins: &[AwardWin]) -> TrainedModel {
    let index = SignalIndex::build(award_wins, std::iter::empty::<&Reference>());

    let mut by_category: BTreeMap<&str, Vec<&Nomination>> = BTreeMap::new();
    for nomination in nominations {
        by_category
            .entry(nomination.category.as_str())
            .or_default()
            .push(nomination);
    }

    let mut categories = BTreeMap::new();
    let mut skipped = Vec::new();

    for (category, category_nominations) in by_category {
        if category_nominations.len() < MIN_CATEGORY_NOMINATIONS {
            debug!(
                "Skipping {category}: {} nominations, need {MIN_CATEGORY_NOMINATIONS}",
                category_nominations.len()
            );
            skipped.push(category.to_string());
            continue;
        }

        let tallies = tally_venues(catalog.venues(), &category_nominations, &index);
        let scores = normalize(catalog.venues(), &tallies);
        debug!(
            "Trained {category} on {} nominations across {} venues",
            category_nominations.len(),
            scores.len()
        );
        categories.insert(category.to_string(), scores);
    }

    TrainedModel { categories, skipped }
}

/// Count, per venue, how many qualifying years it called correctly.
///
/// A year qualifies when it has a recorded Oscar winner; the first winner
/// found in input order is used.
pub fn tally_venues(
    venues: &[String],
    nominations: &[&Nomination],
    index: &SignalIndex,
) -> Vec<VenueTally> {
    let mut by_year: BTreeMap<i32, Vec<&Nomination>> = BTreeMap::new();
    for &nomination in nominations {
        by_year.entry(nomination.year).or_default().push(nomination);
    }

    let winners: Vec<&Nomination> = by_year
        .values()
        .filter_map(|year_nominations| year_nominations.iter().copied().find(|n| n.won_oscar))
        .collect();

    venues
        .iter()
        .map(|venue| {
            let correct = winners
                .iter()
                .filter(|winner| index.won_at(winner.id, venue))
                .count();
            VenueTally {
                correct_predictions: correct as u32,
                total_predictions: winners.len() as u32,
            }
        })
        .collect()
}

/// Turn raw hit rates into normalized weights and accuracy percentages.
pub fn normalize(venues: &[String], tallies: &[VenueTally]) -> Vec<VenueScore> {
    let rates: Vec<f64> = tallies.iter().map(VenueTally::hit_rate).collect();
    let sum: f64 = rates.iter().sum();

    venues
        .iter()
        .zip(rates)
        .map(|(venue, rate)| VenueScore {
            venue: venue.clone(),
            weight: if sum > 0.0 { rate / sum } else { 0.0 },
            accuracy: rate * PERCENT_SCALE,
        })
        .collect()
}
