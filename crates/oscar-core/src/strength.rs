// Venue strength and historical accuracy views for visualization.

use std::collections::BTreeMap;

use crate::model::{CategoryAccuracy, ModelWeight, VenueAccuracySummary, VenueStrength};
use crate::odds::PERCENT_SCALE;
use crate::trainer::TrainedModel;

/// One `{category, venue, strength, accuracy}` tuple per trained
/// (category, venue) pair, with strength as a percentage.
pub fn venue_strength(model: &TrainedModel) -> Vec<VenueStrength> {
    model
        .categories()
        .flat_map(|(category, scores)| {
            scores.iter().map(move |score| VenueStrength {
                category: category.to_string(),
                venue: score.venue.clone(),
                strength: score.weight * PERCENT_SCALE,
                accuracy: score.accuracy,
            })
        })
        .collect()
}

/// Roll stored weight rows up into a per-venue accuracy summary.
///
/// Rows may span several prediction years; each (category, venue) pair is
/// counted once, from its most recent year. The venue's overall accuracy is
/// the mean of its non-zero category accuracies. Categories whose rounded
/// accuracy is zero are left out of the breakdown, which is sorted best
/// first.
pub fn historical_accuracy(venues: &[String], weights: &[ModelWeight]) -> Vec<VenueAccuracySummary> {
    let latest = latest_per_pair(weights);

    venues
        .iter()
        .map(|venue| {
            let rows: Vec<(&str, f64)> = latest
                .iter()
                .filter(|((_, row_venue), _)| *row_venue == venue.as_str())
                .map(|((category, _), w)| (*category, w.accuracy.unwrap_or(0.0)))
                .collect();

            let nonzero: Vec<f64> = rows.iter().map(|(_, a)| *a).filter(|a| *a != 0.0).collect();
            let mean = if nonzero.is_empty() {
                0.0
            } else {
                nonzero.iter().sum::<f64>() / nonzero.len() as f64
            };

            let mut categories: Vec<CategoryAccuracy> = rows
                .iter()
                .map(|(category, accuracy)| CategoryAccuracy {
                    category: category.to_string(),
                    accuracy: round_percent(*accuracy),
                })
                .filter(|c| c.accuracy > 0)
                .collect();
            categories.sort_by(|a, b| b.accuracy.cmp(&a.accuracy));

            VenueAccuracySummary {
                venue: venue.clone(),
                accuracy: round_percent(mean),
                categories,
            }
        })
        .collect()
}

/// Most recent row for each (category, venue), ordered by category.
fn latest_per_pair(weights: &[ModelWeight]) -> BTreeMap<(&str, &str), &ModelWeight> {
    let mut latest: BTreeMap<(&str, &str), &ModelWeight> = BTreeMap::new();
    for row in weights {
        let key = (row.category.as_str(), row.award_venue.as_str());
        match latest.get(&key) {
            Some(kept) if kept.year >= row.year => {}
            _ => {
                latest.insert(key, row);
            }
        }
    }
    latest
}

fn round_percent(value: f64) -> u32 {
    value.round().clamp(0.0, PERCENT_SCALE) as u32
}
