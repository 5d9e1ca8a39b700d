// Record types flowing into and out of the likelihood engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Portfolio grouping of Oscar categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NominationType {
    Maker,
    Performer,
    Creator,
    Crafter,
}

impl NominationType {
    pub const ALL: [NominationType; 4] = [
        NominationType::Maker,
        NominationType::Performer,
        NominationType::Creator,
        NominationType::Crafter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NominationType::Maker => "Maker",
            NominationType::Performer => "Performer",
            NominationType::Creator => "Creator",
            NominationType::Crafter => "Crafter",
        }
    }
}

impl fmt::Display for NominationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NominationType {
    type Err = UnknownVariant;

    /// Accepts the singular form and the plural group label used by the
    /// portfolio view ("Makers", "Performers", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Maker" | "Makers" => Ok(NominationType::Maker),
            "Performer" | "Performers" => Ok(NominationType::Performer),
            "Creator" | "Creators" => Ok(NominationType::Creator),
            "Crafter" | "Crafters" => Ok(NominationType::Crafter),
            other => Err(UnknownVariant {
                kind: "nomination type",
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of externally sourced signal attached to a nomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    BettingOdds,
    PredictiveMarket,
    /// Output slot the predictor writes back into; one per nomination.
    ModelLikelihood,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::BettingOdds => "betting_odds",
            ReferenceType::PredictiveMarket => "predictive_market",
            ReferenceType::ModelLikelihood => "model_likelihood",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "betting_odds" => Ok(ReferenceType::BettingOdds),
            "predictive_market" => Ok(ReferenceType::PredictiveMarket),
            "model_likelihood" => Ok(ReferenceType::ModelLikelihood),
            other => Err(UnknownVariant {
                kind: "reference type",
                value: other.to_string(),
            }),
        }
    }
}

/// Returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// A single Oscar nomination. `won_oscar` is only meaningful for past years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    pub id: i64,
    pub year: i32,
    pub category: String,
    pub nomination_type: NominationType,
    pub nominee_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_title: Option<String>,
    pub won_oscar: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of a nomination at a precursor venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardWin {
    pub id: i64,
    pub nomination_id: i64,
    pub award_venue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award_category: Option<String>,
    pub won: bool,
}

/// An external signal on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: i64,
    pub nomination_id: i64,
    pub reference_type: ReferenceType,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One trained (category, venue) coefficient.
///
/// Ids produced by the trainer are local to a training run; the store
/// assigns its own on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelWeight {
    pub id: i64,
    pub year: i32,
    pub category: String,
    pub award_venue: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// A nominee enriched with every signal the engine knows about, ready for
/// the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NomineeView {
    pub id: i64,
    pub nominee_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_title: Option<String>,
    pub category: String,
    pub nomination_type: NominationType,
    pub year: i32,
    /// Integer percent. `None` means the category has no trained weights,
    /// which is not the same as a zero chance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub betting_odds: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_probability: Option<f64>,
    pub won_oscar: bool,
    pub award_support: String,
}

/// Flattened (category, venue) weight for visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueStrength {
    pub category: String,
    pub venue: String,
    /// Normalized weight as a percentage.
    pub strength: f64,
    pub accuracy: f64,
}

/// Per-venue accuracy rolled up across categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueAccuracySummary {
    pub venue: String,
    pub accuracy: u32,
    pub categories: Vec<CategoryAccuracy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub category: String,
    pub accuracy: u32,
}
