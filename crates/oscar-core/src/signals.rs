// Signal aggregation: award wins, betting odds, and market prices keyed by
// nomination id.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{AwardWin, Nomination, NomineeView, Reference, ReferenceType};
use crate::odds::probability_to_odds;

/// Everything known about one nomination beyond the nomination record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NominationSignals {
    /// Venues where the nominee won (`won == true`).
    pub won_awards: BTreeSet<String>,
    pub betting_odds: Option<f64>,
    pub market_probability: Option<f64>,
    /// Likelihood persisted by an earlier prediction run.
    pub model_likelihood: Option<f64>,
}

/// One-pass index over award wins and references.
///
/// When a nomination has several references of the same type, the first one
/// encountered is kept.
#[derive(Debug, Clone, Default)]
pub struct SignalIndex {
    by_nomination: HashMap<i64, NominationSignals>,
}

impl SignalIndex {
    pub fn build<'w, 'r, W, R>(award_wins: W, references: R) -> Self
    where
        W: IntoIterator<Item = &'w AwardWin>,
        R: IntoIterator<Item = &'r Reference>,
    {
        let mut by_nomination: HashMap<i64, NominationSignals> = HashMap::new();

        for win in award_wins {
            if win.won {
                by_nomination
                    .entry(win.nomination_id)
                    .or_default()
                    .won_awards
                    .insert(win.award_venue.clone());
            }
        }

        for reference in references {
            let signals = by_nomination.entry(reference.nomination_id).or_default();
            let slot = match reference.reference_type {
                ReferenceType::BettingOdds => &mut signals.betting_odds,
                ReferenceType::PredictiveMarket => &mut signals.market_probability,
                ReferenceType::ModelLikelihood => &mut signals.model_likelihood,
            };
            slot.get_or_insert(reference.value);
        }

        Self { by_nomination }
    }

    pub fn get(&self, nomination_id: i64) -> Option<&NominationSignals> {
        self.by_nomination.get(&nomination_id)
    }

    pub fn won_at(&self, nomination_id: i64, venue: &str) -> bool {
        self.get(nomination_id)
            .is_some_and(|s| s.won_awards.contains(venue))
    }

    pub fn len(&self) -> usize {
        self.by_nomination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nomination.is_empty()
    }
}

/// Build the display record for a nomination. Likelihood and award support
/// are left empty; the predictor fills them.
pub fn nominee_view(nomination: &Nomination, index: &SignalIndex) -> NomineeView {
    let signals = index.get(nomination.id);
    NomineeView {
        id: nomination.id,
        nominee_name: nomination.nominee_name.clone(),
        film_title: nomination.film_title.clone(),
        category: nomination.category.clone(),
        nomination_type: nomination.nomination_type,
        year: nomination.year,
        likelihood: None,
        betting_odds: signals
            .and_then(|s| s.betting_odds)
            .filter(|value| *value > 0.0)
            .map(probability_to_odds),
        market_probability: signals.and_then(|s| s.market_probability),
        won_oscar: nomination.won_oscar,
        award_support: String::new(),
    }
}

/// Group enriched nominee records by category, keeping input order within
/// each category.
pub fn group_by_category(
    nominations: &[Nomination],
    index: &SignalIndex,
) -> BTreeMap<String, Vec<NomineeView>> {
    let mut grouped: BTreeMap<String, Vec<NomineeView>> = BTreeMap::new();
    for nomination in nominations {
        grouped
            .entry(nomination.category.clone())
            .or_default()
            .push(nominee_view(nomination, index));
    }
    grouped
}
