// Likelihood predictor.
//
// Scores current-season nominees as the weighted sum of the venues they have
// already won, using weights from a trained model.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::model::{AwardWin, Nomination, NomineeView, Reference, VenueStrength};
use crate::odds::PERCENT_SCALE;
use crate::signals::{group_by_category, SignalIndex};
use crate::strength;
use crate::trainer::{self, TrainedModel, VenueScore};

/// Ranked nominees keyed by category name.
pub type Predictions = BTreeMap<String, Vec<NomineeView>>;

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Binary venue-win indicators for one nominee, aligned with the catalog's
/// venue order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector<'a> {
    venues: &'a [String],
    values: Vec<u8>,
}

impl<'a> FeatureVector<'a> {
    pub fn build(venues: &'a [String], nomination_id: i64, index: &SignalIndex) -> Self {
        let values = venues
            .iter()
            .map(|venue| u8::from(index.won_at(nomination_id, venue)))
            .collect();
        Self { venues, values }
    }

    /// 1 if the nominee won at `venue`, else 0.
    pub fn get(&self, venue: &str) -> u8 {
        self.venues
            .iter()
            .position(|v| v == venue)
            .map_or(0, |i| self.values[i])
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Venues with a win, in catalog order.
    pub fn supporting_venues(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.venues
            .iter()
            .zip(&self.values)
            .filter(|(_, value)| **value == 1)
            .map(|(venue, _)| venue.as_str())
    }
}

/// Weighted sum of features scaled to an integer percent.
pub fn weighted_likelihood(features: &FeatureVector<'_>, scores: &[VenueScore]) -> u32 {
    let sum: f64 = scores
        .iter()
        .map(|score| f64::from(features.get(&score.venue)) * score.weight)
        .sum();
    (sum * PERCENT_SCALE).round().clamp(0.0, PERCENT_SCALE) as u32
}

/// Comma-joined supporting venues, or an empty string.
pub fn award_support(features: &FeatureVector<'_>) -> String {
    features.supporting_venues().collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Descending by likelihood; unknown likelihoods go last.
pub fn compare_likelihood(a: &NomineeView, b: &NomineeView) -> Ordering {
    match (a.likelihood, b.likelihood) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of every category's list by [`compare_likelihood`].
pub fn rank(predictions: &mut Predictions) {
    for nominees in predictions.values_mut() {
        nominees.sort_by(compare_likelihood);
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Score and rank nominees against a trained model.
///
/// Betting and market references only feed display fields. Nominees in
/// untrained categories keep `likelihood == None`.
pub fn predict<'r>(
    catalog: &Catalog,
    model: &TrainedModel,
    nominations: &[Nomination],
    award_wins: &[AwardWin],
    references: impl IntoIterator<Item = &'r Reference>,
) -> Predictions {
    let index = SignalIndex::build(award_wins, references);
    let mut predictions = group_by_category(nominations, &index);

    for (category, nominees) in predictions.iter_mut() {
        let scores = model.category(category);
        if scores.is_none() {
            debug!("No trained weights for {category}; likelihood left unknown");
        }
        for nominee in nominees.iter_mut() {
            let features = FeatureVector::build(catalog.venues(), nominee.id, &index);
            nominee.likelihood = scores.map(|s| weighted_likelihood(&features, s));
            nominee.award_support = award_support(&features);
        }
    }

    rank(&mut predictions);
    predictions
}

/// Rebuild ranked nominee lists from likelihoods stored by an earlier
/// prediction run instead of scoring them again.
pub fn from_stored_likelihoods<'r>(
    catalog: &Catalog,
    nominations: &[Nomination],
    award_wins: &[AwardWin],
    references: impl IntoIterator<Item = &'r Reference>,
) -> Predictions {
    let index = SignalIndex::build(award_wins, references);
    let mut predictions = group_by_category(nominations, &index);

    for nominee in predictions.values_mut().flatten() {
        let features = FeatureVector::build(catalog.venues(), nominee.id, &index);
        nominee.likelihood = index
            .get(nominee.id)
            .and_then(|s| s.model_likelihood)
            .map(|value| value.round().clamp(0.0, PERCENT_SCALE) as u32);
        nominee.award_support = award_support(&features);
    }

    rank(&mut predictions);
    predictions
}

// ---------------------------------------------------------------------------
// Stateful wrapper
// ---------------------------------------------------------------------------

/// Train-once, query-many predictor bound to a catalog.
///
/// Instances are not shared between prediction cycles; concurrent cycles for
/// different years each build their own.
#[derive(Debug, Clone)]
pub struct OscarPredictor {
    catalog: Catalog,
    model: Option<TrainedModel>,
}

impl OscarPredictor {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            model: None,
        }
    }

    /// Wrap a model trained elsewhere (for example rebuilt from storage).
    pub fn with_model(catalog: Catalog, model: TrainedModel) -> Self {
        Self {
            catalog,
            model: Some(model),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Train on historical data, replacing any previous model.
    pub fn train(&mut self, nominations: &[Nomination], award_wins: &[AwardWin]) -> &TrainedModel {
        let model = trainer::train(&self.catalog, nominations, award_wins);
        self.model.insert(model)
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn predict(
        &self,
        nominations: &[Nomination],
        award_wins: &[AwardWin],
        betting_odds: &[Reference],
        market_refs: &[Reference],
    ) -> Result<Predictions, EngineError> {
        let model = self.model.as_ref().ok_or(EngineError::NotTrained {
            operation: "making predictions",
        })?;
        Ok(predict(
            &self.catalog,
            model,
            nominations,
            award_wins,
            betting_odds.iter().chain(market_refs),
        ))
    }

    pub fn analyze_venue_strength(&self) -> Result<Vec<VenueStrength>, EngineError> {
        let model = self.model.as_ref().ok_or(EngineError::NotTrained {
            operation: "analyzing venue strength",
        })?;
        Ok(strength::venue_strength(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategorySpec;
    use crate::model::{ModelWeight, NominationType, ReferenceType};
    use chrono::Utc;

    fn catalog() -> Catalog {
        Catalog::new(
            vec!["BAFTA".into(), "Golden Globes".into()],
            vec![
                CategorySpec {
                    name: "Best Picture".into(),
                    nomination_type: NominationType::Maker,
                },
                CategorySpec {
                    name: "Sound".into(),
                    nomination_type: NominationType::Crafter,
                },
            ],
        )
        .unwrap()
    }

    fn weights(category: &str, bafta: f64, globes: f64) -> Vec<ModelWeight> {
        vec![
            ModelWeight {
                id: 1,
                year: 2025,
                category: category.into(),
                award_venue: "BAFTA".into(),
                weight: bafta,
                accuracy: Some(bafta * 100.0),
            },
            ModelWeight {
                id: 2,
                year: 2025,
                category: category.into(),
                award_venue: "Golden Globes".into(),
                weight: globes,
                accuracy: Some(globes * 100.0),
            },
        ]
    }

    fn nomination(id: i64, category: &str) -> Nomination {
        Nomination {
            id,
            year: 2025,
            category: category.into(),
            nomination_type: NominationType::Maker,
            nominee_name: format!("Nominee {id}"),
            film_title: None,
            won_oscar: false,
            created_at: Utc::now(),
        }
    }

    fn win(nomination_id: i64, venue: &str) -> AwardWin {
        AwardWin {
            id: nomination_id * 10,
            nomination_id,
            award_venue: venue.into(),
            award_category: None,
            won: true,
        }
    }

    fn trained(rows: &[ModelWeight]) -> OscarPredictor {
        let catalog = catalog();
        let model = TrainedModel::from_model_weights(catalog.venues(), rows);
        OscarPredictor::with_model(catalog, model)
    }

    #[test]
    fn predict_before_train_is_not_trained() {
        let predictor = OscarPredictor::new(catalog());
        let err = predictor
            .predict(&[nomination(1, "Best Picture")], &[], &[], &[])
            .unwrap_err();
        assert!(matches!(err, EngineError::NotTrained { .. }));
        assert!(matches!(
            predictor.analyze_venue_strength(),
            Err(EngineError::NotTrained { .. })
        ));
    }

    #[test]
    fn sweeping_every_venue_scores_one_hundred() {
        let predictor = trained(&weights("Best Picture", 0.6, 0.4));
        let noms = vec![nomination(1, "Best Picture"), nomination(2, "Best Picture")];
        let wins = vec![
            AwardWin {
                id: 11,
                ..win(1, "BAFTA")
            },
            AwardWin {
                id: 12,
                ..win(1, "Golden Globes")
            },
        ];
        let out = predictor.predict(&noms, &wins, &[], &[]).unwrap();
        let ranked = &out["Best Picture"];
        assert_eq!(ranked[0].id, 1);
        assert_eq!(ranked[0].likelihood, Some(100));
        assert_eq!(ranked[0].award_support, "BAFTA, Golden Globes");
        assert_eq!(ranked[1].likelihood, Some(0));
        assert_eq!(ranked[1].award_support, "");
    }

    #[test]
    fn partial_support_uses_weight_share() {
        let predictor = trained(&weights("Best Picture", 0.6, 0.4));
        let noms = vec![nomination(1, "Best Picture"), nomination(2, "Best Picture")];
        let wins = vec![win(1, "Golden Globes"), win(2, "BAFTA")];
        let out = predictor.predict(&noms, &wins, &[], &[]).unwrap();
        let ranked = &out["Best Picture"];
        assert_eq!(
            ranked.iter().map(|n| (n.id, n.likelihood)).collect::<Vec<_>>(),
            vec![(2, Some(60)), (1, Some(40))]
        );
    }

    #[test]
    fn untrained_category_is_unknown_not_zero() {
        let predictor = trained(&weights("Best Picture", 1.0, 0.0));
        let noms = vec![nomination(5, "Sound")];
        let wins = vec![win(5, "BAFTA")];
        let out = predictor.predict(&noms, &wins, &[], &[]).unwrap();
        let sound = &out["Sound"][0];
        assert_eq!(sound.likelihood, None);
        assert_eq!(sound.award_support, "BAFTA");
    }

    #[test]
    fn all_zero_weights_give_zero_likelihood() {
        let predictor = trained(&weights("Best Picture", 0.0, 0.0));
        let out = predictor
            .predict(&[nomination(1, "Best Picture")], &[win(1, "BAFTA")], &[], &[])
            .unwrap();
        assert_eq!(out["Best Picture"][0].likelihood, Some(0));
    }

    #[test]
    fn unknown_likelihood_sorts_last_and_order_is_stable() {
        let mut predictions = Predictions::new();
        let view = |id: i64, likelihood: Option<u32>| NomineeView {
            id,
            nominee_name: String::new(),
            film_title: None,
            category: "Sound".into(),
            nomination_type: NominationType::Crafter,
            year: 2025,
            likelihood,
            betting_odds: None,
            market_probability: None,
            won_oscar: false,
            award_support: String::new(),
        };
        predictions.insert(
            "Sound".into(),
            vec![
                view(1, None),
                view(2, Some(10)),
                view(3, Some(70)),
                view(4, None),
                view(5, Some(10)),
            ],
        );
        rank(&mut predictions);
        let ids: Vec<i64> = predictions["Sound"].iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 2, 5, 1, 4]);
    }

    #[test]
    fn display_signals_pass_through() {
        let predictor = trained(&weights("Best Picture", 0.5, 0.5));
        let betting = vec![Reference {
            id: 1,
            nomination_id: 1,
            reference_type: ReferenceType::BettingOdds,
            value: 75.0,
            source: Some("bookmaker".into()),
        }];
        let market = vec![Reference {
            id: 2,
            nomination_id: 1,
            reference_type: ReferenceType::PredictiveMarket,
            value: 71.5,
            source: None,
        }];
        let out = predictor
            .predict(&[nomination(1, "Best Picture")], &[], &betting, &market)
            .unwrap();
        let nominee = &out["Best Picture"][0];
        assert_eq!(nominee.betting_odds.as_deref(), Some("1/3"));
        assert_eq!(nominee.market_probability, Some(71.5));
        assert_eq!(nominee.likelihood, Some(0));
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let predictor = trained(&weights("Best Picture", 0.7, 0.3));
        let noms: Vec<Nomination> = (1..=5).map(|i| nomination(i, "Best Picture")).collect();
        let wins = vec![win(2, "BAFTA"), win(4, "Golden Globes"), win(5, "BAFTA")];
        let first = predictor.predict(&noms, &wins, &[], &[]).unwrap();
        let second = predictor.predict(&noms, &wins, &[], &[]).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn train_then_predict_end_to_end() {
        let mut predictor = OscarPredictor::new(catalog());
        let mut history = Vec::new();
        let mut history_wins = Vec::new();
        for (offset, year) in (2020..2024).enumerate() {
            for i in 0..3 {
                let id = 100 + offset as i64 * 10 + i;
                history.push(Nomination {
                    year,
                    won_oscar: i == 0,
                    ..nomination(id, "Best Picture")
                });
                if i == 0 {
                    history_wins.push(win(id, "BAFTA"));
                }
            }
        }
        let model = predictor.train(&history, &history_wins);
        assert!(model.is_trained("Best Picture"));
        assert!(predictor.is_trained());

        let out = predictor
            .predict(&[nomination(1, "Best Picture")], &[win(1, "BAFTA")], &[], &[])
            .unwrap();
        assert_eq!(out["Best Picture"][0].likelihood, Some(100));

        let strength = predictor.analyze_venue_strength().unwrap();
        assert_eq!(strength.len(), 2);
        assert_eq!(strength[0].venue, "BAFTA");
        assert_eq!(strength[0].strength, 100.0);
        assert_eq!(strength[1].strength, 0.0);
    }

    #[test]
    fn stored_likelihoods_are_ranked_without_retraining() {
        let c = catalog();
        let noms = vec![
            nomination(1, "Best Picture"),
            nomination(2, "Best Picture"),
            nomination(3, "Best Picture"),
        ];
        let stored = |id: i64, nomination_id: i64, value: f64| Reference {
            id,
            nomination_id,
            reference_type: ReferenceType::ModelLikelihood,
            value,
            source: Some("model".into()),
        };
        let refs = vec![stored(1, 1, 12.4), stored(2, 2, 67.5), stored(3, 2, 5.0)];
        let out = from_stored_likelihoods(&c, &noms, &[win(2, "BAFTA")], &refs);
        let ranked: Vec<(i64, Option<u32>)> = out["Best Picture"]
            .iter()
            .map(|n| (n.id, n.likelihood))
            .collect();
        assert_eq!(ranked, vec![(2, Some(68)), (1, Some(12)), (3, None)]);
        assert_eq!(out["Best Picture"][0].award_support, "BAFTA");
    }

    #[test]
    fn feature_vector_follows_catalog_order() {
        let c = catalog();
        let wins = vec![win(1, "Golden Globes")];
        let index = SignalIndex::build(&wins, std::iter::empty::<&Reference>());
        let features = FeatureVector::build(c.venues(), 1, &index);
        assert_eq!(features.values(), &[0, 1]);
        assert_eq!(features.get("Golden Globes"), 1);
        assert_eq!(features.get("Cannes"), 0);
    }
}
