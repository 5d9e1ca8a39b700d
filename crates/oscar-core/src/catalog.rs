// Closed set of award venues and Oscar categories.
//
// Venues and categories come from configuration. Records naming anything
// outside the catalog are rejected at ingestion instead of silently
// producing empty lookups later.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{AwardWin, Nomination, NominationType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog must list at least one award venue")]
    NoVenues,

    #[error("award venue listed twice: {0}")]
    DuplicateVenue(String),

    #[error("category listed twice: {0}")]
    DuplicateCategory(String),

    #[error("nomination {nomination_id} names unknown category {category:?}")]
    UnknownCategory { nomination_id: i64, category: String },

    #[error("award win {award_win_id} names unknown venue {venue:?}")]
    UnknownVenue { award_win_id: i64, venue: String },

    #[error(
        "nomination {nomination_id} is typed {found} but category {category:?} is {expected}"
    )]
    NominationTypeMismatch {
        nomination_id: i64,
        category: String,
        expected: NominationType,
        found: NominationType,
    },
}

/// A category and the portfolio group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: String,
    pub nomination_type: NominationType,
}

/// Validated venues (in display order) and categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    venues: Vec<String>,
    categories: Vec<CategorySpec>,
}

impl Catalog {
    pub fn new(venues: Vec<String>, categories: Vec<CategorySpec>) -> Result<Self, CatalogError> {
        if venues.is_empty() {
            return Err(CatalogError::NoVenues);
        }
        let mut seen = HashSet::new();
        for venue in &venues {
            if !seen.insert(venue.as_str()) {
                return Err(CatalogError::DuplicateVenue(venue.clone()));
            }
        }
        let mut seen = HashSet::new();
        for category in &categories {
            if !seen.insert(category.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.name.clone()));
            }
        }
        Ok(Self { venues, categories })
    }

    pub fn venues(&self) -> &[String] {
        &self.venues
    }

    pub fn categories(&self) -> &[CategorySpec] {
        &self.categories
    }

    pub fn has_venue(&self, venue: &str) -> bool {
        self.venues.iter().any(|v| v == venue)
    }

    pub fn category(&self, name: &str) -> Option<&CategorySpec> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Category names belonging to a portfolio group, in catalog order.
    pub fn categories_of_type(&self, nomination_type: NominationType) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|c| c.nomination_type == nomination_type)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn validate_nomination(&self, nomination: &Nomination) -> Result<(), CatalogError> {
        let Some(spec) = self.category(&nomination.category) else {
            return Err(CatalogError::UnknownCategory {
                nomination_id: nomination.id,
                category: nomination.category.clone(),
            });
        };
        if spec.nomination_type != nomination.nomination_type {
            return Err(CatalogError::NominationTypeMismatch {
                nomination_id: nomination.id,
                category: nomination.category.clone(),
                expected: spec.nomination_type,
                found: nomination.nomination_type,
            });
        }
        Ok(())
    }

    pub fn validate_award_win(&self, award_win: &AwardWin) -> Result<(), CatalogError> {
        if !self.has_venue(&award_win.award_venue) {
            return Err(CatalogError::UnknownVenue {
                award_win_id: award_win.id,
                venue: award_win.award_venue.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn catalog() -> Catalog {
        Catalog::new(
            vec!["BAFTA".into(), "SAG".into()],
            vec![
                CategorySpec {
                    name: "Best Picture".into(),
                    nomination_type: NominationType::Maker,
                },
                CategorySpec {
                    name: "Film Editing".into(),
                    nomination_type: NominationType::Crafter,
                },
            ],
        )
        .unwrap()
    }

    fn nomination(category: &str, nomination_type: NominationType) -> Nomination {
        Nomination {
            id: 1,
            year: 2020,
            category: category.into(),
            nomination_type,
            nominee_name: "Parasite".into(),
            film_title: None,
            won_oscar: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rejects_empty_and_duplicate_venues() {
        assert_eq!(Catalog::new(vec![], vec![]), Err(CatalogError::NoVenues));
        assert_eq!(
            Catalog::new(vec!["SAG".into(), "SAG".into()], vec![]),
            Err(CatalogError::DuplicateVenue("SAG".into()))
        );
    }

    #[test]
    fn rejects_duplicate_categories() {
        let spec = CategorySpec {
            name: "Sound".into(),
            nomination_type: NominationType::Crafter,
        };
        let err = Catalog::new(vec!["BAFTA".into()], vec![spec.clone(), spec]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateCategory("Sound".into()));
    }

    #[test]
    fn validates_nomination_category_and_type() {
        let c = catalog();
        assert!(c
            .validate_nomination(&nomination("Best Picture", NominationType::Maker))
            .is_ok());
        assert!(matches!(
            c.validate_nomination(&nomination("Best Stunts", NominationType::Crafter)),
            Err(CatalogError::UnknownCategory { .. })
        ));
        assert!(matches!(
            c.validate_nomination(&nomination("Best Picture", NominationType::Performer)),
            Err(CatalogError::NominationTypeMismatch { .. })
        ));
    }

    #[test]
    fn validates_award_win_venue() {
        let c = catalog();
        let mut win = AwardWin {
            id: 3,
            nomination_id: 1,
            award_venue: "BAFTA".into(),
            award_category: None,
            won: true,
        };
        assert!(c.validate_award_win(&win).is_ok());
        win.award_venue = "Cannes".into();
        assert_eq!(
            c.validate_award_win(&win),
            Err(CatalogError::UnknownVenue {
                award_win_id: 3,
                venue: "Cannes".into()
            })
        );
    }

    #[test]
    fn groups_categories_by_type() {
        let c = catalog();
        assert_eq!(c.categories_of_type(NominationType::Crafter), vec!["Film Editing"]);
        assert!(c.categories_of_type(NominationType::Performer).is_empty());
    }
}
