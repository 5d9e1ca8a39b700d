// Oscar likelihood engine: venue weight training, nominee scoring, and odds
// conversion. Pure and synchronous; callers supply already-loaded records.

pub mod catalog;
pub mod error;
pub mod model;
pub mod odds;
pub mod predictor;
pub mod signals;
pub mod strength;
pub mod trainer;

pub use catalog::{Catalog, CatalogError, CategorySpec};
pub use error::EngineError;
pub use predictor::{OscarPredictor, Predictions};
pub use trainer::{TrainedModel, MIN_CATEGORY_NOMINATIONS};
