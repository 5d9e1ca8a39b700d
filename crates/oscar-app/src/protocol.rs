// JSON request/response envelope for the WebSocket transport.
//
// Requests are tagged by `type`; every request gets exactly one
// `{"status", "body"}` reply.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use oscar_core::model::NominationType;

use crate::service::{NomineesQuery, Service, ServiceResponse};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    Nominees {
        #[serde(default)]
        year: Option<i32>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        nomination_type: Option<NominationType>,
    },
    ModelWeights {
        #[serde(default)]
        year: Option<i32>,
    },
    HistoricalAccuracy,
    RunPredictions {
        #[serde(default)]
        year: Option<i32>,
    },
    VenueStrength {
        #[serde(default)]
        year: Option<i32>,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Nominees { .. } => "NOMINEES",
            Request::ModelWeights { .. } => "MODEL_WEIGHTS",
            Request::HistoricalAccuracy => "HISTORICAL_ACCURACY",
            Request::RunPredictions { .. } => "RUN_PREDICTIONS",
            Request::VenueStrength { .. } => "VENUE_STRENGTH",
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Route a decoded request to the service.
pub fn handle(service: &Service, request: Request) -> ServiceResponse {
    debug!("Handling {} request", request.name());
    match request {
        Request::Nominees {
            year,
            category,
            nomination_type,
        } => service.nominees(&NomineesQuery {
            year,
            category,
            nomination_type,
        }),
        Request::ModelWeights { year } => service.model_weights(year),
        Request::HistoricalAccuracy => service.historical_accuracy(),
        Request::RunPredictions { year } => service.run_predictions(year),
        Request::VenueStrength { year } => service.venue_strength(year),
    }
}

/// Decode a text frame, dispatch it, and encode the reply frame.
pub fn dispatch(service: &Service, text: &str) -> String {
    let response = match serde_json::from_str::<Request>(text) {
        Ok(request) => handle(service, request),
        Err(e) => {
            warn!("Rejected malformed request: {e}");
            ServiceResponse::failure(400, "Malformed request", e)
        }
    };
    encode(&response)
}

pub fn encode(response: &ServiceResponse) -> String {
    // Serializing a struct of u16 + Value cannot fail.
    serde_json::to_string(response).unwrap_or_else(|_| {
        r#"{"status":500,"body":{"error":"Failed to encode response"}}"#.to_string()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
