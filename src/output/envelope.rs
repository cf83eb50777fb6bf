//! JSON envelope types for CLI output.
//!
//! Every JSON result is wrapped in the same envelope so scripts can check
//! `event` and `payload.result_type` before reading the data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current spec version for JSON envelope.
pub const SPEC_VERSION: &str = "1.0";

/// JSON envelope wrapping all CLI output events.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct JsonEnvelope<T> {
    /// API specification version.
    pub spec_version: String,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event type.
    pub event: EventType,
    /// Event-specific payload.
    pub payload: T,
}

impl<T: Serialize> JsonEnvelope<T> {
    /// Create a new envelope with the current timestamp.
    pub fn new(event: EventType, payload: T) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            timestamp: Utc::now(),
            event,
            payload,
        }
    }
}

/// Event types for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Final result.
    Result,
    /// Error occurred.
    Error,
}

/// Result type discriminator for result payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Headline figures and top species.
    Overview,
    /// Detection counts over time.
    Trends,
    /// Detections by hour of day.
    Activity,
    /// Month by hour grid.
    Heatmap,
    /// Species share of each hour.
    Composition,
    /// Status or diet share of each month.
    CompositionOverTime,
    /// Species co-occurrence matrix.
    Cooccurrence,
    /// Diversity indices per period.
    Diversity,
    /// NMDS ordination.
    Nmds,
    /// Dawn chorus and sunrise.
    Dawn,
    /// Weather and activity.
    Weather,
    /// Data quality summaries.
    Quality,
    /// Records and arrivals.
    Records,
    /// Species explorer.
    Explore,
    /// Species without a diet.
    Unclassified,
    /// Diet assignment.
    Classify,
    /// Status update.
    Validate,
    /// Configuration display.
    Config,
    /// Cache maintenance.
    Cache,
}

/// Payload of a `result` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPayload<T> {
    /// Result type discriminator.
    pub result_type: ResultType,
    /// Result data.
    pub data: T,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
    /// Chain of underlying causes, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorPayload {
    /// Capture an error and its source chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let payload = ResultPayload {
            result_type: ResultType::Overview,
            data: vec![("Robin", 1)],
        };
        let envelope = JsonEnvelope::new(EventType::Result, payload);

        let json = serde_json::to_string(&envelope).expect("serialize");
        assert!(json.contains("\"spec_version\":\"1.0\""));
        assert!(json.contains("\"event\":\"result\""));
        assert!(json.contains("\"result_type\":\"overview\""));
    }

    #[test]
    fn test_result_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ResultType::CompositionOverTime).expect("serialize"),
            "\"composition_over_time\""
        );
        assert_eq!(
            serde_json::to_string(&ResultType::Nmds).expect("serialize"),
            "\"nmds\""
        );
    }

    #[test]
    fn test_error_payload_collects_causes() {
        let inner = std::io::Error::other("disk full");
        let error = crate::Error::DietWrite {
            path: "species_diet.json".into(),
            source: inner,
        };
        let payload = ErrorPayload::from_error(&error);
        assert!(payload.message.contains("species_diet.json"));
        assert_eq!(payload.causes, vec!["disk full".to_string()]);

        let json = serde_json::to_string(&ErrorPayload {
            message: "x".to_string(),
            causes: Vec::new(),
        })
        .expect("serialize");
        assert!(!json.contains("causes"));
    }
}
