//! Payloads exchanged between the tracking client and the server.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    demurrage::WeeklyDemurrage,
    location::Location,
    stop_event::{StopEvent, StopReason},
    vehicle::Vehicle,
    WithId,
};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTracking {
    pub vehicle_id: Option<Id<Vehicle>>,
    pub location: Option<Location>,
    pub reason: Option<StopReason>,
    /// Defaults to the time the request is handled.
    pub time: Option<DateTime<Utc>>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndTracking {
    pub location: Option<Location>,
    pub time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    pub notes: Option<String>,
    pub photos: Option<Vec<String>>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFlags {
    pub invoice_generated: Option<bool>,
    pub invoice_sent: Option<bool>,
}

/// The open stop event together with the time elapsed so far.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStopEvent {
    pub event: WithId<StopEvent>,
    #[serde(with = "utility::serde::duration")]
    #[schemars(schema_with = "utility::serde::duration::schema")]
    pub elapsed: Duration,
}

/// Result of closing a stop event. `weekly` is set when the event was
/// demurrage and the week's totals were recomputed.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosedStopEvent {
    pub event: WithId<StopEvent>,
    pub weekly: Option<WeeklyDemurrage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeekReport {
    pub weekly: WeeklyDemurrage,
    pub events: Vec<WithId<StopEvent>>,
}
