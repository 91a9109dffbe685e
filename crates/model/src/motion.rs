use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Transient view on the motion classifier, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MotionState {
    pub is_moving: bool,
    /// Trailing average of the GPS speed in meters per second.
    pub smoothed_speed: f64,
    pub last_update: DateTime<Utc>,
}
