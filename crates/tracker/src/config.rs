use model::vehicle::Vehicle;
use tokio::time::Duration;
use utility::id::Id;

/// Tuning of the motion classifier and the stop-event coordinator.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Smoothed deviation of the acceleration magnitude from gravity, in m/s²,
    /// above which the device counts as moving.
    pub acceleration_threshold: f64,
    /// Smoothed GPS speed, in m/s, above which the device counts as moving.
    pub speed_threshold: f64,
    /// Number of samples in each trailing average.
    pub buffer_size: usize,
    /// How long the readings must stay below the thresholds before the state
    /// flips to stopped.
    pub stop_delay: Duration,
    /// How long the readings must stay above a threshold before the state flips
    /// to moving.
    pub move_delay: Duration,
    /// Period of the live duration refresh while a stop event is open.
    pub refresh_period: Duration,
    /// Vehicle attached to automatically opened stop events.
    pub vehicle_id: Option<Id<Vehicle>>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            acceleration_threshold: 0.5,
            speed_threshold: 1.5,
            buffer_size: 10,
            stop_delay: Duration::from_secs(10),
            move_delay: Duration::from_secs(5),
            refresh_period: Duration::from_secs(60),
            vehicle_id: None,
        }
    }
}
