//! Debounced classification of sensor readings into moving and stopped.

use chrono::{DateTime, Utc};
use model::{location::Location, motion::MotionState};
use tokio::time::Instant;
use utility::geo;

use crate::{
    config::TrackerConfig,
    sample::{gravity_deviation, GpsFix, SensorSample},
    smoothing::TrailingAverage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Moving,
    Stopped,
}

/// State of the classifier. The pending states remember when the candidate
/// state takes over if the readings keep agreeing with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Moving,
    Stopped,
    PendingMoving { deadline: Instant },
    PendingStopped { deadline: Instant },
}

impl MotionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Moving => "moving",
            Self::Stopped => "stopped",
            Self::PendingMoving { .. } => "pending_moving",
            Self::PendingStopped { .. } => "pending_stopped",
        }
    }

    /// The last confirmed state.
    pub fn settled(&self) -> Motion {
        match self {
            Self::Moving | Self::PendingStopped { .. } => Motion::Moving,
            Self::Stopped | Self::PendingMoving { .. } => Motion::Stopped,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Self::PendingMoving { deadline } | Self::PendingStopped { deadline } => {
                Some(*deadline)
            }
            Self::Moving | Self::Stopped => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// The readings disagree with the settled state. Confirm at `deadline`.
    DebounceStarted { deadline: Instant },
    /// The readings went back to the settled state before the deadline.
    DebounceCancelled,
    Became(Motion),
}

#[derive(Debug, Clone)]
pub struct MotionClassifier {
    config: TrackerConfig,
    acceleration: TrailingAverage,
    speed: TrailingAverage,
    last_fix: Option<(Location, DateTime<Utc>)>,
    last_update: DateTime<Utc>,
    phase: MotionPhase,
}

impl MotionClassifier {
    /// A classifier which considers the device stopped until readings say
    /// otherwise.
    pub fn new(config: TrackerConfig, now: DateTime<Utc>) -> Self {
        Self {
            acceleration: TrailingAverage::new(config.buffer_size),
            speed: TrailingAverage::new(config.buffer_size),
            config,
            last_fix: None,
            last_update: now,
            phase: MotionPhase::Stopped,
        }
    }

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub fn last_location(&self) -> Option<Location> {
        self.last_fix.map(|(location, _)| location)
    }

    pub fn state(&self) -> MotionState {
        MotionState {
            is_moving: self.phase.settled() == Motion::Moving,
            smoothed_speed: self.speed.average(),
            last_update: self.last_update,
        }
    }

    /// Adds a reading to the trailing averages. `received` is used for fixes
    /// without a timestamp of their own.
    pub fn record(&mut self, sample: &SensorSample, received: DateTime<Utc>) {
        match sample {
            SensorSample::Acceleration { x, y, z } => {
                self.acceleration.push(gravity_deviation(*x, *y, *z));
                self.last_update = received;
            }
            SensorSample::Gps(fix) => self.record_fix(fix, received),
        }
    }

    fn record_fix(&mut self, fix: &GpsFix, received: DateTime<Utc>) {
        let location = fix.location();
        let time = fix.time.unwrap_or(received);
        let speed = fix.speed.filter(|speed| speed.is_finite() && *speed >= 0.0).or_else(|| {
            let (previous, previous_time) = self.last_fix?;
            let elapsed = (time - previous_time).num_milliseconds() as f64 / 1000.0;
            geo::speed_between(
                previous.latitude,
                previous.longitude,
                location.latitude,
                location.longitude,
                elapsed,
            )
        });
        if let Some(speed) = speed {
            self.speed.push(speed);
        }
        self.last_fix = Some((location, time));
        self.last_update = time;
    }

    /// Whether the smoothed readings alone point to movement.
    pub fn raw_motion(&self) -> Motion {
        if self.acceleration.average() > self.config.acceleration_threshold
            || self.speed.average() > self.config.speed_threshold
        {
            Motion::Moving
        } else {
            Motion::Stopped
        }
    }

    /// Applies the current smoothed readings to the state machine.
    pub fn evaluate(&mut self, now: Instant) -> Transition {
        let raw = self.raw_motion();
        match (self.phase, raw) {
            (MotionPhase::Stopped, Motion::Stopped) | (MotionPhase::Moving, Motion::Moving) => {
                Transition::Unchanged
            }
            (MotionPhase::Stopped, Motion::Moving) => {
                let deadline = now + self.config.move_delay;
                self.phase = MotionPhase::PendingMoving { deadline };
                Transition::DebounceStarted { deadline }
            }
            (MotionPhase::Moving, Motion::Stopped) => {
                let deadline = now + self.config.stop_delay;
                self.phase = MotionPhase::PendingStopped { deadline };
                Transition::DebounceStarted { deadline }
            }
            (MotionPhase::PendingMoving { .. }, Motion::Stopped) => {
                self.phase = MotionPhase::Stopped;
                Transition::DebounceCancelled
            }
            (MotionPhase::PendingStopped { .. }, Motion::Moving) => {
                self.phase = MotionPhase::Moving;
                Transition::DebounceCancelled
            }
            (MotionPhase::PendingMoving { deadline }, Motion::Moving)
            | (MotionPhase::PendingStopped { deadline }, Motion::Stopped) => {
                if now >= deadline {
                    self.settle(raw)
                } else {
                    Transition::Unchanged
                }
            }
        }
    }

    /// Confirms the pending state if `deadline` is the one it waits for.
    /// Deadlines of cancelled debounces are ignored.
    pub fn deadline_reached(&mut self, deadline: Instant) -> Transition {
        match self.phase {
            MotionPhase::PendingMoving { deadline: pending } if pending == deadline => {
                self.settle(Motion::Moving)
            }
            MotionPhase::PendingStopped { deadline: pending } if pending == deadline => {
                self.settle(Motion::Stopped)
            }
            _ => Transition::Unchanged,
        }
    }

    fn settle(&mut self, motion: Motion) -> Transition {
        self.phase = match motion {
            Motion::Moving => MotionPhase::Moving,
            Motion::Stopped => MotionPhase::Stopped,
        };
        Transition::Became(motion)
    }
}
