use chrono::{DateTime, Duration, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utility::id::{HasId, Id};

use crate::{
    company::Company, location::Location, user::User, vehicle::Vehicle, ExampleData,
};

/// Why a vehicle is standing still, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Loading,
    Unloading,
    Waiting,
    Traffic,
    Breakdown,
    Rest,
    Other,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Unloading => "unloading",
            Self::Waiting => "waiting",
            Self::Traffic => "traffic",
            Self::Breakdown => "breakdown",
            Self::Rest => "rest",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "loading" => Some(Self::Loading),
            "unloading" => Some(Self::Unloading),
            "waiting" => Some(Self::Waiting),
            "traffic" => Some(Self::Traffic),
            "breakdown" => Some(Self::Breakdown),
            "rest" => Some(Self::Rest),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopEventError {
    #[error("the stop event has already been closed")]
    AlreadyClosed,
    #[error("a stop event can not end before it started")]
    EndsBeforeStart,
}

/// A recorded interval during which a vehicle stood still.
///
/// An event is open while `end_time` is `None`. Once closed, only `notes` and
/// `photos` may change.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopEvent {
    pub user_id: Id<User>,
    pub company_id: Id<Company>,
    pub vehicle_id: Option<Id<Vehicle>>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_location: Option<Location>,
    pub end_location: Option<Location>,
    pub duration_minutes: i32,
    pub is_demurrage: bool,
    pub reason: Option<StopReason>,
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl HasId for StopEvent {
    type IdType = i32;
}

/// A stop is demurrage iff it lasted strictly longer than the threshold.
pub fn is_demurrage(duration_minutes: i32, threshold_minutes: i32) -> bool {
    duration_minutes > threshold_minutes
}

/// Whole minutes between two instants, rounded down and never negative.
pub fn whole_minutes_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> i32 {
    (*end - *start).num_minutes().clamp(0, i32::MAX as i64) as i32
}

impl StopEvent {
    pub fn open(
        user_id: Id<User>,
        company_id: Id<Company>,
        vehicle_id: Option<Id<Vehicle>>,
        start_time: DateTime<Utc>,
        start_location: Option<Location>,
        reason: Option<StopReason>,
    ) -> Self {
        Self {
            user_id,
            company_id,
            vehicle_id,
            start_time,
            end_time: None,
            start_location,
            end_location: None,
            duration_minutes: 0,
            is_demurrage: false,
            reason,
            notes: None,
            photos: vec![],
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Time elapsed since the stop started, or the final duration if closed.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).max(Duration::zero())
    }

    /// Updates duration and demurrage flag of an open event to reflect the time
    /// elapsed until `now`. Closed events are left untouched.
    pub fn refresh(&mut self, now: DateTime<Utc>, threshold_minutes: i32) {
        if !self.is_open() {
            return;
        }
        self.duration_minutes = whole_minutes_between(&self.start_time, &now);
        self.is_demurrage = is_demurrage(self.duration_minutes, threshold_minutes);
    }

    /// Closes the event and fixes its duration and demurrage flag.
    pub fn close(
        &mut self,
        end_time: DateTime<Utc>,
        end_location: Option<Location>,
        threshold_minutes: i32,
    ) -> Result<(), StopEventError> {
        if !self.is_open() {
            return Err(StopEventError::AlreadyClosed);
        }
        if end_time < self.start_time {
            return Err(StopEventError::EndsBeforeStart);
        }
        self.duration_minutes = whole_minutes_between(&self.start_time, &end_time);
        self.is_demurrage = is_demurrage(self.duration_minutes, threshold_minutes);
        self.end_time = Some(end_time);
        self.end_location = end_location;
        Ok(())
    }

    /// Replaces notes and/or photos, the only fields which stay editable.
    pub fn annotate(&mut self, notes: Option<String>, photos: Option<Vec<String>>) {
        if let Some(notes) = notes {
            self.notes = Some(notes).filter(|notes| !notes.is_empty());
        }
        if let Some(photos) = photos {
            self.photos = photos;
        }
    }
}

impl ExampleData for StopEvent {
    fn example_data() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 5, 14, 7, 12, 0).single().unwrap_or_default();
        StopEvent {
            user_id: Id::new(3),
            company_id: Id::new(1),
            vehicle_id: Some(Id::new(7)),
            start_time: start,
            end_time: Some(start + Duration::minutes(51)),
            start_location: Some(Location::new(54.3233, 10.1228)),
            end_location: Some(Location::new(54.3234, 10.1229)),
            duration_minutes: 51,
            is_demurrage: is_demurrage(51, 50),
            reason: Some(StopReason::Unloading),
            notes: Some("gate 4 closed until 8am".to_owned()),
            photos: vec![],
        }
    }
}
