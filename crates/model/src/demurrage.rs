use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use utility::id::Id;

use crate::{company::Company, stop_event::StopEvent, DateTimeRange, ExampleData};

/// A billing week. Weeks start on Sunday at midnight UTC.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Week(NaiveDate);

impl Week {
    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_sunday() as i64;
        Self(date - Duration::days(offset))
    }

    /// The week containing the instant `time`.
    pub fn of(time: DateTime<Utc>) -> Self {
        Self::containing(time.date_naive())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.0
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant after the week, exclusive bound.
    pub fn end(&self) -> DateTime<Utc> {
        self.start() + Duration::days(7)
    }

    pub fn range(&self) -> DateTimeRange<Utc> {
        DateTimeRange::new(self.start(), self.end())
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.range().contains(time)
    }

    pub fn previous(&self) -> Self {
        Self(self.0 - Duration::days(7))
    }

    pub fn next(&self) -> Self {
        Self(self.0 + Duration::days(7))
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl<'de> Deserialize<'de> for Week {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        NaiveDate::deserialize(deserializer).map(Week::containing)
    }
}

/// Demurrage totals of one company in one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDemurrage {
    pub company_id: Id<Company>,
    pub week_start: Week,
    pub total_minutes: i64,
    pub event_count: i32,
    pub invoice_generated: bool,
    pub invoice_sent: bool,
}

impl WeeklyDemurrage {
    pub fn empty(company_id: Id<Company>, week_start: Week) -> Self {
        Self {
            company_id,
            week_start,
            total_minutes: 0,
            event_count: 0,
            invoice_generated: false,
            invoice_sent: false,
        }
    }

    /// Sums up all closed demurrage events of the company which started within
    /// the week. Events of other companies or weeks are skipped, so callers may
    /// pass a superset.
    pub fn recompute<'a, I>(company_id: Id<Company>, week_start: Week, events: I) -> Self
    where
        I: IntoIterator<Item = &'a StopEvent>,
    {
        events
            .into_iter()
            .filter(|event| {
                event.company_id == company_id
                    && event.is_demurrage
                    && !event.is_open()
                    && week_start.contains(&event.start_time)
            })
            .fold(Self::empty(company_id, week_start), |mut weekly, event| {
                weekly.total_minutes += event.duration_minutes as i64;
                weekly.event_count += 1;
                weekly
            })
    }

    /// Takes over the invoice flags of a previously stored aggregate.
    pub fn keep_invoice_state(mut self, previous: Option<&WeeklyDemurrage>) -> Self {
        if let Some(previous) = previous {
            self.invoice_generated = previous.invoice_generated;
            self.invoice_sent = previous.invoice_sent;
        }
        self
    }
}

impl ExampleData for WeeklyDemurrage {
    fn example_data() -> Self {
        Self {
            company_id: Id::new(1),
            week_start: Week::containing(
                NaiveDate::from_ymd_opt(2024, 5, 12).unwrap_or_default(),
            ),
            total_minutes: 153,
            event_count: 3,
            invoice_generated: true,
            invoice_sent: false,
        }
    }
}
