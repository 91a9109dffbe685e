use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Wall clock time that advances with the tokio clock, so paused test time
/// moves event timestamps as well.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.at(Instant::now())
    }

    pub fn at(&self, instant: Instant) -> DateTime<Utc> {
        let offset = instant.saturating_duration_since(self.origin);
        match chrono::Duration::from_std(offset) {
            Ok(offset) => self.wall_origin + offset,
            Err(_) => self.wall_origin,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::time::{self, Duration};

    #[tokio::test(start_paused = true)]
    async fn follows_tokio_time() {
        let origin = Utc.with_ymd_and_hms(2024, 5, 13, 8, 0, 0).unwrap();
        let clock = Clock::starting_at(origin);
        time::sleep(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), origin + chrono::Duration::seconds(90));
    }
}
