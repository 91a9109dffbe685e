//! Feeds recorded samples and driver commands to a coordinator.
//!
//! The input holds one JSON object per line. Besides sensor samples it may
//! contain driver commands and pauses, e.g.
//!
//! ```text
//! {"type":"gps","latitude":54.32,"longitude":10.13,"speed":12.0}
//! {"type":"wait","seconds":1}
//! {"type":"reason","reason":"unloading"}
//! {"type":"stop","notes":"gate closed"}
//! ```
//!
//! Empty lines and lines starting with `#` are skipped.

use model::stop_event::StopReason;
use serde::{de, Deserialize, Deserializer};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    time::{self, Duration},
};

use crate::{coordinator::CoordinatorRef, error::Result, sample::SensorSample};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Reason for the next automatically detected stop.
    Reason { reason: Option<StopReason> },
    Start {
        #[serde(default)]
        reason: Option<StopReason>,
    },
    Stop {
        #[serde(default)]
        notes: Option<String>,
    },
    Wait {
        #[serde(deserialize_with = "seconds")]
        seconds: Duration,
    },
}

fn seconds<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(seconds).map_err(de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayLine {
    Sample(SensorSample),
    Command(Command),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub samples: usize,
    pub commands: usize,
    pub skipped: usize,
}

pub async fn replay<C, R>(coordinator: &C, input: R) -> Result<ReplayStats>
where
    C: CoordinatorRef + Sync,
    R: AsyncBufRead + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut lines = input.lines();
    let mut number = 0;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed = match serde_json::from_str::<ReplayLine>(line) {
            Ok(parsed) => parsed,
            Err(why) => {
                log::warn!("skipping line {}: {}", number, why);
                stats.skipped += 1;
                continue;
            }
        };
        match parsed {
            ReplayLine::Sample(sample) => {
                coordinator.sample(sample).await?;
                stats.samples += 1;
            }
            ReplayLine::Command(command) => {
                run_command(coordinator, command).await?;
                stats.commands += 1;
            }
        }
    }
    Ok(stats)
}

async fn run_command<C: CoordinatorRef + Sync>(coordinator: &C, command: Command) -> Result<()> {
    match command {
        Command::Reason { reason } => coordinator.set_reason(reason).await?,
        Command::Start { reason } => match coordinator.start_manual(reason).await {
            Ok(event) => log::info!("driver started stop event {}", event.id),
            Err(why) => log::warn!("driver could not start tracking: {}", why),
        },
        Command::Stop { notes } => match coordinator.stop_manual(notes).await {
            Ok(closed) => log::info!("driver ended stop event {}", closed.event.id),
            Err(why) => log::warn!("driver could not end tracking: {}", why),
        },
        Command::Wait { seconds } => time::sleep(seconds).await,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_samples_or_commands() {
        let line: ReplayLine =
            serde_json::from_str(r#"{"type":"gps","latitude":1.0,"longitude":2.0}"#).unwrap();
        assert_eq!(line, ReplayLine::Sample(SensorSample::gps(1.0, 2.0, None)));

        let line: ReplayLine =
            serde_json::from_str(r#"{"type":"start","reason":"loading"}"#).unwrap();
        assert_eq!(
            line,
            ReplayLine::Command(Command::Start {
                reason: Some(StopReason::Loading)
            })
        );

        let line: ReplayLine = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert_eq!(line, ReplayLine::Command(Command::Stop { notes: None }));

        assert!(serde_json::from_str::<ReplayLine>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn waits_must_be_representable() {
        let line: ReplayLine = serde_json::from_str(r#"{"type":"wait","seconds":1.5}"#).unwrap();
        assert_eq!(
            line,
            ReplayLine::Command(Command::Wait {
                seconds: Duration::from_millis(1500)
            })
        );
        for seconds in ["1e300", "-1"] {
            let line = format!(r#"{{"type":"wait","seconds":{}}}"#, seconds);
            assert!(serde_json::from_str::<ReplayLine>(&line).is_err());
        }
    }
}
