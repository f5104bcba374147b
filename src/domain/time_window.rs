// Time window domain model - hour offsets within a 30-day lookback
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the lookback in hours (30 days).
pub const LOOKBACK_HOURS: u32 = 720;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeWindowError {
    #[error("window offset {value} is not a whole, non-negative number of hours")]
    InvalidOffset { value: f64 },
    #[error("window start {start} is after end {end}")]
    Inverted { start: u32, end: u32 },
    #[error("window end {end} exceeds the 720 hour lookback")]
    OutOfRange { end: u32 },
}

/// Offsets count forward from `now - 720h`; offset 720 is `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeWindow")]
pub struct TimeWindow {
    start: u32,
    end: u32,
}

#[derive(Deserialize)]
struct RawTimeWindow {
    start: u32,
    end: u32,
}

impl TryFrom<RawTimeWindow> for TimeWindow {
    type Error = TimeWindowError;

    fn try_from(raw: RawTimeWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    pub fn new(start: u32, end: u32) -> Result<Self, TimeWindowError> {
        if start > end {
            return Err(TimeWindowError::Inverted { start, end });
        }
        if end > LOOKBACK_HOURS {
            return Err(TimeWindowError::OutOfRange { end });
        }
        Ok(Self { start, end })
    }

    /// Build a window from untyped slider values.
    ///
    /// Offsets must be whole, non-negative hours; anything past the lookback
    /// is reported by `new`.
    pub fn from_hours(start: f64, end: f64) -> Result<Self, TimeWindowError> {
        let to_offset = |value: f64| {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                Ok(value.min(f64::from(u32::MAX)) as u32)
            } else {
                Err(TimeWindowError::InvalidOffset { value })
            }
        };
        Self::new(to_offset(start)?, to_offset(end)?)
    }

    /// The whole 30-day lookback.
    pub fn full() -> Self {
        Self {
            start: 0,
            end: LOOKBACK_HOURS,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Resolve the offsets into absolute timestamps relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = now - Duration::hours(i64::from(LOOKBACK_HOURS - self.start));
        let end = now - Duration::hours(i64::from(LOOKBACK_HOURS - self.end));
        (start, end)
    }

    /// Slider caption, e.g. "Day 0 to Day 30"
    pub fn day_label(&self) -> String {
        format!(
            "Day {} to Day {}",
            format_days(self.start),
            format_days(self.end)
        )
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::full()
    }
}

fn format_days(hours: u32) -> String {
    (f64::from(hours) / 24.0).to_string()
}
