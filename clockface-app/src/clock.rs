//! Wall-clock formatting and per-minute debouncing.

use std::fmt::{Display, Write};

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike};

/// The two lines shown by every clock window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockText {
    pub time: String,
    pub date: String,
}

impl ClockText {
    /// Format `now` with chrono strftime patterns.
    pub fn format<Tz>(now: &DateTime<Tz>, time_format: &str, date_format: &str) -> Result<Self, std::fmt::Error>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut time = String::new();
        write!(time, "{}", now.format(time_format))?;
        let mut date = String::new();
        write!(date, "{}", now.format(date_format))?;
        Ok(Self { time, date })
    }
}

/// Tracks the last rendered minute so clocks redraw only when it changes.
#[derive(Debug, Default)]
pub struct MinuteTracker {
    last: Option<NaiveDateTime>,
}

impl MinuteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `now`; true if it falls in a different minute than last time.
    pub fn advance(&mut self, now: NaiveDateTime) -> bool {
        let minute = truncate_to_minute(now);
        if self.last == Some(minute) {
            return false;
        }
        self.last = Some(minute);
        true
    }

    /// Forget the last minute so the next `advance` reports a change.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(t)
}
