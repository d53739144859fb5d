use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::config::ScheduleConfig;

/// Hours during which the frame may be on: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ActiveWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.active_start_hour, config.active_end_hour)
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.contains_hour(now.hour())
    }
}

/// Fires once per calendar day, the first time the clock is seen inside
/// the reset hour.
#[derive(Debug, Clone)]
pub struct DailyReset {
    hour: u32,
    last_run: Option<NaiveDate>,
}

impl DailyReset {
    pub fn new(hour: u32) -> Self {
        Self {
            hour,
            last_run: None,
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    /// Returns `true` (and records today) if the reset is due at `now`.
    pub fn check(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if now.hour() == self.hour && self.last_run != Some(today) {
            self.last_run = Some(today);
            true
        } else {
            false
        }
    }
}
