//! services/api/src/adapters/clock.rs
//!
//! Wall-clock implementation of the `Clock` port.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use study_planner_core::ports::Clock;

/// Reads the system clock; "today" is the date at a fixed UTC offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Returns `None` if the offset is a day or more.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}
