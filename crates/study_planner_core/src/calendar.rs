//! crates/study_planner_core/src/calendar.rs
//!
//! Study-day selection. Weeks are 7-day windows anchored at the schedule's
//! start date; the first `days_per_week` eligible days of each window are
//! study days. Weekends are eligible only when the config allows them.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::domain::ScheduleConfig;

#[derive(Debug, Clone, Copy)]
pub struct StudyCalendar {
    anchor: NaiveDate,
    days_per_week: u8,
    include_weekends: bool,
}

impl StudyCalendar {
    pub fn new(anchor: NaiveDate, days_per_week: u8, include_weekends: bool) -> Self {
        Self {
            anchor,
            days_per_week,
            include_weekends,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.start_date, config.days_per_week, config.include_weekends)
    }

    fn is_eligible(&self, date: NaiveDate) -> bool {
        self.include_weekends || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_study_day(&self, date: NaiveDate) -> bool {
        if date < self.anchor || !self.is_eligible(date) {
            return false;
        }
        let offset = (date - self.anchor).num_days();
        let window_start = date - Duration::days(offset % 7);
        let rank = window_start
            .iter_days()
            .take_while(|day| *day <= date)
            .filter(|day| self.is_eligible(*day))
            .count();
        rank <= self.days_per_week as usize
    }

    /// Every study day on or after `from`, in calendar order. Never ends.
    pub fn study_days_from(&self, from: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        from.iter_days().filter(move |day| self.is_study_day(*day))
    }

    /// First study day on or after `from`.
    pub fn next_study_day(&self, from: NaiveDate) -> Option<NaiveDate> {
        self.study_days_from(from).next()
    }
}
