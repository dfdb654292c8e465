//! crates/study_planner_core/src/packer.rs
//!
//! The day-capacity packer. Assigns an ordered run of study units to study
//! days, greedily filling each day up to its capacity. Units are never split
//! or reordered; a unit larger than a whole day gets a day to itself.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::calendar::StudyCalendar;
use crate::domain::{ScheduleConfig, ScheduledLesson, StudyUnit};

/// Capacity already taken on a date by entries the packer must keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayLoad {
    pub minutes: u32,
    pub count: u32,
}

/// Packs `units` starting at `start` onto empty days.
pub fn pack(units: &[StudyUnit], config: &ScheduleConfig, start: NaiveDate) -> Vec<ScheduledLesson> {
    pack_with_occupancy(units, config, start, &BTreeMap::new())
}

/// Packs `units` starting at `start`, treating `occupied` as load that is
/// already on those days.
///
/// `units` must be sorted by `order_index`. The output has one entry per
/// input unit, in the same order.
pub fn pack_with_occupancy(
    units: &[StudyUnit],
    config: &ScheduleConfig,
    start: NaiveDate,
    occupied: &BTreeMap<NaiveDate, DayLoad>,
) -> Vec<ScheduledLesson> {
    debug_assert!(units.windows(2).all(|w| w[0].order_index < w[1].order_index));

    let capacity = config.capacity_minutes();
    let calendar = StudyCalendar::from_config(config);
    let mut packed = Vec::with_capacity(units.len());
    let mut remaining = units.iter().peekable();

    for day in calendar.study_days_from(start) {
        if remaining.peek().is_none() {
            break;
        }
        let load = occupied.get(&day).copied().unwrap_or_default();
        let mut used = load.minutes;
        let mut slot = load.count;

        while let Some(unit) = remaining.peek() {
            let minutes = config.planned_minutes(unit.estimated_duration_minutes, unit.skill.as_deref());
            let fits = used.saturating_add(minutes) <= capacity;
            if !fits && slot > 0 {
                break;
            }
            packed.push(ScheduledLesson::planned(unit, day, minutes, slot));
            used = used.saturating_add(minutes);
            slot += 1;
            remaining.next();
            if !fits {
                // Oversized unit alone on an otherwise empty day.
                break;
            }
        }
    }

    packed
}

/// Sorts lessons by date then `order_index` and renumbers `order_in_day`
/// so it is contiguous from zero on every date.
pub fn renumber_days(lessons: &mut [ScheduledLesson]) {
    lessons.sort_by(|a, b| {
        a.scheduled_date
            .cmp(&b.scheduled_date)
            .then(a.order_index.cmp(&b.order_index))
    });
    let mut current: Option<NaiveDate> = None;
    let mut slot = 0;
    for lesson in lessons.iter_mut() {
        if current != Some(lesson.scheduled_date) {
            current = Some(lesson.scheduled_date);
            slot = 0;
        }
        lesson.order_in_day = slot;
        slot += 1;
    }
}

/// Planned minutes per date.
pub fn daily_load(lessons: &[ScheduledLesson]) -> BTreeMap<NaiveDate, DayLoad> {
    let mut loads: BTreeMap<NaiveDate, DayLoad> = BTreeMap::new();
    for lesson in lessons {
        let load = loads.entry(lesson.scheduled_date).or_default();
        load.minutes = load.minutes.saturating_add(lesson.planned_minutes);
        load.count += 1;
    }
    loads
}
