//! crates/study_planner_core/src/rescheduler.rs
//!
//! Drift correction. Completed units stay exactly where they are; every
//! incomplete unit is repacked forward from today in `order_index` order.
//! Repacking is a pure function of (incomplete units, completed load, config,
//! today), so repeated calls without new progress produce the same plan.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::domain::{ConfigPatch, LearningSchedule, ScheduleConfig};
use crate::error::ScheduleResult;
use crate::packer::{self, DayLoad};

/// What asked for a repack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleTrigger {
    /// The user asked for it.
    Manual,
    /// The once-a-day check run when the calendar opens.
    DailyCheck,
    /// The capacity settings changed.
    ConfigChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescheduleReport {
    pub trigger: RescheduleTrigger,
    /// Incomplete units dated before today, counted before the repack.
    pub overdue: usize,
    /// Units whose date changed.
    pub moved: usize,
    /// Whether the lesson list differs from before.
    pub changed: bool,
    /// True when the trigger's preconditions were not met and nothing ran.
    pub skipped: bool,
}

/// Runs a repack if `trigger` calls for one.
///
/// A daily check only repacks when the user opted into auto-rescheduling and
/// something is overdue; manual and config-change triggers always repack.
pub fn reschedule(
    schedule: &mut LearningSchedule,
    trigger: RescheduleTrigger,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> RescheduleReport {
    if trigger == RescheduleTrigger::DailyCheck {
        let overdue = schedule
            .scheduled_lessons
            .iter()
            .filter(|l| l.is_overdue(today))
            .count();
        if !schedule.auto_reschedule || overdue == 0 {
            debug!(
                user_id = %schedule.user_id,
                overdue,
                auto = schedule.auto_reschedule,
                "Daily reschedule check found nothing to do"
            );
            return RescheduleReport {
                trigger,
                overdue,
                moved: 0,
                changed: false,
                skipped: true,
            };
        }
    }
    repack_future_units(schedule, trigger, today, now)
}

/// Repacks every incomplete unit forward from `max(today, start_date)`.
pub fn repack_future_units(
    schedule: &mut LearningSchedule,
    trigger: RescheduleTrigger,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> RescheduleReport {
    let config = &schedule.config;
    let start = today.max(config.start_date);
    let before = schedule.scheduled_lessons.clone();
    let overdue = before.iter().filter(|l| l.is_overdue(today)).count();

    let (done, mut pending): (Vec<_>, Vec<_>) =
        before.iter().cloned().partition(|lesson| lesson.completed);
    pending.sort_by_key(|lesson| lesson.order_index);

    let occupied: BTreeMap<NaiveDate, DayLoad> = packer::daily_load(&done)
        .into_iter()
        .filter(|(day, _)| *day >= start)
        .collect();
    let units: Vec<_> = pending.iter().map(|lesson| lesson.to_unit()).collect();
    let repacked = packer::pack_with_occupancy(&units, config, start, &occupied);

    let moved = pending
        .iter()
        .zip(&repacked)
        .filter(|(old, new)| old.scheduled_date != new.scheduled_date)
        .count();

    let mut merged = done;
    merged.extend(repacked);
    packer::renumber_days(&mut merged);

    let changed = merged != before;
    schedule.scheduled_lessons = merged;
    schedule.last_rescheduled_at = Some(now);

    info!(
        user_id = %schedule.user_id,
        ?trigger,
        overdue,
        moved,
        changed,
        "Schedule repacked from {}", start
    );

    RescheduleReport {
        trigger,
        overdue,
        moved,
        changed,
        skipped: false,
    }
}

/// Merges a partial settings update into the schedule, validating the result.
/// Does not repack; callers follow up with `repack_future_units` when
/// `patch.changes_capacity()`.
pub fn apply_config(schedule: &mut LearningSchedule, patch: &ConfigPatch) -> ScheduleResult<()> {
    let current = &schedule.config;
    let next = ScheduleConfig::new(
        patch.days_per_week.unwrap_or(current.days_per_week),
        patch.min_hours_per_day.unwrap_or(current.min_hours_per_day),
        patch.max_hours_per_day.unwrap_or(current.max_hours_per_day),
        current.start_date,
        patch
            .focus_skills
            .clone()
            .unwrap_or_else(|| current.focus_skills.clone()),
        patch.include_weekends.or(current.weekends_choice),
    )?;

    schedule.config = next;
    if let Some(auto) = patch.auto_reschedule {
        schedule.auto_reschedule = auto;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Datelike, TimeZone, Utc, Weekday};
    use uuid::Uuid;

    use super::*;
    use crate::domain::ScheduledLesson;
    use crate::error::ScheduleError;
    use crate::packer::pack;
    use crate::progress::mark_completed;
    use crate::testing::{config, date, monday, units};

    fn schedule(count: u32, minutes: u32, cfg: ScheduleConfig) -> LearningSchedule {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let lessons = pack(&units(count, minutes), &cfg, cfg.start_date);
        LearningSchedule {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            roadmap_ids: vec!["roadmap-1".to_string()],
            config: cfg,
            scheduled_lessons: lessons,
            auto_reschedule: true,
            last_rescheduled_at: None,
            created_at: created,
            updated_at: created,
            version: 1,
        }
    }

    fn noon(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
    }

    fn find<'a>(s: &'a LearningSchedule, section: &str) -> &'a ScheduledLesson {
        s.scheduled_lessons.iter().find(|l| l.section_id == section).unwrap()
    }

    fn pairs(s: &LearningSchedule) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = s
            .scheduled_lessons
            .iter()
            .map(|l| (l.lesson_id().to_string(), l.section_id.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn overdue_units_move_to_the_next_study_day() {
        // One 30-minute unit per day: Mon, Tue, Wed, Thu, Fri.
        let mut s = schedule(5, 30, config(5, 0.0, 0.5, monday()));
        let thursday = date(2024, 1, 4);

        let report = repack_future_units(&mut s, RescheduleTrigger::Manual, thursday, noon(thursday));

        assert_eq!(report.overdue, 3);
        assert_eq!(report.moved, 5);
        assert!(report.changed);
        let dates: Vec<_> = s.scheduled_lessons.iter().map(|l| l.scheduled_date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 4),
                date(2024, 1, 5),
                date(2024, 1, 8),
                date(2024, 1, 9),
                date(2024, 1, 10),
            ]
        );
        let order: Vec<_> = s.scheduled_lessons.iter().map(|l| l.order_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn reschedule_twice_is_a_no_op() {
        let mut s = schedule(12, 40, config(3, 1.0, 2.0, monday()));
        let today = date(2024, 1, 10);

        repack_future_units(&mut s, RescheduleTrigger::Manual, today, noon(today));
        let first = s.scheduled_lessons.clone();
        let report = repack_future_units(&mut s, RescheduleTrigger::Manual, today, noon(today));

        assert!(!report.changed);
        assert_eq!(report.moved, 0);
        assert_eq!(s.scheduled_lessons, first);
        assert_eq!(s.last_rescheduled_at, Some(noon(today)));
    }

    #[test]
    fn completed_units_are_never_touched() {
        let mut s = schedule(8, 30, config(5, 0.0, 1.0, monday()));
        let done_at = noon(monday());
        mark_completed(&mut s.scheduled_lessons, "lesson-0", "section-0", Some(50), done_at).unwrap();
        // Completed ahead of schedule.
        mark_completed(&mut s.scheduled_lessons, "lesson-5", "section-5", None, done_at).unwrap();
        let before_done: Vec<_> = s
            .scheduled_lessons
            .iter()
            .filter(|l| l.completed)
            .map(|l| (l.section_id.clone(), l.scheduled_date, l.completed_at, l.actual_duration))
            .collect();

        let today = date(2024, 1, 5);
        repack_future_units(&mut s, RescheduleTrigger::Manual, today, noon(today));
        apply_config(
            &mut s,
            &ConfigPatch {
                max_hours_per_day: Some(2.0),
                ..ConfigPatch::default()
            },
        )
        .unwrap();
        repack_future_units(&mut s, RescheduleTrigger::ConfigChange, today, noon(today));

        let after_done: Vec<_> = s
            .scheduled_lessons
            .iter()
            .filter(|l| l.completed)
            .map(|l| (l.section_id.clone(), l.scheduled_date, l.completed_at, l.actual_duration))
            .collect();
        assert_eq!(before_done, after_done);
    }

    #[test]
    fn no_unit_is_lost_or_duplicated() {
        let mut s = schedule(15, 45, config(4, 1.0, 1.5, monday()));
        mark_completed(&mut s.scheduled_lessons, "lesson-3", "section-3", None, noon(monday())).unwrap();
        let before = pairs(&s);

        let today = date(2024, 1, 17);
        repack_future_units(&mut s, RescheduleTrigger::Manual, today, noon(today));

        assert_eq!(pairs(&s), before);
    }

    #[test]
    fn pending_units_keep_order_and_day_slots_stay_contiguous() {
        let mut s = schedule(10, 30, config(5, 1.0, 2.0, monday()));
        mark_completed(&mut s.scheduled_lessons, "lesson-6", "section-6", None, noon(monday())).unwrap();
        let today = date(2024, 1, 3);
        repack_future_units(&mut s, RescheduleTrigger::Manual, today, noon(today));

        let pending: Vec<_> = s
            .scheduled_lessons
            .iter()
            .filter(|l| !l.completed)
            .map(|l| l.order_index)
            .collect();
        let mut sorted = pending.clone();
        sorted.sort();
        assert_eq!(pending, sorted);

        let mut slots: BTreeMap<NaiveDate, Vec<u32>> = BTreeMap::new();
        for lesson in &s.scheduled_lessons {
            slots.entry(lesson.scheduled_date).or_default().push(lesson.order_in_day);
        }
        for (_, day) in slots {
            assert_eq!(day, (0..day.len() as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn completed_work_keeps_its_day_capacity() {
        // Four 30-minute units fill Monday.
        let mut s = schedule(8, 30, config(5, 1.0, 2.0, monday()));
        mark_completed(&mut s.scheduled_lessons, "lesson-0", "section-0", None, noon(monday())).unwrap();
        mark_completed(&mut s.scheduled_lessons, "lesson-1", "section-1", None, noon(monday())).unwrap();

        repack_future_units(&mut s, RescheduleTrigger::Manual, monday(), noon(monday()));

        let monday_load: u32 = s
            .scheduled_lessons
            .iter()
            .filter(|l| l.scheduled_date == monday())
            .map(|l| l.planned_minutes)
            .sum();
        assert_eq!(monday_load, 120);
        assert_eq!(find(&s, "section-4").scheduled_date, date(2024, 1, 2));
    }

    #[test]
    fn repack_never_starts_before_the_plan_starts() {
        let start = date(2024, 1, 15);
        let mut s = schedule(2, 30, config(5, 0.0, 1.0, start));
        repack_future_units(&mut s, RescheduleTrigger::Manual, monday(), noon(monday()));
        assert_eq!(find(&s, "section-0").scheduled_date, start);
    }

    #[test]
    fn daily_check_skips_without_overdue_units() {
        let mut s = schedule(5, 30, config(5, 0.0, 0.5, monday()));
        let before = s.clone();

        let report = reschedule(&mut s, RescheduleTrigger::DailyCheck, monday(), noon(monday()));

        assert!(report.skipped);
        assert_eq!(s, before);
    }

    #[test]
    fn daily_check_respects_the_auto_reschedule_flag() {
        let mut s = schedule(5, 30, config(5, 0.0, 0.5, monday()));
        s.auto_reschedule = false;
        let today = date(2024, 1, 4);

        let report = reschedule(&mut s, RescheduleTrigger::DailyCheck, today, noon(today));
        assert!(report.skipped);
        assert_eq!(report.overdue, 3);

        s.auto_reschedule = true;
        let report = reschedule(&mut s, RescheduleTrigger::DailyCheck, today, noon(today));
        assert!(!report.skipped);
        assert!(s.scheduled_lessons.iter().all(|l| l.scheduled_date >= today));
    }

    #[test]
    fn derived_weekend_policy_follows_days_per_week() {
        let thursday = date(2024, 1, 4);
        let mut s = schedule(12, 60, config(6, 0.0, 1.0, thursday));
        assert!(s.config.include_weekends);

        let patch = ConfigPatch {
            days_per_week: Some(5),
            ..ConfigPatch::default()
        };
        apply_config(&mut s, &patch).unwrap();
        repack_future_units(&mut s, RescheduleTrigger::ConfigChange, thursday, noon(thursday));

        assert!(!s.config.include_weekends);
        assert!(s
            .scheduled_lessons
            .iter()
            .all(|l| !matches!(l.scheduled_date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn explicit_weekend_choice_survives_later_patches() {
        let mut s = schedule(5, 30, config(5, 1.0, 2.0, monday()));
        apply_config(
            &mut s,
            &ConfigPatch {
                include_weekends: Some(true),
                ..ConfigPatch::default()
            },
        )
        .unwrap();
        apply_config(
            &mut s,
            &ConfigPatch {
                days_per_week: Some(4),
                ..ConfigPatch::default()
            },
        )
        .unwrap();

        assert!(s.config.include_weekends);
        assert_eq!(s.config.weekends_choice, Some(true));
    }

    #[test]
    fn apply_config_merges_and_validates() {
        let mut s = schedule(5, 30, config(5, 1.0, 2.0, monday()));

        apply_config(
            &mut s,
            &ConfigPatch {
                days_per_week: Some(7),
                auto_reschedule: Some(false),
                ..ConfigPatch::default()
            },
        )
        .unwrap();
        assert_eq!(s.config.days_per_week, 7);
        assert!(s.config.include_weekends);
        assert_eq!(s.config.max_hours_per_day, 2.0);
        assert!(!s.auto_reschedule);

        let err = apply_config(
            &mut s,
            &ConfigPatch {
                min_hours_per_day: Some(3.0),
                ..ConfigPatch::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidConfig(_)));
        assert_eq!(s.config.min_hours_per_day, 1.0);
    }
}
