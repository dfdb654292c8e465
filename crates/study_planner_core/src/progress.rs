//! crates/study_planner_core/src/progress.rs
//!
//! Completion tracking over a schedule's lessons. Completion is first write
//! wins: once a unit is done its timestamp and actual duration never change.

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::StudyCalendar;
use crate::domain::{LessonProgress, LessonStatus, ProgressSummary, ScheduleConfig, ScheduledLesson};
use crate::error::{ScheduleError, ScheduleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Recorded,
    AlreadyCompleted,
}

/// Marks one unit as completed. `actual_duration` falls back to the estimate.
pub fn mark_completed(
    lessons: &mut [ScheduledLesson],
    lesson_id: &str,
    section_id: &str,
    actual_duration: Option<u32>,
    now: DateTime<Utc>,
) -> ScheduleResult<CompletionOutcome> {
    if actual_duration == Some(0) {
        return Err(ScheduleError::InvalidRequest(
            "actual_duration must be greater than zero".to_string(),
        ));
    }
    let lesson = lessons
        .iter_mut()
        .find(|l| l.matches(lesson_id, section_id))
        .ok_or_else(|| ScheduleError::UnknownUnit {
            lesson_id: lesson_id.to_string(),
            section_id: section_id.to_string(),
        })?;

    if lesson.completed {
        return Ok(CompletionOutcome::AlreadyCompleted);
    }
    lesson.completed = true;
    lesson.completed_at = Some(now);
    lesson.actual_duration = Some(actual_duration.unwrap_or(lesson.estimated_duration));
    Ok(CompletionOutcome::Recorded)
}

pub fn is_completed(lessons: &[ScheduledLesson], lesson_id: &str, section_id: &str) -> bool {
    lessons
        .iter()
        .any(|l| l.matches(lesson_id, section_id) && l.completed)
}

/// Incomplete units whose date is before `today`.
pub fn overdue_units(lessons: &[ScheduledLesson], today: NaiveDate) -> Vec<&ScheduledLesson> {
    lessons.iter().filter(|l| l.is_overdue(today)).collect()
}

/// Status of a lesson across all of its sections, `None` if it is not scheduled.
pub fn lesson_status(lessons: &[ScheduledLesson], lesson_id: &str) -> Option<LessonStatus> {
    let mut total = 0;
    let mut done = 0;
    for lesson in lessons.iter().filter(|l| l.lesson_id() == lesson_id) {
        total += 1;
        if lesson.completed {
            done += 1;
        }
    }
    (total > 0).then(|| status_of(done, total))
}

fn status_of(done: usize, total: usize) -> LessonStatus {
    if done == 0 {
        LessonStatus::Scheduled
    } else if done < total {
        LessonStatus::InProgress
    } else {
        LessonStatus::Completed
    }
}

pub fn summarize(lessons: &[ScheduledLesson], config: &ScheduleConfig, today: NaiveDate) -> ProgressSummary {
    let mut by_lesson: Vec<LessonProgress> = Vec::new();
    let mut ordered: Vec<&ScheduledLesson> = lessons.iter().collect();
    ordered.sort_by_key(|l| l.order_index);

    for lesson in &ordered {
        let entry = match by_lesson.iter_mut().find(|p| p.lesson_id == lesson.lesson_id()) {
            Some(entry) => entry,
            None => {
                by_lesson.push(LessonProgress {
                    course_id: lesson.course_id().to_string(),
                    lesson_id: lesson.lesson_id().to_string(),
                    status: LessonStatus::Scheduled,
                    completed_sections: 0,
                    total_sections: 0,
                });
                let last = by_lesson.len() - 1;
                &mut by_lesson[last]
            }
        };
        entry.total_sections += 1;
        if lesson.completed {
            entry.completed_sections += 1;
        }
    }
    for entry in &mut by_lesson {
        entry.status = status_of(entry.completed_sections, entry.total_sections);
    }

    let completed: Vec<&ScheduledLesson> = lessons.iter().filter(|l| l.completed).collect();
    let total_units = lessons.len();
    let completion_percentage = if total_units == 0 {
        0.0
    } else {
        (completed.len() as f64 / total_units as f64 * 1000.0).round() / 10.0
    };
    let next_study_date = lessons
        .iter()
        .filter(|l| !l.completed)
        .map(|l| l.scheduled_date)
        .filter(|d| *d >= today)
        .min()
        .or_else(|| {
            // Everything pending is overdue: the next study day is where it will land.
            lessons
                .iter()
                .any(|l| !l.completed)
                .then(|| StudyCalendar::from_config(config).next_study_day(today.max(config.start_date)))
                .flatten()
        });

    ProgressSummary {
        total_units,
        completed_units: completed.len(),
        overdue_units: overdue_units(lessons, today).len(),
        planned_minutes: lessons.iter().map(|l| l.planned_minutes).sum(),
        completed_minutes: completed.iter().filter_map(|l| l.actual_duration).sum(),
        completion_percentage,
        next_study_date,
        lessons: by_lesson,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::packer::pack;
    use crate::testing::{config, date, monday, units};

    fn schedule_lessons() -> Vec<ScheduledLesson> {
        let mut input = units(4, 30);
        // Two sections of the same lesson.
        input[1].lesson = input[0].lesson.clone();
        pack(&input, &config(5, 1.0, 2.0, monday()), monday())
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn completion_records_time_and_duration() {
        let mut lessons = schedule_lessons();
        let outcome = mark_completed(&mut lessons, "lesson-2", "section-2", Some(40), at(10)).unwrap();

        assert_eq!(outcome, CompletionOutcome::Recorded);
        assert!(is_completed(&lessons, "lesson-2", "section-2"));
        let done = lessons.iter().find(|l| l.section_id == "section-2").unwrap();
        assert_eq!(done.completed_at, Some(at(10)));
        assert_eq!(done.actual_duration, Some(40));
    }

    #[test]
    fn missing_actual_duration_falls_back_to_estimate() {
        let mut lessons = schedule_lessons();
        mark_completed(&mut lessons, "lesson-3", "section-3", None, at(10)).unwrap();
        let done = lessons.iter().find(|l| l.section_id == "section-3").unwrap();
        assert_eq!(done.actual_duration, Some(30));
    }

    #[test]
    fn repeat_completion_keeps_the_first_write() {
        let mut lessons = schedule_lessons();
        mark_completed(&mut lessons, "lesson-2", "section-2", Some(40), at(10)).unwrap();
        let before = lessons.clone();

        let outcome = mark_completed(&mut lessons, "lesson-2", "section-2", Some(99), at(12)).unwrap();

        assert_eq!(outcome, CompletionOutcome::AlreadyCompleted);
        assert_eq!(lessons, before);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let mut lessons = schedule_lessons();
        let err = mark_completed(&mut lessons, "lesson-9", "section-0", None, at(10)).unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownUnit { .. }));
    }

    #[test]
    fn zero_actual_duration_is_rejected() {
        let mut lessons = schedule_lessons();
        let err = mark_completed(&mut lessons, "lesson-2", "section-2", Some(0), at(10)).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRequest(_)));
        assert!(!is_completed(&lessons, "lesson-2", "section-2"));
    }

    #[test]
    fn lesson_status_follows_its_sections() {
        let mut lessons = schedule_lessons();
        assert_eq!(lesson_status(&lessons, "lesson-0"), Some(LessonStatus::Scheduled));

        mark_completed(&mut lessons, "lesson-0", "section-0", None, at(10)).unwrap();
        assert_eq!(lesson_status(&lessons, "lesson-0"), Some(LessonStatus::InProgress));

        mark_completed(&mut lessons, "lesson-0", "section-1", None, at(11)).unwrap();
        assert_eq!(lesson_status(&lessons, "lesson-0"), Some(LessonStatus::Completed));
        assert_eq!(lesson_status(&lessons, "nope"), None);
    }

    #[test]
    fn overdue_units_are_past_and_incomplete() {
        let cfg = config(5, 0.0, 0.5, monday());
        let mut lessons = pack(&units(3, 30), &cfg, monday());
        mark_completed(&mut lessons, "lesson-0", "section-0", None, at(10)).unwrap();

        let overdue = overdue_units(&lessons, date(2024, 1, 3));
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].section_id, "section-1");
    }

    #[test]
    fn summary_counts_units_minutes_and_lessons() {
        let cfg = config(5, 0.0, 0.5, monday());
        let mut lessons = pack(&units(4, 30), &cfg, monday());
        mark_completed(&mut lessons, "lesson-0", "section-0", Some(25), at(10)).unwrap();

        let summary = summarize(&lessons, &cfg, date(2024, 1, 3));
        assert_eq!(summary.total_units, 4);
        assert_eq!(summary.completed_units, 1);
        assert_eq!(summary.overdue_units, 1);
        assert_eq!(summary.planned_minutes, 120);
        assert_eq!(summary.completed_minutes, 25);
        assert_eq!(summary.completion_percentage, 25.0);
        assert_eq!(summary.next_study_date, Some(date(2024, 1, 3)));
        assert_eq!(summary.lessons.len(), 4);
        assert_eq!(summary.lessons[0].status, LessonStatus::Completed);
    }
}
