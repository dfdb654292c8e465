//! crates/study_planner_core/src/domain.rs
//!
//! Defines the pure, core data structures for the study planner.
//! These structs are independent of any database or serialization format.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{ScheduleError, ScheduleResult};

/// Packing weight applied to units whose skill is one of the focus skills.
pub const FOCUS_SKILL_WEIGHT: f64 = 1.5;

//=========================================================================================
// References (bare id or populated summary)
//=========================================================================================

/// Anything that can be referred to by its catalogue id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A reference to a catalogue entity: either just its id, or the id together
/// with the display data captured when the schedule was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<T> {
    Id(String),
    Populated(T),
}

impl<T: Identified> Reference<T> {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Populated(value) => value.id(),
        }
    }

    /// Drops the populated data, keeping only the id.
    pub fn to_id(&self) -> Reference<T> {
        Reference::Id(self.id().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
}

impl Identified for CourseSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSummary {
    pub id: String,
    pub title: String,
}

impl Identified for LessonSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

//=========================================================================================
// Curriculum outline (as delivered by the content catalogue)
//=========================================================================================

/// A roadmap with its courses, lessons and sections, in catalogue order fields.
/// Children are not guaranteed to be sorted.
#[derive(Debug, Clone)]
pub struct RoadmapOutline {
    pub id: String,
    pub title: String,
    pub courses: Vec<CourseOutline>,
}

#[derive(Debug, Clone)]
pub struct CourseOutline {
    pub id: String,
    pub title: String,
    /// Position of the course inside its roadmap.
    pub position: u32,
    pub lessons: Vec<LessonOutline>,
}

#[derive(Debug, Clone)]
pub struct LessonOutline {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub skill: Option<String>,
    pub sections: Vec<SectionOutline>,
}

#[derive(Debug, Clone)]
pub struct SectionOutline {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub duration_minutes: Option<u32>,
    pub skill: Option<String>,
}

//=========================================================================================
// Study units and schedule configuration
//=========================================================================================

/// The atomic schedulable item: one section of one lesson of one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyUnit {
    pub course: Reference<CourseSummary>,
    pub lesson: Reference<LessonSummary>,
    pub section_id: String,
    pub skill: Option<String>,
    pub estimated_duration_minutes: u32,
    /// Strict total order over all units of a schedule.
    pub order_index: u32,
}

impl StudyUnit {
    pub fn course_id(&self) -> &str {
        self.course.id()
    }

    pub fn lesson_id(&self) -> &str {
        self.lesson.id()
    }
}

/// Capacity parameters used when packing units onto calendar days.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub days_per_week: u8,
    pub min_hours_per_day: f64,
    pub max_hours_per_day: f64,
    /// First day of the plan. Study weeks are 7-day windows anchored here.
    pub start_date: NaiveDate,
    pub focus_skills: BTreeSet<String>,
    /// Resolved weekend policy the calendar uses.
    pub include_weekends: bool,
    /// The weekend choice the user made, if any. `None` means the policy
    /// follows `days_per_week`.
    pub weekends_choice: Option<bool>,
}

impl ScheduleConfig {
    /// Builds and validates a config. When `include_weekends` is not given it
    /// defaults to whether `days_per_week` needs more than the five weekdays.
    pub fn new(
        days_per_week: u8,
        min_hours_per_day: f64,
        max_hours_per_day: f64,
        start_date: NaiveDate,
        focus_skills: BTreeSet<String>,
        include_weekends: Option<bool>,
    ) -> ScheduleResult<Self> {
        let config = Self {
            days_per_week,
            min_hours_per_day,
            max_hours_per_day,
            start_date,
            focus_skills,
            include_weekends: include_weekends.unwrap_or(days_per_week > 5),
            weekends_choice: include_weekends,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configs the packer cannot honour.
    pub fn validate(&self) -> ScheduleResult<()> {
        if !(1..=7).contains(&self.days_per_week) {
            return Err(ScheduleError::InvalidConfig(format!(
                "days_per_week must be between 1 and 7, got {}",
                self.days_per_week
            )));
        }
        if !self.min_hours_per_day.is_finite() || !self.max_hours_per_day.is_finite() {
            return Err(ScheduleError::InvalidConfig(
                "hours per day must be finite numbers".to_string(),
            ));
        }
        if self.min_hours_per_day < 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "min_hours_per_day must not be negative, got {}",
                self.min_hours_per_day
            )));
        }
        if self.max_hours_per_day <= 0.0 || self.max_hours_per_day > 24.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "max_hours_per_day must be in (0, 24], got {}",
                self.max_hours_per_day
            )));
        }
        if self.min_hours_per_day > self.max_hours_per_day {
            return Err(ScheduleError::InvalidConfig(format!(
                "min_hours_per_day ({}) exceeds max_hours_per_day ({})",
                self.min_hours_per_day, self.max_hours_per_day
            )));
        }
        if !self.include_weekends && self.days_per_week > 5 {
            return Err(ScheduleError::InvalidConfig(format!(
                "days_per_week of {} needs include_weekends",
                self.days_per_week
            )));
        }
        Ok(())
    }

    /// Daily capacity in whole minutes.
    pub fn capacity_minutes(&self) -> u32 {
        (self.max_hours_per_day * 60.0).round() as u32
    }

    /// Load a unit puts on its day: focus-skill units count heavier.
    pub fn planned_minutes(&self, estimated_minutes: u32, skill: Option<&str>) -> u32 {
        match skill {
            Some(skill) if self.focus_skills.contains(skill) => {
                (estimated_minutes as f64 * FOCUS_SKILL_WEIGHT).ceil() as u32
            }
            _ => estimated_minutes,
        }
    }
}

/// A partial update of the schedule settings. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub days_per_week: Option<u8>,
    pub min_hours_per_day: Option<f64>,
    pub max_hours_per_day: Option<f64>,
    pub include_weekends: Option<bool>,
    pub focus_skills: Option<BTreeSet<String>>,
    pub auto_reschedule: Option<bool>,
}

impl ConfigPatch {
    /// Whether the patch touches anything that affects packing.
    pub fn changes_capacity(&self) -> bool {
        self.days_per_week.is_some()
            || self.min_hours_per_day.is_some()
            || self.max_hours_per_day.is_some()
            || self.include_weekends.is_some()
            || self.focus_skills.is_some()
    }
}

//=========================================================================================
// Scheduled lessons and the schedule aggregate
//=========================================================================================

/// One packed study unit on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledLesson {
    pub course: Reference<CourseSummary>,
    pub lesson: Reference<LessonSummary>,
    pub section_id: String,
    pub skill: Option<String>,
    pub order_index: u32,
    pub scheduled_date: NaiveDate,
    pub estimated_duration: u32,
    /// Estimated duration after focus-skill weighting; what the packer counts.
    pub planned_minutes: u32,
    pub order_in_day: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_duration: Option<u32>,
}

impl ScheduledLesson {
    pub fn planned(unit: &StudyUnit, date: NaiveDate, planned_minutes: u32, order_in_day: u32) -> Self {
        Self {
            course: unit.course.clone(),
            lesson: unit.lesson.clone(),
            section_id: unit.section_id.clone(),
            skill: unit.skill.clone(),
            order_index: unit.order_index,
            scheduled_date: date,
            estimated_duration: unit.estimated_duration_minutes,
            planned_minutes,
            order_in_day,
            completed: false,
            completed_at: None,
            actual_duration: None,
        }
    }

    /// The immutable study unit behind this entry.
    pub fn to_unit(&self) -> StudyUnit {
        StudyUnit {
            course: self.course.clone(),
            lesson: self.lesson.clone(),
            section_id: self.section_id.clone(),
            skill: self.skill.clone(),
            estimated_duration_minutes: self.estimated_duration,
            order_index: self.order_index,
        }
    }

    pub fn course_id(&self) -> &str {
        self.course.id()
    }

    pub fn lesson_id(&self) -> &str {
        self.lesson.id()
    }

    pub fn matches(&self, lesson_id: &str, section_id: &str) -> bool {
        self.lesson_id() == lesson_id && self.section_id == section_id
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.scheduled_date < today
    }
}

/// The aggregate root: a user's single active learning schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningSchedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_ids: Vec<String>,
    pub config: ScheduleConfig,
    /// Ordered by `(scheduled_date, order_in_day)`.
    pub scheduled_lessons: Vec<ScheduledLesson>,
    pub auto_reschedule: bool,
    pub last_rescheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped by the store on every write.
    pub version: i64,
}

//=========================================================================================
// Progress
//=========================================================================================

/// Lesson lifecycle, derived from the completion state of its sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub course_id: String,
    pub lesson_id: String,
    pub status: LessonStatus,
    pub completed_sections: usize,
    pub total_sections: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub total_units: usize,
    pub completed_units: usize,
    pub overdue_units: usize,
    pub planned_minutes: u32,
    pub completed_minutes: u32,
    pub completion_percentage: f64,
    pub next_study_date: Option<NaiveDate>,
    pub lessons: Vec<LessonProgress>,
}
