//! services/api/src/web/protocol.rs
//!
//! Request and response payloads for the schedule REST API, and their
//! conversions from the core domain types.

use std::collections::BTreeSet;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use study_planner_core::{
    ConfigPatch, CourseSummary, LearningSchedule, LessonProgress, LessonStatus, LessonSummary,
    ProgressSummary, Reference, RescheduleReport, RescheduleTrigger, ScheduleConfig,
    ScheduledLesson,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Response Envelope
//=========================================================================================

/// Every response body: `{ success, data, message }`.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct ScheduleConfigPayload {
    pub days_per_week: u8,
    pub min_hours_per_day: f64,
    pub max_hours_per_day: f64,
    /// Defaults to today.
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub focus_skills: Vec<String>,
    /// Defaults to `days_per_week > 5`.
    pub include_weekends: Option<bool>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateScheduleRequest {
    pub roadmap_ids: Vec<String>,
    pub schedule_config: ScheduleConfigPayload,
    #[serde(default = "default_auto_reschedule")]
    pub auto_reschedule: bool,
}

fn default_auto_reschedule() -> bool {
    true
}

impl CreateScheduleRequest {
    pub fn into_new_schedule(
        self,
        today: NaiveDate,
    ) -> Result<study_planner_core::NewSchedule, study_planner_core::ScheduleError> {
        let c = self.schedule_config;
        let config = ScheduleConfig::new(
            c.days_per_week,
            c.min_hours_per_day,
            c.max_hours_per_day,
            c.start_date.unwrap_or(today),
            c.focus_skills.into_iter().collect(),
            c.include_weekends,
        )?;
        Ok(study_planner_core::NewSchedule {
            roadmap_ids: self.roadmap_ids,
            config,
            auto_reschedule: self.auto_reschedule,
        })
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CompleteLessonRequest {
    pub lesson_id: String,
    pub section_id: String,
    /// Minutes actually spent; defaults to the estimate.
    pub actual_duration: Option<u32>,
}

/// Partial settings update. Omitted fields keep their current value.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateConfigRequest {
    pub days_per_week: Option<u8>,
    pub min_hours_per_day: Option<f64>,
    pub max_hours_per_day: Option<f64>,
    pub include_weekends: Option<bool>,
    pub focus_skills: Option<Vec<String>>,
    pub auto_reschedule: Option<bool>,
}

impl From<UpdateConfigRequest> for ConfigPatch {
    fn from(req: UpdateConfigRequest) -> Self {
        ConfigPatch {
            days_per_week: req.days_per_week,
            min_hours_per_day: req.min_hours_per_day,
            max_hours_per_day: req.max_hours_per_day,
            include_weekends: req.include_weekends,
            focus_skills: req.focus_skills.map(|skills| skills.into_iter().collect::<BTreeSet<_>>()),
            auto_reschedule: req.auto_reschedule,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerParam {
    #[default]
    Manual,
    /// The once-a-day check the calendar runs on load.
    Daily,
}

impl From<TriggerParam> for RescheduleTrigger {
    fn from(param: TriggerParam) -> Self {
        match param {
            TriggerParam::Manual => RescheduleTrigger::Manual,
            TriggerParam::Daily => RescheduleTrigger::DailyCheck,
        }
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RescheduleQuery {
    pub trigger: Option<TriggerParam>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    /// Render course and lesson references as `{ _id, title }`. Defaults to true.
    pub populate: Option<bool>,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// A catalogue reference: a bare id string or a populated object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(untagged)]
pub enum ReferenceView {
    Id(String),
    Populated(PopulatedRef),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PopulatedRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
}

impl From<&Reference<CourseSummary>> for ReferenceView {
    fn from(reference: &Reference<CourseSummary>) -> Self {
        match reference {
            Reference::Id(id) => ReferenceView::Id(id.clone()),
            Reference::Populated(c) => ReferenceView::Populated(PopulatedRef {
                id: c.id.clone(),
                title: c.title.clone(),
            }),
        }
    }
}

impl From<&Reference<LessonSummary>> for ReferenceView {
    fn from(reference: &Reference<LessonSummary>) -> Self {
        match reference {
            Reference::Id(id) => ReferenceView::Id(id.clone()),
            Reference::Populated(l) => ReferenceView::Populated(PopulatedRef {
                id: l.id.clone(),
                title: l.title.clone(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ScheduleConfigView {
    pub days_per_week: u8,
    pub min_hours_per_day: f64,
    pub max_hours_per_day: f64,
    pub start_date: NaiveDate,
    pub focus_skills: Vec<String>,
    pub include_weekends: bool,
}

impl From<&ScheduleConfig> for ScheduleConfigView {
    fn from(c: &ScheduleConfig) -> Self {
        Self {
            days_per_week: c.days_per_week,
            min_hours_per_day: c.min_hours_per_day,
            max_hours_per_day: c.max_hours_per_day,
            start_date: c.start_date,
            focus_skills: c.focus_skills.iter().cloned().collect(),
            include_weekends: c.include_weekends,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ScheduledLessonView {
    pub course_id: ReferenceView,
    pub lesson_id: ReferenceView,
    pub section_id: String,
    pub skill: Option<String>,
    pub order_index: u32,
    pub scheduled_date: NaiveDate,
    pub estimated_duration: u32,
    pub planned_minutes: u32,
    pub order_in_day: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_duration: Option<u32>,
}

impl ScheduledLessonView {
    fn from_domain(lesson: &ScheduledLesson, populate: bool) -> Self {
        let (course, lesson_ref): (ReferenceView, ReferenceView) = if populate {
            ((&lesson.course).into(), (&lesson.lesson).into())
        } else {
            ((&lesson.course.to_id()).into(), (&lesson.lesson.to_id()).into())
        };
        Self {
            course_id: course,
            lesson_id: lesson_ref,
            section_id: lesson.section_id.clone(),
            skill: lesson.skill.clone(),
            order_index: lesson.order_index,
            scheduled_date: lesson.scheduled_date,
            estimated_duration: lesson.estimated_duration,
            planned_minutes: lesson.planned_minutes,
            order_in_day: lesson.order_in_day,
            completed: lesson.completed,
            completed_at: lesson.completed_at,
            actual_duration: lesson.actual_duration,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct RescheduleReportView {
    pub trigger: String,
    pub overdue: usize,
    pub moved: usize,
    pub changed: bool,
    pub skipped: bool,
}

impl From<&RescheduleReport> for RescheduleReportView {
    fn from(r: &RescheduleReport) -> Self {
        let trigger = match r.trigger {
            RescheduleTrigger::Manual => "manual",
            RescheduleTrigger::DailyCheck => "daily",
            RescheduleTrigger::ConfigChange => "config_change",
        };
        Self {
            trigger: trigger.to_string(),
            overdue: r.overdue,
            moved: r.moved,
            changed: r.changed,
            skipped: r.skipped,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ScheduleView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_ids: Vec<String>,
    pub schedule_config: ScheduleConfigView,
    pub scheduled_lessons: Vec<ScheduledLessonView>,
    pub auto_reschedule: bool,
    pub last_rescheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present on responses that ran a repack.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reschedule_report: Option<RescheduleReportView>,
}

impl ScheduleView {
    pub fn from_domain(schedule: &LearningSchedule, populate: bool) -> Self {
        Self {
            id: schedule.id,
            user_id: schedule.user_id,
            roadmap_ids: schedule.roadmap_ids.clone(),
            schedule_config: (&schedule.config).into(),
            scheduled_lessons: schedule
                .scheduled_lessons
                .iter()
                .map(|l| ScheduledLessonView::from_domain(l, populate))
                .collect(),
            auto_reschedule: schedule.auto_reschedule,
            last_rescheduled_at: schedule.last_rescheduled_at,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
            reschedule_report: None,
        }
    }

    pub fn with_report(mut self, report: Option<&RescheduleReport>) -> Self {
        self.reschedule_report = report.map(Into::into);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatusView {
    Scheduled,
    InProgress,
    Completed,
}

impl From<LessonStatus> for LessonStatusView {
    fn from(status: LessonStatus) -> Self {
        match status {
            LessonStatus::Scheduled => LessonStatusView::Scheduled,
            LessonStatus::InProgress => LessonStatusView::InProgress,
            LessonStatus::Completed => LessonStatusView::Completed,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct LessonProgressView {
    pub course_id: String,
    pub lesson_id: String,
    pub status: LessonStatusView,
    pub completed_sections: usize,
    pub total_sections: usize,
}

impl From<&LessonProgress> for LessonProgressView {
    fn from(p: &LessonProgress) -> Self {
        Self {
            course_id: p.course_id.clone(),
            lesson_id: p.lesson_id.clone(),
            status: p.status.into(),
            completed_sections: p.completed_sections,
            total_sections: p.total_sections,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ProgressView {
    pub total_units: usize,
    pub completed_units: usize,
    pub overdue_units: usize,
    pub planned_minutes: u32,
    pub completed_minutes: u32,
    pub completion_percentage: f64,
    pub next_study_date: Option<NaiveDate>,
    pub lessons: Vec<LessonProgressView>,
}

impl From<&ProgressSummary> for ProgressView {
    fn from(s: &ProgressSummary) -> Self {
        Self {
            total_units: s.total_units,
            completed_units: s.completed_units,
            overdue_units: s.overdue_units,
            planned_minutes: s.planned_minutes,
            completed_minutes: s.completed_minutes,
            completion_percentage: s.completion_percentage,
            next_study_date: s.next_study_date,
            lessons: s.lessons.iter().map(Into::into).collect(),
        }
    }
}
