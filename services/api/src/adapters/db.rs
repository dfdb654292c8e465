//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `ScheduleStore`, `CurriculumService` and `AuthService` ports from the core
//! crate. It handles all interactions with the PostgreSQL database using `sqlx`.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use study_planner_core::domain::{
    CourseOutline, CourseSummary, LearningSchedule, LessonOutline, LessonSummary, Reference,
    RoadmapOutline, ScheduleConfig, ScheduledLesson, SectionOutline,
};
use study_planner_core::ports::{
    AuthService, CurriculumService, PortError, PortResult, ScheduleStore,
};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the planner's persistence ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct RoadmapRecord {
    id: String,
    title: String,
}

#[derive(FromRow)]
struct CourseRecord {
    id: String,
    title: String,
    position: i32,
}

#[derive(FromRow)]
struct LessonRecord {
    id: String,
    course_id: String,
    title: String,
    sort_order: i32,
    skill: Option<String>,
}

#[derive(FromRow)]
struct SectionRecord {
    id: String,
    lesson_id: String,
    title: String,
    sort_order: i32,
    duration_minutes: Option<i32>,
    skill: Option<String>,
}

/// A catalogue reference as stored inside the lessons JSON column.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ReferenceRecord {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        title: String,
    },
}

impl ReferenceRecord {
    fn from_course(r: &Reference<CourseSummary>) -> Self {
        match r {
            Reference::Id(id) => Self::Id(id.clone()),
            Reference::Populated(c) => Self::Populated {
                id: c.id.clone(),
                title: c.title.clone(),
            },
        }
    }

    fn from_lesson(r: &Reference<LessonSummary>) -> Self {
        match r {
            Reference::Id(id) => Self::Id(id.clone()),
            Reference::Populated(l) => Self::Populated {
                id: l.id.clone(),
                title: l.title.clone(),
            },
        }
    }

    fn into_course(self) -> Reference<CourseSummary> {
        match self {
            Self::Id(id) => Reference::Id(id),
            Self::Populated { id, title } => Reference::Populated(CourseSummary { id, title }),
        }
    }

    fn into_lesson(self) -> Reference<LessonSummary> {
        match self {
            Self::Id(id) => Reference::Id(id),
            Self::Populated { id, title } => Reference::Populated(LessonSummary { id, title }),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ConfigRecord {
    days_per_week: u8,
    min_hours_per_day: f64,
    max_hours_per_day: f64,
    start_date: NaiveDate,
    focus_skills: BTreeSet<String>,
    include_weekends: bool,
    #[serde(default)]
    weekends_choice: Option<bool>,
}

impl ConfigRecord {
    fn from_domain(c: &ScheduleConfig) -> Self {
        Self {
            days_per_week: c.days_per_week,
            min_hours_per_day: c.min_hours_per_day,
            max_hours_per_day: c.max_hours_per_day,
            start_date: c.start_date,
            focus_skills: c.focus_skills.clone(),
            include_weekends: c.include_weekends,
            weekends_choice: c.weekends_choice,
        }
    }

    fn to_domain(self) -> ScheduleConfig {
        ScheduleConfig {
            days_per_week: self.days_per_week,
            min_hours_per_day: self.min_hours_per_day,
            max_hours_per_day: self.max_hours_per_day,
            start_date: self.start_date,
            focus_skills: self.focus_skills,
            include_weekends: self.include_weekends,
            weekends_choice: self.weekends_choice,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ScheduledLessonRecord {
    course_id: ReferenceRecord,
    lesson_id: ReferenceRecord,
    section_id: String,
    skill: Option<String>,
    order_index: u32,
    scheduled_date: NaiveDate,
    estimated_duration: u32,
    planned_minutes: u32,
    order_in_day: u32,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    actual_duration: Option<u32>,
}

impl ScheduledLessonRecord {
    fn from_domain(l: &ScheduledLesson) -> Self {
        Self {
            course_id: ReferenceRecord::from_course(&l.course),
            lesson_id: ReferenceRecord::from_lesson(&l.lesson),
            section_id: l.section_id.clone(),
            skill: l.skill.clone(),
            order_index: l.order_index,
            scheduled_date: l.scheduled_date,
            estimated_duration: l.estimated_duration,
            planned_minutes: l.planned_minutes,
            order_in_day: l.order_in_day,
            completed: l.completed,
            completed_at: l.completed_at,
            actual_duration: l.actual_duration,
        }
    }

    fn to_domain(self) -> ScheduledLesson {
        ScheduledLesson {
            course: self.course_id.into_course(),
            lesson: self.lesson_id.into_lesson(),
            section_id: self.section_id,
            skill: self.skill,
            order_index: self.order_index,
            scheduled_date: self.scheduled_date,
            estimated_duration: self.estimated_duration,
            planned_minutes: self.planned_minutes,
            order_in_day: self.order_in_day,
            completed: self.completed,
            completed_at: self.completed_at,
            actual_duration: self.actual_duration,
        }
    }
}

#[derive(FromRow)]
struct ScheduleRecord {
    id: Uuid,
    user_id: Uuid,
    roadmap_ids: Vec<String>,
    config: Json<ConfigRecord>,
    scheduled_lessons: Json<Vec<ScheduledLessonRecord>>,
    auto_reschedule: bool,
    last_rescheduled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl ScheduleRecord {
    fn to_domain(self) -> LearningSchedule {
        LearningSchedule {
            id: self.id,
            user_id: self.user_id,
            roadmap_ids: self.roadmap_ids,
            config: self.config.0.to_domain(),
            scheduled_lessons: self
                .scheduled_lessons
                .0
                .into_iter()
                .map(ScheduledLessonRecord::to_domain)
                .collect(),
            auto_reschedule: self.auto_reschedule,
            last_rescheduled_at: self.last_rescheduled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

fn lesson_records(schedule: &LearningSchedule) -> Json<Vec<ScheduledLessonRecord>> {
    Json(
        schedule
            .scheduled_lessons
            .iter()
            .map(ScheduledLessonRecord::from_domain)
            .collect(),
    )
}

fn non_negative(value: i32) -> u32 {
    value.max(0) as u32
}

//=========================================================================================
// `ScheduleStore` Trait Implementation
//=========================================================================================

const SCHEDULE_COLUMNS: &str = "id, user_id, roadmap_ids, config, scheduled_lessons, auto_reschedule, \
     last_rescheduled_at, created_at, updated_at, version";

#[async_trait]
impl ScheduleStore for DbAdapter {
    async fn find_by_user(&self, user_id: Uuid) -> PortResult<Option<LearningSchedule>> {
        let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM learning_schedules WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ScheduleRecord::to_domain))
    }

    async fn insert(&self, schedule: &LearningSchedule) -> PortResult<i64> {
        let result = sqlx::query(
            "INSERT INTO learning_schedules \
             (id, user_id, roadmap_ids, config, scheduled_lessons, auto_reschedule, \
              last_rescheduled_at, created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(schedule.id)
        .bind(schedule.user_id)
        .bind(&schedule.roadmap_ids)
        .bind(Json(ConfigRecord::from_domain(&schedule.config)))
        .bind(lesson_records(schedule))
        .bind(schedule.auto_reschedule)
        .bind(schedule.last_rescheduled_at)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::Conflict(format!(
                "User {} already has a schedule",
                schedule.user_id
            )));
        }
        Ok(1)
    }

    async fn update(&self, schedule: &LearningSchedule) -> PortResult<i64> {
        let version: Option<i64> = sqlx::query_scalar(
            "UPDATE learning_schedules SET \
             roadmap_ids = $2, config = $3, scheduled_lessons = $4, auto_reschedule = $5, \
             last_rescheduled_at = $6, updated_at = $7, version = version + 1 \
             WHERE user_id = $1 AND version = $8 \
             RETURNING version",
        )
        .bind(schedule.user_id)
        .bind(&schedule.roadmap_ids)
        .bind(Json(ConfigRecord::from_domain(&schedule.config)))
        .bind(lesson_records(schedule))
        .bind(schedule.auto_reschedule)
        .bind(schedule.last_rescheduled_at)
        .bind(schedule.updated_at)
        .bind(schedule.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        version.ok_or_else(|| {
            PortError::Conflict(format!(
                "Schedule for user {} changed since version {}",
                schedule.user_id, schedule.version
            ))
        })
    }

    async fn delete(&self, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM learning_schedules WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

//=========================================================================================
// `CurriculumService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CurriculumService for DbAdapter {
    async fn load_roadmap(&self, roadmap_id: &str) -> PortResult<RoadmapOutline> {
        let roadmap = sqlx::query_as::<_, RoadmapRecord>("SELECT id, title FROM roadmaps WHERE id = $1")
            .bind(roadmap_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Roadmap {} not found", roadmap_id)))?;

        let courses = sqlx::query_as::<_, CourseRecord>(
            "SELECT c.id, c.title, rc.position FROM roadmap_courses rc \
             JOIN courses c ON c.id = rc.course_id \
             WHERE rc.roadmap_id = $1",
        )
        .bind(roadmap_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let lessons = sqlx::query_as::<_, LessonRecord>(
            "SELECT l.id, l.course_id, l.title, l.sort_order, l.skill FROM lessons l \
             JOIN roadmap_courses rc ON rc.course_id = l.course_id \
             WHERE rc.roadmap_id = $1",
        )
        .bind(roadmap_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let sections = sqlx::query_as::<_, SectionRecord>(
            "SELECT s.id, s.lesson_id, s.title, s.sort_order, s.duration_minutes, s.skill \
             FROM sections s \
             JOIN lessons l ON l.id = s.lesson_id \
             JOIN roadmap_courses rc ON rc.course_id = l.course_id \
             WHERE rc.roadmap_id = $1",
        )
        .bind(roadmap_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut sections_by_lesson: HashMap<String, Vec<SectionOutline>> = HashMap::new();
        for s in sections {
            sections_by_lesson
                .entry(s.lesson_id)
                .or_default()
                .push(SectionOutline {
                    id: s.id,
                    title: s.title,
                    order: non_negative(s.sort_order),
                    duration_minutes: s.duration_minutes.map(non_negative),
                    skill: s.skill,
                });
        }

        let mut lessons_by_course: HashMap<String, Vec<LessonOutline>> = HashMap::new();
        for l in lessons {
            let sections = sections_by_lesson.remove(&l.id).unwrap_or_default();
            lessons_by_course
                .entry(l.course_id)
                .or_default()
                .push(LessonOutline {
                    id: l.id,
                    title: l.title,
                    order: non_negative(l.sort_order),
                    skill: l.skill,
                    sections,
                });
        }

        let courses = courses
            .into_iter()
            .map(|c| CourseOutline {
                lessons: lessons_by_course.remove(&c.id).unwrap_or_default(),
                id: c.id,
                title: c.title,
                position: non_negative(c.position),
            })
            .collect();

        Ok(RoadmapOutline {
            id: roadmap.id,
            title: roadmap.title,
            courses,
        })
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for DbAdapter {
    async fn validate_token(&self, token: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }
}
