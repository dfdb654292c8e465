//! Test fixtures shared by the core's unit tests.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    CourseOutline, LearningSchedule, LessonOutline, Reference, RoadmapOutline, ScheduleConfig,
    SectionOutline, StudyUnit,
};
use crate::ports::{Clock, CurriculumService, PortError, PortResult, ScheduleStore};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday, 2024-01-01.
pub fn monday() -> NaiveDate {
    date(2024, 1, 1)
}

pub fn config(days: u8, min_hours: f64, max_hours: f64, start: NaiveDate) -> ScheduleConfig {
    ScheduleConfig::new(days, min_hours, max_hours, start, BTreeSet::new(), None).unwrap()
}

/// `count` units of `minutes` each, one section per lesson, all in one course.
pub fn units(count: u32, minutes: u32) -> Vec<StudyUnit> {
    (0..count)
        .map(|i| StudyUnit {
            course: Reference::Id("course-1".to_string()),
            lesson: Reference::Id(format!("lesson-{i}")),
            section_id: format!("section-{i}"),
            skill: None,
            estimated_duration_minutes: minutes,
            order_index: i,
        })
        .collect()
}

pub fn section(id: &str, order: u32, minutes: Option<u32>) -> SectionOutline {
    SectionOutline {
        id: id.to_string(),
        title: format!("Section {id}"),
        order,
        duration_minutes: minutes,
        skill: None,
    }
}

pub fn lesson(id: &str, order: u32, sections: Vec<SectionOutline>) -> LessonOutline {
    LessonOutline {
        id: id.to_string(),
        title: format!("Lesson {id}"),
        order,
        skill: None,
        sections,
    }
}

pub fn course(id: &str, position: u32, lessons: Vec<LessonOutline>) -> CourseOutline {
    CourseOutline {
        id: id.to_string(),
        title: format!("Course {id}"),
        position,
        lessons,
    }
}

pub fn roadmap(id: &str, courses: Vec<CourseOutline>) -> RoadmapOutline {
    RoadmapOutline {
        id: id.to_string(),
        title: format!("Roadmap {id}"),
        courses,
    }
}

//=========================================================================================
// Fakes
//=========================================================================================

pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(day: NaiveDate) -> Self {
        Self {
            now: std::sync::Mutex::new(Utc.from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap())),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        *self.now.lock().unwrap() = Utc.from_utc_datetime(&day.and_hms_opt(9, 0, 0).unwrap());
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Default)]
pub struct FakeCurriculum {
    pub roadmaps: HashMap<String, RoadmapOutline>,
}

impl FakeCurriculum {
    pub fn with(roadmaps: Vec<RoadmapOutline>) -> Self {
        Self {
            roadmaps: roadmaps.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }
}

#[async_trait]
impl CurriculumService for FakeCurriculum {
    async fn load_roadmap(&self, roadmap_id: &str) -> PortResult<RoadmapOutline> {
        self.roadmaps
            .get(roadmap_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Roadmap {roadmap_id} not found")))
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub schedules: Mutex<HashMap<Uuid, LearningSchedule>>,
}

#[async_trait]
impl ScheduleStore for FakeStore {
    async fn find_by_user(&self, user_id: Uuid) -> PortResult<Option<LearningSchedule>> {
        Ok(self.schedules.lock().await.get(&user_id).cloned())
    }

    async fn insert(&self, schedule: &LearningSchedule) -> PortResult<i64> {
        let mut schedules = self.schedules.lock().await;
        if schedules.contains_key(&schedule.user_id) {
            return Err(PortError::Conflict("schedule exists".to_string()));
        }
        let mut stored = schedule.clone();
        stored.version = 1;
        schedules.insert(schedule.user_id, stored);
        Ok(1)
    }

    async fn update(&self, schedule: &LearningSchedule) -> PortResult<i64> {
        let mut schedules = self.schedules.lock().await;
        let current = schedules
            .get_mut(&schedule.user_id)
            .ok_or_else(|| PortError::NotFound("schedule".to_string()))?;
        if current.version != schedule.version {
            return Err(PortError::Conflict("stale version".to_string()));
        }
        *current = schedule.clone();
        current.version += 1;
        Ok(current.version)
    }

    async fn delete(&self, user_id: Uuid) -> PortResult<bool> {
        Ok(self.schedules.lock().await.remove(&user_id).is_some())
    }
}
