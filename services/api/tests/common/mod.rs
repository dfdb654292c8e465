//! Shared harness for the HTTP integration tests: the full router wired to
//! the in-memory adapters and a clock the tests can move.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use api_lib::adapters::{MemoryAuth, MemoryCurriculum, MemoryScheduleStore};
use api_lib::web::{api_router, AppState};
use axum_test::TestServer;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use study_planner_core::domain::{
    CourseOutline, LessonOutline, RoadmapOutline, SectionOutline,
};
use study_planner_core::ports::Clock;
use study_planner_core::{FlattenOptions, ScheduleService};
use uuid::Uuid;

pub const ROADMAP_ID: &str = "toeic-600";

pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn at(day: NaiveDate) -> Self {
        Self {
            now: Mutex::new(noon(day)),
        }
    }

    pub fn set_today(&self, day: NaiveDate) {
        *self.now.lock().unwrap() = noon(day);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

fn noon(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2024-01-01 is a Monday.
pub fn monday() -> NaiveDate {
    date(2024, 1, 1)
}

/// One course, one lesson, ten 30-minute sections `s0..s9`.
pub fn roadmap() -> RoadmapOutline {
    let sections = (0..10)
        .map(|i| SectionOutline {
            id: format!("s{i}"),
            title: format!("Section {i}"),
            order: i,
            duration_minutes: Some(30),
            skill: None,
        })
        .collect();
    RoadmapOutline {
        id: ROADMAP_ID.to_string(),
        title: "TOEIC 600".to_string(),
        courses: vec![CourseOutline {
            id: "c1".to_string(),
            title: "Listening basics".to_string(),
            position: 0,
            lessons: vec![LessonOutline {
                id: "l1".to_string(),
                title: "Photographs".to_string(),
                order: 0,
                skill: Some("listening".to_string()),
                sections,
            }],
        }],
    }
}

/// Five weekdays, one to two hours a day, starting on `monday()`.
pub fn create_body() -> Value {
    json!({
        "roadmap_ids": [ROADMAP_ID],
        "schedule_config": {
            "days_per_week": 5,
            "min_hours_per_day": 1.0,
            "max_hours_per_day": 2.0,
            "start_date": "2024-01-01"
        }
    })
}

pub struct TestApp {
    pub server: TestServer,
    pub clock: Arc<TestClock>,
    pub auth: Arc<MemoryAuth>,
}

impl TestApp {
    pub async fn new() -> Self {
        let curriculum = Arc::new(MemoryCurriculum::default());
        curriculum.insert_roadmap(roadmap()).await;
        let clock = Arc::new(TestClock::at(monday()));
        let auth = Arc::new(MemoryAuth::default());

        let schedules = Arc::new(ScheduleService::new(
            Arc::new(MemoryScheduleStore::default()),
            curriculum,
            clock.clone(),
            FlattenOptions::default(),
        ));
        let state = Arc::new(AppState {
            schedules,
            auth: auth.clone(),
            clock: clock.clone(),
        });
        let server = TestServer::new(api_router(state)).unwrap();

        Self {
            server,
            clock,
            auth,
        }
    }

    pub async fn token(&self) -> String {
        self.auth.issue_token(Uuid::new_v4()).await
    }
}

/// `scheduled_date` of every lesson, in response order.
pub fn dates(data: &Value) -> Vec<String> {
    data["scheduled_lessons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["scheduled_date"].as_str().unwrap().to_string())
        .collect()
}

pub fn count_on(data: &Value, day: &str) -> usize {
    dates(data).iter().filter(|d| d.as_str() == day).count()
}
