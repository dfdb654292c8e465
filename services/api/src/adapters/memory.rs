//! services/api/src/adapters/memory.rs
//!
//! In-process implementations of the planner ports, backed by `RwLock`ed
//! maps. The integration tests drive the full router against these.

use std::collections::HashMap;

use async_trait::async_trait;
use study_planner_core::domain::{LearningSchedule, RoadmapOutline};
use study_planner_core::ports::{
    AuthService, CurriculumService, PortError, PortResult, ScheduleStore,
};
use tokio::sync::RwLock;
use uuid::Uuid;

//=========================================================================================
// Schedules
//=========================================================================================

#[derive(Default)]
pub struct MemoryScheduleStore {
    schedules: RwLock<HashMap<Uuid, LearningSchedule>>,
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn find_by_user(&self, user_id: Uuid) -> PortResult<Option<LearningSchedule>> {
        Ok(self.schedules.read().await.get(&user_id).cloned())
    }

    async fn insert(&self, schedule: &LearningSchedule) -> PortResult<i64> {
        let mut schedules = self.schedules.write().await;
        if schedules.contains_key(&schedule.user_id) {
            return Err(PortError::Conflict(format!(
                "User {} already has a schedule",
                schedule.user_id
            )));
        }
        let mut stored = schedule.clone();
        stored.version = 1;
        schedules.insert(schedule.user_id, stored);
        Ok(1)
    }

    async fn update(&self, schedule: &LearningSchedule) -> PortResult<i64> {
        let mut schedules = self.schedules.write().await;
        let current = schedules
            .get_mut(&schedule.user_id)
            .ok_or_else(|| PortError::NotFound(format!("Schedule for user {}", schedule.user_id)))?;
        if current.version != schedule.version {
            return Err(PortError::Conflict(format!(
                "Schedule for user {} changed since version {}",
                schedule.user_id, schedule.version
            )));
        }
        let version = schedule.version + 1;
        *current = LearningSchedule {
            version,
            ..schedule.clone()
        };
        Ok(version)
    }

    async fn delete(&self, user_id: Uuid) -> PortResult<bool> {
        Ok(self.schedules.write().await.remove(&user_id).is_some())
    }
}

//=========================================================================================
// Curriculum
//=========================================================================================

#[derive(Default)]
pub struct MemoryCurriculum {
    roadmaps: RwLock<HashMap<String, RoadmapOutline>>,
}

impl MemoryCurriculum {
    pub async fn insert_roadmap(&self, roadmap: RoadmapOutline) {
        self.roadmaps.write().await.insert(roadmap.id.clone(), roadmap);
    }
}

#[async_trait]
impl CurriculumService for MemoryCurriculum {
    async fn load_roadmap(&self, roadmap_id: &str) -> PortResult<RoadmapOutline> {
        self.roadmaps
            .read()
            .await
            .get(roadmap_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Roadmap {} not found", roadmap_id)))
    }
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Default)]
pub struct MemoryAuth {
    tokens: RwLock<HashMap<String, Uuid>>,
}

impl MemoryAuth {
    /// Registers a fresh bearer token for `user_id` and returns it.
    pub async fn issue_token(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone(), user_id);
        token
    }
}

#[async_trait]
impl AuthService for MemoryAuth {
    async fn validate_token(&self, token: &str) -> PortResult<Uuid> {
        self.tokens
            .read()
            .await
            .get(token)
            .copied()
            .ok_or(PortError::Unauthorized)
    }
}
