//! crates/study_planner_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the planner's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{LearningSchedule, RoadmapOutline};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A write collided with existing or concurrently modified data.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for the schedule aggregate, one active schedule per user.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> PortResult<Option<LearningSchedule>>;

    /// Stores a new schedule. Fails with `PortError::Conflict` if the user
    /// already has one. Returns the stored version.
    async fn insert(&self, schedule: &LearningSchedule) -> PortResult<i64>;

    /// Replaces the stored schedule if its version still equals
    /// `schedule.version`, otherwise fails with `PortError::Conflict`.
    /// Returns the new version.
    async fn update(&self, schedule: &LearningSchedule) -> PortResult<i64>;

    /// Returns whether a schedule was deleted.
    async fn delete(&self, user_id: Uuid) -> PortResult<bool>;
}

/// Read access to the course catalogue.
#[async_trait]
pub trait CurriculumService: Send + Sync {
    /// Loads a roadmap with its full course/lesson/section tree.
    /// Unknown roadmaps fail with `PortError::NotFound`.
    async fn load_roadmap(&self, roadmap_id: &str) -> PortResult<RoadmapOutline>;
}

/// Validates bearer tokens issued by the external auth service.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn validate_token(&self, token: &str) -> PortResult<Uuid>;
}

/// Source of "now" and of the calendar date the planner treats as today.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}
