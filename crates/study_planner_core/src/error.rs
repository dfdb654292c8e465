//! crates/study_planner_core/src/error.rs
//!
//! Error taxonomy for schedule operations.

use uuid::Uuid;

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// A schedule config that the packer cannot honour.
    #[error("Invalid schedule config: {0}")]
    InvalidConfig(String),

    /// Any other malformed request (e.g. no roadmaps, zero duration).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No active schedule for user {0}")]
    NoActiveSchedule(Uuid),

    #[error("User {0} already has an active schedule")]
    AlreadyExists(Uuid),

    #[error("Lesson {lesson_id} section {section_id} is not part of the schedule")]
    UnknownUnit {
        lesson_id: String,
        section_id: String,
    },

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
