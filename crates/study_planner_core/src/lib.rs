pub mod calendar;
pub mod domain;
pub mod error;
pub mod flatten;
pub mod packer;
pub mod ports;
pub mod progress;
pub mod rescheduler;
pub mod service;

#[cfg(test)]
mod testing;

pub use domain::{
    ConfigPatch, CourseSummary, Identified, LearningSchedule, LessonProgress, LessonStatus,
    LessonSummary, ProgressSummary, Reference, RoadmapOutline, ScheduleConfig, ScheduledLesson,
    StudyUnit,
};
pub use error::{ScheduleError, ScheduleResult};
pub use flatten::FlattenOptions;
pub use ports::{AuthService, Clock, CurriculumService, PortError, PortResult, ScheduleStore};
pub use progress::CompletionOutcome;
pub use rescheduler::{RescheduleReport, RescheduleTrigger};
pub use service::{NewSchedule, ScheduleService};
