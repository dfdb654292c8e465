//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use study_planner_core::ports::{AuthService, Clock};
use study_planner_core::ScheduleService;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub schedules: Arc<ScheduleService>,
    pub auth: Arc<dyn AuthService>,
    pub clock: Arc<dyn Clock>,
}
