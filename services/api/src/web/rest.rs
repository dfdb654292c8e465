//! services/api/src/web/rest.rs
//!
//! Contains the health handler and the master OpenAPI document.

use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::web::protocol::{
    ApiResponse, CompleteLessonRequest, CreateScheduleRequest, LessonProgressView,
    LessonStatusView, PopulatedRef, ProgressView, ReferenceView, RescheduleReportView,
    ScheduleConfigPayload, ScheduleConfigView, ScheduleView, ScheduledLessonView, TriggerParam,
    UpdateConfigRequest,
};
use crate::web::schedules;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        schedules::create_schedule_handler,
        schedules::my_schedule_handler,
        schedules::progress_handler,
        schedules::complete_lesson_handler,
        schedules::update_config_handler,
        schedules::reschedule_handler,
        schedules::delete_schedule_handler,
    ),
    components(
        schemas(
            HealthResponse,
            CreateScheduleRequest,
            ScheduleConfigPayload,
            CompleteLessonRequest,
            UpdateConfigRequest,
            TriggerParam,
            ScheduleView,
            ScheduleConfigView,
            ScheduledLessonView,
            ReferenceView,
            PopulatedRef,
            RescheduleReportView,
            ProgressView,
            LessonProgressView,
            LessonStatusView,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "schedules", description = "Adaptive study schedules built from enrolled roadmaps."),
        (name = "health", description = "Liveness probe.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme the schedule paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Unauthenticated liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_handler() -> impl IntoResponse {
    ApiResponse::ok(
        HealthResponse {
            status: "ok".to_string(),
        },
        "Service is healthy",
    )
}
