//! services/api/src/web/schedules.rs
//!
//! Axum handlers for the `/schedules` endpoints. Every handler runs behind
//! `require_auth`, which places the caller's `Uuid` in the request extensions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use study_planner_core::CompletionOutcome;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::protocol::{
    ApiResponse, CompleteLessonRequest, CreateScheduleRequest, ProgressView, RescheduleQuery,
    ScheduleQuery, ScheduleView, UpdateConfigRequest,
};
use crate::web::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Build a schedule from the given roadmaps and weekly budget.
#[utoipa::path(
    post,
    path = "/schedules",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Schedule created", body = ScheduleView),
        (status = 400, description = "Invalid schedule configuration"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 409, description = "The caller already has a schedule")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn create_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    payload: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?.into_new_schedule(state.clock.today())?;
    let schedule = state.schedules.create_schedule(user_id, request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            ScheduleView::from_domain(&schedule, true),
            "Learning schedule created",
        ),
    ))
}

/// Fetch the caller's schedule.
#[utoipa::path(
    get,
    path = "/schedules/my-schedule",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "The caller's schedule", body = ScheduleView),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "The caller has no schedule yet")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn my_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    query: Result<Query<ScheduleQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params(query)?;
    let schedule = state.schedules.get_schedule(user_id).await?;
    let populate = query.populate.unwrap_or(true);
    Ok(ApiResponse::ok(
        ScheduleView::from_domain(&schedule, populate),
        "Learning schedule retrieved",
    ))
}

/// Completion totals and per-lesson status for the caller's schedule.
#[utoipa::path(
    get,
    path = "/schedules/progress",
    responses(
        (status = 200, description = "Progress summary", body = ProgressView),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "The caller has no schedule yet")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.schedules.progress(user_id).await?;
    Ok(ApiResponse::ok(ProgressView::from(&summary), "Progress retrieved"))
}

/// Mark one section as studied. Repeating the call is a no-op.
#[utoipa::path(
    patch,
    path = "/schedules/complete-lesson",
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, description = "Updated schedule", body = ScheduleView),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "The caller has no schedule yet"),
        (status = 422, description = "The lesson/section pair is not in the schedule")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn complete_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    payload: Result<Json<CompleteLessonRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let (schedule, outcome) = state
        .schedules
        .complete_lesson(
            user_id,
            &request.lesson_id,
            &request.section_id,
            request.actual_duration,
        )
        .await?;
    let message = match outcome {
        CompletionOutcome::Recorded => "Lesson marked as completed",
        CompletionOutcome::AlreadyCompleted => "Lesson was already completed",
    };
    Ok(ApiResponse::ok(
        ScheduleView::from_domain(&schedule, true),
        message,
    ))
}

/// Partially update the schedule settings. Capacity changes repack future units.
#[utoipa::path(
    put,
    path = "/schedules/config",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Updated schedule", body = ScheduleView),
        (status = 400, description = "The merged configuration is invalid"),
        (status = 404, description = "The caller has no schedule yet")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn update_config_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    payload: Result<Json<UpdateConfigRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = body(payload)?.into();
    let (schedule, report) = state.schedules.update_config(user_id, patch).await?;
    Ok(ApiResponse::ok(
        ScheduleView::from_domain(&schedule, true).with_report(report.as_ref()),
        "Schedule configuration updated",
    ))
}

/// Repack every incomplete unit from today. `?trigger=daily` only repacks
/// when auto-reschedule is on and something is overdue.
#[utoipa::path(
    post,
    path = "/schedules/reschedule",
    params(RescheduleQuery),
    responses(
        (status = 200, description = "Updated schedule", body = ScheduleView),
        (status = 404, description = "The caller has no schedule yet")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn reschedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    query: Result<Query<RescheduleQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params(query)?;
    let trigger = query.trigger.unwrap_or_default().into();
    let (schedule, report) = state.schedules.reschedule(user_id, trigger).await?;
    info!(
        %user_id,
        moved = report.moved,
        skipped = report.skipped,
        "Reschedule handled"
    );
    let message = if report.skipped {
        "Schedule is up to date"
    } else {
        "Schedule rescheduled"
    };
    Ok(ApiResponse::ok(
        ScheduleView::from_domain(&schedule, true).with_report(Some(&report)),
        message,
    ))
}

/// Hard-delete the caller's schedule.
#[utoipa::path(
    delete,
    path = "/schedules",
    responses(
        (status = 200, description = "Schedule deleted"),
        (status = 404, description = "The caller has no schedule yet")
    ),
    security(("bearer" = [])),
    tag = "schedules"
)]
pub async fn delete_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.schedules.delete_schedule(user_id).await?;
    Ok(ApiResponse::<()>::ok((), "Learning schedule deleted"))
}
