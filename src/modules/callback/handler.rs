use axum::{body::Bytes, extract::State, http::StatusCode};

use super::dto::{
    CallbackOutcome, JobProgressEvent, PackagingFailureEvent, PackagingSuccessEvent, decode_event,
};
use super::service::CallbackService;
use crate::common::error::AppError;
use crate::common::response::{ApiResponse, ApiSuccess};
use crate::state::AppState;

type CallbackResult = Result<ApiSuccess<ApiResponse<CallbackOutcome>>, AppError>;

/// Transcoder progress callback
#[utoipa::path(
    post,
    path = "/encoreCallback",
    request_body = JobProgressEvent,
    responses(
        (status = 200, description = "Event applied", body = ApiResponse<CallbackOutcome>),
        (status = 400, description = "Malformed event"),
        (status = 404, description = "Job has no external id"),
        (status = 500, description = "Store or transcoder failure, including unknown jobs")
    ),
    tag = "Callbacks"
)]
pub async fn encore_callback(State(state): State<AppState>, body: Bytes) -> CallbackResult {
    let event: JobProgressEvent = decode_event(&body)?;
    let outcome = CallbackService::handle_progress(&state, event).await?;
    Ok(ApiSuccess(
        ApiResponse::success(outcome, "Job progress handled"),
        StatusCode::OK,
    ))
}

/// Packaging finished
#[utoipa::path(
    post,
    path = "/packagerCallback/success",
    request_body = PackagingSuccessEvent,
    responses(
        (status = 200, description = "Packaged manifest stored", body = ApiResponse<CallbackOutcome>),
        (status = 400, description = "Malformed event"),
        (status = 404, description = "Job or external id could not be resolved"),
        (status = 500, description = "Store failure")
    ),
    tag = "Callbacks"
)]
pub async fn packaging_success(State(state): State<AppState>, body: Bytes) -> CallbackResult {
    let event: PackagingSuccessEvent = decode_event(&body)?;
    let outcome = CallbackService::handle_packaging_success(&state, event).await?;
    Ok(ApiSuccess(
        ApiResponse::success(outcome, "Packaging success handled"),
        StatusCode::OK,
    ))
}

/// Packaging failed
#[utoipa::path(
    post,
    path = "/packagerCallback/failure",
    request_body = PackagingFailureEvent,
    responses(
        (status = 200, description = "Record removed", body = ApiResponse<CallbackOutcome>),
        (status = 400, description = "Malformed event"),
        (status = 404, description = "Job or external id could not be resolved"),
        (status = 500, description = "Store failure")
    ),
    tag = "Callbacks"
)]
pub async fn packaging_failure(State(state): State<AppState>, body: Bytes) -> CallbackResult {
    let event: PackagingFailureEvent = decode_event(&body)?;
    let outcome = CallbackService::handle_packaging_failure(&state, event).await?;
    Ok(ApiSuccess(
        ApiResponse::success(outcome, "Packaging failure handled"),
        StatusCode::OK,
    ))
}
