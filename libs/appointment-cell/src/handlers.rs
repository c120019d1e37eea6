// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest,
};
use crate::repository::AppointmentFilter;
use crate::router::AppState;

const DEFAULT_PAGE_LIMIT: usize = 100;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct RescheduleQuery {
    pub new_slot_start: DateTime<Utc>,
    pub new_slot_end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let correlation_id = correlation_id(&headers);
    let idempotency_key = header_value(&headers, "idempotency-key");

    let appointment = state
        .lifecycle
        .book(request, &correlation_id, idempotency_key.as_deref())
        .await
        .map_err(map_appointment_error)?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    Query(query): Query<RescheduleQuery>,
    headers: HeaderMap,
) -> Result<Json<Appointment>, AppError> {
    let correlation_id = correlation_id(&headers);

    let appointment = state
        .lifecycle
        .reschedule(
            appointment_id,
            query.new_slot_start,
            query.new_slot_end,
            &correlation_id,
        )
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Appointment>, AppError> {
    let correlation_id = correlation_id(&headers);

    let appointment = state
        .lifecycle
        .cancel(appointment_id, &correlation_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Appointment>, AppError> {
    let correlation_id = correlation_id(&headers);

    let appointment = state
        .lifecycle
        .complete(appointment_id, &correlation_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Appointment>, AppError> {
    let correlation_id = correlation_id(&headers);

    let appointment = state
        .lifecycle
        .mark_no_show(appointment_id, &correlation_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .lifecycle
        .get(appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(appointment))
}

/// Returns an `{"items": [...], "total": n}` envelope rather than a bare
/// array: `total` is the match count before pagination, so clients can page
/// without a second counting request.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Value>, AppError> {
    let filter = AppointmentFilter {
        patient_id: params.patient_id,
        doctor_id: params.doctor_id,
        status: params.status,
    };
    let skip = params.skip.unwrap_or(0);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, DEFAULT_PAGE_LIMIT);

    let (items, total) = state
        .lifecycle
        .list(&filter, skip, limit)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "items": items,
        "total": total,
    })))
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn correlation_id(headers: &HeaderMap) -> String {
    header_value(headers, "x-correlation-id").unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound
        | AppointmentError::PatientNotFound
        | AppointmentError::DoctorNotFound => AppError::NotFound(e.to_string()),

        AppointmentError::InvalidSlot(_)
        | AppointmentError::DepartmentMismatch(_)
        | AppointmentError::InvalidStatusTransition(_) => AppError::BadRequest(e.to_string()),

        AppointmentError::DoctorConflict
        | AppointmentError::PatientConflict
        | AppointmentError::DailyCapReached
        | AppointmentError::MaxReschedulesReached(_)
        | AppointmentError::RescheduleCutoff(_) => AppError::Conflict(e.to_string()),

        AppointmentError::CollaboratorUnavailable(_) => AppError::ExternalService(e.to_string()),

        AppointmentError::StorageError(_) => AppError::Internal(e.to_string()),
    }
}
