// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, CreateAppointmentRequest,
    UpdateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::PatientNotFound => {
            AppError::NotFound("No patient record for this user".to_string())
        }
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::ConflictDetected(conflicting) => AppError::Conflict {
            message: "The requested time overlaps an existing appointment".to_string(),
            conflicting: conflicting.and_then(|apt| serde_json::to_value(*apt).ok()),
        },
        AppointmentError::InvalidStatusTransition(from) => AppError::ValidationError(format!(
            "Status change not allowed from '{}'",
            from
        )),
        AppointmentError::AccessDenied => {
            AppError::Forbidden("Not authorized for this appointment".to_string())
        }
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// Patients only see and touch appointments on their own patient record.
/// Doctors only touch appointments assigned to them. Admins and
/// receptionists are unrestricted.
async fn ensure_can_access(
    service: &AppointmentBookingService,
    state: &AppConfig,
    user: &User,
    appointment: &Appointment,
    token: &str,
) -> Result<(), AppError> {
    if user.has_any_role(&["admin", "receptionist"]) {
        return Ok(());
    }

    if user.has_role("patient") {
        let patient = service
            .resolve_patient_for_user(user, token)
            .await
            .map_err(map_appointment_error)?;
        if patient.id == appointment.patient_id {
            return Ok(());
        }
    }

    if user.has_role("doctor") {
        let doctor_service = doctor_cell::services::doctor::DoctorService::new(state);
        if let Ok(doctor) = doctor_service
            .get_doctor_by_id(appointment.doctor_id, token)
            .await
        {
            if doctor.user_id.to_string() == user.id {
                return Ok(());
            }
        }
    }

    Err(AppError::Forbidden(
        "Not authorized for this appointment".to_string(),
    ))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if !user.has_any_role(&["admin", "receptionist", "patient"]) {
        return Err(AppError::Forbidden(
            "Not authorized to book appointments".to_string(),
        ));
    }

    let service = AppointmentBookingService::new(&state);
    let appointment = service
        .create_appointment(&user, request, auth.token())
        .await
        .map_err(map_appointment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment booked",
            "appointment": appointment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(mut query): Query<AppointmentListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let token = auth.token();

    // Patients and doctors only list their own records; the filter is
    // forced regardless of what the request asked for.
    if user.has_role("patient") {
        let patient = service
            .resolve_patient_for_user(&user, token)
            .await
            .map_err(map_appointment_error)?;
        query.patient_id = Some(patient.id);
    } else if user.has_role("doctor") {
        let doctor = doctor_cell::services::doctor::DoctorService::new(&state)
            .get_doctor_by_user_id(&user.id, token)
            .await
            .map_err(|e| match e {
                doctor_cell::DoctorError::NotFound => {
                    AppError::Forbidden("No doctor record for this user".to_string())
                }
                other => AppError::Database(other.to_string()),
            })?;
        query.doctor_id = Some(doctor.id);
    }

    let (appointments, total) = service
        .list_appointments(&query, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "total": total,
        "count": appointments.len(),
        "appointments": appointments,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let token = auth.token();

    let appointment = service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_appointment_error)?;

    ensure_can_access(&service, &state, &user, &appointment, token).await?;

    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let token = auth.token();

    let existing = service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_appointment_error)?;
    ensure_can_access(&service, &state, &user, &existing, token).await?;

    let appointment = service
        .update_appointment(appointment_id, request, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment updated",
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let token = auth.token();

    let existing = service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_appointment_error)?;
    ensure_can_access(&service, &state, &user, &existing, token).await?;

    let appointment = service
        .update_status(appointment_id, request, token)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment status updated",
        "appointment": appointment,
    })))
}
