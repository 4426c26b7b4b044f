// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, DoctorListQuery, DoctorSchedule};
use crate::services::availability::AvailabilityService;
use crate::services::doctor::DoctorService;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::InvalidSchedule(msg) => {
            AppError::Internal(format!("Stored schedule is invalid: {}", msg))
        }
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let (doctors, total) = service
        .list_doctors(&query, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "total": total,
        "count": doctors.len(),
        "doctors": doctors,
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service
        .get_doctor_by_id(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "success": true, "doctor": doctor })))
}

/// Replace a doctor's weekly schedule. Admins, or the doctor editing their
/// own profile.
#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(schedule): Json<DoctorSchedule>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);
    let token = auth.token();

    if !user.has_role("admin") {
        let doctor = service
            .get_doctor_by_id(doctor_id, token)
            .await
            .map_err(map_doctor_error)?;
        let is_own_profile = user.has_role("doctor") && doctor.user_id.to_string() == user.id;
        if !is_own_profile {
            return Err(AppError::Forbidden(
                "Not authorized to edit this doctor's schedule".to_string(),
            ));
        }
    }

    let doctor = service
        .update_schedule(doctor_id, schedule, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Schedule updated",
        "doctor": doctor,
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let availability = service
        .get_availability(doctor_id, query.date, auth.token())
        .await
        .map_err(map_doctor_error)?;

    let mut body = json!({ "success": true, "available": availability.available });
    if let Some(message) = availability.message {
        body["message"] = json!(message);
    }
    if let Some(slots) = availability.slots {
        body["slots"] = json!(slots);
    }

    Ok(Json(body))
}
