// libs/appointment-cell/src/services/booking.rs
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::doctor::DoctorService;
use doctor_cell::DoctorError;
use shared_config::AppConfig;
use shared_database::postgrest::{PostgrestClient, StoreError};
use shared_models::auth::User;
use shared_utils::time::{is_within_day, parse_time};

use super::conflict::ConflictDetectionService;
use super::lifecycle::AppointmentLifecycleService;
use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, AppointmentType,
    CreateAppointmentRequest, PatientRef, UpdateAppointmentRequest, UpdateStatusRequest,
};

pub struct AppointmentBookingService {
    store: Arc<PostgrestClient>,
    conflicts: ConflictDetectionService,
    lifecycle: AppointmentLifecycleService,
    doctors: DoctorService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(PostgrestClient::new(config));
        Self {
            conflicts: ConflictDetectionService::new(Arc::clone(&store)),
            lifecycle: AppointmentLifecycleService::new(),
            doctors: DoctorService::new(config),
            store,
        }
    }

    /// Book a new appointment.
    ///
    /// Validates the request, resolves the patient (patients book for their
    /// own record; staff must name one), verifies the doctor exists, runs the
    /// conflict scan and inserts. The insert itself can still trip the
    /// store's uniqueness constraint on `(doctor, date, slot)` when two
    /// bookings race; that surfaces as a conflict too, with no loser row
    /// written.
    pub async fn create_appointment(
        &self,
        user: &User,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut missing = Vec::new();
        if request.doctor_id.is_none() {
            missing.push("doctor_id");
        }
        if request.appointment_date.is_none() {
            missing.push("appointment_date");
        }
        if request.appointment_time.is_none() {
            missing.push("appointment_time");
        }
        if !user.has_role("patient") && request.patient_id.is_none() {
            missing.push("patient_id");
        }
        if !missing.is_empty() {
            return Err(AppointmentError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let doctor_id = request.doctor_id.unwrap();
        let date = request.appointment_date.unwrap();
        let time = request.appointment_time.unwrap();
        let duration = request.duration.unwrap_or(30);

        let start = parse_time(&time)
            .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;
        if !is_within_day(start) {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment time '{}' is outside the day",
                time
            )));
        }
        if duration <= 0 {
            return Err(AppointmentError::ValidationError(
                "Appointment duration must be positive".to_string(),
            ));
        }

        // Patients always book onto their own record; a patient_id in the
        // body must name it. Staff name the patient explicitly.
        let patient_id = if user.has_role("patient") {
            let own = self.resolve_patient_for_user(user, auth_token).await?;
            match request.patient_id {
                Some(id) if id != own.id => return Err(AppointmentError::AccessDenied),
                _ => own.id,
            }
        } else {
            request.patient_id.unwrap()
        };

        self.doctors
            .get_doctor_by_id(doctor_id, auth_token)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => AppointmentError::DoctorNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let check = self
            .conflicts
            .check_conflicts(doctor_id, date, &time, duration, None, auth_token)
            .await?;
        if check.conflict {
            return Err(AppointmentError::ConflictDetected(
                check.conflicting_appointment.map(Box::new),
            ));
        }

        let created_by = Uuid::parse_str(&user.id)
            .map_err(|_| AppointmentError::ValidationError("Invalid user id".to_string()))?;

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "duration_minutes": duration,
            "slot_start_minutes": start,
            "appointment_type": request.appointment_type.unwrap_or(AppointmentType::Consultation),
            "reason": request.reason,
            "symptoms": request.symptoms.unwrap_or_default(),
            "status": AppointmentStatus::Scheduled,
            "created_by": created_by,
        });

        let rows: Vec<Appointment> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| match e {
                // The slot was taken between our scan and the insert.
                StoreError::Conflict(_) => {
                    warn!(
                        "Insert for doctor {} on {} at {} rejected by slot uniqueness",
                        doctor_id, date, time
                    );
                    AppointmentError::ConflictDetected(None)
                }
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let appointment = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no row".to_string()))?;

        info!(
            "Appointment {} booked: doctor {} on {} at {}",
            appointment.id, doctor_id, date, time
        );
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    /// Reschedule or amend an appointment.
    ///
    /// Terminal appointments are immutable. When the patch moves the
    /// appointment in time (doctor, date, time or duration), the merged
    /// timing is conflict-checked against everything except the
    /// appointment's own row.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.ensure_mutable(&existing)?;

        let doctor_id = request.doctor_id.unwrap_or(existing.doctor_id);
        let date = request.appointment_date.unwrap_or(existing.appointment_date);
        let time = request
            .appointment_time
            .clone()
            .unwrap_or_else(|| existing.appointment_time.clone());
        let duration = request.duration.unwrap_or(existing.duration_minutes);

        let start = parse_time(&time)
            .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;
        if !is_within_day(start) {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment time '{}' is outside the day",
                time
            )));
        }
        if duration <= 0 {
            return Err(AppointmentError::ValidationError(
                "Appointment duration must be positive".to_string(),
            ));
        }

        if request.touches_schedule() {
            if request.doctor_id.is_some() && doctor_id != existing.doctor_id {
                self.doctors
                    .get_doctor_by_id(doctor_id, auth_token)
                    .await
                    .map_err(|e| match e {
                        DoctorError::NotFound => AppointmentError::DoctorNotFound,
                        other => AppointmentError::DatabaseError(other.to_string()),
                    })?;
            }

            let check = self
                .conflicts
                .check_conflicts(
                    doctor_id,
                    date,
                    &time,
                    duration,
                    Some(appointment_id),
                    auth_token,
                )
                .await?;
            if check.conflict {
                return Err(AppointmentError::ConflictDetected(
                    check.conflicting_appointment.map(Box::new),
                ));
            }
        }

        let mut patch = serde_json::Map::new();
        patch.insert("doctor_id".to_string(), json!(doctor_id));
        patch.insert("appointment_date".to_string(), json!(date));
        patch.insert("appointment_time".to_string(), json!(time));
        patch.insert("duration_minutes".to_string(), json!(duration));
        patch.insert("slot_start_minutes".to_string(), json!(start));
        if let Some(appointment_type) = request.appointment_type {
            patch.insert("appointment_type".to_string(), json!(appointment_type));
        }
        if let Some(reason) = request.reason {
            patch.insert("reason".to_string(), json!(reason));
        }
        if let Some(symptoms) = request.symptoms {
            patch.insert("symptoms".to_string(), json!(symptoms));
        }
        patch.insert("updated_at".to_string(), json!(Utc::now()));

        self.patch_appointment(appointment_id, Value::Object(patch), auth_token)
            .await
    }

    /// Move an appointment along its lifecycle.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle
            .validate_status_transition(existing.status, request.status)?;

        let mut patch = serde_json::Map::new();
        patch.insert("status".to_string(), json!(request.status));
        if let Some(reason) = request.cancel_reason {
            patch.insert("cancel_reason".to_string(), json!(reason));
        }
        patch.insert("updated_at".to_string(), json!(Utc::now()));

        let updated = self
            .patch_appointment(appointment_id, Value::Object(patch), auth_token)
            .await?;

        info!(
            "Appointment {} moved from {} to {}",
            appointment_id, existing.status, updated.status
        );
        Ok(updated)
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, Option<i64>), AppointmentError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_parts = Vec::new();
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = query.date {
            query_parts.push(format!("appointment_date=gte.{}", date));
            query_parts.push(format!("appointment_date=lt.{}", date + Duration::days(1)));
        }
        query_parts.push("order=appointment_date.desc,appointment_time.asc".to_string());
        query_parts.push(format!("limit={}&offset={}", limit, offset));

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        debug!("Listing appointments: {}", path);

        self.store
            .request_with_count(Method::GET, &path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    /// The patient record owned by the authenticated user.
    pub async fn resolve_patient_for_user(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<PatientRef, AppointmentError> {
        let path = format!("/rest/v1/patients?user_id=eq.{}&select=id,user_id", user.id);
        let rows: Vec<PatientRef> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(AppointmentError::PatientNotFound)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        patch: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(patch),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AppointmentError::ConflictDetected(None),
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
