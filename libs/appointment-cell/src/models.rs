// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One scheduled encounter between exactly one patient and one doctor.
///
/// `appointment_date` is calendar-only; `appointment_time` is local wall
/// clock ("HH:MM"). `slot_start_minutes` is the normalized minute offset of
/// the start, recomputed on every write — it backs the store's unique index
/// over `(doctor_id, appointment_date, slot_start_minutes)` for active rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    pub slot_start_minutes: i32,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub reason: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub status: AppointmentStatus,
    pub cancel_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn default_duration() -> i32 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Active appointments count toward conflict detection.
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }

    /// Terminal appointments accept no further transition or time/doctor
    /// mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no-show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    #[serde(alias = "general", alias = "general_consultation")]
    Consultation,
    #[serde(alias = "followup")]
    FollowUp,
    #[serde(alias = "urgent")]
    Emergency,
    #[serde(alias = "checkup")]
    RoutineCheckup,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::RoutineCheckup => write!(f, "routine_checkup"),
        }
    }
}

/// A patient profile row, as resolved from the caller's user identity.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientRef {
    pub id: Uuid,
    pub user_id: Uuid,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking request. Required fields are optional here so missing ones surface
/// as a field-level 400 rather than a body-level deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub duration: Option<i32>,
    pub appointment_type: Option<AppointmentType>,
    pub reason: Option<String>,
    pub symptoms: Option<Vec<String>>,
}

/// Reschedule/edit patch: every field optional, merged over the stored
/// record before conflict checking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub duration: Option<i32>,
    pub appointment_type: Option<AppointmentType>,
    pub reason: Option<String>,
    pub symptoms: Option<Vec<String>>,
}

impl UpdateAppointmentRequest {
    pub fn touches_schedule(&self) -> bool {
        self.doctor_id.is_some()
            || self.appointment_date.is_some()
            || self.appointment_time.is_some()
            || self.duration.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheck {
    pub conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_appointment: Option<Appointment>,
}

impl ConflictCheck {
    pub fn clear() -> Self {
        Self {
            conflict: false,
            conflicting_appointment: None,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient profile not found")]
    PatientNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment conflicts with an existing appointment")]
    ConflictDetected(Option<Box<Appointment>>),

    #[error("Invalid status transition from {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Access denied")]
    AccessDenied,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
