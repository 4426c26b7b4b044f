// libs/doctor-cell/src/models.rs
use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_utils::time::{is_within_day, parse_time};

// ==============================================================================
// DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub schedule: DoctorSchedule,
    pub is_available: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The doctor's recurring weekly availability template, embedded in the
/// doctor record and read wholesale per availability query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub work_days: Vec<WorkDay>,
    pub work_hours: WorkHours,
    #[serde(default = "default_consultation_duration")]
    pub consultation_duration: i32,
    #[serde(default)]
    pub break_time: Option<BreakWindow>,
}

fn default_consultation_duration() -> i32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkHours {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakWindow {
    pub start: String,
    pub end: String,
}

impl DoctorSchedule {
    /// Invariants: work start < end (both within the day), positive
    /// consultation duration, and the break window (when present) inside the
    /// work-hours window.
    pub fn validate(&self) -> Result<(), DoctorError> {
        let start = parse_time(&self.work_hours.start)
            .map_err(|e| DoctorError::ValidationError(format!("work hours: {}", e)))?;
        let end = parse_time(&self.work_hours.end)
            .map_err(|e| DoctorError::ValidationError(format!("work hours: {}", e)))?;

        if !is_within_day(start) || !is_within_day(end) {
            return Err(DoctorError::ValidationError(
                "work hours must lie within the day".to_string(),
            ));
        }
        if start >= end {
            return Err(DoctorError::ValidationError(
                "work hours start must be before end".to_string(),
            ));
        }
        if self.consultation_duration <= 0 {
            return Err(DoctorError::ValidationError(
                "consultation duration must be positive".to_string(),
            ));
        }

        if let Some(break_time) = &self.break_time {
            let break_start = parse_time(&break_time.start)
                .map_err(|e| DoctorError::ValidationError(format!("break window: {}", e)))?;
            let break_end = parse_time(&break_time.end)
                .map_err(|e| DoctorError::ValidationError(format!("break window: {}", e)))?;

            if break_start >= break_end {
                return Err(DoctorError::ValidationError(
                    "break window start must be before end".to_string(),
                ));
            }
            if break_start < start || break_end > end {
                return Err(DoctorError::ValidationError(
                    "break window must lie within work hours".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for WorkDay {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => WorkDay::Monday,
            Weekday::Tue => WorkDay::Tuesday,
            Weekday::Wed => WorkDay::Wednesday,
            Weekday::Thu => WorkDay::Thursday,
            Weekday::Fri => WorkDay::Friday,
            Weekday::Sat => WorkDay::Saturday,
            Weekday::Sun => WorkDay::Sunday,
        }
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// One candidate bookable unit. Derived per availability query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<TimeSlot>>,
}

impl AvailabilityResponse {
    pub fn unavailable(message: &str) -> Self {
        Self {
            available: false,
            message: Some(message.to_string()),
            slots: None,
        }
    }
}

/// Minimal projection of a same-day booking, as returned by the appointment
/// store when only start times are selected.
#[derive(Debug, Clone, Deserialize)]
pub struct BookedSlot {
    pub appointment_time: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub specialization: Option<String>,
    pub available: Option<bool>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid stored schedule: {0}")]
    InvalidSchedule(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
