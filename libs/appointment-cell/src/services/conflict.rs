// libs/appointment-cell/src/services/conflict.rs
use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;
use shared_utils::time::parse_time;

use crate::models::{Appointment, AppointmentError, ConflictCheck};

pub struct ConflictDetectionService {
    store: Arc<PostgrestClient>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<PostgrestClient>) -> Self {
        Self { store }
    }

    /// Decide whether a candidate `(doctor, date, time, duration)` overlaps
    /// any of the doctor's active same-day bookings.
    ///
    /// Read-only: one range query against the appointment store, then a pure
    /// interval scan. `exclude_appointment_id` drops the appointment's own
    /// row when re-checking during a reschedule.
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        duration: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictCheck, AppointmentError> {
        debug!(
            "Checking conflicts for doctor {} on {} at {} ({}min)",
            doctor_id, date, time, duration
        );

        let start = parse_time(time)
            .map_err(|e| AppointmentError::ValidationError(e.to_string()))?;

        let existing = self
            .fetch_active_day_bookings(doctor_id, date, exclude_appointment_id, auth_token)
            .await?;

        match find_overlap(start, duration, &existing) {
            Some(conflicting) => {
                warn!(
                    "Conflict detected for doctor {} on {}: candidate {} overlaps appointment {}",
                    doctor_id, date, time, conflicting.id
                );
                Ok(ConflictCheck {
                    conflict: true,
                    conflicting_appointment: Some(conflicting.clone()),
                })
            }
            None => Ok(ConflictCheck::clear()),
        }
    }

    /// The doctor's non-cancelled/no-show bookings in the half-open day
    /// range `[date, date+1)`.
    async fn fetch_active_day_bookings(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let next_day = date + Duration::days(1);
        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("appointment_date=gte.{}", date),
            format!("appointment_date=lt.{}", next_day),
            "status=not.in.(\"cancelled\",\"no-show\")".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=appointment_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })
    }
}

/// Half-open interval overlap: `[a, b)` and `[c, d)` overlap iff
/// `a < d && c < b`. An appointment ending exactly when another starts does
/// not conflict.
pub(crate) fn intervals_overlap(a: i32, b: i32, c: i32, d: i32) -> bool {
    a < d && c < b
}

/// Scan the fetched bookings for the first one overlapping the candidate
/// interval `[start, start + duration)`.
///
/// Rows whose stored time string fails to parse are a data-integrity problem,
/// not a reason to fail the whole scan: they are logged and treated as
/// non-overlapping.
pub fn find_overlap(start: i32, duration: i32, existing: &[Appointment]) -> Option<&Appointment> {
    let end = start + duration;

    existing.iter().find(|apt| {
        let ex_start = match parse_time(&apt.appointment_time) {
            Ok(minutes) => minutes,
            Err(_) => {
                warn!(
                    "Appointment {} has malformed stored time {:?}; skipped in conflict scan",
                    apt.id, apt.appointment_time
                );
                return false;
            }
        };
        let ex_end = ex_start + apt.duration_minutes;
        intervals_overlap(start, end, ex_start, ex_end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, AppointmentType};
    use chrono::Utc;

    fn appointment(time: &str, duration: i32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            appointment_time: time.to_string(),
            duration_minutes: duration,
            slot_start_minutes: parse_time(time).unwrap_or(0),
            appointment_type: AppointmentType::Consultation,
            reason: None,
            symptoms: Vec::new(),
            status: AppointmentStatus::Scheduled,
            cancel_reason: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn partial_overlap_is_detected() {
        // Existing [540, 570), candidate [555, 585).
        let existing = vec![appointment("09:00", 30)];
        assert!(find_overlap(555, 30, &existing).is_some());
    }

    #[test]
    fn containment_is_symmetric() {
        // B fully inside A conflicts whichever is the candidate.
        let long = vec![appointment("09:00", 120)];
        assert!(find_overlap(parse_time("09:30").unwrap(), 30, &long).is_some());

        let short = vec![appointment("09:30", 30)];
        assert!(find_overlap(parse_time("09:00").unwrap(), 120, &short).is_some());
    }

    #[test]
    fn back_to_back_is_not_a_conflict() {
        // Candidate ends exactly when the existing one starts, and vice
        // versa: half-open intervals do not touch.
        let existing = vec![appointment("09:30", 30)];
        assert!(find_overlap(parse_time("09:00").unwrap(), 30, &existing).is_none());
        assert!(find_overlap(parse_time("10:00").unwrap(), 30, &existing).is_none());
    }

    #[test]
    fn no_bookings_no_conflict() {
        assert!(find_overlap(540, 30, &[]).is_none());
    }

    #[test]
    fn malformed_stored_time_is_skipped() {
        let existing = vec![appointment("garbage", 30), appointment("09:00", 30)];
        let hit = find_overlap(540, 30, &existing).expect("valid row should still match");
        assert_eq!(hit.appointment_time, "09:00");

        let only_bad = vec![appointment("garbage", 30)];
        assert!(find_overlap(540, 30, &only_bad).is_none());
    }

    #[test]
    fn first_overlap_wins() {
        let first = appointment("09:00", 60);
        let second = appointment("09:30", 60);
        let first_id = first.id;
        let existing = vec![first, second];

        let hit = find_overlap(parse_time("09:15").unwrap(), 120, &existing).unwrap();
        assert_eq!(hit.id, first_id);
    }

    #[test]
    fn overlap_rule_edge_cases() {
        assert!(intervals_overlap(0, 30, 0, 30));
        assert!(intervals_overlap(0, 30, 29, 60));
        assert!(!intervals_overlap(0, 30, 30, 60));
        assert!(!intervals_overlap(30, 60, 0, 30));
    }
}
