// libs/doctor-cell/src/services/availability.rs
use chrono::{Datelike, Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_utils::time::{format_time, parse_time, InvalidTimeFormat};

use crate::models::{
    AvailabilityResponse, BookedSlot, BreakWindow, Doctor, DoctorError, TimeSlot, WorkDay,
    WorkHours,
};

pub struct AvailabilityService {
    store: PostgrestClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    /// Availability for one doctor on one calendar date.
    ///
    /// Off-days short-circuit before any slot computation; otherwise the
    /// same-day active bookings are fetched and the slot grid is derived from
    /// the doctor's weekly schedule.
    pub async fn get_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<AvailabilityResponse, DoctorError> {
        debug!("Checking availability for doctor {} on {}", doctor_id, date);

        let doctor = self.fetch_doctor(doctor_id, auth_token).await?;

        let day = WorkDay::from(date.weekday());
        if !doctor.schedule.work_days.contains(&day) {
            return Ok(AvailabilityResponse::unavailable(
                "Doctor does not work on this day",
            ));
        }

        let booked_times = self
            .fetch_booked_times(doctor_id, date, auth_token)
            .await?;

        let slots = generate_time_slots(
            &doctor.schedule.work_hours,
            doctor.schedule.consultation_duration,
            doctor.schedule.break_time.as_ref(),
            &booked_times,
        )
        .map_err(|e| DoctorError::InvalidSchedule(e.to_string()))?;

        debug!(
            "Doctor {} has {} open slots on {}",
            doctor_id,
            slots.len(),
            date
        );

        Ok(AvailabilityResponse {
            available: true,
            message: None,
            slots: Some(slots),
        })
    }

    async fn fetch_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(DoctorError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    /// Start times of the doctor's active (non-cancelled/no-show) bookings in
    /// the half-open day range `[date, date+1)`.
    async fn fetch_booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<String>, DoctorError> {
        let next_day = date + Duration::days(1);
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=gte.{}&appointment_date=lt.{}&status=not.in.(\"cancelled\",\"no-show\")&select=appointment_time",
            doctor_id, date, next_day
        );

        let result: Vec<BookedSlot> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().map(|b| b.appointment_time).collect())
    }
}

/// Derive the ordered slot grid for one day.
///
/// Steps from work-hours start in `duration`-minute increments while a full
/// slot still fits before the end. A slot is withheld when its start falls in
/// the break window `[start, end)`, or when its formatted time exactly equals
/// a booked start (fixed-grid exact match, not interval overlap). Only
/// available slots are emitted, ascending.
pub fn generate_time_slots(
    work_hours: &WorkHours,
    duration: i32,
    break_time: Option<&BreakWindow>,
    booked_times: &[String],
) -> Result<Vec<TimeSlot>, InvalidTimeFormat> {
    let start = parse_time(&work_hours.start)?;
    let end = parse_time(&work_hours.end)?;
    let break_bounds = match break_time {
        Some(b) => Some((parse_time(&b.start)?, parse_time(&b.end)?)),
        None => None,
    };

    let mut slots = Vec::new();
    if duration <= 0 {
        return Ok(slots);
    }

    let mut current = start;
    while current + duration <= end {
        let slot_time = format_time(current);

        let during_break = break_bounds
            .map(|(break_start, break_end)| current >= break_start && current < break_end)
            .unwrap_or(false);
        let booked = booked_times.iter().any(|t| *t == slot_time);

        if !during_break && !booked {
            slots.push(TimeSlot {
                time: slot_time,
                available: true,
            });
        }

        current += duration;
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(start: &str, end: &str) -> WorkHours {
        WorkHours {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn window(start: &str, end: &str) -> BreakWindow {
        BreakWindow {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn times(slots: &[TimeSlot]) -> Vec<&str> {
        slots.iter().map(|s| s.time.as_str()).collect()
    }

    #[test]
    fn morning_grid_with_break() {
        let slots = generate_time_slots(
            &hours("09:00", "12:00"),
            30,
            Some(&window("10:30", "11:00")),
            &[],
        )
        .unwrap();

        assert_eq!(
            times(&slots),
            vec!["09:00", "09:30", "10:00", "11:00", "11:30"]
        );
        assert!(slots.iter().all(|s| s.available));
    }

    #[test]
    fn booked_starts_are_withheld() {
        let booked = vec!["09:30".to_string(), "11:00".to_string()];
        let slots =
            generate_time_slots(&hours("09:00", "12:00"), 30, None, &booked).unwrap();

        assert_eq!(times(&slots), vec!["09:00", "10:00", "10:30", "11:30"]);
    }

    #[test]
    fn break_window_is_half_open() {
        // A slot starting exactly at break end is bookable.
        let slots = generate_time_slots(
            &hours("09:00", "11:00"),
            30,
            Some(&window("09:30", "10:00")),
            &[],
        )
        .unwrap();

        assert_eq!(times(&slots), vec!["09:00", "10:00", "10:30"]);
    }

    #[test]
    fn last_slot_must_fit_entirely() {
        // 09:00-10:15 with 30-minute slots: 10:00 would spill past the end.
        let slots = generate_time_slots(&hours("09:00", "10:15"), 30, None, &[]).unwrap();
        assert_eq!(times(&slots), vec!["09:00", "09:30"]);
    }

    #[test]
    fn window_too_small_for_one_slot() {
        let slots = generate_time_slots(&hours("09:00", "09:15"), 30, None, &[]).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn malformed_work_hours_error() {
        assert!(generate_time_slots(&hours("nine", "12:00"), 30, None, &[]).is_err());
    }

    #[test]
    fn non_positive_duration_yields_no_slots() {
        let slots = generate_time_slots(&hours("09:00", "12:00"), 0, None, &[]).unwrap();
        assert!(slots.is_empty());
    }
}
