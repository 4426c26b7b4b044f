use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{Doctor, DoctorError, DoctorListQuery, DoctorSchedule};

pub struct DoctorService {
    store: PostgrestClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: PostgrestClient::new(config),
        }
    }

    pub async fn get_doctor_by_id(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);

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

    /// The doctor record owned by the given user identity.
    pub async fn get_doctor_by_user_id(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let result: Vec<Value> = self
            .store
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(DoctorError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    /// Paginated listing of active doctors, ordered by last name.
    pub async fn list_doctors(
        &self,
        query: &DoctorListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Doctor>, Option<i64>), DoctorError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut query_parts = vec![
            "is_active=eq.true".to_string(),
            "order=last_name.asc".to_string(),
            format!("limit={}", limit),
            format!("offset={}", offset),
        ];
        if let Some(specialization) = &query.specialization {
            query_parts.push(format!("specialization=eq.{}", specialization));
        }
        if query.available == Some(true) {
            query_parts.push("is_available=eq.true".to_string());
        }

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        let (result, total): (Vec<Value>, Option<i64>) = self
            .store
            .request_with_count(Method::GET, &path, Some(auth_token))
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok((doctors, total))
    }

    /// Replace the doctor's weekly schedule after invariant validation.
    pub async fn update_schedule(
        &self,
        doctor_id: Uuid,
        schedule: DoctorSchedule,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        schedule.validate()?;

        debug!("Updating schedule for doctor {}", doctor_id);

        let body = json!({
            "schedule": schedule,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .store
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(DoctorError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }
}
