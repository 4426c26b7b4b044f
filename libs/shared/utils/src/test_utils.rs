use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{JwtClaims, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub postgrest_url: String,
    pub postgrest_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            postgrest_url: "http://localhost:54321".to_string(),
            postgrest_api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            postgrest_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            postgrest_url: self.postgrest_url.clone(),
            postgrest_api_key: self.postgrest_api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, "receptionist")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.clone(),
            exp: Some(exp.timestamp() as u64),
            iat: Some(now.timestamp() as u64),
            email: Some(user.email.clone()),
            role: Some(user.role.clone()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("failed to sign test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Canned store rows for wiremock fixtures, shaped like the PostgREST tables
/// the cells query.
pub struct MockStoreRows;

impl MockStoreRows {
    pub fn doctor_row(doctor_id: &str) -> Value {
        json!({
            "id": doctor_id,
            "user_id": Uuid::new_v4().to_string(),
            "first_name": "Meredith",
            "last_name": "Grey",
            "specialization": "General Medicine",
            "schedule": {
                "work_days": ["monday", "tuesday", "wednesday", "thursday", "friday"],
                "work_hours": { "start": "09:00", "end": "17:00" },
                "consultation_duration": 30,
                "break_time": { "start": "12:00", "end": "13:00" }
            },
            "is_available": true,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(patient_id: &str, user_id: &str) -> Value {
        json!({
            "id": patient_id,
            "user_id": user_id,
            "first_name": "Test",
            "last_name": "Patient",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        doctor_id: &str,
        patient_id: &str,
        date: &str,
        time: &str,
        duration: i32,
        status: &str,
    ) -> Value {
        let start = time
            .split(':')
            .map(|p| p.parse::<i32>().unwrap_or(0))
            .fold(0, |acc, p| acc * 60 + p);
        json!({
            "id": Uuid::new_v4().to_string(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "duration_minutes": duration,
            "slot_start_minutes": start,
            "appointment_type": "consultation",
            "reason": null,
            "symptoms": [],
            "status": status,
            "cancel_reason": null,
            "created_by": Uuid::new_v4().to_string(),
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.postgrest_url, "http://localhost:54321");
        assert_eq!(app_config.postgrest_api_key, "test-api-key");
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn minted_tokens_validate() {
        let config = TestConfig::default();
        let user = TestUser::receptionist("desk@example.com");
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

        let validated = validate_token(&token, &config.jwt_secret).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role.as_deref(), Some("receptionist"));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = TestConfig::default();
        let user = TestUser::default();
        let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

        assert!(validate_token(&token, &config.jwt_secret).is_err());
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let config = TestConfig::default();
        let user = TestUser::default();
        let token = JwtTestUtils::create_invalid_signature_token(&user);

        assert!(validate_token(&token, &config.jwt_secret).is_err());
    }
}
