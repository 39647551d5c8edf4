use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

use crate::models::service_point::ServicePointType;
use crate::models::{company, service_point, user};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
}

impl From<&company::Model> for CompanySummary {
    fn from(c: &company::Model) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
        }
    }
}

/// Service point as embedded in task, route and assignment payloads
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PointSummary {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub point_type: ServicePointType,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub company_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanySummary>,
}

impl PointSummary {
    pub fn new(point: &service_point::Model, company: Option<&company::Model>) -> Self {
        Self {
            id: point.id,
            name: point.name.clone(),
            point_type: point.point_type,
            address: point.address.clone(),
            latitude: point.latitude,
            longitude: point.longitude,
            company_id: point.company_id,
            company: company.map(CompanySummary::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A coordinate sent either as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

impl CoordinateInput {
    /// Parse into a finite value; `field` names the coordinate in the error
    pub fn resolve(&self, field: &str) -> Result<f64, AppError> {
        let value = match self {
            CoordinateInput::Number(n) => Some(*n),
            CoordinateInput::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {}", field)))
    }
}

/// Distinguish an absent field from an explicit `null`
pub fn de_double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Coords {
        lat: CoordinateInput,
        lng: CoordinateInput,
    }

    #[test]
    fn test_coordinate_accepts_number_and_string() {
        let c: Coords = serde_json::from_str(r#"{"lat": 40.4, "lng": "49.86"}"#).unwrap();
        assert_eq!(c.lat.resolve("latitude").unwrap(), 40.4);
        assert_eq!(c.lng.resolve("longitude").unwrap(), 49.86);
    }

    #[test]
    fn test_coordinate_rejects_garbage() {
        let c: Coords = serde_json::from_str(r#"{"lat": "north", "lng": ""}"#).unwrap();
        match c.lat.resolve("latitude") {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Invalid latitude"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(c.lng.resolve("longitude").is_err());
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "de_double_option")]
        when: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"when": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"when": "x"}"#).unwrap();
        assert_eq!(absent.when, None);
        assert_eq!(null.when, Some(None));
        assert_eq!(set.when, Some(Some("x".to_string())));
    }
}
