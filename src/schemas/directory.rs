//! Admin directory payloads: users, companies and service points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{de_double_option, CompanySummary, CoordinateInput, PointSummary, UserSummary};
use crate::models::service_point::ServicePointType;
use crate::models::user::UserRole;
use crate::models::{company, service_point, user};

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub company_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_points: Option<Vec<PointSummary>>,
    pub created_at: DateTime<Utc>,
}

impl UserView {
    pub fn new(user: &user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            company_id: user.company_id,
            company: None,
            assigned_points: None,
            created_at: user.created_at,
        }
    }

    pub fn with_company(mut self, company: Option<&company::Model>) -> Self {
        self.company = company.map(CompanySummary::from);
        self
    }

    pub fn with_points(mut self, points: Vec<PointSummary>) -> Self {
        self.assigned_points = Some(points);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

/// `/auth/verify` answers with the same user under both keys
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub admin: UserView,
    pub user: UserView,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub company_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: Option<String>,
    /// Absent leaves the email alone, `null` or `""` clears it
    #[serde(default, deserialize_with = "de_double_option")]
    pub email: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "de_double_option")]
    pub company_id: Option<Option<i64>>,
}

/// Empty strings mean "no email"; anything else must look like an address
pub fn normalize_email(email: Option<String>) -> crate::error::Result<Option<String>> {
    match email.map(|e| e.trim().to_string()) {
        None => Ok(None),
        Some(e) if e.is_empty() => Ok(None),
        Some(e) if validator::ValidateEmail::validate_email(&e) => Ok(Some(e)),
        Some(_) => Err(crate::error::AppError::BadRequest(
            "Invalid email".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPointsRequest {
    #[serde(default)]
    pub point_ids: Vec<i64>,
}

/// Cleaner with the points now assigned to them
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedUserView {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub assigned_points: Vec<PointSummary>,
}

#[derive(Debug, Serialize)]
pub struct AssignedUserResponse {
    pub user: AssignedUserView,
}

#[derive(Debug, Serialize)]
pub struct CleanerListResponse {
    pub cleaners: Vec<UserSummary>,
}

// ============================================================================
// Companies
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCounts {
    pub users: u64,
    pub service_points: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMemberView {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub assigned_points: Vec<PointSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyView {
    #[serde(flatten)]
    pub company: company::Model,
    #[serde(rename = "_count")]
    pub counts: CompanyCounts,
    pub service_points: Vec<PointSummary>,
    pub users: Vec<CompanyMemberView>,
}

#[derive(Debug, Serialize)]
pub struct CompanyListResponse {
    pub companies: Vec<CompanyView>,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub company: company::Model,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, message = "Company name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, message = "Company name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// ============================================================================
// Service points
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCount {
    pub cleaning_tasks: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointView {
    #[serde(flatten)]
    pub point: PointSummary,
    #[serde(rename = "_count")]
    pub counts: TaskCount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointListResponse {
    pub service_points: Vec<ServicePointView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointResponse {
    pub service_point: PointSummary,
}

/// Points assigned to a cleaner; `atms` repeats the list for older clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPointsResponse {
    pub service_points: Vec<PointSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atms: Option<Vec<PointSummary>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServicePointRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(rename = "type", default)]
    pub point_type: ServicePointType,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    pub latitude: CoordinateInput,
    pub longitude: CoordinateInput,
    pub company_id: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServicePointRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub point_type: Option<ServicePointType>,
    #[validate(length(min = 1, message = "Address cannot be empty"))]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<CoordinateInput>,
    #[serde(default)]
    pub longitude: Option<CoordinateInput>,
    #[serde(default)]
    pub company_id: Option<i64>,
}

impl From<&service_point::Model> for PointSummary {
    fn from(point: &service_point::Model) -> Self {
        PointSummary::new(point, None)
    }
}
