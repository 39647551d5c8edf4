//! Users, companies and service points as managed by administrators

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::schemas::{
    normalize_email, CompanyCounts, CompanyMemberView, CompanyView, CreateCompanyRequest,
    CreateServicePointRequest, CreateUserRequest, PointSummary, ServicePointView, TaskCount,
    UpdateCompanyRequest, UpdateServicePointRequest, UpdateUserRequest, UserView,
};
use crate::services::views;

const DUPLICATE_USER: &str = "Username or email already exists";
const DUPLICATE_COMPANY: &str = "Company name already exists";

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn company_not_found() -> AppError {
    AppError::NotFound("Company not found".to_string())
}

fn point_not_found() -> AppError {
    AppError::NotFound("Service point not found".to_string())
}

async fn require_company<C: ConnectionTrait>(db: &C, company_id: i64) -> Result<company::Model> {
    Company::find_by_id(company_id)
        .one(db)
        .await?
        .ok_or_else(company_not_found)
}

/// Assigned points (without company) keyed by cleaner id
async fn points_by_cleaner<C: ConnectionTrait>(
    db: &C,
    cleaner_ids: Vec<i64>,
) -> Result<HashMap<i64, Vec<PointSummary>>> {
    if cleaner_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let assignments = CleanerAssignment::find()
        .filter(cleaner_assignment::Column::CleanerId.is_in(cleaner_ids))
        .all(db)
        .await?;
    let points =
        views::point_summaries(db, assignments.iter().map(|a| a.service_point_id), false).await?;

    let mut grouped: HashMap<i64, Vec<PointSummary>> = HashMap::new();
    for a in &assignments {
        if let Some(point) = points.get(&a.service_point_id) {
            grouped.entry(a.cleaner_id).or_default().push(point.clone());
        }
    }
    Ok(grouped)
}

// ============================================================================
// Users
// ============================================================================

/// Every user, newest first, with company and assigned points
pub async fn list_users<C: ConnectionTrait>(db: &C) -> Result<Vec<UserView>> {
    let users = User::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .all(db)
        .await?;
    let companies = views::companies_by_id(db, users.iter().filter_map(|u| u.company_id)).await?;
    let mut points = points_by_cleaner(db, users.iter().map(|u| u.id).collect()).await?;

    Ok(users
        .iter()
        .map(|u| {
            UserView::new(u)
                .with_company(u.company_id.and_then(|id| companies.get(&id)))
                .with_points(points.remove(&u.id).unwrap_or_default())
        })
        .collect())
}

/// Create a local user profile; the password only travels to the identity provider
pub async fn create_user<C: ConnectionTrait>(db: &C, req: &CreateUserRequest) -> Result<user::Model> {
    req.validate()?;
    let email = normalize_email(req.email.clone())?;
    if let Some(company_id) = req.company_id {
        require_company(db, company_id).await?;
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        username: Set(req.username.trim().to_string()),
        email: Set(email),
        role: Set(req.role),
        company_id: Set(req.company_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_USER))?;

    tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User created");
    Ok(user)
}

/// Apply `req` to a user. Returns the username before the change and the updated user.
///
/// A user that stops being a cleaner loses its assignments.
pub async fn update_user<C>(db: &C, user_id: i64, req: &UpdateUserRequest) -> Result<(String, user::Model)>
where
    C: ConnectionTrait + TransactionTrait,
{
    req.validate()?;
    let current = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(user_not_found)?;
    let previous_username = current.username.clone();

    let mut active: user::ActiveModel = current.clone().into();
    if let Some(username) = &req.username {
        active.username = Set(username.trim().to_string());
    }
    if let Some(email) = &req.email {
        active.email = Set(normalize_email(email.clone())?);
    }
    if let Some(role) = req.role {
        active.role = Set(role);
    }
    if let Some(company_id) = req.company_id {
        if let Some(id) = company_id {
            require_company(db, id).await?;
        }
        active.company_id = Set(company_id);
    }
    active.updated_at = Set(Utc::now());

    let txn = db.begin().await?;
    let updated = active
        .update(&txn)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_USER))?;
    if current.role == UserRole::Cleaner && updated.role != UserRole::Cleaner {
        let removed = CleanerAssignment::delete_many()
            .filter(cleaner_assignment::Column::CleanerId.eq(user_id))
            .exec(&txn)
            .await?;
        tracing::info!(user_id, removed = removed.rows_affected, "Cleared assignments of former cleaner");
    }
    txn.commit().await?;

    tracing::info!(user_id, username = %updated.username, "User updated");
    Ok((previous_username, updated))
}

/// Delete a user and return the removed row
pub async fn delete_user<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<user::Model> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(user_not_found)?;
    User::delete_by_id(user_id).exec(db).await?;

    tracing::info!(user_id, username = %user.username, "User deleted");
    Ok(user)
}

// ============================================================================
// Companies
// ============================================================================

/// Companies by name with their points, members and counts
pub async fn list_companies<C: ConnectionTrait>(db: &C) -> Result<Vec<CompanyView>> {
    let companies = Company::find()
        .order_by_asc(company::Column::Name)
        .all(db)
        .await?;
    let points = ServicePoint::find()
        .order_by_asc(service_point::Column::Name)
        .all(db)
        .await?;
    let members = User::find()
        .filter(user::Column::CompanyId.is_not_null())
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;
    let mut assigned = points_by_cleaner(db, members.iter().map(|u| u.id).collect()).await?;

    let mut points_by_company: HashMap<i64, Vec<PointSummary>> = HashMap::new();
    for p in &points {
        points_by_company
            .entry(p.company_id)
            .or_default()
            .push(PointSummary::from(p));
    }
    let mut members_by_company: HashMap<i64, Vec<CompanyMemberView>> = HashMap::new();
    for u in members {
        let Some(company_id) = u.company_id else {
            continue;
        };
        members_by_company
            .entry(company_id)
            .or_default()
            .push(CompanyMemberView {
                assigned_points: assigned.remove(&u.id).unwrap_or_default(),
                id: u.id,
                username: u.username,
                role: u.role,
            });
    }

    Ok(companies
        .into_iter()
        .map(|company| {
            let service_points = points_by_company.remove(&company.id).unwrap_or_default();
            let users = members_by_company.remove(&company.id).unwrap_or_default();
            CompanyView {
                counts: CompanyCounts {
                    users: users.len() as u64,
                    service_points: service_points.len() as u64,
                },
                company,
                service_points,
                users,
            }
        })
        .collect())
}

pub async fn create_company<C: ConnectionTrait>(
    db: &C,
    req: &CreateCompanyRequest,
) -> Result<company::Model> {
    req.validate()?;
    let now = Utc::now();
    let company = company::ActiveModel {
        name: Set(req.name.trim().to_string()),
        description: Set(req.description.clone()),
        address: Set(req.address.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_COMPANY))?;

    tracing::info!(company_id = company.id, name = %company.name, "Company created");
    Ok(company)
}

pub async fn update_company<C: ConnectionTrait>(
    db: &C,
    company_id: i64,
    req: &UpdateCompanyRequest,
) -> Result<company::Model> {
    req.validate()?;
    let mut active: company::ActiveModel = require_company(db, company_id).await?.into();
    if let Some(name) = &req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = &req.description {
        active.description = Set(Some(description.clone()));
    }
    if let Some(address) = &req.address {
        active.address = Set(Some(address.clone()));
    }
    active.updated_at = Set(Utc::now());

    active
        .update(db)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_COMPANY))
}

/// Delete a company together with its points, users and their tasks
pub async fn delete_company<C: ConnectionTrait>(db: &C, company_id: i64) -> Result<()> {
    let result = Company::delete_by_id(company_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(company_not_found());
    }
    tracing::info!(company_id, "Company deleted");
    Ok(())
}

// ============================================================================
// Service points
// ============================================================================

/// Points by name with task counts; `company_id` narrows to one company
pub async fn list_service_points<C: ConnectionTrait>(
    db: &C,
    company_id: Option<i64>,
    with_company: bool,
) -> Result<Vec<ServicePointView>> {
    let mut query = ServicePoint::find().order_by_asc(service_point::Column::Name);
    if let Some(id) = company_id {
        query = query.filter(service_point::Column::CompanyId.eq(id));
    }
    let points = query.all(db).await?;
    let ids: Vec<i64> = points.iter().map(|p| p.id).collect();

    let counts: HashMap<i64, i64> = if ids.is_empty() {
        HashMap::new()
    } else {
        CleaningTask::find()
            .select_only()
            .column(cleaning_task::Column::ServicePointId)
            .column_as(Expr::col(cleaning_task::Column::Id).count(), "task_count")
            .filter(cleaning_task::Column::ServicePointId.is_in(ids))
            .group_by(cleaning_task::Column::ServicePointId)
            .into_tuple::<(i64, i64)>()
            .all(db)
            .await?
            .into_iter()
            .collect()
    };

    Ok(views::summarize_points(db, &points, with_company)
        .await?
        .into_iter()
        .map(|point| ServicePointView {
            counts: TaskCount {
                cleaning_tasks: counts.get(&point.id).copied().unwrap_or(0) as u64,
            },
            point,
        })
        .collect())
}

pub async fn create_service_point<C: ConnectionTrait>(
    db: &C,
    req: &CreateServicePointRequest,
) -> Result<PointSummary> {
    req.validate()?;
    let latitude = req.latitude.resolve("latitude")?;
    let longitude = req.longitude.resolve("longitude")?;
    let company = require_company(db, req.company_id).await?;

    let now = Utc::now();
    let point = service_point::ActiveModel {
        name: Set(req.name.trim().to_string()),
        point_type: Set(req.point_type),
        address: Set(req.address.trim().to_string()),
        latitude: Set(latitude),
        longitude: Set(longitude),
        company_id: Set(company.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(point_id = point.id, company_id = company.id, "Service point created");
    Ok(PointSummary::new(&point, Some(&company)))
}

pub async fn update_service_point<C: ConnectionTrait>(
    db: &C,
    point_id: i64,
    req: &UpdateServicePointRequest,
) -> Result<PointSummary> {
    req.validate()?;
    let point = ServicePoint::find_by_id(point_id)
        .one(db)
        .await?
        .ok_or_else(point_not_found)?;

    let mut active: service_point::ActiveModel = point.into();
    if let Some(name) = &req.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(point_type) = req.point_type {
        active.point_type = Set(point_type);
    }
    if let Some(address) = &req.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(latitude) = &req.latitude {
        active.latitude = Set(latitude.resolve("latitude")?);
    }
    if let Some(longitude) = &req.longitude {
        active.longitude = Set(longitude.resolve("longitude")?);
    }
    if let Some(company_id) = req.company_id {
        require_company(db, company_id).await?;
        active.company_id = Set(company_id);
    }
    active.updated_at = Set(Utc::now());

    let point = active.update(db).await?;
    let company = Company::find_by_id(point.company_id).one(db).await?;
    Ok(PointSummary::new(&point, company.as_ref()))
}

/// Delete a point; its tasks, assignments and route stops go with it
pub async fn delete_service_point<C: ConnectionTrait>(db: &C, point_id: i64) -> Result<()> {
    let result = ServicePoint::delete_by_id(point_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(point_not_found());
    }
    tracing::info!(point_id, "Service point deleted");
    Ok(())
}

