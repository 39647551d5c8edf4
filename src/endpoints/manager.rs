use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::endpoints::attachment;
use crate::error::{AppError, Result};
use crate::middleware::{
    require_auth, Authorized, DashboardViewers, ManagerOnly, RouteManagers, TaskViewers,
};
use crate::models::prelude::*;
use crate::schemas::*;
use crate::services::calendar::DayWindow;
use crate::services::export::{self, TaskExportFormat};
use crate::services::reporting::{self, ReportScope};
use crate::services::routes::{self, RouteScope};
use crate::services::views::{self, TaskIncludes};
use crate::services::{directory, tasks};
use crate::state::AppState;

/// Create manager routes
pub fn manager_routes(state: AppState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/export", get(export_tasks))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/comment", put(comment_task))
        .route("/cleaners", get(list_cleaners))
        .route("/service-points", get(list_service_points))
        .route("/stats", get(stats))
        .route("/routes", get(list_routes).post(create_route))
        .route("/routes/{id}", put(update_route).delete(delete_route))
        .route("/dashboard-stats", get(dashboard_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

fn require_company(user: &user::Model) -> Result<i64> {
    user.company_id
        .ok_or_else(|| AppError::BadRequest("Manager not assigned to a company".to_string()))
}

/// The caller's company, or `None` for a company-less administrator
fn company_or_admin(user: &user::Model) -> Result<Option<i64>> {
    match (user.company_id, user.role) {
        (Some(id), _) => Ok(Some(id)),
        (None, UserRole::Admin) => Ok(None),
        (None, _) => Err(AppError::BadRequest(
            "Not assigned to a company".to_string(),
        )),
    }
}

async fn manager_view(state: &AppState, task: cleaning_task::Model) -> Result<TaskView> {
    views::task_view(&state.db, task, TaskIncludes::MANAGER_VIEW).await
}

// ============================================================================
// Tasks
// ============================================================================

async fn list_tasks(
    State(state): State<AppState>,
    auth: Authorized<TaskViewers>,
) -> Result<Json<TaskListResponse>> {
    let company_id = require_company(auth.user())?;
    let tasks = tasks::list_company_tasks(&state.db, company_id, Utc::now()).await?;
    Ok(Json(TaskListResponse { tasks }))
}

async fn comment_task(
    State(state): State<AppState>,
    auth: Authorized<ManagerOnly>,
    Path(id): Path<i64>,
    Json(req): Json<TaskCommentRequest>,
) -> Result<Json<TaskResponse>> {
    let company_id = require_company(auth.user())?;
    let task = tasks::add_manager_comment(&state.db, id, company_id, &req.manager_notes).await?;
    Ok(Json(TaskResponse {
        task: manager_view(&state, task).await?,
    }))
}

async fn create_task(
    State(state): State<AppState>,
    auth: Authorized<ManagerOnly>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    let company_id = require_company(auth.user())?;
    let task = tasks::create_adhoc_task(&state.db, company_id, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            task: manager_view(&state, task).await?,
        }),
    ))
}

async fn update_task(
    State(state): State<AppState>,
    auth: Authorized<ManagerOnly>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>> {
    let company_id = require_company(auth.user())?;
    let task = tasks::update_adhoc_task(&state.db, id, company_id, &req).await?;
    Ok(Json(TaskResponse {
        task: manager_view(&state, task).await?,
    }))
}

async fn delete_task(
    State(state): State<AppState>,
    auth: Authorized<ManagerOnly>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let company_id = require_company(auth.user())?;
    tasks::delete_adhoc_task(&state.db, id, company_id).await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

async fn export_tasks(
    State(state): State<AppState>,
    auth: Authorized<RouteManagers>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let company_id = company_or_admin(auth.user())?;
    let format = TaskExportFormat::parse(query.format.as_deref());
    let file =
        export::build_task_export(&state.db, company_id, format, &DayWindow::today()).await?;
    attachment(file)
}

// ============================================================================
// Company directory
// ============================================================================

async fn list_cleaners(
    State(state): State<AppState>,
    auth: Authorized<RouteManagers>,
) -> Result<Json<CleanerListResponse>> {
    let mut query = User::find()
        .filter(user::Column::Role.eq(UserRole::Cleaner))
        .order_by_asc(user::Column::Username);
    if let Some(company_id) = company_or_admin(auth.user())? {
        query = query.filter(user::Column::CompanyId.eq(company_id));
    }

    let cleaners = query.all(&state.db).await?;
    Ok(Json(CleanerListResponse {
        cleaners: cleaners.iter().map(UserSummary::from).collect(),
    }))
}

async fn list_service_points(
    State(state): State<AppState>,
    auth: Authorized<ManagerOnly>,
) -> Result<Json<ServicePointListResponse>> {
    let company_id = require_company(auth.user())?;
    let service_points = directory::list_service_points(&state.db, Some(company_id), false).await?;
    Ok(Json(ServicePointListResponse { service_points }))
}

async fn stats(
    State(state): State<AppState>,
    auth: Authorized<ManagerOnly>,
) -> Result<Json<CompanyStatsResponse>> {
    let company_id = require_company(auth.user())?;
    let stats = reporting::company_stats(&state.db, company_id).await?;
    Ok(Json(CompanyStatsResponse { stats }))
}

async fn dashboard_stats(
    State(state): State<AppState>,
    auth: Authorized<DashboardViewers>,
) -> Result<Json<DashboardResponse>> {
    let company_id = require_company(auth.user())?;
    let dashboard = reporting::dashboard(
        &state.db,
        ReportScope::Company(company_id),
        &DayWindow::today(),
    )
    .await?;
    Ok(Json(dashboard))
}

// ============================================================================
// Routes
// ============================================================================

async fn list_routes(
    State(state): State<AppState>,
    auth: Authorized<RouteManagers>,
) -> Result<Json<RouteListResponse>> {
    let scope = RouteScope::for_actor(auth.user())?;
    let routes = routes::list_routes(&state.db, scope).await?;
    Ok(Json(RouteListResponse { routes }))
}

async fn create_route(
    State(state): State<AppState>,
    auth: Authorized<RouteManagers>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<RouteResponse>)> {
    let scope = RouteScope::for_actor(auth.user())?;
    let route = routes::create_route(&state.db, scope, &req).await?;
    Ok((StatusCode::CREATED, Json(RouteResponse { route })))
}

async fn update_route(
    State(state): State<AppState>,
    auth: Authorized<RouteManagers>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRouteRequest>,
) -> Result<Json<RouteResponse>> {
    let scope = RouteScope::for_actor(auth.user())?;
    let route = routes::update_route(&state.db, scope, id, &req).await?;
    Ok(Json(RouteResponse { route }))
}

async fn delete_route(
    State(state): State<AppState>,
    auth: Authorized<RouteManagers>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let scope = RouteScope::for_actor(auth.user())?;
    routes::delete_route(&state.db, scope, id).await?;
    Ok(Json(MessageResponse::new("Route deleted")))
}
