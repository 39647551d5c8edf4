use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};

use crate::endpoints::attachment;
use crate::error::Result;
use crate::middleware::{require_auth, AdminOnly, Authorized, DirectoryViewers, UserManagers};
use crate::schemas::*;
use crate::services::calendar::DayWindow;
use crate::services::export::{self, ReportFormat};
use crate::services::identity::{MirroredUpdate, MirroredUser};
use crate::services::identity_mirror::{self, UserEvent};
use crate::services::reporting::{self, ReportScope};
use crate::services::{assignments, directory};
use crate::state::AppState;

/// Create admin routes
pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .route("/users/{id}/assign-points", post(assign_points))
        .route("/users/{id}/assigned-points", get(assigned_points))
        .route("/companies", get(list_companies).post(create_company))
        .route("/companies/{id}", put(update_company).delete(delete_company))
        .route(
            "/service-points",
            get(list_service_points).post(create_service_point),
        )
        .route(
            "/service-points/{id}",
            put(update_service_point).delete(delete_service_point),
        )
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/reports/export", get(export_report))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

// ============================================================================
// Users
// ============================================================================

async fn list_users(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
) -> Result<Json<UserListResponse>> {
    let users = directory::list_users(&state.db).await?;
    Ok(Json(UserListResponse { users }))
}

async fn create_user(
    State(state): State<AppState>,
    auth: Authorized<UserManagers>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = directory::create_user(&state.db, &req).await?;

    identity_mirror::dispatch(
        state.identity.clone(),
        UserEvent::Created(MirroredUser {
            username: user.username.clone(),
            email: user.email.clone(),
            password: req.password,
            role: user.role,
        }),
        Some(auth.token().to_string()),
    );

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user: UserView::new(&user),
        }),
    ))
}

async fn update_user(
    State(state): State<AppState>,
    auth: Authorized<UserManagers>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let (previous_username, user) = directory::update_user(&state.db, id, &req).await?;

    identity_mirror::dispatch(
        state.identity.clone(),
        UserEvent::Updated {
            username: previous_username,
            update: MirroredUpdate {
                email: user.email.clone(),
                role: Some(user.role),
            },
        },
        Some(auth.token().to_string()),
    );

    Ok(Json(UserResponse {
        user: UserView::new(&user),
    }))
}

async fn delete_user(
    State(state): State<AppState>,
    auth: Authorized<UserManagers>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let user = directory::delete_user(&state.db, id).await?;

    identity_mirror::dispatch(
        state.identity.clone(),
        UserEvent::Deleted {
            username: user.username,
        },
        Some(auth.token().to_string()),
    );

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

async fn assign_points(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    Json(req): Json<AssignPointsRequest>,
) -> Result<Json<AssignedUserResponse>> {
    let cleaner = assignments::assign_points(&state.db, id, &req.point_ids).await?;
    let mut points = assignments::assigned_points(&state.db, cleaner.id).await?;
    for point in &mut points {
        point.company = None;
    }

    Ok(Json(AssignedUserResponse {
        user: AssignedUserView {
            id: cleaner.id,
            username: cleaner.username,
            role: cleaner.role,
            assigned_points: points,
        },
    }))
}

async fn assigned_points(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<Json<AssignedPointsResponse>> {
    let service_points = assignments::assigned_points(&state.db, id).await?;
    Ok(Json(AssignedPointsResponse {
        service_points,
        atms: None,
    }))
}

// ============================================================================
// Companies
// ============================================================================

async fn list_companies(
    State(state): State<AppState>,
    _auth: Authorized<DirectoryViewers>,
) -> Result<Json<CompanyListResponse>> {
    let companies = directory::list_companies(&state.db).await?;
    Ok(Json(CompanyListResponse { companies }))
}

async fn create_company(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyResponse>)> {
    let company = directory::create_company(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(CompanyResponse { company })))
}

async fn update_company(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyResponse>> {
    let company = directory::update_company(&state.db, id, &req).await?;
    Ok(Json(CompanyResponse { company }))
}

async fn delete_company(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    directory::delete_company(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Company deleted successfully")))
}

// ============================================================================
// Service points
// ============================================================================

async fn list_service_points(
    State(state): State<AppState>,
    _auth: Authorized<DirectoryViewers>,
) -> Result<Json<ServicePointListResponse>> {
    let service_points = directory::list_service_points(&state.db, None, true).await?;
    Ok(Json(ServicePointListResponse { service_points }))
}

async fn create_service_point(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Json(req): Json<CreateServicePointRequest>,
) -> Result<(StatusCode, Json<ServicePointResponse>)> {
    let service_point = directory::create_service_point(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(ServicePointResponse { service_point })))
}

async fn update_service_point(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateServicePointRequest>,
) -> Result<Json<ServicePointResponse>> {
    let service_point = directory::update_service_point(&state.db, id, &req).await?;
    Ok(Json(ServicePointResponse { service_point }))
}

async fn delete_service_point(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    directory::delete_service_point(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Service point deleted successfully")))
}

// ============================================================================
// Reporting
// ============================================================================

async fn dashboard_stats(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
) -> Result<Json<DashboardResponse>> {
    let dashboard = reporting::dashboard(&state.db, ReportScope::Global, &DayWindow::today()).await?;
    Ok(Json(dashboard))
}

async fn export_report(
    State(state): State<AppState>,
    _auth: Authorized<AdminOnly>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let format = ReportFormat::parse(query.format.as_deref())?;
    let file = export::build_report(&state.db, &state.uploads, format, &DayWindow::today()).await?;
    attachment(file)
}
