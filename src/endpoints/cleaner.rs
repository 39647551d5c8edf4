use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    middleware,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::middleware::{require_auth, Authorized, CleanerOnly};
use crate::models::cleaning_task;
use crate::schemas::{
    AssignedPointsResponse, CompleteTaskRequest, CompletionPhotos, TaskListResponse, TaskResponse,
};
use crate::services::uploads::{PendingPhoto, PhotoSlot};
use crate::services::views::{self, TaskIncludes};
use crate::services::{assignments, tasks};
use crate::state::AppState;

/// Room for three photos plus the text fields of the form
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create cleaner routes
pub fn cleaner_routes(state: AppState) -> Router {
    let body_limit = state.uploads.max_bytes() * 3 + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/history", get(history))
        .route("/assigned-points", get(assigned_points))
        .route("/tasks/{id}/start", put(start_task))
        .route("/tasks/{id}/complete", put(complete_task))
        .route("/complete-by-point/{service_point_id}", put(complete_by_point))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Completion payload: multipart with optional photos, or plain JSON notes
pub struct CompletionForm {
    pub notes: Option<String>,
    pub photos: Vec<PendingPhoto>,
}

impl FromRequest<AppState> for CompletionForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart, state).await;
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<CompleteTaskRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(CompletionForm {
                notes: body.notes,
                photos: Vec::new(),
            });
        }

        Ok(CompletionForm {
            notes: None,
            photos: Vec::new(),
        })
    }
}

/// Validate every photo before anything is written
async fn read_multipart(mut multipart: Multipart, state: &AppState) -> Result<CompletionForm> {
    let mut form = CompletionForm {
        notes: None,
        photos: Vec::new(),
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        if name == "notes" && file_name.is_none() {
            form.notes = Some(field.text().await?);
            continue;
        }

        let Some(file_name) = file_name else {
            continue;
        };
        let Some(slot) = PhotoSlot::from_field(&name) else {
            return Err(AppError::BadRequest(format!("Unexpected field: {}", name)));
        };
        if form.photos.iter().any(|p| p.slot == slot) {
            return Err(AppError::BadRequest(format!(
                "Only one {} file is allowed",
                slot.field_name()
            )));
        }

        let bytes = field.bytes().await?;
        // Browsers send an empty part for an untouched file input
        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }
        form.photos.push(state.uploads.validate(slot, content_type.as_deref(), bytes)?);
    }

    Ok(form)
}

async fn list_tasks(
    State(state): State<AppState>,
    auth: Authorized<CleanerOnly>,
) -> Result<Json<TaskListResponse>> {
    let tasks = tasks::list_cleaner_today(&state.db, auth.user_id(), Utc::now()).await?;
    Ok(Json(TaskListResponse { tasks }))
}

async fn history(
    State(state): State<AppState>,
    auth: Authorized<CleanerOnly>,
) -> Result<Json<TaskListResponse>> {
    let tasks = tasks::history(&state.db, auth.user_id()).await?;
    Ok(Json(TaskListResponse { tasks }))
}

async fn assigned_points(
    State(state): State<AppState>,
    auth: Authorized<CleanerOnly>,
) -> Result<Json<AssignedPointsResponse>> {
    let service_points = assignments::assigned_points(&state.db, auth.user_id()).await?;
    Ok(Json(AssignedPointsResponse {
        atms: Some(service_points.clone()),
        service_points,
    }))
}

async fn task_response(state: &AppState, task: cleaning_task::Model) -> Result<Json<TaskResponse>> {
    let task = views::task_view(&state.db, task, TaskIncludes::CLEANER_VIEW).await?;
    Ok(Json(TaskResponse { task }))
}

async fn start_task(
    State(state): State<AppState>,
    auth: Authorized<CleanerOnly>,
    Path(id): Path<i64>,
) -> Result<Json<TaskResponse>> {
    let task = tasks::start_task(&state.db, id, auth.user_id()).await?;
    task_response(&state, task).await
}

/// Remove freshly stored photos when the completion did not go through
async fn discard_on_error<T>(state: &AppState, photos: &CompletionPhotos, result: Result<T>) -> Result<T> {
    if result.is_err() {
        state.uploads.discard(photos).await;
    }
    result
}

async fn complete_task(
    State(state): State<AppState>,
    auth: Authorized<CleanerOnly>,
    Path(id): Path<i64>,
    form: CompletionForm,
) -> Result<Json<TaskResponse>> {
    let photos = state.uploads.persist(form.photos).await?;
    let result = tasks::complete_task(&state.db, id, auth.user_id(), form.notes, &photos).await;
    let task = discard_on_error(&state, &photos, result).await?;
    task_response(&state, task).await
}

async fn complete_by_point(
    State(state): State<AppState>,
    auth: Authorized<CleanerOnly>,
    Path(service_point_id): Path<i64>,
    form: CompletionForm,
) -> Result<Json<TaskResponse>> {
    let photos = state.uploads.persist(form.photos).await?;
    let result =
        tasks::complete_by_point(&state.db, service_point_id, auth.user_id(), form.notes, &photos)
            .await;
    let task = discard_on_error(&state, &photos, result).await?;
    task_response(&state, task).await
}
