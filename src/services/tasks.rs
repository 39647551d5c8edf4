//! Cleaning task lifecycle
//!
//! Status transitions are single conditional updates: the write only lands
//! when the row still has the expected owner and status, so two concurrent
//! completions of the same task cannot both succeed.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
};

use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::schemas::{CompletionPhotos, CreateTaskRequest, TaskView, UpdateTaskRequest};
use crate::services::calendar::DayWindow;
use crate::services::task_generator;
use crate::services::views::{self, TaskIncludes};

/// Rows an overdue sweep may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    Cleaner(i64),
    Company(i64),
    All,
}

/// Number of tasks returned by the cleaner history view
pub const HISTORY_LIMIT: u64 = 50;

/// Filter matching tasks whose service point belongs to `company_id`
pub(crate) fn in_company(company_id: i64) -> SimpleExpr {
    cleaning_task::Column::ServicePointId.in_subquery(
        ServicePoint::find()
            .select_only()
            .column(service_point::Column::Id)
            .filter(service_point::Column::CompanyId.eq(company_id))
            .into_query(),
    )
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

// ============================================================================
// Overdue sweep
// ============================================================================

/// Mark open tasks scheduled before `now` as OVERDUE.
///
/// Tasks without a schedule never expire.
pub async fn sweep_overdue<C: ConnectionTrait>(
    db: &C,
    scope: TaskScope,
    now: DateTime<Utc>,
) -> Result<u64> {
    let mut query = CleaningTask::update_many()
        .set(cleaning_task::ActiveModel {
            status: Set(TaskStatus::Overdue),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(cleaning_task::Column::Status.is_in(TaskStatus::OPEN))
        .filter(cleaning_task::Column::ScheduledAt.lt(now));

    query = match scope {
        TaskScope::Cleaner(cleaner_id) => {
            query.filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        }
        TaskScope::Company(company_id) => query.filter(in_company(company_id)),
        TaskScope::All => query,
    };

    let result = query.exec(db).await?;
    if result.rows_affected > 0 {
        tracing::debug!(?scope, swept = result.rows_affected, "Marked tasks overdue");
    }
    Ok(result.rows_affected)
}

// ============================================================================
// Cleaner operations
// ============================================================================

/// Today's open tasks for a cleaner's assigned points.
///
/// Sweeps and generates first so the list is current without waiting for
/// the daily job.
pub async fn list_cleaner_today<C: ConnectionTrait>(
    db: &C,
    cleaner_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<TaskView>> {
    sweep_overdue(db, TaskScope::Cleaner(cleaner_id), now).await?;

    let window = DayWindow::containing(now);
    task_generator::generate_for_cleaner(db, cleaner_id, &window).await?;

    let assigned: Vec<i64> = CleanerAssignment::find()
        .select_only()
        .column(cleaner_assignment::Column::ServicePointId)
        .filter(cleaner_assignment::Column::CleanerId.eq(cleaner_id))
        .into_tuple()
        .all(db)
        .await?;

    if assigned.is_empty() {
        return Ok(Vec::new());
    }

    let mut tasks = CleaningTask::find()
        .filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        .filter(cleaning_task::Column::ServicePointId.is_in(assigned))
        .filter(cleaning_task::Column::ScheduledAt.gte(window.start))
        .filter(cleaning_task::Column::ScheduledAt.lt(window.end))
        .filter(cleaning_task::Column::Status.is_in([
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Overdue,
        ]))
        .all(db)
        .await?;

    tasks.sort_by_key(|t| (t.scheduled_at.is_none(), t.scheduled_at, t.status.priority()));

    views::task_views(db, tasks, TaskIncludes::CLEANER_VIEW).await
}

/// Most recently touched tasks of a cleaner
pub async fn history<C: ConnectionTrait>(db: &C, cleaner_id: i64) -> Result<Vec<TaskView>> {
    let tasks = CleaningTask::find()
        .filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        .order_by_desc(cleaning_task::Column::UpdatedAt)
        .limit(HISTORY_LIMIT)
        .all(db)
        .await?;

    views::task_views(db, tasks, TaskIncludes::CLEANER_VIEW).await
}

/// PENDING → IN_PROGRESS for the cleaner's own task
pub async fn start_task<C: ConnectionTrait>(
    db: &C,
    task_id: i64,
    cleaner_id: i64,
) -> Result<cleaning_task::Model> {
    let result = CleaningTask::update_many()
        .set(cleaning_task::ActiveModel {
            status: Set(TaskStatus::InProgress),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(cleaning_task::Column::Id.eq(task_id))
        .filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        .filter(cleaning_task::Column::Status.eq(TaskStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(
            "Task not found or already started".to_string(),
        ));
    }

    CleaningTask::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

/// Complete the cleaner's own PENDING or IN_PROGRESS task.
///
/// Notes are replaced; photo slots are only written when a photo was supplied.
pub async fn complete_task<C: ConnectionTrait>(
    db: &C,
    task_id: i64,
    cleaner_id: i64,
    notes: Option<String>,
    photos: &CompletionPhotos,
) -> Result<cleaning_task::Model> {
    let now = Utc::now();
    let slot = |photo: &Option<String>| match photo {
        Some(path) => Set(Some(path.clone())),
        None => NotSet,
    };

    let result = CleaningTask::update_many()
        .set(cleaning_task::ActiveModel {
            status: Set(TaskStatus::Completed),
            completed_at: Set(Some(now)),
            notes: Set(clean_notes(notes)),
            photo_before: slot(&photos.before),
            photo_after: slot(&photos.after),
            photo_damage: slot(&photos.damage),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(cleaning_task::Column::Id.eq(task_id))
        .filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        .filter(cleaning_task::Column::Status.is_in(TaskStatus::OPEN))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(
            "Task not found or already completed".to_string(),
        ));
    }

    tracing::info!(task_id, cleaner_id, "Task completed");

    CleaningTask::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

/// Complete today's task for a point, creating it first when none is open
pub async fn complete_by_point<C: ConnectionTrait>(
    db: &C,
    service_point_id: i64,
    cleaner_id: i64,
    notes: Option<String>,
    photos: &CompletionPhotos,
) -> Result<cleaning_task::Model> {
    if ServicePoint::find_by_id(service_point_id).one(db).await?.is_none() {
        return Err(AppError::NotFound("Service point not found".to_string()));
    }

    let now = Utc::now();
    let window = DayWindow::containing(now);

    let existing = CleaningTask::find()
        .filter(cleaning_task::Column::ServicePointId.eq(service_point_id))
        .filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        .filter(cleaning_task::Column::ScheduledAt.gte(window.start))
        .filter(cleaning_task::Column::ScheduledAt.lt(window.end))
        .filter(cleaning_task::Column::Status.is_in(TaskStatus::OPEN))
        .order_by_asc(cleaning_task::Column::CreatedAt)
        .one(db)
        .await?;

    let task = match existing {
        Some(task) => task,
        None => {
            tracing::debug!(service_point_id, cleaner_id, "No open task today, creating one");
            cleaning_task::ActiveModel {
                service_point_id: Set(service_point_id),
                cleaner_id: Set(cleaner_id),
                status: Set(TaskStatus::Pending),
                scheduled_at: Set(Some(window.start)),
                generation_day: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    complete_task(db, task.id, cleaner_id, notes, photos).await
}

// ============================================================================
// Manager operations
// ============================================================================

/// All tasks of a company, newest-updated first, after an overdue sweep
pub async fn list_company_tasks<C: ConnectionTrait>(
    db: &C,
    company_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<TaskView>> {
    sweep_overdue(db, TaskScope::Company(company_id), now).await?;

    let tasks = CleaningTask::find()
        .filter(in_company(company_id))
        .order_by_desc(cleaning_task::Column::UpdatedAt)
        .all(db)
        .await?;

    views::task_views(db, tasks, TaskIncludes::MANAGER_VIEW).await
}

async fn find_in_company<C: ConnectionTrait>(
    db: &C,
    task_id: i64,
    company_id: i64,
) -> Result<cleaning_task::Model> {
    CleaningTask::find_by_id(task_id)
        .filter(in_company(company_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found or not in your company".to_string()))
}

async fn is_assigned<C: ConnectionTrait>(db: &C, cleaner_id: i64, point_id: i64) -> Result<bool> {
    Ok(CleanerAssignment::find_by_id((cleaner_id, point_id))
        .one(db)
        .await?
        .is_some())
}

/// Set the manager comment; status is left alone
pub async fn add_manager_comment<C: ConnectionTrait>(
    db: &C,
    task_id: i64,
    company_id: i64,
    manager_notes: &str,
) -> Result<cleaning_task::Model> {
    let manager_notes = manager_notes.trim();
    if manager_notes.is_empty() {
        return Err(AppError::BadRequest("Comment is required".to_string()));
    }

    let task = find_in_company(db, task_id, company_id).await?;

    let mut active: cleaning_task::ActiveModel = task.into();
    active.manager_notes = Set(Some(manager_notes.to_string()));
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Create an ad hoc task for an existing (cleaner, point) assignment
pub async fn create_adhoc_task<C: ConnectionTrait>(
    db: &C,
    company_id: i64,
    req: &CreateTaskRequest,
) -> Result<cleaning_task::Model> {
    let point = ServicePoint::find_by_id(req.service_point_id)
        .filter(service_point::Column::CompanyId.eq(company_id))
        .one(db)
        .await?;
    if point.is_none() {
        return Err(AppError::NotFound(
            "Service Point not found in your company".to_string(),
        ));
    }

    let cleaner = User::find_by_id(req.cleaner_id)
        .filter(user::Column::Role.eq(UserRole::Cleaner))
        .one(db)
        .await?;
    if cleaner.is_none() {
        return Err(AppError::NotFound("Cleaner not found".to_string()));
    }

    if !is_assigned(db, req.cleaner_id, req.service_point_id).await? {
        return Err(AppError::BadRequest(
            "This Service Point is not assigned to the selected cleaner. Please assign it first."
                .to_string(),
        ));
    }

    let now = Utc::now();
    let task = cleaning_task::ActiveModel {
        service_point_id: Set(req.service_point_id),
        cleaner_id: Set(req.cleaner_id),
        status: Set(TaskStatus::Pending),
        scheduled_at: Set(req.scheduled_at),
        generation_day: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(task_id = task.id, company_id, "Ad hoc task created");
    Ok(task)
}

/// Edit an ad hoc task; the assignment is re-checked when the pair changes
pub async fn update_adhoc_task<C: ConnectionTrait>(
    db: &C,
    task_id: i64,
    company_id: i64,
    req: &UpdateTaskRequest,
) -> Result<cleaning_task::Model> {
    let task = find_in_company(db, task_id, company_id).await?;

    // COMPLETED is terminal
    if task.status == TaskStatus::Completed
        && req.status.is_some_and(|status| status != TaskStatus::Completed)
    {
        return Err(AppError::BadRequest(
            "Completed tasks cannot change status".to_string(),
        ));
    }

    if let (Some(point_id), Some(cleaner_id)) = (req.service_point_id, req.cleaner_id) {
        let changed = point_id != task.service_point_id || cleaner_id != task.cleaner_id;
        if changed && !is_assigned(db, cleaner_id, point_id).await? {
            return Err(AppError::BadRequest(
                "This Service Point is not assigned to the selected cleaner".to_string(),
            ));
        }
    }

    if let Some(point_id) = req.service_point_id.filter(|id| *id != task.service_point_id) {
        let in_scope = ServicePoint::find_by_id(point_id)
            .filter(service_point::Column::CompanyId.eq(company_id))
            .one(db)
            .await?;
        if in_scope.is_none() {
            return Err(AppError::NotFound(
                "Service Point not found in your company".to_string(),
            ));
        }
    }

    let rekeyed = req.service_point_id.is_some_and(|id| id != task.service_point_id)
        || req.cleaner_id.is_some_and(|id| id != task.cleaner_id)
        || req.scheduled_at.is_some();

    let previous_status = task.status;
    let mut active: cleaning_task::ActiveModel = task.into();
    if let Some(point_id) = req.service_point_id {
        active.service_point_id = Set(point_id);
    }
    if let Some(cleaner_id) = req.cleaner_id {
        active.cleaner_id = Set(cleaner_id);
    }
    if let Some(scheduled_at) = req.scheduled_at {
        active.scheduled_at = Set(scheduled_at);
    }
    if let Some(status) = req.status.filter(|status| *status != previous_status) {
        active.status = Set(status);
        if status == TaskStatus::Completed {
            active.completed_at = Set(Some(Utc::now()));
        }
    }
    // An edited pair or schedule no longer belongs to a generation day
    if rekeyed {
        active.generation_day = Set(None);
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

/// Delete a PENDING or OVERDUE task of the company
pub async fn delete_adhoc_task<C: ConnectionTrait>(
    db: &C,
    task_id: i64,
    company_id: i64,
) -> Result<()> {
    let result = CleaningTask::delete_many()
        .filter(cleaning_task::Column::Id.eq(task_id))
        .filter(cleaning_task::Column::Status.is_in(TaskStatus::DELETABLE))
        .filter(in_company(company_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound(
            "Task not found, not in your company, or cannot be deleted (only PENDING and OVERDUE tasks can be deleted)"
                .to_string(),
        ));
    }

    tracing::info!(task_id, company_id, "Task deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_notes() {
        assert_eq!(clean_notes(None), None);
        assert_eq!(clean_notes(Some("   ".to_string())), None);
        assert_eq!(clean_notes(Some(" wiped ".to_string())), Some("wiped".to_string()));
    }

    #[test]
    fn test_cleaner_view_order() {
        let mut keys = vec![
            (true, None, TaskStatus::Pending.priority()),
            (false, Some(2), TaskStatus::Pending.priority()),
            (false, Some(1), TaskStatus::Pending.priority()),
            (false, Some(1), TaskStatus::Overdue.priority()),
        ];
        keys.sort();
        assert_eq!(keys[0], (false, Some(1), 0));
        assert_eq!(keys[1], (false, Some(1), 2));
        assert_eq!(keys[2], (false, Some(2), 2));
        assert_eq!(keys[3], (true, None, 2));
    }
}
