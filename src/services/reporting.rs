//! Read-only aggregation for dashboards and exports.
//!
//! Nothing here is cached: every figure is recomputed from the task table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
};

use crate::error::Result;
use crate::models::prelude::*;
use crate::schemas::{
    CleanerDayView, CompanyStats, CompanySummary, DashboardResponse, DayCounts, PointStatusView,
    PointSummary,
};
use crate::services::calendar::DayWindow;
use crate::services::tasks::in_company;
use crate::services::views::{self, TaskIncludes};

/// Rows a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Global,
    Company(i64),
}

impl ReportScope {
    fn points(&self) -> Select<ServicePoint> {
        match self {
            ReportScope::Global => ServicePoint::find(),
            ReportScope::Company(id) => {
                ServicePoint::find().filter(service_point::Column::CompanyId.eq(*id))
            }
        }
    }

    fn tasks(&self) -> Select<CleaningTask> {
        match self {
            ReportScope::Global => CleaningTask::find(),
            ReportScope::Company(id) => CleaningTask::find().filter(in_company(*id)),
        }
    }

    fn cleaners(&self) -> Select<User> {
        let query = User::find().filter(user::Column::Role.eq(UserRole::Cleaner));
        match self {
            ReportScope::Global => query,
            ReportScope::Company(id) => query.filter(user::Column::CompanyId.eq(*id)),
        }
    }
}

fn scheduled_within(query: Select<CleaningTask>, window: &DayWindow) -> Select<CleaningTask> {
    query
        .filter(cleaning_task::Column::ScheduledAt.gte(window.start))
        .filter(cleaning_task::Column::ScheduledAt.lt(window.end))
}

/// Point and task totals for one day
pub async fn day_counts<C: ConnectionTrait>(
    db: &C,
    scope: ReportScope,
    window: &DayWindow,
) -> Result<DayCounts> {
    let total_points = scope.points().count(db).await?;
    let today_total_tasks = scheduled_within(scope.tasks(), window).count(db).await?;
    let today_completed_tasks = scheduled_within(scope.tasks(), window)
        .filter(cleaning_task::Column::Status.eq(TaskStatus::Completed))
        .count(db)
        .await?;

    Ok(DayCounts {
        total_points,
        today_total_tasks,
        today_completed_tasks,
        today_pending_tasks: today_total_tasks.saturating_sub(today_completed_tasks),
    })
}

/// Per-point and per-cleaner state for one day plus the day's totals
pub async fn dashboard<C: ConnectionTrait>(
    db: &C,
    scope: ReportScope,
    window: &DayWindow,
) -> Result<DashboardResponse> {
    let points = scope
        .points()
        .order_by_asc(service_point::Column::Name)
        .all(db)
        .await?;
    let point_ids: Vec<i64> = points.iter().map(|p| p.id).collect();
    let summaries = views::summarize_points(db, &points, true).await?;

    // Latest-created task per point wins
    let point_tasks = scheduled_within(CleaningTask::find(), window)
        .filter(cleaning_task::Column::ServicePointId.is_in(point_ids.clone()))
        .order_by_desc(cleaning_task::Column::CreatedAt)
        .all(db)
        .await?;
    let point_tasks = views::task_views(
        db,
        point_tasks,
        TaskIncludes {
            point: false,
            point_company: false,
            cleaner: true,
        },
    )
    .await?;
    let mut latest = HashMap::new();
    for view in point_tasks {
        latest.entry(view.task.service_point_id).or_insert(view);
    }

    let assignments = CleanerAssignment::find()
        .filter(cleaner_assignment::Column::ServicePointId.is_in(point_ids))
        .all(db)
        .await?;
    let assignees = views::user_summaries(db, assignments.iter().map(|a| a.cleaner_id)).await?;
    let mut assigned: HashMap<i64, Vec<_>> = HashMap::new();
    for a in &assignments {
        if let Some(cleaner) = assignees.get(&a.cleaner_id) {
            assigned.entry(a.service_point_id).or_default().push(cleaner.clone());
        }
    }

    let service_points = summaries
        .into_iter()
        .map(|point| {
            let today_task = latest.remove(&point.id);
            PointStatusView {
                status: today_task
                    .as_ref()
                    .map(|t| t.task.status)
                    .unwrap_or(TaskStatus::Pending),
                assigned_cleaners: assigned.remove(&point.id).unwrap_or_default(),
                today_task,
                point,
            }
        })
        .collect();

    let cleaners = scope
        .cleaners()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?;
    let cleaner_ids: Vec<i64> = cleaners.iter().map(|c| c.id).collect();
    let companies = views::companies_by_id(db, cleaners.iter().filter_map(|c| c.company_id)).await?;

    let cleaner_tasks = scheduled_within(CleaningTask::find(), window)
        .filter(cleaning_task::Column::CleanerId.is_in(cleaner_ids))
        .order_by_asc(cleaning_task::Column::ScheduledAt)
        .all(db)
        .await?;
    let cleaner_tasks = views::task_views(
        db,
        cleaner_tasks,
        TaskIncludes {
            point: true,
            point_company: false,
            cleaner: false,
        },
    )
    .await?;
    let mut by_cleaner: HashMap<i64, Vec<_>> = HashMap::new();
    for view in cleaner_tasks {
        by_cleaner.entry(view.task.cleaner_id).or_default().push(view);
    }

    let cleaners = cleaners
        .into_iter()
        .map(|c| CleanerDayView {
            company: c
                .company_id
                .and_then(|id| companies.get(&id))
                .map(CompanySummary::from),
            today_tasks: by_cleaner.remove(&c.id).unwrap_or_default(),
            id: c.id,
            username: c.username,
        })
        .collect();

    Ok(DashboardResponse {
        service_points,
        cleaners,
        stats: day_counts(db, scope, window).await?,
    })
}

/// All-time totals for a company's tasks
pub async fn company_stats<C: ConnectionTrait>(db: &C, company_id: i64) -> Result<CompanyStats> {
    let scope = ReportScope::Company(company_id);

    let total_points = scope.points().count(db).await?;
    let total_tasks = scope.tasks().count(db).await?;
    let completed_tasks = scope
        .tasks()
        .filter(cleaning_task::Column::Status.eq(TaskStatus::Completed))
        .count(db)
        .await?;
    let pending_tasks = scope
        .tasks()
        .filter(cleaning_task::Column::Status.is_in(TaskStatus::OPEN))
        .count(db)
        .await?;

    Ok(CompanyStats {
        total_points,
        total_tasks,
        completed_tasks,
        pending_tasks,
        completion_rate: completion_rate(completed_tasks, total_tasks),
    })
}

/// Completed share as a percentage with one decimal
pub fn completion_rate(completed: u64, total: u64) -> String {
    if total == 0 {
        return "0".to_string();
    }
    format!("{:.1}", completed as f64 / total as f64 * 100.0)
}

// ============================================================================
// Export rows
// ============================================================================

/// One task flattened for spreadsheets and documents
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub point_name: String,
    pub point_type: String,
    pub address: String,
    pub cleaner: String,
    pub status: TaskStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Stored photo paths, named slots first then legacy entries
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportFilter {
    pub company_id: Option<i64>,
    pub window: Option<DayWindow>,
}

fn photo_paths(task: &cleaning_task::Model) -> Vec<String> {
    let mut paths: Vec<String> = [&task.photo_before, &task.photo_after, &task.photo_damage]
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    if let Some(legacy) = &task.photos {
        match serde_json::from_str::<Vec<String>>(legacy) {
            Ok(list) => {
                for path in list {
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
            Err(e) => tracing::debug!(task_id = task.id, error = %e, "Ignoring malformed photo list"),
        }
    }
    paths
}

/// Tasks matching `filter`, newest-updated first
pub async fn export_rows<C: ConnectionTrait>(db: &C, filter: ExportFilter) -> Result<Vec<ExportRow>> {
    let scope = match filter.company_id {
        Some(id) => ReportScope::Company(id),
        None => ReportScope::Global,
    };
    let mut query = scope.tasks().order_by_desc(cleaning_task::Column::UpdatedAt);
    if let Some(window) = &filter.window {
        query = scheduled_within(query, window);
    }
    let tasks = query.all(db).await?;

    let points: HashMap<i64, PointSummary> =
        views::point_summaries(db, tasks.iter().map(|t| t.service_point_id), false).await?;
    let cleaners = views::user_summaries(db, tasks.iter().map(|t| t.cleaner_id)).await?;

    Ok(tasks
        .iter()
        .map(|task| {
            let point = points.get(&task.service_point_id);
            ExportRow {
                point_name: point.map(|p| p.name.clone()).unwrap_or_default(),
                point_type: point
                    .map(|p| p.point_type.to_string())
                    .unwrap_or_default(),
                address: point.map(|p| p.address.clone()).unwrap_or_default(),
                cleaner: cleaners
                    .get(&task.cleaner_id)
                    .map(|c| c.username.clone())
                    .unwrap_or_default(),
                status: task.status,
                scheduled_at: task.scheduled_at,
                completed_at: task.completed_at,
                photos: photo_paths(task),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_rate() {
        assert_eq!(completion_rate(0, 0), "0");
        assert_eq!(completion_rate(1, 3), "33.3");
        assert_eq!(completion_rate(2, 2), "100.0");
    }

    #[test]
    fn test_photo_paths_merges_legacy_list() {
        let now = Utc::now();
        let task = cleaning_task::Model {
            id: 1,
            service_point_id: 1,
            cleaner_id: 1,
            status: TaskStatus::Completed,
            scheduled_at: None,
            generation_day: None,
            completed_at: Some(now),
            photos: Some(r#"["/uploads/a.jpg","/uploads/old.jpg"]"#.to_string()),
            photo_before: Some("/uploads/a.jpg".to_string()),
            photo_after: None,
            photo_damage: Some("/uploads/d.png".to_string()),
            notes: None,
            manager_notes: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(
            photo_paths(&task),
            vec!["/uploads/a.jpg", "/uploads/d.png", "/uploads/old.jpg"]
        );
    }
}
