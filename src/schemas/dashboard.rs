use serde::{Deserialize, Serialize};

use super::common::{CompanySummary, PointSummary, UserSummary};
use super::task::TaskView;
use crate::models::cleaning_task::TaskStatus;

/// A service point with today's state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointStatusView {
    #[serde(flatten)]
    pub point: PointSummary,
    /// Most recently created task scheduled today
    pub today_task: Option<TaskView>,
    pub status: TaskStatus,
    pub assigned_cleaners: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanerDayView {
    pub id: i64,
    pub username: String,
    pub company: Option<CompanySummary>,
    pub today_tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCounts {
    pub total_points: u64,
    pub today_total_tasks: u64,
    pub today_completed_tasks: u64,
    pub today_pending_tasks: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub service_points: Vec<PointStatusView>,
    pub cleaners: Vec<CleanerDayView>,
    pub stats: DayCounts,
}

/// All-time totals for one company
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStats {
    pub total_points: u64,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    /// PENDING plus IN_PROGRESS
    pub pending_tasks: u64,
    /// Percentage with one decimal, or "0" without tasks
    pub completion_rate: String,
}

#[derive(Debug, Serialize)]
pub struct CompanyStatsResponse {
    pub stats: CompanyStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}
