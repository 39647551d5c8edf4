use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{de_double_option, PointSummary, UserSummary};
use crate::models::cleaning_task::{self, TaskStatus};

/// A task with the point and cleaner it refers to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: cleaning_task::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_point: Option<PointSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaner: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: TaskView,
}

/// Photo paths captured for a completion, one per named slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionPhotos {
    pub before: Option<String>,
    pub after: Option<String>,
    pub damage: Option<String>,
}

/// Cleaner input for completing a task
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCommentRequest {
    pub manager_notes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub service_point_id: i64,
    pub cleaner_id: i64,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub service_point_id: Option<i64>,
    #[serde(default)]
    pub cleaner_id: Option<i64>,
    /// Absent leaves the schedule alone, `null` clears it
    #[serde(default, deserialize_with = "de_double_option")]
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}
