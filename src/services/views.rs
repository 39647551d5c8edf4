//! Batched loading of the related rows embedded in API payloads

use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::error::Result;
use crate::models::prelude::*;
use crate::schemas::{PointSummary, TaskView, UserSummary};

/// Which relations to embed in a [`TaskView`]
#[derive(Debug, Clone, Copy)]
pub struct TaskIncludes {
    pub point: bool,
    pub point_company: bool,
    pub cleaner: bool,
}

impl TaskIncludes {
    /// Point with company, no cleaner: what a cleaner sees
    pub const CLEANER_VIEW: TaskIncludes = TaskIncludes {
        point: true,
        point_company: true,
        cleaner: false,
    };

    /// Point and cleaner: what a manager sees
    pub const MANAGER_VIEW: TaskIncludes = TaskIncludes {
        point: true,
        point_company: false,
        cleaner: true,
    };
}

fn unique(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let set: HashSet<i64> = ids.into_iter().collect();
    set.into_iter().collect()
}

pub async fn companies_by_id<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, company::Model>> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Company::find()
        .filter(company::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}

/// Summaries for `points`, optionally with their company embedded
pub async fn summarize_points<C: ConnectionTrait>(
    db: &C,
    points: &[service_point::Model],
    with_company: bool,
) -> Result<Vec<PointSummary>> {
    let companies = if with_company {
        companies_by_id(db, points.iter().map(|p| p.company_id)).await?
    } else {
        HashMap::new()
    };

    Ok(points
        .iter()
        .map(|p| PointSummary::new(p, companies.get(&p.company_id)))
        .collect())
}

pub async fn point_summaries<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i64>,
    with_company: bool,
) -> Result<HashMap<i64, PointSummary>> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let points = ServicePoint::find()
        .filter(service_point::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(summarize_points(db, &points, with_company)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect())
}

pub async fn user_summaries<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, UserSummary>> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = User::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

/// Attach point and cleaner summaries to `tasks`, keeping their order
pub async fn task_views<C: ConnectionTrait>(
    db: &C,
    tasks: Vec<cleaning_task::Model>,
    includes: TaskIncludes,
) -> Result<Vec<TaskView>> {
    let points = if includes.point {
        point_summaries(
            db,
            tasks.iter().map(|t| t.service_point_id),
            includes.point_company,
        )
        .await?
    } else {
        HashMap::new()
    };

    let cleaners = if includes.cleaner {
        user_summaries(db, tasks.iter().map(|t| t.cleaner_id)).await?
    } else {
        HashMap::new()
    };

    Ok(tasks
        .into_iter()
        .map(|task| TaskView {
            service_point: points.get(&task.service_point_id).cloned(),
            cleaner: cleaners.get(&task.cleaner_id).cloned(),
            task,
        })
        .collect())
}

pub async fn task_view<C: ConnectionTrait>(
    db: &C,
    task: cleaning_task::Model,
    includes: TaskIncludes,
) -> Result<TaskView> {
    let mut views = task_views(db, vec![task.clone()], includes).await?;
    Ok(views.pop().unwrap_or(TaskView {
        task,
        service_point: None,
        cleaner: None,
    }))
}
