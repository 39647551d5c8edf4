//! Cleaner to service point assignments

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};

use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::schemas::PointSummary;
use crate::services::views;

/// Replace every assignment of `cleaner_id` with `point_ids`.
///
/// Duplicate ids collapse to one row. Callers are expected to have checked
/// the cleaner and points already; this only rewrites the join table.
pub async fn replace_assignments<C: ConnectionTrait>(
    db: &C,
    cleaner_id: i64,
    point_ids: &[i64],
) -> Result<()> {
    CleanerAssignment::delete_many()
        .filter(cleaner_assignment::Column::CleanerId.eq(cleaner_id))
        .exec(db)
        .await?;

    let mut seen = HashSet::new();
    let now = Utc::now();
    let rows: Vec<cleaner_assignment::ActiveModel> = point_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .map(|point_id| cleaner_assignment::ActiveModel {
            cleaner_id: Set(cleaner_id),
            service_point_id: Set(point_id),
            created_at: Set(now),
        })
        .collect();

    if rows.is_empty() {
        return Ok(());
    }

    CleanerAssignment::insert_many(rows)
        .on_conflict(
            OnConflict::columns([
                cleaner_assignment::Column::CleanerId,
                cleaner_assignment::Column::ServicePointId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Ids from `point_ids` that name an existing service point
pub async fn existing_point_ids<C: ConnectionTrait>(
    db: &C,
    point_ids: &[i64],
) -> Result<HashSet<i64>> {
    if point_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let found: Vec<i64> = ServicePoint::find()
        .select_only()
        .column(service_point::Column::Id)
        .filter(service_point::Column::Id.is_in(point_ids.to_vec()))
        .into_tuple()
        .all(db)
        .await?;
    Ok(found.into_iter().collect())
}

/// Load a user and require the CLEANER role
pub async fn require_cleaner<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<user::Model> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.role != UserRole::Cleaner {
        return Err(AppError::BadRequest(
            "Can only assign points to cleaners".to_string(),
        ));
    }
    Ok(user)
}

/// Set a cleaner's full assignment set.
///
/// Tasks already generated for removed points stay as they are.
pub async fn assign_points<C>(db: &C, cleaner_id: i64, point_ids: &[i64]) -> Result<user::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let cleaner = require_cleaner(db, cleaner_id).await?;

    let known = existing_point_ids(db, point_ids).await?;
    if point_ids.iter().any(|id| !known.contains(id)) {
        return Err(AppError::BadRequest(
            "Some service points not found".to_string(),
        ));
    }

    let txn = db.begin().await?;
    replace_assignments(&txn, cleaner_id, point_ids).await?;
    txn.commit().await?;

    tracing::info!(cleaner_id, points = known.len(), "Assignments replaced");
    Ok(cleaner)
}

/// Service points assigned to a cleaner, with company summaries
pub async fn assigned_points<C: ConnectionTrait>(
    db: &C,
    cleaner_id: i64,
) -> Result<Vec<PointSummary>> {
    let point_ids: Vec<i64> = CleanerAssignment::find()
        .select_only()
        .column(cleaner_assignment::Column::ServicePointId)
        .filter(cleaner_assignment::Column::CleanerId.eq(cleaner_id))
        .into_tuple()
        .all(db)
        .await?;

    if point_ids.is_empty() {
        return Ok(Vec::new());
    }

    let points = ServicePoint::find()
        .filter(service_point::Column::Id.is_in(point_ids))
        .all(db)
        .await?;

    views::summarize_points(db, &points, true).await
}
