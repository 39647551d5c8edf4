//! Daily task generation
//!
//! Ensures every (cleaner, assigned point) pair has one task for a given day.
//! Safe to run repeatedly and concurrently: coverage is checked first, and
//! the insert itself skips rows that collide on the generation-day key.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};

use crate::error::Result;
use crate::models::prelude::*;
use crate::services::calendar::DayWindow;

/// Outcome of a generation run across all cleaners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub cleaners: usize,
    pub created: u64,
}

/// Create the missing tasks for one cleaner on `window.day`.
///
/// Returns the number of rows actually inserted.
pub async fn generate_for_cleaner<C: ConnectionTrait>(
    db: &C,
    cleaner_id: i64,
    window: &DayWindow,
) -> Result<u64> {
    let assigned: Vec<i64> = CleanerAssignment::find()
        .select_only()
        .column(cleaner_assignment::Column::ServicePointId)
        .filter(cleaner_assignment::Column::CleanerId.eq(cleaner_id))
        .into_tuple()
        .all(db)
        .await?;

    if assigned.is_empty() {
        return Ok(0);
    }

    let covered: HashSet<i64> = CleaningTask::find()
        .select_only()
        .column(cleaning_task::Column::ServicePointId)
        .filter(cleaning_task::Column::CleanerId.eq(cleaner_id))
        .filter(cleaning_task::Column::ServicePointId.is_in(assigned.clone()))
        .filter(cleaning_task::Column::ScheduledAt.gte(window.start))
        .filter(cleaning_task::Column::ScheduledAt.lt(window.end))
        .into_tuple::<i64>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let now = Utc::now();
    let missing: Vec<cleaning_task::ActiveModel> = assigned
        .into_iter()
        .filter(|point_id| !covered.contains(point_id))
        .map(|point_id| cleaning_task::ActiveModel {
            service_point_id: Set(point_id),
            cleaner_id: Set(cleaner_id),
            status: Set(TaskStatus::Pending),
            scheduled_at: Set(Some(window.start)),
            generation_day: Set(Some(window.day)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .collect();

    if missing.is_empty() {
        return Ok(0);
    }

    let created = CleaningTask::insert_many(missing)
        .on_conflict(
            OnConflict::columns([
                cleaning_task::Column::CleanerId,
                cleaning_task::Column::ServicePointId,
                cleaning_task::Column::GenerationDay,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if created > 0 {
        tracing::debug!(cleaner_id, created, day = %window.day, "Generated cleaning tasks");
    }

    Ok(created)
}

/// Run generation for every cleaner that has at least one assignment
pub async fn generate_all<C: ConnectionTrait>(db: &C, window: &DayWindow) -> Result<GenerationReport> {
    let cleaner_ids: Vec<i64> = CleanerAssignment::find()
        .select_only()
        .column(cleaner_assignment::Column::CleanerId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    let mut report = GenerationReport {
        cleaners: cleaner_ids.len(),
        created: 0,
    };

    for cleaner_id in cleaner_ids {
        report.created += generate_for_cleaner(db, cleaner_id, window).await?;
    }

    tracing::info!(
        cleaners = report.cleaners,
        created = report.created,
        day = %window.day,
        "Daily task generation finished"
    );

    Ok(report)
}
