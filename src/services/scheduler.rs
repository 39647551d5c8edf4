//! Periodic task scheduler
//!
//! Runs background jobs on a fixed schedule. Add new jobs by implementing
//! the `PeriodicTask` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use super::calendar::{self, DayWindow};
use super::task_generator;
use super::tasks::{self, TaskScope};

/// Trait for periodic background tasks
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    /// Task name for logging
    fn name(&self) -> &'static str;

    /// Time to wait from `now` until the next run
    fn delay_until_next_run(&self, now: DateTime<Utc>) -> Duration;

    /// Whether to run once immediately when the scheduler starts
    fn run_at_startup(&self) -> bool {
        false
    }

    /// Execute the task
    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()>;
}

/// Start all periodic tasks
pub fn start_scheduler(db: Arc<DatabaseConnection>) {
    let tasks: Vec<Box<dyn PeriodicTask>> = vec![Box::new(DailyTaskGeneration)];

    for task in tasks {
        let db = db.clone();
        tokio::spawn(async move {
            run_task(task, db).await;
        });
    }

    tracing::info!("Periodic task scheduler started");
}

async fn run_once(task: &dyn PeriodicTask, db: &DatabaseConnection) {
    tracing::debug!(task = task.name(), "Running periodic task");

    match task.run(db).await {
        Ok(()) => {
            tracing::debug!(task = task.name(), "Periodic task completed");
        }
        Err(e) => {
            tracing::error!(task = task.name(), error = %e, "Periodic task failed");
        }
    }
}

/// Run a single task on its schedule
async fn run_task(task: Box<dyn PeriodicTask>, db: Arc<DatabaseConnection>) {
    if task.run_at_startup() {
        run_once(task.as_ref(), &db).await;
    }

    loop {
        let delay = task.delay_until_next_run(Utc::now());
        tracing::debug!(task = task.name(), delay_secs = delay.as_secs(), "Next run scheduled");
        tokio::time::sleep(delay).await;

        run_once(task.as_ref(), &db).await;
    }
}

// ============================================================================
// Daily Task Generation
// ============================================================================

/// Closes out the previous day and creates each cleaner's tasks for the new
/// one at UTC midnight
pub struct DailyTaskGeneration;

#[async_trait]
impl PeriodicTask for DailyTaskGeneration {
    fn name(&self) -> &'static str {
        "daily_task_generation"
    }

    fn delay_until_next_run(&self, now: DateTime<Utc>) -> Duration {
        // Small grace so the run lands after the date has rolled over
        calendar::until_next_midnight(now) + Duration::from_secs(1)
    }

    fn run_at_startup(&self) -> bool {
        true
    }

    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        tasks::sweep_overdue(db, TaskScope::All, Utc::now()).await?;
        task_generator::generate_all(db, &DayWindow::today()).await?;
        Ok(())
    }
}
