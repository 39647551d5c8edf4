//! Reset tenant data and load the demo dataset.
//!
//! Usage: `cargo run --bin seed` with `DATABASE_URL` pointing at the target database.

use feedbackatm::bootstrapper::init_tracing;
use feedbackatm::db;
use feedbackatm::services::seed::seed_demo_data;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let conn = db::connect().await?;
    let summary = seed_demo_data(&conn).await?;

    println!("Seed complete:");
    println!("  companies:      {}", summary.companies);
    println!("  service points: {}", summary.service_points);
    println!("  users:          {}", summary.users);
    println!("  assignments:    {}", summary.assignments);
    println!("  tasks:          {}", summary.tasks);

    Ok(())
}
