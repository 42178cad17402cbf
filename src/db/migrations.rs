use sqlx::{Pool, Postgres};
use tracing::info;

/// Run all pending database migrations
///
/// Creates the jobs, applications, stage_queue and approvals tables.
/// sqlx records applied versions, so this is safe to call on every start.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations...");

    // Embedded at compile time from ./migrations
    sqlx::migrate!("./migrations")
        .run(pool)
        .await?;

    info!("Database migrations completed successfully");
    Ok(())
}
