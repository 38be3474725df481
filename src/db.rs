use rocket_db_pools::Database;
use sqlx::PgPool;
use sqlx::migrate::Migrator;

#[derive(Database)]
#[database("geofeed_db")]
pub struct GeofeedDb(PgPool);

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending schema migrations.
///
/// Idempotent: SQLx tracks applied migrations and verifies checksums, so
/// startup aborts on drift instead of serving against a stale schema.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
