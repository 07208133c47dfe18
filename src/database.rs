use sqlx::{PgPool, Pool, Postgres};

use crate::config::Config;

pub type Database = Pool<Postgres>;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    // Test the connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
