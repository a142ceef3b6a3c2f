//! Database connection bootstrap
//!
//! One process-wide SeaORM pool, initialized once at startup. Services take
//! `&DatabaseConnection` so tests can hand them isolated databases instead.

use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect the global pool.
pub async fn init_db(database_url: String) -> Result<(), DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    if DB_POOL.set(db).is_err() {
        log::warn!("database pool was already initialized");
    }
    Ok(())
}

/// Connect the global pool from `DATABASE_URL`, reading `.env` for local
/// development.
pub async fn init_db_from_env() -> Result<(), DbErr> {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| DbErr::Custom("DATABASE_URL must be set".to_string()))?;
    init_db(url).await
}

/// The process-wide pool. Panics when called before [`init_db`].
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL
        .get()
        .expect("init_db must be called before get_db_pool")
}
