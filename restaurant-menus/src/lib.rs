use std::env;

use diesel::{connection::SimpleConnection, Connection, SqliteConnection};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use tracing::debug;

pub mod error;
pub mod models;
pub mod schema;
pub mod seed;
pub mod store;

pub use error::StoreError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub const DEFAULT_DATABASE_URL: &str = "restaurant_menus.db";

/// Async handle over a SQLite connection; queries run on tokio's blocking pool.
pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;

/// `DATABASE_URL` from the environment (or `.env`), falling back to a file in
/// the working directory.
pub fn database_url() -> String {
    dotenv().ok();

    env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Opens `database_url` and applies any pending migrations.
///
/// `":memory:"` yields a private database that disappears with the connection.
pub fn connect(database_url: &str) -> Result<DbConnection, StoreError> {
    let mut conn = open(database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| StoreError::Migration(err.to_string()))?;
    Ok(SyncConnectionWrapper::new(conn))
}

/// Like [`connect`], but drops every table first so the schema starts empty.
pub fn connect_fresh(database_url: &str) -> Result<DbConnection, StoreError> {
    let mut conn = open(database_url)?;
    let reverted = conn
        .revert_all_migrations(MIGRATIONS)
        .map_err(|err| StoreError::Migration(err.to_string()))?;
    debug!(reverted = reverted.len(), "dropped schema");
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| StoreError::Migration(err.to_string()))?;
    Ok(SyncConnectionWrapper::new(conn))
}

fn open(database_url: &str) -> Result<SqliteConnection, StoreError> {
    let mut conn = SqliteConnection::establish(database_url)?;
    // SQLite leaves foreign keys off unless asked, per connection.
    conn.batch_execute("PRAGMA foreign_keys = ON")?;
    Ok(conn)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed;
    use crate::store::RestaurantStore;

    #[tokio::test]
    async fn test_memory_databases_are_isolated() {
        let mut first = connect(":memory:").unwrap();
        seed(&mut first).await.unwrap();

        let mut second = connect(":memory:").unwrap();
        assert_eq!(RestaurantStore::new(&mut first).count().await.unwrap(), 3);
        assert_eq!(RestaurantStore::new(&mut second).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_fresh_drops_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menus.db");
        let url = path.to_str().unwrap();

        {
            let mut conn = connect(url).unwrap();
            seed(&mut conn).await.unwrap();
        }
        {
            let mut conn = connect(url).unwrap();
            assert_eq!(RestaurantStore::new(&mut conn).count().await.unwrap(), 3);
        }

        let mut conn = connect_fresh(url).unwrap();
        assert_eq!(RestaurantStore::new(&mut conn).count().await.unwrap(), 0);
    }

    #[test]
    fn test_connect_reports_bad_path() {
        let result = connect("/nonexistent-dir/for/sure/menus.db");
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
