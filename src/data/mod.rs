pub mod models;
pub mod repositories;

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError};
use diesel::SqliteConnection;

use crate::engine::EngineResult;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const SCHEMA: &str = include_str!("schema.sql");

/// Per-connection pragmas applied when the pool hands out a connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool. `timeout` bounds both waiting for a pooled
/// connection and waiting on a locked database.
pub fn build_pool(database_url: &str, max_size: u32, timeout: Duration) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(timeout)
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout: timeout,
        }))
        .build(manager)
}

/// Creates any missing tables and indexes.
pub fn init_schema(pool: &DbPool) -> EngineResult<()> {
    let mut conn = pool.get()?;
    conn.batch_execute(SCHEMA)?;
    log::info!("database schema ready");
    Ok(())
}
