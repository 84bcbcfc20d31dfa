//! Database connection utilities.

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

/// Creates a Postgres pool for `database_url`.
///
/// Connections are opened on first use, so the server starts even when the
/// database is briefly unavailable. Acquiring a connection gives up after five
/// seconds.
pub fn connect_pg_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
}
