pub mod runner;
pub mod steps;
pub mod verify;

use sqlx::{Connection, PgConnection, Row};

use crate::config::Config;
use crate::error::MigrationError;

/// Listing printed after every run.
pub const PUBLIC_TABLES_QUERY: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public';";

/// Open the single connection a run works on. No pool: every statement goes
/// through this one session, in order.
pub async fn connect(config: &Config) -> Result<PgConnection, MigrationError> {
    let endpoint = config.endpoint();
    let options = config
        .connect_options()
        .map_err(|source| MigrationError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;

    let conn = PgConnection::connect_with(&options)
        .await
        .map_err(|source| MigrationError::Connect { endpoint, source })?;
    Ok(conn)
}

pub async fn list_public_tables(conn: &mut PgConnection) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(PUBLIC_TABLES_QUERY).fetch_all(&mut *conn).await?;

    // table_name is the sql_identifier domain, which sqlx does not map to String
    rows.iter()
        .map(|row| row.try_get_unchecked::<String, _>(0))
        .collect()
}
