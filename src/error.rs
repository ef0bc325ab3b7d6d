use thiserror::Error;

/// Everything that can stop a migration run. All variants end up in the same
/// failed report; the split only makes the message say where it broke.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("could not start transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("step \"{description}\" failed: {source}")]
    Step {
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("could not list tables: {0}")]
    Introspect(#[source] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status \"{0}\"")]
pub struct UnknownStatus(pub String);
