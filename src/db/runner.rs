use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::{Connection, PgConnection};

use super::steps::{self, MigrationStep, StepGroup};
use crate::config::Config;
use crate::error::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Apply,
    /// Connect and list tables, but execute none of the steps.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    /// Every step was committed, but listing the tables afterwards failed.
    Committed { error: String },
    Failed { error: String },
}

impl Outcome {
    fn from_error(error: &MigrationError, steps: &[StepTiming]) -> Self {
        let error_text = error.to_string();
        // `steps` only holds applied entries once the transaction has committed
        let committed = steps.iter().any(|s| s.applied);
        match error {
            MigrationError::Introspect(_) if committed => Outcome::Committed { error: error_text },
            _ => Outcome::Failed { error: error_text },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub group: StepGroup,
    pub description: &'static str,
    pub statement: &'static str,
    pub applied: bool,
    pub elapsed_ms: u64,
}

impl StepTiming {
    fn applied(step: &MigrationStep, elapsed: Duration) -> Self {
        Self {
            group: step.group,
            description: step.description,
            statement: step.statement,
            applied: true,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn planned(step: &MigrationStep) -> Self {
        Self {
            group: step.group,
            description: step.description,
            statement: step.statement,
            applied: false,
            elapsed_ms: 0,
        }
    }
}

/// What a run did. Always produced, whether or not the run succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub mode: RunMode,
    pub endpoint: String,
    pub steps: Vec<StepTiming>,
    pub tables: Vec<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub elapsed_ms: u64,
}

impl MigrationReport {
    fn new(mode: RunMode, endpoint: String) -> Self {
        Self {
            mode,
            endpoint,
            steps: Vec::new(),
            tables: Vec::new(),
            outcome: Outcome::Succeeded,
            elapsed_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    /// True when the schema changes did not reach the database, or the run
    /// never got far enough to know.
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Succeeded => None,
            Outcome::Committed { error } | Outcome::Failed { error } => Some(error),
        }
    }
}

/// Connect, apply (or plan) the whole catalogue, list the public tables and
/// close. Failures are caught and recorded in the report; nothing is retried.
pub async fn run(config: &Config, mode: RunMode) -> MigrationReport {
    let started = Instant::now();
    let mut report = MigrationReport::new(mode, config.endpoint());

    tracing::info!("Connecting to {}", report.endpoint);
    if let Err(e) = execute(config, mode, &mut report).await {
        report.outcome = Outcome::from_error(&e, &report.steps);
        if report.is_failed() {
            tracing::error!("Migration failed: {}", e);
        } else {
            tracing::error!("Migration committed, but {}", e);
        }
    }

    report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    report
}

async fn execute(
    config: &Config,
    mode: RunMode,
    report: &mut MigrationReport,
) -> Result<(), MigrationError> {
    let mut conn = super::connect(config).await?;
    tracing::info!("Connected");

    let result = apply_then_list(&mut conn, mode, report).await;

    // Released on every path once acquired
    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection cleanly: {}", e);
    }
    result
}

async fn apply_then_list(
    conn: &mut PgConnection,
    mode: RunMode,
    report: &mut MigrationReport,
) -> Result<(), MigrationError> {
    report.steps = match mode {
        RunMode::Apply => apply(conn, steps::ALL).await?,
        RunMode::DryRun => plan(steps::ALL),
    };

    report.tables = super::list_public_tables(conn)
        .await
        .map_err(MigrationError::Introspect)?;
    Ok(())
}

/// Run `steps` in order inside a single transaction. Either every step is
/// committed or, on the first failure, none are.
pub async fn apply(
    conn: &mut PgConnection,
    steps: &[MigrationStep],
) -> Result<Vec<StepTiming>, MigrationError> {
    let mut tx = conn.begin().await.map_err(MigrationError::Begin)?;
    let mut timings = Vec::with_capacity(steps.len());
    let mut current_group = None;

    for step in steps {
        if current_group != Some(step.group) {
            tracing::info!("Updating {}...", step.group);
            current_group = Some(step.group);
        }
        tracing::debug!(statement = step.statement, "{}", step.description);

        let started = Instant::now();
        let result = sqlx::raw_sql(step.statement).execute(&mut *tx).await;
        if let Err(source) = result {
            if let Err(e) = tx.rollback().await {
                tracing::warn!("Rollback after failed step did not complete: {}", e);
            }
            return Err(MigrationError::Step {
                description: step.description,
                source,
            });
        }
        timings.push(StepTiming::applied(step, started.elapsed()));
    }

    tx.commit().await.map_err(MigrationError::Commit)?;
    tracing::info!("Committed {} steps", timings.len());
    Ok(timings)
}

/// The steps `apply` would run, without touching the database.
pub fn plan(steps: &[MigrationStep]) -> Vec<StepTiming> {
    for step in steps {
        tracing::info!(statement = step.statement, "[dry run] {}", step.description);
    }
    steps.iter().map(StepTiming::planned).collect()
}
