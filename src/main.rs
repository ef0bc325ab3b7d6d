//! Bring the interviews database up to the schema used by appointments and
//! data change requests.
//!
//! Usage:
//!   entrevistes-migrate [--dry-run] [--strict] [--format text|json]
//!   entrevistes-migrate verify [--format text|json]
//!   entrevistes-migrate steps
//!
//! Environment variables (all optional):
//!   DB_HOST, DB_PORT, DB_NAME, DB_USER, DB_PASSWORD - connection fields,
//!     defaulting to localhost:5433/entrevistes as postgres/postgres
//!   DATABASE_URL - full connection string, overrides the fields above
//!   RUST_LOG     - log filter (default: info)

use std::fmt::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use entrevistes_migrate::config::Config;
use entrevistes_migrate::db::{
    self,
    runner::{self, MigrationReport, Outcome, RunMode},
    steps,
    verify::{self, VerifyReport},
};

#[derive(Parser)]
#[command(
    name = "entrevistes-migrate",
    about = "Apply the appointments and data change request schema to the interviews database"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Show the statements that would run without executing them
    #[arg(long)]
    dry_run: bool,

    /// Exit with status 1 when the migration is not applied
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,
}

#[derive(Subcommand)]
enum Command {
    /// Check that every column, table and index of the migration exists
    Verify,
    /// Print the migration steps without connecting
    Steps,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match args.command {
        Some(Command::Steps) => {
            let mut out = String::new();
            render_steps(&mut out)?;
            print!("{}", out);
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Verify) => {
            let config = Config::from_env()?;
            verify_schema(&config, args.format).await
        }
        None => {
            let config = Config::from_env()?;
            let mode = if args.dry_run {
                RunMode::DryRun
            } else {
                RunMode::Apply
            };

            let report = runner::run(&config, mode).await;
            print_report(&report, args.format)?;

            if args.strict && report.is_failed() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

async fn verify_schema(config: &Config, format: Format) -> anyhow::Result<ExitCode> {
    let mut conn = match db::connect(config).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("❌ Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    let result = verify::check(&mut conn).await;
    if let Err(e) = sqlx::Connection::close(conn).await {
        tracing::warn!("Failed to close connection cleanly: {}", e);
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            println!("❌ Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_verify_text(&report),
    }

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &MigrationReport, format: Format) -> anyhow::Result<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut out = String::new();
    render_report(report, &mut out)?;
    print!("{}", out);
    Ok(())
}

fn render_report(report: &MigrationReport, out: &mut impl Write) -> std::fmt::Result {
    match &report.outcome {
        Outcome::Failed { error } => return writeln!(out, "❌ Error: {}", error),
        Outcome::Committed { error } => {
            writeln!(out, "✅ Database updated successfully")?;
            return writeln!(out, "❌ Error: {}", error);
        }
        Outcome::Succeeded => {}
    }

    match report.mode {
        RunMode::Apply => writeln!(out, "✅ Database updated successfully")?,
        RunMode::DryRun => {
            writeln!(out, "Dry run: {} statements would be applied", report.steps.len())?;
            for step in &report.steps {
                writeln!(out, "\n-- {}\n{}", step.description, step.statement)?;
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "Tables in the database:")?;
    for table in &report.tables {
        writeln!(out, "  - {}", table)?;
    }
    Ok(())
}

fn print_verify_text(report: &VerifyReport) {
    if report.is_complete() {
        println!("✅ All {} schema objects are present", report.checked);
        return;
    }

    println!("❌ Schema is incomplete");
    let sections = [
        ("Missing tables", &report.missing_tables),
        ("Missing columns", &report.missing_columns),
        ("Columns that are not nullable text", &report.mistyped_columns),
        ("Missing indexes", &report.missing_indexes),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!("{}:", title);
        for item in items {
            println!("  - {}", item);
        }
    }
}

fn render_steps(out: &mut impl Write) -> std::fmt::Result {
    let mut current_group = None;
    for (n, step) in steps::ALL.iter().enumerate() {
        if current_group != Some(step.group) {
            if current_group.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "# {}", step.group)?;
            current_group = Some(step.group);
        }
        writeln!(out, "{:>2}. {}", n + 1, step.description)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(mode: RunMode, outcome: Outcome) -> MigrationReport {
        MigrationReport {
            mode,
            endpoint: "localhost:5433/entrevistes".into(),
            steps: Vec::new(),
            tables: vec!["pf".into(), "alumnes".into()],
            outcome,
            elapsed_ms: 0,
        }
    }

    fn render(report: &MigrationReport) -> String {
        let mut out = String::new();
        render_report(report, &mut out).unwrap();
        out
    }

    #[test]
    fn test_success_lists_tables() {
        let out = render(&report(RunMode::Apply, Outcome::Succeeded));
        assert_eq!(
            out,
            "✅ Database updated successfully\nTables in the database:\n  - pf\n  - alumnes\n"
        );
    }

    #[test]
    fn test_failure_shows_only_the_error() {
        let out = render(&report(
            RunMode::Apply,
            Outcome::Failed {
                error: "could not connect to localhost:5433/entrevistes: refused".into(),
            },
        ));
        assert_eq!(
            out,
            "❌ Error: could not connect to localhost:5433/entrevistes: refused\n"
        );
    }

    #[test]
    fn test_listing_failure_after_commit_still_reports_the_update() {
        let out = render(&report(
            RunMode::Apply,
            Outcome::Committed {
                error: "could not list tables: connection reset".into(),
            },
        ));
        assert_eq!(
            out,
            "✅ Database updated successfully\n❌ Error: could not list tables: connection reset\n"
        );
    }

    #[test]
    fn test_steps_listing_has_no_leading_blank_line() {
        let mut out = String::new();
        render_steps(&mut out).unwrap();

        assert!(out.starts_with("# pf columns\n 1. Add pf.municipi_naixement\n"), "{out}");
        assert!(out.contains("\n\n# alumnes columns\n10. Add alumnes.email\n"), "{out}");
        assert!(!out.contains("\n\n\n"));
        assert_eq!(out.matches("\n\n#").count(), 5);
        assert_eq!(out.lines().filter(|l| l.starts_with('#')).count(), 6);
    }
}
