use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::PgConnection;

use super::steps::{self, MigrationStep, SchemaObject};

/// Schema objects the catalogue should have left behind but that are absent
/// or not shaped as expected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub missing_tables: Vec<String>,
    pub missing_columns: Vec<String>,
    /// Present, but not a nullable `text` column.
    pub mistyped_columns: Vec<String>,
    pub missing_indexes: Vec<String>,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.missing_tables.is_empty()
            && self.missing_columns.is_empty()
            && self.mistyped_columns.is_empty()
            && self.missing_indexes.is_empty()
    }
}

struct ColumnInfo {
    data_type: String,
    is_nullable: String,
}

/// Read-only: inspect the public schema and compare it with every step target.
pub async fn check(conn: &mut PgConnection) -> Result<VerifyReport, sqlx::Error> {
    let tables: HashSet<String> = sqlx::query_scalar::<_, String>(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = 'public'",
    )
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let columns: HashMap<(String, String), ColumnInfo> =
        sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT table_name::text, column_name::text, data_type::text, is_nullable::text
             FROM information_schema.columns
             WHERE table_schema = 'public'",
        )
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|(table, column, data_type, is_nullable)| {
            ((table, column), ColumnInfo { data_type, is_nullable })
        })
        .collect();

    let indexes: HashSet<String> = sqlx::query_scalar::<_, String>(
        "SELECT indexname::text FROM pg_indexes WHERE schemaname = 'public'",
    )
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let report = compare(steps::ALL, &tables, &columns, &indexes);
    if report.is_complete() {
        tracing::info!("All {} schema objects present", report.checked);
    } else {
        tracing::warn!(
            "Schema incomplete: {} tables, {} columns, {} indexes missing",
            report.missing_tables.len(),
            report.missing_columns.len() + report.mistyped_columns.len(),
            report.missing_indexes.len()
        );
    }
    Ok(report)
}

fn compare(
    steps: &[MigrationStep],
    tables: &HashSet<String>,
    columns: &HashMap<(String, String), ColumnInfo>,
    indexes: &HashSet<String>,
) -> VerifyReport {
    let mut report = VerifyReport {
        checked: steps.len(),
        ..Default::default()
    };

    for step in steps {
        match step.target {
            SchemaObject::Table { name } => {
                if !tables.contains(name) {
                    report.missing_tables.push(name.to_string());
                }
            }
            SchemaObject::Column { table, column } => {
                match columns.get(&(table.to_string(), column.to_string())) {
                    None => report.missing_columns.push(step.target.to_string()),
                    Some(info) if info.data_type != "text" || info.is_nullable != "YES" => {
                        report.mistyped_columns.push(format!(
                            "{} ({}, nullable: {})",
                            step.target, info.data_type, info.is_nullable
                        ))
                    }
                    Some(_) => {}
                }
            }
            SchemaObject::Index { name, .. } => {
                if !indexes.contains(name) {
                    report.missing_indexes.push(name.to_string());
                }
            }
        }
    }
    report
}
