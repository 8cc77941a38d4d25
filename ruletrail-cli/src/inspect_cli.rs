//! `ruletrail inspect` - tabulate a JSON-lines telemetry file

use anyhow::Result;
use ruletrail_core::telemetry::writer::read_records;
use serde_json::Value;
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled, Debug, PartialEq, Eq)]
struct TelemetryRow {
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Rules")]
    rules: usize,
}

fn text(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn to_row(record: &Value) -> TelemetryRow {
    let entity = [("repository", "repo"), ("artifact", "artifact"), ("pr", "pr")]
        .into_iter()
        .find_map(|(key, label)| text(record, key).map(|id| format!("{label}:{id}")))
        .unwrap_or_else(|| "-".to_string());

    TelemetryRow {
        level: text(record, "level").unwrap_or_else(|| "-".to_string()),
        project: text(record, "project").unwrap_or_else(|| "-".to_string()),
        entity,
        rules: record
            .get("rules")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
    }
}

pub fn run(file: &Path) -> Result<()> {
    let records = read_records(file)?;
    if records.is_empty() {
        println!("No telemetry records found.");
        return Ok(());
    }

    let rows: Vec<TelemetryRow> = records.iter().map(to_row).collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("Found {} records\n", rows.len());
    println!("{table}");
    Ok(())
}
