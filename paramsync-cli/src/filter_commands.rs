use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use paramsync_core::filter::{apply_filters, derive_predicates, FilterTarget};
use paramsync_types::Record;
use std::path::Path;

use crate::controls::{load_store, read_json};

pub fn filter(records: &Path, targets: &Path, controls: &Path, json: bool) -> Result<()> {
    let records: Vec<Record> = read_json(records)?;
    let targets: Vec<FilterTarget> = read_json(targets)?;
    let snapshot = load_store(controls)?.snapshot();

    let predicates = derive_predicates(&targets, &snapshot);
    let kept = apply_filters(&records, &predicates);

    if json {
        println!("{}", serde_json::to_string_pretty(&kept)?);
        return Ok(());
    }

    for predicate in &predicates {
        println!("{} {} on {}", "•".cyan(), predicate.control_id, predicate.column);
    }
    if kept.is_empty() {
        println!("{}", "No records match.".yellow());
    } else {
        println!("{}", records_table(&kept));
    }
    println!("\n{} of {} records kept", kept.len(), records.len());
    Ok(())
}

/// Columns in first-seen order across all records.
fn records_table(records: &[Record]) -> Table {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(columns.clone());
    for record in records {
        table.add_row(columns.iter().map(|c| match record.get(*c) {
            Some(serde_json::Value::String(s)) => Cell::new(s),
            Some(v) => Cell::new(v.to_string()),
            None => Cell::new("-"),
        }));
    }
    table
}
