use anyhow::Result;
use colored::Colorize;
use paramsync_core::query::{self, ValidationReport};
use std::path::Path;

use crate::controls::{display_value, load_store, read_template};

pub fn render(template: &str, controls: &Path, parameterized: bool, json: bool) -> Result<()> {
    let template = read_template(template)?;
    let snapshot = load_store(controls)?.snapshot();

    if parameterized {
        let rendered = query::parameterize(&template, &snapshot);
        if json {
            println!("{}", serde_json::to_string_pretty(&rendered)?);
            return Ok(());
        }
        println!("{}", rendered.sql);
        for (name, value) in &rendered.params {
            println!("  {} = {}", format!(":{}", name).cyan(), display_value(value));
        }
        print_unresolved(&rendered.unresolved);
    } else {
        let rendered = query::substitute(&template, &snapshot);
        if json {
            println!("{}", serde_json::to_string_pretty(&rendered)?);
            return Ok(());
        }
        println!("{}", rendered.sql);
        print_unresolved(&rendered.unresolved);
    }
    Ok(())
}

fn print_unresolved(unresolved: &[String]) {
    for reference in unresolved {
        println!("{} {} rendered as NULL", "!".yellow(), reference);
    }
}

pub fn validate(template: &str, controls: Option<&Path>, json: bool) -> Result<()> {
    let template = read_template(template)?;
    let report = match controls {
        Some(path) => query::validate_template(&template, &load_store(path)?.snapshot()),
        None => query::validate(&template),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_valid {
        anyhow::bail!("Query is not safe to execute");
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    if report.is_valid {
        println!("{} Query is valid", "✓".green());
    } else {
        println!("{} Query is invalid", "✗".red());
    }
    for error in &report.errors {
        println!("  {} {}", "error:".red().bold(), error);
    }
    for warning in &report.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
    println!("  {} parameter reference(s)", report.parameter_count);
}
