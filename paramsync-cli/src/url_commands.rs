use anyhow::Result;
use colored::Colorize;
use paramsync_core::url_state::{self, UrlDecodeResult};
use paramsync_types::models::UrlLimits;
use std::path::Path;

use crate::controls::{display_value, load_store};

pub fn encode(controls: &Path, base: Option<&str>, json: bool) -> Result<()> {
    let snapshot = load_store(controls)?.snapshot();
    let output = match base {
        Some(url) => url_state::merge_into_url(url, &snapshot)?,
        None => url_state::encode_query(&snapshot),
    };

    if json {
        println!("{}", serde_json::json!({ "url": output }));
    } else {
        println!("{}", output);
    }
    Ok(())
}

pub fn decode(input: &str, controls: &Path, limits: &UrlLimits, json: bool) -> Result<()> {
    let store = load_store(controls)?;
    let types = store.snapshot().types();
    let result = if input.contains("://") {
        url_state::decode_url(input, &types, limits)?
    } else {
        url_state::decode_query(input, &types, limits)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &UrlDecodeResult) {
    if result.values.is_empty() {
        println!("{}", "No control values in input.".yellow());
    }
    for (id, value) in &result.values {
        println!("{} {} = {}", "✓".green(), id, display_value(value));
    }
    for rejected in &result.rejected {
        println!("{} {} rejected: {:?}", "✗".red(), rejected.key, rejected.reason);
    }
}
