//! Scripted sync sessions.
//!
//! A script declares controls, groups and rules, then replays timed changes
//! through the coordinator. After the last step every window is allowed to
//! close and the resulting values, history and conflicts are printed.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use paramsync_core::modules::repository::{InMemorySyncGroupRepository, SyncGroupRepository};
use paramsync_core::sync::merge;
use paramsync_core::SyncCoordinator;
use paramsync_types::models::SyncConfig;
use paramsync_types::{
    ChangeSource, ParamValue, SyncConflict, SyncEvent, SyncGroup, SyncRule, SyncStatus,
    TransformDescriptor,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::controls::{build_store, display_value, read_json, ControlSpec};

#[derive(Debug, Deserialize)]
pub struct SyncScript {
    pub controls: Vec<ControlSpec>,
    pub groups: Vec<SyncGroup>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// Group id to built-in merge combinator name
    #[serde(default)]
    pub merge: HashMap<String, String>,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Deserialize)]
pub struct RuleSpec {
    pub group_id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub transform: TransformDescriptor,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Change {
        /// Pause before this change
        #[serde(default)]
        wait_ms: u64,
        control: String,
        value: serde_json::Value,
        #[serde(default)]
        source: ChangeSource,
    },
    Resolve {
        #[serde(default)]
        wait_ms: u64,
        /// Resolve the oldest pending conflict of this group
        resolve: String,
        value: serde_json::Value,
    },
}

#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub group: SyncGroup,
    pub status: SyncStatus,
    pub history: Vec<SyncEvent>,
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub values: BTreeMap<String, ParamValue>,
    pub groups: Vec<GroupReport>,
    pub conflicts: Vec<SyncConflict>,
}

pub async fn run_script(path: &Path, config: SyncConfig, json: bool) -> Result<()> {
    let script: SyncScript = read_json(path)?;
    let report = replay(script, config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

pub async fn replay(script: SyncScript, config: SyncConfig) -> Result<SyncReport> {
    let store = build_store(&script.controls)?;
    let types: HashMap<String, _> = script.controls.iter().map(|c| (c.id.clone(), c.control_type)).collect();
    let repository: Arc<dyn SyncGroupRepository> = Arc::new(InMemorySyncGroupRepository::new());
    let coordinator = SyncCoordinator::new(Arc::clone(&store), repository, config);

    for group in script.groups {
        coordinator.create_group(group).await?;
    }
    for rule in script.rules {
        coordinator.add_rule(SyncRule::new(rule.group_id, rule.source_id, rule.target_id, rule.transform))?;
    }
    for (group_id, name) in &script.merge {
        let combinator = merge::builtin(name).with_context(|| format!("Unknown merge combinator: {}", name))?;
        coordinator.set_merge_strategy(group_id, combinator)?;
    }

    for step in script.steps {
        match step {
            ScriptStep::Change { wait_ms, control, value, source } => {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                let ty = *types.get(&control).with_context(|| format!("Unknown control: {}", control))?;
                coordinator.handle_change(&control, ParamValue::from_loose(&value, ty), source).await?;
            },
            ScriptStep::Resolve { wait_ms, resolve, value } => {
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                let conflict = coordinator
                    .conflicts(Some(&resolve), Some(paramsync_types::ConflictStatus::Pending))
                    .into_iter()
                    .next()
                    .with_context(|| format!("No pending conflict in group {}", resolve))?;
                let ty = types.get(&conflict.control_id).copied();
                let value = ty.map_or(ParamValue::Null, |ty| ParamValue::from_loose(&value, ty));
                coordinator.resolve_conflict(&conflict.id, value, "script")?;
            },
        }
    }

    // Let every open window close.
    tokio::time::sleep(config.debounce() + Duration::from_millis(50)).await;

    let snapshot = store.snapshot();
    let values = snapshot.iter().map(|c| (c.id.clone(), c.value.clone())).collect();
    let mut groups = Vec::new();
    for group in coordinator.groups() {
        groups.push(GroupReport {
            status: coordinator.status(&group.id)?,
            history: coordinator.history(&group.id, None)?,
            group,
        });
    }
    let conflicts = coordinator.conflicts(None, None);
    coordinator.shutdown();

    Ok(SyncReport { values, groups, conflicts })
}

fn print_report(report: &SyncReport) {
    println!("{}", "Control values:".cyan().bold());
    for (id, value) in &report.values {
        println!("  {} = {}", id, display_value(value));
    }

    for group in &report.groups {
        println!(
            "\n{} {} ({}, {} event(s))",
            "Group".cyan().bold(),
            group.group.name,
            group.group.mode,
            group.history.len()
        );
        if group.history.is_empty() {
            continue;
        }
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["From", "To", "Old", "New", "Result"]);
        // Oldest first reads naturally in a terminal.
        for event in group.history.iter().rev() {
            let result = if event.propagated {
                Cell::new("applied").fg(Color::Green)
            } else {
                Cell::new(event.reason.as_deref().unwrap_or("skipped")).fg(Color::Yellow)
            };
            table.add_row(vec![
                Cell::new(&event.source_control_id),
                Cell::new(&event.control_id),
                Cell::new(display_value(&event.old_value)),
                Cell::new(display_value(&event.new_value)),
                result,
            ]);
        }
        println!("{table}");
    }

    if !report.conflicts.is_empty() {
        println!("\n{}", "Conflicts:".cyan().bold());
        for conflict in &report.conflicts {
            let values: Vec<String> = conflict
                .values
                .iter()
                .map(|v| format!("{}={}", v.control_id, display_value(&v.value)))
                .collect();
            println!("  {:?} in {}: {}", conflict.status, conflict.group_id, values.join(", "));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_replay_scripted_session() {
        let script: SyncScript = serde_json::from_value(json!({
            "controls": [
                {"id": "price", "type": "number", "value": 10},
                {"id": "priceCents", "type": "number", "value": 1000},
                {"id": "label", "type": "text", "value": "a"},
                {"id": "labelCopy", "type": "text"}
            ],
            "groups": [
                {"id": "prices", "name": "prices", "members": ["price", "priceCents"]},
                {"id": "labels", "name": "labels", "members": ["label", "labelCopy"],
                 "conflict_policy": "manual"}
            ],
            "rules": [
                {"group_id": "prices", "source_id": "price", "target_id": "priceCents",
                 "transform": {"kind": "scale", "factor": 100.0}}
            ],
            "steps": [
                {"control": "price", "value": "12.5"},
                {"control": "label", "value": "x"},
                {"control": "labelCopy", "value": "y"},
                {"wait_ms": 500, "resolve": "labels", "value": "z"}
            ]
        }))
        .unwrap();

        let report = replay(script, SyncConfig::default()).await.unwrap();
        assert_eq!(report.values["priceCents"], ParamValue::Number(1250.0));
        assert_eq!(report.values["labelCopy"], ParamValue::Text("z".into()));
        assert_eq!(report.conflicts.len(), 1);
        assert!(!report.conflicts[0].is_pending());
        assert_eq!(report.groups.len(), 2);
    }
}
