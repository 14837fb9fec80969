//! Sync coordinator: debounced propagation between grouped controls.
//!
//! Each group owns at most one debounce timer. A user change on a member
//! coalesces into the group's pending window and restarts the timer; when it
//! fires, the window is checked for competing writes, the winning value is
//! chosen by the group's policy and the mode rule pushes it to the other
//! members. Every attempted write is recorded in the group's history.

use paramsync_types::models::SyncConfig;
use paramsync_types::{
    ChangeSource, CompetingValue, ConflictPolicy, ConflictStatus, ParamValue, SyncConflict,
    SyncError, SyncEvent, SyncGroup, SyncMode, SyncPhase, SyncRule, SyncState, SyncStatus,
    TypedError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;

use super::history::History;
use super::merge::MergeFn;
use crate::modules::repository::SyncGroupRepository;
use crate::store::{ControlStore, StoreChange};

/// One member's latest write inside the current window.
#[derive(Debug, Clone)]
struct PendingChange {
    control_id: String,
    value: ParamValue,
    timestamp: i64,
    source: ChangeSource,
}

impl PendingChange {
    fn to_competing(&self) -> CompetingValue {
        CompetingValue {
            control_id: self.control_id.clone(),
            value: self.value.clone(),
            timestamp: self.timestamp,
            source: self.source,
        }
    }
}

struct GroupRuntime {
    group: SyncGroup,
    history: History,
    phase: SyncPhase,
    /// Coalesced per member, in order of each member's latest arrival
    pending: Vec<PendingChange>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl GroupRuntime {
    fn new(group: SyncGroup, history_limit: usize) -> Self {
        Self {
            group,
            history: History::new(history_limit),
            phase: SyncPhase::Idle,
            pending: Vec::new(),
            timer: None,
            generation: 0,
        }
    }

    /// Drop the pending window and its timer.
    fn cancel(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.pending.clear();
        self.phase = SyncPhase::Idle;
    }
}

#[derive(Default)]
struct State {
    groups: HashMap<String, GroupRuntime>,
    rules: HashMap<String, SyncRule>,
    /// Creation order
    conflicts: Vec<SyncConflict>,
    merge: HashMap<String, MergeFn>,
}

impl State {
    fn group_id_of(&self, control_id: &str) -> Option<String> {
        self.groups.values().find(|rt| rt.group.contains(control_id)).map(|rt| rt.group.id.clone())
    }

    /// Remove a group and everything that hangs off it.
    fn drop_group(&mut self, group_id: &str) -> bool {
        let Some(mut rt) = self.groups.remove(group_id) else {
            return false;
        };
        rt.cancel();
        self.rules.retain(|_, r| r.group_id != group_id);
        self.conflicts.retain(|c| c.group_id != group_id);
        self.merge.remove(group_id);
        true
    }

    /// Take `control_id` out of every group except `keep`.
    ///
    /// Returns groups to persist and ids of groups deleted because they no
    /// longer form a valid group.
    fn detach(&mut self, control_id: &str, keep: &str) -> (Vec<SyncGroup>, Vec<String>) {
        let owners: Vec<String> = self
            .groups
            .values()
            .filter(|rt| rt.group.id != keep && rt.group.contains(control_id))
            .map(|rt| rt.group.id.clone())
            .collect();

        let mut updated = Vec::new();
        let mut deleted = Vec::new();
        for group_id in owners {
            let still_valid = match self.groups.get_mut(&group_id) {
                Some(rt) => {
                    rt.cancel();
                    rt.group.members.retain(|m| m != control_id);
                    if rt.group.is_master(control_id) {
                        rt.group.master_id = None;
                    }
                    rt.group.validate().is_ok()
                },
                None => continue,
            };
            self.rules.retain(|_, r| {
                r.group_id != group_id || (r.source_id != control_id && r.target_id != control_id)
            });

            if still_valid {
                if let Some(rt) = self.groups.get(&group_id) {
                    tracing::info!("[Sync] Control {} moved out of group {}", control_id, rt.group.name);
                    updated.push(rt.group.clone());
                }
            } else {
                tracing::info!("[Sync] Group {} dissolved after losing {}", group_id, control_id);
                self.drop_group(&group_id);
                deleted.push(group_id);
            }
        }
        (updated, deleted)
    }
}

/// Owns sync groups, their rules, conflicts, history and timers.
pub struct SyncCoordinator {
    store: Arc<ControlStore>,
    repository: Arc<dyn SyncGroupRepository>,
    config: SyncConfig,
    state: Mutex<State>,
    this: Weak<SyncCoordinator>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<ControlStore>,
        repository: Arc<dyn SyncGroupRepository>,
        config: SyncConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            store,
            repository,
            config,
            state: Mutex::new(State::default()),
            this: this.clone(),
        })
    }

    pub fn store(&self) -> &Arc<ControlStore> {
        &self.store
    }

    /// Rehydrate group definitions from the repository.
    ///
    /// Invalid definitions and members already claimed by an earlier group
    /// are skipped with a warning. Returns the number of groups loaded.
    pub async fn load_groups(&self) -> Result<usize, SyncError> {
        let stored = self.repository.list_groups().await?;
        let mut state = self.state.lock();
        let mut loaded = 0;

        for group in stored {
            if let Err(e) = group.validate() {
                tracing::warn!("[Sync] Skipping stored group {}: {}", group.id, e);
                continue;
            }
            if let Some(member) = group.members.iter().find(|m| state.group_id_of(m).is_some()) {
                tracing::warn!(
                    "[Sync] Skipping stored group {}: {} already belongs to another group",
                    group.id,
                    member
                );
                continue;
            }
            state.groups.insert(group.id.clone(), GroupRuntime::new(group, self.config.history_limit));
            loaded += 1;
        }

        tracing::info!("[Sync] Loaded {} sync group(s)", loaded);
        Ok(loaded)
    }

    async fn persist(&self, updated: Vec<SyncGroup>, deleted: Vec<String>) -> Result<(), SyncError> {
        for id in deleted {
            self.repository.delete_group(&id).await?;
        }
        for group in updated {
            self.repository.save_group(&group).await?;
        }
        Ok(())
    }

    /// Register a new group. Members leave any group they were in.
    pub async fn create_group(&self, group: SyncGroup) -> Result<SyncGroup, SyncError> {
        group.validate()?;
        let (mut updated, deleted) = {
            let mut state = self.state.lock();
            if state.groups.contains_key(&group.id) {
                return Err(SyncError::InvalidGroup {
                    id: group.id.clone(),
                    message: "a group with this id already exists".to_string(),
                });
            }
            let mut updated = Vec::new();
            let mut deleted = Vec::new();
            for member in &group.members {
                let (u, d) = state.detach(member, &group.id);
                updated.retain(|g: &SyncGroup| !d.contains(&g.id));
                updated.extend(u);
                deleted.extend(d);
            }
            state
                .groups
                .insert(group.id.clone(), GroupRuntime::new(group.clone(), self.config.history_limit));
            (updated, deleted)
        };

        tracing::info!(
            "[Sync] Created group {} ({}, {} members)",
            group.name,
            group.mode,
            group.members.len()
        );
        updated.push(group.clone());
        self.persist(updated, deleted).await?;
        Ok(group)
    }

    /// Replace a group definition. Any pending window is dropped.
    pub async fn update_group(&self, group: SyncGroup) -> Result<SyncGroup, SyncError> {
        group.validate()?;
        let (mut updated, deleted) = {
            let mut state = self.state.lock();
            let Some(rt) = state.groups.get_mut(&group.id) else {
                return Err(SyncError::GroupNotFound { id: group.id.clone() });
            };
            rt.cancel();
            let last_sync_at = rt.group.last_sync_at;

            let mut updated = Vec::new();
            let mut deleted = Vec::new();
            for member in &group.members {
                let (u, d) = state.detach(member, &group.id);
                updated.retain(|g: &SyncGroup| !d.contains(&g.id));
                updated.extend(u);
                deleted.extend(d);
            }

            let members = group.members.clone();
            state.rules.retain(|_, r| {
                r.group_id != group.id || (members.contains(&r.source_id) && members.contains(&r.target_id))
            });
            if let Some(rt) = state.groups.get_mut(&group.id) {
                rt.group = SyncGroup { last_sync_at: group.last_sync_at.or(last_sync_at), ..group.clone() };
            }
            (updated, deleted)
        };

        tracing::info!("[Sync] Updated group {}", group.name);
        updated.push(group.clone());
        self.persist(updated, deleted).await?;
        Ok(group)
    }

    /// Delete a group with its rules, conflicts, history and timer.
    pub async fn delete_group(&self, group_id: &str) -> Result<(), SyncError> {
        if !self.state.lock().drop_group(group_id) {
            return Err(SyncError::GroupNotFound { id: group_id.to_string() });
        }
        tracing::info!("[Sync] Deleted group {}", group_id);
        self.repository.delete_group(group_id).await?;
        Ok(())
    }

    pub async fn add_member(&self, group_id: &str, control_id: &str) -> Result<SyncGroup, SyncError> {
        let (mut updated, deleted, group) = {
            let mut state = self.state.lock();
            let Some(rt) = state.groups.get(group_id) else {
                return Err(SyncError::GroupNotFound { id: group_id.to_string() });
            };
            if rt.group.contains(control_id) {
                return Ok(rt.group.clone());
            }
            let (updated, deleted) = state.detach(control_id, group_id);
            let Some(rt) = state.groups.get_mut(group_id) else {
                return Err(SyncError::GroupNotFound { id: group_id.to_string() });
            };
            rt.cancel();
            rt.group.members.push(control_id.to_string());
            (updated, deleted, rt.group.clone())
        };

        tracing::info!("[Sync] Added {} to group {}", control_id, group.name);
        updated.push(group.clone());
        self.persist(updated, deleted).await?;
        Ok(group)
    }

    /// Remove a member. A group left with fewer than two members, or without
    /// its master, is deleted; `Ok(None)` reports that.
    pub async fn remove_member(
        &self,
        group_id: &str,
        control_id: &str,
    ) -> Result<Option<SyncGroup>, SyncError> {
        let survivor = {
            let mut state = self.state.lock();
            let Some(rt) = state.groups.get_mut(group_id) else {
                return Err(SyncError::GroupNotFound { id: group_id.to_string() });
            };
            if !rt.group.contains(control_id) {
                return Err(SyncError::NotAMember {
                    group_id: group_id.to_string(),
                    control_id: control_id.to_string(),
                });
            }
            rt.cancel();
            rt.group.members.retain(|m| m != control_id);
            if rt.group.is_master(control_id) {
                rt.group.master_id = None;
            }
            let survivor = rt.group.validate().is_ok().then(|| rt.group.clone());
            state.rules.retain(|_, r| {
                r.group_id != group_id || (r.source_id != control_id && r.target_id != control_id)
            });
            if survivor.is_none() {
                state.drop_group(group_id);
            }
            survivor
        };

        match &survivor {
            Some(group) => {
                tracing::info!("[Sync] Removed {} from group {}", control_id, group.name);
                self.repository.save_group(group).await?;
            },
            None => {
                tracing::info!("[Sync] Group {} dissolved after losing {}", group_id, control_id);
                self.repository.delete_group(group_id).await?;
            },
        }
        Ok(survivor)
    }

    /// Enable or pause a group. Pausing cancels the pending window.
    pub async fn set_enabled(&self, group_id: &str, enabled: bool) -> Result<SyncGroup, SyncError> {
        let group = {
            let mut state = self.state.lock();
            let Some(rt) = state.groups.get_mut(group_id) else {
                return Err(SyncError::GroupNotFound { id: group_id.to_string() });
            };
            if !enabled {
                rt.cancel();
            }
            rt.group.enabled = enabled;
            rt.group.clone()
        };
        tracing::info!("[Sync] Group {} {}", group.name, if enabled { "enabled" } else { "paused" });
        self.repository.save_group(&group).await?;
        Ok(group)
    }

    /// Add (or replace) the transform for one source/target pair.
    pub fn add_rule(&self, rule: SyncRule) -> Result<SyncRule, SyncError> {
        let mut state = self.state.lock();
        let Some(rt) = state.groups.get(&rule.group_id) else {
            return Err(SyncError::GroupNotFound { id: rule.group_id.clone() });
        };
        for control_id in [&rule.source_id, &rule.target_id] {
            if !rt.group.contains(control_id) {
                return Err(SyncError::NotAMember {
                    group_id: rule.group_id.clone(),
                    control_id: control_id.clone(),
                });
            }
        }
        if rule.source_id == rule.target_id {
            return Err(SyncError::InvalidGroup {
                id: rule.group_id.clone(),
                message: "a rule needs distinct source and target controls".to_string(),
            });
        }

        state.rules.retain(|_, r| {
            !(r.group_id == rule.group_id && r.source_id == rule.source_id && r.target_id == rule.target_id)
        });
        state.rules.insert(rule.id.clone(), rule.clone());
        tracing::debug!("[Sync] Rule {} -> {} in {}", rule.source_id, rule.target_id, rule.group_id);
        Ok(rule)
    }

    pub fn remove_rule(&self, rule_id: &str) -> Result<SyncRule, SyncError> {
        self.state
            .lock()
            .rules
            .remove(rule_id)
            .ok_or_else(|| SyncError::RuleNotFound { id: rule_id.to_string() })
    }

    pub fn rules(&self, group_id: &str) -> Vec<SyncRule> {
        let mut rules: Vec<SyncRule> =
            self.state.lock().rules.values().filter(|r| r.group_id == group_id).cloned().collect();
        rules.sort_by(|a, b| (&a.source_id, &a.target_id).cmp(&(&b.source_id, &b.target_id)));
        rules
    }

    /// Register the combinator used by the `merge` policy of a group.
    pub fn set_merge_strategy(&self, group_id: &str, merge: MergeFn) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        if !state.groups.contains_key(group_id) {
            return Err(SyncError::GroupNotFound { id: group_id.to_string() });
        }
        state.merge.insert(group_id.to_string(), merge);
        Ok(())
    }

    /// Write a value and, for user changes on an enabled group member,
    /// (re)start the group's debounce window.
    pub async fn handle_change(
        &self,
        control_id: &str,
        value: ParamValue,
        source: ChangeSource,
    ) -> Result<StoreChange, TypedError> {
        let change = self.store.set_value(control_id, value, source)?;
        if source != ChangeSource::User {
            return Ok(change);
        }

        let mut state = self.state.lock();
        let Some(group_id) = state.group_id_of(control_id) else {
            return Ok(change);
        };
        let Some(rt) = state.groups.get_mut(&group_id) else {
            return Ok(change);
        };
        if !rt.group.enabled {
            return Ok(change);
        }

        rt.pending.retain(|p| p.control_id != control_id);
        rt.pending.push(PendingChange {
            control_id: control_id.to_string(),
            value: change.new_value.clone(),
            timestamp: now_ms(),
            source,
        });
        rt.phase = SyncPhase::PendingPropagation;
        self.schedule(rt);

        tracing::debug!(
            "[Sync] {} changed, group {} pending ({} member(s) in window)",
            control_id,
            rt.group.name,
            rt.pending.len()
        );
        Ok(change)
    }

    /// Restart the group's timer; the previous one is cancelled.
    fn schedule(&self, rt: &mut GroupRuntime) {
        if let Some(handle) = rt.timer.take() {
            handle.abort();
        }
        rt.generation = rt.generation.wrapping_add(1);
        let generation = rt.generation;
        let group_id = rt.group.id.clone();
        let delay = self.config.debounce();
        let this = self.this.clone();

        rt.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(coordinator) = this.upgrade() {
                coordinator.on_timer(&group_id, generation).await;
            }
        }));
    }

    async fn on_timer(&self, group_id: &str, generation: u64) {
        let persist = {
            let mut state = self.state.lock();
            // Detached here, so a restart after this point cannot abort the save below.
            match state.groups.get_mut(group_id) {
                Some(rt) if rt.generation == generation && rt.group.enabled => rt.timer = None,
                _ => return,
            }
            self.run_window(&mut state, group_id)
        };
        if let Some(group) = persist {
            if let Err(e) = self.repository.save_group(&group).await {
                tracing::warn!("[Sync] Failed to persist group {}: {}", group_id, e);
            }
        }
    }

    /// Propagate the pending window now instead of waiting for the timer.
    pub async fn flush(&self, group_id: &str) -> Result<(), SyncError> {
        let persist = {
            let mut state = self.state.lock();
            let Some(rt) = state.groups.get_mut(group_id) else {
                return Err(SyncError::GroupNotFound { id: group_id.to_string() });
            };
            if let Some(handle) = rt.timer.take() {
                handle.abort();
            }
            rt.generation = rt.generation.wrapping_add(1);
            if !rt.group.enabled {
                return Ok(());
            }
            self.run_window(&mut state, group_id)
        };
        if let Some(group) = persist {
            self.repository.save_group(&group).await?;
        }
        Ok(())
    }

    /// Close the group's window: detect conflicts, pick a value, propagate.
    /// Returns the group when its definition changed (last sync time).
    fn run_window(&self, state: &mut State, group_id: &str) -> Option<SyncGroup> {
        let State { groups, rules, conflicts, merge } = state;
        let rt = groups.get_mut(group_id)?;
        let pending = std::mem::take(&mut rt.pending);
        let Some(last) = pending.last().cloned() else {
            rt.phase = SyncPhase::Idle;
            return None;
        };
        rt.phase = SyncPhase::Propagating;

        let competing = pending.len() >= 2 && pending.iter().any(|p| p.value != last.value);
        let decision = if competing && rt.group.mode.detects_conflicts() {
            let mut conflict = SyncConflict::new(
                &rt.group.id,
                &last.control_id,
                pending.iter().map(PendingChange::to_competing).collect(),
            );
            tracing::warn!(
                "[Sync] Conflict in group {}: {} competing value(s), policy {}",
                rt.group.name,
                conflict.values.len(),
                rt.group.conflict_policy
            );

            let decision = decide(&rt.group, &conflict, merge.get(group_id));
            if let Some((_, value)) = &decision {
                conflict.resolve(value.clone(), rt.group.conflict_policy.to_string());
            }
            conflicts.push(conflict);
            decision
        } else {
            Some((Some(last.control_id.clone()), last.value.clone()))
        };

        let propagated = match decision {
            Some((origin, value)) => {
                propagate(&self.store, rt, rules, origin.as_deref(), &last.control_id, &value);
                rt.group.last_sync_at = Some(now_ms());
                true
            },
            None => false,
        };
        rt.phase = SyncPhase::Idle;
        propagated.then(|| rt.group.clone())
    }

    /// Resolve a conflict. The first resolution propagates the value once;
    /// repeating it is a no-op that returns the terminal record.
    pub fn resolve_conflict(
        &self,
        conflict_id: &str,
        value: ParamValue,
        resolver: &str,
    ) -> Result<SyncConflict, SyncError> {
        let mut state = self.state.lock();
        let State { groups, rules, conflicts, .. } = &mut *state;
        let conflict = conflicts
            .iter_mut()
            .find(|c| c.id == conflict_id)
            .ok_or_else(|| SyncError::ConflictNotFound { id: conflict_id.to_string() })?;

        if !conflict.resolve(value.clone(), resolver) {
            return Ok(conflict.clone());
        }
        let resolved = conflict.clone();
        tracing::info!("[Sync] Conflict {} resolved by {}", conflict_id, resolver);

        if let Some(rt) = groups.get_mut(&resolved.group_id) {
            if rt.group.enabled {
                rt.phase = SyncPhase::Propagating;
                propagate(&self.store, rt, rules, None, &resolved.control_id, &value);
                rt.group.last_sync_at = Some(now_ms());
                rt.phase = if rt.pending.is_empty() {
                    SyncPhase::Idle
                } else {
                    SyncPhase::PendingPropagation
                };
            }
        }
        Ok(resolved)
    }

    /// Mark a conflict ignored. Idempotent; never propagates.
    pub fn ignore_conflict(&self, conflict_id: &str) -> Result<SyncConflict, SyncError> {
        let mut state = self.state.lock();
        let conflict = state
            .conflicts
            .iter_mut()
            .find(|c| c.id == conflict_id)
            .ok_or_else(|| SyncError::ConflictNotFound { id: conflict_id.to_string() })?;
        if conflict.ignore() {
            tracing::info!("[Sync] Conflict {} ignored", conflict_id);
        }
        Ok(conflict.clone())
    }

    pub fn status(&self, group_id: &str) -> Result<SyncStatus, SyncError> {
        let state = self.state.lock();
        let rt = state
            .groups
            .get(group_id)
            .ok_or_else(|| SyncError::GroupNotFound { id: group_id.to_string() })?;
        Ok(SyncStatus {
            group_id: group_id.to_string(),
            state: if rt.group.enabled { SyncState::Active } else { SyncState::Paused },
            phase: rt.phase,
            pending_conflicts: state
                .conflicts
                .iter()
                .filter(|c| c.group_id == group_id && c.is_pending())
                .count(),
            last_sync_at: rt.group.last_sync_at,
            history_len: rt.history.len(),
        })
    }

    /// Most recent events first.
    pub fn history(&self, group_id: &str, limit: Option<usize>) -> Result<Vec<SyncEvent>, SyncError> {
        let state = self.state.lock();
        let rt = state
            .groups
            .get(group_id)
            .ok_or_else(|| SyncError::GroupNotFound { id: group_id.to_string() })?;
        Ok(rt.history.recent(limit))
    }

    /// Conflicts in creation order, optionally narrowed by group and status.
    pub fn conflicts(&self, group_id: Option<&str>, status: Option<ConflictStatus>) -> Vec<SyncConflict> {
        self.state
            .lock()
            .conflicts
            .iter()
            .filter(|c| group_id.map_or(true, |g| c.group_id == g))
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect()
    }

    pub fn groups(&self) -> Vec<SyncGroup> {
        let mut groups: Vec<SyncGroup> =
            self.state.lock().groups.values().map(|rt| rt.group.clone()).collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        groups
    }

    pub fn group(&self, group_id: &str) -> Option<SyncGroup> {
        self.state.lock().groups.get(group_id).map(|rt| rt.group.clone())
    }

    pub fn group_of(&self, control_id: &str) -> Option<SyncGroup> {
        let state = self.state.lock();
        let id = state.group_id_of(control_id)?;
        state.groups.get(&id).map(|rt| rt.group.clone())
    }

    /// Cancel every timer and pending window.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        for rt in state.groups.values_mut() {
            rt.cancel();
        }
        tracing::info!("[Sync] Coordinator stopped");
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        for rt in self.state.get_mut().groups.values_mut() {
            if let Some(handle) = rt.timer.take() {
                handle.abort();
            }
        }
    }
}

/// Pick the value a conflict settles on, with the control it is treated as
/// coming from. `None` leaves the conflict pending.
fn decide(
    group: &SyncGroup,
    conflict: &SyncConflict,
    merge: Option<&MergeFn>,
) -> Option<(Option<String>, ParamValue)> {
    let latest = || conflict.latest().map(|w| (Some(w.control_id.clone()), w.value.clone()));

    match group.conflict_policy {
        ConflictPolicy::LatestWins => latest(),
        ConflictPolicy::MasterWins => {
            match group.master_id.as_deref().and_then(|m| conflict.value_from(m)) {
                Some(master) => Some((Some(master.control_id.clone()), master.value.clone())),
                None => latest(),
            }
        },
        ConflictPolicy::Manual => None,
        ConflictPolicy::Merge => match merge {
            Some(merge) => Some((None, merge(&conflict.values))),
            None => {
                tracing::warn!(
                    "[Sync] Group {} uses merge without a combinator, falling back to latest",
                    group.name
                );
                latest()
            },
        },
    }
}

/// Push `value` from `origin` to the other members, or to every member when
/// there is no single origin (merged or externally resolved values).
/// `rule_source` selects the transform rules.
fn propagate(
    store: &ControlStore,
    rt: &mut GroupRuntime,
    rules: &HashMap<String, SyncRule>,
    origin: Option<&str>,
    rule_source: &str,
    value: &ParamValue,
) {
    let GroupRuntime { group, history, .. } = rt;
    let source_id = origin.unwrap_or(rule_source);
    let current = |id: &str| store.get(id).map(|c| c.value).unwrap_or_default();

    if let Some(origin) = origin {
        if group.mode == SyncMode::MasterSlave && !group.is_master(origin) {
            for target in group.others(origin) {
                history.push(
                    SyncEvent::skipped(
                        &group.id,
                        origin,
                        target,
                        current(target),
                        value.clone(),
                        "only the master control propagates in master_slave mode",
                    )
                    .with_source(ChangeSource::User),
                );
            }
            tracing::debug!("[Sync] Change from slave {} recorded, not propagated", origin);
            return;
        }
    }

    let mut applied = 0usize;
    for target in group.members.iter().filter(|m| Some(m.as_str()) != origin) {
        let rule = rules.values().find(|r| r.group_id == group.id && r.matches(rule_source, target));
        let outgoing = match rule {
            Some(rule) => match rule.transform.apply(value) {
                Some(v) => v,
                None => {
                    history.push(SyncEvent::skipped(
                        &group.id,
                        source_id,
                        target,
                        current(target),
                        value.clone(),
                        format!("transform {:?} does not apply to a {} value", rule.transform, value.type_name()),
                    ));
                    continue;
                },
            },
            None => value.clone(),
        };

        match store.set_value(target.as_str(), outgoing.clone(), ChangeSource::Sync) {
            Ok(change) => {
                applied += 1;
                history.push(SyncEvent::applied(
                    &group.id,
                    source_id,
                    target,
                    change.old_value,
                    change.new_value,
                ));
            },
            Err(e) => {
                tracing::warn!("[Sync] Could not write {} in group {}: {}", target, group.name, e);
                history.push(SyncEvent::skipped(
                    &group.id,
                    source_id,
                    target,
                    current(target),
                    outgoing,
                    e.to_string(),
                ));
            },
        }
    }

    tracing::info!(
        "[Sync] Propagated {} from {} to {} member(s) of {}",
        value.type_name(),
        source_id,
        applied,
        group.name
    );
}
