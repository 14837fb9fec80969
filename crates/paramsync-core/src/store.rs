//! Authoritative control-value store.
//!
//! All writes go through [`ControlStore::dispatch`]; readers take an
//! `Arc<ControlSnapshot>` that never changes underneath them. A write clones
//! the map only while older snapshots are still held (`Arc::make_mut`), so a
//! reader always sees either the state before a write or the state after it.

use parking_lot::RwLock;
use paramsync_types::{ChangeSource, ControlType, ControlValue, ParamValue, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Immutable view of every registered control.
#[derive(Debug, Clone, Default)]
pub struct ControlSnapshot {
    controls: HashMap<String, ControlValue>,
    version: u64,
}

impl ControlSnapshot {
    /// Build a detached snapshot, e.g. from a host-supplied registry.
    pub fn from_controls(controls: impl IntoIterator<Item = ControlValue>) -> Self {
        Self {
            controls: controls.into_iter().map(|c| (c.id.clone(), c)).collect(),
            version: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ControlValue> {
        self.controls.get(id)
    }

    pub fn value(&self, id: &str) -> Option<&ParamValue> {
        self.controls.get(id).map(|c| &c.value)
    }

    pub fn control_type(&self, id: &str) -> Option<ControlType> {
        self.controls.get(id).map(|c| c.control_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlValue> {
        self.controls.values()
    }

    /// Controls whose value is neither null nor empty.
    pub fn active(&self) -> impl Iterator<Item = &ControlValue> {
        self.controls.values().filter(|c| c.is_active())
    }

    /// Declared type of every control, as needed for URL decoding.
    pub fn types(&self) -> HashMap<String, ControlType> {
        self.controls.iter().map(|(id, c)| (id.clone(), c.control_type)).collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// Store mutations.
#[derive(Debug, Clone)]
pub enum StoreAction {
    Register { id: String, control_type: ControlType, value: ParamValue },
    SetValue { id: String, value: ParamValue, source: ChangeSource },
    Deregister { id: String },
    Clear,
}

/// Published after every successful value write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub control_id: String,
    pub old_value: ParamValue,
    pub new_value: ParamValue,
    pub source: ChangeSource,
    pub version: u64,
}

/// The single writer of control values.
pub struct ControlStore {
    state: RwLock<Arc<ControlSnapshot>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for ControlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { state: RwLock::new(Arc::new(ControlSnapshot::default())), changes }
    }

    /// Apply one action. Value writes return the published change.
    pub fn dispatch(&self, action: StoreAction) -> Result<Option<StoreChange>, StoreError> {
        let mut guard = self.state.write();
        let snapshot = Arc::make_mut(&mut *guard);

        let change = match action {
            StoreAction::Register { id, control_type, value } => {
                if snapshot.controls.contains_key(&id) {
                    return Err(StoreError::AlreadyRegistered { id });
                }
                let value = coerce(&id, value, control_type)?;
                tracing::debug!("[Store] Registered control {} ({})", id, control_type);
                snapshot.controls.insert(id.clone(), ControlValue::new(id, control_type, value));
                None
            },
            StoreAction::SetValue { id, value, source } => {
                let control = snapshot
                    .controls
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::ControlNotFound { id: id.clone() })?;
                let value = coerce(&id, value, control.control_type)?;
                let old_value = std::mem::replace(&mut control.value, value.clone());
                control.updated_at = chrono::Utc::now().timestamp_millis();
                Some(StoreChange {
                    control_id: id,
                    old_value,
                    new_value: value,
                    source,
                    version: snapshot.version.wrapping_add(1),
                })
            },
            StoreAction::Deregister { id } => {
                if snapshot.controls.remove(&id).is_none() {
                    return Err(StoreError::ControlNotFound { id });
                }
                tracing::debug!("[Store] Deregistered control {}", id);
                None
            },
            StoreAction::Clear => {
                snapshot.controls.clear();
                None
            },
        };

        snapshot.version = snapshot.version.wrapping_add(1);
        drop(guard);

        if let Some(change) = &change {
            // No subscribers is not an error.
            let _ = self.changes.send(change.clone());
        }
        Ok(change)
    }

    pub fn register(
        &self,
        id: impl Into<String>,
        control_type: ControlType,
        value: ParamValue,
    ) -> Result<(), StoreError> {
        self.dispatch(StoreAction::Register { id: id.into(), control_type, value }).map(|_| ())
    }

    pub fn set_value(
        &self,
        id: impl Into<String>,
        value: ParamValue,
        source: ChangeSource,
    ) -> Result<StoreChange, StoreError> {
        let id = id.into();
        self.dispatch(StoreAction::SetValue { id: id.clone(), value, source })?
            .ok_or(StoreError::ControlNotFound { id })
    }

    pub fn deregister(&self, id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(StoreAction::Deregister { id: id.into() }).map(|_| ())
    }

    /// Consistent view of all controls at this instant.
    pub fn snapshot(&self) -> Arc<ControlSnapshot> {
        Arc::clone(&self.state.read())
    }

    pub fn get(&self, id: &str) -> Option<ControlValue> {
        self.state.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().controls.contains_key(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

/// Fit a value to the declared control type, converting loose scalars.
fn coerce(id: &str, value: ParamValue, control_type: ControlType) -> Result<ParamValue, StoreError> {
    if value.fits(control_type) {
        return Ok(value);
    }
    let converted = ParamValue::from_loose(&value.to_json(), control_type);
    if converted.is_null() {
        return Err(StoreError::TypeMismatch {
            id: id.to_string(),
            expected: control_type,
            actual: value.type_name().to_string(),
        });
    }
    Ok(converted)
}
