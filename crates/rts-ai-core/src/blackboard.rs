use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BbType, BbValue, ValueKind};

/// A blackboard that several agents read through (e.g. faction-wide state).
pub type SharedBlackboard = Rc<RefCell<Blackboard>>;

/// Upper bound on parent hops, so an accidental parent cycle degrades to a miss.
const MAX_PARENT_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum BlackboardEvent {
    Added { key: String, value: BbValue },
    Changed { key: String, old: BbValue, new: BbValue },
    Removed { key: String, old: BbValue },
}

impl BlackboardEvent {
    pub fn key(&self) -> &str {
        match self {
            BlackboardEvent::Added { key, .. }
            | BlackboardEvent::Changed { key, .. }
            | BlackboardEvent::Removed { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarMeta {
    pub kind: Option<ValueKind>,
    pub description: String,
}

/// Plain-data capture of a blackboard's local state (parent link and observers excluded).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlackboardSnapshot {
    pub values: BTreeMap<String, BbValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: BTreeMap<String, VarMeta>,
}

type Observer = Box<dyn FnMut(&BlackboardEvent)>;

/// Persistent per-agent key/value store with read fallback to an optional parent.
///
/// Writes always land in the local map; a parent is never mutated through a child.
#[derive(Default)]
pub struct Blackboard {
    values: BTreeMap<String, BbValue>,
    parent: Option<Weak<RefCell<Blackboard>>>,
    metadata: BTreeMap<String, VarMeta>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: &SharedBlackboard) -> Self {
        let mut bb = Self::new();
        bb.set_parent(Some(parent));
        bb
    }

    pub fn into_shared(self) -> SharedBlackboard {
        Rc::new(RefCell::new(self))
    }

    pub fn set_parent(&mut self, parent: Option<&SharedBlackboard>) {
        self.parent = parent.map(Rc::downgrade);
    }

    /// The parent, if one was set and is still alive.
    pub fn parent(&self) -> Option<SharedBlackboard> {
        self.parent.as_ref()?.upgrade()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_local(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn has_var(&self, key: &str) -> bool {
        self.get_var(key).is_some()
    }

    /// Local value, else the nearest ancestor's value.
    pub fn get_var(&self, key: &str) -> Option<BbValue> {
        self.lookup(key, 0)
    }

    pub fn get_var_or(&self, key: &str, default: BbValue) -> BbValue {
        self.get_var(key).unwrap_or(default)
    }

    pub fn get<T: BbType>(&self, key: &str) -> Option<T> {
        self.get_var(key).as_ref().and_then(T::from_value)
    }

    pub fn get_or<T: BbType>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Borrow a local value without consulting the parent chain.
    pub fn get_local(&self, key: &str) -> Option<&BbValue> {
        self.values.get(key)
    }

    fn lookup(&self, key: &str, depth: usize) -> Option<BbValue> {
        if let Some(v) = self.values.get(key) {
            return Some(v.clone());
        }
        if depth >= MAX_PARENT_DEPTH {
            return None;
        }
        let parent = self.parent()?;
        // A parent that is mutably borrowed right now (or part of a cycle) is treated as a miss.
        let parent = parent.try_borrow().ok()?;
        parent.lookup(key, depth + 1)
    }

    /// Write locally, returning the previous local value. Unchanged writes raise no event.
    pub fn set_var(
        &mut self,
        key: impl Into<String>,
        value: impl Into<BbValue>,
    ) -> Option<BbValue> {
        let key = key.into();
        let value = value.into();
        match self.values.get(&key) {
            Some(old) if old.same_as(&value) => return Some(value),
            _ => {}
        }

        let previous = self.values.insert(key.clone(), value.clone());
        let event = match previous.clone() {
            Some(old) => {
                tracing::trace!(key = %key, old = %old, new = %value, "blackboard var changed");
                BlackboardEvent::Changed {
                    key,
                    old,
                    new: value,
                }
            }
            None => {
                tracing::trace!(key = %key, value = %value, "blackboard var added");
                BlackboardEvent::Added { key, value }
            }
        };
        self.notify(&event);
        previous
    }

    pub fn remove_var(&mut self, key: &str) -> Option<BbValue> {
        let old = self.values.remove(key)?;
        tracing::trace!(key = %key, "blackboard var removed");
        self.notify(&BlackboardEvent::Removed {
            key: key.to_string(),
            old: old.clone(),
        });
        Some(old)
    }

    pub fn clear(&mut self) {
        let keys: Vec<String> = self.values.keys().cloned().collect();
        for key in keys {
            self.remove_var(&key);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn local_values(&self) -> &BTreeMap<String, BbValue> {
        &self.values
    }

    /// Effective view: ancestors first, overridden by nearer blackboards and finally local values.
    pub fn flatten(&self) -> BTreeMap<String, BbValue> {
        let mut out = BTreeMap::new();
        self.flatten_into(&mut out, 0);
        out
    }

    fn flatten_into(&self, out: &mut BTreeMap<String, BbValue>, depth: usize) {
        if depth < MAX_PARENT_DEPTH {
            if let Some(parent) = self.parent() {
                if let Ok(parent) = parent.try_borrow() {
                    parent.flatten_into(out, depth + 1);
                }
            }
        }
        for (k, v) in &self.values {
            out.insert(k.clone(), v.clone());
        }
    }

    pub fn describe(
        &mut self,
        key: impl Into<String>,
        kind: Option<ValueKind>,
        description: impl Into<String>,
    ) {
        self.metadata.insert(
            key.into(),
            VarMeta {
                kind,
                description: description.into(),
            },
        );
    }

    pub fn metadata(&self, key: &str) -> Option<&VarMeta> {
        self.metadata.get(key)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&BlackboardEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: &BlackboardEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }

    pub fn snapshot(&self) -> BlackboardSnapshot {
        BlackboardSnapshot {
            values: self.values.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Replace local state from a snapshot. This is a load, not a gameplay write: observers are
    /// not notified.
    pub fn restore(&mut self, snapshot: BlackboardSnapshot) {
        self.values = snapshot.values;
        self.metadata = snapshot.metadata;
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blackboard")
            .field("values", &self.values)
            .field("has_parent", &self.parent().is_some())
            .field("metadata", &self.metadata)
            .field("observers", &self.observers.len())
            .finish()
    }
}
