//! Deterministic, session-sticky variant assignment.
//!
//! A session is hashed into one of 100 buckets together with the experiment
//! name (and an optional salt), and the bucket is walked through the
//! experiment's cumulative weights. The first result for a
//! `(session, experiment)` pair is recorded and returned on every later call,
//! even if a different salt is passed.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use crate::experiments::{ExperimentCatalog, ExperimentDefinition};
use crate::hash::{bucket, bucketing_key, rolling_hash};

/// Result of an assignment lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variant: String,
    /// True when this call recorded the assignment.
    pub newly_assigned: bool,
}

/// Storage for sticky `(session, experiment) -> variant` assignments.
pub trait AssignmentStore: Send + Sync {
    fn get(&self, session_id: &str, experiment: &str) -> Option<String>;

    /// Record `variant` unless the pair already has one. Returns the stored
    /// variant and whether this call wrote it.
    fn insert_if_absent(&self, session_id: &str, experiment: &str, variant: &str) -> (String, bool);

    /// Everything assigned to a session, keyed by experiment.
    fn session_assignments(&self, session_id: &str) -> BTreeMap<String, String>;

    fn session_count(&self) -> usize;
}

/// Process-local assignment table.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    sessions: DashMap<String, BTreeMap<String, String>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn get(&self, session_id: &str, experiment: &str) -> Option<String> {
        self.sessions
            .get(session_id)
            .and_then(|row| row.get(experiment).cloned())
    }

    fn insert_if_absent(&self, session_id: &str, experiment: &str, variant: &str) -> (String, bool) {
        let mut row = self.sessions.entry(session_id.to_string()).or_default();
        match row.entry(experiment.to_string()) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => {
                slot.insert(variant.to_string());
                (variant.to_string(), true)
            }
        }
    }

    fn session_assignments(&self, session_id: &str) -> BTreeMap<String, String> {
        self.sessions
            .get(session_id)
            .map(|row| row.value().clone())
            .unwrap_or_default()
    }

    fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Walk cumulative weights and return the first variant whose running sum
/// exceeds `bucket`. Falls back to the first variant when the weights do not
/// cover the bucket.
pub fn pick_variant<'a>(variants: &'a [String], weights: &[u32], bucket: u32) -> Option<&'a str> {
    let mut cumulative = 0u32;
    for (variant, weight) in variants.iter().zip(weights) {
        cumulative = cumulative.saturating_add(*weight);
        if bucket < cumulative {
            return Some(variant);
        }
    }
    variants.first().map(String::as_str)
}

/// Variant the bucketing formula yields, ignoring recorded assignments.
pub fn compute_variant<'a>(
    experiment: &'a ExperimentDefinition,
    session_id: &str,
    salt: Option<&str>,
) -> Option<&'a str> {
    let key = bucketing_key(session_id, &experiment.name, salt);
    pick_variant(&experiment.variants, &experiment.distribution, bucket(rolling_hash(&key)))
}

/// Resolves sticky assignments against the experiment catalog.
#[derive(Clone)]
pub struct VariantAssignor {
    catalog: Arc<ExperimentCatalog>,
    store: Arc<dyn AssignmentStore>,
}

impl VariantAssignor {
    pub fn new(catalog: Arc<ExperimentCatalog>, store: Arc<dyn AssignmentStore>) -> Self {
        Self { catalog, store }
    }

    pub fn in_memory(catalog: ExperimentCatalog) -> Self {
        Self::new(Arc::new(catalog), Arc::new(InMemoryAssignmentStore::new()))
    }

    /// Variant for this session, or `None` for unknown and inactive experiments.
    pub fn resolve(&self, session_id: &str, experiment: &str, salt: Option<&str>) -> Option<String> {
        self.assign(session_id, experiment, salt).map(|a| a.variant)
    }

    /// Like [`VariantAssignor::resolve`], also reporting whether the call
    /// created the assignment.
    pub fn assign(&self, session_id: &str, experiment: &str, salt: Option<&str>) -> Option<Assignment> {
        let definition = self.catalog.get(experiment)?;
        if !definition.active {
            return None;
        }

        if let Some(variant) = self.store.get(session_id, experiment) {
            return Some(Assignment {
                variant,
                newly_assigned: false,
            });
        }

        let chosen = compute_variant(definition, session_id, salt)?;
        // a concurrent caller may have won; theirs is kept
        let (variant, newly_assigned) = self.store.insert_if_absent(session_id, experiment, chosen);
        Some(Assignment {
            variant,
            newly_assigned,
        })
    }

    /// Recorded assignment, without creating one.
    pub fn recorded(&self, session_id: &str, experiment: &str) -> Option<String> {
        self.store.get(session_id, experiment)
    }

    pub fn session_assignments(&self, session_id: &str) -> BTreeMap<String, String> {
        self.store.session_assignments(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.store.session_count()
    }

    pub fn catalog(&self) -> &ExperimentCatalog {
        &self.catalog
    }
}
