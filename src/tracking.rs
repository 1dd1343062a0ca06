//! Session-scoped experiment results.
//!
//! Conversion events are attributed to the variant the session was assigned,
//! and each `(session, experiment, event)` is counted once. Counts live in
//! process memory only.

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::assignment::VariantAssignor;
use crate::experiments::ExperimentDefinition;

/// What happened to a tracked event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// First time this session reported the event; counted for `variant`.
    Counted { variant: String },
    /// Already reported by this session; ignored.
    Duplicate { variant: String },
    /// Session has no assignment for the experiment; ignored.
    Unassigned,
}

impl TrackOutcome {
    pub fn counted(&self) -> bool {
        matches!(self, TrackOutcome::Counted { .. })
    }

    pub fn variant(&self) -> Option<&str> {
        match self {
            TrackOutcome::Counted { variant } | TrackOutcome::Duplicate { variant } => Some(variant),
            TrackOutcome::Unassigned => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantResults {
    pub variant: String,
    pub assignments: u64,
    pub conversions: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentResults {
    pub experiment: String,
    pub active: bool,
    pub variants: Vec<VariantResults>,
}

#[derive(Debug, Default)]
pub struct ResultTracker {
    // (experiment, variant) -> sessions assigned
    assignments: DashMap<(String, String), u64>,
    // (experiment, variant, event) -> conversions
    conversions: DashMap<(String, String, String), u64>,
    // (session, experiment, event) already counted
    seen: DashSet<(String, String, String)>,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new assignment. Call once per `newly_assigned` result.
    pub fn record_assignment(&self, experiment: &str, variant: &str) {
        *self
            .assignments
            .entry((experiment.to_string(), variant.to_string()))
            .or_insert(0) += 1;
    }

    /// Attribute `event` to the variant recorded for this session.
    pub fn record_event(
        &self,
        assignor: &VariantAssignor,
        session_id: &str,
        experiment: &str,
        event: &str,
    ) -> TrackOutcome {
        let Some(variant) = assignor.recorded(session_id, experiment) else {
            return TrackOutcome::Unassigned;
        };

        let first_time = self.seen.insert((
            session_id.to_string(),
            experiment.to_string(),
            event.to_string(),
        ));
        if !first_time {
            return TrackOutcome::Duplicate { variant };
        }

        *self
            .conversions
            .entry((experiment.to_string(), variant.clone(), event.to_string()))
            .or_insert(0) += 1;
        TrackOutcome::Counted { variant }
    }

    /// Per-variant counts, in the experiment's variant order.
    pub fn results(&self, experiment: &ExperimentDefinition) -> ExperimentResults {
        let mut variants: Vec<VariantResults> = experiment
            .variants
            .iter()
            .map(|variant| VariantResults {
                variant: variant.clone(),
                assignments: self
                    .assignments
                    .get(&(experiment.name.clone(), variant.clone()))
                    .map(|count| *count)
                    .unwrap_or(0),
                conversions: BTreeMap::new(),
            })
            .collect();

        for item in self.conversions.iter() {
            let (name, variant, event) = item.key();
            if name != &experiment.name {
                continue;
            }
            if let Some(row) = variants.iter_mut().find(|row| &row.variant == variant) {
                row.conversions.insert(event.clone(), *item.value());
            }
        }

        ExperimentResults {
            experiment: experiment.name.clone(),
            active: experiment.active,
            variants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::ExperimentCatalog;

    #[test]
    fn events_are_attributed_to_the_assigned_variant() {
        let assignor = VariantAssignor::in_memory(ExperimentCatalog::builtin());
        let tracker = ResultTracker::new();

        let assignment = assignor
            .assign("sess-A", "lead_magnet_type", None)
            .expect("active");
        tracker.record_assignment("lead_magnet_type", &assignment.variant);

        let outcome = tracker.record_event(&assignor, "sess-A", "lead_magnet_type", "download");
        assert_eq!(outcome, TrackOutcome::Counted { variant: "pdf".to_string() });
        assert!(outcome.counted());

        let catalog = ExperimentCatalog::builtin();
        let results = tracker.results(catalog.get("lead_magnet_type").expect("configured"));
        assert_eq!(results.variants.len(), 3);
        assert_eq!(results.variants[0].variant, "pdf");
        assert_eq!(results.variants[0].assignments, 1);
        assert_eq!(results.variants[0].conversions.get("download"), Some(&1));
        assert!(results.variants[1].conversions.is_empty());
    }

    #[test]
    fn repeated_events_count_once_per_session() {
        let assignor = VariantAssignor::in_memory(ExperimentCatalog::builtin());
        let tracker = ResultTracker::new();
        assignor.resolve("s1", "cta_button_text", None);

        assert!(tracker.record_event(&assignor, "s1", "cta_button_text", "click").counted());
        let again = tracker.record_event(&assignor, "s1", "cta_button_text", "click");
        assert!(!again.counted());
        assert!(again.variant().is_some());
        assert!(tracker.record_event(&assignor, "s1", "cta_button_text", "signup").counted());
    }

    #[test]
    fn unassigned_sessions_are_ignored() {
        let assignor = VariantAssignor::in_memory(ExperimentCatalog::builtin());
        let tracker = ResultTracker::new();

        let outcome = tracker.record_event(&assignor, "stranger", "cta_button_text", "click");
        assert_eq!(outcome, TrackOutcome::Unassigned);
        assert_eq!(outcome.variant(), None);

        // tracking never creates an assignment
        assert_eq!(assignor.recorded("stranger", "cta_button_text"), None);
    }

    #[test]
    fn results_for_untouched_experiment_are_zero() {
        let tracker = ResultTracker::new();
        let catalog = ExperimentCatalog::builtin();
        let results = tracker.results(catalog.get("hero_headline").expect("configured"));
        assert!(!results.active);
        assert!(results.variants.iter().all(|v| v.assignments == 0 && v.conversions.is_empty()));
    }
}
