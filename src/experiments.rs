//! Experiment definitions and the validated catalog.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::ConfigError;

/// Weights must add up to this many buckets.
pub const TOTAL_WEIGHT: u32 = 100;

/// One A/B test: ordered variants with parallel percentage weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub name: String,
    pub variants: Vec<String>,
    pub distribution: Vec<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ExperimentDefinition {
    pub fn new(name: &str, variants: &[&str], distribution: &[u32], active: bool) -> Self {
        Self {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            distribution: distribution.to_vec(),
            active,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.variants.is_empty() {
            return Err(ConfigError::NoVariants(self.name.clone()));
        }
        if self.variants.len() != self.distribution.len() {
            return Err(ConfigError::LengthMismatch {
                name: self.name.clone(),
                variants: self.variants.len(),
                weights: self.distribution.len(),
            });
        }
        let sum: u32 = self.distribution.iter().sum();
        if sum != TOTAL_WEIGHT {
            return Err(ConfigError::BadDistribution {
                name: self.name.clone(),
                sum,
            });
        }
        let mut seen = HashSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.as_str()) {
                return Err(ConfigError::DuplicateVariant {
                    name: self.name.clone(),
                    variant: variant.clone(),
                });
            }
        }
        Ok(())
    }
}

// shape of the experiments TOML file
#[derive(Deserialize)]
struct ExperimentsFile {
    #[serde(default)]
    experiments: Vec<ExperimentDefinition>,
}

/// Immutable set of experiments, validated once at load.
#[derive(Debug, Clone, Default)]
pub struct ExperimentCatalog {
    by_name: HashMap<String, ExperimentDefinition>,
    order: Vec<String>,
}

impl ExperimentCatalog {
    pub fn new(definitions: Vec<ExperimentDefinition>) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        let mut order = Vec::with_capacity(definitions.len());

        for definition in definitions {
            definition.validate()?;
            if by_name.contains_key(&definition.name) {
                return Err(ConfigError::DuplicateExperiment(definition.name));
            }
            order.push(definition.name.clone());
            by_name.insert(definition.name.clone(), definition);
        }

        Ok(Self { by_name, order })
    }

    /// Parse `[[experiments]]` tables.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: ExperimentsFile = toml::from_str(raw)?;
        Self::new(file.experiments)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Experiments the marketing site ships with.
    pub fn builtin() -> Self {
        let definitions = vec![
            ExperimentDefinition::new(
                "hero_headline",
                &["control", "outcome", "urgency"],
                &[34, 33, 33],
                false,
            ),
            ExperimentDefinition::new("cta_button_text", &["A", "B", "C"], &[34, 33, 33], true),
            ExperimentDefinition::new(
                "lead_magnet_type",
                &["pdf", "checklist", "webinar"],
                &[40, 30, 30],
                true,
            ),
            ExperimentDefinition::new("contact_form_length", &["short", "long"], &[50, 50], true),
        ];
        let by_name: HashMap<_, _> = definitions
            .iter()
            .map(|d| (d.name.clone(), d.clone()))
            .collect();
        let order = definitions.into_iter().map(|d| d.name).collect();
        Self { by_name, order }
    }

    pub fn get(&self, name: &str) -> Option<&ExperimentDefinition> {
        self.by_name.get(name)
    }

    /// Definitions in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExperimentDefinition> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
