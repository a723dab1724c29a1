//! Thesis weight registry.
//!
//! Maps thesis identifiers to validated [`ThesisProfile`]s. Lookups never
//! fail: an unknown identifier resolves to the default growth thesis.

use std::collections::BTreeMap;

use crate::domain::models::{ThesisDefinition, ThesisError, ThesisProfile, ThesisWeights};

/// Thesis used when a requested identifier is unknown.
pub const DEFAULT_THESIS_ID: &str = "accelerate-organic-growth";

const BUILTIN_THESES: [(&str, &str, ThesisWeights); 6] = [
    (
        DEFAULT_THESIS_ID,
        "Accelerate Organic Growth",
        ThesisWeights::new(0.20, 0.25, 0.30, 0.15, 0.10),
    ),
    (
        "buy-and-build",
        "Buy and Build",
        ThesisWeights::new(0.35, 0.25, 0.15, 0.10, 0.15),
    ),
    (
        "digital-transformation",
        "Digital Transformation",
        ThesisWeights::new(0.50, 0.15, 0.10, 0.15, 0.10),
    ),
    (
        "margin-expansion",
        "Margin Expansion",
        ThesisWeights::new(0.20, 0.20, 0.10, 0.10, 0.40),
    ),
    (
        "turnaround",
        "Turnaround",
        ThesisWeights::new(0.15, 0.25, 0.15, 0.25, 0.20),
    ),
    (
        "carve-out",
        "Carve-out",
        ThesisWeights::new(0.25, 0.30, 0.10, 0.15, 0.20),
    ),
];

/// Registry of thesis profiles, always containing the default thesis.
#[derive(Debug, Clone)]
pub struct ThesisRegistry {
    profiles: BTreeMap<String, ThesisProfile>,
    default: ThesisProfile,
}

impl Default for ThesisRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ThesisRegistry {
    /// Registry with the built-in profiles only.
    pub fn builtin() -> Self {
        let profiles: BTreeMap<_, _> = BUILTIN_THESES
            .iter()
            .map(|(id, name, weights)| ((*id).to_string(), ThesisProfile::trusted(id, name, *weights)))
            .collect();
        let (id, name, weights) = BUILTIN_THESES[0];
        Self {
            profiles,
            default: ThesisProfile::trusted(id, name, weights),
        }
    }

    /// Built-in profiles plus custom definitions from configuration.
    ///
    /// A custom profile replaces a built-in one with the same id. Each custom
    /// id may appear only once.
    pub fn with_definitions(definitions: &[ThesisDefinition]) -> Result<Self, ThesisError> {
        let mut registry = Self::builtin();
        let mut seen = std::collections::HashSet::new();

        for def in definitions {
            if !seen.insert(def.id.as_str()) {
                return Err(ThesisError::DuplicateProfile(def.id.clone()));
            }
            let profile = ThesisProfile::try_from(def.clone())?;
            if registry.profiles.contains_key(profile.id()) {
                tracing::info!(thesis = profile.id(), "custom thesis overrides built-in profile");
            }
            registry.insert(profile);
        }

        Ok(registry)
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: ThesisProfile) {
        if profile.id() == DEFAULT_THESIS_ID {
            self.default = profile.clone();
        }
        self.profiles.insert(profile.id().to_string(), profile);
    }

    /// Exact lookup without fallback.
    pub fn get(&self, id: &str) -> Option<&ThesisProfile> {
        self.profiles.get(id)
    }

    /// Look up a thesis, falling back to the default for unknown ids.
    pub fn resolve(&self, id: &str) -> &ThesisProfile {
        self.profiles.get(id).unwrap_or_else(|| {
            tracing::debug!(requested = id, fallback = DEFAULT_THESIS_ID, "unknown thesis, using default");
            &self.default
        })
    }

    pub fn default_profile(&self) -> &ThesisProfile {
        &self.default
    }

    /// All profiles ordered by id.
    pub fn profiles(&self) -> impl Iterator<Item = &ThesisProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
