//! Capability flags for optional endpoints.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// An optional capability of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    /// Full index endpoint (`GET /api/categories`).
    Tree,
    /// Cheap `HEAD` path validation.
    HeadValidation,
    /// Signed cache revalidation webhook.
    Revalidate,
    /// Offer a unique leaf-handle match as a redirect when the strict walk
    /// fails.
    Redirects,
}

impl FeatureKey {
    /// Every known key.
    pub const ALL: [FeatureKey; 4] = [
        FeatureKey::Tree,
        FeatureKey::HeadValidation,
        FeatureKey::Revalidate,
        FeatureKey::Redirects,
    ];

    /// Config and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::Tree => "tree",
            FeatureKey::HeadValidation => "head_validation",
            FeatureKey::Revalidate => "revalidate",
            FeatureKey::Redirects => "redirects",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown feature names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for FeatureKey {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "tree" => Ok(FeatureKey::Tree),
            "head_validation" | "head" => Ok(FeatureKey::HeadValidation),
            "revalidate" => Ok(FeatureKey::Revalidate),
            "redirects" | "redirect" => Ok(FeatureKey::Redirects),
            _ => Err(UnknownFeature(s.trim().to_string())),
        }
    }
}

/// The set of enabled capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet {
    enabled: BTreeSet<FeatureKey>,
}

impl FeatureSet {
    /// No features enabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every feature enabled.
    pub fn all() -> Self {
        FeatureKey::ALL.into_iter().collect()
    }

    /// Parse a comma-separated list. Unknown names are logged and skipped.
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|name| match name.parse::<FeatureKey>() {
                Ok(key) => Some(key),
                Err(err) => {
                    warn!(error = %err, "Ignoring feature flag");
                    None
                }
            })
            .collect()
    }

    /// Enable a feature.
    pub fn with(mut self, key: FeatureKey) -> Self {
        self.enabled.insert(key);
        self
    }

    /// Disable a feature.
    pub fn without(mut self, key: FeatureKey) -> Self {
        self.enabled.remove(&key);
        self
    }

    /// Whether `key` is enabled.
    pub fn enabled(&self, key: FeatureKey) -> bool {
        self.enabled.contains(&key)
    }

    /// Enabled keys, sorted.
    pub fn iter(&self) -> impl Iterator<Item = FeatureKey> + '_ {
        self.enabled.iter().copied()
    }
}

impl FromIterator<FeatureKey> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureKey>>(iter: I) -> Self {
        Self {
            enabled: iter.into_iter().collect(),
        }
    }
}
