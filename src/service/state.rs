//! Service state management.
//!
//! Holds the catalog, the source registry it was built from, the enabled
//! feature set, and the revalidation webhook key.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::catalog::{CatalogOptions, CatalogService};
use crate::features::{FeatureKey, FeatureSet};
use crate::source::SourceRegistry;
use crate::types::CategoryError;

/// Compute the hex HMAC-SHA256 signature of a webhook body.
pub fn sign_body(secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Shared service state.
#[derive(Clone)]
pub struct ServiceState {
    /// Cached category catalog.
    pub catalog: CatalogService,
    /// Providers available at startup.
    pub sources: SourceRegistry,
    /// Enabled optional endpoints.
    pub features: FeatureSet,
    /// Webhook key; `None` disables revalidation.
    revalidate_secret: Option<Arc<Vec<u8>>>,
}

impl ServiceState {
    /// Create state around an existing catalog with every feature enabled.
    pub fn new(catalog: CatalogService) -> Self {
        Self {
            catalog,
            sources: SourceRegistry::new(),
            features: FeatureSet::all(),
            revalidate_secret: None,
        }
    }

    /// Create state serving from the registered source named `source`.
    pub fn from_registry(
        sources: SourceRegistry,
        source: &str,
        options: CatalogOptions,
    ) -> Result<Self, CategoryError> {
        let provider = sources.get(source).ok_or_else(|| {
            CategoryError::ServerError(format!(
                "unknown category source '{}' (registered: {})",
                source,
                sources.names().join(", ")
            ))
        })?;
        Ok(Self {
            catalog: CatalogService::new(provider, options),
            sources,
            features: FeatureSet::all(),
            revalidate_secret: None,
        })
    }

    /// Replace the feature set.
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    /// Set the webhook key. Empty keys leave revalidation disabled.
    pub fn with_revalidate_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        let secret = secret.into();
        self.revalidate_secret = (!secret.is_empty()).then(|| Arc::new(secret));
        self
    }

    /// Whether the revalidation webhook is available.
    pub fn revalidation_enabled(&self) -> bool {
        self.features.enabled(FeatureKey::Revalidate) && self.revalidate_secret.is_some()
    }

    /// Check a hex HMAC-SHA256 signature of `body`.
    ///
    /// Returns `false` when revalidation is disabled or the signature is
    /// malformed.
    pub fn verify_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        let Some(secret) = &self.revalidate_secret else {
            return false;
        };
        let Ok(signature) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&signature).is_ok()
    }
}

impl std::fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceState")
            .field("catalog", &self.catalog)
            .field("sources", &self.sources)
            .field("features", &self.features)
            .field("revalidation_enabled", &self.revalidation_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryCategorySource;

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(InMemoryCategorySource::default()));
        registry
    }

    #[test]
    fn test_from_registry_unknown_source() {
        let err = ServiceState::from_registry(registry(), "http", CatalogOptions::default()).unwrap_err();
        match err {
            CategoryError::ServerError(message) => assert!(message.contains("registered: memory")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_signature_round_trip() {
        let state = ServiceState::from_registry(registry(), "memory", CatalogOptions::default())
            .unwrap()
            .with_revalidate_secret("key");
        let body = br#"{"event":"category.updated"}"#;
        let signature = sign_body(b"key", body);

        assert!(state.revalidation_enabled());
        assert!(state.verify_signature(body, &signature));
        assert!(!state.verify_signature(b"tampered", &signature));
        assert!(!state.verify_signature(body, "not-hex"));
        assert!(!state.verify_signature(body, &sign_body(b"other", body)));
    }

    #[test]
    fn test_revalidation_disabled_without_secret_or_feature() {
        let state = ServiceState::from_registry(registry(), "memory", CatalogOptions::default()).unwrap();
        assert!(!state.revalidation_enabled());
        assert!(!state.verify_signature(b"", &sign_body(b"", b"")));

        let state = state
            .with_revalidate_secret("key")
            .with_features(FeatureSet::all().without(FeatureKey::Revalidate));
        assert!(!state.revalidation_enabled());

        let state = state.with_revalidate_secret("");
        assert!(state.revalidate_secret.is_none());
    }
}
