//! Scope resolution: rule descriptor to a snapshot of concrete target ids.

use std::sync::Arc;

use crate::core::error::EngineError;
use crate::core::rule::ScopeDescriptor;
use crate::infra::store::TargetDirectory;
use crate::util::ids::TargetId;

/// Expands a rule's scope descriptor against the target directory at
/// generation time. Membership is never cached inside the rule; every
/// resolution reflects current directory state.
pub struct ScopeResolver {
    directory: Arc<dyn TargetDirectory>,
}

impl ScopeResolver {
    /// Create a resolver over a target directory.
    pub fn new(directory: Arc<dyn TargetDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve a descriptor to a sorted, deduplicated target-id snapshot.
    ///
    /// A directory failure surfaces as the retryable
    /// [`EngineError::Resolution`], never as an empty success, so callers
    /// can tell "no targets" from "lookup failed". The sort makes
    /// round-robin assignment positions reproducible across resolutions of
    /// the same population.
    pub async fn resolve(&self, scope: &ScopeDescriptor) -> Result<Vec<TargetId>, EngineError> {
        let mut targets = self
            .directory
            .resolve(scope)
            .await
            .map_err(|e| EngineError::Resolution(e.to_string()))?;
        targets.sort_unstable();
        targets.dedup();
        tracing::debug!(count = targets.len(), "scope resolved");
        Ok(targets)
    }
}
