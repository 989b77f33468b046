//! Active ranking policy lookup
//!
//! The policy is owned by an administration collaborator. The engine only
//! reads it, once per request or batch run, and passes it down explicitly.

use swap_core::{Policy, SwapResult};
use tracing::{debug, warn};

use crate::store::SwapStore;

/// Source of the currently active ranking policy
pub trait PolicyProvider: Send + Sync {
    /// `Ok(None)` means no policy is active
    fn active_policy(&self) -> SwapResult<Option<Policy>>;
}

impl PolicyProvider for SwapStore {
    fn active_policy(&self) -> SwapResult<Option<Policy>> {
        Ok(self.load_active_policy()?)
    }
}

/// A fixed policy, for tests and single-policy deployments
#[derive(Debug, Clone, Default)]
pub struct StaticPolicy(pub Option<Policy>);

impl PolicyProvider for StaticPolicy {
    fn active_policy(&self) -> SwapResult<Option<Policy>> {
        Ok(self.0.clone())
    }
}

/// Resolve the policy to rank with
///
/// Never fails: a missing, unreadable or invalid policy yields the built-in
/// defaults tagged `"default"`.
pub fn resolve_policy(provider: &dyn PolicyProvider) -> Policy {
    let policy = match provider.active_policy() {
        Ok(Some(policy)) => policy,
        Ok(None) => {
            debug!("No active policy, using defaults");
            return Policy::default();
        }
        Err(e) => {
            warn!("Active policy unavailable, using defaults: {}", e);
            return Policy::default();
        }
    };

    match policy.validate() {
        Ok(()) => policy,
        Err(reason) => {
            warn!(
                "Active policy {} is malformed ({}), using defaults",
                policy.policy_version, reason
            );
            Policy::default()
        }
    }
}

/// Provider that always fails
#[cfg(test)]
pub(crate) struct UnavailablePolicy;

#[cfg(test)]
impl PolicyProvider for UnavailablePolicy {
    fn active_policy(&self) -> SwapResult<Option<Policy>> {
        Err(swap_core::SwapError::database("policy table unreachable"))
    }
}
