//! State transition applier.
//!
//! Issues the actual state-set calls for one target, shaped by its
//! reliability class:
//!
//! - **Standard** targets get `repeats` identical calls, spaced by the
//!   inter-step delay.
//! - **UnreliableActuation** targets get `repeats` pulse cycles, each
//!   alternating the opposite state then the desired state, so that
//!   actuators which ignore a command they believe is a no-op are forced
//!   to re-evaluate. The final call of the final cycle always leaves the
//!   target in the desired state.
//!
//! A failed individual call marks the target's outcome as failed, but the
//! remaining calls in the pattern are still issued; there is no retry
//! beyond the pattern itself.

use std::sync::Arc;

use crate::classify::TargetClass;
use crate::control::ControlApi;
use crate::policy::ApplierSettings;

/// Result of applying a transition to one target. Written only to logs.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub target_id: String,
    pub success: bool,
    pub error: Option<String>,
}

impl TransitionOutcome {
    fn ok(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            success: true,
            error: None,
        }
    }
}

/// Applies activation transitions through the control API.
pub struct StateApplier {
    api: Arc<dyn ControlApi>,
    settings: ApplierSettings,
}

impl StateApplier {
    pub fn new(api: Arc<dyn ControlApi>, settings: ApplierSettings) -> Self {
        Self { api, settings }
    }

    /// Drive one target to `desired_active`.
    ///
    /// `repeats = 0` issues zero calls and reports success (an explicit
    /// no-op exclusion, not an error).
    pub async fn apply(
        &self,
        target_id: &str,
        desired_active: bool,
        repeats: u32,
        class: TargetClass,
    ) -> TransitionOutcome {
        if repeats == 0 {
            tracing::debug!(target_id, "repeats=0, skipping (no-op)");
            return TransitionOutcome::ok(target_id);
        }

        let mut outcome = TransitionOutcome::ok(target_id);

        match class {
            TargetClass::Standard => {
                for i in 0..repeats {
                    self.set(target_id, desired_active, &mut outcome).await;
                    if i + 1 < repeats {
                        tokio::time::sleep(self.settings.step_delay).await;
                    }
                }
            }
            TargetClass::UnreliableActuation => {
                for _ in 0..repeats {
                    self.set(target_id, !desired_active, &mut outcome).await;
                    tokio::time::sleep(self.settings.step_delay).await;
                    self.set(target_id, desired_active, &mut outcome).await;
                    tokio::time::sleep(self.settings.step_delay).await;
                }
            }
        }

        outcome
    }

    /// Issue one state-set call, folding any failure into the outcome.
    async fn set(&self, target_id: &str, active: bool, outcome: &mut TransitionOutcome) {
        if let Err(e) = self.api.set_virtual_active(target_id, active).await {
            tracing::warn!(target_id, active, "State-set call failed: {e}");
            outcome.success = false;
            if outcome.error.is_none() {
                outcome.error = Some(e.to_string());
            }
        }
    }
}
