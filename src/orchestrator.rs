//! Session hook orchestrator.
//!
//! One event, one run to completion: load the policy fresh, resolve the
//! effective target set, drive the applier per target in deterministic
//! order, aggregate outcomes. No state survives between invocations and
//! nothing here returns an error to the caller — individual failures are
//! recorded in the summary and the logs.

use std::sync::Arc;

use crate::applier::{StateApplier, TransitionOutcome};
use crate::classify::classify;
use crate::control::ControlApi;
use crate::event::LifecycleEvent;
use crate::policy::{ApplierSettings, PolicyStore, TargetMode, TargetSpec};

/// Aggregate result of one orchestrator run. Surfaced only through logs
/// and the process's final log line; never through the exit code.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// True when the hook was disabled and terminated with zero calls.
    pub skipped: bool,
    pub outcomes: Vec<TransitionOutcome>,
}

impl RunSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// Drives one lifecycle event through policy resolution and application.
pub struct HookOrchestrator {
    store: PolicyStore,
    api: Arc<dyn ControlApi>,
    settings: ApplierSettings,
}

impl HookOrchestrator {
    pub fn new(store: PolicyStore, api: Arc<dyn ControlApi>, settings: ApplierSettings) -> Self {
        Self {
            store,
            api,
            settings,
        }
    }

    /// Run the hook for one event.
    ///
    /// Best effort throughout: a failed target never aborts the fan-out
    /// over the remaining targets, and every resolved target yields
    /// exactly one outcome.
    pub async fn run(&self, event: &LifecycleEvent) -> RunSummary {
        let loaded = self.store.load();
        let policy = loaded.hooks.for_kind(event.kind);

        if !policy.enabled {
            tracing::info!(kind = %event.kind, "Hook disabled by policy, skipped");
            return RunSummary::skipped();
        }

        let desired = event.kind.desired_active();
        tracing::info!(
            kind = %event.kind,
            desired,
            at = %event.timestamp,
            annotation = event.annotation.as_deref().unwrap_or(""),
            "Hook started"
        );

        // Resolving: one registry snapshot per invocation. Both reads
        // degrade on failure rather than blocking the hook.
        let virtuals = match self.api.list_virtuals().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Target registry unreachable, degrading: {e}");
                Default::default()
            }
        };
        let devices = match self.api.list_devices().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("Device registry unreachable, classifying all as standard: {e}");
                Default::default()
            }
        };

        let resolved: Vec<TargetSpec> = match policy.target_mode {
            TargetMode::All => {
                // Full snapshot at invocation time; any stale policy list
                // is ignored. Sorted for deterministic order.
                let mut ids: Vec<&String> = virtuals.keys().collect();
                ids.sort();
                ids.into_iter().map(TargetSpec::once).collect()
            }
            TargetMode::Explicit => policy.targets.clone(),
        };

        if resolved.is_empty() {
            tracing::warn!(kind = %event.kind, "No targets resolved, nothing to do");
            return RunSummary::default();
        }

        // Applying: sequential per target, in resolution order.
        let applier = StateApplier::new(self.api.clone(), self.settings.clone());
        let mut summary = RunSummary::default();

        for spec in &resolved {
            let info = virtuals.get(&spec.id);
            let class = classify(info, &devices);

            let prior = match info {
                Some(info) => Some(info.active),
                // Explicit targets may be absent from a degraded or stale
                // snapshot; try the single-target read for the log line.
                None => self.api.virtual_state(&spec.id).await.ok(),
            };
            tracing::debug!(
                target_id = %spec.id,
                %class,
                repeats = spec.repeats,
                prior_active = ?prior,
                "Applying transition"
            );

            let outcome = applier.apply(&spec.id, desired, spec.repeats, class).await;
            if outcome.success {
                tracing::info!(target_id = %spec.id, desired, "Target transition ok");
            } else {
                tracing::warn!(
                    target_id = %spec.id,
                    desired,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Target transition failed"
                );
            }
            summary.outcomes.push(outcome);
        }

        tracing::info!(
            kind = %event.kind,
            targets = summary.outcomes.len(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Hook finished"
        );

        // Exactly one outcome per resolved target, none silently dropped.
        debug_assert_eq!(summary.outcomes.len(), resolved.len());

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{DeviceInfo, VirtualInfo};
    use crate::error::{ControlError, RegistryError};
    use crate::event::EventKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeRegistry {
        virtuals: HashMap<String, VirtualInfo>,
        devices: HashMap<String, DeviceInfo>,
        unreachable: bool,
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl FakeRegistry {
        fn empty() -> Self {
            Self {
                virtuals: HashMap::new(),
                devices: HashMap::new(),
                unreachable: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::empty()
            }
        }

        fn with_virtual(mut self, id: &str) -> Self {
            self.virtuals.insert(
                id.to_string(),
                VirtualInfo {
                    active: false,
                    segments: Vec::new(),
                },
            );
            self
        }

        fn calls(&self) -> Vec<(String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ControlApi for FakeRegistry {
        async fn list_virtuals(&self) -> Result<HashMap<String, VirtualInfo>, RegistryError> {
            if self.unreachable {
                return Err(RegistryError::Unreachable("connection refused".into()));
            }
            Ok(self.virtuals.clone())
        }

        async fn list_devices(&self) -> Result<HashMap<String, DeviceInfo>, RegistryError> {
            if self.unreachable {
                return Err(RegistryError::Unreachable("connection refused".into()));
            }
            Ok(self.devices.clone())
        }

        async fn virtual_state(&self, _id: &str) -> Result<bool, RegistryError> {
            if self.unreachable {
                return Err(RegistryError::Unreachable("connection refused".into()));
            }
            Ok(false)
        }

        async fn set_virtual_active(&self, id: &str, active: bool) -> Result<(), ControlError> {
            self.calls.lock().unwrap().push((id.to_string(), active));
            Ok(())
        }
    }

    fn settings() -> ApplierSettings {
        ApplierSettings {
            step_delay: Duration::from_millis(1),
            call_timeout: Duration::from_secs(1),
        }
    }

    fn store(dir: &tempfile::TempDir, yaml: &str) -> PolicyStore {
        let path = dir.path().join("hooks.yaml");
        std::fs::write(&path, yaml).unwrap();
        PolicyStore::at(path)
    }

    #[tokio::test]
    async fn disabled_hook_makes_zero_calls() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, "hooks:\n  start:\n    enabled: false\n");
        let api = Arc::new(FakeRegistry::empty().with_virtual("a"));
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        assert!(summary.skipped);
        assert!(summary.outcomes.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn all_mode_ignores_stale_target_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(
            &dir,
            "hooks:\n  start:\n    all_virtuals: true\n    virtuals:\n      - id: stale\n",
        );
        let api = Arc::new(FakeRegistry::empty().with_virtual("a").with_virtual("b"));
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        let mut ids: Vec<String> = summary.outcomes.iter().map(|o| o.target_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(!api.calls().iter().any(|(id, _)| id == "stale"));
    }

    #[tokio::test]
    async fn all_mode_resolves_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, "hooks:\n  start:\n    all_virtuals: true\n");
        let api = Arc::new(
            FakeRegistry::empty()
                .with_virtual("zeta")
                .with_virtual("alpha")
                .with_virtual("mid"),
        );
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        let ids: Vec<&str> = summary.outcomes.iter().map(|o| o.target_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn explicit_mode_keeps_declared_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(
            &dir,
            "hooks:\n  start:\n    all_virtuals: false\n    virtuals:\n      - id: zeta\n      - id: alpha\n",
        );
        let api = Arc::new(FakeRegistry::empty().with_virtual("alpha").with_virtual("zeta"));
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        let ids: Vec<&str> = summary.outcomes.iter().map(|o| o.target_id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn end_event_deactivates() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, "hooks:\n  end:\n    all_virtuals: true\n");
        let api = Arc::new(FakeRegistry::empty().with_virtual("a"));
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        orchestrator
            .run(&LifecycleEvent::now(EventKind::End, None))
            .await;

        assert_eq!(api.calls(), vec![("a".to_string(), false)]);
    }

    #[tokio::test]
    async fn unreachable_registry_in_all_mode_yields_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, "hooks:\n  start:\n    all_virtuals: true\n");
        let api = Arc::new(FakeRegistry::unreachable());
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        assert!(!summary.skipped);
        assert!(summary.outcomes.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn unreachable_registry_still_applies_explicit_targets() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(
            &dir,
            "hooks:\n  start:\n    all_virtuals: false\n    virtuals:\n      - id: a\n",
        );
        let api = Arc::new(FakeRegistry::unreachable());
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        // Degrades to Standard classification, still drives the target.
        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(api.calls(), vec![("a".to_string(), true)]);
    }

    #[tokio::test]
    async fn missing_store_defaults_to_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::at(dir.path().join("absent.yaml"));
        let api = Arc::new(FakeRegistry::empty().with_virtual("a"));
        let orchestrator = HookOrchestrator::new(store, api.clone(), settings());

        let summary = orchestrator
            .run(&LifecycleEvent::now(EventKind::Start, None))
            .await;

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(api.calls(), vec![("a".to_string(), true)]);
    }
}
