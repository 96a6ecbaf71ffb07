//! Hook policy store.
//!
//! Policies are loaded fresh on every invocation with priority:
//! structured YAML store > legacy flat store > hard default. The hard
//! default is `{ enabled: true, target_mode: All }` for both hooks
//! ("control everything"), which is also what every load failure falls
//! open to — a broken policy file must never block the hook.
//!
//! Connection settings resolve with priority: env var > policy store >
//! default, matching the rest of the configuration surface.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::PolicyError;

/// Upper bound on per-target repeats; larger values are clamped on load.
pub const MAX_REPEATS: u32 = 10;

/// How a hook selects its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    /// Act on the full registry snapshot at invocation time.
    All,
    /// Act only on the policy-declared target list, in declared order.
    Explicit,
}

/// One policy-declared target.
///
/// `repeats = 0` is an explicit exclusion: the target is resolved, gets an
/// outcome, but receives zero control calls. This is distinct from a
/// target that is simply not mentioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub id: String,
    pub repeats: u32,
}

impl TargetSpec {
    /// A target with the default single application.
    pub fn once(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            repeats: 1,
        }
    }
}

/// Policy for a single event kind.
#[derive(Debug, Clone)]
pub struct HookPolicy {
    pub enabled: bool,
    pub target_mode: TargetMode,
    pub targets: Vec<TargetSpec>,
}

impl Default for HookPolicy {
    /// The documented legacy default: enabled, control everything.
    fn default() -> Self {
        Self {
            enabled: true,
            target_mode: TargetMode::All,
            targets: Vec::new(),
        }
    }
}

/// Both hook policies, read together from one store.
#[derive(Debug, Clone, Default)]
pub struct HookPolicies {
    pub start: HookPolicy,
    pub end: HookPolicy,
}

impl HookPolicies {
    /// The policy governing a given event kind.
    pub fn for_kind(&self, kind: crate::event::EventKind) -> &HookPolicy {
        match kind {
            crate::event::EventKind::Start => &self.start,
            crate::event::EventKind::End => &self.end,
        }
    }
}

/// Remote control API connection settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8888,
        }
    }
}

impl ConnectionConfig {
    /// Base URL for the control API.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Tunables for the state applier.
#[derive(Debug, Clone)]
pub struct ApplierSettings {
    /// Inter-step delay used between repeated calls and within pulse
    /// cycles. An empirical constant, not a timing contract.
    pub step_delay: Duration,
    /// Per-call timeout against the control API.
    pub call_timeout: Duration,
}

impl Default for ApplierSettings {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(100),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl ApplierSettings {
    /// Resolve tunables from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            step_delay: Duration::from_millis(parse_env_or(
                "LIGHTCUE_PULSE_DELAY_MS",
                defaults.step_delay.as_millis() as u64,
            )),
            call_timeout: Duration::from_secs(parse_env_or(
                "LIGHTCUE_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )),
        }
    }
}

// ── Structured (YAML) wire format ──────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
struct RawStore {
    #[serde(default)]
    ledfx: Option<RawConnection>,
    #[serde(default)]
    hooks: RawHooks,
}

#[derive(Debug, Deserialize)]
struct RawConnection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct RawHooks {
    #[serde(default)]
    start: Option<RawHook>,
    #[serde(default)]
    end: Option<RawHook>,
}

#[derive(Debug, Deserialize)]
struct RawHook {
    enabled: Option<bool>,
    /// Explicit ALL sentinel. When absent, an empty `virtuals` list means
    /// All and a non-empty list means Explicit (older stores predate the
    /// flag).
    all_virtuals: Option<bool>,
    #[serde(default)]
    virtuals: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    id: String,
    repeats: Option<u32>,
}

impl RawHook {
    fn into_policy(self) -> HookPolicy {
        let targets: Vec<TargetSpec> = self
            .virtuals
            .into_iter()
            .map(|t| {
                let repeats = t.repeats.unwrap_or(1);
                if repeats > MAX_REPEATS {
                    tracing::warn!(
                        target_id = %t.id,
                        repeats,
                        "Clamping repeats to {}",
                        MAX_REPEATS
                    );
                }
                TargetSpec {
                    id: t.id,
                    repeats: repeats.min(MAX_REPEATS),
                }
            })
            .collect();

        let all = self.all_virtuals.unwrap_or_else(|| targets.is_empty());

        HookPolicy {
            enabled: self.enabled.unwrap_or(true),
            target_mode: if all {
                TargetMode::All
            } else {
                TargetMode::Explicit
            },
            targets,
        }
    }
}

// ── Store loader ───────────────────────────────────────────────────────

/// Loads hook policies and connection settings from disk.
///
/// Holds only paths; every [`PolicyStore::load`] call re-reads the files
/// so that edits take effect on the very next event.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    yaml_path: PathBuf,
    legacy_path: PathBuf,
}

/// Everything a single invocation needs from the store.
#[derive(Debug, Clone, Default)]
pub struct LoadedPolicy {
    pub connection: ConnectionConfig,
    pub hooks: HookPolicies,
}

impl PolicyStore {
    /// Store rooted at an explicit YAML path. The legacy store is looked
    /// up next to it as `hooks.conf`.
    pub fn at(yaml_path: impl Into<PathBuf>) -> Self {
        let yaml_path = yaml_path.into();
        let legacy_path = yaml_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("hooks.conf");
        Self {
            yaml_path,
            legacy_path,
        }
    }

    /// Store at the default location (`~/.lightcue/hooks.yaml`),
    /// overridable via `LIGHTCUE_CONFIG`.
    pub fn from_env() -> Self {
        let yaml_path = optional_env("LIGHTCUE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(default_store_path);
        Self::at(yaml_path)
    }

    /// Read policies fresh from disk.
    ///
    /// Never fails: a missing store falls back to the legacy store, then
    /// to defaults; a malformed store logs the parse error and falls back
    /// to defaults. Env vars override the store's connection settings.
    pub fn load(&self) -> LoadedPolicy {
        let mut loaded = match self.read_structured() {
            Ok(loaded) => loaded,
            Err(PolicyError::Unavailable { path }) => {
                tracing::debug!(%path, "Structured policy store absent, trying legacy store");
                self.read_legacy().unwrap_or_else(|e| {
                    tracing::debug!("No legacy store either ({e}), using defaults");
                    LoadedPolicy::default()
                })
            }
            Err(e) => {
                tracing::warn!("Policy store unreadable, using defaults: {e}");
                LoadedPolicy::default()
            }
        };

        if let Some(host) = optional_env("LEDFX_HOST") {
            loaded.connection.host = host;
        }
        if let Some(port) = optional_env("LEDFX_PORT") {
            match port.parse() {
                Ok(port) => loaded.connection.port = port,
                Err(e) => tracing::warn!("Ignoring invalid LEDFX_PORT '{port}': {e}"),
            }
        }

        loaded
    }

    fn read_structured(&self) -> Result<LoadedPolicy, PolicyError> {
        if !self.yaml_path.exists() {
            return Err(PolicyError::Unavailable {
                path: self.yaml_path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(&self.yaml_path)?;
        let raw: RawStore =
            serde_yaml::from_str(&text).map_err(|e| PolicyError::Malformed {
                path: self.yaml_path.display().to_string(),
                message: e.to_string(),
            })?;

        let defaults = ConnectionConfig::default();
        let connection = match raw.ledfx {
            Some(conn) => ConnectionConfig {
                host: conn.host.unwrap_or(defaults.host),
                port: conn.port.unwrap_or(defaults.port),
            },
            None => defaults,
        };

        Ok(LoadedPolicy {
            connection,
            hooks: HookPolicies {
                start: raw.hooks.start.map(RawHook::into_policy).unwrap_or_default(),
                end: raw.hooks.end.map(RawHook::into_policy).unwrap_or_default(),
            },
        })
    }

    /// Legacy flat `KEY="value"` store. Only `VIRTUAL_IDS` is meaningful:
    /// an empty value means All, a comma-separated list means Explicit
    /// with one application each. Both hooks share the list and are
    /// enabled.
    fn read_legacy(&self) -> Result<LoadedPolicy, PolicyError> {
        if !self.legacy_path.exists() {
            return Err(PolicyError::Unavailable {
                path: self.legacy_path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(&self.legacy_path)?;

        let mut targets = Vec::new();
        for line in text.lines() {
            let Some(value) = line.trim().strip_prefix("VIRTUAL_IDS=") else {
                continue;
            };
            let value = value.trim_matches('"');
            targets = value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(TargetSpec::once)
                .collect();
        }

        let policy = HookPolicy {
            enabled: true,
            target_mode: if targets.is_empty() {
                TargetMode::All
            } else {
                TargetMode::Explicit
            },
            targets,
        };

        tracing::info!(
            path = %self.legacy_path.display(),
            "Loaded legacy policy store"
        );

        Ok(LoadedPolicy {
            connection: ConnectionConfig::default(),
            hooks: HookPolicies {
                start: policy.clone(),
                end: policy,
            },
        })
    }
}

/// Default structured store path (`~/.lightcue/hooks.yaml`).
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lightcue")
        .join("hooks.yaml")
}

// Helper functions

pub fn optional_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => None,
        Ok(val) => Some(val),
        Err(_) => None,
    }
}

pub(crate) fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(s) => s.parse().unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid {key} '{s}': {e}");
            default
        }),
        None => default,
    }
}
