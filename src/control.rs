//! The remote control API seam.
//!
//! Everything above the HTTP client talks to [`ControlApi`], so the
//! orchestrator and applier can be exercised against an in-memory
//! implementation in tests. The production implementation lives in
//! [`crate::ledfx`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ControlError, RegistryError};

/// One registry entry: a target ("virtual") and its device composition.
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualInfo {
    #[serde(default)]
    pub active: bool,
    /// Segment rows as `[device_id, start, end, flip]`.
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// A slice of a device assigned to a virtual.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment(pub String, pub i64, pub i64, pub bool);

impl Segment {
    pub fn device_id(&self) -> &str {
        &self.0
    }
}

/// One device entry from the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "type", default)]
    pub device_type: String,
}

/// Remote control API consumed by the hook.
///
/// Read paths (`list_*`, `virtual_state`) fail with [`RegistryError`] and
/// are always degradable; the write path fails with [`ControlError`] and
/// is counted per target.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Full target registry snapshot, keyed by target id.
    async fn list_virtuals(&self) -> Result<HashMap<String, VirtualInfo>, RegistryError>;

    /// Device registry snapshot, keyed by device id.
    async fn list_devices(&self) -> Result<HashMap<String, DeviceInfo>, RegistryError>;

    /// Current activation state of a single target.
    async fn virtual_state(&self, id: &str) -> Result<bool, RegistryError>;

    /// Set a target's activation state. Idempotent on the remote side.
    async fn set_virtual_active(&self, id: &str, active: bool) -> Result<(), ControlError>;
}
