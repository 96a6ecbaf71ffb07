//! Device classifier.
//!
//! Some device firmwares intermittently ignore a single state-set command
//! when they believe they are already in that state. Targets backed by
//! such devices get the toggle/pulse treatment from the applier instead
//! of plain repeated sets.

use std::collections::HashMap;

use crate::control::{DeviceInfo, VirtualInfo};

/// Device types whose actuation is known to be unreliable.
pub const UNRELIABLE_DEVICE_TYPES: &[&str] = &["wled"];

/// Reliability class of a target, derived per invocation and never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    /// Honors a single state-set call.
    Standard,
    /// Needs the toggle/pulse pattern to force re-evaluation.
    UnreliableActuation,
}

impl std::fmt::Display for TargetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetClass::Standard => f.write_str("standard"),
            TargetClass::UnreliableActuation => f.write_str("unreliable-actuation"),
        }
    }
}

/// Classify a target from its segment composition.
///
/// A target is [`TargetClass::UnreliableActuation`] iff any of its
/// segments belongs to a device of a known-unreliable type. Unknown
/// devices, empty segment lists and registry gaps all classify as
/// [`TargetClass::Standard`].
pub fn classify(
    virtual_info: Option<&VirtualInfo>,
    devices: &HashMap<String, DeviceInfo>,
) -> TargetClass {
    let Some(info) = virtual_info else {
        return TargetClass::Standard;
    };

    let unreliable = info.segments.iter().any(|segment| {
        devices
            .get(segment.device_id())
            .is_some_and(|d| UNRELIABLE_DEVICE_TYPES.contains(&d.device_type.as_str()))
    });

    if unreliable {
        TargetClass::UnreliableActuation
    } else {
        TargetClass::Standard
    }
}
