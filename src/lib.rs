//! Session-lifecycle hooks for LedFx-style visualization targets.
//!
//! An audio receiver (e.g. an AirPlay endpoint) invokes the `lightcue`
//! binary when a stream becomes active or inactive. Each invocation is a
//! one-shot run:
//!
//! ```text
//! lifecycle event ──▶ policy store ──▶ target resolution ──▶ state applier
//!   (start/stop)      (fresh read)     (all / explicit)      (per target)
//! ```
//!
//! The policy document is re-read on every event, so edits take effect on
//! the very next invocation without a restart. Every failure along the way
//! is absorbed and logged; the hook never signals an error to its caller,
//! because the audio path has no recovery action available to it.

pub mod applier;
pub mod classify;
pub mod control;
pub mod error;
pub mod event;
pub mod ledfx;
pub mod orchestrator;
pub mod policy;

pub use error::{Error, Result};
pub use event::{EventKind, LifecycleEvent};
pub use orchestrator::HookOrchestrator;
pub use policy::PolicyStore;
