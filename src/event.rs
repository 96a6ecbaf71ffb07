//! Lifecycle events raised by the audio receiver.

use chrono::{DateTime, Utc};

/// Which end of the session the receiver is signalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A stream became active.
    Start,
    /// A stream became inactive.
    End,
}

impl EventKind {
    /// The activation state targets should be driven towards.
    pub fn desired_active(self) -> bool {
        matches!(self, EventKind::Start)
    }

    /// Stable lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::End => "end",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single session lifecycle event, consumed once per process invocation.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    /// Free-text context passed through by the receiver's hook mechanism
    /// (e.g. the stream's client name). Logged, never interpreted.
    pub annotation: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Create an event stamped with the current time.
    pub fn now(kind: EventKind, annotation: Option<String>) -> Self {
        Self {
            kind,
            annotation,
            timestamp: Utc::now(),
        }
    }
}
