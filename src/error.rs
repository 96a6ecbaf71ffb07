//! Error types for lightcue.
//!
//! Nothing in this taxonomy is fatal to the hook's caller: policy errors
//! fail open to defaults, registry errors degrade to Standard
//! classification, and control-call errors are counted per target. Errors
//! exist so that each layer can report precisely what went wrong in the
//! logs, not so that anything propagates out of the process.

/// Top-level error type for the hook.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),
}

/// Policy-store errors. Both variants fail open to the default policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Policy store not found at {path}")]
    Unavailable { path: String },

    #[error("Failed to parse policy store {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("IO error reading policy store: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry read errors. Fail open: classification degrades to Standard
/// and an all-targets resolution degrades to an empty snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Registry unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
}

/// State-set call errors. Counted per target, never aborting the fan-out.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Control call for target {target_id} failed: {reason}")]
    CallFailed { target_id: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for the hook.
pub type Result<T> = std::result::Result<T, Error>;
