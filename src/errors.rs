//! Error types for the SoC controller
//!
//! Uses thiserror for ergonomic error definitions.
//! These errors can be converted to anyhow::Error in the main application.

/// Home Assistant telemetry errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry source unreachable: {0}")]
    Unreachable(String),

    #[error("telemetry query rejected with HTTP {0}")]
    Rejected(u16),

    #[error("telemetry response malformed: {0}")]
    Malformed(String),

    #[error("sensor state is not numeric: {0:?}")]
    NotNumeric(String),
}

/// Miner session and command errors
#[derive(Debug, thiserror::Error)]
pub enum MinerError {
    #[error("miner unreachable: {0}")]
    Unreachable(String),

    #[error("credentials rejected by miner")]
    AuthRejected,

    #[error("unlock failed with HTTP {0}")]
    UnlockFailed(u16),

    #[error("unlock response lacked a token field")]
    MissingToken,

    /// Session token no longer accepted (HTTP 401). Handled inside the
    /// session by a single re-authentication; callers never see this
    /// variant surface from a session operation.
    #[error("session token expired")]
    SessionExpired,

    #[error("still unauthorized after re-authentication")]
    ReauthFailed,

    #[error("no status endpoint found (tried /status and /summary)")]
    NoStatusEndpoint,

    #[error("status query failed with HTTP {0}")]
    StatusFailed(u16),

    #[error("command rejected with HTTP {0}")]
    CommandFailed(u16),

    #[error("miner response malformed: {0}")]
    Malformed(String),
}
