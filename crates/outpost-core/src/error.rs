//! Error types for the Outlook automation bridge.

/// Top-level error for every Outlook-facing operation.
///
/// There is deliberately no parse variant: a record block that cannot be
/// decoded is dropped by the scraper, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum OutpostError {
    /// Outlook is not installed, could not be launched, or osascript is
    /// unavailable.
    #[error("Outlook is not available: {0}")]
    Access(String),

    /// The request was rejected before any automation call was made.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Outlook accepted the command but reported a failure.
    #[error("Outlook automation failed: {0}")]
    Automation(String),
}
