//! Ordered strategy execution for actions with more than one way to
//! succeed.

use tracing::{debug, warn};

use crate::applescript::OutlookAutomation;
use crate::error::OutpostError;

/// One strategy attempt: which strategy ran and how it ended. On success
/// `detail` is Outlook's confirmation text, on failure its error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: &'static str,
    pub success: bool,
    pub detail: String,
}

/// Run `strategies` in order until one succeeds.
///
/// Each entry is a label and a complete script built from scratch; nothing
/// carries over between attempts. An automation failure is recorded and the
/// next strategy runs. After a success no further strategy runs, ever.
/// Exhaustion fails with the aggregated per-strategy messages. Any
/// non-automation error aborts the chain immediately.
pub async fn run_chain(
    runner: &dyn OutlookAutomation,
    strategies: &[(&'static str, String)],
) -> Result<(String, Vec<Attempt>), OutpostError> {
    let mut attempts = Vec::with_capacity(strategies.len());
    for &(label, ref script) in strategies {
        match runner.run_script(script).await {
            Ok(raw) => {
                debug!("Strategy {} succeeded", label);
                attempts.push(Attempt {
                    strategy: label,
                    success: true,
                    detail: raw.trim().to_string(),
                });
                return Ok((raw, attempts));
            }
            Err(OutpostError::Automation(message)) => {
                warn!("Strategy {} failed: {}", label, message);
                attempts.push(Attempt {
                    strategy: label,
                    success: false,
                    detail: message,
                });
            }
            Err(other) => return Err(other),
        }
    }

    let summary = attempts
        .iter()
        .map(|attempt| format!("{}: {}", attempt.strategy, attempt.detail))
        .collect::<Vec<_>>()
        .join("; ");
    Err(OutpostError::Automation(summary))
}
