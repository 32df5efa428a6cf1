//! Environment configuration for the outpost binary.
//!
//! Two settings control the attachment security boundary; everything else
//! in the system is parameterized per call.

use std::path::PathBuf;

use outpost_core::attachments::{AttachmentPolicy, DEFAULT_MAX_ATTACHMENT_BYTES};
use tracing::warn;

/// Colon-separated list of directories attachments may come from.
/// Unset: the process working directory.
pub const ROOTS_ENV: &str = "OUTPOST_ATTACHMENT_ROOTS";

/// Attachment size ceiling in bytes. Unset: 10485760 (10 MiB).
pub const MAX_BYTES_ENV: &str = "OUTPOST_ATTACHMENT_MAX_BYTES";

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

pub fn attachment_policy_from_env() -> anyhow::Result<AttachmentPolicy> {
    let max_bytes = match std::env::var(MAX_BYTES_ENV) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Ignoring {}={:?}: not a byte count, using default",
                    MAX_BYTES_ENV, raw
                );
                DEFAULT_MAX_ATTACHMENT_BYTES
            }
        },
        Err(_) => DEFAULT_MAX_ATTACHMENT_BYTES,
    };

    let roots = match std::env::var(ROOTS_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(':')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(expand_home)
            .collect(),
        _ => vec![std::env::current_dir()?],
    };

    Ok(AttachmentPolicy::new(roots, max_bytes))
}
