//! AppleScript escaping and the osascript execution layer.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::OutpostError;

/// Name of the automation target, used by every generated script.
pub const OUTLOOK_APP: &str = "Microsoft Outlook";

/// Prefix generated scripts use to report their own failures: every script
/// body is wrapped in `try … on error errMsg return "Error: " & errMsg`.
const ERROR_MARKER: &str = "Error:";

/// Settle delay after a cold launch. Outlook exposes no readiness signal,
/// so this is a heuristic, not a guarantee.
const LAUNCH_SETTLE: Duration = Duration::from_secs(3);

/// Escape caller text for interpolation inside a double-quoted AppleScript
/// literal.
///
/// Backslashes are escaped before anything else so later substitutions are
/// not double-escaped; carriage returns are stripped and line feeds become
/// the `\n` token. No other characters are altered, so generated scripts
/// stay readable.
pub fn escape_applescript_string(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "")
        .replace('\n', "\\n")
}

/// Execution seam between the script builders and osascript.
#[async_trait]
pub trait OutlookAutomation: Send + Sync {
    /// Make sure Outlook is running, launching it if necessary.
    async fn ensure_ready(&self) -> Result<(), OutpostError>;

    /// Run one script and return its raw textual reply.
    async fn run_script(&self, script: &str) -> Result<String, OutpostError>;
}

/// Drives Microsoft Outlook through `osascript`.
pub struct OutlookRunner;

impl OutlookRunner {
    async fn is_outlook_running(&self) -> bool {
        let script = format!(
            r#"tell application "System Events" to (name of processes) contains "{OUTLOOK_APP}""#
        );
        match tokio::time::timeout(
            Duration::from_secs(10),
            Command::new("osascript").arg("-e").arg(&script).output(),
        )
        .await
        {
            Ok(Ok(output)) => String::from_utf8_lossy(&output.stdout).trim() == "true",
            _ => false,
        }
    }
}

/// Promote the script-level error convention to a real error. A reply that
/// starts with the marker is a failure, never a silent success.
fn interpret_reply(raw: String) -> Result<String, OutpostError> {
    if let Some(message) = raw.trim_start().strip_prefix(ERROR_MARKER) {
        let message = message.trim().to_string();
        warn!("Outlook reported an error: {}", message);
        return Err(OutpostError::Automation(message));
    }
    Ok(raw)
}

#[async_trait]
impl OutlookAutomation for OutlookRunner {
    async fn ensure_ready(&self) -> Result<(), OutpostError> {
        if self.is_outlook_running().await {
            return Ok(());
        }

        info!("Outlook is not running, launching it");
        let launch = format!(r#"tell application "{OUTLOOK_APP}" to launch"#);
        let output = Command::new("osascript")
            .arg("-e")
            .arg(&launch)
            .output()
            .await
            .map_err(|e| OutpostError::Access(format!("failed to run osascript: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OutpostError::Access(format!(
                "Microsoft Outlook is not installed or could not be launched: {}",
                stderr.trim()
            )));
        }

        // Wait for the process to appear, then give it a moment to finish
        // its initial sync.
        for _ in 0..15 {
            tokio::time::sleep(Duration::from_secs(2)).await;
            if self.is_outlook_running().await {
                debug!("Outlook is now running");
                tokio::time::sleep(LAUNCH_SETTLE).await;
                return Ok(());
            }
        }

        warn!("Outlook may not have fully launched, proceeding anyway");
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<String, OutpostError> {
        // No timeout here. A send that outlived a client-side timeout may
        // still land in Outlook, and retrying it would duplicate the
        // message; a hung Outlook blocks the call instead.
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .await
            .map_err(|e| OutpostError::Access(format!("failed to run osascript: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("osascript failed: {}", stderr);
            return Err(OutpostError::Automation(stderr));
        }

        interpret_reply(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_backslashes_before_quotes() {
        assert_eq!(escape_applescript_string(r#"a\"b"#), r#"a\\\"b"#);
    }

    #[test]
    fn escapes_quotes() {
        assert_eq!(escape_applescript_string("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn strips_carriage_returns_and_tokenizes_line_feeds() {
        assert_eq!(escape_applescript_string("a\r\nb\nc"), "a\\nb\\nc");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(
            escape_applescript_string("Project Update — Q3 statusbericht"),
            "Project Update — Q3 statusbericht"
        );
    }

    #[test]
    fn every_input_is_neutralized() {
        let attack = "x\"; do shell script \"rm -rf ~\" --\"\n";
        let safe = escape_applescript_string(attack);
        assert!(!safe.contains('\n'));
        assert!(!safe.contains('\r'));
        // Every remaining quote is escaped.
        let bytes = safe.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'"' {
                assert_eq!(bytes[i - 1], b'\\');
            }
        }
    }

    #[test]
    fn error_marker_reply_is_a_failure() {
        let err = interpret_reply("Error: Mail could not be sent.".to_string()).unwrap_err();
        match err {
            OutpostError::Automation(message) => {
                assert_eq!(message, "Mail could not be sent.");
            }
            other => panic!("expected Automation, got {other:?}"),
        }
    }

    #[test]
    fn plain_reply_passes_through() {
        let raw = "{subject:Weekly sync}\n".to_string();
        assert_eq!(interpret_reply(raw.clone()).unwrap(), raw);
    }
}
