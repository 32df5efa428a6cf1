//! Message delivery pipeline.
//!
//! Sending is the one multi-step mutating operation in the system. Three
//! composition strategies run in a fixed order through the strategy-chain
//! driver: compose-and-send, the draft-window object model, and finally a
//! visible draft left open for the user. Success at any stage stops the
//! chain; success at the last stage means "a draft exists for manual
//! completion", not "delivered".

use crate::applescript::{escape_applescript_string, OutlookAutomation, OUTLOOK_APP};
use crate::attachments::AttachmentRef;
use crate::error::OutpostError;
use crate::fallback::{run_chain, Attempt};

const STRATEGY_COMPOSE: &str = "compose-and-send";
const STRATEGY_DRAFT_WINDOW: &str = "draft-window";
const STRATEGY_VISIBLE_DRAFT: &str = "visible-draft";

/// A fully validated outgoing message. Attachments are refs from
/// [`crate::attachments::AttachmentPolicy::validate`]; raw caller paths
/// cannot get here.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub html: bool,
    pub attachments: Vec<AttachmentRef>,
}

/// Outcome of a delivery: Outlook's confirmation plus every attempt made.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub confirmation: String,
    pub attempts: Vec<Attempt>,
}

/// Try each composition strategy in order until one reports success. Each
/// strategy builds its complete script from scratch, so a failed attempt
/// leaves nothing half-queued for the next one.
pub async fn deliver(
    runner: &dyn OutlookAutomation,
    mail: &OutgoingMail,
) -> Result<SendReport, OutpostError> {
    let strategies = [
        (STRATEGY_COMPOSE, compose_and_send_script(mail)),
        (STRATEGY_DRAFT_WINDOW, draft_window_script(mail)),
        (STRATEGY_VISIBLE_DRAFT, visible_draft_script(mail)),
    ];
    let (raw, attempts) = run_chain(runner, &strategies).await?;
    Ok(SendReport {
        confirmation: raw.trim().to_string(),
        attempts,
    })
}

/// Outlook treats `content` as HTML; plain-text bodies go through the
/// `plain text content` property instead.
fn content_property(mail: &OutgoingMail) -> String {
    let safe_body = escape_applescript_string(&mail.body);
    if mail.html {
        format!(r#"content:"{safe_body}""#)
    } else {
        format!(r#"plain text content:"{safe_body}""#)
    }
}

fn recipient_lines(mail: &OutgoingMail, target: &str) -> String {
    let mut lines = String::new();
    for (kind, addresses) in [("to", &mail.to), ("cc", &mail.cc), ("bcc", &mail.bcc)] {
        for address in addresses {
            lines.push_str(&format!(
                "\n        make new {kind} recipient at {target} with properties {{email address:{{address:\"{}\"}}}}",
                escape_applescript_string(address)
            ));
        }
    }
    lines
}

fn attachment_lines(attachments: &[AttachmentRef], target: &str, best_effort: bool) -> String {
    let mut lines = String::new();
    for attachment in attachments {
        let posix = escape_applescript_string(&attachment.canonical.to_string_lossy());
        if best_effort {
            lines.push_str(&format!(
                "\n        try\n            make new attachment at {target} with properties {{file:POSIX file \"{posix}\"}}\n        end try"
            ));
        } else {
            lines.push_str(&format!(
                "\n        make new attachment at {target} with properties {{file:POSIX file \"{posix}\"}}"
            ));
        }
    }
    if !attachments.is_empty() {
        // Settle delay: Outlook queues attachments asynchronously and a
        // send issued immediately can drop them.
        lines.push_str("\n        delay 1");
    }
    lines
}

fn compose_and_send_script(mail: &OutgoingMail) -> String {
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set newMessage to make new outgoing message with properties {{subject:"{subject}", {content}}}{recipients}{attachments}
        send newMessage
        return "Message sent"
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        subject = escape_applescript_string(&mail.subject),
        content = content_property(mail),
        recipients = recipient_lines(mail, "newMessage"),
        attachments = attachment_lines(&mail.attachments, "newMessage", false),
    )
}

/// Alternate composition path over Outlook's draft-window object model,
/// which survives some Exchange-profile states where `outgoing message`
/// creation fails.
fn draft_window_script(mail: &OutgoingMail) -> String {
    let mut recipient_sets = format!(
        "\n        set to recipients of theDraft to \"{}\"",
        escape_applescript_string(&mail.to.join(", "))
    );
    if !mail.cc.is_empty() {
        recipient_sets.push_str(&format!(
            "\n        set cc recipients of theDraft to \"{}\"",
            escape_applescript_string(&mail.cc.join(", "))
        ));
    }
    if !mail.bcc.is_empty() {
        recipient_sets.push_str(&format!(
            "\n        set bcc recipients of theDraft to \"{}\"",
            escape_applescript_string(&mail.bcc.join(", "))
        ));
    }
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set theDraft to make new draft window with properties {{subject:"{subject}", {content}}}{recipient_sets}{attachments}
        send theDraft
        return "Message sent via draft window"
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        subject = escape_applescript_string(&mail.subject),
        content = content_property(mail),
        attachments = attachment_lines(&mail.attachments, "theDraft", false),
    )
}

/// Last resort: leave a visible draft for the user to finish by hand.
/// Attachments are best-effort here; a failing one must not take the whole
/// draft down with it.
fn visible_draft_script(mail: &OutgoingMail) -> String {
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set newMessage to make new outgoing message with properties {{subject:"{subject}", {content}}}{recipients}{attachments}
        open newMessage
        activate
        return "Draft left open in Outlook for manual review"
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        subject = escape_applescript_string(&mail.subject),
        content = content_property(mail),
        recipients = recipient_lines(mail, "newMessage"),
        attachments = attachment_lines(&mail.attachments, "newMessage", true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    fn plain_mail() -> OutgoingMail {
        OutgoingMail {
            to: vec!["alex@example.com".to_string()],
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: "Project Update".to_string(),
            body: "Status is green.".to_string(),
            html: false,
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn first_strategy_success_makes_one_call() {
        let runner = ScriptedRunner::new(vec![Ok("Message sent".to_string())]);
        let report = deliver(&runner, &plain_mail()).await.unwrap();
        assert_eq!(runner.script_count(), 1);
        assert_eq!(report.confirmation, "Message sent");
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].strategy, "compose-and-send");
        assert!(runner.scripts()[0].contains("send newMessage"));
    }

    #[tokio::test]
    async fn second_strategy_runs_after_first_fails() {
        let runner = ScriptedRunner::new(vec![
            Err(OutpostError::Automation("cannot create message".to_string())),
            Ok("Message sent via draft window".to_string()),
        ]);
        let report = deliver(&runner, &plain_mail()).await.unwrap();
        assert_eq!(runner.script_count(), 2);
        assert!(runner.scripts()[1].contains("draft window"));
        assert_eq!(report.attempts.len(), 2);
        assert!(!report.attempts[0].success);
        assert!(report.attempts[1].success);
        assert_eq!(report.attempts[1].strategy, "draft-window");
    }

    #[tokio::test]
    async fn exhaustion_reports_all_three_strategies() {
        let runner = ScriptedRunner::new(vec![
            Err(OutpostError::Automation("one".to_string())),
            Err(OutpostError::Automation("two".to_string())),
            Err(OutpostError::Automation("three".to_string())),
        ]);
        let err = deliver(&runner, &plain_mail()).await.unwrap_err();
        assert_eq!(runner.script_count(), 3);
        match err {
            OutpostError::Automation(summary) => {
                assert!(summary.contains("compose-and-send: one"));
                assert!(summary.contains("draft-window: two"));
                assert!(summary.contains("visible-draft: three"));
            }
            other => panic!("expected Automation, got {other:?}"),
        }
    }

    #[test]
    fn subject_and_body_are_escaped() {
        let mut mail = plain_mail();
        mail.subject = "Update\" & (do shell script \"id\") & \"".to_string();
        mail.body = "line one\nline two".to_string();
        let script = compose_and_send_script(&mail);
        assert!(!script.contains("Update\" & (do shell script"));
        assert!(script.contains(r#"plain text content:"line one\nline two""#));
    }

    #[test]
    fn html_flag_switches_the_content_property() {
        let mut mail = plain_mail();
        mail.html = true;
        mail.body = "<p>hello</p>".to_string();
        let script = compose_and_send_script(&mail);
        assert!(script.contains(r#"content:"<p>hello</p>""#));
        assert!(!script.contains("plain text content"));
    }

    #[test]
    fn every_recipient_kind_is_emitted() {
        let mut mail = plain_mail();
        mail.cc = vec!["kim@example.com".to_string()];
        mail.bcc = vec!["pat@example.com".to_string()];
        let script = compose_and_send_script(&mail);
        assert!(script.contains(r#"make new to recipient at newMessage with properties {email address:{address:"alex@example.com"}}"#));
        assert!(script.contains(r#"make new cc recipient at newMessage with properties {email address:{address:"kim@example.com"}}"#));
        assert!(script.contains(r#"make new bcc recipient at newMessage with properties {email address:{address:"pat@example.com"}}"#));
    }

    #[test]
    fn attachments_add_a_settle_delay() {
        let mut mail = plain_mail();
        mail.attachments = vec![AttachmentRef {
            requested: "report.pdf".to_string(),
            canonical: "/home/alex/report.pdf".into(),
            size: 4,
        }];
        let script = compose_and_send_script(&mail);
        assert!(script.contains(r#"POSIX file "/home/alex/report.pdf""#));
        assert!(script.contains("delay 1"));
        assert!(!script.contains("try\n            make new attachment"));
    }

    #[test]
    fn visible_draft_attaches_best_effort_and_never_sends() {
        let mut mail = plain_mail();
        mail.attachments = vec![AttachmentRef {
            requested: "report.pdf".to_string(),
            canonical: "/home/alex/report.pdf".into(),
            size: 4,
        }];
        let script = visible_draft_script(&mail);
        assert!(script.contains("try\n            make new attachment"));
        assert!(script.contains("open newMessage"));
        assert!(!script.contains("send newMessage"));
    }
}
