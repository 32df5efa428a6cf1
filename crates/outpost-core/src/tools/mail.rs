//! Mail tools backed by Outlook automation.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{json_schema, limit_from, required_str, ToolHandler};
use crate::applescript::OutlookAutomation;
use crate::attachments::AttachmentPolicy;
use crate::commands;
use crate::records::{scrape_records, FolderName, MailMessage};
use crate::send::{deliver, OutgoingMail};

fn folder_from(input: &Value) -> Option<String> {
    input
        .get("folder")
        .and_then(|v| v.as_str())
        .map(String::from)
}

/// Split a comma-separated address parameter into trimmed entries.
fn address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

async fn fetch_messages(
    runner: &dyn OutlookAutomation,
    script: String,
) -> Result<String> {
    runner.ensure_ready().await?;
    let raw = runner.run_script(&script).await?;
    let messages: Vec<MailMessage> = scrape_records(&raw)
        .iter()
        .map(MailMessage::from_record)
        .collect();
    Ok(serde_json::to_string_pretty(&messages)?)
}

/// List unread messages in a folder
pub struct UnreadEmailsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl UnreadEmailsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for UnreadEmailsTool {
    fn name(&self) -> &str {
        "unread_emails"
    }

    fn description(&self) -> &str {
        "List unread emails from Outlook. Returns id, subject, sender, and received date for each message."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "folder": {
                    "type": "string",
                    "description": "Mail folder name (default: Inbox)"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum messages to return (default: 10, max: 50)"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let folder = folder_from(&input);
        let limit = limit_from(&input);
        debug!("Listing {} unread emails from {:?}", limit, folder);
        fetch_messages(
            self.runner.as_ref(),
            commands::read_messages_script(folder.as_deref(), limit, true),
        )
        .await
    }
}

/// List recent messages in a folder, read or not
pub struct ReadEmailsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl ReadEmailsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for ReadEmailsTool {
    fn name(&self) -> &str {
        "read_emails"
    }

    fn description(&self) -> &str {
        "List recent emails from an Outlook folder regardless of read state."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "folder": {
                    "type": "string",
                    "description": "Mail folder name (default: Inbox)"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum messages to return (default: 10, max: 50)"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let folder = folder_from(&input);
        let limit = limit_from(&input);
        debug!("Listing {} emails from {:?}", limit, folder);
        fetch_messages(
            self.runner.as_ref(),
            commands::read_messages_script(folder.as_deref(), limit, false),
        )
        .await
    }
}

/// Free-text search across subject and body
pub struct SearchEmailsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl SearchEmailsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for SearchEmailsTool {
    fn name(&self) -> &str {
        "search_emails"
    }

    fn description(&self) -> &str {
        "Search Outlook messages whose subject or body contains the given text."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "search_term": {
                    "type": "string",
                    "description": "Text to look for in subject or body"
                },
                "folder": {
                    "type": "string",
                    "description": "Mail folder name (default: Inbox)"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum messages to return (default: 10, max: 50)"
                }
            }),
            vec!["search_term"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let term = required_str(&input, "search_term")?;
        let folder = folder_from(&input);
        let limit = limit_from(&input);
        debug!("Searching emails for '{}'", term);
        fetch_messages(
            self.runner.as_ref(),
            commands::search_messages_script(term, folder.as_deref(), limit),
        )
        .await
    }
}

/// List every mail folder name
pub struct ListMailFoldersTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl ListMailFoldersTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for ListMailFoldersTool {
    fn name(&self) -> &str {
        "list_mail_folders"
    }

    fn description(&self) -> &str {
        "List the names of all Outlook mail folders."
    }

    fn input_schema(&self) -> Value {
        json_schema(serde_json::json!({}), vec![])
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        debug!("Listing mail folders");
        self.runner.ensure_ready().await?;
        let raw = self.runner.run_script(&commands::list_folders_script()).await?;
        let folders: Vec<FolderName> = scrape_records(&raw)
            .iter()
            .map(FolderName::from_record)
            .collect();
        Ok(serde_json::to_string_pretty(&folders)?)
    }
}

/// Compose and send a message, with optional attachments
pub struct SendEmailTool {
    runner: Arc<dyn OutlookAutomation>,
    policy: AttachmentPolicy,
}

impl SendEmailTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>, policy: AttachmentPolicy) -> Self {
        Self { runner, policy }
    }
}

#[async_trait]
impl ToolHandler for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Compose and send an email through Outlook. Falls back to leaving a visible draft if sending fails."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "to": {
                    "type": "string",
                    "description": "Recipient addresses, comma separated"
                },
                "subject": {
                    "type": "string",
                    "description": "Message subject"
                },
                "body": {
                    "type": "string",
                    "description": "Message body"
                },
                "cc": {
                    "type": "string",
                    "description": "Cc addresses, comma separated"
                },
                "bcc": {
                    "type": "string",
                    "description": "Bcc addresses, comma separated"
                },
                "is_html": {
                    "type": "boolean",
                    "description": "Treat the body as HTML (default: false)"
                },
                "attachments": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "File paths to attach; must live under an allowed directory"
                }
            }),
            vec!["to", "subject", "body"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let to = address_list(required_str(&input, "to")?);
        let subject = required_str(&input, "subject")?.to_string();
        let body = required_str(&input, "body")?.to_string();
        if to.is_empty() {
            anyhow::bail!("Missing 'to' parameter");
        }
        let cc = input
            .get("cc")
            .and_then(|v| v.as_str())
            .map(address_list)
            .unwrap_or_default();
        let bcc = input
            .get("bcc")
            .and_then(|v| v.as_str())
            .map(address_list)
            .unwrap_or_default();
        let html = input
            .get("is_html")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let attachment_paths: Vec<String> = input
            .get("attachments")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        // Attachment validation happens before any automation call; a
        // rejected path fails the send here.
        let attachments = self.policy.validate(&attachment_paths).await?;

        debug!(
            "Sending email to {} recipient(s), {} attachment(s)",
            to.len(),
            attachments.len()
        );

        self.runner.ensure_ready().await?;
        let mail = OutgoingMail {
            to,
            cc,
            bcc,
            subject,
            body,
            html,
            attachments,
        };
        let report = deliver(self.runner.as_ref(), &mail).await?;
        Ok(report.confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutpostError;
    use crate::testing::ScriptedRunner;

    fn runner_with(replies: Vec<Result<String, OutpostError>>) -> Arc<ScriptedRunner> {
        Arc::new(ScriptedRunner::new(replies))
    }

    #[test]
    fn send_email_schema_requires_the_envelope() {
        let tool = SendEmailTool::new(
            runner_with(Vec::new()),
            AttachmentPolicy::new(Vec::new(), 1024),
        );
        assert_eq!(tool.name(), "send_email");
        let schema = tool.input_schema();
        let required: Vec<String> = serde_json::from_value(
            schema
                .get("required")
                .cloned()
                .unwrap_or(serde_json::json!([])),
        )
        .unwrap_or_default();
        assert!(required.contains(&"to".to_string()));
        assert!(required.contains(&"subject".to_string()));
        assert!(required.contains(&"body".to_string()));
    }

    #[tokio::test]
    async fn send_email_missing_params() {
        let tool = SendEmailTool::new(
            runner_with(Vec::new()),
            AttachmentPolicy::new(Vec::new(), 1024),
        );
        let result = tool
            .execute(serde_json::json!({"to": "test@test.com"}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn send_succeeds_with_a_single_automation_call() {
        let runner = runner_with(vec![Ok("Message sent".to_string())]);
        let tool = SendEmailTool::new(
            runner.clone(),
            AttachmentPolicy::new(Vec::new(), 1024),
        );
        let result = tool
            .execute(serde_json::json!({
                "to": "alex@example.com",
                "subject": "Project Update",
                "body": "Status is green."
            }))
            .await
            .unwrap();
        assert_eq!(result, "Message sent");
        assert_eq!(runner.script_count(), 1);
        assert!(!runner.scripts()[0].contains("draft window"));
    }

    #[tokio::test]
    async fn traversal_attachment_fails_validation_before_any_call() {
        let root = tempfile::tempdir().unwrap();
        let runner = runner_with(Vec::new());
        let tool = SendEmailTool::new(
            runner.clone(),
            AttachmentPolicy::new(vec![root.path().to_path_buf()], 1024),
        );
        let err = tool
            .execute(serde_json::json!({
                "to": "alex@example.com",
                "subject": "hi",
                "body": "hi",
                "attachments": ["../../etc/passwd"]
            }))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OutpostError>(),
            Some(OutpostError::Validation(_))
        ));
        assert_eq!(runner.script_count(), 0);
        assert_eq!(runner.ready_calls(), 0);
    }

    #[tokio::test]
    async fn unread_listing_parses_records() {
        let runner = runner_with(vec![Ok(
            "{id:1, subject:A, sender:B}\n{id:2, subject:C, sender:D}".to_string()
        )]);
        let tool = UnreadEmailsTool::new(runner.clone());
        let payload = tool.execute(serde_json::json!({"limit": 2})).await.unwrap();
        let messages: Vec<MailMessage> = serde_json::from_str(&payload).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].subject, "A");
        assert_eq!(messages[1].sender, "D");
        assert_eq!(runner.ready_calls(), 1);
        assert!(runner.scripts()[0].contains("is read is false"));
    }

    #[tokio::test]
    async fn search_requires_a_term() {
        let tool = SearchEmailsTool::new(runner_with(Vec::new()));
        assert!(tool.execute(serde_json::json!({})).await.is_err());
    }

    #[tokio::test]
    async fn folder_listing_parses_names() {
        let runner = runner_with(vec![Ok("{name:Inbox}\n{name:Archive}".to_string())]);
        let tool = ListMailFoldersTool::new(runner);
        let payload = tool.execute(serde_json::json!({})).await.unwrap();
        let folders: Vec<FolderName> = serde_json::from_str(&payload).unwrap();
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[1].name, "Archive");
    }
}
