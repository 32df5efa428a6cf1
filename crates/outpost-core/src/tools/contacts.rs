//! Contact tools backed by Outlook automation.
//!
//! Both tools run a two-strategy chain: the `whose`-filtered query first,
//! then a manual scan of the whole address book.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{json_schema, limit_from, required_str, ToolHandler};
use crate::applescript::OutlookAutomation;
use crate::commands;
use crate::fallback::run_chain;
use crate::records::{scrape_records, Contact};

async fn fetch_contacts(
    runner: &dyn OutlookAutomation,
    strategies: &[(&'static str, String)],
) -> Result<String> {
    runner.ensure_ready().await?;
    let (raw, _attempts) = run_chain(runner, strategies).await?;
    let contacts: Vec<Contact> = scrape_records(&raw)
        .iter()
        .map(Contact::from_record)
        .collect();
    Ok(serde_json::to_string_pretty(&contacts)?)
}

/// List address book entries
pub struct ListContactsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl ListContactsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for ListContactsTool {
    fn name(&self) -> &str {
        "list_contacts"
    }

    fn description(&self) -> &str {
        "List Outlook contacts with name, email, phone, and company."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "limit": {
                    "type": "number",
                    "description": "Maximum contacts to return (default: 10, max: 50)"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let limit = limit_from(&input);
        debug!("Listing up to {} contacts", limit);
        let strategies = [
            ("contact-list", commands::list_contacts_script(limit)),
            ("contact-scan", commands::scan_contacts_script(None, limit)),
        ];
        fetch_contacts(self.runner.as_ref(), &strategies).await
    }
}

/// Search address book entries by name
pub struct SearchContactsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl SearchContactsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for SearchContactsTool {
    fn name(&self) -> &str {
        "search_contacts"
    }

    fn description(&self) -> &str {
        "Search Outlook contacts whose name contains the given text."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "search_term": {
                    "type": "string",
                    "description": "Text to look for in contact names"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum contacts to return (default: 10, max: 50)"
                }
            }),
            vec!["search_term"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let term = required_str(&input, "search_term")?;
        let limit = limit_from(&input);
        debug!("Searching contacts for '{}'", term);
        let strategies = [
            (
                "contact-filter",
                commands::search_contacts_script(term, limit),
            ),
            (
                "contact-scan",
                commands::scan_contacts_script(Some(term), limit),
            ),
        ];
        fetch_contacts(self.runner.as_ref(), &strategies).await
    }
}
