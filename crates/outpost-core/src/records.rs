//! Best-effort scraping of Outlook's record-literal replies into typed
//! entities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Extract flat `{key:value, …}` blocks from a raw reply, in reply order.
///
/// This is a scraper, not a parser. Spans are maximal non-nested brace
/// runs, fragments split on commas, keys split on the first colon, both
/// sides trimmed. Outlook does not escape its output, so a nested brace or
/// a comma inside a value bleeds into the surrounding structure; such
/// fragments are dropped or mis-keyed rather than failing the batch. A
/// block that yields no usable key is skipped silently.
pub fn scrape_records(raw: &str) -> Vec<HashMap<String, String>> {
    let mut records = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find('{') {
        let body = &rest[open + 1..];
        let Some(close) = body.find('}') else { break };
        let mut record = HashMap::new();
        for fragment in body[..close].split(',') {
            let Some((key, value)) = fragment.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            record.insert(key.to_string(), value.trim().to_string());
        }
        if !record.is_empty() {
            records.push(record);
        }
        rest = &body[close + 1..];
    }
    records
}

/// Copy `key` out of a scraped record, substituting `default` when the
/// field is absent or empty. Entities never carry missing fields.
fn field(record: &HashMap<String, String>, key: &str, default: &str) -> String {
    match record.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub received: String,
}

impl MailMessage {
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        Self {
            id: field(record, "id", ""),
            subject: field(record, "subject", "No subject"),
            sender: field(record, "sender", "Unknown sender"),
            received: field(record, "received", "Unknown date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub subject: String,
    pub start: String,
    pub end: String,
    pub location: String,
}

impl CalendarEvent {
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        Self {
            id: field(record, "id", ""),
            subject: field(record, "subject", "No subject"),
            start: field(record, "start", "Unknown date"),
            end: field(record, "end", "Unknown date"),
            location: field(record, "location", ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
}

impl Contact {
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        Self {
            name: field(record, "name", "Unknown contact"),
            email: field(record, "email", ""),
            phone: field(record, "phone", ""),
            company: field(record, "company", ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderName {
    pub name: String,
}

impl FolderName {
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        Self {
            name: field(record, "name", "(unnamed)"),
        }
    }
}
