//! outpost-core — drive Microsoft Outlook for Mac over AppleScript.
//!
//! This crate provides:
//! - Injection-safe AppleScript synthesis from caller-supplied text
//! - Attachment validation against allow-listed roots and a size ceiling
//! - An osascript execution layer that launches Outlook on demand
//! - A best-effort scraper turning Outlook's record literals into entities
//! - An ordered-fallback delivery pipeline for outgoing mail
//! - The tool surface consumed by the outer dispatch layer

pub mod applescript;
pub mod attachments;
pub mod commands;
pub mod error;
pub mod fallback;
pub mod records;
pub mod send;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use applescript::{escape_applescript_string, OutlookAutomation, OutlookRunner};
pub use attachments::{AttachmentPolicy, AttachmentRef, DEFAULT_MAX_ATTACHMENT_BYTES};
pub use error::OutpostError;
pub use fallback::Attempt;
pub use records::{scrape_records, CalendarEvent, Contact, FolderName, MailMessage};
pub use send::{deliver, OutgoingMail, SendReport};
pub use tools::{outlook_tools, ToolDefinition, ToolExecutor, ToolHandler, ToolRegistry};
