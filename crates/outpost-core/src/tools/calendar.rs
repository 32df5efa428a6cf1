//! Calendar tools backed by Outlook automation.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::debug;

use super::{json_schema, limit_from, required_str, ToolHandler};
use crate::applescript::OutlookAutomation;
use crate::commands;
use crate::records::{scrape_records, CalendarEvent};

const DEFAULT_UPCOMING_DAYS: u64 = 7;

/// Parse a caller-supplied wall-clock timestamp. The components are used
/// as-is when the event script assigns the AppleScript date; callers are
/// responsible for supplying timezone-correct local time.
fn parse_wall_clock(value: &str) -> Result<NaiveDateTime> {
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    Err(anyhow!(
        "'{value}' is not a wall-clock timestamp (expected e.g. 2026-08-06T14:30)"
    ))
}

async fn fetch_events(runner: &dyn OutlookAutomation, script: String) -> Result<String> {
    runner.ensure_ready().await?;
    let raw = runner.run_script(&script).await?;
    let events: Vec<CalendarEvent> = scrape_records(&raw)
        .iter()
        .map(CalendarEvent::from_record)
        .collect();
    Ok(serde_json::to_string_pretty(&events)?)
}

/// Today's events across every calendar
pub struct TodaysEventsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl TodaysEventsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for TodaysEventsTool {
    fn name(&self) -> &str {
        "todays_events"
    }

    fn description(&self) -> &str {
        "List today's calendar events from Outlook, across all calendars."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "limit": {
                    "type": "number",
                    "description": "Maximum events to return (default: 10, max: 50)"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let limit = limit_from(&input);
        debug!("Listing up to {} events for today", limit);
        fetch_events(self.runner.as_ref(), commands::todays_events_script(limit)).await
    }
}

/// Events over the next N days
pub struct UpcomingEventsTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl UpcomingEventsTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for UpcomingEventsTool {
    fn name(&self) -> &str {
        "upcoming_events"
    }

    fn description(&self) -> &str {
        "List upcoming Outlook calendar events over the next few days."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "days": {
                    "type": "number",
                    "description": "How many days ahead to look (default: 7)"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum events to return (default: 10, max: 50)"
                }
            }),
            vec![],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let days = input
            .get("days")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_UPCOMING_DAYS);
        let limit = limit_from(&input);
        debug!("Listing up to {} events over {} days", limit, days);
        fetch_events(
            self.runner.as_ref(),
            commands::upcoming_events_script(days, limit),
        )
        .await
    }
}

/// Subject search across every calendar
pub struct SearchCalendarTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl SearchCalendarTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for SearchCalendarTool {
    fn name(&self) -> &str {
        "search_calendar"
    }

    fn description(&self) -> &str {
        "Search Outlook calendar events whose subject contains the given text."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "search_term": {
                    "type": "string",
                    "description": "Text to look for in event subjects"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum events to return (default: 10, max: 50)"
                }
            }),
            vec!["search_term"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let term = required_str(&input, "search_term")?;
        let limit = limit_from(&input);
        debug!("Searching calendar for '{}'", term);
        fetch_events(
            self.runner.as_ref(),
            commands::search_events_script(term, limit),
        )
        .await
    }
}

/// Create a calendar event
pub struct CreateCalendarEventTool {
    runner: Arc<dyn OutlookAutomation>,
}

impl CreateCalendarEventTool {
    pub fn new(runner: Arc<dyn OutlookAutomation>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ToolHandler for CreateCalendarEventTool {
    fn name(&self) -> &str {
        "create_calendar_event"
    }

    fn description(&self) -> &str {
        "Create a new event in the Outlook calendar, optionally with location, body, and attendees."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "subject": {
                    "type": "string",
                    "description": "Event title"
                },
                "start": {
                    "type": "string",
                    "description": "Start as local wall-clock time, e.g. 2026-08-06T14:30"
                },
                "end": {
                    "type": "string",
                    "description": "End as local wall-clock time"
                },
                "location": {
                    "type": "string",
                    "description": "Event location"
                },
                "body": {
                    "type": "string",
                    "description": "Event notes"
                },
                "attendees": {
                    "type": "string",
                    "description": "Attendee email addresses, comma separated"
                }
            }),
            vec!["subject", "start", "end"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let subject = required_str(&input, "subject")?;
        let start = parse_wall_clock(required_str(&input, "start")?)?;
        let end = parse_wall_clock(required_str(&input, "end")?)?;
        let location = input.get("location").and_then(|v| v.as_str());
        let body = input.get("body").and_then(|v| v.as_str());
        let attendees: Vec<String> = input
            .get("attendees")
            .and_then(|v| v.as_str())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        debug!("Creating calendar event: {}", subject);
        self.runner.ensure_ready().await?;
        let raw = self
            .runner
            .run_script(&commands::create_event_script(
                subject, &start, &end, location, body, &attendees,
            ))
            .await?;
        Ok(raw.trim().to_string())
    }
}
