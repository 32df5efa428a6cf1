//! AppleScript builders for Outlook mail, calendar, and contact queries.
//!
//! Every function here is pure: parameters in, complete script text out.
//! Caller text passes through [`escape_applescript_string`] before it is
//! interpolated, and result caps are applied inside the script so Outlook
//! never enumerates more than asked for. Scripts emit one `{key:value, …}`
//! record line per entity and wrap their body in a try handler that returns
//! `"Error: " & errMsg`.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::applescript::{escape_applescript_string, OUTLOOK_APP};

/// Lookup block for mail folders: find by exact name, else fall back to the
/// inbox. An unknown name is not an error.
fn folder_lookup_block(folder: Option<&str>) -> String {
    match folder {
        Some(name) => format!(
            r#"set targetFolder to inbox
        repeat with f in mail folders
            if name of f is "{}" then set targetFolder to f
        end repeat"#,
            escape_applescript_string(name)
        ),
        None => "set targetFolder to inbox".to_string(),
    }
}

/// Clamp `maxCount` to the size of `list_var` so indexed access never runs
/// past the end.
fn cap_block(list_var: &str, limit: u64) -> String {
    format!(
        r#"set maxCount to {limit}
        if (count of {list_var}) < maxCount then set maxCount to (count of {list_var})"#
    )
}

// Outlook renders `sender of m` as a record; coercing it to a string keeps
// the display name and address in one field.
const MESSAGE_RECORD_LINES: &str = r#"set m to item i of msgs
            set senderText to "Unknown sender"
            try
                set senderText to (sender of m as string)
            end try
            set output to output & "{id:" & (id of m) & ", subject:" & (subject of m) & ", sender:" & senderText & ", received:" & ((time received of m) as string) & "}" & linefeed"#;

pub fn list_folders_script() -> String {
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set output to ""
        repeat with f in mail folders
            set output to output & "{{name:" & (name of f) & "}}" & linefeed
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#
    )
}

pub fn read_messages_script(folder: Option<&str>, limit: u64, unread_only: bool) -> String {
    let source = if unread_only {
        "(messages of targetFolder whose is read is false)"
    } else {
        "messages of targetFolder"
    };
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        {folder_block}
        set msgs to {source}
        {cap}
        set output to ""
        repeat with i from 1 to maxCount
            {records}
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        folder_block = folder_lookup_block(folder),
        cap = cap_block("msgs", limit),
        records = MESSAGE_RECORD_LINES,
    )
}

pub fn search_messages_script(term: &str, folder: Option<&str>, limit: u64) -> String {
    let safe_term = escape_applescript_string(term);
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        {folder_block}
        set msgs to (messages of targetFolder whose subject contains "{safe_term}" or plain text content contains "{safe_term}")
        {cap}
        set output to ""
        repeat with i from 1 to maxCount
            {records}
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        folder_block = folder_lookup_block(folder),
        cap = cap_block("msgs", limit),
        records = MESSAGE_RECORD_LINES,
    )
}

const EVENT_RECORD_LINES: &str = r#"set locText to ""
                try
                    set locText to location of evt
                end try
                set output to output & "{id:" & (id of evt) & ", subject:" & (subject of evt) & ", start:" & ((start time of evt) as string) & ", end:" & ((end time of evt) as string) & ", location:" & locText & "}" & linefeed"#;

/// Shared shell for the event listing scripts: iterate every calendar,
/// filter with `whose_clause`, stop after `limit` records total.
fn events_script(window_block: &str, whose_clause: &str, limit: u64) -> String {
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        {window_block}
        set output to ""
        set emitted to 0
        repeat with cal in calendars
            set evts to (calendar events of cal whose {whose_clause})
            repeat with evt in evts
                if emitted is greater than or equal to {limit} then exit repeat
                {records}
                set emitted to emitted + 1
            end repeat
            if emitted is greater than or equal to {limit} then exit repeat
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        records = EVENT_RECORD_LINES,
    )
}

pub fn todays_events_script(limit: u64) -> String {
    events_script(
        r#"set windowStart to current date
        set time of windowStart to 0
        set windowEnd to windowStart + 1 * days"#,
        "start time is greater than or equal to windowStart and start time is less than windowEnd",
        limit,
    )
}

pub fn upcoming_events_script(days: u64, limit: u64) -> String {
    let window_block = format!(
        r#"set windowStart to current date
        set windowEnd to windowStart + {days} * days"#
    );
    events_script(
        &window_block,
        "start time is greater than or equal to windowStart and start time is less than windowEnd",
        limit,
    )
}

pub fn search_events_script(term: &str, limit: u64) -> String {
    let whose = format!(
        r#"subject contains "{}""#,
        escape_applescript_string(term)
    );
    events_script("", &whose, limit)
}

/// Render a wall-clock instant by assigning the AppleScript date components
/// one at a time. The day is reset to 1 before year and month are assigned
/// so component assignment cannot roll over at month boundaries.
fn date_component_block(var: &str, when: &NaiveDateTime) -> String {
    format!(
        r#"set {var} to current date
        set day of {var} to 1
        set year of {var} to {year}
        set month of {var} to {month}
        set day of {var} to {day}
        set hours of {var} to {hours}
        set minutes of {var} to {minutes}
        set seconds of {var} to {seconds}"#,
        year = when.year(),
        month = when.month(),
        day = when.day(),
        hours = when.hour(),
        minutes = when.minute(),
        seconds = when.second(),
    )
}

pub fn create_event_script(
    subject: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    location: Option<&str>,
    body: Option<&str>,
    attendees: &[String],
) -> String {
    let mut props = format!(
        r#"subject:"{}", start time:eventStart, end time:eventEnd"#,
        escape_applescript_string(subject)
    );
    if let Some(location) = location {
        props.push_str(&format!(
            r#", location:"{}""#,
            escape_applescript_string(location)
        ));
    }
    if let Some(body) = body {
        props.push_str(&format!(
            r#", content:"{}""#,
            escape_applescript_string(body)
        ));
    }

    let mut attendee_lines = String::new();
    for attendee in attendees {
        attendee_lines.push_str(&format!(
            "\n        make new attendee at newEvent with properties {{email address:{{address:\"{}\"}}}}",
            escape_applescript_string(attendee)
        ));
    }

    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        {start_block}
        {end_block}
        set newEvent to make new calendar event with properties {{{props}}}{attendee_lines}
        return "Event created: " & (subject of newEvent)
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        start_block = date_component_block("eventStart", start),
        end_block = date_component_block("eventEnd", end),
    )
}

// Contact fields are optional in Outlook; each extraction gets its own try
// so one empty field does not abort the record.
const CONTACT_FIELDS_BLOCK: &str = r#"set nameText to "Unknown contact"
            try
                set nameText to display name of c
            end try
            set emailText to ""
            try
                set emailText to address of item 1 of email addresses of c
            end try
            set phoneText to ""
            try
                set phoneText to business phone number of c
            end try
            set companyText to ""
            try
                set companyText to company of c
            end try"#;

const CONTACT_EMIT_LINE: &str = r#"set output to output & "{name:" & nameText & ", email:" & emailText & ", phone:" & phoneText & ", company:" & companyText & "}" & linefeed"#;

pub fn list_contacts_script(limit: u64) -> String {
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set everyone to contacts
        {cap}
        set output to ""
        repeat with i from 1 to maxCount
            set c to item i of everyone
            {fields}
            {emit}
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        cap = cap_block("everyone", limit),
        fields = CONTACT_FIELDS_BLOCK,
        emit = CONTACT_EMIT_LINE,
    )
}

pub fn search_contacts_script(term: &str, limit: u64) -> String {
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set matches to (contacts whose display name contains "{safe_term}")
        {cap}
        set output to ""
        repeat with i from 1 to maxCount
            set c to item i of matches
            {fields}
            {emit}
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#,
        safe_term = escape_applescript_string(term),
        cap = cap_block("matches", limit),
        fields = CONTACT_FIELDS_BLOCK,
        emit = CONTACT_EMIT_LINE,
    )
}

/// Fallback contact strategy: walk the whole address book and filter by
/// hand. Outlook's `whose` clause over contacts is unreliable on large
/// address books, so this slower scan backs up the filtered scripts.
pub fn scan_contacts_script(filter: Option<&str>, limit: u64) -> String {
    let body = match filter {
        Some(term) => format!(
            r#"{fields}
            if nameText contains "{safe_term}" then
                {emit}
                set emitted to emitted + 1
            end if"#,
            safe_term = escape_applescript_string(term),
            fields = CONTACT_FIELDS_BLOCK,
            emit = CONTACT_EMIT_LINE,
        ),
        None => format!(
            r#"{fields}
            {emit}
            set emitted to emitted + 1"#,
            fields = CONTACT_FIELDS_BLOCK,
            emit = CONTACT_EMIT_LINE,
        ),
    };
    format!(
        r#"
tell application "{OUTLOOK_APP}"
    try
        set output to ""
        set emitted to 0
        repeat with c in contacts
            if emitted is greater than or equal to {limit} then exit repeat
            {body}
        end repeat
        return output
    on error errMsg
        return "Error: " & errMsg
    end try
end tell
"#
    )
}
