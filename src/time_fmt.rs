//! Text forms of instants used by the prompts, tables and the CSV export.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// `06/01/2024 9:00 AM`
pub static DATETIME_FORMAT: &str = "%m/%d/%Y %-I:%M %p";
/// What the prompts accept: `06/01/2024 09:00 AM`.
static PROMPT_FORMAT: &str = "%m/%d/%Y %I:%M %p";
/// `9:00:00 AM`
pub static TIME_FORMAT: &str = "%-I:%M:%S %p";
/// `06/01/2024`
pub static DATE_FORMAT: &str = "%m/%d/%Y";

/// Resolve a wall-clock time in the local zone. An ambiguous time picks the
/// earlier instant; a time skipped by a DST jump is read as UTC.
pub fn local_datetime(naive: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

pub fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    local_datetime(date.and_hms(0, 0, 0))
}

/// Parse `MM/DD/YYYY HH:MM AM/PM` in the local zone.
pub fn parse_local_datetime(input: &str) -> Option<DateTime<Local>> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() != 3 {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(&parts.join(" "), PROMPT_FORMAT).ok()?;
    Some(local_datetime(naive))
}

pub fn format_local_datetime(dt: &DateTime<Local>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub fn format_time(dt: &DateTime<Local>) -> String {
    dt.format(TIME_FORMAT).to_string()
}

pub fn format_date(dt: &DateTime<Local>) -> String {
    dt.format(DATE_FORMAT).to_string()
}
