//! Read-only views rendered from a directory: the weekly CSV export and the
//! punch history grouped by day.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use indexmap::IndexMap;

use crate::duration::week_end;
use crate::model::{Directory, Entry, User};
use crate::time_fmt::{format_date, format_local_datetime};

pub static CSV_MIME: &str = "text/csv";
pub static CSV_HEADER: [&str; 5] = ["User", "Date", "Clock In", "Clock Out", "Duration (min)"];

/// `timeclock-week-06-02-2024.csv` for the week starting 06/02/2024.
pub fn csv_file_name(week_start: DateTime<Local>) -> String {
    format!(
        "timeclock-week-{}.csv",
        format_date(&week_start).replace('/', "-")
    )
}

/// Render every completed punch starting inside the week as CSV, every
/// field quoted. Users keep directory order and punches keep stored order.
/// `user_filter` limits the export to one user id. Rows are separated by
/// `\n` with none after the last one.
pub fn export_weekly_csv(
    directory: &Directory,
    week_start: DateTime<Local>,
    user_filter: Option<&str>,
) -> Result<String> {
    let week_end = week_end(week_start);

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);
    wtr.write_record(&CSV_HEADER)?;

    let users = directory
        .iter()
        .filter(|u| user_filter.map_or(true, |id| u.id == id));
    for user in users {
        for entry in user.entries.iter() {
            let (end, minutes) = match (entry.end(), entry.duration_minutes()) {
                (Some(end), Some(minutes)) => (end, minutes),
                _ => continue,
            };
            let start = entry.raw();
            if start < week_start || start >= week_end {
                continue;
            }
            wtr.write_record(&[
                user.name.clone(),
                format_date(&start),
                format_local_datetime(&start),
                format_local_datetime(&end),
                minutes.to_string(),
            ])?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush csv writer")?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// One entry as shown in a history listing.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow<'a> {
    pub user_id: &'a str,
    pub user_name: &'a str,
    pub entry: &'a Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDay<'a> {
    pub date: NaiveDate,
    pub rows: Vec<HistoryRow<'a>>,
    pub total_minutes: i64,
}

/// Group entries by local calendar day, newest day first. Entries inside a
/// day keep the order they were given in.
pub fn history<'a, I>(users: I) -> Vec<HistoryDay<'a>>
where
    I: IntoIterator<Item = &'a User>,
{
    let mut days: IndexMap<NaiveDate, HistoryDay<'a>> = IndexMap::new();

    for user in users {
        for entry in user.entries.iter() {
            let date = entry.raw().naive_local().date();
            let day = days.entry(date).or_insert_with(|| HistoryDay {
                date,
                rows: Vec::new(),
                total_minutes: 0,
            });
            day.total_minutes += entry.duration_minutes().unwrap_or(0);
            day.rows.push(HistoryRow {
                user_id: &user.id,
                user_name: &user.name,
                entry,
            });
        }
    }

    let mut days: Vec<HistoryDay<'a>> = days.into_iter().map(|(_, day)| day).collect();
    days.sort_by(|a, b| b.date.cmp(&a.date));
    days
}
