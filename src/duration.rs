//! Elapsed-time arithmetic and aggregation over a user's punches.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};
use indexmap::IndexMap;

use crate::model::{Directory, User};
use crate::time_fmt::local_midnight;

/// Whole minutes between two instants, rounding half a minute up.
pub fn rounded_minutes(start: DateTime<Local>, end: DateTime<Local>) -> i64 {
    let millis = end.signed_duration_since(start).num_milliseconds();
    (millis as f64 / 60_000.0 + 0.5).floor() as i64
}

/// Whole minutes of a session still in progress, truncated.
pub fn live_minutes(start: DateTime<Local>, now: DateTime<Local>) -> i64 {
    let millis = now.signed_duration_since(start).num_milliseconds();
    (millis as f64 / 60_000.0).floor() as i64
}

/// Most recent Sunday at local midnight; today's midnight if today is Sunday.
pub fn week_start(now: DateTime<Local>) -> DateTime<Local> {
    let today = now.naive_local().date();
    let offset = i64::from(today.weekday().num_days_from_sunday());
    local_midnight(today - Duration::days(offset))
}

pub fn week_end(week_start: DateTime<Local>) -> DateTime<Local> {
    local_midnight(week_start.naive_local().date() + Duration::days(7))
}

pub fn total_minutes(user: &User) -> i64 {
    user.entries.iter().filter_map(|e| e.duration_minutes()).sum()
}

// [start, end)
pub fn minutes_between(user: &User, start: DateTime<Local>, end: DateTime<Local>) -> i64 {
    user.entries
        .iter()
        .filter(|e| e.raw() >= start && e.raw() < end)
        .filter_map(|e| e.duration_minutes())
        .sum()
}

pub fn weekly_minutes(user: &User, week_start: DateTime<Local>) -> i64 {
    minutes_between(user, week_start, week_end(week_start))
}

/// Per-day totals for the week, Sunday first. Every day of the week is
/// present even if nothing was worked.
pub fn daily_minutes(user: &User, week_start: DateTime<Local>) -> IndexMap<NaiveDate, i64> {
    let first = week_start.naive_local().date();
    let mut days: IndexMap<NaiveDate, i64> = (0..7)
        .map(|offset| (first + Duration::days(offset), 0))
        .collect();

    let end = week_end(week_start);
    for entry in user.entries.iter() {
        if entry.raw() < week_start || entry.raw() >= end {
            continue;
        }
        if let Some(minutes) = entry.duration_minutes() {
            let day = days.entry(entry.raw().naive_local().date()).or_insert(0);
            *day += minutes;
        }
    }
    days
}

pub fn total_minutes_all(directory: &Directory) -> i64 {
    directory.iter().map(total_minutes).sum()
}

pub fn weekly_minutes_all(directory: &Directory, week_start: DateTime<Local>) -> i64 {
    directory.iter().map(|u| weekly_minutes(u, week_start)).sum()
}

/// `"{h}h {m}m"`; anything not positive reads as `"0h 0m"`.
pub fn format_hours_minutes(minutes: i64) -> String {
    if minutes <= 0 {
        return "0h 0m".to_string();
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, EntryId};
    use crate::test_util::local_at;

    fn punch(raw: DateTime<Local>, minutes: i64) -> Entry {
        Entry::ClockOut {
            id: EntryId::new(),
            time: String::new(),
            raw,
            duration_minutes: minutes,
        }
    }

    fn marker(raw: DateTime<Local>) -> Entry {
        Entry::ClockIn {
            id: EntryId::new(),
            time: String::new(),
            raw,
        }
    }

    fn user_with(entries: Vec<Entry>) -> User {
        let mut user = User::new("ann-1".into(), "Ann".into(), "1234".into());
        user.entries = entries;
        user
    }

    #[test]
    fn test_rounded_minutes_rounds_half_up() {
        let start = local_at(2024, 6, 1, 9, 0);
        assert_eq!(rounded_minutes(start, start + Duration::seconds(29)), 0);
        assert_eq!(rounded_minutes(start, start + Duration::seconds(30)), 1);
        assert_eq!(rounded_minutes(start, start + Duration::seconds(89)), 1);
        assert_eq!(rounded_minutes(start, start + Duration::minutes(480)), 480);
        assert_eq!(rounded_minutes(start, start - Duration::seconds(90)), -1);
    }

    #[test]
    fn test_live_minutes_truncates() {
        let start = local_at(2024, 6, 1, 9, 0);
        assert_eq!(live_minutes(start, start + Duration::seconds(119)), 1);
        assert_eq!(live_minutes(start, start), 0);
    }

    #[test]
    fn test_week_start_is_previous_sunday_midnight() {
        // 2024-06-05 is a Wednesday.
        let wednesday = local_at(2024, 6, 5, 15, 45);
        assert_eq!(week_start(wednesday), local_at(2024, 6, 2, 0, 0));

        let saturday = local_at(2024, 6, 8, 23, 59);
        assert_eq!(week_start(saturday), local_at(2024, 6, 2, 0, 0));
    }

    #[test]
    fn test_week_start_on_sunday_is_today() {
        let sunday = local_at(2024, 6, 2, 8, 0);
        assert_eq!(week_start(sunday), local_at(2024, 6, 2, 0, 0));
        assert_eq!(week_end(week_start(sunday)), local_at(2024, 6, 9, 0, 0));
    }

    #[test]
    fn test_total_ignores_markers_and_order() {
        let a = punch(local_at(2024, 6, 1, 9, 0), 60);
        let b = punch(local_at(2024, 5, 1, 9, 0), 45);
        let m = marker(local_at(2024, 6, 3, 9, 0));

        let forward = user_with(vec![a.clone(), m.clone(), b.clone()]);
        let backward = user_with(vec![b, m, a]);

        assert_eq!(total_minutes(&forward), 105);
        assert_eq!(total_minutes(&backward), 105);
    }

    #[test]
    fn test_weekly_window_bounds() {
        let start = local_at(2024, 6, 2, 0, 0);
        let user = user_with(vec![
            punch(start - Duration::minutes(1), 1),
            punch(start, 10),
            punch(local_at(2024, 6, 8, 23, 59), 100),
            punch(local_at(2024, 6, 9, 0, 0), 1000),
        ]);

        assert_eq!(weekly_minutes(&user, start), 110);
    }

    #[test]
    fn test_daily_minutes_has_all_seven_days() {
        let start = local_at(2024, 6, 2, 0, 0);
        let user = user_with(vec![
            punch(local_at(2024, 6, 3, 9, 0), 30),
            punch(local_at(2024, 6, 3, 13, 0), 45),
            punch(local_at(2024, 6, 7, 9, 0), 60),
            punch(local_at(2024, 6, 10, 9, 0), 60),
        ]);

        let days = daily_minutes(&user, start);
        let values: Vec<i64> = days.values().cloned().collect();

        assert_eq!(days.len(), 7);
        assert_eq!(days.keys().next(), Some(&NaiveDate::from_ymd(2024, 6, 2)));
        assert_eq!(values, vec![0, 75, 0, 0, 0, 60, 0]);
    }

    #[test]
    fn test_all_user_totals() {
        let start = local_at(2024, 6, 2, 0, 0);
        let ann = user_with(vec![punch(local_at(2024, 6, 3, 9, 0), 30)]);
        let mut bob = user_with(vec![punch(local_at(2024, 5, 3, 9, 0), 20)]);
        bob.id = "bob-1".into();
        let directory = Directory::new(vec![ann, bob]);

        assert_eq!(total_minutes_all(&directory), 50);
        assert_eq!(weekly_minutes_all(&directory, start), 30);
    }

    #[test]
    fn test_format_hours_minutes() {
        assert_eq!(format_hours_minutes(0), "0h 0m");
        assert_eq!(format_hours_minutes(-5), "0h 0m");
        assert_eq!(format_hours_minutes(59), "0h 59m");
        assert_eq!(format_hours_minutes(480), "8h 0m");
        assert_eq!(format_hours_minutes(605), "10h 5m");
    }
}
