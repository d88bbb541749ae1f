use chrono::{DateTime, Local};
use tracing::debug;

use crate::duration::rounded_minutes;
use crate::model::{Directory, Entry, EntryId, User};
use crate::time_fmt::format_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ClockedIn { since: DateTime<Local> },
}

impl User {
    pub fn state(&self) -> SessionState {
        match self.current_session_start {
            Some(since) => SessionState::ClockedIn { since },
            None => SessionState::Idle,
        }
    }
}

impl Directory {
    /// Open a session for the user. Unknown users and users already clocked
    /// in are left alone; returns whether anything changed.
    pub fn clock_in(&mut self, user_id: &str, now: DateTime<Local>) -> bool {
        let user = match self.get_mut(user_id) {
            Some(user) => user,
            None => return false,
        };
        if user.state() != SessionState::Idle {
            debug!(user_id = %user_id, "clock in ignored, session already open");
            return false;
        }

        user.entries.push(Entry::ClockIn {
            id: EntryId::new(),
            time: format_time(&now),
            raw: now,
        });
        user.current_session_start = Some(now);
        true
    }

    /// Close the user's open session and record it as one completed punch
    /// starting at the session start. Returns the recorded minutes, or
    /// `None` when the user is unknown or not clocked in.
    pub fn clock_out(&mut self, user_id: &str, now: DateTime<Local>) -> Option<i64> {
        let user = self.get_mut(user_id)?;
        let since = match user.state() {
            SessionState::ClockedIn { since } => since,
            SessionState::Idle => {
                debug!(user_id = %user_id, "clock out ignored, no open session");
                return None;
            }
        };

        let duration_minutes = rounded_minutes(since, now);
        user.entries.push(Entry::ClockOut {
            id: EntryId::new(),
            time: format_time(&now),
            raw: since,
            duration_minutes,
        });
        user.current_session_start = None;
        Some(duration_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::total_minutes;
    use crate::test_util::local_at;
    use chrono::Duration;

    fn directory() -> (Directory, String) {
        let mut directory = Directory::default();
        let id = directory
            .add_user("Bob", "1111", local_at(2024, 6, 1, 8, 0))
            .unwrap();
        (directory, id)
    }

    #[test]
    fn test_clock_in_then_out() {
        let (mut directory, bob) = directory();
        let t0 = local_at(2024, 6, 3, 9, 0);
        let t1 = t0 + Duration::minutes(95) + Duration::seconds(31);

        assert!(directory.clock_in(&bob, t0));
        assert_eq!(
            directory.get(&bob).unwrap().state(),
            SessionState::ClockedIn { since: t0 }
        );

        assert_eq!(directory.clock_out(&bob, t1), Some(96));

        let user = directory.get(&bob).unwrap();
        assert_eq!(user.state(), SessionState::Idle);
        assert_eq!(user.entries.len(), 2);
        assert_eq!(user.entries[0].label(), "Clock In");
        assert_eq!(user.entries[1].raw(), t0);
        assert_eq!(user.entries[1].time(), format_time(&t1));
        assert_eq!(user.entries[1].duration_minutes(), Some(96));
        assert_eq!(total_minutes(user), 96);
    }

    #[test]
    fn test_clock_in_twice_is_noop() {
        let (mut directory, bob) = directory();
        let t0 = local_at(2024, 6, 3, 9, 0);

        assert!(directory.clock_in(&bob, t0));
        assert!(!directory.clock_in(&bob, t0 + Duration::minutes(5)));

        let user = directory.get(&bob).unwrap();
        assert_eq!(user.entries.len(), 1);
        assert_eq!(user.current_session_start, Some(t0));
    }

    #[test]
    fn test_clock_out_without_session_is_noop() {
        let (mut directory, bob) = directory();
        let before = directory.clone();

        assert_eq!(directory.clock_out(&bob, local_at(2024, 6, 3, 9, 0)), None);
        assert_eq!(directory.clock_out("ghost", local_at(2024, 6, 3, 9, 0)), None);
        assert!(!directory.clock_in("ghost", local_at(2024, 6, 3, 9, 0)));
        assert_eq!(directory, before);
    }

    #[test]
    fn test_short_session_records_zero_minutes() {
        let (mut directory, bob) = directory();
        let t0 = local_at(2024, 6, 3, 9, 0);

        directory.clock_in(&bob, t0);
        assert_eq!(directory.clock_out(&bob, t0 + Duration::seconds(20)), Some(0));

        let user = directory.get(&bob).unwrap();
        assert_eq!(user.entries.len(), 2);
        assert!(!user.entries[1].is_duration_bearing());
        assert_eq!(total_minutes(user), 0);
    }
}
