//! Manual punch maintenance: adding completed punches after the fact,
//! correcting them, and removing them.

use crate::duration::rounded_minutes;
use crate::error::ValidationError;
use crate::model::{Directory, Entry, EntryId};
use crate::time_fmt::{format_time, parse_local_datetime};

/// How the end of an edited punch is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchEnd<'a> {
    /// A clock-out time in the prompt format; the duration is derived.
    ClockOut(&'a str),
    /// The duration in minutes, taken as is.
    Minutes(i64),
}

impl Directory {
    /// Record a completed session for `user_id`. Both instants use the
    /// `MM/DD/YYYY HH:MM AM/PM` format and the end must fall after the
    /// start. `Ok(None)` if there is no such user.
    pub fn add_punch(
        &mut self,
        user_id: &str,
        clock_in: &str,
        clock_out: &str,
    ) -> Result<Option<EntryId>, ValidationError> {
        let start = parse_local_datetime(clock_in)
            .ok_or_else(|| ValidationError::InvalidClockIn(clock_in.to_string()))?;
        let end = parse_local_datetime(clock_out)
            .ok_or_else(|| ValidationError::InvalidClockOut(clock_out.to_string()))?;

        let duration_minutes = rounded_minutes(start, end);
        if duration_minutes <= 0 {
            return Err(ValidationError::ClockOutNotAfterClockIn);
        }

        let user = match self.get_mut(user_id) {
            Some(user) => user,
            None => return Ok(None),
        };
        let id = EntryId::new();
        user.entries.push(Entry::ClockOut {
            id,
            time: format_time(&start),
            raw: start,
            duration_minutes,
        });
        Ok(Some(id))
    }

    /// Rewrite the start and duration of a completed punch, keeping its id
    /// and its position. `Ok(false)` if the user or punch does not exist.
    /// Clock-in markers are not punches and are left alone.
    pub fn edit_punch(
        &mut self,
        user_id: &str,
        entry_id: EntryId,
        clock_in: &str,
        end: PunchEnd<'_>,
    ) -> Result<bool, ValidationError> {
        let start = parse_local_datetime(clock_in)
            .ok_or_else(|| ValidationError::InvalidClockIn(clock_in.to_string()))?;

        let duration_minutes = match end {
            PunchEnd::ClockOut(text) => {
                let stop = parse_local_datetime(text)
                    .ok_or_else(|| ValidationError::InvalidClockOut(text.to_string()))?;
                rounded_minutes(start, stop)
            }
            PunchEnd::Minutes(minutes) => minutes,
        };
        if duration_minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration(duration_minutes));
        }

        let entry = match self
            .get_mut(user_id)
            .and_then(|u| u.entries.iter_mut().find(|e| e.id() == entry_id))
        {
            Some(entry) => entry,
            None => return Ok(false),
        };
        match entry {
            Entry::ClockOut {
                time,
                raw,
                duration_minutes: minutes,
                ..
            } => {
                *time = format_time(&start);
                *raw = start;
                *minutes = duration_minutes;
                Ok(true)
            }
            Entry::ClockIn { .. } => Ok(false),
        }
    }

    /// Remove one punch. Returns whether it existed.
    pub fn delete_punch(&mut self, user_id: &str, entry_id: EntryId) -> bool {
        let user = match self.get_mut(user_id) {
            Some(user) => user,
            None => return false,
        };
        match user.position_of(entry_id) {
            Some(index) => {
                user.entries.remove(index);
                true
            }
            None => false,
        }
    }
}
