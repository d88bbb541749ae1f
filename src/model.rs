use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Generated when the entry is created and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        EntryId(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EntryId(Uuid::parse_str(s)?))
    }
}

/// One recorded punch. A clock-in marker only carries the instant it was
/// stamped at; a clock-out entry carries the start of the completed session
/// plus its length in whole minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entry {
    #[serde(rename = "Clock In")]
    ClockIn {
        #[serde(default)]
        id: EntryId,
        time: String,
        raw: DateTime<Local>,
    },
    #[serde(rename = "Clock Out", rename_all = "camelCase")]
    ClockOut {
        #[serde(default)]
        id: EntryId,
        time: String,
        raw: DateTime<Local>,
        duration_minutes: i64,
    },
}

impl Entry {
    pub fn id(&self) -> EntryId {
        match self {
            Entry::ClockIn { id, .. } | Entry::ClockOut { id, .. } => *id,
        }
    }

    /// Instant the entry is stamped at; for completed sessions this is the
    /// session start.
    pub fn raw(&self) -> DateTime<Local> {
        match self {
            Entry::ClockIn { raw, .. } | Entry::ClockOut { raw, .. } => *raw,
        }
    }

    pub fn time(&self) -> &str {
        match self {
            Entry::ClockIn { time, .. } | Entry::ClockOut { time, .. } => time,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Entry::ClockIn { .. } => "Clock In",
            Entry::ClockOut { .. } => "Clock Out",
        }
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        match self {
            Entry::ClockOut {
                duration_minutes, ..
            } if *duration_minutes > 0 => Some(*duration_minutes),
            _ => None,
        }
    }

    pub fn is_duration_bearing(&self) -> bool {
        self.duration_minutes().is_some()
    }

    pub fn end(&self) -> Option<DateTime<Local>> {
        self.duration_minutes()
            .map(|minutes| self.raw() + Duration::minutes(minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub passcode: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub current_session_start: Option<DateTime<Local>>,
}

impl User {
    pub fn new(id: String, name: String, passcode: String) -> Self {
        User {
            id,
            name,
            passcode,
            entries: Vec::new(),
            current_session_start: None,
        }
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory {
    users: Vec<User>,
}

impl Directory {
    pub fn new(users: Vec<User>) -> Self {
        Directory { users }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn push(&mut self, user: User) {
        self.users.push(user);
    }

    pub(crate) fn retain<F: FnMut(&User) -> bool>(&mut self, f: F) {
        self.users.retain(f);
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut User> {
        self.users.iter_mut()
    }

    pub fn sorted_by_name(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.iter().collect();
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        users
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub users: Directory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::local_at;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        local_at(2024, 6, 1, h, m)
    }

    #[test]
    fn test_clock_out_serializes_like_stored_blob() {
        let entry = Entry::ClockOut {
            id: EntryId::new(),
            time: "9:00:00 AM".to_string(),
            raw: at(9, 0),
            duration_minutes: 480,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "Clock Out");
        assert_eq!(value["durationMinutes"], 480);
        assert_eq!(value["time"], "9:00:00 AM");
        assert!(value["id"].is_string());
    }

    #[test]
    fn test_legacy_entries_without_id_get_one() {
        let json = r#"[{
            "id": "ann-1717",
            "name": "Ann",
            "passcode": "1234",
            "entries": [
                {"type": "Clock In", "time": "9:00:00 AM", "raw": "2024-06-01T09:00:00Z"},
                {"type": "Clock Out", "time": "5:00:00 PM", "raw": "2024-06-01T17:00:00Z", "durationMinutes": 480}
            ],
            "currentSessionStart": null
        }]"#;

        let directory: Directory = serde_json::from_str(json).unwrap();
        let user = directory.get("ann-1717").unwrap();

        assert_eq!(user.entries.len(), 2);
        assert_ne!(user.entries[0].id(), user.entries[1].id());
        assert_eq!(user.entries[1].duration_minutes(), Some(480));
        assert_eq!(user.current_session_start, None);
    }

    #[test]
    fn test_end_is_start_plus_duration() {
        let entry = Entry::ClockOut {
            id: EntryId::new(),
            time: String::new(),
            raw: at(9, 0),
            duration_minutes: 90,
        };

        assert_eq!(entry.end(), Some(at(10, 30)));
    }

    #[test]
    fn test_zero_minute_clock_out_is_not_duration_bearing() {
        let entry = Entry::ClockOut {
            id: EntryId::new(),
            time: String::new(),
            raw: at(9, 0),
            duration_minutes: 0,
        };

        assert!(!entry.is_duration_bearing());
        assert_eq!(entry.end(), None);
    }

    #[test]
    fn test_entry_id_parses_back() {
        let id = EntryId::new();
        let parsed: EntryId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<EntryId>().is_err());
    }
}
