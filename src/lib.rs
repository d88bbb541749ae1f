pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod db;
pub mod directory;
pub mod duration;
pub mod error;
pub mod gateway;
pub mod model;
pub mod punch;
pub mod report;
pub mod session;
pub mod telemetry;
pub mod time_fmt;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{Controller, SaveHook};
pub use directory::{Session, ADMIN_ID};
pub use error::{AuthError, ValidationError};
pub use model::{Directory, Entry, EntryId, Snapshot, User};
pub use punch::PunchEnd;

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::{DateTime, Local, NaiveDate};

    use crate::time_fmt::local_datetime;

    pub fn local_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        local_datetime(NaiveDate::from_ymd(year, month, day).and_hms(hour, minute, 0))
    }
}
