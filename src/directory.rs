use chrono::{DateTime, Local};

use crate::duration::live_minutes;
use crate::error::{AuthError, ValidationError};
use crate::model::{Directory, User};

pub static ADMIN_ID: &str = "admin";
pub static ADMIN_NAME: &str = "Admin";
pub const PASSCODE_LEN: usize = 4;

/// Who is logged in, and whether they may use the admin pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub is_admin: bool,
}

/// A user with an open session and how long it has been running.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession<'a> {
    pub user: &'a User,
    pub since: DateTime<Local>,
    pub worked_minutes: i64,
}

fn validate_profile(name: &str, passcode: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = passcode.chars().count();
    if len != PASSCODE_LEN {
        return Err(ValidationError::PasscodeLength(len));
    }
    Ok(())
}

fn slug(name: &str) -> String {
    let mut slug = String::new();
    for c in name.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "user".to_string()
    } else {
        slug.to_string()
    }
}

impl Directory {
    /// Register a new user and return its generated id, `<slug>-<millis>`.
    pub fn add_user(
        &mut self,
        name: &str,
        passcode: &str,
        now: DateTime<Local>,
    ) -> Result<String, ValidationError> {
        validate_profile(name, passcode)?;

        let base = slug(name);
        let mut suffix = now.timestamp_millis();
        let mut id = format!("{}-{}", base, suffix);
        while self.contains(&id) {
            suffix += 1;
            id = format!("{}-{}", base, suffix);
        }

        self.push(User::new(
            id.clone(),
            name.trim().to_string(),
            passcode.to_string(),
        ));
        Ok(id)
    }

    /// Replace a user's name and passcode. `Ok(false)` if there is no such user.
    pub fn edit_user(&mut self, id: &str, name: &str, passcode: &str) -> Result<bool, ValidationError> {
        validate_profile(name, passcode)?;

        match self.get_mut(id) {
            Some(user) => {
                user.name = name.trim().to_string();
                user.passcode = passcode.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a user with all of their punches. The admin account is not
    /// protected here; callers decide whether it may be removed.
    pub fn delete_user(&mut self, id: &str) -> bool {
        let before = self.len();
        self.retain(|u| u.id != id);
        self.len() != before
    }

    /// Append the admin account unless one is already present. Returns
    /// whether it had to be created.
    pub fn ensure_admin(&mut self, admin_code: &str) -> bool {
        if self.contains(ADMIN_ID) {
            return false;
        }
        self.push(User::new(
            ADMIN_ID.to_string(),
            ADMIN_NAME.to_string(),
            admin_code.to_string(),
        ));
        true
    }

    /// The admin code logs in as admin whichever user was picked; anyone
    /// else needs the exact passcode of the picked user.
    pub fn authenticate(
        &self,
        user_id: Option<&str>,
        passcode: &str,
        admin_code: &str,
    ) -> Result<Session, AuthError> {
        if passcode == admin_code {
            let user_id = user_id.filter(|id| !id.is_empty()).unwrap_or(ADMIN_ID);
            return Ok(Session {
                user_id: user_id.to_string(),
                is_admin: true,
            });
        }

        let user_id = user_id.unwrap_or_default();
        let user = self
            .get(user_id)
            .ok_or_else(|| AuthError::UnknownUser(user_id.to_string()))?;

        if user.passcode == passcode {
            Ok(Session {
                user_id: user.id.clone(),
                is_admin: false,
            })
        } else {
            Err(AuthError::IncorrectPasscode)
        }
    }

    /// Drop every punch and open session, keeping the users themselves.
    pub fn reset_all_data(&mut self) {
        for user in self.iter_mut() {
            user.entries.clear();
            user.current_session_start = None;
        }
    }

    pub fn active_sessions(&self, now: DateTime<Local>) -> Vec<ActiveSession<'_>> {
        self.iter()
            .filter_map(|user| {
                user.current_session_start.map(|since| ActiveSession {
                    user,
                    since,
                    worked_minutes: live_minutes(since, now),
                })
            })
            .collect()
    }
}
