use tracing::info;

use crate::clock::Clock;
use crate::directory::Session;
use crate::error::{AuthError, ValidationError};
use crate::model::{Directory, EntryId, Snapshot};
use crate::punch::PunchEnd;

/// Receives a snapshot after every change to the directory.
pub trait SaveHook {
    fn schedule(&mut self, snapshot: Snapshot);
}

impl SaveHook for Vec<Snapshot> {
    fn schedule(&mut self, snapshot: Snapshot) {
        self.push(snapshot);
    }
}

/// Owns the directory for one run of the application. Every operation that
/// changes it bumps the snapshot version and hands the new snapshot to the
/// save hook; operations that change nothing schedule no save.
pub struct Controller<C, H> {
    directory: Directory,
    version: u64,
    clock: C,
    hook: H,
    admin_code: String,
}

impl<C: Clock, H: SaveHook> Controller<C, H> {
    /// Start from a loaded snapshot, creating the admin account if missing.
    pub fn new(snapshot: Snapshot, clock: C, hook: H, admin_code: &str) -> Self {
        let mut controller = Controller {
            directory: snapshot.users,
            version: snapshot.version,
            clock,
            hook,
            admin_code: admin_code.to_string(),
        };
        if controller.directory.ensure_admin(admin_code) {
            info!("admin account created");
            controller.commit();
        }
        controller
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn into_hook(self) -> H {
        self.hook
    }

    fn commit(&mut self) {
        self.version += 1;
        self.hook.schedule(Snapshot {
            version: self.version,
            users: self.directory.clone(),
        });
    }

    fn commit_if(&mut self, changed: bool) -> bool {
        if changed {
            self.commit();
        }
        changed
    }

    pub fn authenticate(&self, user_id: Option<&str>, passcode: &str) -> Result<Session, AuthError> {
        self.directory
            .authenticate(user_id, passcode, &self.admin_code)
    }

    pub fn clock_in(&mut self, user_id: &str) -> bool {
        let now = self.clock.now();
        let changed = self.directory.clock_in(user_id, now);
        if changed {
            info!(user_id = %user_id, "clocked in");
        }
        self.commit_if(changed)
    }

    pub fn clock_out(&mut self, user_id: &str) -> Option<i64> {
        let now = self.clock.now();
        let minutes = self.directory.clock_out(user_id, now);
        if let Some(minutes) = minutes {
            info!(user_id = %user_id, minutes = minutes, "clocked out");
        }
        self.commit_if(minutes.is_some());
        minutes
    }

    pub fn add_user(&mut self, name: &str, passcode: &str) -> Result<String, ValidationError> {
        let now = self.clock.now();
        let id = self.directory.add_user(name, passcode, now)?;
        info!(user_id = %id, "user added");
        self.commit();
        Ok(id)
    }

    pub fn edit_user(&mut self, id: &str, name: &str, passcode: &str) -> Result<bool, ValidationError> {
        let changed = self.directory.edit_user(id, name, passcode)?;
        Ok(self.commit_if(changed))
    }

    pub fn delete_user(&mut self, id: &str) -> bool {
        let changed = self.directory.delete_user(id);
        if changed {
            info!(user_id = %id, "user deleted");
        }
        self.commit_if(changed)
    }

    pub fn add_punch(
        &mut self,
        user_id: &str,
        clock_in: &str,
        clock_out: &str,
    ) -> Result<Option<EntryId>, ValidationError> {
        let id = self.directory.add_punch(user_id, clock_in, clock_out)?;
        self.commit_if(id.is_some());
        Ok(id)
    }

    pub fn edit_punch(
        &mut self,
        user_id: &str,
        entry_id: EntryId,
        clock_in: &str,
        end: PunchEnd<'_>,
    ) -> Result<bool, ValidationError> {
        let changed = self.directory.edit_punch(user_id, entry_id, clock_in, end)?;
        Ok(self.commit_if(changed))
    }

    pub fn delete_punch(&mut self, user_id: &str, entry_id: EntryId) -> bool {
        let changed = self.directory.delete_punch(user_id, entry_id);
        self.commit_if(changed)
    }

    pub fn reset_all_data(&mut self) {
        self.directory.reset_all_data();
        info!("all punches cleared");
        self.commit();
    }
}
