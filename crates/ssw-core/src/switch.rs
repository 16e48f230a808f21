//! Switching which owner's save is the active (base) save of a game group.

use tracing::{info, warn};

use crate::backup::{BackupError, BackupManager, Clock, Guarded, local_clock};
use crate::error::OpError;
use crate::model::{GameGroup, SwitchOutcome, SwitchPreview};
use crate::tree::{Entry, EntryKind, SaveTree};

pub struct SaveSwitcher<'a, T: SaveTree> {
    pub(crate) tree: &'a T,
    pub(crate) backups: BackupManager<'a, T>,
    pub(crate) clock: Clock,
}

pub(crate) fn backup_err(name: &str) -> impl FnOnce(BackupError) -> OpError + '_ {
    move |source| OpError::Backup { name: name.to_string(), source }
}

fn check_owner(tag: &str) -> Result<(), OpError> {
    let bad = tag.is_empty() || tag.chars().any(|c| matches!(c, '.' | '/' | '\\' | '\0') || c.is_whitespace());
    if bad { Err(OpError::InvalidOwner(tag.to_string())) } else { Ok(()) }
}

impl<'a, T: SaveTree> SaveSwitcher<'a, T> {
    pub fn new(tree: &'a T) -> Self {
        Self::with_clock(tree, local_clock)
    }

    pub fn with_clock(tree: &'a T, clock: Clock) -> Self {
        SaveSwitcher { tree, backups: BackupManager::new(tree, clock), clock }
    }

    pub(crate) fn require_dir(&self, dir: &T::Handle) -> Result<(), OpError> {
        match self.tree.kind(dir) {
            Ok(EntryKind::Directory) => Ok(()),
            _ => Err(OpError::DirectoryInaccessible),
        }
    }

    // Live lookup; the scan snapshot may be stale
    pub(crate) fn find_file(&self, dir: &T::Handle, name: &str) -> Result<Option<Entry<T::Handle>>, OpError> {
        match self.tree.find_child(dir, name) {
            Ok(Some(e)) if e.is_file() => Ok(Some(e)),
            Ok(Some(_)) => Err(OpError::NotAFile(name.to_string())),
            Ok(None) => Ok(None),
            Err(e) if e.is_inaccessible() => Err(OpError::FileInaccessible(name.to_string())),
            Err(e) => Err(OpError::Lookup(e)),
        }
    }

    pub(crate) fn guard(&self, dir: &T::Handle, name: &str) -> Result<Guarded<T::Handle>, OpError> {
        self.backups.guard(dir, name).map_err(backup_err(name))
    }

    /// Make `target`'s save the active save of `group`.
    ///
    /// `source` is the owner the current active save belongs to; it is required
    /// whenever an active save exists so it can be archived under that name.
    /// Every file that gets overwritten or deleted is backed up first; if a
    /// backup cannot be taken the switch stops before touching the file.
    pub fn switch_owner(&self, group: &GameGroup<T::Handle>, source: Option<&str>, target: &str) -> SwitchOutcome {
        match self.try_switch(group, source, target) {
            Ok(msg) => {
                info!(game = %group.key, owner = target, "{}", msg);
                SwitchOutcome::success(msg)
            }
            Err(e) => {
                warn!(game = %group.key, owner = target, error = %e, "switch failed");
                SwitchOutcome::failure(e.to_string())
            }
        }
    }

    fn try_switch(&self, group: &GameGroup<T::Handle>, source: Option<&str>, target: &str) -> Result<String, OpError> {
        let dir = &group.directory;
        self.require_dir(dir)?;
        let target = target.trim();
        check_owner(target)?;
        let source = source.map(str::trim).filter(|s| !s.is_empty());
        if let Some(s) = source {
            check_owner(s)?;
        }

        let base_name = group.base_filename();
        let base = self.find_file(dir, &base_name)?;

        if base.is_some() && source == Some(target) {
            return Ok(format!("Already active for {}", target));
        }
        if base.is_some() && source.is_none() {
            return Err(OpError::OwnerRequired);
        }

        // active save is backed up before any write in this directory
        let base_guard = self.guard(dir, &base_name)?;

        if let (Some(base), Some(source)) = (&base, source) {
            let data = self.tree.read(&base.handle).map_err(OpError::Archive)?;
            let variant_name = group.variant_filename(source);
            let variant = self.guard(dir, &variant_name)?;
            let dest = self.backups.recreate(variant).map_err(OpError::Archive)?;
            self.tree.write_truncating(&dest, &data).map_err(OpError::Archive)?;
        }

        let target_name = group.variant_filename(target);
        if let Some(variant) = self.find_file(dir, &target_name)? {
            let data = self.tree.read(&variant.handle).map_err(OpError::Activate)?;
            let new_base = self.backups.recreate(base_guard).map_err(OpError::Activate)?;
            self.tree.write_truncating(&new_base, &data).map_err(OpError::Activate)?;
            let redundant = self.guard(dir, &target_name)?;
            self.backups
                .remove(redundant)
                .map_err(|source| OpError::Remove { name: target_name.clone(), source })?;
            return Ok(format!("Switched to {}", target));
        }

        self.backups
            .remove(base_guard)
            .map_err(|source| OpError::Remove { name: base_name.clone(), source })?;
        Ok(format!(
            "No save for {} yet. A fresh save will be created by the emulator.",
            target
        ))
    }

    /// What a switch to `target` would find, without changing anything.
    pub fn preview(&self, group: &GameGroup<T::Handle>, target: &str) -> Result<SwitchPreview, OpError> {
        let dir = &group.directory;
        self.require_dir(dir)?;
        let target = target.trim();
        check_owner(target)?;
        let base = self.find_file(dir, &group.base_filename())?;
        let variant = self.find_file(dir, &group.variant_filename(target))?;
        let modified = |e: &Entry<T::Handle>| self.tree.last_modified(&e.handle).ok().flatten();
        Ok(SwitchPreview {
            base_exists: base.is_some(),
            base_modified_at: base.as_ref().and_then(modified),
            target_owner: target.to_string(),
            target_variant_exists: variant.is_some(),
            target_modified_at: variant.as_ref().and_then(modified),
        })
    }
}
