//! Versioned backups taken before a save is overwritten or deleted.
//!
//! Copies land in a [`BACKUP_DIR_NAME`] folder next to the file, named
//! `{stem}_{yyyyMMdd_HHmmss}.{ext}.bak`, with `_N` appended when the second
//! is already taken. The scanner never descends into that folder.
//!
//! Destructive calls go through [`BackupManager::guard`]: the returned
//! [`Guarded`] token is the only way to remove or recreate a file, so a file
//! cannot be touched before its backup was attempted.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::naming::split_extension;
use crate::tree::{Entry, EntryKind, SaveTree, TreeError};

pub const BACKUP_DIR_NAME: &str = "SaveSwitcherBackups";
pub const FILE_TS_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const MAX_NAME_ATTEMPTS: usize = 1000;

/// Wall clock used for backup and export names.
pub type Clock = fn() -> NaiveDateTime;

pub fn local_clock() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup folder unavailable: {0}")]
    Folder(TreeError),

    #[error("{0} is not a regular file")]
    NotAFile(String),

    #[error("copy failed: {0}")]
    Copy(TreeError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub fn versioned_backup_name(filename: &str, ts: NaiveDateTime) -> String {
    let ts = ts.format(FILE_TS_FORMAT);
    match split_extension(filename) {
        Some((stem, ext)) => format!("{}_{}.{}.bak", stem, ts, ext),
        None => format!("{}_{}.bak", filename, ts),
    }
}

/// `name` with `_n` inserted before the extension.
pub fn counter_name(name: &str, n: usize) -> String {
    match split_extension(name) {
        Some((stem, ext)) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", name, n),
    }
}

/// Create `name` in `dir`, or the first free `name_1`, `name_2`, ... variant.
/// `Ok(None)` when every candidate is taken.
pub fn create_unique_file<T: SaveTree>(
    tree: &T,
    dir: &T::Handle,
    name: &str,
) -> Result<Option<(T::Handle, String)>, TreeError> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 { name.to_string() } else { counter_name(name, attempt) };
        if tree.find_child(dir, &candidate)?.is_some() {
            continue;
        }
        match tree.create_file(dir, &candidate) {
            Ok(h) => return Ok(Some((h, candidate))),
            // lost a race for the name, try the next one
            Err(TreeError::AlreadyExists(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// A file (possibly absent) whose backup has been taken.
#[derive(Debug)]
pub struct Guarded<H> {
    dir: H,
    name: String,
    existing: Option<Entry<H>>,
    backup: Option<H>,
}

impl<H> Guarded<H> {
    /// Where the previous content was copied, if anything was copied.
    pub fn backup(&self) -> Option<&H> {
        self.backup.as_ref()
    }
}

pub struct BackupManager<'a, T: SaveTree> {
    tree: &'a T,
    clock: Clock,
}

impl<'a, T: SaveTree> BackupManager<'a, T> {
    pub fn new(tree: &'a T, clock: Clock) -> Self {
        BackupManager { tree, clock }
    }

    fn backup_dir(&self, dir: &T::Handle) -> Result<T::Handle, BackupError> {
        match self.tree.find_child(dir, BACKUP_DIR_NAME).map_err(BackupError::Folder)? {
            Some(e) if e.is_dir() => Ok(e.handle),
            Some(_) => Err(BackupError::Folder(TreeError::NotADirectory(BACKUP_DIR_NAME.into()))),
            None => self.tree.create_dir(dir, BACKUP_DIR_NAME).map_err(BackupError::Folder),
        }
    }

    fn copy_into_backups(&self, dir: &T::Handle, file: &Entry<T::Handle>) -> Result<Option<T::Handle>, BackupError> {
        let backups = self.backup_dir(dir)?;
        let name = versioned_backup_name(&file.name, (self.clock)());
        let Some((dest, dest_name)) = create_unique_file(self.tree, &backups, &name).map_err(BackupError::Folder)? else {
            warn!(file = %file.name, "no free backup name, continuing without backup");
            return Ok(None);
        };
        if let Err(e) = self.tree.copy(&file.handle, &dest) {
            let _ = self.tree.delete(&dest);
            return Err(BackupError::Copy(e));
        }
        debug!(file = %file.name, backup = %dest_name, "backed up");
        Ok(Some(dest))
    }

    /// Copy `filename` into the backup folder if it exists.
    /// `Ok(None)` if there was nothing to copy or no free name was left.
    pub fn create_versioned_copy(&self, dir: &T::Handle, filename: &str) -> Result<Option<T::Handle>, BackupError> {
        match self.tree.find_child(dir, filename)? {
            None => Ok(None),
            Some(e) if e.kind == EntryKind::File => self.copy_into_backups(dir, &e),
            Some(_) => Err(BackupError::NotAFile(filename.to_string())),
        }
    }

    /// Best-effort variant of [`Self::create_versioned_copy`]; failures are only logged.
    pub fn protect(&self, dir: &T::Handle, filename: &str) {
        if let Err(e) = self.create_versioned_copy(dir, filename) {
            warn!(file = filename, error = %e, "backup failed");
        }
    }

    /// Back up `filename` (if present) ahead of a destructive change.
    /// An error means the backup could not be taken and the file must not be touched.
    pub fn guard(&self, dir: &T::Handle, filename: &str) -> Result<Guarded<T::Handle>, BackupError> {
        let existing = self.tree.find_child(dir, filename)?;
        let backup = match &existing {
            None => None,
            Some(e) if e.kind == EntryKind::File => self.copy_into_backups(dir, e)?,
            Some(_) => return Err(BackupError::NotAFile(filename.to_string())),
        };
        Ok(Guarded { dir: dir.clone(), name: filename.to_string(), existing, backup })
    }

    /// Delete the guarded file. No-op if it did not exist.
    pub fn remove(&self, g: Guarded<T::Handle>) -> Result<(), TreeError> {
        match g.existing {
            Some(e) => match self.tree.delete(&e.handle) {
                Ok(()) | Err(TreeError::NotFound(_)) => Ok(()),
                Err(err) => Err(err),
            },
            None => Ok(()),
        }
    }

    /// Delete the guarded file and create an empty one of the same name.
    pub fn recreate(&self, g: Guarded<T::Handle>) -> Result<T::Handle, TreeError> {
        if let Some(e) = &g.existing {
            match self.tree.delete(&e.handle) {
                Ok(()) | Err(TreeError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        self.tree.create_file(&g.dir, &g.name)
    }
}
