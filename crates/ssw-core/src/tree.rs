//! Abstract save tree: folders and files behind opaque, revocable handles.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    Denied(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TreeError {
    /// Handle vanished or access was revoked since it was obtained.
    pub fn is_inaccessible(&self) -> bool {
        matches!(self, TreeError::NotFound(_) | TreeError::Denied(_))
    }
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Other,
}

/// One child of a directory, as returned by a listing snapshot.
#[derive(Debug, Clone)]
pub struct Entry<H> {
    pub name: String,
    pub kind: EntryKind,
    pub handle: H,
}

impl<H> Entry<H> {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Storage operations the engine needs. Every call is fallible: a handle may
/// have been deleted or had its permissions revoked since it was obtained.
///
/// Listings are returned as values, never live iterators, so traversal can be
/// tested against [`crate::MemTree`].
pub trait SaveTree {
    type Handle: Clone + Debug;

    fn list_children(&self, dir: &Self::Handle) -> TreeResult<Vec<Entry<Self::Handle>>>;

    fn find_child(
        &self,
        dir: &Self::Handle,
        name: &str,
    ) -> TreeResult<Option<Entry<Self::Handle>>> {
        Ok(self
            .list_children(dir)?
            .into_iter()
            .find(|e| e.name == name))
    }

    fn kind(&self, handle: &Self::Handle) -> TreeResult<EntryKind>;

    /// Display name of the handle, if the storage layer can tell.
    fn name(&self, handle: &Self::Handle) -> Option<String>;

    fn read(&self, file: &Self::Handle) -> TreeResult<Vec<u8>>;

    /// Replace the whole content of an existing file.
    fn write_truncating(&self, file: &Self::Handle, data: &[u8]) -> TreeResult<()>;

    /// Create a new empty file; fails with `AlreadyExists` if the name is taken.
    fn create_file(&self, dir: &Self::Handle, name: &str) -> TreeResult<Self::Handle>;

    fn create_dir(&self, dir: &Self::Handle, name: &str) -> TreeResult<Self::Handle>;

    fn delete(&self, handle: &Self::Handle) -> TreeResult<()>;

    fn last_modified(&self, handle: &Self::Handle) -> TreeResult<Option<DateTime<Utc>>>;

    fn copy(&self, from: &Self::Handle, to: &Self::Handle) -> TreeResult<()> {
        let data = self.read(from)?;
        self.write_truncating(to, &data)
    }
}

// Names handed to create_* must stay inside the parent directory
pub(crate) fn check_child_name(name: &str) -> TreeResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}
