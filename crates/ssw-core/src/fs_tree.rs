use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::tree::{Entry, EntryKind, SaveTree, TreeError, TreeResult, check_child_name};

/// Save tree backed by the local filesystem; handles are paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTree;

impl FsTree {
    pub fn new() -> Self {
        FsTree
    }
}

fn map_io(e: io::Error, p: &Path) -> TreeError {
    match e.kind() {
        io::ErrorKind::NotFound => TreeError::NotFound(p.display().to_string()),
        io::ErrorKind::PermissionDenied => TreeError::Denied(p.display().to_string()),
        io::ErrorKind::AlreadyExists => TreeError::AlreadyExists(p.display().to_string()),
        _ => TreeError::Io(e),
    }
}

fn kind_of(ft: fs::FileType) -> EntryKind {
    if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

fn require_dir(dir: &Path) -> TreeResult<()> {
    let meta = fs::metadata(dir).map_err(|e| map_io(e, dir))?;
    if !meta.is_dir() {
        return Err(TreeError::NotADirectory(dir.display().to_string()));
    }
    Ok(())
}

impl SaveTree for FsTree {
    type Handle = PathBuf;

    fn list_children(&self, dir: &PathBuf) -> TreeResult<Vec<Entry<PathBuf>>> {
        let rd = fs::read_dir(dir).map_err(|e| map_io(e, dir))?;
        let mut out = Vec::new();
        for e in rd {
            let e = e.map_err(|e| map_io(e, dir))?;
            let Ok(name) = e.file_name().into_string() else {
                tracing::debug!(path = %e.path().display(), "skipping non UTF-8 name");
                continue;
            };
            // file_type() does not follow symlinks, so linked dirs come back as Other
            let kind = e.file_type().map(kind_of).unwrap_or(EntryKind::Other);
            out.push(Entry { name, kind, handle: e.path() });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn find_child(&self, dir: &PathBuf, name: &str) -> TreeResult<Option<Entry<PathBuf>>> {
        check_child_name(name)?;
        require_dir(dir)?;
        let p = dir.join(name);
        match fs::symlink_metadata(&p) {
            Ok(meta) => Ok(Some(Entry {
                name: name.to_string(),
                kind: kind_of(meta.file_type()),
                handle: p,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(e, &p)),
        }
    }

    fn kind(&self, handle: &PathBuf) -> TreeResult<EntryKind> {
        let meta = fs::symlink_metadata(handle).map_err(|e| map_io(e, handle))?;
        Ok(kind_of(meta.file_type()))
    }

    fn name(&self, handle: &PathBuf) -> Option<String> {
        handle.file_name().and_then(|s| s.to_str()).map(str::to_string)
    }

    fn read(&self, file: &PathBuf) -> TreeResult<Vec<u8>> {
        if self.kind(file)? != EntryKind::File {
            return Err(TreeError::NotAFile(file.display().to_string()));
        }
        fs::read(file).map_err(|e| map_io(e, file))
    }

    fn write_truncating(&self, file: &PathBuf, data: &[u8]) -> TreeResult<()> {
        let mut f = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(file)
            .map_err(|e| map_io(e, file))?;
        f.write_all(data).map_err(|e| map_io(e, file))?;
        f.sync_all().map_err(|e| map_io(e, file))
    }

    fn create_file(&self, dir: &PathBuf, name: &str) -> TreeResult<PathBuf> {
        check_child_name(name)?;
        require_dir(dir)?;
        let p = dir.join(name);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&p)
            .map_err(|e| map_io(e, &p))?;
        Ok(p)
    }

    fn create_dir(&self, dir: &PathBuf, name: &str) -> TreeResult<PathBuf> {
        check_child_name(name)?;
        require_dir(dir)?;
        let p = dir.join(name);
        fs::create_dir(&p).map_err(|e| map_io(e, &p))?;
        Ok(p)
    }

    fn delete(&self, handle: &PathBuf) -> TreeResult<()> {
        let res = match self.kind(handle)? {
            EntryKind::Directory => fs::remove_dir(handle),
            _ => fs::remove_file(handle),
        };
        res.map_err(|e| map_io(e, handle))
    }

    fn last_modified(&self, handle: &PathBuf) -> TreeResult<Option<DateTime<Utc>>> {
        let meta = fs::metadata(handle).map_err(|e| map_io(e, handle))?;
        Ok(meta.modified().ok().map(DateTime::<Utc>::from))
    }
}
