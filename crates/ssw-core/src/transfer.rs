//! Export the active save to another folder, or import a file as the active save.

use tracing::{info, warn};

use crate::backup::{FILE_TS_FORMAT, create_unique_file};
use crate::error::OpError;
use crate::model::{GameGroup, SwitchOutcome};
use crate::tree::{EntryKind, SaveTree};
use crate::switch::SaveSwitcher;

fn finish(op: &str, game: &str, res: Result<String, OpError>) -> SwitchOutcome {
    match res {
        Ok(msg) => {
            info!(game, "{}", msg);
            SwitchOutcome::success(msg)
        }
        Err(e) => {
            warn!(game, error = %e, "{} failed", op);
            SwitchOutcome::failure(e.to_string())
        }
    }
}

impl<'a, T: SaveTree> SaveSwitcher<'a, T> {
    /// Copy the active save into `destination` as `{base}_{yyyyMMdd_HHmmss}.{ext}`.
    /// Never overwrites: a taken name gets a `_N` suffix instead.
    pub fn export(&self, group: &GameGroup<T::Handle>, destination: &T::Handle) -> SwitchOutcome {
        finish("export", &group.id(), self.try_export(group, destination))
    }

    fn try_export(&self, group: &GameGroup<T::Handle>, destination: &T::Handle) -> Result<String, OpError> {
        self.require_dir(&group.directory)?;
        if !matches!(self.tree.kind(destination), Ok(EntryKind::Directory)) {
            return Err(OpError::ExportFolderInaccessible);
        }
        let base = self
            .find_file(&group.directory, &group.base_filename())?
            .ok_or(OpError::NoActiveSave)?;
        let data = self.tree.read(&base.handle).map_err(OpError::ExportCopy)?;

        let name = format!(
            "{}_{}.{}",
            group.key.base_name,
            (self.clock)().format(FILE_TS_FORMAT),
            group.key.extension
        );
        let (file, file_name) = create_unique_file(self.tree, destination, &name)
            .map_err(|e| OpError::ExportCreate(Some(e)))?
            .ok_or(OpError::ExportCreate(None))?;
        if let Err(e) = self.tree.write_truncating(&file, &data) {
            let _ = self.tree.delete(&file);
            return Err(OpError::ExportCopy(e));
        }
        Ok(format!("Exported to {}", file_name))
    }

    /// Replace (or create) the active save with the bytes of `source`.
    /// An existing active save is backed up first; owner variants are left alone.
    pub fn import(&self, group: &GameGroup<T::Handle>, source: &T::Handle) -> SwitchOutcome {
        finish("import", &group.id(), self.try_import(group, source))
    }

    fn try_import(&self, group: &GameGroup<T::Handle>, source: &T::Handle) -> Result<String, OpError> {
        let dir = &group.directory;
        self.require_dir(dir)?;
        match self.tree.kind(source) {
            Ok(EntryKind::File) => {}
            Ok(_) => return Err(OpError::ImportNotAFile),
            Err(_) => return Err(OpError::ImportSourceInaccessible),
        }
        // Read first: the source may be the active save itself
        let data = self.tree.read(source).map_err(|_| OpError::ImportSourceInaccessible)?;

        let base_name = group.base_filename();
        let guard = self.guard(dir, &base_name)?;
        let base = self.backups.recreate(guard).map_err(OpError::ImportCreate)?;
        self.tree.write_truncating(&base, &data).map_err(OpError::ImportCreate)?;

        let from = self.tree.name(source).unwrap_or_else(|| "selected file".to_string());
        Ok(format!("Imported save from {}", from))
    }
}
