use crate::backup::BackupError;
use crate::tree::TreeError;

/// Why a switch, export or import stopped. The `Display` text is the message
/// shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error("Game directory is no longer accessible")]
    DirectoryInaccessible,

    #[error("{0} is no longer accessible")]
    FileInaccessible(String),

    #[error("Could not read game directory: {0}")]
    Lookup(TreeError),

    #[error("Current save owner is required")]
    OwnerRequired,

    #[error("Invalid owner tag: {0:?}")]
    InvalidOwner(String),

    #[error("{0} is not a regular file")]
    NotAFile(String),

    #[error("Could not back up {name}: {source}")]
    Backup { name: String, source: BackupError },

    #[error("Could not archive current save: {0}")]
    Archive(TreeError),

    #[error("Could not activate target save: {0}")]
    Activate(TreeError),

    #[error("Could not remove {name}: {source}")]
    Remove { name: String, source: TreeError },

    #[error("No active save file to export")]
    NoActiveSave,

    #[error("Export folder is no longer accessible")]
    ExportFolderInaccessible,

    #[error("Could not create export file")]
    ExportCreate(Option<TreeError>),

    #[error("Could not write export file: {0}")]
    ExportCopy(TreeError),

    #[error("Selected import file is no longer accessible")]
    ImportSourceInaccessible,

    #[error("Selected item is not a file")]
    ImportNotAFile,

    #[error("Could not create destination save file: {0}")]
    ImportCreate(TreeError),
}
