//! ssw-core: save discovery and per-user save switching for emulator folders
//!
//! This crate focuses on a small, well-factored surface:
//! - Filename convention (`base[_owner].ext`) parsing and composition
//! - Abstract save tree with a real filesystem and an in-memory implementation
//! - Scanner that groups base and owner-tagged saves into game groups
//! - Versioned backups taken before any overwrite or delete
//! - Switch, preview, export and import operations returning plain outcomes
//!
pub mod backup;
pub mod error;
pub mod fs_tree;
pub mod history;
pub mod mem_tree;
pub mod model;
pub mod naming;
pub mod owner;
pub mod scan;
pub mod switch;
pub mod transfer;
pub mod tree;

pub use backup::{BACKUP_DIR_NAME, BackupError, BackupManager, Clock, Guarded, local_clock};
pub use error::OpError;
pub use fs_tree::FsTree;
pub use history::{HistoryRecord, OpStatus};
pub use mem_tree::MemTree;
pub use model::{
    EmulatorProfile, GameGroup, GameKey, SaveFile, SwitchOutcome, SwitchPreview,
    normalize_extension,
};
pub use naming::{SaveName, compose, parse};
pub use owner::{MAX_OWNER_LEN, OwnerTag, normalize_owner};
pub use scan::scan;
pub use switch::SaveSwitcher;
pub use tree::{Entry, EntryKind, SaveTree, TreeError, TreeResult};
