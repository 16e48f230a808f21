//! Discover game groups under each emulator root.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::backup::BACKUP_DIR_NAME;
use crate::model::{EmulatorProfile, GameGroup, GameKey, SaveFile};
use crate::naming;
use crate::tree::{Entry, EntryKind, SaveTree};

/// Walk every profile root and group save files by
/// `(emulator, relative dir, base name, extension)`.
///
/// Read-only. Unreadable roots or subfolders are skipped with a warning.
/// Groups come back sorted by base name, case-insensitively.
pub fn scan<T: SaveTree>(tree: &T, profiles: &[EmulatorProfile<T::Handle>]) -> Vec<GameGroup<T::Handle>> {
    let mut groups: BTreeMap<GameKey, GameGroup<T::Handle>> = BTreeMap::new();
    for profile in profiles {
        match tree.list_children(&profile.root) {
            Ok(children) => walk(tree, profile, &profile.root, "", children, &mut groups),
            Err(e) => warn!(emulator = %profile.id, error = %e, "skipping unreadable save root"),
        }
    }
    let mut out: Vec<_> = groups.into_values().filter(GameGroup::has_saves).collect();
    out.sort_by_cached_key(|g| g.key.base_name.to_lowercase());
    out
}

fn walk<T: SaveTree>(
    tree: &T,
    profile: &EmulatorProfile<T::Handle>,
    dir: &T::Handle,
    rel: &str,
    children: Vec<Entry<T::Handle>>,
    groups: &mut BTreeMap<GameKey, GameGroup<T::Handle>>,
) {
    for child in children {
        match child.kind {
            EntryKind::Directory => {
                if child.name == BACKUP_DIR_NAME {
                    continue;
                }
                let next = if rel.is_empty() { child.name.clone() } else { format!("{}/{}", rel, child.name) };
                match tree.list_children(&child.handle) {
                    Ok(kids) => walk(tree, profile, &child.handle, &next, kids, groups),
                    Err(e) => warn!(emulator = %profile.id, dir = %next, error = %e, "skipping unreadable folder"),
                }
            }
            EntryKind::File => add_file(tree, profile, dir, rel, child, groups),
            EntryKind::Other => {}
        }
    }
}

fn add_file<T: SaveTree>(
    tree: &T,
    profile: &EmulatorProfile<T::Handle>,
    dir: &T::Handle,
    rel: &str,
    file: Entry<T::Handle>,
    groups: &mut BTreeMap<GameKey, GameGroup<T::Handle>>,
) {
    let Some(name) = naming::parse(&file.name) else {
        return;
    };
    if !profile.allows(&name.extension) {
        return;
    }
    debug!(emulator = %profile.id, dir = rel, file = %file.name, "save file");
    let key = GameKey {
        emulator_id: profile.id.clone(),
        relative_dir: rel.to_string(),
        base_name: name.base_name,
        extension: name.extension,
    };
    let group = groups.entry(key.clone()).or_insert_with(|| GameGroup {
        key,
        emulator_name: profile.name.clone(),
        directory: dir.clone(),
        base_save: None,
        variant_saves: BTreeMap::new(),
    });
    let save = SaveFile {
        modified_at: tree.last_modified(&file.handle).ok().flatten(),
        handle: file.handle,
        filename: file.name,
    };
    match name.owner {
        Some(owner) => {
            group.variant_saves.insert(owner, save);
        }
        None => group.base_save = Some(save),
    }
}
