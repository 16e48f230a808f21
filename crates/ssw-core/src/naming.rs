//! Save filename convention: `{base}.{ext}` for the active save and
//! `{base}_{owner}.{ext}` for an owner's archived copy.
//!
//! Known limitation: a base name that itself contains `_` cannot be told apart
//! from a `base_owner` pair. The text after the last `_` is always taken as the
//! owner, so `super_mario.sav` parses as base `super`, owner `mario`.

use serde::{Deserialize, Serialize};

const RESERVED_SUFFIXES: [&str; 2] = [".tmp", ".bak"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveName {
    pub base_name: String,
    pub extension: String,
    pub owner: Option<String>,
}

impl SaveName {
    pub fn filename(&self) -> String {
        compose(&self.base_name, &self.extension, self.owner.as_deref())
    }
}

/// Split `name` at its last `.`; `None` if there is no dot or either side is empty.
pub fn split_extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    if dot == 0 || dot == name.len() - 1 {
        return None;
    }
    Some((&name[..dot], &name[dot + 1..]))
}

pub fn is_reserved(filename: &str) -> bool {
    if filename.starts_with('.') {
        return true;
    }
    let lower = filename.to_ascii_lowercase();
    RESERVED_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

pub fn parse(filename: &str) -> Option<SaveName> {
    if is_reserved(filename) {
        return None;
    }
    let (stem, ext) = split_extension(filename)?;
    let (base, owner) = match stem.rfind('_') {
        Some(us) if us > 0 && us < stem.len() - 1 => (&stem[..us], Some(stem[us + 1..].to_string())),
        _ => (stem, None),
    };
    Some(SaveName {
        base_name: base.to_string(),
        extension: ext.to_string(),
        owner,
    })
}

pub fn compose(base_name: &str, extension: &str, owner: Option<&str>) -> String {
    match owner {
        Some(o) => format!("{}_{}.{}", base_name, o, extension),
        None => format!("{}.{}", base_name, extension),
    }
}
