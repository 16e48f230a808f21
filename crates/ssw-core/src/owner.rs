//! Owner tags: the per-user suffix embedded in variant save names.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_OWNER_LEN: usize = 30;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9_]").unwrap();
    static ref UNDERSCORES: Regex = Regex::new(r"_+").unwrap();
}

/// Normalize a display name into tag text: lowercase `[a-z0-9_]`, single
/// underscores, no leading/trailing `_`, at most [`MAX_OWNER_LEN`] chars.
pub fn normalize_owner(display_name: &str) -> String {
    let lower = display_name.trim().to_lowercase();
    let spaced = WHITESPACE.replace_all(&lower, "_");
    let kept = DISALLOWED.replace_all(&spaced, "");
    let collapsed = UNDERSCORES.replace_all(&kept, "_");
    let mut out = collapsed.trim_matches('_').to_string();
    // only ASCII is left, byte truncation is safe
    out.truncate(MAX_OWNER_LEN);
    out.trim_end_matches('_').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerTag(String);

impl OwnerTag {
    /// `None` when nothing usable is left after normalization.
    pub fn normalize(display_name: &str) -> Option<Self> {
        let tag = normalize_owner(display_name);
        if tag.is_empty() { None } else { Some(OwnerTag(tag)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
