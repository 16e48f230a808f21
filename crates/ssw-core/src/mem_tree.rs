//! In-memory save tree. Handles are `/`-joined paths, the root is `""`.
//!
//! Used by tests and by callers that want to dry-run a switch. Paths can be
//! marked as denied to simulate revoked permissions.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::tree::{Entry, EntryKind, SaveTree, TreeError, TreeResult, check_child_name};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { data: Vec<u8>, modified: DateTime<Utc> },
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    denied: BTreeSet<String>,
    refuse_writes: bool,
    mutations: u64,
}

#[derive(Debug)]
pub struct MemTree {
    state: Mutex<State>,
}

impl Default for MemTree {
    fn default() -> Self {
        Self::new()
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() { name.to_string() } else { format!("{}/{}", parent, name) }
}

fn parent_of(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(p, _)| p).unwrap_or(""))
}

fn leaf(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, n)| n).unwrap_or(path)
}

impl State {
    fn check(&self, path: &str) -> TreeResult<()> {
        let hit = self.denied.iter().any(|d| {
            d.is_empty() || path == d || path.strip_prefix(d.as_str()).is_some_and(|r| r.starts_with('/'))
        });
        if hit { Err(TreeError::Denied(path.to_string())) } else { Ok(()) }
    }

    fn node(&self, path: &str) -> TreeResult<&Node> {
        self.check(path)?;
        self.nodes.get(path).ok_or_else(|| TreeError::NotFound(path.to_string()))
    }

    fn dir(&self, path: &str) -> TreeResult<()> {
        match self.node(path)? {
            Node::Dir => Ok(()),
            Node::File { .. } => Err(TreeError::NotADirectory(path.to_string())),
        }
    }

    fn kind(&self, path: &str) -> Option<EntryKind> {
        self.nodes.get(path).map(|n| match n {
            Node::Dir => EntryKind::Directory,
            Node::File { .. } => EntryKind::File,
        })
    }

    fn mkdirs(&mut self, path: &str) {
        let mut cur = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            cur = join(&cur, part);
            self.nodes.entry(cur.clone()).or_insert(Node::Dir);
        }
    }
}

impl MemTree {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::Dir);
        MemTree { state: Mutex::new(State { nodes, ..State::default() }) }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn root(&self) -> String {
        String::new()
    }

    /// Create (or overwrite) a file, creating missing parent folders.
    pub fn add_file(&self, path: &str, data: &[u8]) -> String {
        let mut st = self.lock();
        if let Some(parent) = parent_of(path) {
            st.mkdirs(parent);
        }
        st.nodes.insert(path.to_string(), Node::File { data: data.to_vec(), modified: Utc::now() });
        path.to_string()
    }

    pub fn add_dir(&self, path: &str) -> String {
        self.lock().mkdirs(path);
        path.to_string()
    }

    /// Content of a file, bypassing permission checks.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(path)
    }

    /// Deny every operation on `path` and anything below it.
    pub fn deny(&self, path: &str) {
        self.lock().denied.insert(path.to_string());
    }

    /// Make every later `write_truncating` fail; creating and deleting still work.
    pub fn refuse_writes(&self) {
        self.lock().refuse_writes = true;
    }

    /// All files with their content, keyed by path.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.lock()
            .nodes
            .iter()
            .filter_map(|(k, n)| match n {
                Node::File { data, .. } => Some((k.clone(), data.clone())),
                Node::Dir => None,
            })
            .collect()
    }

    /// Number of successful mutating calls made through [`SaveTree`].
    pub fn mutations(&self) -> u64 {
        self.lock().mutations
    }
}

impl SaveTree for MemTree {
    type Handle = String;

    fn list_children(&self, dir: &String) -> TreeResult<Vec<Entry<String>>> {
        let st = self.lock();
        st.dir(dir)?;
        let mut out = Vec::new();
        for (path, node) in st.nodes.iter() {
            if parent_of(path) != Some(dir.as_str()) {
                continue;
            }
            let kind = match node {
                Node::Dir => EntryKind::Directory,
                Node::File { .. } => EntryKind::File,
            };
            out.push(Entry { name: leaf(path).to_string(), kind, handle: path.clone() });
        }
        Ok(out)
    }

    fn find_child(&self, dir: &String, name: &str) -> TreeResult<Option<Entry<String>>> {
        check_child_name(name)?;
        let st = self.lock();
        st.dir(dir)?;
        let path = join(dir, name);
        st.check(&path)?;
        Ok(st.kind(&path).map(|kind| Entry { name: name.to_string(), kind, handle: path }))
    }

    fn kind(&self, handle: &String) -> TreeResult<EntryKind> {
        let st = self.lock();
        st.node(handle)?;
        st.kind(handle).ok_or_else(|| TreeError::NotFound(handle.clone()))
    }

    fn name(&self, handle: &String) -> Option<String> {
        if handle.is_empty() { None } else { Some(leaf(handle).to_string()) }
    }

    fn read(&self, file: &String) -> TreeResult<Vec<u8>> {
        match self.lock().node(file)? {
            Node::File { data, .. } => Ok(data.clone()),
            Node::Dir => Err(TreeError::NotAFile(file.clone())),
        }
    }

    fn write_truncating(&self, file: &String, data: &[u8]) -> TreeResult<()> {
        let mut st = self.lock();
        st.check(file)?;
        if st.refuse_writes {
            return Err(TreeError::Denied(file.clone()));
        }
        match st.nodes.get_mut(file) {
            Some(Node::File { data: d, modified }) => {
                *d = data.to_vec();
                *modified = Utc::now();
            }
            Some(Node::Dir) => return Err(TreeError::NotAFile(file.clone())),
            None => return Err(TreeError::NotFound(file.clone())),
        }
        st.mutations += 1;
        Ok(())
    }

    fn create_file(&self, dir: &String, name: &str) -> TreeResult<String> {
        check_child_name(name)?;
        let mut st = self.lock();
        st.dir(dir)?;
        let path = join(dir, name);
        st.check(&path)?;
        if st.nodes.contains_key(&path) {
            return Err(TreeError::AlreadyExists(path));
        }
        st.nodes.insert(path.clone(), Node::File { data: Vec::new(), modified: Utc::now() });
        st.mutations += 1;
        Ok(path)
    }

    fn create_dir(&self, dir: &String, name: &str) -> TreeResult<String> {
        check_child_name(name)?;
        let mut st = self.lock();
        st.dir(dir)?;
        let path = join(dir, name);
        st.check(&path)?;
        if st.nodes.contains_key(&path) {
            return Err(TreeError::AlreadyExists(path));
        }
        st.nodes.insert(path.clone(), Node::Dir);
        st.mutations += 1;
        Ok(path)
    }

    fn delete(&self, handle: &String) -> TreeResult<()> {
        let mut st = self.lock();
        if handle.is_empty() {
            return Err(TreeError::Denied("<root>".into()));
        }
        if let Node::Dir = st.node(handle)? {
            if st.nodes.keys().any(|k| parent_of(k) == Some(handle.as_str())) {
                return Err(TreeError::Io(std::io::Error::other("directory not empty")));
            }
        }
        st.nodes.remove(handle);
        st.mutations += 1;
        Ok(())
    }

    fn last_modified(&self, handle: &String) -> TreeResult<Option<DateTime<Utc>>> {
        match self.lock().node(handle)? {
            Node::File { modified, .. } => Ok(Some(*modified)),
            Node::Dir => Ok(None),
        }
    }
}
