//! The ambiguous dotted-key tree and its resolver.
//!
//! Branch segment names are raw and may contain literal dots, so a plain
//! split-on-dot lookup is ambiguous. The resolver enumerates every way to
//! group the path's raw dot-separated tokens into contiguous runs and tries
//! a nested lookup for each; the first grouping that bottoms out at a string
//! leaf wins. Token counts are small in practice, but the enumeration is
//! capped and fails closed beyond [`MAX_PATH_TOKENS`].

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::utils::{join_key, unescape_segment};

/// Paths with more raw tokens than this never resolve.
pub const MAX_PATH_TOKENS: usize = 12;

/// Nested mapping from raw path segment to either a leaf key id or a
/// subtree. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryTree {
    root: Map<String, Value>,
}

impl EntryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Insert a leaf under raw `segments`; the stored id is the segments
    /// escaped and joined. Returns the id.
    ///
    /// An existing leaf on the path is replaced by a branch, mirroring how
    /// dictionaries shadow scalar values with nested objects.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S]) -> String {
        let id = join_key(segments);
        if segments.is_empty() {
            return id;
        }
        let mut node = &mut self.root;
        for segment in &segments[..segments.len() - 1] {
            let entry = node
                .entry(segment.as_ref().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            node = entry
                .as_object_mut()
                .unwrap_or_else(|| unreachable!("branch was just made an object"));
        }
        let leaf = segments[segments.len() - 1].as_ref().to_string();
        node.insert(leaf, Value::String(id.clone()));
        id
    }

    /// Remove the leaf stored under raw `segments`, pruning branches left
    /// empty. Used to revert staged mints on cancellation.
    pub fn remove<S: AsRef<str>>(&mut self, segments: &[S]) {
        remove_path(&mut self.root, segments);
    }

    /// Resolve a free-form dotted path to a stored key id.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let tokens: Vec<&str> = path.split('.').collect();
        if tokens.is_empty() || tokens.len() > MAX_PATH_TOKENS {
            return None;
        }
        let n = tokens.len();
        let full_mask: u32 = if n == 1 { 0 } else { (1 << (n - 1)) - 1 };
        // full_mask = a boundary after every token = the plain split; try it
        // first, then progressively merged groupings.
        for mask in (0..=full_mask).rev() {
            if let Some(id) = self.lookup_grouping(&tokens, mask) {
                return Some(id);
            }
        }
        None
    }

    /// Try one grouping: bit `b` of `mask` set means a split between raw
    /// tokens `b` and `b + 1`.
    fn lookup_grouping(&self, tokens: &[&str], mask: u32) -> Option<String> {
        let mut node = &self.root;
        let mut run_start = 0;
        for b in 0..tokens.len() {
            let split_here = b == tokens.len() - 1 || mask & (1 << b) != 0;
            if !split_here {
                continue;
            }
            let segment = unescape_segment(&tokens[run_start..=b].join("."));
            let child = node.get(&segment)?;
            if b == tokens.len() - 1 {
                return match child {
                    Value::String(id) => Some(id.clone()),
                    _ => None,
                };
            }
            node = child.as_object()?;
            run_start = b + 1;
        }
        None
    }

    /// Subtree containing only the leaves `keep` accepts, preserving
    /// segment order. Used to write each key to exactly one physical file.
    pub fn slice<F: Fn(&str) -> bool>(&self, keep: F) -> EntryTree {
        EntryTree {
            root: slice_map(&self.root, &keep),
        }
    }

    /// All leaf key ids, in tree order.
    pub fn leaf_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut out);
        out
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

fn remove_path<S: AsRef<str>>(node: &mut Map<String, Value>, segments: &[S]) -> bool {
    match segments {
        [] => false,
        [leaf] => {
            node.shift_remove(leaf.as_ref());
            true
        }
        [head, rest @ ..] => {
            let Some(child) = node.get_mut(head.as_ref()) else {
                return false;
            };
            let Some(child_map) = child.as_object_mut() else {
                return false;
            };
            remove_path(child_map, rest);
            if child_map.is_empty() {
                node.shift_remove(head.as_ref());
            }
            true
        }
    }
}

fn slice_map<F: Fn(&str) -> bool>(node: &Map<String, Value>, keep: &F) -> Map<String, Value> {
    let mut out = Map::new();
    for (segment, child) in node {
        match child {
            Value::String(id) => {
                if keep(id) {
                    out.insert(segment.clone(), child.clone());
                }
            }
            Value::Object(branch) => {
                let sliced = slice_map(branch, keep);
                if !sliced.is_empty() {
                    out.insert(segment.clone(), Value::Object(sliced));
                }
            }
            _ => {}
        }
    }
    out
}

fn collect_leaves(node: &Map<String, Value>, out: &mut Vec<String>) {
    for child in node.values() {
        match child {
            Value::String(id) => out.push(id.clone()),
            Value::Object(branch) => collect_leaves(branch, out),
            _ => {}
        }
    }
}

/// Memoizing wrapper around [`EntryTree::resolve`] for read-only passes.
///
/// The cache is keyed by the raw path string and must not outlive tree
/// mutation; the census creates one per pass.
#[derive(Debug, Default)]
pub struct KeyResolver {
    cache: HashMap<String, Option<String>>,
}

impl KeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, tree: &EntryTree, path: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(path) {
            return cached.clone();
        }
        let result = tree.resolve(path);
        self.cache.insert(path.to_string(), result.clone());
        result
    }
}
