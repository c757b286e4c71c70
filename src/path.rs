//! Archive path resolution for the requested hierarchy.
//!
//! This module turns the validated item tree into a flat, depth-first list
//! of [`ResolvedEntry`] values carrying the canonical in-archive path of
//! every node. Resolution is pure: it needs no fetch results, so the
//! assembler runs it before any network I/O and collision errors reject the
//! request with no work performed.
//!
//! # Collision policy
//!
//! Two siblings that resolve to the same archive path are a collision.
//! Colliding *files* are disambiguated by appending a numeric suffix before
//! the extension (`a.txt`, `a-1.txt`, `a-2.txt`, ...), preserving
//! first-seen order. Folders are never renamed: any collision involving a
//! folder is reported as [`ValidationError::PathCollision`] because merging
//! or renaming a folder would be ambiguous. Given identical input order the
//! outcome is deterministic.

use std::collections::HashMap;

use crate::request::{ItemNode, ValidationError};

/// Whether a resolved entry is a folder or a fetchable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKind {
    /// Folder entry; its archive path ends with `/`.
    Folder,
    /// File entry backed by a fetch locator.
    File {
        /// Opaque fetch locator carried over from the request node.
        source: String,
    },
}

/// One node of the tree with its canonical archive path.
///
/// Paths are forward-slash separated with no leading `/` and no `..`
/// segments; folder paths end with `/`. Entries are emitted depth-first in
/// input order, so a folder always precedes its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Canonical in-archive path.
    pub archive_path: String,
    /// Folder marker or file locator.
    pub kind: ResolvedKind,
}

impl ResolvedEntry {
    /// Returns true for folder entries.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ResolvedKind::Folder)
    }
}

/// Resolves every node of the tree into a [`ResolvedEntry`], depth-first.
///
/// # Errors
///
/// Returns [`ValidationError::PathCollision`] when siblings collide and at
/// least one of them is a folder.
pub fn resolve_entries(roots: &[ItemNode]) -> Result<Vec<ResolvedEntry>, ValidationError> {
    let mut entries = Vec::new();
    resolve_level(roots, "", &mut entries)?;
    Ok(entries)
}

/// Marks which kind of node claimed a name within one folder level.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Claim {
    Folder,
    File,
}

fn resolve_level(
    nodes: &[ItemNode],
    prefix: &str,
    entries: &mut Vec<ResolvedEntry>,
) -> Result<(), ValidationError> {
    // Names already claimed at this level, after any renaming.
    let mut claimed: HashMap<String, Claim> = HashMap::new();

    for node in nodes {
        match node {
            ItemNode::Folder { name, children } => {
                if claimed.contains_key(name.as_str()) {
                    return Err(ValidationError::PathCollision {
                        path: format!("{prefix}{name}"),
                    });
                }
                claimed.insert(name.clone(), Claim::Folder);

                let path = format!("{prefix}{name}/");
                entries.push(ResolvedEntry {
                    archive_path: path.clone(),
                    kind: ResolvedKind::Folder,
                });
                resolve_level(children, &path, entries)?;
            }
            ItemNode::File { name, source } => {
                let final_name = match claimed.get(name.as_str()) {
                    Some(Claim::Folder) => {
                        return Err(ValidationError::PathCollision {
                            path: format!("{prefix}{name}"),
                        });
                    }
                    Some(Claim::File) => rename_with_suffix(name, &claimed),
                    None => name.clone(),
                };
                claimed.insert(final_name.clone(), Claim::File);

                entries.push(ResolvedEntry {
                    archive_path: format!("{prefix}{final_name}"),
                    kind: ResolvedKind::File {
                        source: source.clone(),
                    },
                });
            }
        }
    }
    Ok(())
}

/// Picks the first `{stem}-{n}{ext}` name not yet claimed at this level.
///
/// Candidates are checked against every claimed name, so a rename can never
/// silently overwrite a literal `a-1.txt` sibling.
fn rename_with_suffix(name: &str, claimed: &HashMap<String, Claim>) -> String {
    let (stem, ext) = split_extension(name);
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{stem}-{suffix}{ext}");
        if !claimed.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Splits a file name at the last dot, keeping the dot with the extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}
