//! Request model for archive assembly.
//!
//! This module defines the wire shape of an assembly request: a named
//! hierarchy of file and folder nodes. Files carry a fetch locator (URL),
//! folders carry an ordered list of children. Structural validation runs
//! before any network or archive work.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Structural violations of an [`ArchiveRequest`].
///
/// All variants are client errors: they are detected before any I/O and
/// reject the request with nothing produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request has no root items or a blank archive name.
    #[error("empty request: archive name and at least one root item are required")]
    EmptyRequest,

    /// A file node has no fetch locator.
    #[error("file {name:?} has no source locator")]
    MissingSource {
        /// Name of the offending file node.
        name: String,
    },

    /// A node name is blank, contains a path separator, or is a `.`/`..`
    /// segment.
    #[error("invalid item name {name:?}")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// Two sibling nodes resolve to the same archive path and at least one
    /// is a folder, so renaming would be ambiguous.
    #[error("conflicting entries at archive path {path:?}")]
    PathCollision {
        /// The contested archive path.
        path: String,
    },
}

/// One node in the requested hierarchy.
///
/// The `kind` tag on the wire selects the variant, so a node can never
/// carry both a source and children:
///
/// ```json
/// { "name": "docs", "kind": "folder", "children": [
///     { "name": "a.txt", "kind": "file", "source": "http://x/a.txt" }
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemNode {
    /// A file entry backed by a remote resource.
    File {
        /// Display name, used as the last archive path segment.
        name: String,
        /// Opaque fetch locator (URL).
        source: String,
    },
    /// A folder entry containing further nodes.
    Folder {
        /// Display name, used as the last archive path segment.
        name: String,
        /// Ordered children; an empty list produces an empty folder entry.
        #[serde(default)]
        children: Vec<ItemNode>,
    },
}

impl ItemNode {
    /// Returns the node's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Folder { name, .. } => name,
        }
    }
}

/// The root of an assembly request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRequest {
    /// Archive base name; the response file name is `{name}.zip`.
    pub name: String,
    /// Ordered top-level items, mixing files and folders.
    pub roots: Vec<ItemNode>,
}

impl ArchiveRequest {
    /// Builds a flat, all-files request from a list of URLs.
    ///
    /// This is the degenerate single-level convenience: each file's name is
    /// derived from the locator's final path segment (query and fragment
    /// stripped, percent-decoded), falling back to `download.bin` when the
    /// URL has no usable segment.
    #[must_use]
    pub fn from_urls<I, S>(name: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roots = urls
            .into_iter()
            .map(|url| {
                let source = url.into();
                ItemNode::File {
                    name: filename_from_url(&source),
                    source,
                }
            })
            .collect();
        Self {
            name: name.into(),
            roots,
        }
    }

    /// Validates the request structure, depth-first, returning the first
    /// violation found.
    ///
    /// No network or archive work happens before this check passes; a
    /// failure short-circuits the whole operation with no partial output.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRequest`] if `roots` is empty or the
    /// archive name is blank, [`ValidationError::MissingSource`] for a file
    /// without a locator, and [`ValidationError::InvalidName`] for blank
    /// names or names that would escape their folder. The archive name is
    /// held to the same rule as node names: it becomes the `{name}.zip`
    /// file name, so it must not carry separators or dot segments either.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() || self.roots.is_empty() {
            return Err(ValidationError::EmptyRequest);
        }
        validate_name(&self.name)?;
        validate_nodes(&self.roots)
    }
}

fn validate_nodes(nodes: &[ItemNode]) -> Result<(), ValidationError> {
    for node in nodes {
        match node {
            ItemNode::File { name, source } => {
                if source.trim().is_empty() {
                    return Err(ValidationError::MissingSource { name: name.clone() });
                }
                validate_name(name)?;
            }
            ItemNode::Folder { name, children } => {
                validate_name(name)?;
                validate_nodes(children)?;
            }
        }
    }
    Ok(())
}

/// Rejects names that are blank or would produce a malformed or traversing
/// archive path.
fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed == "."
        || trimmed == ".."
    {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Derives a display name from a URL's final path segment.
///
/// Query parameters and fragments are dropped by URL parsing; the segment
/// is percent-decoded and sanitized so it cannot carry path separators.
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    let segment = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()?
            .filter(|s| !s.is_empty())
            .next_back()
            .map(str::to_string)
    });

    let Some(segment) = segment else {
        return "download.bin".to_string();
    };

    let decoded = urlencoding::decode(&segment)
        .map(|d| d.into_owned())
        .unwrap_or(segment);
    let sanitized = sanitize_segment(&decoded);
    if sanitized.is_empty() {
        "download.bin".to_string()
    } else {
        sanitized
    }
}

/// Replaces path separators and control characters so a decoded segment is
/// always a single safe path component.
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}
