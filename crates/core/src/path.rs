//! Remote entity references
//!
//! A [`Path`] names an entity on a backend by its absolute, slash-delimited
//! location plus a set of type tags. Equality and hashing only consider the
//! normalized absolute path, never the type tags or attributes.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;

/// Path delimiter for all backends
pub const DELIMITER: char = '/';

bitflags::bitflags! {
    /// Type tags of a remote entity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PathType: u8 {
        const FILE = 0b0001;
        const DIRECTORY = 0b0010;
        /// Container (bucket) directly below the root
        const VOLUME = 0b0100;
        /// Directory inferred from key prefixes without a marker object
        const PLACEHOLDER = 0b1000;
    }
}

/// Coarse kind of an entry, used to tell apart a file and a directory that
/// share the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
}

/// Metadata attached to a path by the backend
///
/// Values are immutable once built; listings return fresh attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAttributes {
    pub size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<Timestamp>,

    /// Revision number counted from the newest (1) to older ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,

    /// Backend identifier of this exact revision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,

    /// Set for revisions shadowed by a newer one of the same name
    #[serde(default)]
    pub duplicate: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl PathAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified: Timestamp) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn with_duplicate(mut self, duplicate: bool) -> Self {
        self.duplicate = duplicate;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Reference to a remote entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    absolute: String,
    types: PathType,
    #[serde(default)]
    attributes: PathAttributes,
}

impl Path {
    /// The root of a backend namespace
    pub fn root() -> Self {
        Self {
            absolute: DELIMITER.to_string(),
            types: PathType::DIRECTORY | PathType::VOLUME,
            attributes: PathAttributes::default(),
        }
    }

    /// Create a path from an absolute or relative string. The string is
    /// normalized and always rooted.
    pub fn new(path: impl AsRef<str>, types: PathType) -> Self {
        Self {
            absolute: normalize(path.as_ref()),
            types,
            attributes: PathAttributes::default(),
        }
    }

    /// Create a child of `self` named `name`
    pub fn child(&self, name: &str, types: PathType) -> Self {
        if self.is_root() {
            Self::new(name, types)
        } else {
            Self::new(format!("{}{DELIMITER}{name}", self.absolute), types)
        }
    }

    pub fn with_attributes(mut self, attributes: PathAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_types(mut self, types: PathType) -> Self {
        self.types = types;
        self
    }

    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    pub fn types(&self) -> PathType {
        self.types
    }

    pub fn attributes(&self) -> &PathAttributes {
        &self.attributes
    }

    /// Last path segment, empty for the root
    pub fn name(&self) -> &str {
        self.absolute
            .rsplit(DELIMITER)
            .next()
            .unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.absolute.len() == 1
    }

    pub fn is_file(&self) -> bool {
        self.types.contains(PathType::FILE)
    }

    pub fn is_directory(&self) -> bool {
        self.types.contains(PathType::DIRECTORY)
    }

    pub fn is_volume(&self) -> bool {
        self.types.contains(PathType::VOLUME)
    }

    pub fn is_placeholder(&self) -> bool {
        self.types.contains(PathType::PLACEHOLDER)
    }

    pub fn kind(&self) -> EntryKind {
        if self.is_file() {
            EntryKind::File
        } else {
            EntryKind::Directory
        }
    }

    /// Parent directory, computed from the path string. `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        let index = self.absolute.rfind(DELIMITER).unwrap_or(0);
        if index == 0 {
            return Some(Path::root());
        }
        let parent = &self.absolute[..index];
        let types = if parent.rfind(DELIMITER) == Some(0) {
            PathType::DIRECTORY | PathType::VOLUME
        } else {
            PathType::DIRECTORY
        };
        Some(Path::new(parent, types))
    }

    /// True for a direct child of the root
    pub fn is_container(&self) -> bool {
        !self.is_root() && self.absolute.rfind(DELIMITER) == Some(0)
    }

    /// The container (bucket) this path lives in. `None` for the root.
    pub fn container(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }
        let name = self.absolute[1..]
            .split(DELIMITER)
            .next()
            .unwrap_or_default();
        Some(Path::new(name, PathType::DIRECTORY | PathType::VOLUME))
    }

    /// Key of this path below its container, without a leading delimiter.
    /// Empty for a container, `None` for the root.
    pub fn key(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        Some(
            self.absolute[1..]
                .split_once(DELIMITER)
                .map(|(_, key)| key)
                .unwrap_or_default(),
        )
    }

    /// True if `self` is `other` or lies below it
    pub fn is_child_of(&self, other: &Path) -> bool {
        if other.is_root() {
            return !self.is_root();
        }
        self.absolute
            .strip_prefix(other.absolute())
            .is_some_and(|rest| rest.starts_with(DELIMITER))
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
    }
}

impl Eq for Path {}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.absolute)
    }
}

/// Normalize a path string to an absolute path without trailing delimiter
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(DELIMITER) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("{DELIMITER}{}", segments.join("/"))
}
