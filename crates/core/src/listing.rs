//! Reconciliation of flat object keys into a directory listing
//!
//! Object stores return keys below a prefix. [`ListingBuilder`] folds
//! those keys, page by page, into the direct children of one directory:
//! deeper keys collapse into one directory entry per first segment,
//! marker objects make a directory explicit, and multiple revisions of a
//! name are numbered newest first with older ones flagged as duplicates.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use jiff::Timestamp;

use crate::checksum::Checksum;
use crate::list::AttributedList;
use crate::path::{DELIMITER, Path, PathAttributes, PathType};

/// What a listed object represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Uploaded content
    File,
    /// Common prefix reported by the backend for a delimiter listing
    Folder,
    /// Marker hiding every older revision of the name
    Hidden,
    /// Upload that was started but never finished
    Incomplete,
}

/// One object (or revision of an object) as returned by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Key relative to the container
    pub key: String,
    pub kind: ObjectKind,
    pub version_id: Option<String>,
    pub size: u64,
    pub modified: Option<Timestamp>,
    pub checksum: Option<Checksum>,
}

impl RemoteObject {
    pub fn file(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            kind: ObjectKind::File,
            version_id: None,
            size,
            modified: None,
            checksum: None,
        }
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn with_modified(mut self, modified: Timestamp) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }
}

/// Orders revisions of the same key, newest first
pub trait RevisionOrdering: Send + Sync {
    /// `Ordering::Less` when `a` is newer than `b`
    fn compare(&self, a: &RemoteObject, b: &RemoteObject) -> Ordering;
}

/// Newest modification time first, ties broken by descending version id
#[derive(Debug, Clone, Copy, Default)]
pub struct NewestFirst;

impl RevisionOrdering for NewestFirst {
    fn compare(&self, a: &RemoteObject, b: &RemoteObject) -> Ordering {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.version_id.cmp(&a.version_id))
    }
}

/// Accumulates objects for one directory and builds its listing
pub struct ListingBuilder<'a> {
    directory: &'a Path,
    prefix: String,
    marker: Option<&'a str>,
    ordering: &'a dyn RevisionOrdering,
    files: BTreeMap<String, Vec<RemoteObject>>,
    /// Subdirectory name to whether a marker object was seen for it
    directories: BTreeMap<String, bool>,
    seen: usize,
}

impl<'a> ListingBuilder<'a> {
    /// `prefix` is the key prefix of `directory` inside its container
    /// (empty for the container itself, otherwise ending in a delimiter).
    /// `marker` is the name of directory marker objects, if the backend
    /// uses one besides trailing-delimiter keys.
    pub fn new(
        directory: &'a Path,
        prefix: impl Into<String>,
        marker: Option<&'a str>,
        ordering: &'a dyn RevisionOrdering,
    ) -> Self {
        Self {
            directory,
            prefix: prefix.into(),
            marker,
            ordering,
            files: BTreeMap::new(),
            directories: BTreeMap::new(),
            seen: 0,
        }
    }

    /// Number of objects consumed so far
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Number of distinct entries the listing currently holds
    pub fn len(&self) -> usize {
        self.directories.len()
            + self
                .files
                .values()
                .map(|revisions| {
                    revisions
                        .iter()
                        .filter(|o| o.kind == ObjectKind::File)
                        .count()
                })
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_marker(&self, name: &str) -> bool {
        name.is_empty() || self.marker == Some(name)
    }

    /// Fold one object into the listing
    pub fn add(&mut self, object: RemoteObject) {
        self.seen += 1;
        let Some(remainder) = object.key.strip_prefix(self.prefix.as_str()) else {
            tracing::debug!(key = %object.key, prefix = %self.prefix, "Skipping key outside prefix");
            return;
        };
        if remainder.is_empty() || object.kind == ObjectKind::Incomplete {
            return;
        }
        match remainder.split_once(DELIMITER) {
            Some((name, rest)) => {
                if name.is_empty() {
                    return;
                }
                let explicit = object.kind != ObjectKind::Folder && self.is_marker(rest);
                let entry = self.directories.entry(name.to_string()).or_insert(false);
                *entry |= explicit;
            }
            None => {
                if object.kind == ObjectKind::Folder {
                    self.directories.entry(remainder.to_string()).or_insert(false);
                } else if !self.is_marker(remainder) {
                    self.files
                        .entry(remainder.to_string())
                        .or_default()
                        .push(object);
                }
            }
        }
    }

    /// Build the listing: directories and files interleaved by name, a
    /// directory before a file of the same name, revisions newest first.
    pub fn build(self) -> AttributedList {
        let mut list = AttributedList::new();
        let mut directories = self.directories.into_iter().peekable();
        let mut files = self.files.into_iter().peekable();
        loop {
            let take_directory = match (directories.peek(), files.peek()) {
                (Some((d, _)), Some((f, _))) => d <= f,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if take_directory {
                if let Some((name, explicit)) = directories.next() {
                    let types = if explicit {
                        PathType::DIRECTORY
                    } else {
                        PathType::DIRECTORY | PathType::PLACEHOLDER
                    };
                    list.push(self.directory.child(&name, types));
                }
            } else if let Some((name, mut revisions)) = files.next() {
                revisions.sort_by(|a, b| self.ordering.compare(a, b));
                let mut hidden = false;
                let mut revision = 0;
                for object in revisions {
                    match object.kind {
                        ObjectKind::Hidden => {
                            if revision == 0 {
                                hidden = true;
                            }
                        }
                        ObjectKind::File => {
                            revision += 1;
                            let mut attributes = PathAttributes::new()
                                .with_size(object.size)
                                .with_revision(revision)
                                .with_duplicate(hidden || revision > 1);
                            attributes.modified = object.modified;
                            attributes.version_id = object.version_id;
                            attributes.checksum = object.checksum;
                            list.push(
                                self.directory
                                    .child(&name, PathType::FILE)
                                    .with_attributes(attributes),
                            );
                        }
                        ObjectKind::Folder | ObjectKind::Incomplete => {}
                    }
                }
            }
        }
        list
    }
}
