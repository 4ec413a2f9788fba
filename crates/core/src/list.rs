//! Directory listings
//!
//! An [`AttributedList`] holds the direct children of one directory in a
//! stable order, with hash indexes for point lookups.

use std::collections::HashMap;

use crate::path::{EntryKind, Path};

/// Ordered children of a directory
#[derive(Debug, Clone, Default)]
pub struct AttributedList {
    entries: Vec<Path>,
    by_kind: HashMap<(EntryKind, String), Vec<usize>>,
    by_path: HashMap<String, Vec<usize>>,
}

impl AttributedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries of the same name and kind are expected in
    /// newest-first order.
    pub fn push(&mut self, path: Path) {
        let index = self.entries.len();
        self.by_kind
            .entry((path.kind(), path.absolute().to_string()))
            .or_default()
            .push(index);
        self.by_path
            .entry(path.absolute().to_string())
            .or_default()
            .push(index);
        self.entries.push(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Path> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&Path> {
        self.entries.first()
    }

    /// Lookup by kind and absolute path, preferring the latest revision
    pub fn find_simple(&self, path: &Path) -> Option<&Path> {
        let candidates = self
            .by_kind
            .get(&(path.kind(), path.absolute().to_string()))?;
        candidates
            .iter()
            .map(|&i| &self.entries[i])
            .find(|p| !p.attributes().duplicate)
            .or_else(|| candidates.first().map(|&i| &self.entries[i]))
    }

    /// Lookup by kind and absolute path. When `path` carries a version id,
    /// only the entry with that exact version matches.
    pub fn get(&self, path: &Path) -> Option<&Path> {
        match &path.attributes().version_id {
            Some(version_id) => self
                .by_kind
                .get(&(path.kind(), path.absolute().to_string()))?
                .iter()
                .map(|&i| &self.entries[i])
                .find(|p| p.attributes().version_id.as_ref() == Some(version_id)),
            None => self.find_simple(path),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Lookup by absolute path only, ignoring type tags
    pub fn find_any(&self, absolute: &str) -> Option<&Path> {
        let candidates = self.by_path.get(absolute)?;
        candidates
            .iter()
            .map(|&i| &self.entries[i])
            .find(|p| !p.attributes().duplicate)
            .or_else(|| candidates.first().map(|&i| &self.entries[i]))
    }

    /// All revisions of a name and kind, newest first
    pub fn revisions(&self, path: &Path) -> Vec<&Path> {
        self.by_kind
            .get(&(path.kind(), path.absolute().to_string()))
            .map(|indexes| indexes.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    pub fn into_vec(self) -> Vec<Path> {
        self.entries
    }
}

impl FromIterator<Path> for AttributedList {
    fn from_iter<I: IntoIterator<Item = Path>>(iter: I) -> Self {
        let mut list = AttributedList::new();
        for path in iter {
            list.push(path);
        }
        list
    }
}

impl IntoIterator for AttributedList {
    type Item = Path;
    type IntoIter = std::vec::IntoIter<Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AttributedList {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Two listings are equal when they hold the same entries, ignoring order
impl PartialEq for AttributedList {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let key = |p: &Path| {
            (
                p.kind(),
                p.absolute().to_string(),
                p.attributes().version_id.clone(),
                p.types().bits(),
            )
        };
        let mut a: Vec<_> = self.iter().map(|p| (key(p), p.attributes().clone())).collect();
        let mut b: Vec<_> = other.iter().map(|p| (key(p), p.attributes().clone())).collect();
        a.sort_by(|x, y| x.0.cmp(&y.0));
        b.sort_by(|x, y| x.0.cmp(&y.0));
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{PathAttributes, PathType};

    fn bucket() -> Path {
        Path::new("/bucket", PathType::DIRECTORY | PathType::VOLUME)
    }

    #[test]
    fn test_file_and_directory_with_same_name() {
        let file = bucket().child("name", PathType::FILE);
        let folder = bucket().child("name", PathType::DIRECTORY);
        let list: AttributedList = vec![folder.clone(), file.clone()].into_iter().collect();

        assert_eq!(list.len(), 2);
        assert!(list.find_simple(&file).unwrap().is_file());
        assert!(list.find_simple(&folder).unwrap().is_directory());
        assert!(list.contains(&file));
        assert!(list.contains(&folder));
        assert!(list.find_any("/bucket/name").is_some());
    }

    #[test]
    fn test_get_by_version() {
        let latest = bucket()
            .child("f", PathType::FILE)
            .with_attributes(PathAttributes::new().with_version_id("v2").with_revision(1));
        let older = bucket().child("f", PathType::FILE).with_attributes(
            PathAttributes::new()
                .with_version_id("v1")
                .with_revision(2)
                .with_duplicate(true),
        );
        let list: AttributedList = vec![latest, older].into_iter().collect();

        let probe = bucket()
            .child("f", PathType::FILE)
            .with_attributes(PathAttributes::new().with_version_id("v1"));
        assert_eq!(list.get(&probe).unwrap().attributes().revision, Some(2));

        let probe = bucket().child("f", PathType::FILE);
        assert_eq!(list.get(&probe).unwrap().attributes().revision, Some(1));

        let probe = bucket()
            .child("f", PathType::FILE)
            .with_attributes(PathAttributes::new().with_version_id("v3"));
        assert!(!list.contains(&probe));
        assert_eq!(list.revisions(&probe).len(), 2);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = bucket().child("a", PathType::FILE);
        let b = bucket().child("b", PathType::DIRECTORY);
        let one: AttributedList = vec![a.clone(), b.clone()].into_iter().collect();
        let two: AttributedList = vec![b, a].into_iter().collect();
        assert_eq!(one, two);
        assert_ne!(one, AttributedList::new());
    }

    #[test]
    fn test_missing_lookup() {
        let list = AttributedList::new();
        assert!(list.is_empty());
        assert!(list.find_simple(&bucket()).is_none());
        assert!(list.find_any("/bucket").is_none());
    }
}
