//! The set of classes removed during one archive run.

use std::collections::{hash_set, HashSet};

/// Binary names of classes found to have no public API
///
/// One set is created per archive run and handed to every filter of that run. Cross-reference
/// tables (`NestMembers`, `PermittedSubclasses`, `InnerClasses`) and the nested class list of the
/// Kotlin metadata are filtered against it. Names are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedClassNames {
    names: HashSet<String>,
}

impl DeletedClassNames {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` as deleted; returns `true` if it was not recorded before
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Returns `true` if `name` was deleted
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of deleted classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing was deleted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates the deleted names in no particular order
    pub fn iter(&self) -> hash_set::Iter<'_, String> {
        self.names.iter()
    }

    /// The deleted names in ascending order
    #[must_use]
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<'a> IntoIterator for &'a DeletedClassNames {
    type Item = &'a String;
    type IntoIter = hash_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
