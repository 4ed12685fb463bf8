//! Query cache keyed by read, invalidated by tag.
//!
//! Each cached read registers the tags it depends on. Mutations invalidate
//! tags, and the tag index maps a tag straight to the affected keys, so
//! invalidation cost is proportional to what it touches. Invalidated
//! entries are kept but marked stale; the next read refetches them.

use ea_core::{ArchitecturalModel, ArchitecturalObject, ModelId};
use smallvec::{SmallVec, smallvec};
use std::collections::{HashMap, HashSet};

/// One cacheable read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Models,
    Model(ModelId),
    Objects(ModelId),
}

/// Dependency label of a cached read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Models,
    ModelObjects(ModelId),
    /// Every model-object list at once.
    AllModelObjects,
}

impl QueryKey {
    pub fn tags(&self) -> SmallVec<[Tag; 2]> {
        match self {
            Self::Models | Self::Model(_) => smallvec![Tag::Models],
            Self::Objects(model) => smallvec![Tag::ModelObjects(*model), Tag::AllModelObjects],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Models(Vec<ArchitecturalModel>),
    Model(ArchitecturalModel),
    Objects(Vec<ArchitecturalObject>),
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    stale: bool,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, Entry>,
    tag_index: HashMap<Tag, HashSet<QueryKey>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: QueryKey, value: CachedValue) {
        for tag in key.tags() {
            self.tag_index.entry(tag).or_default().insert(key);
        }
        self.entries.insert(key, Entry { value, stale: false });
    }

    /// Value for `key` unless missing or stale.
    pub fn fresh(&self, key: &QueryKey) -> Option<&CachedValue> {
        self.entries
            .get(key)
            .filter(|e| !e.stale)
            .map(|e| &e.value)
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.stale)
    }

    /// Last value for `key`, stale or not.
    pub fn peek(&self, key: &QueryKey) -> Option<&CachedValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Mark every entry carrying `tag` stale. Returns how many were fresh.
    pub fn invalidate(&mut self, tag: Tag) -> usize {
        let Some(keys) = self.tag_index.get(&tag) else {
            return 0;
        };
        let mut marked = 0;
        for key in keys {
            if let Some(entry) = self.entries.get_mut(key)
                && !entry.stale
            {
                entry.stale = true;
                marked += 1;
            }
        }
        log::debug!("invalidated {tag:?}: {marked} entr{}", if marked == 1 { "y" } else { "ies" });
        marked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
