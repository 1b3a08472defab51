//! The blocked-id cache shared between the moderation coordinator and the
//! sampling engine.

use std::{
  collections::HashSet,
  sync::{Arc, PoisonError, RwLock},
};

/// In-memory set of puzzle ids excluded from sampling.
///
/// A cheap, cloneable handle. The moderation coordinator owns the writes;
/// query callers only read. Reads never touch the durable store.
#[derive(Debug, Clone, Default)]
pub struct BlockedCache {
  inner: Arc<RwLock<HashSet<String>>>,
}

impl BlockedCache {
  pub fn new() -> Self { Self::default() }

  pub fn contains(&self, puzzle_id: &str) -> bool {
    self.read(|set| set.contains(puzzle_id))
  }

  pub fn len(&self) -> usize { self.read(HashSet::len) }

  pub fn is_empty(&self) -> bool { self.read(HashSet::is_empty) }

  /// Sorted copy of the current contents.
  pub fn ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.read(|set| set.iter().cloned().collect());
    ids.sort();
    ids
  }

  /// Drop every blocked id from `ids`, holding the read lock once.
  pub fn retain_unblocked<T: AsRef<str>>(&self, ids: &mut Vec<T>) {
    self.read(|set| {
      if !set.is_empty() {
        ids.retain(|id| !set.contains(id.as_ref()));
      }
    })
  }

  pub fn insert(&self, puzzle_id: impl Into<String>) {
    self.write(|set| {
      set.insert(puzzle_id.into());
    })
  }

  pub fn remove(&self, puzzle_id: &str) {
    self.write(|set| {
      set.remove(puzzle_id);
    })
  }

  /// Replace the whole contents, e.g. after a rebuild from the durable store.
  pub fn replace(&self, ids: impl IntoIterator<Item = String>) {
    let fresh: HashSet<String> = ids.into_iter().collect();
    self.write(|set| *set = fresh)
  }

  pub fn clear(&self) { self.write(HashSet::clear) }

  fn read<R>(&self, f: impl FnOnce(&HashSet<String>) -> R) -> R {
    let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
  }

  fn write<R>(&self, f: impl FnOnce(&mut HashSet<String>) -> R) -> R {
    let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_state() {
    let cache = BlockedCache::new();
    let reader = cache.clone();

    cache.insert("a");
    assert!(reader.contains("a"));

    cache.remove("a");
    assert!(reader.is_empty());
  }

  #[test]
  fn replace_and_retain() {
    let cache = BlockedCache::new();
    cache.insert("stale");
    cache.replace(["b".to_string(), "c".to_string()]);
    assert_eq!(cache.ids(), ["b", "c"]);

    let mut ids = vec!["a", "b", "c", "d"];
    cache.retain_unblocked(&mut ids);
    assert_eq!(ids, ["a", "d"]);
  }
}
