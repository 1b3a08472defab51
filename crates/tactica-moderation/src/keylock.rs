//! Per-puzzle async guards for modification writes.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key, created on demand.
///
/// Entries nobody holds or waits on are pruned on the next `lock` call, so
/// the map stays about as large as the number of in-flight keys.
#[derive(Default)]
pub(crate) struct KeyLocks {
  locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
  pub(crate) async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
    let slot = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      locks.retain(|k, m| k == key || Arc::strong_count(m) > 1);
      Arc::clone(locks.entry(key.to_owned()).or_default())
    };
    slot.lock_owned().await
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn same_key_is_exclusive() {
    let locks = KeyLocks::default();
    let held = locks.lock("a").await;

    let second = tokio::time::timeout(Duration::from_millis(20), locks.lock("a")).await;
    assert!(second.is_err());

    drop(held);
    let _again = locks.lock("a").await;
  }

  #[tokio::test]
  async fn other_keys_do_not_wait() {
    let locks = KeyLocks::default();
    let _a = locks.lock("a").await;
    let b = tokio::time::timeout(Duration::from_millis(20), locks.lock("b")).await;
    assert!(b.is_ok());
  }

  #[tokio::test]
  async fn released_keys_are_pruned() {
    let locks = KeyLocks::default();
    drop(locks.lock("a").await);
    drop(locks.lock("b").await);
    let _c = locks.lock("c").await;
    assert_eq!(locks.len(), 1);
  }
}
