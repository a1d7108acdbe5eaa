//! Per-entity serialization points
//!
//! Limit checks read a count and then write. Holding the owning entity's
//! stripe across both steps keeps concurrent writers for the same entity from
//! overshooting a cap. Unrelated entities usually land on different stripes.
//!
//! Operations spanning two entities take both stripes through
//! [`EntityLocks::lock_pair`], which acquires them in stripe order. A caller
//! holds either one guard from [`EntityLocks::lock`] or one pair, never more.

use std::hash::Hash;

use ahash::RandomState;
use tokio::sync::{Mutex, MutexGuard};

const DEFAULT_STRIPES: usize = 64;

#[derive(Debug)]
pub struct EntityLocks {
    stripes: Vec<Mutex<()>>,
    hasher: RandomState,
}

impl EntityLocks {
    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn stripe_of<K: Hash>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.stripes.len() as u64) as usize
    }

    /// Wait for exclusive access to `key`'s stripe
    pub async fn lock<K: Hash>(&self, key: &K) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(key)].lock().await
    }

    /// Wait for exclusive access to the stripes of both `a` and `b`
    ///
    /// Stripes are taken in index order; keys sharing a stripe take it once.
    pub async fn lock_pair<K: Hash>(&self, a: &K, b: &K) -> PairGuard<'_> {
        let (first, second) = {
            let (x, y) = (self.stripe_of(a), self.stripe_of(b));
            (x.min(y), x.max(y))
        };
        let first_guard = self.stripes[first].lock().await;
        let second_guard = if second != first {
            Some(self.stripes[second].lock().await)
        } else {
            None
        };
        PairGuard {
            _first: first_guard,
            _second: second_guard,
        }
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }
}

/// Held stripes of a two-entity operation; released on drop
#[derive(Debug)]
pub struct PairGuard<'a> {
    _first: MutexGuard<'a, ()>,
    _second: Option<MutexGuard<'a, ()>>,
}

impl Default for EntityLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_zero_stripes_rounds_up() {
        assert_eq!(EntityLocks::new(0).stripe_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(EntityLocks::new(8));
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&"same-entity").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pair_on_one_stripe_does_not_self_deadlock() {
        let locks = EntityLocks::new(1);
        let guard = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            locks.lock_pair(&"left", &"right"),
        )
        .await;
        assert!(guard.is_ok());
    }

    #[tokio::test]
    async fn test_pair_excludes_single_lock_on_either_key() {
        let locks = EntityLocks::new(16);
        let pair = locks.lock_pair(&"a", &"b").await;
        for key in ["a", "b"] {
            let blocked =
                tokio::time::timeout(std::time::Duration::from_millis(20), locks.lock(&key)).await;
            assert!(blocked.is_err());
        }
        drop(pair);
        let _a = locks.lock(&"a").await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_pairs_do_not_deadlock() {
        let locks = Arc::new(EntityLocks::new(4));
        let mut handles = Vec::new();
        for i in 0..64 {
            let locks = Arc::clone(&locks);
            handles.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { ("x", "y") } else { ("y", "x") };
                let _pair = locks.lock_pair(&a, &b).await;
                tokio::task::yield_now().await;
            }));
        }
        let all = async {
            for handle in handles {
                handle.await.unwrap();
            }
        };
        assert!(tokio::time::timeout(std::time::Duration::from_secs(5), all).await.is_ok());
    }
}
