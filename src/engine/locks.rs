use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::types::UserId;

type LockMap = Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>;

/// One async mutex per user. Engine operations for the same user run one at
/// a time; different users never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    inner: LockMap,
}

/// Holds a user's lock. Dropping it releases the lock and forgets the user
/// once nobody else is holding or waiting for it.
#[derive(Debug)]
pub struct UserGuard {
    guard: Option<OwnedMutexGuard<()>>,
    user: UserId,
    locks: LockMap,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user: UserId) -> UserGuard {
        // Clones are only taken under the map lock, which keeps the strong
        // count check in `UserGuard::drop` exact.
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(user).or_default().clone()
        };
        UserGuard {
            guard: Some(lock.lock_owned().await),
            user,
            locks: self.inner.clone(),
        }
    }

    /// Users with a lock entry.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if map.get(&self.user).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(&self.user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = UserLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _alice = locks.acquire(1).await;
        let bob = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(bob.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let locks = UserLocks::new();
        for user in 0..50 {
            let _guard = locks.acquire(user).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_lock_is_kept_while_someone_waits() {
        let locks = UserLocks::new();
        let first = locks.acquire(7).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(7).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.tracked(), 1);
        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
