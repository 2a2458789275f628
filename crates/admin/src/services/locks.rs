//! Per shop and section save serialization.
//!
//! Two admin tabs saving the same section would otherwise interleave their
//! read-merge-write and sync steps. Saves for one `(shop, section)` pair take
//! an async mutex for their whole duration; different pairs never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use smartcartify_core::Section;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

type LockMap = HashMap<(String, Section), Arc<tokio::sync::Mutex<()>>>;

/// Registry of save locks, cheap to clone.
#[derive(Clone, Default)]
pub struct SaveLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl SaveLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `section` of `shop`.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn acquire(&self, shop: &str, section: Section) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry((shop.to_string(), section))
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        debug!(shop = %shop, section = %section, "Waiting for save lock");
        lock.lock_owned().await
    }

    /// Number of tracked lock entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_section_is_serialized() {
        let locks = SaveLocks::new();
        let guard = locks.acquire("a.myshopify.com", Section::Discount).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("a.myshopify.com", Section::Discount).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter acquires after release")
            .expect("task completes");
    }

    #[tokio::test]
    async fn test_other_sections_do_not_contend() {
        let locks = SaveLocks::new();
        let _discounts = locks.acquire("a.myshopify.com", Section::Discount).await;

        let other = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire("a.myshopify.com", Section::Bxgy),
        )
        .await;
        assert!(other.is_ok());

        let other_shop = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire("b.myshopify.com", Section::Discount),
        )
        .await;
        assert!(other_shop.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = SaveLocks::new();
        drop(locks.acquire("a.myshopify.com", Section::Shipping).await);
        drop(locks.acquire("b.myshopify.com", Section::Shipping).await);
        // The second acquire pruned the first entry; only its own remains
        assert_eq!(locks.len(), 1);
    }
}
