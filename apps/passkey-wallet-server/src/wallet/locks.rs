// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-credential resolution locks.
//!
//! Deploys for the same credential id run one at a time; different
//! credentials never contend. Entries are held weakly and pruned once no
//! caller holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ResolutionLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl ResolutionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `credential_id`.
    pub async fn acquire(&self, credential_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(credential_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(credential_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of credentials with a live lock.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_credential_is_serialized() {
        let locks = Arc::new(ResolutionLocks::new());
        let guard = locks.acquire("cred-1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("cred-1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_credentials_do_not_contend() {
        let locks = ResolutionLocks::new();
        let _a = locks.acquire("cred-1").await;
        let _b = locks.acquire("cred-2").await;
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let locks = ResolutionLocks::new();
        drop(locks.acquire("cred-1").await);
        assert_eq!(locks.active(), 0);
    }
}
