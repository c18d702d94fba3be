// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user serialization of message-processing runs.
//!
//! Runs for the same user queue on one async mutex; runs for different
//! users never contend. Entries are dropped once no run holds or awaits them.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gulabo_core::types::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

struct Slot {
    mutex: Arc<Mutex<()>>,
    /// Runs holding or awaiting `mutex`.
    holders: usize,
}

type SlotMap = Arc<DashMap<UserId, Slot>>;

/// Counts one run against its user's slot until dropped, including a run
/// whose wait for the mutex is abandoned.
struct Registration {
    user: UserId,
    locks: SlotMap,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Entry::Occupied(mut slot) = self.locks.entry(self.user) {
            slot.get_mut().holders -= 1;
            if slot.get().holders == 0 {
                slot.remove();
            }
        }
    }
}

/// Held for the duration of one run.
pub struct UserGuard {
    // Fields drop in order: the mutex is released before the slot count.
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

#[derive(Clone, Default)]
pub struct UserLocks {
    locks: SlotMap,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other run for `user` is in progress.
    ///
    /// Cancel safe: dropping the returned future mid-wait releases the
    /// user's slot.
    pub async fn lock(&self, user: UserId) -> UserGuard {
        let mutex = {
            let mut slot = self.locks.entry(user).or_insert_with(|| Slot {
                mutex: Arc::new(Mutex::new(())),
                holders: 0,
            });
            slot.holders += 1;
            slot.mutex.clone()
        };
        let registration = Registration {
            user,
            locks: self.locks.clone(),
        };
        let guard = mutex.lock_owned().await;
        UserGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of users with a run in progress or queued.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn same_user_runs_are_serialized() {
        let locks = UserLocks::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(UserId(1)).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn different_users_overlap() {
        let locks = UserLocks::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for user in 0..4 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(UserId(user)).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 4);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_releases_the_slot() {
        let locks = UserLocks::new();
        let holder = locks.lock(UserId(1)).await;

        let waited = tokio::time::timeout(Duration::from_millis(10), locks.lock(UserId(1))).await;
        assert!(waited.is_err());
        assert_eq!(locks.active(), 1);

        drop(holder);
        assert_eq!(locks.active(), 0);

        // The user can still be locked afterwards.
        let _again = locks.lock(UserId(1)).await;
        assert_eq!(locks.active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_waiter_task_releases_the_slot() {
        let locks = UserLocks::new();
        let holder = locks.lock(UserId(2)).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(UserId(2)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        drop(holder);
        assert_eq!(locks.active(), 0);
    }
}
