//! Per-chat critical section for panel mutations.
//!
//! Callback handling holds the chat's lock across "apply transition,
//! run store mutation, update panel state" so rapid taps from the same
//! chat serialize. The lock is released before any Telegram I/O and is
//! never held across downloads, so chats stay independent.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct ChatGate {
    locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl ChatGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the chat's lock. The guard is owned so it can be held
    /// across awaits and dropped explicitly before transport calls.
    pub async fn acquire(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(chat_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_chat_serializes() {
        let gate = ChatGate::new();
        let counter = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let _guard = gate.acquire(42).await;
                let before = counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                // No other task entered the section while we were inside.
                assert_eq!(counter.load(Ordering::SeqCst), before + 1);
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked");
        }
    }

    #[tokio::test]
    async fn test_different_chats_independent() {
        let gate = ChatGate::new();
        let guard_a = gate.acquire(1).await;
        // A second chat must not block behind the first.
        let guard_b = gate.acquire(2).await;
        drop(guard_a);
        drop(guard_b);
    }
}
