// src/watch/idle.rs

//! Debounced "everything is idle" notification.
//!
//! Every dispatched subsequence calls [`IdleNotifier::begin`] and, once it
//! completes, [`IdleNotifier::finish`]. When the pending count drops to zero
//! a timer is scheduled; each scheduling (and each `begin`) bumps a
//! generation token, and a timer only fires if its token is still the
//! latest when it wakes.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleNotification {
    /// Token of the timer that fired.
    pub generation: u64,
}

#[derive(Debug)]
pub struct IdleNotifier {
    delay: Duration,
    pending: AtomicUsize,
    generation: AtomicU64,
    fired: AtomicUsize,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<IdleNotification>>>,
}

impl IdleNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            fired: AtomicUsize::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// A subsequence was dispatched. Invalidates any scheduled timer.
    pub fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// A subsequence completed (successfully or not).
    pub fn finish(self: &Arc<Self>) {
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match previous {
            Ok(1) => {
                self.schedule();
            }
            Ok(_) => {}
            Err(_) => warn!("idle notifier finished more subsequences than it began"),
        }
    }

    /// Schedule a notification after the quiet period. Returns its token.
    pub fn schedule(self: &Arc<Self>) -> u64 {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.delay).await;
            this.fire_if_current(token);
        });
        token
    }

    fn fire_if_current(&self, token: u64) -> bool {
        if self.generation.load(Ordering::SeqCst) != token {
            debug!(token, "idle timer superseded");
            return false;
        }
        if self.pending.load(Ordering::SeqCst) != 0 {
            debug!(token, "work still pending; idle timer dropped");
            return false;
        }

        self.fired.fetch_add(1, Ordering::SeqCst);
        info!("all tasks idle; watching for changes");

        let notification = IdleNotification { generation: token };
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(notification).is_ok());
        true
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<IdleNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Subsequences dispatched but not finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of notifications fired so far.
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}
