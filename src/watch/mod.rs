// src/watch/mod.rs

//! File watching and change dispatch.
//!
//! Each watched unit gets its own filesystem subscription and a
//! [`WatchDispatcher`] that classifies changed paths by file type and runs
//! the minimal task subsequence for them. Completion of those subsequences
//! is coalesced into one debounced idle notification per quiet period.

pub mod cache;
pub mod classify;
pub mod dispatcher;
pub mod idle;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use classify::{subsequence_for, Classifier, FileClass, WatchAction};
pub use dispatcher::{start_watcher, DispatchOutcome, WatchDispatcher};
pub use idle::{IdleNotification, IdleNotifier};
pub use patterns::UnitWatchProfile;
pub use watcher::{subscribe, ChangeKind, WatchEvent, WatchSubscription};
