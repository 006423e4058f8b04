mod common;
use crate::common::init_tracing;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use unitdag::watch::IdleNotifier;

const DELAY: Duration = Duration::from_millis(1000);

#[tokio::test(start_paused = true)]
async fn only_the_latest_schedule_fires() {
    init_tracing();
    let notifier = Arc::new(IdleNotifier::new(DELAY));
    let mut rx = notifier.subscribe();

    let first = notifier.schedule();
    sleep(DELAY / 2).await;
    let second = notifier.schedule();
    sleep(DELAY * 3).await;

    assert!(second > first);
    assert_eq!(notifier.fired(), 1);
    assert_eq!(rx.recv().await.map(|n| n.generation), Some(second));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn three_concurrent_subsequences_fire_once_after_the_last_finishes() {
    let notifier = Arc::new(IdleNotifier::new(DELAY));
    let mut rx = notifier.subscribe();

    for _ in 0..3 {
        notifier.begin();
    }
    assert_eq!(notifier.pending(), 3);

    notifier.finish();
    sleep(DELAY * 2).await;
    notifier.finish();
    sleep(DELAY * 2).await;
    assert_eq!(notifier.fired(), 0);

    notifier.finish();
    assert_eq!(notifier.pending(), 0);
    sleep(DELAY * 2).await;

    assert_eq!(notifier.fired(), 1);
    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn new_work_before_the_delay_cancels_the_pending_notification() {
    let notifier = Arc::new(IdleNotifier::new(DELAY));

    notifier.begin();
    notifier.finish();
    sleep(DELAY / 2).await;

    notifier.begin();
    sleep(DELAY * 2).await;
    assert_eq!(notifier.fired(), 0);

    notifier.finish();
    sleep(DELAY * 2).await;
    assert_eq!(notifier.fired(), 1);
}

#[tokio::test(start_paused = true)]
async fn nothing_fires_before_the_quiet_period_elapses() {
    let notifier = Arc::new(IdleNotifier::new(DELAY));

    notifier.begin();
    notifier.finish();
    sleep(DELAY - Duration::from_millis(1)).await;
    assert_eq!(notifier.fired(), 0);

    sleep(Duration::from_millis(2)).await;
    assert_eq!(notifier.fired(), 1);
}

#[tokio::test]
async fn unbalanced_finish_is_ignored() {
    let notifier = Arc::new(IdleNotifier::new(DELAY));

    notifier.finish();

    assert_eq!(notifier.pending(), 0);
    assert_eq!(notifier.fired(), 0);
}
