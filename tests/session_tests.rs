// Last-request-wins: only the newest fetch's result is applied

use probechart::session::LatestRequest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

#[test]
fn tickets_go_stale_when_a_newer_request_begins() {
    let session = LatestRequest::new();
    let first = session.begin();
    assert!(first.is_current());
    let second = session.begin();
    assert!(!first.is_current());
    assert!(second.is_current());
    assert!(second.id() > first.id());
    assert_eq!(session.current_id(), second.id());

    session.cancel();
    assert!(!second.is_current());
}

#[tokio::test]
async fn newer_request_aborts_the_one_in_flight() {
    let session = LatestRequest::new();
    let finished = Arc::new(AtomicBool::new(false));

    let flag = finished.clone();
    let slow = session.spawn(async move {
        sleep(Duration::from_secs(5)).await;
        flag.store(true, Ordering::SeqCst);
        "slow"
    });
    let fast = session.spawn(async { "fast" });

    assert_eq!(fast.await.unwrap(), Some("fast"));
    let err = slow.await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn result_landing_after_supersession_is_discarded() {
    let session = LatestRequest::new();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let stale = session.spawn(async move {
        let _ = release_rx.await;
        1
    });
    // Superseded by ticket only; the task itself keeps running.
    let newer = session.begin();
    let _ = release_tx.send(());

    assert_eq!(stale.await.unwrap(), None);
    assert!(newer.is_current());
}

#[tokio::test]
async fn single_request_is_applied() {
    let session = LatestRequest::new();
    let handle = session.spawn(async { vec![1, 2, 3] });
    assert_eq!(handle.await.unwrap(), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn cancel_aborts_in_flight_request() {
    let session = LatestRequest::new();
    let handle = session.spawn(async {
        sleep(Duration::from_secs(5)).await;
    });
    session.cancel();
    assert!(handle.await.unwrap_err().is_cancelled());
}
