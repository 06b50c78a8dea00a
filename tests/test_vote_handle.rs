use numtag::config::VoteConfig;
use numtag::{ConfirmerHandle, VoteConfirmer};
use std::time::{Duration, Instant};

fn handle() -> ConfirmerHandle {
    let confirmer = VoteConfirmer::new(&VoteConfig {
        window_size: 3,
        threshold: 0.6,
        debounce_secs: 1.0,
    })
    .unwrap();
    ConfirmerHandle::spawn(confirmer)
}

#[tokio::test]
async fn test_handle_confirms_in_arrival_order() {
    let handle = handle();
    let start = Instant::now();

    for i in 0..2 {
        let decision = handle
            .observe(Some("005".to_string()), 0.9, start + Duration::from_millis(i * 10))
            .await
            .unwrap();
        assert!(!decision.is_confirmed());
    }

    let decision = handle
        .observe(Some("005".to_string()), 0.9, start + Duration::from_millis(20))
        .await
        .unwrap();
    let confirmed = decision.confirmed().unwrap();
    assert_eq!(confirmed.code, "005");
    assert_eq!(confirmed.votes, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handle_serves_many_producers() {
    let handle = handle();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..6u64 {
        let producer = handle.clone();
        tasks.push(tokio::spawn(async move {
            producer
                .observe(Some("010".to_string()), 0.8, start + Duration::from_millis(i))
                .await
        }));
    }

    let mut confirmations = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_confirmed() {
            confirmations += 1;
        }
    }
    // The window fills once, later qualifying windows fall inside the debounce
    assert_eq!(confirmations, 1);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.occupancy, 3);
    assert_eq!(stats.last_confirmed.as_deref(), Some("010"));
}

#[tokio::test]
async fn test_handle_reset() {
    let handle = handle();
    handle.observe(Some("001".to_string()), 0.9, Instant::now()).await.unwrap();

    handle.reset().await.unwrap();

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.occupancy, 0);
    assert!(stats.tally.is_empty());
}
