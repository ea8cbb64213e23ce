//! Runtime-agnosticism check: every `Channel` operation returns a plain
//! `Future` with no executor baked in, so it must drive to completion under
//! any executor a caller picks — not just `futures::executor::block_on`,
//! which the rest of the test suite favors. This exercises the same
//! channels under `tokio`'s multi-threaded runtime instead, including a
//! deadline firing through `tokio::time` rather than this crate's own timer
//! thread racing it.

use std::sync::Arc;
use std::time::Duration;

use rendezvous::{Channel, ChannelConfig, ChannelError};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn channel_rendezvous_under_tokio() {
    let ch = Channel::<i32>::new(ChannelConfig::new(0));
    let writer = ch.clone();
    let handle = tokio::spawn(async move { writer.write(99).await });

    assert_eq!(ch.read().await.unwrap(), 99);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn deadline_fires_while_polled_from_tokio() {
    let ch = Channel::<i32>::new(ChannelConfig::new(0));
    let deadline = std::time::Instant::now() + Duration::from_millis(30);
    let err = ch.read_opts(None, Some(deadline), None).await.unwrap_err();
    assert!(matches!(err, ChannelError::Timeout));
}

#[tokio::test]
async fn many_tokio_tasks_share_one_channel() {
    let ch = Channel::<usize>::new(ChannelConfig::new(0));
    let mut handles = Vec::new();
    for id in 0..8 {
        let writer: Arc<Channel<usize>> = ch.clone();
        handles.push(tokio::spawn(async move { writer.write(id).await }));
    }

    let mut seen = std::collections::HashSet::new();
    for _ in 0..8 {
        seen.insert(ch.read().await.unwrap());
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(seen.len(), 8);
}
