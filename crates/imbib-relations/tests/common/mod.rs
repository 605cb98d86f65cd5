//! Shared helpers for integration tests

#[allow(dead_code)]
pub mod fetchers;

use std::time::Duration;

use imbib_relations::{Entry, StateChange};
use tokio::sync::broadcast;

/// Build an entry with an optional DOI
pub fn entry(cite_key: &str, doi: Option<&str>) -> Entry {
    let mut entry = Entry::new(
        cite_key.to_string(),
        "article".to_string(),
        format!("Title of {}", cite_key),
    );
    entry.doi = doi.map(str::to_string);
    entry
}

/// Wait for the next published state change
#[allow(dead_code)]
pub async fn next_change(rx: &mut broadcast::Receiver<StateChange>) -> StateChange {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a state change")
        .expect("state channel closed")
}

/// Let spawned tasks run until they block
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
