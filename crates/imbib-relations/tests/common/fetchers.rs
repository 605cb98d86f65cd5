//! Scripted `RelationFetcher` doubles

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use imbib_relations::{Doi, Entry, FetchError, RelationFetcher, RelationKind};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

struct Scripted {
    result: Result<Vec<Entry>, FetchError>,
    gate: Option<oneshot::Receiver<()>>,
    honors_cancel: bool,
    panic_message: Option<&'static str>,
}

/// Answers each call with the next scripted response.
///
/// Gated responses block until their sender fires (or is dropped). Calls
/// beyond the script return an empty success.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Scripted>>,
    tokens: Mutex<Vec<CancellationToken>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancelled: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond immediately
    pub fn push_ready(&self, result: Result<Vec<Entry>, FetchError>) {
        self.push(result, None, true);
    }

    /// Respond when the returned sender fires; returns early on cancellation
    pub fn push_gated(&self, result: Result<Vec<Entry>, FetchError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(result, Some(rx), true);
        tx
    }

    /// Panic inside the fetch instead of returning
    pub fn push_panic(&self, message: &'static str) {
        self.script.lock().unwrap().push_back(Scripted {
            result: Ok(Vec::new()),
            gate: None,
            honors_cancel: true,
            panic_message: Some(message),
        });
    }

    /// Respond when the returned sender fires, ignoring cancellation
    pub fn push_stubborn(&self, result: Result<Vec<Entry>, FetchError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(result, Some(rx), false);
        tx
    }

    fn push(
        &self,
        result: Result<Vec<Entry>, FetchError>,
        gate: Option<oneshot::Receiver<()>>,
        honors_cancel: bool,
    ) {
        self.script.lock().unwrap().push_back(Scripted {
            result,
            gate,
            honors_cancel,
            panic_message: None,
        });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Calls that ended by observing their token
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Token handed to the n-th call
    pub fn token(&self, call: usize) -> CancellationToken {
        self.tokens.lock().unwrap()[call].clone()
    }
}

#[async_trait]
impl RelationFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        _doi: &Doi,
        _kind: RelationKind,
        cancel: CancellationToken,
    ) -> Result<Vec<Entry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(cancel.clone());

        let next = self.script.lock().unwrap().pop_front();
        if let Some(message) = next.as_ref().and_then(|s| s.panic_message) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("{}", message);
        }
        let outcome = match next {
            None => Ok(Vec::new()),
            Some(Scripted {
                result,
                gate: None,
                ..
            }) => {
                if cancel.is_cancelled() {
                    Err(FetchError::Cancelled)
                } else {
                    result
                }
            }
            Some(Scripted {
                result,
                gate: Some(gate),
                honors_cancel: true,
                ..
            }) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(FetchError::Cancelled),
                    _ = gate => result,
                }
            }
            Some(Scripted {
                result,
                gate: Some(gate),
                honors_cancel: false,
                ..
            }) => {
                let _ = gate.await;
                result
            }
        };

        if matches!(outcome, Err(FetchError::Cancelled)) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
