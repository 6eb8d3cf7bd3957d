//! Per-view request tickets so a late response to an older request can be dropped.
//! Requests are not cancelled; only their results are discarded.
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: String,
    seq: u64,
}

impl Ticket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Default)]
struct Inner {
    // Shared by every key and never reset, so a ticket is never reissued.
    next_seq: u64,
    latest: HashMap<String, u64>,
}

#[derive(Clone, Default)]
pub struct RequestTracker {
    inner: Arc<RwLock<Inner>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `key` (e.g. "survey:12"), superseding earlier ones.
    pub async fn begin(&self, key: &str) -> Ticket {
        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.latest.insert(key.to_string(), seq);
        Ticket {
            key: key.to_string(),
            seq,
        }
    }

    pub async fn is_current(&self, ticket: &Ticket) -> bool {
        let inner = self.inner.read().await;
        inner.latest.get(&ticket.key) == Some(&ticket.seq)
    }

    /// Hands the value back only if no newer request for the same key has started.
    /// The key is forgotten once its current request completes.
    pub async fn accept<T>(&self, ticket: &Ticket, value: T) -> Option<T> {
        let mut inner = self.inner.write().await;
        if inner.latest.get(&ticket.key) == Some(&ticket.seq) {
            inner.latest.remove(&ticket.key);
            Some(value)
        } else {
            tracing::debug!(
                "Discarding stale response for {} (seq {})",
                ticket.key,
                ticket.seq
            );
            None
        }
    }

    /// Like `accept`, but a superseded failure is dropped along with a superseded success.
    pub async fn settle<T, E>(
        &self,
        ticket: &Ticket,
        result: Result<T, E>,
    ) -> Result<Option<T>, E> {
        match self.accept(ticket, result).await {
            Some(result) => result.map(Some),
            None => Ok(None),
        }
    }

    /// Forget a key, e.g. when its view is closed. Outstanding tickets for it become stale.
    pub async fn reset(&self, key: &str) {
        let mut inner = self.inner.write().await;
        inner.latest.remove(key);
    }

    pub async fn tracked_keys(&self) -> usize {
        self.inner.read().await.latest.len()
    }
}
