//! Events reported to the bus daemon.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Name and link notifications, in the order the coordinator raised them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LinkEvent {
    FoundAdvertisedName {
        name: String,
        name_prefix: String,
        guid: String,
        device: String,
    },
    LostAdvertisedName {
        name: String,
        name_prefix: String,
        guid: String,
        device: String,
    },
    LinkEstablished {
        handle: i32,
        interface_name: String,
    },
    /// `error` is a negated status code.
    LinkError {
        handle: i32,
        error: i32,
    },
    LinkLost {
        handle: i32,
    },
}

impl LinkEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FoundAdvertisedName { .. } => "found_advertised_name",
            Self::LostAdvertisedName { .. } => "lost_advertised_name",
            Self::LinkEstablished { .. } => "link_established",
            Self::LinkError { .. } => "link_error",
            Self::LinkLost { .. } => "link_lost",
        }
    }
}

/// A [`LinkEvent`] with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub event: LinkEvent,
}

#[derive(Default)]
struct LogInner {
    next_seq: u64,
    entries: VecDeque<LoggedEvent>,
}

/// Bounded in-memory history of events, read by the HTTP API.
#[derive(Clone)]
pub struct EventLog {
    capacity: usize,
    inner: Arc<Mutex<LogInner>>,
}

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Arc::new(Mutex::new(LogInner::default())),
        }
    }

    /// Append an event, evicting the oldest once full. Returns its sequence number.
    pub async fn push(&self, event: LinkEvent) -> u64 {
        let mut inner = self.inner.lock().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(LoggedEvent { seq, event });
        seq
    }

    /// Events with `seq >= since` still held by the log.
    pub async fn since(&self, since: u64) -> Vec<LoggedEvent> {
        self.inner
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.seq >= since)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
