// Live snapshot buffers: one bounded, timestamp-ordered window per node, fed by the push transport.
// Buffers are swapped whole behind an Arc so readers never see a half-applied push.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::{GridRow, LiveSnapshot};

/// Points kept for the real-time view.
pub const DEFAULT_LIVE_CAPACITY: usize = 30 * 5;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveBuffer {
    capacity: usize,
    entries: VecDeque<LiveSnapshot>,
}

impl LiveBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Buffer seeded from a recent-history fetch; keeps the newest `capacity` rows.
    pub fn from_rows(capacity: usize, rows: impl IntoIterator<Item = LiveSnapshot>) -> Self {
        let mut buffer = Self::new(capacity);
        for row in rows {
            buffer.push(row);
        }
        buffer
    }

    /// Insert in timestamp order unless the timestamp is already held (redelivery).
    /// Evicts the oldest entries past capacity; a full buffer drops a snapshot older
    /// than everything it holds. Returns whether it was inserted.
    pub fn push(&mut self, snapshot: LiveSnapshot) -> bool {
        let idx = self
            .entries
            .partition_point(|e| e.timestamp < snapshot.timestamp);
        if self
            .entries
            .get(idx)
            .is_some_and(|e| e.timestamp == snapshot.timestamp)
        {
            return false;
        }
        if idx == 0 && self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.insert(idx, snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    /// Copy of this buffer with `snapshot` applied, or `None` when it was not taken.
    pub fn with_snapshot(&self, snapshot: LiveSnapshot) -> Option<Self> {
        let mut next = self.clone();
        next.push(snapshot).then_some(next)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&LiveSnapshot> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveSnapshot> {
        self.entries.iter()
    }

    /// Buffer contents as chart rows, as held (no regridding).
    pub fn rows(&self) -> Vec<GridRow> {
        self.entries.iter().cloned().collect()
    }
}

/// Historical rows older than the first live entry, followed by the live entries.
pub fn concat_with_history(history: &[GridRow], live: &LiveBuffer) -> Vec<GridRow> {
    let Some(first_live) = live.iter().next().map(|s| s.timestamp) else {
        return history.to_vec();
    };
    history
        .iter()
        .filter(|r| r.timestamp < first_live)
        .cloned()
        .chain(live.iter().cloned())
        .collect()
}

/// Per-node live buffers.
pub struct LiveStore {
    capacity: usize,
    buffers: RwLock<HashMap<String, Arc<LiveBuffer>>>,
}

impl LiveStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: RwLock::new(HashMap::new()),
        }
    }

    /// Apply one pushed snapshot. Returns false for a redelivered timestamp.
    pub async fn record(&self, entity: &str, snapshot: LiveSnapshot) -> bool {
        let mut buffers = self.buffers.write().await;
        let current = buffers
            .get(entity)
            .cloned()
            .unwrap_or_else(|| Arc::new(LiveBuffer::new(self.capacity)));
        match current.with_snapshot(snapshot) {
            Some(next) => {
                buffers.insert(entity.to_string(), Arc::new(next));
                true
            }
            None => false,
        }
    }

    /// Merge fetched recent history into a node's buffer and return the result.
    /// Snapshots recorded while the fetch was in flight are kept.
    pub async fn seed(&self, entity: &str, rows: Vec<LiveSnapshot>) -> Arc<LiveBuffer> {
        let mut buffers = self.buffers.write().await;
        let merged = match buffers.get(entity) {
            Some(current) => {
                let mut next = current.as_ref().clone();
                for row in rows {
                    next.push(row);
                }
                next
            }
            None => LiveBuffer::from_rows(self.capacity, rows),
        };
        let merged = Arc::new(merged);
        buffers.insert(entity.to_string(), merged.clone());
        merged
    }

    pub async fn get(&self, entity: &str) -> Option<Arc<LiveBuffer>> {
        self.buffers.read().await.get(entity).cloned()
    }
}
