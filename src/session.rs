// Last-request-wins tracking for historical fetches.
//
// Every trigger (view change, node change, peak toggle) starts a fresh fetch; any
// fetch still in flight is aborted and its result, if it lands anyway, is discarded.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::{AbortHandle, JoinHandle};

/// Identifies one started request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    generation: Arc<AtomicU64>,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True while no newer request has begun.
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::Acquire) == self.id
    }
}

#[derive(Debug, Default)]
pub struct LatestRequest {
    generation: Arc<AtomicU64>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn begin(&self) -> RequestTicket {
        let id = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        RequestTicket {
            id,
            generation: self.generation.clone(),
        }
    }

    /// Run `fut` as the current request. The previous in-flight request is aborted.
    /// Resolves to `None` when the result arrived after a newer request began.
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let ticket = self.begin();
        let handle = tokio::spawn(async move {
            let out = fut.await;
            ticket.is_current().then_some(out)
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = in_flight.replace(handle.abort_handle()) {
            prev.abort();
        }
        handle
    }

    /// Abort whatever is in flight and invalidate outstanding tickets.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = in_flight.take() {
            prev.abort();
        }
    }

    pub fn current_id(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
