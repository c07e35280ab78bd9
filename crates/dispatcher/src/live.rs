//! Live publisher
//!
//! Fans records out to any number of live subscribers. Each subscriber owns a
//! bounded buffer; when it is full the oldest undelivered record is evicted,
//! so a slow client only ever loses its own backlog and `publish` never waits.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use contracts::Record;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::metrics::{LiveMetrics, LiveSnapshot};

/// Subscriber identifier, unique per publisher
pub type SubscriberId = u64;

struct Buffer {
    records: VecDeque<Record>,
    /// Evicted since the last successful receive
    lagged: u64,
    dropped_total: u64,
    closed: bool,
}

struct Slot {
    capacity: usize,
    buffer: Mutex<Buffer>,
    notify: Notify,
}

impl Slot {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(Buffer {
                records: VecDeque::with_capacity(capacity),
                lagged: 0,
                dropped_total: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Push, evicting the oldest record when full. Returns true on eviction.
    fn push(&self, record: Record) -> bool {
        let evicted = {
            let mut buffer = self.buffer.lock();
            if buffer.closed {
                return false;
            }
            let evicted = buffer.records.len() >= self.capacity;
            if evicted {
                buffer.records.pop_front();
                buffer.lagged += 1;
                buffer.dropped_total += 1;
            }
            buffer.records.push_back(record);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    fn close(&self) {
        self.buffer.lock().closed = true;
        self.notify.notify_one();
    }
}

struct Inner {
    capacity: usize,
    next_id: AtomicU64,
    closed: AtomicBool,
    subscribers: Mutex<HashMap<SubscriberId, Arc<Slot>>>,
    metrics: LiveMetrics,
}

impl Inner {
    fn remove(&self, id: SubscriberId) {
        let remaining = {
            let mut subscribers = self.subscribers.lock();
            if subscribers.remove(&id).is_none() {
                return;
            }
            subscribers.len()
        };
        self.metrics.set_subscribers(remaining);
        observability::metrics::record_live_subscribers(remaining);
        debug!(subscriber_id = id, remaining, "Live subscriber detached");
    }
}

/// Live fan-out point
///
/// Cheap to clone; all clones share the same subscriber set.
#[derive(Clone)]
pub struct LivePublisher {
    inner: Arc<Inner>,
}

impl LivePublisher {
    /// `capacity` is the per-subscriber buffer size (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                subscribers: Mutex::new(HashMap::new()),
                metrics: LiveMetrics::new(),
            }),
        }
    }

    /// Attach a new subscriber; it sees records published from now on
    ///
    /// After [`close`](Self::close) the returned subscription is already ended.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(Slot::new(self.inner.capacity));

        let count = {
            let mut subscribers = self.inner.subscribers.lock();
            if self.inner.closed.load(Ordering::Acquire) {
                slot.close();
                None
            } else {
                subscribers.insert(id, Arc::clone(&slot));
                Some(subscribers.len())
            }
        };

        if let Some(count) = count {
            self.inner.metrics.set_subscribers(count);
            observability::metrics::record_live_subscribers(count);
            debug!(subscriber_id = id, subscribers = count, "Live subscriber attached");
        }

        Subscription {
            id,
            slot,
            publisher: Arc::clone(&self.inner),
        }
    }

    /// Deliver a record to every current subscriber
    pub fn publish(&self, record: Record) {
        let slots: Vec<(SubscriberId, Arc<Slot>)> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        self.inner.metrics.inc_published();

        let mut evicted = 0u64;
        for (id, slot) in slots {
            if slot.push(record) {
                evicted += 1;
                debug!(subscriber_id = id, "Live buffer full, oldest record dropped");
            }
        }

        if evicted > 0 {
            self.inner.metrics.add_dropped(evicted);
            observability::metrics::record_live_dropped(evicted);
        }
    }

    /// End every subscription and refuse new ones
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let slots: Vec<Arc<Slot>> = self.inner.subscribers.lock().drain().map(|(_, s)| s).collect();
        for slot in &slots {
            slot.close();
        }

        self.inner.metrics.set_subscribers(0);
        observability::metrics::record_live_subscribers(0);
        info!(subscribers = slots.len(), "Live publisher closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn metrics(&self) -> LiveSnapshot {
        self.inner.metrics.snapshot()
    }
}

/// One client's interest in future records
///
/// Dropping the subscription detaches it and releases its buffer.
pub struct Subscription {
    id: SubscriberId,
    slot: Arc<Slot>,
    publisher: Arc<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next record
    ///
    /// Returns `None` once the publisher is closed and the buffer is empty.
    pub async fn recv(&mut self) -> Option<Record> {
        loop {
            if let Some(next) = self.try_next() {
                return next;
            }
            self.slot.notify.notified().await;
        }
    }

    /// Take a buffered record without waiting
    pub fn try_recv(&mut self) -> Option<Record> {
        self.try_next().flatten()
    }

    /// Records evicted from this buffer over its lifetime
    pub fn dropped(&self) -> u64 {
        self.slot.buffer.lock().dropped_total
    }

    /// Detach explicitly
    pub fn unsubscribe(self) {}

    /// `Some(Some(r))` = record, `Some(None)` = ended, `None` = nothing yet
    fn try_next(&self) -> Option<Option<Record>> {
        let mut buffer = self.slot.buffer.lock();
        if let Some(record) = buffer.records.pop_front() {
            if buffer.lagged > 0 {
                warn!(
                    subscriber_id = self.id,
                    missed = buffer.lagged,
                    "Live subscriber lagged, records skipped"
                );
                buffer.lagged = 0;
            }
            return Some(Some(record));
        }
        if buffer.closed {
            return Some(None);
        }
        None
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.publisher.remove(self.id);
    }
}
