//! Bounded intake: load shedding, rolling-window rate limiting, and a
//! priority queue whose dequeue order matches the allocator's total order.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::models::Order;

/// True iff `depth > hard_limit` and the caller hasn't asked for an
/// explicit override (e.g. an emergency admit).
pub fn should_shed(depth: i64, hard_limit: i64, override_shed: bool) -> bool {
    if override_shed {
        return false;
    }
    depth > hard_limit
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Admitted { bucket: u64 },
    Rejected { bucket: u64 },
}

/// Fixed-window rate limiter: at most `max_per_window` submissions inside
/// each `window_seconds`-wide bucket. Never admits beyond that count.
pub struct RollingWindowScheduler {
    window_seconds: u64,
    max_per_window: usize,
    buckets: Mutex<HashMap<u64, usize>>,
}

impl RollingWindowScheduler {
    pub fn new(window_seconds: u64, max_per_window: usize) -> Self {
        Self {
            window_seconds: window_seconds.max(1),
            max_per_window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn bucket_key(&self, timestamp: u64) -> u64 {
        timestamp / self.window_seconds
    }

    pub fn can_schedule(&self, timestamp: u64) -> bool {
        let key = self.bucket_key(timestamp);
        let buckets = self.buckets.lock();
        buckets.get(&key).copied().unwrap_or(0) < self.max_per_window
    }

    /// Atomically increments the bucket's count and reports accept/reject.
    pub fn schedule(&self, timestamp: u64) -> ScheduleOutcome {
        let key = self.bucket_key(timestamp);
        let mut buckets = self.buckets.lock();
        let count = buckets.entry(key).or_insert(0);
        if *count < self.max_per_window {
            *count += 1;
            ScheduleOutcome::Admitted { bucket: key }
        } else {
            ScheduleOutcome::Rejected { bucket: key }
        }
    }

    /// Evicts buckets whose window start is older than `2 * window_seconds`
    /// relative to `now`.
    pub fn purge_expired(&self, now: u64) {
        let cutoff_time = now.saturating_sub(2 * self.window_seconds);
        let cutoff_key = self.bucket_key(cutoff_time);
        self.buckets.lock().retain(|&key, _| key >= cutoff_key);
    }

    pub fn bucket_count(&self, timestamp: u64) -> usize {
        let key = self.bucket_key(timestamp);
        self.buckets.lock().get(&key).copied().unwrap_or(0)
    }
}

fn order_key(order: &Order) -> (i64, &str) {
    (-order.urgency, order.eta.as_str())
}

/// Bounded priority queue. Dequeue order is the allocator's total order:
/// highest urgency first, earliest `eta` first on ties.
pub struct PriorityQueue {
    items: Mutex<Vec<Order>>,
    hard_limit: usize,
}

impl PriorityQueue {
    pub fn new(hard_limit: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            hard_limit,
        }
    }

    pub fn enqueue(&self, order: Order) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.hard_limit {
            return false;
        }
        let pos = items.partition_point(|o| order_key(o) <= order_key(&order));
        items.insert(pos, order);
        true
    }

    pub fn dequeue(&self) -> Option<Order> {
        let mut items = self.items.lock();
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    }

    pub fn peek(&self) -> Option<Order> {
        self.items.lock().first().cloned()
    }

    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    pub fn drain(&self) -> Vec<Order> {
        self.items.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}
