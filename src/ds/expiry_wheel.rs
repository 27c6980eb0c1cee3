//! Bucketed expiry index for TTL caches.
//!
//! A fixed ring of buckets, each covering one sweep-interval-wide slice of
//! time. Keys are filed into the bucket their deadline falls in; because the
//! clock is monotonic and the TTL is uniform, each bucket holds keys in
//! deadline order (back = soonest). The sweeper visits one bucket per tick:
//! if the bucket's newest deadline is still in the future it reports the
//! delta so the caller can sleep outside any lock, then drains every expired
//! key from the bucket and advances.
//!
//! ```text
//!   span = sweep interval, ring covers span * bucket_count
//!
//!    cursor
//!      ▼
//!   ┌─────┬─────┬─────┬── ─ ──┬─────┐
//!   │ b0  │ b1  │ b2  │  ...  │ b99 │    bucket(deadline) =
//!   └─────┴─────┴─────┴── ─ ──┴─────┘      (deadline - epoch) / span % 100
//! ```
//!
//! The wheel stores no values; owners resolve keys through their policy and
//! keep the `(bucket, node)` handle so refiling on access is O(1).

use std::time::{Duration, Instant};

use crate::ds::ordered_list::OrderedList;
use crate::ds::slot_arena::SlotId;

/// Default number of buckets in the ring.
pub const DEFAULT_BUCKET_COUNT: usize = 100;

#[derive(Debug)]
struct Filed<K> {
    key: K,
    deadline: Instant,
}

/// Where a key is filed in the wheel; needed to unfile it in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSlot {
    pub bucket: usize,
    pub node: SlotId,
}

/// Fixed ring of deadline buckets.
#[derive(Debug)]
pub struct ExpiryWheel<K> {
    buckets: Vec<OrderedList<Filed<K>>>,
    span: Duration,
    epoch: Instant,
    cursor: usize,
}

impl<K> ExpiryWheel<K> {
    /// Creates a wheel of [`DEFAULT_BUCKET_COUNT`] buckets, each `span`
    /// wide. A zero span is widened to one nanosecond.
    pub fn new(span: Duration, epoch: Instant) -> Self {
        Self::with_buckets(span, epoch, DEFAULT_BUCKET_COUNT)
    }

    /// Creates a wheel with an explicit bucket count.
    pub fn with_buckets(span: Duration, epoch: Instant, buckets: usize) -> Self {
        let span = if span.is_zero() {
            Duration::from_nanos(1)
        } else {
            span
        };
        Self {
            buckets: (0..buckets.max(1)).map(|_| OrderedList::new()).collect(),
            span,
            epoch,
            cursor: 0,
        }
    }

    /// Returns the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the total number of filed keys.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    /// Returns `true` if no keys are filed.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }

    fn bucket_of(&self, deadline: Instant) -> usize {
        let offset = deadline.saturating_duration_since(self.epoch);
        ((offset.as_nanos() / self.span.as_nanos()) % self.buckets.len() as u128) as usize
    }

    /// Files `key` under `deadline` and returns its slot.
    pub fn file(&mut self, key: K, deadline: Instant) -> WheelSlot {
        let bucket = self.bucket_of(deadline);
        let node = self.buckets[bucket].push_front(Filed { key, deadline });
        WheelSlot { bucket, node }
    }

    /// Unfiles the key at `slot`, returning it if it was still filed.
    pub fn unfile(&mut self, slot: WheelSlot) -> Option<K> {
        self.buckets
            .get_mut(slot.bucket)?
            .unlink(slot.node)
            .map(|filed| filed.key)
    }

    /// Time until the cursor bucket is fully expired, or `None` if it can be
    /// drained right away (empty buckets drain trivially).
    pub fn sweep_wait(&self, now: Instant) -> Option<Duration> {
        let newest = self.buckets[self.cursor].front()?.deadline;
        if newest > now {
            Some(newest - now)
        } else {
            None
        }
    }

    /// Drains every key in the cursor bucket whose deadline has passed, then
    /// advances the cursor.
    pub fn sweep_take(&mut self, now: Instant) -> Vec<K> {
        let bucket = &mut self.buckets[self.cursor];
        let mut expired = Vec::new();
        while let Some(filed) = bucket.back() {
            if filed.deadline > now {
                break;
            }
            if let Some(filed) = bucket.pop_back() {
                expired.push(filed.key);
            }
        }
        self.cursor = (self.cursor + 1) % self.buckets.len();
        expired
    }

    /// Removes and returns one expired key, scanning from the cursor.
    ///
    /// Within a bucket the soonest deadline is drained first, so repeated
    /// calls yield expired keys in filing order.
    pub fn pop_expired(&mut self, now: Instant) -> Option<K> {
        let count = self.buckets.len();
        for i in 0..count {
            let idx = (self.cursor + i) % count;
            let bucket = &mut self.buckets[idx];
            if let Some(filed) = bucket.back() {
                if filed.deadline <= now {
                    return bucket.pop_back().map(|filed| filed.key);
                }
            }
        }
        None
    }

    /// Drops every filed key and resets the cursor.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.cursor = 0;
    }
}
