//! Bounded FIFO sample buffer with drop-oldest eviction.
//!
//! The queue is the only piece of state shared between the streaming producer
//! and the session coordinator. Its backpressure policy is drop-oldest: at
//! capacity, admitting a new sample discards the oldest one first, so the
//! producer never blocks and data loss under backpressure stays bounded to
//! the queue depth.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::sample::Sample;

/// Bounded drop-oldest sample buffer.
///
/// Eviction-then-insert happens under a single lock acquisition, so occupancy
/// never exceeds capacity even with multiple producers.
#[derive(Debug)]
pub struct SampleQueue {
    inner: Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl SampleQueue {
    /// Creates a queue with the given fixed capacity.
    ///
    /// Capacity is validated at configuration time; see
    /// [`CaptureConfig::with_capacity`](crate::config::CaptureConfig::with_capacity).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest entry first when full.
    ///
    /// Never blocks and never fails. Returns the evicted sample, if any.
    pub fn push(&self, sample: Sample) -> Option<Sample> {
        let mut inner = self.inner.lock();
        let evicted = if inner.len() == self.capacity {
            inner.pop_front()
        } else {
            None
        };
        inner.push_back(sample);
        evicted
    }

    /// Atomically removes and returns all entries in FIFO order.
    pub fn drain_all(&self) -> Vec<Sample> {
        let mut inner = self.inner.lock();
        inner.drain(..).collect()
    }

    /// Current occupancy; the coordinator's termination predicate.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{CHANNEL_COUNT, POINTS_PER_CHANNEL};
    use chrono::{Duration, Utc};

    fn sample(tag: i64) -> Sample {
        let ts = Utc::now() + Duration::microseconds(tag);
        Sample::new(ts, vec![tag as f32; CHANNEL_COUNT * POINTS_PER_CHANNEL]).unwrap()
    }

    #[test]
    fn fifo_order_below_capacity() {
        let queue = SampleQueue::new(10);
        for tag in 0..5 {
            assert!(queue.push(sample(tag)).is_none());
        }
        let drained = queue.drain_all();
        assert_eq!(drained.len(), 5);
        for (tag, s) in drained.iter().enumerate() {
            assert_eq!(s.data()[0], tag as f32);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let queue = SampleQueue::new(2);
        queue.push(sample(1));
        queue.push(sample(2));
        let evicted = queue.push(sample(3)).unwrap();
        assert_eq!(evicted.data()[0], 1.0);

        let drained = queue.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].data()[0], 2.0);
        assert_eq!(drained[1].data()[0], 3.0);
    }

    // Drop-oldest law: after any insertion sequence longer than the capacity,
    // the queue holds exactly the most recent C entries in relative order.
    #[test]
    fn drop_oldest_law_across_capacities() {
        for capacity in [1usize, 2, 3, 7, 100] {
            let queue = SampleQueue::new(capacity);
            let total = capacity * 3 + 1;
            for tag in 0..total {
                queue.push(sample(tag as i64));
                assert!(queue.len() <= capacity);
            }
            let drained = queue.drain_all();
            assert_eq!(drained.len(), capacity);
            for (i, s) in drained.iter().enumerate() {
                assert_eq!(s.data()[0], (total - capacity + i) as f32);
            }
        }
    }

    #[test]
    fn drain_on_empty_queue_is_empty() {
        let queue = SampleQueue::new(4);
        assert!(queue.drain_all().is_empty());
    }
}
