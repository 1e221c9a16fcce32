//! Bounded ring buffer - sliding window over recent items.
//!
//! Fixed-capacity ordered sequence with FIFO eviction. Used for both
//! conversation history and style samples; eviction simply discards, nothing
//! is summarized or persisted.

use std::collections::VecDeque;

use crate::config::ConfigError;

/// Fixed-capacity buffer that evicts the oldest item on overflow.
///
/// Insertion order is the read order; `snapshot` hands out an independent
/// copy so consumers can't disturb the buffer.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` items.
    ///
    /// Capacity is fixed for the buffer's lifetime; zero is a configuration
    /// error, not a legal empty buffer.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "ring buffer capacity must be at least 1".to_string(),
            });
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append an item, evicting the oldest when full. Always succeeds.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Independent ordered copy, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// Remove all items; capacity is unchanged.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(RingBuffer::<u32>::new(0).is_err());
    }

    #[test]
    fn test_push_and_snapshot_order() {
        let mut buffer = RingBuffer::new(5).unwrap();
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        assert_eq!(buffer.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut buffer = RingBuffer::new(3).unwrap();
        for i in 1..=5 {
            buffer.push(i);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec![3, 4, 5]);
    }

    #[test]
    fn test_overflow_property_across_capacities() {
        // Appending n + k items leaves exactly min(n, n + k), equal to the
        // most recent ones, in append order.
        for capacity in 1..=8usize {
            for extra in 0..=5usize {
                let mut buffer = RingBuffer::new(capacity).unwrap();
                let total = capacity + extra;
                for i in 0..total {
                    buffer.push(i);
                }
                let expected: Vec<usize> = (total - capacity.min(total)..total).collect();
                assert_eq!(buffer.snapshot(), expected);
            }
        }
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut buffer = RingBuffer::new(3).unwrap();
        buffer.push("a".to_string());
        let mut copy = buffer.snapshot();
        copy.push("b".to_string());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buffer = RingBuffer::new(2).unwrap();
        buffer.push(1);
        buffer.push(2);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 2);
        buffer.push(9);
        assert_eq!(buffer.snapshot(), vec![9]);
    }
}
