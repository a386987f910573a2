//! Fixed-capacity ring buffer with oldest-first eviction.

use std::collections::VecDeque;

/// Bounded history; pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct Ring<T> {
    buf: VecDeque<T>,
    cap: usize,
}

impl<T> Ring<T> {
    /// Capacity is clamped to at least 1.
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            buf: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Push a value, returning the evicted one when full.
    pub fn push(&mut self, v: T) -> Option<T> {
        let evicted = if self.buf.len() == self.cap {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(v);
        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Entry `n` steps before the most recent one (`nth_back(0) == last()`).
    pub fn nth_back(&self, n: usize) -> Option<&T> {
        self.buf.len().checked_sub(n + 1).and_then(|i| self.buf.get(i))
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.buf.iter()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<T: Clone> Ring<T> {
    /// Up to `count` most recent entries, oldest first.
    pub fn tail(&self, count: usize) -> Vec<T> {
        let skip = self.buf.len().saturating_sub(count);
        self.buf.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Ring;

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut r = Ring::with_capacity(3);
        assert_eq!(r.push(1), None);
        assert_eq!(r.push(2), None);
        assert_eq!(r.push(3), None);
        assert_eq!(r.push(4), Some(1));
        assert_eq!(r.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn nth_back_and_tail() {
        let mut r = Ring::with_capacity(5);
        for v in 0..7 {
            r.push(v);
        }
        assert_eq!(r.last(), Some(&6));
        assert_eq!(r.nth_back(1), Some(&5));
        assert_eq!(r.nth_back(4), Some(&2));
        assert_eq!(r.nth_back(5), None);
        assert_eq!(r.tail(2), vec![5, 6]);
        assert_eq!(r.tail(99), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut r = Ring::with_capacity(0);
        r.push('a');
        r.push('b');
        assert_eq!(r.capacity(), 1);
        assert_eq!(r.last(), Some(&'b'));
    }
}
