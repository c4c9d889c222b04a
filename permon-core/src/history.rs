use std::collections::VecDeque;

/// Pushes `value`, dropping the oldest entry once `cap` is reached.
/// Returns the evicted entry, if any.
pub fn push_with_cap<T>(deque: &mut VecDeque<T>, value: T, cap: usize) -> Option<T> {
    if cap == 0 {
        return None;
    }
    let evicted = if deque.len() == cap {
        deque.pop_front()
    } else {
        None
    };
    deque.push_back(value);
    evicted
}

/// Fixed-capacity FIFO of samples backing one chart.
///
/// The buffer is prefilled at construction, so its length is always equal to
/// its capacity and index 0 is the oldest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingBuffer {
    /// Create a buffer of `capacity` entries, all set to `fill`.
    pub fn new(capacity: usize, fill: f64) -> Self {
        let mut values = VecDeque::with_capacity(capacity);
        values.extend(std::iter::repeat(fill).take(capacity));
        Self { values, capacity }
    }

    /// Append the newest sample and evict the oldest one.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        push_with_cap(&mut self.values, value, self.capacity)
    }

    /// Append and return the updated contiguous view, oldest first.
    pub fn append(&mut self, value: f64) -> &[f64] {
        self.push(value);
        self.as_slice()
    }

    /// Contiguous view of the samples, oldest first.
    pub fn as_slice(&mut self) -> &[f64] {
        self.values.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Smallest and largest buffered value
    pub fn min_max(&self) -> Option<(f64, f64)> {
        min_max(self.values.iter().copied())
    }
}

pub(crate) fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefilled_with_fill_value() {
        let buffer = RollingBuffer::new(4, 0.0);
        assert_eq!(buffer.len(), 4);
        assert!(buffer.iter().all(|v| v == 0.0));
    }

    #[test]
    fn append_evicts_oldest() {
        let mut buffer = RollingBuffer::new(3, 0.0);
        assert_eq!(buffer.push(1.0), Some(0.0));
        buffer.push(2.0);
        let view = buffer.append(3.0);
        assert_eq!(view, &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.push(4.0), Some(1.0));
        assert_eq!(buffer.as_slice(), &[2.0, 3.0, 4.0]);
        assert_eq!(buffer.latest(), Some(4.0));
    }

    #[test]
    fn length_stays_at_capacity() {
        let mut buffer = RollingBuffer::new(5, 1.0);
        for i in 0..137 {
            buffer.push(i as f64);
            assert_eq!(buffer.len(), 5);
        }
        assert_eq!(buffer.min_max(), Some((132.0, 136.0)));
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut buffer = RollingBuffer::new(0, 0.0);
        assert_eq!(buffer.push(1.0), None);
        assert!(buffer.is_empty());
        assert_eq!(buffer.min_max(), None);
    }

    #[test]
    fn push_with_cap_returns_evicted() {
        let mut deque = VecDeque::new();
        assert_eq!(push_with_cap(&mut deque, 1, 2), None);
        assert_eq!(push_with_cap(&mut deque, 2, 2), None);
        assert_eq!(push_with_cap(&mut deque, 3, 2), Some(1));
        assert_eq!(deque, VecDeque::from(vec![2, 3]));
    }
}
