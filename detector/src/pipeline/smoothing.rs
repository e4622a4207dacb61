use std::collections::VecDeque;

// Upfront allocation cap; larger windows grow as samples arrive.
const PREALLOCATE_LIMIT: usize = 1024;

/// Sliding-window moving average over the last `capacity` brightness samples.
///
/// Unlike an EMA, a sample stops influencing the average once it has been
/// pushed out of the window.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingWindow {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one if the window is over capacity.
    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Arithmetic mean of the held samples, or `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Classification is only meaningful once this is true.
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_last_n_pushes() {
        let n = 4;
        for k in 0..6 {
            let mut window = SmoothingWindow::new(n);
            let pushes: Vec<f64> = (1..=(n + k)).map(|i| i as f64).collect();
            for &s in &pushes {
                window.push(s);
            }
            assert_eq!(window.len(), n);
            assert_eq!(window.samples().collect::<Vec<_>>(), pushes[k..].to_vec());
        }
    }

    #[test]
    fn fills_then_stays_full() {
        let mut window = SmoothingWindow::new(3);
        assert!(window.is_empty());
        window.push(1.0);
        window.push(2.0);
        assert!(!window.is_full());
        window.push(3.0);
        assert!(window.is_full());
        window.push(4.0);
        assert!(window.is_full());
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn average_is_sliding_not_cumulative() {
        let mut window = SmoothingWindow::new(2);
        window.push(100.0);
        window.push(0.0);
        assert_eq!(window.average(), Some(50.0));
        window.push(0.0);
        assert_eq!(window.average(), Some(0.0));
    }

    #[test]
    fn empty_window_has_no_average() {
        let mut window = SmoothingWindow::new(3);
        assert_eq!(window.average(), None);
        window.push(42.0);
        window.reset();
        assert_eq!(window.average(), None);
        assert!(window.is_empty());
    }

    #[test]
    fn huge_capacity_allocates_lazily() {
        let mut window = SmoothingWindow::new(usize::MAX);
        assert_eq!(window.capacity(), usize::MAX);
        window.push(7.0);
        window.push(9.0);
        assert!(!window.is_full());
        assert_eq!(window.average(), Some(8.0));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = SmoothingWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(5.0);
        assert!(window.is_full());
    }
}
