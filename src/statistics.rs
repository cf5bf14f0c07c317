//! Descriptive statistics over latency/response-time samples: percentiles,
//! moving averages, exponential smoothing, and a bounded tracker for
//! streaming response times.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Nearest-rank percentile: `k = ceil(p * n / 100) - 1`, clamped to
/// `[0, n-1]`. Input need not be pre-sorted.
pub fn percentile(values: &[i64], pct: f64) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len() as f64;
    let rank = (pct.clamp(0.0, 100.0) * n / 100.0).ceil() as i64 - 1;
    let idx = rank.clamp(0, sorted.len() as i64 - 1) as usize;
    sorted[idx]
}

pub fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

/// Population variance (divides by `n`, not `n-1`).
pub fn variance(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v as f64 - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn stddev(values: &[i64]) -> f64 {
    variance(values).sqrt()
}

pub fn median(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Simple moving average with window `w`. Output length is
/// `max(1, n - w + 1)` for `n >= 1`; returns an empty vec for empty input.
/// A window larger than the input is clamped to the input length, so the
/// single resulting point is the mean of everything available.
pub fn moving_average(values: &[i64], window: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let w = window.clamp(1, values.len());
    (0..=(values.len() - w))
        .map(|start| mean(&values[start..start + w]))
        .collect()
}

/// Exponentially weighted moving average: `v_0 = x_0`,
/// `v_t = alpha * x_t + (1 - alpha) * v_{t-1}`.
pub fn ewma(values: &[i64], alpha: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0] as f64;
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v as f64 + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Bounded ring buffer of recent response-time samples with p50/p95/p99
/// readouts computed on demand.
pub struct ResponseTimeTracker {
    capacity: usize,
    samples: Mutex<VecDeque<i64>>,
}

impl ResponseTimeTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, sample_ms: i64) {
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample_ms);
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    fn percentile_of(&self, pct: f64) -> i64 {
        let samples = self.samples.lock();
        let values: Vec<i64> = samples.iter().copied().collect();
        percentile(&values, pct)
    }

    pub fn p50(&self) -> i64 {
        self.percentile_of(50.0)
    }

    pub fn p95(&self) -> i64 {
        self.percentile_of(95.0)
    }

    pub fn p99(&self) -> i64 {
        self.percentile_of(99.0)
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.samples.lock().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_nearest_rank() {
        let values = vec![10, 20, 30, 40, 50];
        assert_eq!(percentile(&values, 50.0), 30);
        assert_eq!(percentile(&values, 99.0), 50);
        assert_eq!(percentile(&values, 0.0), 10);
    }

    #[test]
    fn percentile_empty_is_zero() {
        assert_eq!(percentile(&[], 50.0), 0);
    }

    #[test]
    fn mean_and_variance_match_hand_computation() {
        let values = vec![2, 4, 4, 4, 5, 5, 7, 9];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(variance(&values), 4.0);
        assert_eq!(stddev(&values), 2.0);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[1, 2, 3]), 2.0);
        assert_eq!(median(&[1, 2, 3, 4]), 2.5);
    }

    #[test]
    fn moving_average_output_length() {
        let values = vec![1, 2, 3, 4, 5];
        let out = moving_average(&values, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 1.5);
    }

    #[test]
    fn moving_average_window_larger_than_input_clamps() {
        let values = vec![1, 2, 3];
        let out = moving_average(&values, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], 2.0);
    }

    #[test]
    fn ewma_first_value_is_seed() {
        let values = vec![10, 20, 30];
        let out = ewma(&values, 0.5);
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], 15.0);
        assert_eq!(out[2], 22.5);
    }

    #[test]
    fn tracker_evicts_oldest_past_capacity() {
        let tracker = ResponseTimeTracker::new(3);
        tracker.record(1);
        tracker.record(2);
        tracker.record(3);
        tracker.record(4);
        assert_eq!(tracker.snapshot(), vec![2, 3, 4]);
    }

    #[test]
    fn tracker_percentiles_reflect_recorded_samples() {
        let tracker = ResponseTimeTracker::new(100);
        for v in [10, 20, 30, 40, 50, 60, 70, 80, 90, 100] {
            tracker.record(v);
        }
        assert_eq!(tracker.p50(), 50);
        assert_eq!(tracker.p99(), 100);
    }
}
