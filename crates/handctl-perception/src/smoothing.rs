//! Frame-rate independent averaging.
//!
//! - [`MovingAverage`] – bounded FIFO mean of the last `n` samples.
//! - [`IntervalTimeRecorder`] – running average of the time between frames,
//!   in milliseconds.
//! - [`DataSampleFilter`] – throttles a [`MovingAverage`] so that it keeps a
//!   fixed number of samples per real-time window regardless of frame rate.
//!
//! The recorder publishes its average through an [`IntervalHandle`], a cheap
//! clone that any number of sample filters can read.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use handctl_perception::smoothing::{DataSampleFilter, IntervalTimeRecorder, MovingAverage};
//!
//! let mut interval = IntervalTimeRecorder::new(60);
//! interval.record(Duration::from_millis(10));
//!
//! // 1000 ms window at 10 ms/frame = 100 frames; keep 50 → every 2nd frame.
//! let filter = DataSampleFilter::new(interval.handle(), 1000.0, 50);
//! let mut average = MovingAverage::with_sampler(50, filter);
//! average.next(1.0);
//! average.next(3.0);
//! assert_eq!(average.len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tracing::trace;

// ────────────────────────────────────────────────────────────────────────────
// MovingAverage
// ────────────────────────────────────────────────────────────────────────────

/// Arithmetic mean over the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    capacity: usize,
    samples: VecDeque<f32>,
    total: f32,
    sampler: Option<DataSampleFilter>,
}

impl MovingAverage {
    /// Average over up to `capacity` samples, every sample accepted.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            total: 0.0,
            sampler: None,
        }
    }

    /// Average over up to `capacity` samples, accepting only those the
    /// `sampler` lets through.
    pub fn with_sampler(capacity: usize, sampler: DataSampleFilter) -> Self {
        Self {
            sampler: Some(sampler),
            ..Self::new(capacity)
        }
    }

    /// Mean of the retained samples, `0.0` when empty.
    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.total / self.samples.len() as f32
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Offer a sample.  Once full, the oldest sample is evicted.
    pub fn next(&mut self, value: f32) {
        if let Some(sampler) = self.sampler.as_mut()
            && !sampler.take()
        {
            return;
        }
        if self.capacity == 0 {
            return;
        }

        if self.samples.len() == self.capacity
            && let Some(oldest) = self.samples.pop_front()
        {
            self.total -= oldest;
        }
        self.samples.push_back(value);
        self.total += value;
    }

    /// Drop every sample and restart the sampler's cadence.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.total = 0.0;
        if let Some(sampler) = self.sampler.as_mut() {
            sampler.reset();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// IntervalTimeRecorder
// ────────────────────────────────────────────────────────────────────────────

/// Shared, read-only view of an [`IntervalTimeRecorder`]'s average.
#[derive(Debug, Clone, Default)]
pub struct IntervalHandle(Arc<AtomicU32>);

impl IntervalHandle {
    /// Average frame interval in milliseconds (`0.0` before any tick).
    pub fn value(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Records the time between ticks and keeps a moving average in
/// milliseconds.
#[derive(Debug, Clone)]
pub struct IntervalTimeRecorder {
    intervals: MovingAverage,
    previous: Option<Instant>,
    handle: IntervalHandle,
}

impl IntervalTimeRecorder {
    /// Average over the last `samples` intervals.
    pub fn new(samples: usize) -> Self {
        Self {
            intervals: MovingAverage::new(samples),
            previous: None,
            handle: IntervalHandle::default(),
        }
    }

    /// Average interval in milliseconds.
    pub fn value(&self) -> f32 {
        self.intervals.average()
    }

    /// A handle that observes this recorder's average.
    pub fn handle(&self) -> IntervalHandle {
        self.handle.clone()
    }

    /// Record a tick at the current wall-clock time.
    pub fn next_tick(&mut self) {
        self.next_tick_at(Instant::now());
    }

    /// Record a tick at `now`.  The first tick only sets the reference point.
    pub fn next_tick_at(&mut self, now: Instant) {
        if let Some(previous) = self.previous.replace(now) {
            self.record(now.saturating_duration_since(previous));
        }
    }

    /// Record an already-measured frame interval.
    pub fn record(&mut self, interval: Duration) {
        self.intervals.next(interval.as_secs_f32() * 1000.0);
        self.handle.store(self.intervals.average());
    }

    /// Forget all recorded intervals.
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.previous = None;
        self.handle.store(0.0);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DataSampleFilter
// ────────────────────────────────────────────────────────────────────────────

/// Lets through one call in every `step`, where
/// `step = floor((window_ms / interval_ms) / window_samples)`.
///
/// When `step <= 1`, or while no interval has been measured yet, every call
/// is accepted.
#[derive(Debug, Clone)]
pub struct DataSampleFilter {
    interval: IntervalHandle,
    window_ms: f32,
    window_samples: usize,
    count: u64,
    last_step: u64,
}

impl DataSampleFilter {
    /// - `interval` – frame interval of the caller of [`take`][Self::take].
    /// - `window_ms` – real-time window the samples should cover.
    /// - `window_samples` – number of samples wanted per window.
    pub fn new(interval: IntervalHandle, window_ms: f32, window_samples: usize) -> Self {
        Self {
            interval,
            window_ms,
            window_samples,
            count: 0,
            last_step: 1,
        }
    }

    /// Current down-sampling step.
    pub fn step(&self) -> u64 {
        let interval_ms = self.interval.value();
        if interval_ms.is_nan() || interval_ms <= 0.0 || self.window_samples == 0 {
            return 1;
        }
        let frequency = self.window_ms / interval_ms;
        let step = (frequency / self.window_samples as f32).floor();
        if step.is_finite() && step > 1.0 { step as u64 } else { 1 }
    }

    /// `true` when this call should be sampled.
    pub fn take(&mut self) -> bool {
        let step = self.step();
        if step != self.last_step {
            trace!(step, window_ms = self.window_ms, "sample step changed");
            self.last_step = step;
        }

        // Take a sample only once in `step` calls.
        if step <= 1 {
            return true;
        }
        self.count = (self.count + 1) % step;
        self.count == 0
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_at(interval_ms: u64) -> IntervalTimeRecorder {
        let mut recorder = IntervalTimeRecorder::new(10);
        recorder.record(Duration::from_millis(interval_ms));
        recorder
    }

    // ── MovingAverage ───────────────────────────────────────────────────────

    #[test]
    fn empty_average_is_zero() {
        let average = MovingAverage::new(4);
        assert_eq!(average.average(), 0.0);
        assert!(average.is_empty());
    }

    #[test]
    fn average_of_partial_window() {
        let mut average = MovingAverage::new(5);
        for v in [2.0, 4.0, 9.0] {
            average.next(v);
        }
        assert!((average.average() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn oldest_sample_is_evicted_first() {
        let mut average = MovingAverage::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            average.next(v);
        }
        assert_eq!(average.len(), 3);
        assert!((average.average() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut average = MovingAverage::new(0);
        average.next(5.0);
        assert!(average.is_empty());
        assert_eq!(average.average(), 0.0);
    }

    #[test]
    fn clear_forgets_samples() {
        let mut average = MovingAverage::new(3);
        average.next(7.0);
        average.clear();
        assert!(average.is_empty());
        average.next(1.0);
        assert!((average.average() - 1.0).abs() < 1e-6);
    }

    // ── IntervalTimeRecorder ────────────────────────────────────────────────

    #[test]
    fn recorder_averages_intervals() {
        let mut recorder = IntervalTimeRecorder::new(10);
        recorder.record(Duration::from_millis(10));
        recorder.record(Duration::from_millis(20));
        assert!((recorder.value() - 15.0).abs() < 1e-3);
        assert!((recorder.handle().value() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn first_wall_clock_tick_sets_reference_only() {
        let start = Instant::now();
        let mut recorder = IntervalTimeRecorder::new(10);
        recorder.next_tick_at(start);
        assert_eq!(recorder.value(), 0.0);
        recorder.next_tick_at(start + Duration::from_millis(16));
        assert!((recorder.value() - 16.0).abs() < 1e-3);
    }

    #[test]
    fn reset_clears_handle() {
        let mut recorder = recorder_at(16);
        let handle = recorder.handle();
        recorder.reset();
        assert_eq!(handle.value(), 0.0);
    }

    // ── DataSampleFilter ────────────────────────────────────────────────────

    #[test]
    fn sample_filter_takes_every_step_calls() {
        // 1000 ms / 10 ms = 100 frames per window, 25 samples → step 4.
        let recorder = recorder_at(10);
        let mut filter = DataSampleFilter::new(recorder.handle(), 1000.0, 25);
        assert_eq!(filter.step(), 4);
        let taken: Vec<bool> = (0..8).map(|_| filter.take()).collect();
        assert_eq!(taken, [false, false, false, true, false, false, false, true]);
    }

    #[test]
    fn sample_filter_step_of_one_accepts_everything() {
        // 100 ms / 10 ms = 10 frames, 10 samples → step 1.
        let recorder = recorder_at(10);
        let mut filter = DataSampleFilter::new(recorder.handle(), 100.0, 10);
        assert!((0..5).all(|_| filter.take()));
    }

    #[test]
    fn sample_filter_without_interval_accepts_everything() {
        let recorder = IntervalTimeRecorder::new(10);
        let mut filter = DataSampleFilter::new(recorder.handle(), 1000.0, 10);
        assert_eq!(filter.step(), 1);
        assert!(filter.take());
    }

    #[test]
    fn sample_filter_follows_recorder_updates() {
        let mut recorder = IntervalTimeRecorder::new(1);
        let filter = DataSampleFilter::new(recorder.handle(), 1000.0, 10);
        recorder.record(Duration::from_millis(50));
        // 20 frames per window / 10 samples.
        assert_eq!(filter.step(), 2);
        recorder.record(Duration::from_millis(5));
        // 200 frames per window / 10 samples.
        assert_eq!(filter.step(), 20);
    }

    #[test]
    fn throttled_average_keeps_fixed_sample_rate() {
        let recorder = recorder_at(10);
        let filter = DataSampleFilter::new(recorder.handle(), 1000.0, 50);
        let mut average = MovingAverage::with_sampler(50, filter);
        for v in 1..=10 {
            average.next(v as f32);
        }
        // Every 2nd value: 2, 4, 6, 8, 10.
        assert_eq!(average.len(), 5);
        assert!((average.average() - 6.0).abs() < 1e-6);
    }
}
