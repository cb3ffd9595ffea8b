//! Ingest counters and processing-time telemetry.
//!
//! Informational only. Counters are lock-free; timing aggregates sit behind
//! a short mutex updated once per evaluated reading.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
struct Timing {
    count: u64,
    last: Duration,
    min: Duration,
    max: Duration,
    total: Duration,
}

/// Copyable statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStats {
    /// Datagrams handed to the engine
    pub datagrams_received: u64,
    /// Datagrams decoded into a measurement
    pub decoded: u64,
    /// Datagrams dropped as malformed
    pub malformed: u64,
    /// Transition events emitted
    pub transitions: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    /// Rules currently active
    pub active_filters: usize,
    /// Evaluations timed (decode end to evaluation end)
    pub evaluations: u64,
    pub last_processing: Duration,
    pub min_processing: Duration,
    pub max_processing: Duration,
    pub mean_processing: Duration,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filters={} rx={} ok={} malformed={} transitions={} notify={}/{} \
             proc last={:.3}ms min={:.3}ms mean={:.3}ms max={:.3}ms",
            self.active_filters,
            self.datagrams_received,
            self.decoded,
            self.malformed,
            self.transitions,
            self.notifications_sent,
            self.notifications_failed,
            as_ms(self.last_processing),
            as_ms(self.min_processing),
            as_ms(self.mean_processing),
            as_ms(self.max_processing),
        )
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Engine telemetry collector.
#[derive(Debug, Default)]
pub struct Telemetry {
    received: AtomicU64,
    decoded: AtomicU64,
    malformed: AtomicU64,
    transitions: AtomicU64,
    timing: Mutex<Timing>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transitions(&self, count: usize) {
        self.transitions.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record one evaluation's processing time.
    pub fn record_processing(&self, elapsed: Duration) {
        let mut timing = self.timing.lock();
        timing.min = if timing.count == 0 {
            elapsed
        } else {
            timing.min.min(elapsed)
        };
        timing.max = timing.max.max(elapsed);
        timing.last = elapsed;
        timing.total += elapsed;
        timing.count += 1;
    }

    /// Counters and timing as of now. Notification and filter counts are
    /// left at zero for the owner to fill in.
    pub fn snapshot(&self) -> EngineStats {
        let timing = *self.timing.lock();
        let mean = if timing.count == 0 {
            Duration::ZERO
        } else {
            timing.total.div_f64(timing.count as f64)
        };

        EngineStats {
            datagrams_received: self.received.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            evaluations: timing.count,
            last_processing: timing.last,
            min_processing: timing.min,
            max_processing: timing.max,
            mean_processing: mean,
            ..EngineStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let stats = Telemetry::new().snapshot();
        assert_eq!(stats, EngineStats::default());
    }

    #[test]
    fn test_counters() {
        let telemetry = Telemetry::new();
        telemetry.record_received();
        telemetry.record_received();
        telemetry.record_decoded();
        telemetry.record_malformed();
        telemetry.record_transitions(3);

        let stats = telemetry.snapshot();
        assert_eq!(stats.datagrams_received, 2);
        assert_eq!(stats.decoded, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.transitions, 3);
    }

    #[test]
    fn test_processing_time() {
        let telemetry = Telemetry::new();
        for ms in [4, 2, 6] {
            telemetry.record_processing(Duration::from_millis(ms));
        }

        let stats = telemetry.snapshot();
        assert_eq!(stats.evaluations, 3);
        assert_eq!(stats.last_processing, Duration::from_millis(6));
        assert_eq!(stats.min_processing, Duration::from_millis(2));
        assert_eq!(stats.max_processing, Duration::from_millis(6));
        assert_eq!(stats.mean_processing, Duration::from_millis(4));
    }

    #[test]
    fn test_display() {
        let stats = EngineStats {
            active_filters: 2,
            datagrams_received: 10,
            ..EngineStats::default()
        };
        let line = stats.to_string();
        assert!(line.starts_with("filters=2 rx=10"));
    }
}
