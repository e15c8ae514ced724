//! Endstop interlock.
//!
//! A sampler outside any task (a hardware timer interrupt on the board, a
//! thread in simulation) copies the three endstop lines into one word at
//! `ENDSTOP_SAMPLE_HZ`. The motion worker only ever reads that word and the
//! flags latched from it, so there is no lock and at most one sample period of
//! staleness.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::axis::Axis;

// all lines released, sensors pull low when hit
pub const IDLE_SAMPLE: u32 = u32::MAX;

const LINE_MASK: u32 = 0b111;

pub struct EndstopMonitor {
    sample: AtomicU32,
    latched: AtomicU32,
    halt: AtomicBool,
    samples: AtomicU32,
}

impl Default for EndstopMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl EndstopMonitor {
    pub const fn new() -> Self {
        Self {
            sample: AtomicU32::new(IDLE_SAMPLE),
            latched: AtomicU32::new(0),
            halt: AtomicBool::new(false),
            samples: AtomicU32::new(0),
        }
    }

    /// Sampler side. Safe to call from an interrupt handler.
    pub fn record_sample(&self, word: u32) {
        self.sample.store(word, Ordering::Release);
        let active = !word & LINE_MASK;
        if active != 0 {
            self.latched.fetch_or(active, Ordering::AcqRel);
            self.halt.store(true, Ordering::Release);
        }
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Line is low in the latest sample.
    pub fn is_triggered(&self, axis: Axis) -> bool {
        self.sample.load(Ordering::Acquire) & axis.line_mask() == 0
    }

    /// Line went low at some point since the last reset.
    pub fn has_tripped(&self, axis: Axis) -> bool {
        self.latched.load(Ordering::Acquire) & axis.line_mask() != 0
    }

    pub fn tripped_axis(&self) -> Option<Axis> {
        Axis::ALL.into_iter().find(|axis| self.has_tripped(*axis))
    }

    pub fn must_stop(&self) -> bool {
        self.halt.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.sample.store(IDLE_SAMPLE, Ordering::Release);
        self.latched.store(0, Ordering::Release);
        self.halt.store(false, Ordering::Release);
    }

    pub fn sample_count(&self) -> u32 {
        self.samples.load(Ordering::Relaxed)
    }
}

/// Build a sample word from the line levels, indexed like `Axis::index`.
pub fn sample_word(levels_high: [bool; 3]) -> u32 {
    Axis::ALL
        .into_iter()
        .filter(|axis| !levels_high[axis.index()])
        .fold(IDLE_SAMPLE, |word, axis| word & !axis.line_mask())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_line_reads_as_triggered() {
        let monitor = EndstopMonitor::new();
        assert!(!monitor.is_triggered(Axis::Y));
        monitor.record_sample(sample_word([true, false, true]));
        assert!(monitor.is_triggered(Axis::Y));
        assert!(!monitor.is_triggered(Axis::X));
        assert_eq!(monitor.tripped_axis(), Some(Axis::Y));
        assert!(monitor.must_stop());
    }

    #[test]
    fn trip_stays_latched_after_the_line_clears() {
        let monitor = EndstopMonitor::new();
        monitor.record_sample(sample_word([true, true, false]));
        monitor.record_sample(IDLE_SAMPLE);
        assert!(!monitor.is_triggered(Axis::Z));
        assert!(monitor.has_tripped(Axis::Z));
        assert!(monitor.must_stop());

        monitor.reset();
        assert_eq!(monitor.tripped_axis(), None);
        assert!(!monitor.must_stop());
        assert_eq!(monitor.sample_count(), 2);
    }
}
