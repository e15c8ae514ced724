//! In-memory hardware for host runs and tests.
//!
//! Pulse channels advance a fixed burst of pulses each time they are polled
//! instead of in real time, so a full cell cycle simulates in a few
//! milliseconds.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::axis::Axis;
use crate::config::STATUS_LINES;
use crate::display::{StatusLine, status_line};
use crate::endstop::{EndstopMonitor, IDLE_SAMPLE, sample_word};
use crate::error::GantryError;
use crate::hw::{Gripper, PulseChannel, StatusDisplay, TagReader};
use crate::inventory::{PalletId, pallet_id};

struct Trip {
    monitor: Arc<EndstopMonitor>,
    axis: Axis,
    after: u32,
}

pub struct SimPulseChannel {
    burst: u32,
    remaining: u32,
    emitted_this_train: u32,
    emitted: u64,
    direction: Option<bool>,
    starts: u32,
    halts: u32,
    trip: Option<Trip>,
}

impl SimPulseChannel {
    pub fn new(burst: u32) -> Self {
        Self {
            burst,
            remaining: 0,
            emitted_this_train: 0,
            emitted: 0,
            direction: None,
            starts: 0,
            halts: 0,
            trip: None,
        }
    }

    /// A channel whose counter never moves, as if the pulse source hung.
    pub fn stalled() -> Self {
        Self::new(0)
    }

    /// Pull `axis`' endstop line low once `after` pulses of a train went out.
    /// The motor then stalls against the switch.
    pub fn tripping(mut self, monitor: Arc<EndstopMonitor>, axis: Axis, after: u32) -> Self {
        self.trip = Some(Trip {
            monitor,
            axis,
            after,
        });
        self
    }

    pub fn starts(&self) -> u32 {
        self.starts
    }

    pub fn halts(&self) -> u32 {
        self.halts
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn direction(&self) -> Option<bool> {
        self.direction
    }
}

impl PulseChannel for SimPulseChannel {
    fn set_direction(&mut self, level: bool) -> Result<(), GantryError> {
        self.direction = Some(level);
        Ok(())
    }

    fn begin(&mut self, pulses: u32, _interval_us: u32) -> Result<(), GantryError> {
        self.remaining = pulses;
        self.emitted_this_train = 0;
        self.starts += 1;
        Ok(())
    }

    fn halt(&mut self) -> Result<(), GantryError> {
        self.remaining = 0;
        self.halts += 1;
        Ok(())
    }

    fn pulses_remaining(&mut self) -> u32 {
        let mut step = self.burst.min(self.remaining);
        if let Some(trip) = &self.trip {
            let to_switch = trip.after.saturating_sub(self.emitted_this_train);
            if step >= to_switch {
                step = to_switch;
                let mut levels = [true; 3];
                levels[trip.axis.index()] = false;
                trip.monitor.record_sample(sample_word(levels));
            }
        }
        self.remaining -= step;
        self.emitted_this_train += step;
        self.emitted += step as u64;
        self.remaining
    }
}

#[derive(Default)]
pub struct SimGripper {
    on: bool,
    switches: u32,
}

impl SimGripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Times the coil was switched either way.
    pub fn switches(&self) -> u32 {
        self.switches
    }
}

impl Gripper for SimGripper {
    fn gripper_on(&mut self) -> Result<(), GantryError> {
        self.on = true;
        self.switches += 1;
        Ok(())
    }

    fn gripper_off(&mut self) -> Result<(), GantryError> {
        self.on = false;
        self.switches += 1;
        Ok(())
    }

    fn gripper_state(&self) -> bool {
        self.on
    }
}

/// Answers scans from a script, then with `None` once it runs out.
#[derive(Default)]
pub struct SimTagReader {
    script: VecDeque<Option<PalletId>>,
    scans: u32,
}

impl SimTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted<'a>(answers: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            script: answers.into_iter().map(|a| a.map(pallet_id)).collect(),
            scans: 0,
        }
    }

    pub fn scans(&self) -> u32 {
        self.scans
    }
}

impl TagReader for SimTagReader {
    fn scan_for_tag(&mut self) -> Option<PalletId> {
        self.scans += 1;
        self.script.pop_front().flatten()
    }
}

pub struct MemoryDisplay {
    lines: [StatusLine; STATUS_LINES as usize],
    writes: Vec<(u8, StatusLine)>,
}

impl Default for MemoryDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self {
            lines: [status_line(""), status_line("")],
            writes: Vec::new(),
        }
    }

    pub fn line(&self, slot: u8) -> &str {
        self.lines[slot as usize].as_str()
    }

    pub fn writes(&self) -> &[(u8, StatusLine)] {
        &self.writes
    }
}

impl StatusDisplay for MemoryDisplay {
    fn write_line(&mut self, slot: u8, text: &str) {
        if slot >= STATUS_LINES {
            return;
        }
        let line = status_line(text);
        self.lines[slot as usize] = line.clone();
        self.writes.push((slot, line));
    }
}

/// Endstop switches a test can press and release.
#[derive(Default)]
pub struct EndstopLines {
    pressed: AtomicU32,
}

impl EndstopLines {
    pub fn press(&self, axis: Axis) {
        self.pressed.fetch_or(1 << axis.index(), Ordering::AcqRel);
    }

    pub fn release(&self, axis: Axis) {
        self.pressed.fetch_and(!(1 << axis.index()), Ordering::AcqRel);
    }

    fn word(&self) -> u32 {
        IDLE_SAMPLE & !self.pressed.load(Ordering::Acquire)
    }
}

/// Background sampler standing in for the board's timer interrupt.
/// Stops when dropped.
pub struct Sampler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

pub fn spawn_sampler(
    monitor: Arc<EndstopMonitor>,
    lines: Arc<EndstopLines>,
    period: Duration,
) -> Sampler {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let handle = thread::spawn(move || {
        while !flag.load(Ordering::Acquire) {
            monitor.record_sample(lines.word());
            thread::sleep(period);
        }
    });
    Sampler {
        stop,
        handle: Some(handle),
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
