#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use gantry::sim::{MemoryDisplay, SimGripper, SimPulseChannel, SimTagReader};
use gantry::{CellOperator, EndstopMonitor, EventLog, Gantry, MotionCoordinator, Timing};

// pulses a simulated channel emits per poll
pub const BURST: u32 = 500;

pub type SimOperator = CellOperator<SimPulseChannel, SimGripper, SimTagReader, MemoryDisplay>;

pub fn channels() -> [SimPulseChannel; 3] {
    [
        SimPulseChannel::new(BURST),
        SimPulseChannel::new(BURST),
        SimPulseChannel::new(BURST),
    ]
}

pub fn coordinator(
    channels: [SimPulseChannel; 3],
    endstops: Arc<EndstopMonitor>,
) -> (MotionCoordinator<SimPulseChannel>, Arc<EventLog>) {
    let log = Arc::new(EventLog::default());
    let motion = MotionCoordinator::new(channels, endstops, log.clone(), Duration::ZERO);
    (motion, log)
}

pub fn operator(gantry: &Gantry, reader: SimTagReader) -> SimOperator {
    operator_with(gantry, reader, channels(), Arc::new(EndstopMonitor::new()))
}

pub fn operator_with(
    gantry: &Gantry,
    reader: SimTagReader,
    channels: [SimPulseChannel; 3],
    endstops: Arc<EndstopMonitor>,
) -> SimOperator {
    let motion = MotionCoordinator::new(channels, endstops, gantry.event_log(), Duration::ZERO);
    CellOperator::new(
        motion,
        SimGripper::new(),
        reader,
        MemoryDisplay::new(),
        gantry.inventory_store(),
        gantry.event_log(),
        Timing::immediate(),
    )
}

pub fn log_contains(gantry: &Gantry, needle: &str) -> bool {
    gantry.history().iter().any(|line| line.contains(needle))
}
