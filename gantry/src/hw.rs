//! Seams between the gantry logic and the board.
//!
//! The firmware implements these over ESP-IDF peripherals, `crate::sim`
//! implements them in memory for host runs and tests.

use crate::error::GantryError;
use crate::inventory::PalletId;

/// One axis' step output: a DIR line plus a hardware-timed, 50% duty pulse
/// train that counts itself down.
pub trait PulseChannel {
    fn set_direction(&mut self, level: bool) -> Result<(), GantryError>;

    /// Emit `pulses` step pulses spaced `interval_us` apart, without blocking.
    fn begin(&mut self, pulses: u32, interval_us: u32) -> Result<(), GantryError>;

    /// Stop emitting immediately.
    fn halt(&mut self) -> Result<(), GantryError>;

    /// Pulses still to be emitted by the current train, 0 once it has finished.
    fn pulses_remaining(&mut self) -> u32;
}

pub trait Gripper {
    fn gripper_on(&mut self) -> Result<(), GantryError>;
    fn gripper_off(&mut self) -> Result<(), GantryError>;
    fn gripper_state(&self) -> bool;
}

pub trait TagReader {
    /// Single attempt, `None` when no tag answered.
    fn scan_for_tag(&mut self) -> Option<PalletId>;
}

pub trait StatusDisplay {
    /// `text` arrives already padded to the display width.
    fn write_line(&mut self, slot: u8, text: &str);
}
