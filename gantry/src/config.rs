// machine constants. pins live with the firmware, everything here is
// independent of the board the gantry runs on.
use std::time::Duration;

pub const CELL_COUNT: usize = 6;

// cell_index sentinel for "return to origin"
pub const HOME_CELL: i32 = -1;

// measured on the machine
pub const STEPS_PER_MM_X: f32 = 50.0;
pub const STEPS_PER_MM_Y: f32 = 70.0;
pub const STEPS_PER_MM_Z: f32 = 50.0;

// physical travel of each axis, origin is the top/left corner
pub const X_TRAVEL_MM: f32 = 300.0;
pub const Y_TRAVEL_MM: f32 = 180.0;
pub const Z_TRAVEL_MM: f32 = 45.0;

pub const Z_SAFE_MM: f32 = 0.0;
pub const Z_PICKUP_MM: f32 = 45.0;
pub const Z_RETURN_MM: f32 = 0.0;

// time between step pulses, z runs slower
pub const STEP_INTERVAL_XY_US: u32 = 800;
pub const STEP_INTERVAL_Z_US: u32 = 1200;

// slack on top of steps * interval before a pulse train is declared finished
pub const COMPLETION_MARGIN: Duration = Duration::from_millis(50);

pub const QUEUE_CAPACITY: usize = 5;
pub const SUBMIT_TIMEOUT: Duration = Duration::from_millis(100);
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(100);

pub const ENDSTOP_SAMPLE_HZ: u32 = 100;

// freertos tick, CONFIG_FREERTOS_HZ=1000 in sdkconfig.defaults. a sleep
// shorter than one tick busy-waits under esp-idf, so no periodic delay may
// go below it
pub const SCHEDULER_TICK: Duration = Duration::from_millis(1);

pub const LOG_CAPACITY: usize = 120;
pub const LOG_LINE_MAX: usize = 128;

// "12 34 56 78 9A BB CC DD EE FF" fits with room to spare
pub const PALLET_ID_MAX: usize = 32;

// 16x2 character display
pub const STATUS_WIDTH: usize = 16;
pub const STATUS_LINES: u8 = 2;

/// Delays used by the cell cycle and the motion wait loop.
///
/// `Default` gives the values the machine runs with. Tests build one with
/// zero delays so a full cycle runs in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub settle: Duration,
    pub gripper_settle: Duration,
    pub scan_attempts: u8,
    pub scan_retry: Duration,
    pub motion_poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(250),
            gripper_settle: Duration::from_millis(500),
            scan_attempts: 2,
            scan_retry: Duration::from_millis(50),
            motion_poll: Duration::from_millis(1),
        }
    }
}

impl Timing {
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            gripper_settle: Duration::ZERO,
            scan_attempts: 2,
            scan_retry: Duration::ZERO,
            motion_poll: Duration::ZERO,
        }
    }
}

// sleep that still gives the scheduler a turn when the delay is zero
pub(crate) fn pause(delay: Duration) {
    if delay.is_zero() {
        std::thread::yield_now();
    } else {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_tick_matches_the_scheduler_tick() {
        let sdkconfig = include_str!("../../sdkconfig.defaults");
        let hz = sdkconfig
            .lines()
            .find_map(|line| line.trim().strip_prefix("CONFIG_FREERTOS_HZ="))
            .and_then(|hz| hz.parse::<u64>().ok())
            .unwrap();
        assert_eq!(Duration::from_millis(1000 / hz), SCHEDULER_TICK);
    }

    #[test]
    fn periodic_delays_block_instead_of_spinning() {
        let timing = Timing::default();
        for delay in [
            timing.motion_poll,
            timing.scan_retry,
            timing.settle,
            timing.gripper_settle,
        ] {
            assert!(delay >= SCHEDULER_TICK, "{delay:?} is shorter than a tick");
        }
    }
}
