use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::axis::Axis;
use crate::config::COMPLETION_MARGIN;
use crate::error::GantryError;
use crate::hw::PulseChannel;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AxisChannel {
    pub steps_remaining: u32,
    pub running: bool,
    pub direction: bool,
}

/// Longest a train of `steps` pulses may take before it is treated as done,
/// whatever the hardware counter says.
pub fn completion_bound(steps: u32, interval_us: u32) -> Duration {
    let nominal_us = steps as u64 * interval_us as u64;
    Duration::from_micros(nominal_us + nominal_us / 4) + COMPLETION_MARGIN
}

// same type for all three axes, only the channel and the axis constants differ
pub struct PulseGenerator<C> {
    axis: Axis,
    channel: C,
    state: AxisChannel,
    interval_us: u32,
    deadline: Option<Instant>,
}

impl<C: PulseChannel> PulseGenerator<C> {
    pub fn new(axis: Axis, channel: C) -> Self {
        Self {
            axis,
            channel,
            state: AxisChannel::default(),
            interval_us: axis.interval_us(),
            deadline: None,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn state(&self) -> AxisChannel {
        self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn program(&mut self, steps: u32, direction: bool, interval_us: u32) {
        self.state = AxisChannel {
            steps_remaining: steps,
            running: false,
            direction,
        };
        self.interval_us = interval_us;
        self.deadline = None;
    }

    /// Returns `false` without touching the hardware when nothing is programmed.
    pub fn start(&mut self) -> Result<bool, GantryError> {
        let steps = self.state.steps_remaining;
        if steps == 0 {
            return Ok(false);
        }

        self.channel.set_direction(self.state.direction)?;
        self.channel.begin(steps, self.interval_us)?;
        self.state.running = true;
        self.deadline = Some(Instant::now() + completion_bound(steps, self.interval_us));
        debug!(
            "motor {} started: {} steps @ {} us/step, dir={}",
            self.axis, steps, self.interval_us, self.state.direction as u8
        );
        Ok(true)
    }

    /// Refresh from the hardware counter, returns whether the train is still going.
    pub fn poll(&mut self) -> bool {
        if !self.state.running {
            return false;
        }

        let remaining = self.channel.pulses_remaining();
        self.state.steps_remaining = remaining;
        if remaining == 0 {
            self.finish();
            return false;
        }

        let overdue = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if overdue {
            warn!(
                "motor {} pulse train overran its time bound with {} steps reported left",
                self.axis, remaining
            );
            if let Err(err) = self.channel.halt() {
                warn!("motor {} halt failed: {err}", self.axis);
            }
            self.finish();
            return false;
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn stop(&mut self) -> Result<(), GantryError> {
        let halted = self.channel.halt();
        self.state.steps_remaining = 0;
        self.finish();
        halted
    }

    fn finish(&mut self) {
        self.state.running = false;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPulseChannel;

    #[test]
    fn zero_steps_never_reach_the_hardware() {
        let mut generator = PulseGenerator::new(Axis::Y, SimPulseChannel::new(100));
        generator.program(0, true, 800);
        assert!(!generator.start().unwrap());
        assert!(!generator.is_running());
        assert_eq!(generator.channel().starts(), 0);
    }

    #[test]
    fn hardware_countdown_ends_the_train() {
        let mut generator = PulseGenerator::new(Axis::X, SimPulseChannel::new(40));
        generator.program(100, false, 800);
        assert!(generator.start().unwrap());
        assert_eq!(generator.channel().direction(), Some(false));

        let mut polls = 0;
        while generator.poll() {
            polls += 1;
            assert!(polls < 10, "train never finished");
        }
        assert_eq!(generator.state().steps_remaining, 0);
        assert_eq!(generator.channel().emitted(), 100);
    }

    #[test]
    fn stalled_counter_is_cut_off_by_the_time_bound() {
        let mut generator = PulseGenerator::new(Axis::Z, SimPulseChannel::stalled());
        generator.program(5, true, 800);
        generator.start().unwrap();

        let started = Instant::now();
        while generator.poll() {
            std::thread::sleep(Duration::from_millis(1));
            assert!(started.elapsed() < Duration::from_secs(2), "time bound never fired");
        }
        assert!(started.elapsed() >= completion_bound(5, 800) - Duration::from_millis(1));
        assert!(generator.channel().halts() >= 1);
    }

    #[test]
    fn stop_clears_the_running_flag() {
        let mut generator = PulseGenerator::new(Axis::X, SimPulseChannel::stalled());
        generator.program(500, true, 800);
        generator.start().unwrap();
        assert!(generator.is_running());
        generator.stop().unwrap();
        assert!(!generator.is_running());
        assert_eq!(generator.state().steps_remaining, 0);
    }
}
