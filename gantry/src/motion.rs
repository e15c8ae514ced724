use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::axis::Axis;
use crate::config::pause;
use crate::endstop::EndstopMonitor;
use crate::error::GantryError;
use crate::event_log::EventLog;
use crate::hw::PulseChannel;
use crate::pulse::PulseGenerator;

/// Absolute position of each axis in steps. Only ever reflects travel that
/// finished, never the target of an interrupted move.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MachineState {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl MachineState {
    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MoveOutcome {
    Completed,
    Aborted(Axis),
}

pub struct MotionCoordinator<C> {
    generators: [PulseGenerator<C>; 3],
    endstops: Arc<EndstopMonitor>,
    log: Arc<EventLog>,
    position: MachineState,
    poll: Duration,
}

impl<C: PulseChannel> MotionCoordinator<C> {
    pub fn new(
        channels: [C; 3],
        endstops: Arc<EndstopMonitor>,
        log: Arc<EventLog>,
        poll: Duration,
    ) -> Self {
        let [x, y, z] = channels;
        Self {
            generators: [
                PulseGenerator::new(Axis::X, x),
                PulseGenerator::new(Axis::Y, y),
                PulseGenerator::new(Axis::Z, z),
            ],
            endstops,
            log,
            position: MachineState::default(),
            poll,
        }
    }

    pub fn position(&self) -> MachineState {
        self.position
    }

    pub fn generator(&self, axis: Axis) -> &PulseGenerator<C> {
        &self.generators[axis.index()]
    }

    pub fn move_z(&mut self, z: i32) -> Result<MoveOutcome, GantryError> {
        let MachineState { x, y, .. } = self.position;
        self.move_to(x, y, z)
    }

    /// Blocks the calling task until every axis has arrived or an endstop
    /// trips, sleeping between checks so other tasks keep running.
    pub fn move_to(&mut self, x: i32, y: i32, z: i32) -> Result<MoveOutcome, GantryError> {
        let target = MachineState { x, y, z };
        for axis in Axis::ALL {
            let max = axis.travel_max_steps();
            let value = target.get(axis);
            if !(0..=max).contains(&value) {
                return Err(GantryError::OutOfTravel {
                    axis,
                    target: value,
                    max,
                });
            }
        }

        self.endstops.reset();

        let mut started = 0;
        for axis in Axis::ALL {
            let delta = target.get(axis) - self.position.get(axis);
            let generator = &mut self.generators[axis.index()];
            generator.program(
                delta.unsigned_abs(),
                axis.direction_level(delta),
                axis.interval_us(),
            );
            match generator.start() {
                Ok(true) => started += 1,
                Ok(false) => {}
                Err(err) => {
                    error!("motor {axis} failed to start: {err}");
                    self.halt_all();
                    return Err(err);
                }
            }
        }

        if started == 0 {
            debug!("already at ({x}, {y}, {z})");
            return Ok(MoveOutcome::Completed);
        }

        loop {
            if let Some(axis) = self.endstops.tripped_axis() {
                self.halt_all();
                warn!(
                    "endstop {axis} tripped on the way to ({x}, {y}, {z}), position held at {:?}",
                    self.position
                );
                self.log
                    .push(&format!("ALERT: endstop {axis} tripped - motion stopped"));
                return Ok(MoveOutcome::Aborted(axis));
            }

            // poll every generator, no short circuit
            let running = self
                .generators
                .iter_mut()
                .fold(false, |any, generator| generator.poll() | any);
            if !running {
                break;
            }
            pause(self.poll);
        }

        self.position = target;
        self.endstops.reset();
        info!("move complete at ({x}, {y}, {z})");
        Ok(MoveOutcome::Completed)
    }

    fn halt_all(&mut self) {
        for generator in self.generators.iter_mut() {
            if let Err(err) = generator.stop() {
                error!("motor {} did not stop cleanly: {err}", generator.axis());
            }
        }
    }
}
