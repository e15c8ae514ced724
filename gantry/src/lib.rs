pub mod axis;
pub mod cell_op;
pub mod cells;
pub mod config;
pub mod console;
pub mod display;
pub mod endstop;
pub mod error;
pub mod event_log;
pub mod hw;
pub mod inventory;
pub mod motion;
pub mod pulse;
pub mod queue;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod worker;
mod util;

use std::sync::Arc;
use std::time::Duration;

use log::warn;

pub use axis::Axis;
pub use cell_op::{CellOperator, CellStage, Report};
pub use cells::{cell_from_label, cell_label, cell_to_steps};
pub use config::Timing;
pub use endstop::EndstopMonitor;
pub use error::GantryError;
pub use event_log::EventLog;
pub use inventory::{InventoryStore, PalletId};
pub use motion::{MachineState, MotionCoordinator, MoveOutcome};
pub use queue::{Command, CommandReceiver, MovementCommand};
pub use worker::Worker;

use config::{CELL_COUNT, LOCK_TIMEOUT, QUEUE_CAPACITY, SUBMIT_TIMEOUT};
use queue::{CommandSender, command_queue};

/// What the transport layer sees of the gantry: command submission plus
/// read access to the history and the inventory. Cheap to clone.
#[derive(Clone)]
pub struct Gantry {
    commands: CommandSender,
    inventory: Arc<InventoryStore>,
    log: Arc<EventLog>,
    submit_timeout: Duration,
}

impl Gantry {
    pub fn new() -> (Self, CommandReceiver) {
        Self::with_queue(QUEUE_CAPACITY, SUBMIT_TIMEOUT, LOCK_TIMEOUT)
    }

    pub fn with_queue(
        capacity: usize,
        submit_timeout: Duration,
        lock_timeout: Duration,
    ) -> (Self, CommandReceiver) {
        let log = Arc::new(EventLog::new(lock_timeout));
        let inventory = Arc::new(InventoryStore::new(lock_timeout));
        let (commands, receiver) = command_queue(capacity, log.clone());
        let gantry = Self {
            commands,
            inventory,
            log,
            submit_timeout,
        };
        (gantry, receiver)
    }

    pub fn event_log(&self) -> Arc<EventLog> {
        self.log.clone()
    }

    pub fn inventory_store(&self) -> Arc<InventoryStore> {
        self.inventory.clone()
    }

    pub fn submit_command(&self, cell_index: i32, is_store: bool) -> Result<(), GantryError> {
        let cmd = MovementCommand {
            cell_index,
            is_store,
        };
        match (cmd.is_home(), cell_label(cell_index)) {
            (true, _) => self.log.push("Request: return home (0,0,0)"),
            (false, Some(label)) => {
                let verb = if is_store { "STORE at" } else { "RETRIEVE from" };
                self.log.push(&format!("Request: {verb} slot {label}"))
            }
            (false, None) => false,
        };
        self.commands.submit(cmd, self.submit_timeout)
    }

    /// Same as `submit_command` with a slot label ("B1") instead of an index.
    pub fn submit_slot(&self, label: &str, is_store: bool) -> Result<(), GantryError> {
        let cell_index = cell_from_label(label).inspect_err(|err| {
            self.log
                .push(&format!("ERROR: invalid slot '{}' received", label.trim()));
            warn!("{err}");
        })?;
        self.submit_command(cell_index, is_store)
    }

    pub fn home(&self) -> Result<(), GantryError> {
        self.submit_command(config::HOME_CELL, false)
    }

    /// Queue a manual magnet toggle behind whatever is already waiting.
    pub fn toggle_gripper(&self) -> Result<(), GantryError> {
        self.log.push("Request: toggle gripper");
        self.commands.submit_toggle(self.submit_timeout)
    }

    /// Line from a remote client, stored as-is.
    pub fn push_log(&self, message: &str) -> bool {
        self.log.push(message)
    }

    pub fn read_log(&self, index: usize) -> Option<String> {
        self.log.get(index).map(|line| line.as_str().to_string())
    }

    pub fn log_count(&self) -> usize {
        self.log.count()
    }

    pub fn history(&self) -> Vec<String> {
        self.log
            .lines()
            .iter()
            .map(|line| line.as_str().to_string())
            .collect()
    }

    pub fn read_inventory(&self, cell_index: i32) -> Option<PalletId> {
        self.inventory.get(cell_index).unwrap_or_else(|err| {
            warn!("inventory read for cell {cell_index} failed: {err}");
            None
        })
    }

    pub fn inventory(&self) -> Vec<(&'static str, Option<PalletId>)> {
        let listed = self.inventory.with_slots(|slots| {
            (0..CELL_COUNT as i32)
                .filter_map(cell_label)
                .zip(slots.iter().cloned())
                .collect::<Vec<_>>()
        });
        match listed {
            Ok(listed) => listed,
            Err(err) => {
                warn!("inventory snapshot failed: {err}");
                Vec::new()
            }
        }
    }
}
