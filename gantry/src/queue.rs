use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::{CELL_COUNT, HOME_CELL};
use crate::error::GantryError;
use crate::event_log::EventLog;

// how often a blocked submit retries while its timeout runs
const RETRY_STEP: Duration = Duration::from_millis(5);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MovementCommand {
    pub cell_index: i32,
    pub is_store: bool,
}

impl MovementCommand {
    pub fn store(cell_index: i32) -> Self {
        Self {
            cell_index,
            is_store: true,
        }
    }

    pub fn retrieve(cell_index: i32) -> Self {
        Self {
            cell_index,
            is_store: false,
        }
    }

    pub fn home() -> Self {
        Self {
            cell_index: HOME_CELL,
            is_store: false,
        }
    }

    pub fn is_home(&self) -> bool {
        self.cell_index == HOME_CELL
    }

    pub fn validate(&self) -> Result<(), GantryError> {
        if self.is_home() || (0..CELL_COUNT as i32).contains(&self.cell_index) {
            Ok(())
        } else {
            Err(GantryError::InvalidCellIndex(self.cell_index))
        }
    }
}

/// What the motion worker takes off the queue. Manual gripper switching goes
/// through the same queue so it can never land in the middle of a cell cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Move(MovementCommand),
    ToggleGripper,
}

impl Command {
    pub fn movement(&self) -> Option<MovementCommand> {
        match self {
            Command::Move(cmd) => Some(*cmd),
            Command::ToggleGripper => None,
        }
    }
}

impl From<MovementCommand> for Command {
    fn from(cmd: MovementCommand) -> Self {
        Command::Move(cmd)
    }
}

/// Bounded queue between the submission path and the motion worker.
pub fn command_queue(capacity: usize, log: Arc<EventLog>) -> (CommandSender, CommandReceiver) {
    let (tx, rx) = sync_channel(capacity);
    (CommandSender { tx, log }, CommandReceiver { rx })
}

#[derive(Clone)]
pub struct CommandSender {
    tx: SyncSender<Command>,
    log: Arc<EventLog>,
}

impl CommandSender {
    /// Enqueue, giving up after `timeout`. A dropped command is logged and
    /// never retried.
    pub fn submit(&self, cmd: MovementCommand, timeout: Duration) -> Result<(), GantryError> {
        if let Err(err) = cmd.validate() {
            warn!("rejected {cmd:?}: {err}");
            self.log
                .push(&format!("ERROR: invalid cell index {} rejected", cmd.cell_index));
            return Err(err);
        }

        self.enqueue(Command::Move(cmd), timeout)
    }

    pub fn submit_toggle(&self, timeout: Duration) -> Result<(), GantryError> {
        self.enqueue(Command::ToggleGripper, timeout)
    }

    fn enqueue(&self, cmd: Command, timeout: Duration) -> Result<(), GantryError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.tx.try_send(cmd) {
                Ok(()) => {
                    debug!("queued {cmd:?}");
                    return Ok(());
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.log.push("ERROR: motion worker not running!");
                    return Err(GantryError::WorkerStopped);
                }
                Err(TrySendError::Full(_)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!("movement queue full, dropped {cmd:?}");
                        self.log.push("ERROR: movement queue is full!");
                        return Err(GantryError::QueueFull);
                    }
                    std::thread::sleep(RETRY_STEP.min(deadline - now));
                }
            }
        }
    }
}

pub struct CommandReceiver {
    rx: Receiver<Command>,
}

impl CommandReceiver {
    /// `None` once every sender is gone.
    pub fn next_blocking(&self) -> Option<Command> {
        self.rx.recv().ok()
    }

    pub fn try_next(&self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}
