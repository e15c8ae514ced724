use thiserror::Error;

use crate::axis::Axis;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum GantryError {
    #[error("invalid cell index {0}")]
    InvalidCellIndex(i32),
    #[error("invalid slot '{0}'")]
    InvalidSlot(String),
    #[error("movement queue full, command dropped")]
    QueueFull,
    #[error("motion worker is not running")]
    WorkerStopped,
    #[error("timed out waiting for the {0} lock")]
    LockTimeout(&'static str),
    #[error("motion aborted, endstop {0} tripped")]
    MotionAborted(Axis),
    #[error("axis {axis} target {target} outside travel 0..={max}")]
    OutOfTravel { axis: Axis, target: i32, max: i32 },
    #[error("slot {slot} occupied by {id}")]
    SlotOccupiedConflict { slot: &'static str, id: String },
    #[error("slot {0} is empty")]
    SlotEmptyConflict(&'static str),
    #[error("pallet dropped at {0} but no tag read back")]
    DropVerificationFailed(&'static str),
    #[error("bad request '{0}'")]
    BadRequest(String),
    #[error("peripheral fault: {0}")]
    Peripheral(String),
}
