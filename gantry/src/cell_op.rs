use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::axis::{Axis, mm_to_steps};
use crate::cells::{cell_label, cell_position, cell_to_steps};
use crate::config::{Timing, Z_PICKUP_MM, Z_RETURN_MM, Z_SAFE_MM, pause};
use crate::display::status_line;
use crate::error::GantryError;
use crate::event_log::EventLog;
use crate::hw::{Gripper, PulseChannel, StatusDisplay, TagReader};
use crate::inventory::{InventoryStore, PalletId};
use crate::motion::{MotionCoordinator, MoveOutcome};
use crate::queue::{Command, MovementCommand};
use crate::util::tail;

pub const HOME_LABEL: &str = "HOME";
pub const GRIPPER_LABEL: &str = "GRIPPER";
const UNKNOWN_LABEL: &str = "??";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CellStage {
    RaiseToSafeZ,
    MoveXY,
    LowerToPickHeight,
    Settle,
    ScanTag,
    Pickup,
    Store,
    RaiseToReturnHeight,
    Report,
}

impl CellStage {
    fn status(self) -> &'static str {
        match self {
            CellStage::RaiseToSafeZ => "Moving Z-Safe",
            CellStage::MoveXY => "Moving X/Y...",
            CellStage::LowerToPickHeight => "Lowering Z...",
            CellStage::Settle => "Settling...",
            CellStage::ScanTag => "Reading RFID...",
            CellStage::Pickup => "Picking up...",
            CellStage::Store => "Dropping...",
            CellStage::RaiseToReturnHeight => "Returning Z...",
            CellStage::Report => "",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Store,
    Retrieve,
    Home,
}

impl Operation {
    fn of(cmd: &MovementCommand) -> Self {
        if cmd.is_home() {
            Operation::Home
        } else if cmd.is_store {
            Operation::Store
        } else {
            Operation::Retrieve
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Operation::Store => "Storing",
            Operation::Retrieve => "Retrieving",
            Operation::Home => "Homing",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Operation::Store => "Store",
            Operation::Retrieve => "Retrieve",
            Operation::Home => "Home",
        }
    }
}

/// Externally visible result of one command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Report {
    Success(&'static str),
    Aborted {
        label: &'static str,
        reason: GantryError,
    },
}

impl Report {
    pub fn label(&self) -> &'static str {
        match self {
            Report::Success(label) => label,
            Report::Aborted { label, .. } => label,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Report::Success(_))
    }
}

/// Runs store/retrieve/home commands end to end. Owns the motion
/// coordinator and every actuator, so only the task holding it can move the
/// machine.
pub struct CellOperator<C, G, R, D> {
    motion: MotionCoordinator<C>,
    gripper: G,
    reader: R,
    display: D,
    inventory: Arc<InventoryStore>,
    log: Arc<EventLog>,
    timing: Timing,
    stages: Vec<CellStage>,
}

impl<C, G, R, D> CellOperator<C, G, R, D>
where
    C: PulseChannel,
    G: Gripper,
    R: TagReader,
    D: StatusDisplay,
{
    pub fn new(
        motion: MotionCoordinator<C>,
        gripper: G,
        reader: R,
        display: D,
        inventory: Arc<InventoryStore>,
        log: Arc<EventLog>,
        timing: Timing,
    ) -> Self {
        Self {
            motion,
            gripper,
            reader,
            display,
            inventory,
            log,
            timing,
            stages: Vec::new(),
        }
    }

    pub fn motion(&self) -> &MotionCoordinator<C> {
        &self.motion
    }

    pub fn gripper(&self) -> &G {
        &self.gripper
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Stages the last cell cycle went through, in order.
    pub fn stages(&self) -> &[CellStage] {
        &self.stages
    }

    /// Bring the head up to the travel height before the first command.
    /// There are no homing switches to seek, the power-on position is taken
    /// as the origin.
    pub fn prepare(&mut self) -> Result<(), GantryError> {
        self.log.push("CNC: position assumed at origin (0,0,0)");
        self.show(0, "Status: Ready");
        self.show(1, "");
        let z_safe = mm_to_steps(Axis::Z, Z_SAFE_MM);
        completed(self.motion.move_z(z_safe))
    }

    pub fn handle(&mut self, cmd: Command) -> Report {
        match cmd {
            Command::Move(cmd) => self.execute(cmd),
            Command::ToggleGripper => self.toggle_gripper(),
        }
    }

    /// Manual magnet switch, the head stays where it is.
    pub fn toggle_gripper(&mut self) -> Report {
        let switched = if self.gripper.gripper_state() {
            self.gripper.gripper_off()
        } else {
            self.gripper.gripper_on()
        };
        match switched {
            Ok(()) => {
                let state = if self.gripper.gripper_state() { "ON" } else { "OFF" };
                info!("gripper switched {state}");
                self.log.push(&format!("Gripper {state}"));
                self.show(1, &format!("Magnet {state}"));
                Report::Success(GRIPPER_LABEL)
            }
            Err(reason) => {
                error!("gripper toggle failed: {reason}");
                self.log.push(&format!("ERROR: gripper toggle failed: {reason}"));
                self.show(1, "Fail: Magnet");
                Report::Aborted {
                    label: GRIPPER_LABEL,
                    reason,
                }
            }
        }
    }

    pub fn execute(&mut self, cmd: MovementCommand) -> Report {
        let operation = Operation::of(&cmd);
        if operation == Operation::Home {
            return self.go_home();
        }

        self.stages.clear();
        let Some(label) = cell_label(cmd.cell_index) else {
            error!("command for unknown cell {}", cmd.cell_index);
            self.log
                .push(&format!("CNC: error, cell {} invalid", cmd.cell_index));
            self.show(0, "ERROR: Bad Cell");
            return self.report(
                operation,
                UNKNOWN_LABEL,
                Err(GantryError::InvalidCellIndex(cmd.cell_index)),
            );
        };

        info!("{} cell {} ({label})", operation.verb(), cmd.cell_index);
        let outcome = self.run_cycle(cmd.cell_index, label, operation);
        self.enter(CellStage::Report);
        self.report(operation, label, outcome)
    }

    fn run_cycle(
        &mut self,
        cell_index: i32,
        label: &'static str,
        operation: Operation,
    ) -> Result<(), GantryError> {
        let cell = cell_position(cell_index)?;
        let (x, y) = cell_to_steps(cell_index)?;
        let z_safe = mm_to_steps(Axis::Z, Z_SAFE_MM);
        let z_pick = mm_to_steps(Axis::Z, Z_PICKUP_MM);
        let z_return = mm_to_steps(Axis::Z, Z_RETURN_MM);

        self.log.push(&format!(
            "CNC: {} {label} (X:{:.1}, Y:{:.1})",
            operation.verb(),
            cell.x_mm,
            cell.y_mm
        ));
        self.show(0, &format!("{} {label}", operation.verb()));

        // any interlock trip on the way down ends the cycle where it stands
        self.enter(CellStage::RaiseToSafeZ);
        completed(self.motion.move_z(z_safe))?;

        self.enter(CellStage::MoveXY);
        completed(self.motion.move_to(x, y, z_safe))?;

        self.enter(CellStage::LowerToPickHeight);
        completed(self.motion.move_z(z_pick))?;

        self.enter(CellStage::Settle);
        pause(self.timing.settle);

        self.enter(CellStage::ScanTag);
        let present = self.scan_tag();

        let handled = match operation {
            Operation::Store => self.store(cell_index, label, present),
            _ => self.pickup(cell_index, label, present),
        };

        self.enter(CellStage::RaiseToReturnHeight);
        let raised = completed(self.motion.move_z(z_return));
        handled.and(raised)
    }

    fn pickup(
        &mut self,
        cell_index: i32,
        label: &'static str,
        present: Option<PalletId>,
    ) -> Result<(), GantryError> {
        self.enter(CellStage::Pickup);
        let Some(id) = present else {
            self.log.push(&format!(
                "ERROR: slot {label} is EMPTY, retrieve aborted"
            ));
            self.show(1, "ERROR: Slot Empty");
            return Err(GantryError::SlotEmptyConflict(label));
        };

        self.log.push(&format!(
            "Pallet [..{}] found at {label}, retrieving",
            tail(&id, 9)
        ));
        self.show(1, "Pallet OK. Grip");
        self.gripper.gripper_on()?;
        pause(self.timing.gripper_settle);

        // the magnet stays on, the pallet travels with the head
        self.update_inventory(cell_index, label, None);
        Ok(())
    }

    fn store(
        &mut self,
        cell_index: i32,
        label: &'static str,
        present: Option<PalletId>,
    ) -> Result<(), GantryError> {
        self.enter(CellStage::Store);
        if let Some(id) = present {
            self.log.push(&format!(
                "ERROR: slot {label} is OCCUPIED (UID: {id}), store aborted"
            ));
            self.show(1, "ERROR: Slot Busy");
            return Err(GantryError::SlotOccupiedConflict {
                slot: label,
                id: id.to_string(),
            });
        }

        self.show(1, "Slot empty. Drop");
        self.gripper.gripper_off()?;
        pause(self.timing.gripper_settle);

        match self.scan_tag() {
            Some(id) => {
                self.log.push(&format!(
                    "Pallet [..{}] stored at {label}",
                    tail(&id, 9)
                ));
                self.show(1, "Drop OK.");
                self.update_inventory(cell_index, label, Some(&id));
            }
            None => {
                let warning = GantryError::DropVerificationFailed(label);
                warn!("{warning}");
                self.log
                    .push(&format!("ALERT: {warning}, inventory not updated"));
                self.show(1, "Alert: Drop fail?");
            }
        }
        Ok(())
    }

    fn go_home(&mut self) -> Report {
        info!("returning to origin");
        self.log.push("CNC: returning home (0,0,0)");
        self.show(0, "Returning Home");
        self.show(1, "Please wait...");
        let outcome = completed(self.motion.move_to(0, 0, 0));
        self.report(Operation::Home, HOME_LABEL, outcome)
    }

    fn report(
        &mut self,
        operation: Operation,
        label: &'static str,
        outcome: Result<(), GantryError>,
    ) -> Report {
        self.show(0, "Status: Ready");
        match outcome {
            Ok(()) => {
                info!("{} {label} complete", operation.noun());
                self.log
                    .push(&format!("CNC: {} {label} complete.", operation.noun()));
                self.show(1, &format!("{label} Done"));
                Report::Success(label)
            }
            Err(reason) => {
                warn!("{} {label} aborted: {reason}", operation.noun());
                self.log.push(&format!(
                    "CNC: {} {label} ABORTED: {reason}",
                    operation.noun()
                ));
                self.show(1, &format!("Fail: {}", short_reason(&reason)));
                Report::Aborted { label, reason }
            }
        }
    }

    fn scan_tag(&mut self) -> Option<PalletId> {
        let attempts = self.timing.scan_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(id) = self.reader.scan_for_tag() {
                debug!("tag {id} on attempt {attempt}");
                return Some(id);
            }
            if attempt < attempts {
                pause(self.timing.scan_retry);
            }
        }
        None
    }

    // one retry on a busy lock, after that the record is knowingly stale
    fn update_inventory(&mut self, cell_index: i32, label: &str, id: Option<&str>) {
        let attempt = || match id {
            Some(id) => self.inventory.set(cell_index, id),
            None => self.inventory.clear(cell_index).map(|_| ()),
        };
        let result = attempt().or_else(|err| match err {
            GantryError::LockTimeout(_) => attempt(),
            other => Err(other),
        });
        if let Err(err) = result {
            error!("inventory for {label} not updated: {err}");
            self.log.push(&format!(
                "WARNING: inventory for {label} not updated ({err}), record may be wrong"
            ));
        }
    }

    fn enter(&mut self, stage: CellStage) {
        debug!("stage {stage:?}");
        self.stages.push(stage);
        let status = stage.status();
        if !status.is_empty() {
            self.show(1, status);
        }
    }

    fn show(&mut self, slot: u8, text: &str) {
        self.display.write_line(slot, &status_line(text));
    }
}

fn completed(moved: Result<MoveOutcome, GantryError>) -> Result<(), GantryError> {
    match moved? {
        MoveOutcome::Completed => Ok(()),
        MoveOutcome::Aborted(axis) => Err(GantryError::MotionAborted(axis)),
    }
}

fn short_reason(reason: &GantryError) -> String {
    match reason {
        GantryError::SlotOccupiedConflict { .. } => "Occupied".to_string(),
        GantryError::SlotEmptyConflict(_) => "Empty".to_string(),
        GantryError::MotionAborted(axis) => format!("Endstop {axis}"),
        GantryError::InvalidCellIndex(_) => "Bad Cell".to_string(),
        GantryError::OutOfTravel { axis, .. } => format!("Travel {axis}"),
        _ => "Error".to_string(),
    }
}
