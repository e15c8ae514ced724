use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::cell_op::{CellOperator, Report};
use crate::hw::{Gripper, PulseChannel, StatusDisplay, TagReader};
use crate::queue::CommandReceiver;

/// The single motion task. Takes commands off the queue one at a time and
/// runs each to its report before looking at the next.
pub struct Worker<C, G, R, D> {
    operator: CellOperator<C, G, R, D>,
    reports: Option<Sender<Report>>,
}

impl<C, G, R, D> Worker<C, G, R, D>
where
    C: PulseChannel,
    G: Gripper,
    R: TagReader,
    D: StatusDisplay,
{
    pub fn new(operator: CellOperator<C, G, R, D>) -> Self {
        Self {
            operator,
            reports: None,
        }
    }

    /// Forward every report, e.g. to whatever answers the remote caller.
    pub fn with_reports(mut self, reports: Sender<Report>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Runs until every command sender is dropped, then hands the operator
    /// back.
    pub fn run(mut self, commands: CommandReceiver) -> CellOperator<C, G, R, D> {
        if let Err(err) = self.operator.prepare() {
            error!("could not reach travel height at startup: {err}");
        }

        while let Some(cmd) = commands.next_blocking() {
            let report = self.operator.handle(cmd);
            if let Some(reports) = &self.reports {
                // nobody listening is fine
                let _ = reports.send(report);
            }
        }
        info!("command queue closed, motion worker exiting");
        self.operator
    }
}

impl<C, G, R, D> Worker<C, G, R, D>
where
    C: PulseChannel + Send + 'static,
    G: Gripper + Send + 'static,
    R: TagReader + Send + 'static,
    D: StatusDisplay + Send + 'static,
{
    pub fn spawn(
        self,
        commands: CommandReceiver,
        stack_size: usize,
    ) -> io::Result<JoinHandle<CellOperator<C, G, R, D>>> {
        thread::Builder::new()
            .name("motion".into())
            .stack_size(stack_size)
            .spawn(move || self.run(commands))
    }
}
