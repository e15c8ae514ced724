// everything that moves between the console, the gantry and the operator
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use gantry::config::LOG_LINE_MAX;
use gantry::console::{LineReader, Request};
use gantry::{Gantry, GantryError, Report};
use log::{info, warn};

const CONSOLE_IDLE: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub enum CodecError {
    TooLarge,
    Invalid,
    Rejected(GantryError),
}

// turn a request into bytes and back, one console line per request
pub trait EventCodec: Sized {
    type Wire: AsRef<[u8]> + From<Vec<u8>>;
    fn encode(&self) -> Result<Self::Wire, CodecError>;
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

pub trait EventHandler {
    fn interested_in(&self) -> &'static [EventKind];
    fn handle(&mut self, evt: &Event) -> anyhow::Result<()>;
}

pub enum Event {
    Request(Request),
    Finished(Report),
}

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventKind {
    Request,
    Finished,
}

impl From<&Event> for EventKind {
    fn from(value: &Event) -> Self {
        match value {
            Event::Request(_) => EventKind::Request,
            Event::Finished(_) => EventKind::Finished,
        }
    }
}

pub type EventSender = Sender<Event>;
pub type EventReceiver = Receiver<Event>;

pub struct EventBus {
    sender: EventSender,
    receiver: EventReceiver,
    handlers: Vec<Box<dyn EventHandler + Send>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            handlers: Vec::new(),
        }
    }

    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn register_handler(&mut self, handler: Box<dyn EventHandler + Send>) {
        self.handlers.push(handler);
    }

    pub fn run(self) -> anyhow::Result<()> {
        let Self {
            sender,
            receiver,
            mut handlers,
        } = self;
        // the bus must not keep itself alive
        drop(sender);
        while let Ok(event) = receiver.recv() {
            let kind = EventKind::from(&event);
            for handler in handlers.iter_mut() {
                if handler.interested_in().iter().any(|k| *k == kind) {
                    if let Err(err) = handler.handle(&event) {
                        warn!("handler failed: {err:#}");
                    }
                }
            }
        }
        Ok(())
    }
}

impl EventCodec for Request {
    type Wire = Vec<u8>;

    fn encode(&self) -> Result<Self::Wire, CodecError> {
        let line = self.to_line();
        if line.len() > LOG_LINE_MAX {
            return Err(CodecError::TooLarge);
        }
        Ok(line.into_bytes())
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() > LOG_LINE_MAX {
            return Err(CodecError::TooLarge);
        }
        let line = std::str::from_utf8(bytes).map_err(|_| CodecError::Invalid)?;
        Request::parse(line).map_err(CodecError::Rejected)
    }
}

// answers console requests against the gantry
pub struct Dispatcher {
    gantry: Gantry,
}

impl Dispatcher {
    pub fn new(gantry: Gantry) -> Self {
        Self { gantry }
    }
}

impl EventHandler for Dispatcher {
    fn interested_in(&self) -> &'static [EventKind] {
        &[EventKind::Request]
    }

    fn handle(&mut self, evt: &Event) -> anyhow::Result<()> {
        let Event::Request(request) = evt else {
            return Ok(());
        };
        // replies lead with the request as it was understood
        let echo = String::from_utf8(request.encode().map_err(|err| anyhow!("{err:?}"))?)?;
        info!("console: {echo}");
        match request {
            Request::Store(slot) => queued(&echo, self.gantry.submit_slot(slot, true)),
            Request::Retrieve(slot) => queued(&echo, self.gantry.submit_slot(slot, false)),
            Request::Home => queued(&echo, self.gantry.home()),
            Request::ToggleGripper => queued(&echo, self.gantry.toggle_gripper()),
            Request::Log(msg) => {
                self.gantry.push_log(msg);
                println!("{echo}: ok");
            }
            Request::History => {
                println!("{echo}: {} lines", self.gantry.log_count());
                for (idx, line) in self.gantry.history().iter().enumerate() {
                    println!("{idx:3} {line}");
                }
            }
            Request::Inventory => {
                println!("{echo}:");
                for (label, id) in self.gantry.inventory() {
                    match id {
                        Some(id) => println!("{label}: {id}"),
                        None => println!("{label}: empty"),
                    }
                }
            }
        }
        Ok(())
    }
}

fn queued(echo: &str, result: Result<(), GantryError>) {
    match result {
        Ok(()) => println!("{echo}: queued"),
        Err(err) => println!("{echo}: rejected, {err}"),
    }
}

// prints the outcome of every finished command
pub struct Announcer;

impl EventHandler for Announcer {
    fn interested_in(&self) -> &'static [EventKind] {
        &[EventKind::Finished]
    }

    fn handle(&mut self, evt: &Event) -> anyhow::Result<()> {
        match evt {
            Event::Finished(Report::Success(label)) => println!("done: {label}"),
            Event::Finished(Report::Aborted { label, reason }) => {
                println!("aborted: {label}: {reason}")
            }
            Event::Request(_) => {}
        }
        Ok(())
    }
}

pub fn forward_reports(reports: Receiver<Report>, sender: EventSender) {
    for report in reports {
        if sender.send(Event::Finished(report)).is_err() {
            break;
        }
    }
}

// polls the console forever, one request per line. the uart console hands
// back partial lines and does not block on an empty buffer
pub fn read_console(sender: EventSender) {
    info!("console ready: store <slot> | retrieve <slot> | home | toggle | log <msg> | history | inventory");
    let mut console = LineReader::new(std::io::stdin().lock());
    loop {
        let line = match console.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                thread::sleep(CONSOLE_IDLE);
                continue;
            }
            Err(err) => {
                warn!("console read failed: {err}");
                thread::sleep(CONSOLE_IDLE);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match Request::decode(line.as_bytes()) {
            Ok(request) => {
                if sender.send(Event::Request(request)).is_err() {
                    break;
                }
            }
            Err(err) => println!("bad request {line:?}: {err:?}"),
        }
    }
}
