//! Line protocol spoken over the serial console:
//! `store <slot>`, `retrieve <slot>`, `home`, `toggle`, `log <msg>`,
//! `history`, `inventory`.

use std::io::{self, BufRead, ErrorKind};

use crate::error::GantryError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    Store(String),
    Retrieve(String),
    Home,
    ToggleGripper,
    Log(String),
    History,
    Inventory,
}

impl Request {
    /// Verb is case-insensitive, the argument is kept as typed.
    pub fn parse(line: &str) -> Result<Self, GantryError> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        let bad = || GantryError::BadRequest(line.to_string());
        let with_arg = |request: fn(String) -> Request| {
            if arg.is_empty() {
                Err(bad())
            } else {
                Ok(request(arg.to_string()))
            }
        };
        let without_arg = |request: Request| if arg.is_empty() { Ok(request) } else { Err(bad()) };

        match verb.to_ascii_lowercase().as_str() {
            "store" => with_arg(Request::Store),
            "retrieve" => with_arg(Request::Retrieve),
            "log" => with_arg(Request::Log),
            "home" => without_arg(Request::Home),
            "toggle" => without_arg(Request::ToggleGripper),
            "history" => without_arg(Request::History),
            "inventory" => without_arg(Request::Inventory),
            _ => Err(bad()),
        }
    }

    /// Canonical form, parses back to the same request.
    pub fn to_line(&self) -> String {
        match self {
            Request::Store(slot) => format!("store {slot}"),
            Request::Retrieve(slot) => format!("retrieve {slot}"),
            Request::Home => "home".to_string(),
            Request::ToggleGripper => "toggle".to_string(),
            Request::Log(msg) => format!("log {msg}"),
            Request::History => "history".to_string(),
            Request::Inventory => "inventory".to_string(),
        }
    }
}

/// Assembles whole lines from an input that may hand back part of a line and
/// then report `WouldBlock` or end of input, as the uart console does.
pub struct LineReader<R> {
    input: R,
    pending: String,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending: String::new(),
        }
    }

    /// `Ok(None)` until a full line is in. Partial input is kept for the next
    /// call.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.input.read_line(&mut self.pending) {
            Ok(_) => {}
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(err) => return Err(err),
        }
        if !self.pending.ends_with('\n') {
            return Ok(None);
        }
        let line = self.pending.trim().to_string();
        self.pending.clear();
        Ok(Some(line))
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}
