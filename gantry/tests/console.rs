use std::collections::VecDeque;
use std::io::{self, BufReader, ErrorKind, Read};

use gantry::GantryError;
use gantry::console::{LineReader, Request};

// hands out one chunk per read, like a uart fifo drained faster than it fills
struct Uart {
    chunks: VecDeque<Option<&'static [u8]>>,
}

impl Uart {
    // `None` reads back as WouldBlock
    fn new(chunks: impl IntoIterator<Item = Option<&'static str>>) -> BufReader<Self> {
        BufReader::new(Self {
            chunks: chunks.into_iter().map(|c| c.map(str::as_bytes)).collect(),
        })
    }
}

impl Read for Uart {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(Some(chunk)) => {
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            Some(None) => Err(ErrorKind::WouldBlock.into()),
            None => Ok(0),
        }
    }
}

#[test]
fn line_split_across_reads_is_kept_whole() {
    let mut console = LineReader::new(Uart::new([
        Some("sto"),
        None,
        Some("re B"),
        None,
        Some("1\n"),
        Some("home\n"),
    ]));

    assert_eq!(console.next_line().unwrap(), None);
    assert_eq!(console.pending(), "sto");
    assert_eq!(console.next_line().unwrap(), None);
    assert_eq!(console.next_line().unwrap().as_deref(), Some("store B1"));
    assert_eq!(console.next_line().unwrap().as_deref(), Some("home"));
    assert_eq!(console.next_line().unwrap(), None);
    assert_eq!(console.pending(), "");
}

#[test]
fn empty_input_yields_nothing() {
    let mut console = LineReader::new(Uart::new([None, None]));
    assert_eq!(console.next_line().unwrap(), None);
    assert_eq!(console.next_line().unwrap(), None);
    assert_eq!(console.next_line().unwrap(), None);
}

#[test]
fn requests_parse_from_console_lines() {
    assert_eq!(
        Request::parse("store b1"),
        Ok(Request::Store("b1".to_string()))
    );
    assert_eq!(
        Request::parse("  RETRIEVE  C2 "),
        Ok(Request::Retrieve("C2".to_string()))
    );
    assert_eq!(Request::parse("home"), Ok(Request::Home));
    assert_eq!(Request::parse("toggle"), Ok(Request::ToggleGripper));
    assert_eq!(
        Request::parse("log pallet 7 inbound"),
        Ok(Request::Log("pallet 7 inbound".to_string()))
    );
}

#[test]
fn malformed_requests_are_refused() {
    for line in ["", "store", "retrieve   ", "home now", "jump B1"] {
        assert_eq!(
            Request::parse(line),
            Err(GantryError::BadRequest(line.trim().to_string())),
            "{line:?}"
        );
    }
}

#[test]
fn canonical_form_reads_back() {
    let typed = Request::parse("Store   a2").unwrap();
    assert_eq!(typed.to_line(), "store a2");
    assert_eq!(Request::parse(&typed.to_line()), Ok(typed));
}
