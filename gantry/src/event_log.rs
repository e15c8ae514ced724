use std::collections::VecDeque;
use std::time::Duration;

use heapless::String;
use log::warn;
use parking_lot::Mutex;

use crate::config::{LOCK_TIMEOUT, LOG_CAPACITY, LOG_LINE_MAX};
use crate::util::truncated;

pub type LogLine = String<LOG_LINE_MAX>;

/// Operator-facing history: the last `LOG_CAPACITY` lines, oldest first.
/// Written by the worker and the submission path, read by the transport.
pub struct EventLog {
    // heap backed, the ring is ~15 KiB and must not pass through a task stack
    ring: Mutex<VecDeque<LogLine>>,
    lock_timeout: Duration,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(LOCK_TIMEOUT)
    }
}

impl EventLog {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(LOG_CAPACITY)),
            lock_timeout,
        }
    }

    /// Returns `false` when the line was dropped because the lock stayed busy.
    pub fn push(&self, line: &str) -> bool {
        let entry: LogLine = truncated(line);
        let Some(mut ring) = self.ring.try_lock_for(self.lock_timeout) else {
            warn!("event log busy, dropped: {line}");
            return false;
        };
        if ring.len() == LOG_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(entry);
        true
    }

    pub fn get(&self, index: usize) -> Option<LogLine> {
        self.ring.try_lock_for(self.lock_timeout)?.get(index).cloned()
    }

    pub fn count(&self) -> usize {
        self.ring
            .try_lock_for(self.lock_timeout)
            .map(|ring| ring.len())
            .unwrap_or(0)
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.ring
            .try_lock_for(self.lock_timeout)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn oldest_lines_are_overwritten() {
        let log = EventLog::default();
        for n in 0..LOG_CAPACITY + 3 {
            log.push(&format!("line {n}"));
        }
        assert_eq!(log.count(), LOG_CAPACITY);
        assert_eq!(log.get(0).unwrap().as_str(), "line 3");
        assert_eq!(
            log.get(LOG_CAPACITY - 1).unwrap().as_str(),
            format!("line {}", LOG_CAPACITY + 2)
        );
        assert!(log.get(LOG_CAPACITY).is_none());
    }

    #[test]
    fn long_lines_are_cut_to_width() {
        let log = EventLog::default();
        log.push(&"x".repeat(LOG_LINE_MAX * 2));
        assert_eq!(log.get(0).unwrap().len(), LOG_LINE_MAX);
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let log = Arc::new(EventLog::default());
        let writers: Vec<_> = (0..2)
            .map(|w| {
                let log = log.clone();
                thread::spawn(move || {
                    for n in 0..50 {
                        assert!(log.push(&format!("w{w} {n}")));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(log.count(), 100);
    }

    #[test]
    fn busy_lock_drops_the_line() {
        let log = EventLog::new(Duration::from_millis(5));
        let guard = log.ring.lock();
        let pushed = thread::scope(|s| s.spawn(|| log.push("late")).join().unwrap());
        drop(guard);
        assert!(!pushed);
        assert_eq!(log.count(), 0);
    }
}
