#![cfg(feature = "sim")]

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gantry::endstop::EndstopMonitor;
use gantry::sim::{EndstopLines, SimPulseChannel, spawn_sampler};
use gantry::{Axis, GantryError, MachineState, MoveOutcome};

use common::{BURST, channels, coordinator};

#[test]
fn completed_move_commits_the_target() {
    let endstops = Arc::new(EndstopMonitor::new());
    let (mut motion, _log) = coordinator(channels(), endstops);

    let outcome = motion.move_to(5026, 1278, 2250).unwrap();
    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(
        motion.position(),
        MachineState {
            x: 5026,
            y: 1278,
            z: 2250
        }
    );
    assert_eq!(motion.generator(Axis::X).channel().emitted(), 5026);
    assert_eq!(motion.generator(Axis::Z).channel().emitted(), 2250);
    for axis in Axis::ALL {
        assert!(!motion.generator(axis).is_running());
    }
}

#[test]
fn repeated_target_starts_nothing() {
    let endstops = Arc::new(EndstopMonitor::new());
    let (mut motion, _log) = coordinator(channels(), endstops);

    motion.move_to(100, 200, 300).unwrap();
    let before = motion.position();
    let outcome = motion.move_to(100, 200, 300).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(motion.position(), before);
    for axis in Axis::ALL {
        assert_eq!(motion.generator(axis).channel().starts(), 1, "axis {axis}");
    }
}

#[test]
fn direction_follows_axis_polarity() {
    let endstops = Arc::new(EndstopMonitor::new());
    let (mut motion, _log) = coordinator(channels(), endstops);

    motion.move_to(1000, 1000, 1000).unwrap();
    assert_eq!(motion.generator(Axis::X).channel().direction(), Some(false));
    assert_eq!(motion.generator(Axis::Y).channel().direction(), Some(true));
    assert_eq!(motion.generator(Axis::Z).channel().direction(), Some(true));

    motion.move_to(0, 0, 0).unwrap();
    assert_eq!(motion.generator(Axis::X).channel().direction(), Some(true));
    assert_eq!(motion.generator(Axis::Y).channel().direction(), Some(false));
}

#[test]
fn endstop_trip_aborts_and_holds_position() {
    let endstops = Arc::new(EndstopMonitor::new());
    let x = SimPulseChannel::new(BURST).tripping(endstops.clone(), Axis::X, 1200);
    let [_, y, z] = channels();
    let (mut motion, log) = coordinator([x, y, z], endstops.clone());

    let outcome = motion.move_to(5000, 3000, 0).unwrap();

    assert_eq!(outcome, MoveOutcome::Aborted(Axis::X));
    assert_eq!(motion.position(), MachineState::default());
    for axis in Axis::ALL {
        assert!(!motion.generator(axis).is_running(), "axis {axis} still running");
    }
    assert!(motion.generator(Axis::X).channel().halts() >= 1);
    assert!(motion.generator(Axis::X).channel().emitted() < 5000);
    let lines = log.lines();
    assert!(lines.iter().any(|line| line.contains("endstop X tripped")));
}

#[test]
fn sampled_endstop_stops_a_hung_move() {
    let endstops = Arc::new(EndstopMonitor::new());
    let lines = Arc::new(EndstopLines::default());
    let _sampler = spawn_sampler(endstops.clone(), lines.clone(), Duration::from_millis(10));

    let [x, y, _] = channels();
    let (mut motion, _log) = coordinator([x, y, SimPulseChannel::stalled()], endstops.clone());

    let presser = {
        let lines = lines.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            lines.press(Axis::Z);
        })
    };

    let started = Instant::now();
    let outcome = motion.move_to(0, 0, 2000).unwrap();
    presser.join().unwrap();

    assert_eq!(outcome, MoveOutcome::Aborted(Axis::Z));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(motion.position().z, 0);
    assert!(endstops.is_triggered(Axis::Z));
    assert!(endstops.sample_count() > 0);
}

#[test]
fn hung_pulse_source_still_completes() {
    let endstops = Arc::new(EndstopMonitor::new());
    let [x, y, _] = channels();
    let (mut motion, _log) = coordinator([x, y, SimPulseChannel::stalled()], endstops);

    let outcome = motion.move_to(0, 0, 10).unwrap();

    assert_eq!(outcome, MoveOutcome::Completed);
    assert_eq!(motion.position().z, 10);
    assert!(motion.generator(Axis::Z).channel().halts() >= 1);
}

#[test]
fn targets_outside_travel_are_refused() {
    let endstops = Arc::new(EndstopMonitor::new());
    let (mut motion, _log) = coordinator(channels(), endstops);

    let err = motion.move_to(-1, 0, 0).unwrap_err();
    assert_eq!(
        err,
        GantryError::OutOfTravel {
            axis: Axis::X,
            target: -1,
            max: 15_000
        }
    );
    assert!(motion.move_to(0, 0, 2251).is_err());
    assert_eq!(motion.position(), MachineState::default());
    assert_eq!(motion.generator(Axis::X).channel().starts(), 0);
}

#[test]
fn z_only_move_keeps_xy() {
    let endstops = Arc::new(EndstopMonitor::new());
    let (mut motion, _log) = coordinator(channels(), endstops);

    motion.move_to(300, 400, 0).unwrap();
    motion.move_z(1500).unwrap();
    assert_eq!(
        motion.position(),
        MachineState {
            x: 300,
            y: 400,
            z: 1500
        }
    );
    assert_eq!(motion.generator(Axis::X).channel().starts(), 1);
}
