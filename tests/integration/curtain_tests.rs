//! Curtain task: busy rejection, stop checkpoints and end positions.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use roomhub::actuators::curtain::{Curtain, CurtainCommand, CurtainPosition, Motion};
use roomhub::actuators::{Outcome, Rejection};
use roomhub::actuators::runtime::TaskPhase;
use roomhub::app::events::DeviceEvent;
use roomhub::app::ports::EventSink;

use crate::mock_hw::{RecordingSink, spawn_curtain, wait_until};

const STROKE_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn open_when_open_is_a_no_op() {
    let sink = RecordingSink::new();
    let (curtain, _pins) = spawn_curtain(CurtainPosition::Open, sink.clone());

    assert_eq!(curtain.open(), Ok(Outcome::AlreadyOpen));
    std::thread::sleep(Duration::from_millis(30));
    assert!(sink.events().is_empty());
    assert_eq!(curtain.snapshot().state_str(), "open");
    curtain.shutdown();
}

#[test]
fn close_runs_a_full_stroke_and_releases_coils() {
    let sink = RecordingSink::new();
    let (curtain, pins) = spawn_curtain(CurtainPosition::Open, sink.clone());

    assert_eq!(curtain.close(), Ok(Outcome::Started));
    assert!(wait_until(STROKE_TIMEOUT, || {
        curtain.snapshot().position == CurtainPosition::Closed
    }));

    let s = curtain.snapshot();
    assert_eq!(s.motion, Motion::Idle);
    assert_eq!(s.current_step, 200);
    assert!(pins.iter().all(|p| !p.is_high()), "coils left energised");

    // One event when motion starts, one when it ends.
    assert!(wait_until(STROKE_TIMEOUT, || {
        sink.count(|e| matches!(e, DeviceEvent::Curtain(_))) == 2
    }));
    assert_eq!(curtain.close(), Ok(Outcome::AlreadyClosed));
    curtain.shutdown();
}

#[test]
fn second_direction_is_rejected_while_running() {
    let sink = RecordingSink::new();
    let (curtain, _pins) = spawn_curtain(CurtainPosition::Closed, sink);

    assert_eq!(curtain.open(), Ok(Outcome::Started));
    let busy = Err(Rejection::Busy { actuator: "curtain" });
    assert_eq!(curtain.close(), busy);
    assert_eq!(curtain.open(), busy);
    assert_eq!(
        curtain.command(CurtainCommand::Close).map_err(|r| r.reason()),
        Err("curtain_is_running".to_string())
    );

    assert!(wait_until(STROKE_TIMEOUT, || {
        curtain.snapshot().position == CurtainPosition::Open
    }));
    assert!(wait_until(STROKE_TIMEOUT, || curtain.phase() == TaskPhase::Idle));
    curtain.shutdown();
}

#[test]
fn stop_mid_stroke_leaves_position_unknown() {
    let sink = RecordingSink::new();
    let (curtain, pins) = spawn_curtain(CurtainPosition::Open, sink);

    assert_eq!(curtain.close(), Ok(Outcome::Started));
    assert!(wait_until(STROKE_TIMEOUT, || {
        let s = curtain.snapshot();
        s.is_running() && s.current_step >= 20
    }));
    assert!(curtain.stop());

    assert!(wait_until(STROKE_TIMEOUT, || !curtain.snapshot().is_running()));
    let s = curtain.snapshot();
    assert_eq!(s.position, CurtainPosition::Unknown);
    assert_eq!(s.state_str(), "unknown");
    assert!(s.current_step < 200, "stroke ran to completion");
    assert!(pins.iter().all(|p| !p.is_high()));

    // Unknown is neither end, so both directions are accepted again.
    assert!(wait_until(STROKE_TIMEOUT, || curtain.phase() == TaskPhase::Idle));
    assert_eq!(curtain.open(), Ok(Outcome::Started));
    assert!(wait_until(STROKE_TIMEOUT, || {
        curtain.snapshot().position == CurtainPosition::Open
    }));
    curtain.shutdown();
}

#[test]
fn stop_while_idle_keeps_position() {
    let sink = RecordingSink::new();
    let (curtain, _pins) = spawn_curtain(CurtainPosition::Closed, sink.clone());

    assert!(curtain.stop());
    assert!(wait_until(STROKE_TIMEOUT, || {
        sink.count(|e| matches!(e, DeviceEvent::Curtain(_))) == 1
    }));
    let s = curtain.snapshot();
    assert_eq!(s.position, CurtainPosition::Closed);
    assert_eq!(s.motion, Motion::Idle);
    curtain.shutdown();
}

#[test]
fn stop_right_after_open_is_accepted() {
    for _ in 0..5 {
        let (curtain, pins) = spawn_curtain(CurtainPosition::Closed, RecordingSink::new());

        assert_eq!(curtain.open(), Ok(Outcome::Started));
        assert!(curtain.stop(), "stop refused behind a queued stroke");

        // Longer than a full stroke.
        std::thread::sleep(Duration::from_millis(400));
        assert!(wait_until(STROKE_TIMEOUT, || curtain.phase() == TaskPhase::Idle));
        let s = curtain.snapshot();
        assert_ne!(s.position, CurtainPosition::Open, "stroke ran after stop");
        assert_eq!(s.motion, Motion::Idle);
        assert!(pins.iter().all(|p| !p.is_high()));

        // The withdrawn or aborted stroke gave up its claim.
        assert_eq!(curtain.open(), Ok(Outcome::Started));
        assert!(wait_until(STROKE_TIMEOUT, || {
            curtain.snapshot().position == CurtainPosition::Open
        }));
        curtain.shutdown();
    }
}

/// Issues `close()` from inside the event that reports the curtain closed.
#[derive(Default)]
struct CloseOnClosed {
    curtain: OnceLock<Curtain>,
    replies: Mutex<Vec<Result<Outcome, Rejection>>>,
}

impl EventSink for CloseOnClosed {
    fn emit(&self, event: &DeviceEvent) {
        let DeviceEvent::Curtain(s) = event else {
            return;
        };
        if s.position != CurtainPosition::Closed || s.is_running() {
            return;
        }
        if let Some(curtain) = self.curtain.get() {
            self.replies.lock().unwrap().push(curtain.close());
        }
    }
}

#[test]
fn final_snapshot_already_accepts_the_next_request() {
    let sink = Arc::new(CloseOnClosed::default());
    let (curtain, _pins) = spawn_curtain(CurtainPosition::Open, sink.clone());
    assert!(sink.curtain.set(curtain.clone()).is_ok());

    assert_eq!(curtain.close(), Ok(Outcome::Started));
    assert!(wait_until(STROKE_TIMEOUT, || !sink.replies.lock().unwrap().is_empty()));
    assert_eq!(*sink.replies.lock().unwrap(), vec![Ok(Outcome::AlreadyClosed)]);
    curtain.shutdown();
}
