//! Panel link: frame dispatch, acknowledgements and the receive buffer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use roomhub::app::commands::{CommandRouter, DeviceCommand};
use roomhub::config::UartConfig;
use roomhub::serial::dispatcher::Dispatcher;
use roomhub::serial::link::SerialLink;
use roomhub::serial::transport::MemoryTransport;

use crate::mock_hw::wait_until;

#[derive(Default)]
struct RecordingRouter {
    routed: Mutex<Vec<DeviceCommand>>,
}

impl CommandRouter for RecordingRouter {
    fn route(&self, cmd: DeviceCommand) -> bool {
        self.routed.lock().unwrap().push(cmd);
        true
    }
}

fn rig() -> (Dispatcher, Arc<SerialLink>, Arc<MemoryTransport>, Arc<RecordingRouter>) {
    let transport = Arc::new(MemoryTransport::new());
    let link = Arc::new(SerialLink::new(transport.clone(), UartConfig::default()));
    let router = Arc::new(RecordingRouter::default());
    let dispatcher = Dispatcher::new(link.clone(), router.clone());
    (dispatcher, link, transport, router)
}

#[test]
fn valid_frame_is_routed_and_acknowledged() {
    let (dispatcher, _link, transport, router) = rig();

    let frame = dispatcher.handle_chunk(&[0x65, 0x01, 0x01, 0x01, 0xFF, 0xFF, 0xFF]);
    assert_eq!(frame.map(|f| f.payload), Some([0x01, 0x01, 0x01]));
    assert_eq!(*router.routed.lock().unwrap(), vec![DeviceCommand::LampOn]);
    assert_eq!(transport.take_text(), "PARSED:010101\r\n");
}

#[test]
fn unknown_command_is_still_acknowledged() {
    let (dispatcher, _link, transport, router) = rig();

    assert!(dispatcher
        .handle_chunk(&[0x65, 0x09, 0x09, 0x09, 0xFF, 0xFF, 0xFF])
        .is_some());
    assert!(router.routed.lock().unwrap().is_empty());
    assert_eq!(transport.take_text(), "PARSED:090909\r\n");
}

#[test]
fn invalid_chunk_gets_no_reply_but_is_remembered() {
    let (dispatcher, link, transport, router) = rig();

    let garbage = [0x65, 0x01, 0x01, 0x01, 0xFF, 0xFF];
    assert!(dispatcher.handle_chunk(&garbage).is_none());
    assert!(router.routed.lock().unwrap().is_empty());
    assert!(transport.take_written().is_empty());
    assert_eq!(link.receive(0), garbage.to_vec());
}

#[test]
fn receive_returns_a_prefix_of_the_last_message() {
    let (dispatcher, link, _transport, _router) = rig();

    dispatcher.handle_chunk(&[0x65, 0x01, 0x02, 0x02, 0xFF, 0xFF, 0xFF, 0x42]);
    assert_eq!(link.receive(3), vec![0x65, 0x01, 0x02]);
    assert_eq!(link.receive(0).len(), 8);
    assert_eq!(link.receive(10_000).len(), 8);

    link.flush();
    assert!(link.receive(0).is_empty());
}

#[test]
fn send_rejects_oversized_messages() {
    let (_dispatcher, link, transport, _router) = rig();
    let limit = link.config().send_max_len;

    assert!(link.send("page.t1.txt=\"22\"\r\n"));
    assert!(!link.send(&"x".repeat(limit + 1)));
    assert!(!link.send(""));
    assert_eq!(transport.take_text(), "page.t1.txt=\"22\"\r\n");
}

#[test]
fn receive_task_processes_injected_frames() {
    let (dispatcher, _link, transport, router) = rig();
    transport.inject(&[0x65, 0x01, 0x02, 0x01, 0xFF, 0xFF, 0xFF]);
    transport.inject(&[0x00, 0x01]);
    transport.inject(&[0x65, 0x01, 0x02, 0x02, 0xFF, 0xFF, 0xFF]);

    let _task = dispatcher.spawn().unwrap();
    assert!(wait_until(Duration::from_secs(2), || {
        router.routed.lock().unwrap().len() == 2
    }));
    assert_eq!(
        *router.routed.lock().unwrap(),
        vec![DeviceCommand::FanOn, DeviceCommand::FanOff]
    );
    assert!(wait_until(Duration::from_secs(1), || {
        transport.take_text().contains("PARSED:010202")
    }));
}
