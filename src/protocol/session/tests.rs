use super::*;
use crate::protocol::managment::iso_name::IsoName;
use crate::protocol::transport::can_id::CanId;
use crate::protocol::transport::tp::composer::compose_message;
use crate::protocol::transport::tp::{AbortReason, TpControl};
use crate::protocol::transport::PGN_TP_CM;
use alloc::rc::Rc;
use alloc::vec;
use core::cell::RefCell;

fn at(millis: u64) -> Instant {
    Instant::from_millis(millis)
}

fn single(pgn: u32, source: u8, data: &[u8], millis: u64) -> RawFrame {
    let id = CanId::builder(pgn, source).build().unwrap();
    RawFrame::new(id.0, data, at(millis)).unwrap()
}

fn transfer(pgn: u32, source: u8, destination: u8, payload: &[u8], millis: u64) -> Vec<RawFrame> {
    compose_message(pgn, 6, source, destination, payload)
        .unwrap()
        .into_iter()
        .map(|frame| frame.with_timestamp(at(millis)))
        .collect()
}

#[test]
fn test_single_frame_yields_one_message() {
    let mut manager = SessionManager::default();
    let frame = single(0xFEF1, 0x00, &[1, 2, 3, 4, 5, 6, 7, 8], 10);
    manager.on_frame(frame).unwrap();

    let messages = manager.tick(at(20));
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.pgn, 0xFEF1);
    assert_eq!(message.priority, 6);
    assert_eq!(message.source_address, 0x00);
    assert_eq!(message.destination_address, 0xFF);
    assert_eq!(message.payload, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(message.timestamp, at(10));

    assert!(manager.tick(at(30)).is_empty());
}

#[test]
fn test_standard_frame_is_rejected_without_side_effects() {
    let mut manager = SessionManager::default();
    let frame = RawFrame::standard(0x123, &[0; 8], at(0)).unwrap();

    assert_eq!(manager.on_frame(frame), Err(InvalidFrame::NotExtended));
    assert_eq!(manager.active_sessions(), 0);
    assert_eq!(manager.pending_messages(), 0);
}

#[test]
fn test_bam_transfer_is_reassembled() {
    let payload: Vec<u8> = (0..100u8).collect();
    let mut manager = SessionManager::default();

    for frame in transfer(0xFECA, 0x17, 0xFF, &payload, 0) {
        manager.on_frame(frame).unwrap();
    }
    assert_eq!(manager.active_sessions(), 0);
    assert_eq!(manager.drain_outbound().count(), 0);

    let messages = manager.tick(at(5));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].pgn, 0xFECA);
    assert_eq!(messages[0].payload, payload);
}

#[test]
fn test_rts_transfer_emits_flow_control() {
    let payload: Vec<u8> = (0..20u8).collect();
    let mut manager = SessionManager::default();
    let frames = transfer(0xEF00, 0x10, 0x20, &payload, 0);

    manager.on_frame(frames[0].clone()).unwrap();
    let cts: Vec<RawFrame> = manager.drain_outbound().collect();
    assert_eq!(cts.len(), 1);
    assert_eq!(cts[0].id.pgn(), PGN_TP_CM);
    assert_eq!(cts[0].id.source_address(), 0x20);
    assert_eq!(cts[0].id.destination(), Some(0x10));
    assert_eq!(
        TpControl::parse(cts[0].payload()),
        Some(TpControl::ClearToSend {
            packets: 3,
            next_packet: 1,
            pgn: 0xEF00
        })
    );

    for frame in &frames[1..] {
        manager.on_frame(frame.clone()).unwrap();
    }
    let ack: Vec<RawFrame> = manager.drain_outbound().collect();
    assert_eq!(
        TpControl::parse(ack[0].payload()),
        Some(TpControl::EndOfMsgAck {
            total_bytes: 20,
            total_packets: 3,
            pgn: 0xEF00
        })
    );

    let messages = manager.tick(at(10));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].destination_address, 0x20);
    assert_eq!(messages[0].payload, payload);
}

#[test]
fn test_tick_expires_silent_sessions() {
    let payload = [0x55u8; 30];
    let events = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&events);
    let mut manager = SessionManager::new(SessionConfig::default())
        .with_observer(move |event: &TransportEvent| log.borrow_mut().push(*event));

    let frames = transfer(0xEF00, 0x10, 0x20, &payload, 0);
    manager.on_frame(frames[0].clone()).unwrap();
    manager.on_frame(frames[1].clone().with_timestamp(at(100))).unwrap();
    manager.drain_outbound().for_each(drop);

    assert!(manager.tick(at(1350)).is_empty());
    assert_eq!(manager.active_sessions(), 1);

    assert!(manager.tick(at(1351)).is_empty());
    assert_eq!(manager.active_sessions(), 0);

    let abort: Vec<RawFrame> = manager.drain_outbound().collect();
    assert_eq!(
        TpControl::parse(abort[0].payload()),
        Some(TpControl::Abort {
            reason: AbortReason::Timeout,
            pgn: 0xEF00
        })
    );
    assert!(events.borrow().contains(&TransportEvent::SessionTimedOut {
        source: 0x10,
        destination: 0x20,
        pgn: 0xEF00
    }));
}

#[test]
fn test_subscribers_receive_messages_in_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut manager = SessionManager::default();

    let sink = Rc::clone(&seen);
    manager.subscribe(move |m: &DecodedMessage| {
        sink.borrow_mut().push(m.pgn);
        Ok(())
    });

    manager.on_frame(single(0xFEF1, 0x00, &[0; 8], 0)).unwrap();
    manager.on_frame(single(0xF004, 0x00, &[0; 8], 1)).unwrap();
    manager.on_frame(single(0xFEF1, 0x01, &[0; 8], 2)).unwrap();
    manager.tick(at(3));

    assert_eq!(*seen.borrow(), vec![0xFEF1, 0xF004, 0xFEF1]);
}

#[test]
fn test_subscriber_failure_is_observed() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&events);
    let mut manager = SessionManager::default()
        .with_observer(move |event: &TransportEvent| log.borrow_mut().push(*event));

    let handle = manager.subscribe(|_: &DecodedMessage| Err(SubscriberError::Rejected));
    manager.on_frame(single(0xFEF1, 0x00, &[0; 8], 0)).unwrap();

    // The message is still returned to the driver.
    assert_eq!(manager.tick(at(1)).len(), 1);
    assert_eq!(
        *events.borrow(),
        vec![TransportEvent::SubscriberFailed {
            handle,
            error: SubscriberError::Rejected
        }]
    );
}

#[test]
fn test_address_claims_resolve_names() {
    let name = IsoName::from_raw(0x8000_0000_0012_3456);
    let mut manager = SessionManager::default();

    let claim = CanId::builder(PGN_ADDRESS_CLAIM, 0x25).build().unwrap();
    manager
        .on_frame(RawFrame::new(claim.0, &name.to_le_bytes(), at(0)).unwrap())
        .unwrap();
    manager.on_frame(single(0xFEF1, 0x25, &[0; 8], 1)).unwrap();

    let messages = manager.tick(at(2));
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].pgn, PGN_ADDRESS_CLAIM);
    assert_eq!(messages[1].source_name, Some(name));
    assert_eq!(messages[1].destination_name, None);
    assert_eq!(manager.addresses().name_of(0x25), Some(name));
}

#[test]
fn test_shutdown_drops_everything() {
    let mut manager = SessionManager::default();
    let frames = transfer(0xFECA, 0x17, 0xFF, &[0xAB; 40], 0);
    manager.on_frame(frames[0].clone()).unwrap();
    manager.on_frame(single(0xFEF1, 0x00, &[0; 8], 0)).unwrap();

    manager.shutdown();
    assert_eq!(manager.active_sessions(), 0);
    assert!(manager.tick(at(1)).is_empty());
}
