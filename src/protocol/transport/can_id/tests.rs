//! Unit tests for the `CanId` accessors, identifier decoding, and builder.
use super::*;
use embassy_time::Instant;

//==================================================================================CAN_ID
#[test]
/// Extracts the source address from the raw ID.
fn test_source_address() {
    let can_id = CanId(0x18FE_F1D1);
    assert_eq!(can_id.source_address(), 0xD1);
}

#[test]
/// Verifies extraction of the 3-bit priority field.
fn test_priority() {
    let can_id = CanId(0x0CF0_0400);
    assert_eq!(can_id.priority(), 3)
}

#[test]
/// PDU2 identifiers keep the group extension inside the PGN.
fn test_pgn_pdu2() {
    let can_id = CanId(0x18FE_F100);
    assert_eq!(can_id.pgn(), 0xFEF1);
    assert_eq!(can_id.destination(), None);
    assert!(!can_id.is_pdu1());
}

#[test]
/// PDU1 identifiers move PS into the destination and clear it in the PGN.
fn test_pgn_pdu1() {
    let can_id = CanId(0x18EA_2301);
    assert_eq!(can_id.pgn(), 0xEA00);
    assert_eq!(can_id.destination(), Some(0x23));
    assert_eq!(can_id.source_address(), 0x01);
}

#[test]
/// Data page and extended data page bits end up in PGN bits 16 and 17.
fn test_pgn_data_page_bits() {
    let can_id = CanId(0x1BFE_0000 | 0x42);
    assert_eq!(can_id.pgn(), 0x3FE00);
    assert_eq!(can_id.priority(), 6);
}

//==================================================================================DECODE
#[test]
/// Decoding a broadcast frame resolves the destination to the global address.
fn test_decode_identifier_broadcast() {
    let frame = RawFrame::new(0x18FE_F117, &[1, 2, 3], Instant::from_millis(0)).unwrap();
    let ident = decode_identifier(&frame).unwrap();
    assert_eq!(ident.priority, 6);
    assert_eq!(ident.pgn, 0xFEF1);
    assert_eq!(ident.pdu_format, 0xFE);
    assert_eq!(ident.pdu_specific, 0xF1);
    assert_eq!(ident.source_address, 0x17);
    assert_eq!(ident.destination_address, GLOBAL_ADDRESS);
    assert!(ident.is_global());
}

#[test]
/// Decoding a peer-to-peer frame resolves the destination to a specific node.
fn test_decode_identifier_peer_to_peer() {
    let frame = RawFrame::new(0x1CEC_2A05, &[0; 8], Instant::from_millis(0)).unwrap();
    let ident = decode_identifier(&frame).unwrap();
    assert_eq!(ident.priority, 7);
    assert_eq!(ident.pgn, 0xEC00);
    assert_eq!(ident.destination_address, 0x2A);
    assert!(!ident.is_global());
    assert!(ident.is_pdu1());
}

#[test]
/// Standard identifiers and oversized payloads are rejected.
fn test_decode_identifier_rejects_malformed() {
    let mut frame = RawFrame::new(0x18FE_F100, &[0; 8], Instant::from_millis(0)).unwrap();
    frame.extended = false;
    assert_eq!(decode_identifier(&frame), Err(InvalidFrame::NotExtended));

    frame.extended = true;
    frame.len = 9;
    assert_eq!(
        decode_identifier(&frame),
        Err(InvalidFrame::DataTooLong { len: 9 })
    );

    frame.len = 8;
    frame.id = CanId(0x2000_0000);
    assert_eq!(
        decode_identifier(&frame),
        Err(InvalidFrame::IdentifierOverflow { id: 0x2000_0000 })
    );
}

//==================================================================================CAN_ID_BUILDER
#[test]
/// Validates builder scenarios: broadcast, addressed, and error handling.
fn test_builder() {
    // Broadcast PGN 65265 (Cruise Control/Vehicle Speed)
    let broadcast = CanId::builder(65265, 0x00).with_priority(6).build();
    assert_eq!(broadcast, Ok(CanId(0x18FE_F100)));

    // Addressed request PGN 59904
    let request = CanId::builder(59904, 0x01)
        .with_priority(6)
        .to_destination(0x23)
        .build();
    assert_eq!(request, Ok(CanId(0x18EA_2301)));

    // PDU1 without destination goes to the global address
    let global = CanId::builder(59904, 0x01).build().unwrap();
    assert_eq!(global.destination(), Some(GLOBAL_ADDRESS));

    // PDU2 PGN cannot be addressed to a node
    let invalid = CanId::builder(65265, 0x00).to_destination(0x23).build();
    assert_eq!(invalid, Err(ComposeError::InvalidForFocusedMessage { pf: 0xFE }));

    // PDU1 PGN with a non-zero PS byte
    let invalid = CanId::builder(0xEA01, 0x00).build();
    assert_eq!(invalid, Err(ComposeError::PsFocusMessageMustBeNull));

    // PGN wider than 18 bits
    let invalid = CanId::builder(0x40000, 0x00).build();
    assert_eq!(invalid, Err(ComposeError::InvalidPgn { pgn: 0x40000 }));
}

#[test]
/// The priority must be capped to 3 bits to avoid touching the reserved field.
fn test_priority_masks_extra_bits() {
    let can_id = CanId::builder(65265, 35)
        .with_priority(0b1111_0000)
        .build()
        .expect("CanId must build");

    assert_eq!(can_id.0 & !EXTENDED_ID_MASK, 0, "Bits above 28 must remain clear");
    assert_eq!(can_id.priority(), 0);
}
