//! Unit tests for the TP.CM / TP.DT codecs.
use super::*;

#[test]
/// RTS announcing 20 bytes in 3 packets for PGN 0xFEE5.
fn test_parse_request_to_send() {
    let data = [0x10, 20, 0, 3, 0xFF, 0xE5, 0xFE, 0x00];
    assert_eq!(
        TpControl::parse(&data),
        Some(TpControl::RequestToSend {
            total_bytes: 20,
            total_packets: 3,
            max_packets: 0xFF,
            pgn: 0xFEE5,
        })
    );
}

#[test]
/// Encoded control frames keep little-endian sizes and PGN bytes.
fn test_encode_layouts() {
    let bam = TpControl::BroadcastAnnounce {
        total_bytes: 1785,
        total_packets: 255,
        pgn: 0x1FECA,
    };
    assert_eq!(bam.encode(), [0x20, 0xF9, 0x06, 0xFF, 0xFF, 0xCA, 0xFE, 0x01]);

    let cts = TpControl::ClearToSend {
        packets: 4,
        next_packet: 1,
        pgn: 0xEF00,
    };
    assert_eq!(cts.encode(), [0x11, 4, 1, 0xFF, 0xFF, 0x00, 0xEF, 0x00]);

    let abort = TpControl::Abort {
        reason: AbortReason::BadSequenceNumber,
        pgn: 0xEF00,
    };
    assert_eq!(abort.encode(), [0xFF, 7, 0xFF, 0xFF, 0xFF, 0x00, 0xEF, 0x00]);

    let ack = TpControl::EndOfMsgAck {
        total_bytes: 20,
        total_packets: 3,
        pgn: 0xEF00,
    };
    assert_eq!(TpControl::parse(&ack.encode()), Some(ack));
}

#[test]
/// Short frames and reserved control bytes are refused.
fn test_parse_rejects_malformed() {
    assert_eq!(TpControl::parse(&[0x10, 20, 0, 3]), None);
    assert_eq!(TpControl::parse(&[0x42, 0, 0, 0, 0, 0, 0, 0]), None);
}

#[test]
/// Abort reasons map to their wire codes, unknown codes are preserved.
fn test_abort_reason_codes() {
    assert_eq!(AbortReason::from(3), AbortReason::Timeout);
    assert_eq!(u8::from(AbortReason::SystemResources), 2);
    assert_eq!(AbortReason::from(250), AbortReason::Other(250));
    assert_eq!(u8::from(AbortReason::Other(250)), 250);
}

#[test]
/// Packet count is the ceiling of bytes / 7.
fn test_packets_for() {
    assert_eq!(packets_for(9), 2);
    assert_eq!(packets_for(14), 2);
    assert_eq!(packets_for(20), 3);
    assert_eq!(packets_for(1785), 255);
}

#[test]
/// The first byte of a TP.DT frame is the sequence number.
fn test_parse_data_transfer() {
    let frame = [2, 8, 9, 10, 11, 12, 13, 14];
    let packet = TpData::parse(&frame).unwrap();
    assert_eq!(packet.sequence, 2);
    assert_eq!(packet.bytes, &[8, 9, 10, 11, 12, 13, 14]);
    assert!(TpData::parse(&[]).is_none());
}
