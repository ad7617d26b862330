//! Outbound composer: turns an application payload into the ordered list of
//! CAN frames to transmit (single frame, or TP.CM announcement followed by
//! TP.DT packets).
use alloc::vec::Vec;
use embassy_time::Instant;

use crate::error::ComposeError;
use crate::protocol::transport::can_frame::RawFrame;
use crate::protocol::transport::can_id::{CanId, MAX_PGN, PDU2_THRESHOLD};
use crate::protocol::transport::tp::{packets_for, TpControl};
use crate::protocol::transport::{
    GLOBAL_ADDRESS, MAX_FRAME_PAYLOAD, MAX_TP_PAYLOAD, PGN_TP_CM, PGN_TP_DT, TP_PACKET_PAYLOAD,
    TP_PADDING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// How a payload travels on the bus.
pub enum TransferKind {
    /// Eight bytes or less: one frame.
    SingleFrame,
    /// Broadcast Announce Message followed by paced TP.DT packets.
    Broadcast,
    /// RTS/CTS connection to a specific node.
    Connection,
}

/// Select the transfer for a payload of `len` bytes sent to `destination`.
pub fn transfer_kind(len: usize, destination: u8) -> TransferKind {
    if len <= MAX_FRAME_PAYLOAD {
        TransferKind::SingleFrame
    } else if destination == GLOBAL_ADDRESS {
        TransferKind::Broadcast
    } else {
        TransferKind::Connection
    }
}

/// Compose the frames carrying `payload`, in transmission order.
///
/// * ≤ 8 bytes: a single frame with the payload as-is (PDU2 PGNs only accept
///   the global destination).
/// * 9 to 1785 bytes: TP.CM_BAM (global destination) or TP.CM_RTS (specific
///   destination), then `ceil(len / 7)` TP.DT packets numbered from 1. The last
///   packet is padded with `0xFF` to a full eight-byte frame.
///
/// For RTS/CTS the returned TP.DT packets must only be released as the
/// receiver's CTS windows allow; see
/// [`MessageSender`](crate::protocol::transport::traits::message_sender::MessageSender).
pub fn compose_message(
    pgn: u32,
    priority: u8,
    source_address: u8,
    destination_address: u8,
    payload: &[u8],
) -> Result<Vec<RawFrame>, ComposeError> {
    let timestamp = Instant::from_ticks(0);

    match transfer_kind(payload.len(), destination_address) {
        TransferKind::SingleFrame => {
            let id = CanId::builder(pgn, source_address)
                .with_priority(priority)
                .to_destination(destination_address)
                .build()?;
            let mut data = [0u8; 8];
            data[..payload.len()].copy_from_slice(payload);
            Ok(alloc::vec![RawFrame {
                id,
                extended: true,
                data,
                len: payload.len(),
                timestamp,
            }])
        }
        kind => {
            if payload.len() > MAX_TP_PAYLOAD {
                return Err(ComposeError::PayloadTooLarge { len: payload.len() });
            }
            validate_transported_pgn(pgn)?;

            let total_bytes = payload.len() as u16;
            let total_packets = packets_for(payload.len()) as u8;
            let announce = match kind {
                TransferKind::Broadcast => TpControl::BroadcastAnnounce {
                    total_bytes,
                    total_packets,
                    pgn,
                },
                _ => TpControl::RequestToSend {
                    total_bytes,
                    total_packets,
                    max_packets: 0xFF,
                    pgn,
                },
            };

            let cm_id = CanId::builder(PGN_TP_CM, source_address)
                .with_priority(priority)
                .to_destination(destination_address)
                .build()?;
            let dt_id = CanId::builder(PGN_TP_DT, source_address)
                .with_priority(priority)
                .to_destination(destination_address)
                .build()?;

            let mut frames = Vec::with_capacity(1 + total_packets as usize);
            frames.push(RawFrame {
                id: cm_id,
                extended: true,
                data: announce.encode(),
                len: 8,
                timestamp,
            });

            for (index, chunk) in payload.chunks(TP_PACKET_PAYLOAD).enumerate() {
                let mut data = [TP_PADDING; 8];
                data[0] = (index + 1) as u8;
                data[1..1 + chunk.len()].copy_from_slice(chunk);
                frames.push(RawFrame {
                    id: dt_id,
                    extended: true,
                    data,
                    len: 8,
                    timestamp,
                });
            }
            Ok(frames)
        }
    }
}

/// A PGN inside TP.CM must fit in 18 bits and, for PDU1, keep PS at zero.
fn validate_transported_pgn(pgn: u32) -> Result<(), ComposeError> {
    if pgn > MAX_PGN {
        return Err(ComposeError::InvalidPgn { pgn });
    }
    let pf = ((pgn >> 8) & 0xFF) as u8;
    if pf < PDU2_THRESHOLD && pgn & 0xFF != 0 {
        return Err(ComposeError::PsFocusMessageMustBeNull);
    }
    Ok(())
}
