//! SAE J1939-21 Transport Protocol: carries payloads of 9 to 1785 bytes
//! across successive CAN frames.
//!
//! Two PGNs are involved:
//!
//! 1. `0xEC00` - Connection Management (TP.CM), whose first byte selects the
//!    control message:
//!    - `0x10` Request To Send (TP.CM_RTS)
//!    - `0x11` Clear To Send (TP.CM_CTS)
//!    - `0x13` End of Message Acknowledgement (TP.CM_EndOfMsgACK)
//!    - `0x20` Broadcast Announce Message (TP.CM_BAM)
//!    - `0xFF` Connection Abort (TP.Conn_Abort)
//! 2. `0xEB00` - Data Transfer (TP.DT): one sequence byte (1-indexed) and
//!    seven payload bytes.
//!
//! BAM sessions are connectionless and sent to the global address. RTS/CTS
//! sessions are peer-to-peer with receiver-driven flow control.
use crate::protocol::transport::{TP_PACKET_PAYLOAD, TP_PADDING};

pub mod assembler;
pub mod composer;

const CONTROL_RTS: u8 = 0x10;
const CONTROL_CTS: u8 = 0x11;
const CONTROL_END_OF_MSG_ACK: u8 = 0x13;
const CONTROL_BAM: u8 = 0x20;
const CONTROL_ABORT: u8 = 0xFF;

/// Number of TP.DT packets needed to carry `bytes`.
pub const fn packets_for(bytes: usize) -> usize {
    bytes.div_ceil(TP_PACKET_PAYLOAD)
}

//==================================================================================ABORT_REASON
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Reason code carried in byte 1 of a TP.Conn_Abort.
pub enum AbortReason {
    /// Already in one or more connection-managed sessions and cannot support another.
    ExistingTransportSession,
    /// System resources were needed for another task.
    SystemResources,
    /// A timeout occurred.
    Timeout,
    /// CTS messages received while data transfer is in progress.
    CtsDuringDt,
    /// Maximum retransmit request limit reached.
    MaxRetryLimit,
    /// Unexpected data transfer packet.
    UnexpectedDt,
    /// Bad sequence number.
    BadSequenceNumber,
    /// Duplicate sequence number.
    DuplicateSequenceNumber,
    /// Total message size is greater than 1785 bytes.
    MessageTooLarge,
    /// Reserved or manufacturer-specific code.
    Other(u8),
}

impl From<u8> for AbortReason {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::ExistingTransportSession,
            2 => Self::SystemResources,
            3 => Self::Timeout,
            4 => Self::CtsDuringDt,
            5 => Self::MaxRetryLimit,
            6 => Self::UnexpectedDt,
            7 => Self::BadSequenceNumber,
            8 => Self::DuplicateSequenceNumber,
            9 => Self::MessageTooLarge,
            other => Self::Other(other),
        }
    }
}

impl From<AbortReason> for u8 {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::ExistingTransportSession => 1,
            AbortReason::SystemResources => 2,
            AbortReason::Timeout => 3,
            AbortReason::CtsDuringDt => 4,
            AbortReason::MaxRetryLimit => 5,
            AbortReason::UnexpectedDt => 6,
            AbortReason::BadSequenceNumber => 7,
            AbortReason::DuplicateSequenceNumber => 8,
            AbortReason::MessageTooLarge => 9,
            AbortReason::Other(code) => code,
        }
    }
}

//==================================================================================TP_CM
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Decoded TP.CM control message. `pgn` is the PGN of the transported message.
pub enum TpControl {
    RequestToSend {
        total_bytes: u16,
        total_packets: u8,
        /// Largest CTS window the sender accepts (`0xFF` = no limit).
        max_packets: u8,
        pgn: u32,
    },
    ClearToSend {
        /// Packets the receiver allows in this window (0 = hold).
        packets: u8,
        next_packet: u8,
        pgn: u32,
    },
    EndOfMsgAck {
        total_bytes: u16,
        total_packets: u8,
        pgn: u32,
    },
    BroadcastAnnounce {
        total_bytes: u16,
        total_packets: u8,
        pgn: u32,
    },
    Abort {
        reason: AbortReason,
        pgn: u32,
    },
}

impl TpControl {
    /// Parse the payload of a TP.CM frame. Control frames are always eight
    /// bytes long; shorter frames and reserved control bytes yield `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let total_bytes = u16::from_le_bytes([data[1], data[2]]);
        let pgn = u32::from_le_bytes([data[5], data[6], data[7], 0]);

        let control = match data[0] {
            CONTROL_RTS => Self::RequestToSend {
                total_bytes,
                total_packets: data[3],
                max_packets: data[4],
                pgn,
            },
            CONTROL_CTS => Self::ClearToSend {
                packets: data[1],
                next_packet: data[2],
                pgn,
            },
            CONTROL_END_OF_MSG_ACK => Self::EndOfMsgAck {
                total_bytes,
                total_packets: data[3],
                pgn,
            },
            CONTROL_BAM => Self::BroadcastAnnounce {
                total_bytes,
                total_packets: data[3],
                pgn,
            },
            CONTROL_ABORT => Self::Abort {
                reason: AbortReason::from(data[1]),
                pgn,
            },
            _ => return None,
        };
        Some(control)
    }

    /// Serialize into a full eight-byte TP.CM payload, reserved bytes set to `0xFF`.
    pub fn encode(&self) -> [u8; 8] {
        let mut data = [TP_PADDING; 8];
        let pgn_bytes = self.pgn().to_le_bytes();
        data[5..8].copy_from_slice(&pgn_bytes[0..3]);

        match *self {
            Self::RequestToSend {
                total_bytes,
                total_packets,
                max_packets,
                ..
            } => {
                data[0] = CONTROL_RTS;
                data[1..3].copy_from_slice(&total_bytes.to_le_bytes());
                data[3] = total_packets;
                data[4] = max_packets;
            }
            Self::ClearToSend {
                packets,
                next_packet,
                ..
            } => {
                data[0] = CONTROL_CTS;
                data[1] = packets;
                data[2] = next_packet;
            }
            Self::EndOfMsgAck {
                total_bytes,
                total_packets,
                ..
            } => {
                data[0] = CONTROL_END_OF_MSG_ACK;
                data[1..3].copy_from_slice(&total_bytes.to_le_bytes());
                data[3] = total_packets;
            }
            Self::BroadcastAnnounce {
                total_bytes,
                total_packets,
                ..
            } => {
                data[0] = CONTROL_BAM;
                data[1..3].copy_from_slice(&total_bytes.to_le_bytes());
                data[3] = total_packets;
            }
            Self::Abort { reason, .. } => {
                data[0] = CONTROL_ABORT;
                data[1] = reason.into();
            }
        }
        data
    }

    /// PGN of the message being transported.
    pub fn pgn(&self) -> u32 {
        match *self {
            Self::RequestToSend { pgn, .. }
            | Self::ClearToSend { pgn, .. }
            | Self::EndOfMsgAck { pgn, .. }
            | Self::BroadcastAnnounce { pgn, .. }
            | Self::Abort { pgn, .. } => pgn,
        }
    }
}

//==================================================================================TP_DT
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// One TP.DT packet.
pub struct TpData<'a> {
    /// 1-indexed packet number.
    pub sequence: u8,
    /// Up to seven payload bytes (padding included).
    pub bytes: &'a [u8],
}

impl<'a> TpData<'a> {
    /// Split a TP.DT frame payload; empty frames yield `None`.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let (&sequence, bytes) = data.split_first()?;
        Some(Self { sequence, bytes })
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
