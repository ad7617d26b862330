//! Creation and decomposition of the 29-bit CAN identifiers used by SAE J1939.
//!
//! # Bit layout
//!
//! ```text
//! | 28..26   | 25  | 24 | 23..16     | 15..8        | 7..0   |
//! | priority | EDP | DP | PDU format | PDU specific | source |
//! ```
//!
//! PDU format < 240 (PDU1) is peer-to-peer: PDU specific holds the destination
//! and is not part of the PGN. PDU format ≥ 240 (PDU2) is broadcast: PDU
//! specific is the group extension and belongs to the PGN.
use crate::error::{ComposeError, InvalidFrame};
use crate::protocol::transport::can_frame::RawFrame;
use crate::protocol::transport::{GLOBAL_ADDRESS, MAX_FRAME_PAYLOAD};

/// Mask of the 29 usable identifier bits.
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Highest valid PGN (18 bits).
pub const MAX_PGN: u32 = 0x3FFFF;

/// Lowest PDU format value of broadcast (PDU2) messages.
pub const PDU2_THRESHOLD: u8 = 240;

//==================================================================================CAN_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Encapsulates an extended CAN identifier (29 bits) and exposes accessors
/// for priority, PGN, destination, and source.
pub struct CanId(pub u32);

impl CanId {
    /// Creates a pre-configured `CanIdBuilder` for a PGN and source address.
    pub fn builder(pgn: u32, source_address: u8) -> CanIdBuilder {
        CanIdBuilder::new(pgn, source_address)
    }

    /// Returns the priority (3 bits, value 0-7) encoded in the CAN ID.
    pub fn priority(&self) -> u8 {
        ((self.0 >> 26) & 0x07) as u8
    }

    /// PDU format byte (bits 16-23).
    pub fn pdu_format(&self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// PDU specific byte (bits 8-15): destination (PDU1) or group extension (PDU2).
    pub fn pdu_specific(&self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// `true` for peer-to-peer messages (PF < 240).
    pub fn is_pdu1(&self) -> bool {
        self.pdu_format() < PDU2_THRESHOLD
    }

    /// Extracts the 18-bit PGN, handling the PDU1/PDU2 distinction.
    pub fn pgn(&self) -> u32 {
        let edp_dp = (self.0 >> 24) & 0x03;
        let pf = self.pdu_format() as u32;

        if self.is_pdu1() {
            // PDU1: PS stores the explicit destination.
            (edp_dp << 16) | (pf << 8)
        } else {
            // PDU2: implicit destination, PS becomes part of the PGN.
            (edp_dp << 16) | (pf << 8) | self.pdu_specific() as u32
        }
    }

    /// Returns the destination address (PDU1) when the PGN carries one.
    pub fn destination(&self) -> Option<u8> {
        self.is_pdu1().then(|| self.pdu_specific())
    }

    /// Eight-bit source address (logical node identifier on the network).
    pub fn source_address(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

//==================================================================================J1939_IDENTIFIER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Decoded view of a J1939 identifier.
pub struct J1939Identifier {
    /// Arbitration priority, 0 (highest) to 7.
    pub priority: u8,
    /// 18-bit Parameter Group Number.
    pub pgn: u32,
    pub pdu_format: u8,
    pub pdu_specific: u8,
    pub source_address: u8,
    /// Destination node; 255 for broadcast (PDU2) and global PDU1 messages.
    pub destination_address: u8,
}

impl J1939Identifier {
    /// `true` when the message addresses every node.
    pub fn is_global(&self) -> bool {
        self.destination_address == GLOBAL_ADDRESS
    }

    /// `true` for peer-to-peer messages (PF < 240).
    pub fn is_pdu1(&self) -> bool {
        self.pdu_format < PDU2_THRESHOLD
    }
}

impl From<CanId> for J1939Identifier {
    fn from(id: CanId) -> Self {
        Self {
            priority: id.priority(),
            pgn: id.pgn(),
            pdu_format: id.pdu_format(),
            pdu_specific: id.pdu_specific(),
            source_address: id.source_address(),
            destination_address: id.destination().unwrap_or(GLOBAL_ADDRESS),
        }
    }
}

/// Decompose the identifier of a raw frame.
///
/// Fails with [`InvalidFrame`] when the frame uses a standard 11-bit
/// identifier, when the identifier overflows 29 bits, or when the data
/// length exceeds eight bytes.
pub fn decode_identifier(frame: &RawFrame) -> Result<J1939Identifier, InvalidFrame> {
    if !frame.extended {
        return Err(InvalidFrame::NotExtended);
    }
    if frame.id.0 & !EXTENDED_ID_MASK != 0 {
        return Err(InvalidFrame::IdentifierOverflow { id: frame.id.0 });
    }
    if frame.len > MAX_FRAME_PAYLOAD {
        return Err(InvalidFrame::DataTooLong { len: frame.len });
    }
    Ok(J1939Identifier::from(frame.id))
}

//==================================================================================CAN_ID_BUILDER
#[derive(Debug)]
/// Fluent builder that enforces the PDU1/PDU2 rules.
pub struct CanIdBuilder {
    pub priority: u8,
    pub pgn: u32,
    pub source_address: u8,
    pub destination: Option<u8>,
}

impl CanIdBuilder {
    /// Initializes the builder for a given PGN and source address.
    pub fn new(pgn: u32, source_address: u8) -> Self {
        Self {
            priority: 6, // Default priority
            pgn,
            source_address,
            destination: None,
        }
    }

    /// Sets the priority (3 bits) to use during construction.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority & 0x07;
        self
    }

    /// Assigns a destination address. Implies a PDU1 PGN unless the
    /// destination is global.
    pub fn to_destination(mut self, destination_address: u8) -> Self {
        self.destination = Some(destination_address);
        self
    }

    /// Builds the CAN identifier while applying J1939 rules:
    /// - PF < 240 → PDU1: PGN PS byte must be `0`, the destination (global
    ///   when omitted) is written into PS
    /// - PF ≥ 240 → PDU2: only the global destination is accepted
    pub fn build(self) -> Result<CanId, ComposeError> {
        if self.pgn > MAX_PGN {
            return Err(ComposeError::InvalidPgn { pgn: self.pgn });
        }
        let edp_dp = (self.pgn >> 16) & 0x03;
        let pf = ((self.pgn >> 8) & 0xFF) as u8;
        let ps = (self.pgn & 0xFF) as u8;

        let specific = if pf < PDU2_THRESHOLD {
            if ps != 0 {
                return Err(ComposeError::PsFocusMessageMustBeNull);
            }
            self.destination.unwrap_or(GLOBAL_ADDRESS)
        } else {
            match self.destination {
                None | Some(GLOBAL_ADDRESS) => ps,
                Some(_) => return Err(ComposeError::InvalidForFocusedMessage { pf }),
            }
        };

        let id = ((self.priority as u32) << 26)
            | (edp_dp << 24)
            | ((pf as u32) << 16)
            | ((specific as u32) << 8)
            | (self.source_address as u32);
        Ok(CanId(id))
    }
}
//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
