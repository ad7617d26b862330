//! In-memory representation of a raw CAN frame as handed over by the I/O
//! driver, and its bridge to [`embedded_can::Frame`] for HAL interoperability.
use crate::error::InvalidFrame;
use crate::protocol::transport::can_id::{CanId, EXTENDED_ID_MASK};
use crate::protocol::transport::MAX_FRAME_PAYLOAD;
use embassy_time::Instant;
use embedded_can::{ExtendedId, Frame, Id, StandardId};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Raw frame as read from (or written to) the CAN bus.
pub struct RawFrame {
    /// Identifier stored inside a `u32` (29 bits when `extended`, 11 otherwise).
    pub id: CanId,
    /// `true` for 29-bit identifiers, the only kind J1939 accepts.
    pub extended: bool,
    /// Payload buffer. Classic CAN frames provide at most eight bytes.
    pub data: [u8; 8],
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
    /// Monotonic reception time stamped by the driver.
    pub timestamp: Instant,
}

impl RawFrame {
    /// Build an extended frame from a 29-bit identifier and up to eight bytes.
    pub fn new(id: u32, data: &[u8], timestamp: Instant) -> Result<Self, InvalidFrame> {
        if id & !EXTENDED_ID_MASK != 0 {
            return Err(InvalidFrame::IdentifierOverflow { id });
        }
        Self::with_format(id, true, data, timestamp)
    }

    /// Build a standard (11-bit) frame. Kept for drivers that surface every
    /// frame on the bus; the J1939 layer refuses these.
    pub fn standard(id: u16, data: &[u8], timestamp: Instant) -> Result<Self, InvalidFrame> {
        Self::with_format(id as u32 & 0x7FF, false, data, timestamp)
    }

    fn with_format(
        id: u32,
        extended: bool,
        data: &[u8],
        timestamp: Instant,
    ) -> Result<Self, InvalidFrame> {
        if data.len() > MAX_FRAME_PAYLOAD {
            return Err(InvalidFrame::DataTooLong { len: data.len() });
        }
        let mut buffer = [0u8; 8];
        buffer[..data.len()].copy_from_slice(data);
        Ok(Self {
            id: CanId(id),
            extended,
            data: buffer,
            len: data.len(),
            timestamp,
        })
    }

    /// Replace the reception time, e.g. after converting from a HAL frame.
    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len.min(MAX_FRAME_PAYLOAD)]
    }

    /// Convert any HAL frame, stamping it with the driver's reception time.
    /// Remote frames carry no J1939 data and are refused.
    pub fn from_hal<F: Frame>(frame: &F, timestamp: Instant) -> Option<Self> {
        if frame.is_remote_frame() {
            return None;
        }
        let raw = match frame.id() {
            Id::Extended(id) => Self::new(id.as_raw(), frame.data(), timestamp),
            Id::Standard(id) => Self::standard(id.as_raw(), frame.data(), timestamp),
        };
        raw.ok()
    }
}

/// Frames created through the HAL trait carry a zero timestamp; drivers
/// should stamp them with [`RawFrame::with_timestamp`].
impl Frame for RawFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Extended(id) => RawFrame::new(id.as_raw(), data, Instant::from_ticks(0)).ok(),
            Id::Standard(id) => RawFrame::standard(id.as_raw(), data, Instant::from_ticks(0)).ok(),
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        // J1939 does not use remote frames.
        None
    }

    fn is_extended(&self) -> bool {
        self.extended
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        if self.extended {
            match ExtendedId::new(self.id.0) {
                Some(id) => Id::Extended(id),
                None => Id::Extended(ExtendedId::MAX),
            }
        } else {
            match StandardId::new(self.id.0 as u16) {
                Some(id) => Id::Standard(id),
                None => Id::Standard(StandardId::MAX),
            }
        }
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        self.payload()
    }
}
