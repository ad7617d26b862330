//! J1939 transport layer: CAN frame representation, 29-bit identifier
//! decomposition, the multi-packet Transport Protocol (TP), and bus
//! abstraction traits.
//!
//! ## J1939 Timing and Size Constants
//!
//! These constants define the protocol defaults from SAE J1939-21 used by
//! the reassembler, the composer, and the async sender.

pub mod can_frame;
pub mod can_id;
pub mod tp;
pub mod traits;

/// TP.CM (Connection Management) PGN, 60416.
pub const PGN_TP_CM: u32 = 0xEC00;

/// TP.DT (Data Transfer) PGN, 60160.
pub const PGN_TP_DT: u32 = 0xEB00;

/// Address Claimed PGN, 60928.
pub const PGN_ADDRESS_CLAIM: u32 = 0xEE00;

/// Global (broadcast) destination address.
pub const GLOBAL_ADDRESS: u8 = 0xFF;

/// Null address used by nodes that could not claim an address.
pub const NULL_ADDRESS: u8 = 0xFE;

/// Maximum payload carried by a classic CAN frame.
pub const MAX_FRAME_PAYLOAD: usize = 8;

/// Payload bytes carried by each TP.DT packet (byte 0 is the sequence number).
pub const TP_PACKET_PAYLOAD: usize = 7;

/// Maximum payload the transport protocol can carry: 255 packets of 7 bytes.
pub const MAX_TP_PAYLOAD: usize = 255 * TP_PACKET_PAYLOAD;

/// Filler for unused bytes of control frames and of the last TP.DT packet.
pub const TP_PADDING: u8 = 0xFF;

/// Priority used for transport control frames emitted by the receiver.
pub const TP_CONTROL_PRIORITY: u8 = 7;

/// T1 timeout (ms): maximum silence between two packets of a session before
/// the receiver gives up.
///
/// The same 1250 ms value is used for T2 (after sending a CTS) and T3 (sender
/// waiting for CTS or EndOfMsgACK).
pub const T1_TIMEOUT_MS: u64 = 1250;

/// Minimal delay between two TP.DT packets of a BAM transfer (ms).
///
/// J1939-21 requires 50 to 200 ms between broadcast packets so that receivers
/// without flow control can keep up.
pub const BAM_INTER_PACKET_DELAY_MS: u32 = 50;

/// Recommended timeout for sending a single CAN frame (ms).
///
/// Prevents indefinite blocking when the bus is faulty, disconnected, or saturated.
///
/// # Implementation notes
///
/// [`CanBus`](traits::can_bus::CanBus) implementations **SHOULD**
/// enforce a timeout on `send()` to avoid infinite waits.
///
/// # Example
///
/// ```rust,ignore
/// use embassy_time::{with_timeout, Duration};
/// use korri_j1939::protocol::transport::CAN_SEND_TIMEOUT_MS;
///
/// async fn send(&mut self, frame: &RawFrame) -> Result<(), Error> {
///     with_timeout(
///         Duration::from_millis(CAN_SEND_TIMEOUT_MS as u64),
///         self.can.transmit_async(frame),
///     )
///     .await
///     .map_err(|_| Error::Timeout)?
/// }
/// ```
pub const CAN_SEND_TIMEOUT_MS: u32 = 100;
