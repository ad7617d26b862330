//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (malformed input frame,
//! message composition, subscriber delivery, connection-mode transfer).
//! Protocol anomalies seen on the bus are not errors: they are reported as
//! [`TransportEvent`](crate::protocol::session::TransportEvent)s.
use crate::protocol::transport::tp::AbortReason;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// A raw CAN frame that cannot carry a J1939 message.
pub enum InvalidFrame {
    /// J1939 requires 29-bit (extended) identifiers.
    #[error("Standard 11-bit identifier: J1939 requires extended frames")]
    NotExtended,
    /// Classic CAN frames carry at most eight bytes.
    #[error("Frame data too long: {len} bytes")]
    DataTooLong { len: usize },
    /// Identifier uses bits above bit 28.
    #[error("Identifier does not fit in 29 bits: {id:#X}")]
    IdentifierOverflow { id: u32 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur while composing the frames of an outgoing message.
pub enum ComposeError {
    /// Payload exceeds what the transport protocol can carry (1785 bytes).
    #[error("Payload too large for the transport protocol: {len} bytes")]
    PayloadTooLarge { len: usize },
    /// PGN does not fit in 18 bits.
    #[error("Invalid PGN: {pgn:#X}")]
    InvalidPgn { pgn: u32 },
    /// Attempt to address a single-frame PDU2 message (PF ≥ 240) to a node.
    #[error("Invalid for addressed message: PF is too high: {pf}")]
    InvalidForFocusedMessage { pf: u8 },
    /// In PDU1 the lower 8 bits of the PGN must remain zero.
    #[error("PDU1 PGNs require PS = 0")]
    PsFocusMessageMustBeNull,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failure reported by a subscriber callback. Delivery to the remaining
/// subscribers continues regardless.
pub enum SubscriberError {
    /// The subscriber refused the message.
    #[error("Message rejected by subscriber")]
    Rejected,
    /// The subscriber's queue has no room left.
    #[error("Subscriber queue is full")]
    QueueFull,
}

//==================================================================================SEND_ERROR
#[derive(Debug, Error)]
/// Errors encountered when sending a message over a [`CanBus`](crate::protocol::transport::traits::can_bus::CanBus).
pub enum SendMessageError<E: core::fmt::Debug> {
    /// Frames could not be composed.
    #[error("Compose failed: {0:?}")]
    Compose(ComposeError),
    /// CAN layer refused or failed to send a frame.
    #[error("CAN bus send error: {0:?}")]
    Send(E),
    /// CAN layer failed while waiting for flow control.
    #[error("CAN bus receive error: {0:?}")]
    Receive(E),
    /// The receiver did not answer within the transport timeout.
    #[error("Timed out waiting for the receiver")]
    Timeout,
    /// The receiver aborted the connection.
    #[error("Connection aborted by receiver: {reason:?}")]
    Aborted { reason: AbortReason },
}

impl<E: core::fmt::Debug> From<ComposeError> for SendMessageError<E> {
    fn from(err: ComposeError) -> Self {
        Self::Compose(err)
    }
}
