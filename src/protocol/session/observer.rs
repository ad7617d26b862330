//! Observation hook for protocol anomalies and session life-cycle.
//!
//! Anomalies on the bus never surface as errors from
//! [`SessionManager::on_frame`](super::SessionManager::on_frame); they are
//! reported here so the driver can log or count them.
use crate::error::SubscriberError;
use crate::protocol::dispatch::SubscriberHandle;
use crate::protocol::transport::tp::AbortReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Transfer mode of a transport session.
pub enum SessionMode {
    /// Broadcast Announce Message: connectionless, no flow control.
    Bam,
    /// Request/Clear To Send: peer-to-peer with flow control.
    RtsCts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Something worth reporting happened while processing traffic.
pub enum TransportEvent {
    /// A TP.CM_RTS or TP.CM_BAM opened a session.
    SessionOpened {
        mode: SessionMode,
        source: u8,
        destination: u8,
        pgn: u32,
        total_bytes: usize,
    },
    /// A newer announcement from the same source replaced a running session.
    SessionReplaced { source: u8, destination: u8, pgn: u32 },
    /// The last packet arrived and the message was handed to the dispatcher.
    SessionCompleted { source: u8, destination: u8, pgn: u32 },
    /// The session was dropped locally (sequence violation, bad window...).
    SessionAborted {
        source: u8,
        destination: u8,
        pgn: u32,
        reason: AbortReason,
    },
    /// No packet arrived within the timeout.
    SessionTimedOut { source: u8, destination: u8, pgn: u32 },
    /// One side of a connection sent TP.Conn_Abort.
    RemoteAbort {
        source: u8,
        destination: u8,
        pgn: u32,
        reason: AbortReason,
    },
    /// The announcement was refused (session table full, invalid sizes).
    SessionRefused { source: u8, destination: u8, pgn: u32 },
    /// TP.DT without a matching session.
    UnexpectedData { source: u8, destination: u8, sequence: u8 },
    /// TP.CM frame that could not be parsed.
    MalformedControl { source: u8, destination: u8 },
    /// A subscriber callback returned an error; delivery continued.
    SubscriberFailed {
        handle: SubscriberHandle,
        error: SubscriberError,
    },
}

/// Receives [`TransportEvent`]s from the session manager.
pub trait TransportObserver {
    fn on_event(&mut self, event: &TransportEvent);
}

impl<F: FnMut(&TransportEvent)> TransportObserver for F {
    fn on_event(&mut self, event: &TransportEvent) {
        self(event)
    }
}
