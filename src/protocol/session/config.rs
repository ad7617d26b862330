//! Tunables of the session manager. Defaults follow SAE J1939-21.
use crate::protocol::transport::T1_TIMEOUT_MS;
use embassy_time::Duration;

/// Default cap on concurrently tracked transport sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Which RTS/CTS sessions the reassembler answers with flow-control frames
/// (TP.CM_CTS, TP.CM_EndOfMsgACK, TP.Conn_Abort).
pub enum FlowControl {
    /// Answer every RTS seen on the bus.
    AnswerAll,
    /// Answer only RTS addressed to this node; reassemble the rest passively.
    AnswerFor(u8),
    /// Never transmit: reassemble by listening to the real receiver's CTS.
    Passive,
}

impl FlowControl {
    /// `true` when an RTS sent to `destination` must be answered.
    pub fn answers(&self, destination: u8) -> bool {
        match *self {
            Self::AnswerAll => true,
            Self::AnswerFor(address) => address == destination,
            Self::Passive => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Configuration of the [`SessionManager`](super::SessionManager).
pub struct SessionConfig {
    /// Silence after which an in-progress session is dropped.
    pub timeout: Duration,
    pub flow_control: FlowControl,
    /// Sessions beyond this count are refused.
    pub max_sessions: usize,
    /// Largest CTS window requested (`0xFF` = everything that remains).
    pub max_packets_per_cts: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(T1_TIMEOUT_MS),
            flow_control: FlowControl::AnswerAll,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_packets_per_cts: 0xFF,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// A window of 0 would stall every transfer, so it is raised to 1.
    pub fn with_max_packets_per_cts(mut self, packets: u8) -> Self {
        self.max_packets_per_cts = packets.max(1);
        self
    }
}
