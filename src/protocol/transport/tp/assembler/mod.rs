//! Transport Protocol reassembler: tracks in-flight BAM and RTS/CTS sessions,
//! rebuilds payloads from TP.DT packets, and produces the flow-control frames
//! a receiver owes the sender.
//!
//! TP.DT frames do not carry the PGN, so a session is identified by the
//! `(source, destination)` pair; BAM sessions use the global destination.
//! A new announcement for a pair already in progress replaces the old session.
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use embassy_time::{Duration, Instant};

use crate::protocol::session::config::SessionConfig;
use crate::protocol::session::observer::{SessionMode, TransportEvent};
use crate::protocol::transport::can_frame::RawFrame;
use crate::protocol::transport::can_id::{CanId, J1939Identifier};
use crate::protocol::transport::tp::{packets_for, AbortReason, TpControl, TpData};
use crate::protocol::transport::{
    GLOBAL_ADDRESS, MAX_TP_PAYLOAD, PGN_TP_CM, PGN_TP_DT, TP_CONTROL_PRIORITY,
};

//==================================================================================Enums and Structs
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Frame not part of a live session, or discarded (bad sequence,
    /// malformed control, table full, etc.).
    Ignored,
    /// Frame integrated; more packets are expected.
    FragmentConsumed,
    /// All packets were received; the complete message is available.
    MessageComplete(CompletedMessage),
}

/// Reassembled payload with the addressing announced by the TP.CM frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMessage {
    pub pgn: u32,
    pub priority: u8,
    pub source_address: u8,
    pub destination_address: u8,
    pub payload: Vec<u8>,
    /// Reception time of the last packet.
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SessionKey {
    source: u8,
    destination: u8,
}

/// Session parameters announced by TP.CM_RTS or TP.CM_BAM.
#[derive(Debug, Clone, Copy)]
struct Announce {
    mode: SessionMode,
    pgn: u32,
    priority: u8,
    total_bytes: u16,
    total_packets: u8,
    max_window: u8,
}

/// One in-progress reassembly.
#[derive(Debug)]
struct Session {
    mode: SessionMode,
    pgn: u32,
    priority: u8,
    total_bytes: usize,
    total_packets: u8,
    next_sequence: u8,
    buffer: Vec<u8>,
    last_activity: Instant,
    /// Last sequence number of the current CTS window.
    window_end: u8,
    /// Largest window the sender accepts.
    max_window: u8,
    /// This node owes the sender CTS/ACK/abort frames.
    answers: bool,
}

impl Session {
    fn remaining_packets(&self) -> u8 {
        self.total_packets
            .saturating_sub(self.next_sequence.saturating_sub(1))
    }
}

/// Owns every live transport session.
#[derive(Debug)]
pub struct TransportAssembler {
    config: SessionConfig,
    sessions: BTreeMap<SessionKey, Session>,
    outbound: Vec<RawFrame>,
    events: Vec<TransportEvent>,
}

impl Default for TransportAssembler {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl TransportAssembler {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of sessions currently receiving.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// `true` when `pgn` is handled by this module rather than dispatched.
    pub fn is_transport_pgn(pgn: u32) -> bool {
        pgn == PGN_TP_CM || pgn == PGN_TP_DT
    }

    /// Flow-control frames produced since the last call, in emission order.
    pub fn drain_outbound(&mut self) -> impl Iterator<Item = RawFrame> + '_ {
        self.outbound.drain(..)
    }

    /// Events produced since the last call, in emission order.
    pub fn drain_events(&mut self) -> impl Iterator<Item = TransportEvent> + '_ {
        self.events.drain(..)
    }

    /// Drop every session without emitting anything.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    //==================================================================================Process Functions
    /// Process a TP.CM or TP.DT frame whose identifier was already decoded.
    pub fn process_frame(&mut self, ident: &J1939Identifier, frame: &RawFrame) -> ProcessResult {
        match ident.pgn {
            PGN_TP_CM => {
                match TpControl::parse(frame.payload()) {
                    Some(control) => self.handle_control(ident, control, frame.timestamp),
                    None => self.events.push(TransportEvent::MalformedControl {
                        source: ident.source_address,
                        destination: ident.destination_address,
                    }),
                }
                ProcessResult::Ignored
            }
            PGN_TP_DT => match TpData::parse(frame.payload()) {
                Some(packet) => self.handle_data(ident, packet, frame.timestamp),
                None => ProcessResult::Ignored,
            },
            _ => ProcessResult::Ignored,
        }
    }

    /// Destroy every session silent for longer than the configured timeout.
    /// Timed-out RTS/CTS sessions are answered with an abort (reason 3).
    pub fn sweep(&mut self, now: Instant) {
        let timeout = self.config.timeout;
        let expired: Vec<SessionKey> = self
            .sessions
            .iter()
            .filter(|(_, session)| {
                now.checked_duration_since(session.last_activity)
                    .unwrap_or(Duration::from_ticks(0))
                    > timeout
            })
            .map(|(key, _)| *key)
            .collect();

        for key in expired {
            if let Some(session) = self.sessions.remove(&key) {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "TP session {=u8:#X} -> {=u8:#X} pgn {=u32:#X} timed out",
                    key.source,
                    key.destination,
                    session.pgn
                );
                if session.mode == SessionMode::RtsCts && session.answers {
                    self.push_abort(key, session.pgn, AbortReason::Timeout, now);
                }
                self.events.push(TransportEvent::SessionTimedOut {
                    source: key.source,
                    destination: key.destination,
                    pgn: session.pgn,
                });
            }
        }
    }

    //==================================================================================Control
    fn handle_control(&mut self, ident: &J1939Identifier, control: TpControl, now: Instant) {
        let key = SessionKey {
            source: ident.source_address,
            destination: ident.destination_address,
        };
        match control {
            TpControl::BroadcastAnnounce {
                total_bytes,
                total_packets,
                pgn,
            } => {
                if !ident.is_global() || !Self::sizes_consistent(total_bytes, total_packets) {
                    self.refuse(key, pgn);
                    return;
                }
                let announce = Announce {
                    mode: SessionMode::Bam,
                    pgn,
                    priority: ident.priority,
                    total_bytes,
                    total_packets,
                    max_window: 0xFF,
                };
                self.open(key, announce, now);
            }
            TpControl::RequestToSend {
                total_bytes,
                total_packets,
                max_packets,
                pgn,
            } => {
                if ident.is_global() {
                    self.refuse(key, pgn);
                    return;
                }
                if !Self::sizes_consistent(total_bytes, total_packets) {
                    if self.config.flow_control.answers(key.destination) {
                        let reason = if total_bytes as usize > MAX_TP_PAYLOAD {
                            AbortReason::MessageTooLarge
                        } else {
                            AbortReason::Other(250)
                        };
                        self.push_abort(key, pgn, reason, now);
                    }
                    self.refuse(key, pgn);
                    return;
                }
                // 0 is not a legal window size; treat it like "no limit".
                let max_window = if max_packets == 0 { 0xFF } else { max_packets };
                let announce = Announce {
                    mode: SessionMode::RtsCts,
                    pgn,
                    priority: ident.priority,
                    total_bytes,
                    total_packets,
                    max_window,
                };
                self.open(key, announce, now);
            }
            TpControl::Abort { reason, pgn } => {
                // Either side may abort: the sender (key as-is) or the receiver (key reversed).
                let reversed = SessionKey {
                    source: key.destination,
                    destination: key.source,
                };
                for candidate in [key, reversed] {
                    let matches = self
                        .sessions
                        .get(&candidate)
                        .is_some_and(|s| s.mode == SessionMode::RtsCts && s.pgn == pgn);
                    if matches {
                        self.sessions.remove(&candidate);
                        #[cfg(feature = "defmt")]
                        defmt::warn!(
                            "TP.Conn_Abort {=u8:#X} -> {=u8:#X} pgn {=u32:#X}: {:?}",
                            candidate.source,
                            candidate.destination,
                            pgn,
                            reason
                        );
                        self.events.push(TransportEvent::RemoteAbort {
                            source: candidate.source,
                            destination: candidate.destination,
                            pgn,
                            reason,
                        });
                    }
                }
            }
            // Sent by receivers to the sender; nothing to reassemble.
            TpControl::ClearToSend { .. } | TpControl::EndOfMsgAck { .. } => {
                #[cfg(feature = "defmt")]
                defmt::trace!("TP.CM {:?} from {=u8:#X}", control, key.source);
            }
        }
    }

    fn sizes_consistent(total_bytes: u16, total_packets: u8) -> bool {
        let total_bytes = total_bytes as usize;
        (1..=MAX_TP_PAYLOAD).contains(&total_bytes)
            && packets_for(total_bytes) == total_packets as usize
    }

    fn open(&mut self, key: SessionKey, announce: Announce, now: Instant) {
        let Announce {
            mode,
            pgn,
            priority,
            total_bytes,
            total_packets,
            max_window,
        } = announce;
        let answers = mode == SessionMode::RtsCts && self.config.flow_control.answers(key.destination);

        if let Some(previous) = self.sessions.remove(&key) {
            self.events.push(TransportEvent::SessionReplaced {
                source: key.source,
                destination: key.destination,
                pgn: previous.pgn,
            });
        } else if self.sessions.len() >= self.config.max_sessions {
            if answers {
                self.push_abort(key, pgn, AbortReason::SystemResources, now);
            }
            self.refuse(key, pgn);
            return;
        }

        let total_bytes = total_bytes as usize;
        let mut session = Session {
            mode,
            pgn,
            priority,
            total_bytes,
            total_packets,
            next_sequence: 1,
            buffer: Vec::with_capacity(total_bytes),
            last_activity: now,
            window_end: total_packets,
            max_window,
            answers,
        };

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "TP session {:?} {=u8:#X} -> {=u8:#X} pgn {=u32:#X}: {=usize} bytes in {=u8} packets",
            mode,
            key.source,
            key.destination,
            pgn,
            total_bytes,
            total_packets
        );
        self.events.push(TransportEvent::SessionOpened {
            mode,
            source: key.source,
            destination: key.destination,
            pgn,
            total_bytes,
        });

        if answers {
            self.push_clear_to_send(key, &mut session, now);
        }
        self.sessions.insert(key, session);
    }

    fn refuse(&mut self, key: SessionKey, pgn: u32) {
        self.events.push(TransportEvent::SessionRefused {
            source: key.source,
            destination: key.destination,
            pgn,
        });
    }

    //==================================================================================Data
    fn handle_data(
        &mut self,
        ident: &J1939Identifier,
        packet: TpData<'_>,
        now: Instant,
    ) -> ProcessResult {
        let key = SessionKey {
            source: ident.source_address,
            destination: ident.destination_address,
        };
        let Some(session) = self.sessions.get_mut(&key) else {
            self.events.push(TransportEvent::UnexpectedData {
                source: key.source,
                destination: key.destination,
                sequence: packet.sequence,
            });
            return ProcessResult::Ignored;
        };

        if packet.sequence != session.next_sequence {
            let reason = if packet.sequence == session.next_sequence.wrapping_sub(1) {
                AbortReason::DuplicateSequenceNumber
            } else {
                AbortReason::BadSequenceNumber
            };
            self.abort(key, reason, now);
            return ProcessResult::Ignored;
        }

        let missing = session.total_bytes - session.buffer.len();
        let take = missing.min(packet.bytes.len());
        session.buffer.extend_from_slice(&packet.bytes[..take]);
        session.next_sequence = session.next_sequence.wrapping_add(1);
        session.last_activity = now;

        if session.buffer.len() == session.total_bytes {
            return self.complete(key, now);
        }
        if packet.sequence >= session.total_packets {
            // Short packets left the payload incomplete.
            self.abort(key, AbortReason::BadSequenceNumber, now);
            return ProcessResult::Ignored;
        }
        if session.answers && packet.sequence == session.window_end {
            let mut session = match self.sessions.remove(&key) {
                Some(session) => session,
                None => return ProcessResult::Ignored,
            };
            self.push_clear_to_send(key, &mut session, now);
            self.sessions.insert(key, session);
        }
        ProcessResult::FragmentConsumed
    }

    fn complete(&mut self, key: SessionKey, now: Instant) -> ProcessResult {
        let Some(session) = self.sessions.remove(&key) else {
            return ProcessResult::Ignored;
        };
        if session.answers {
            let ack = TpControl::EndOfMsgAck {
                total_bytes: session.total_bytes as u16,
                total_packets: session.total_packets,
                pgn: session.pgn,
            };
            self.push_control(key, ack, now);
        }
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "TP session {=u8:#X} -> {=u8:#X} pgn {=u32:#X} complete",
            key.source,
            key.destination,
            session.pgn
        );
        self.events.push(TransportEvent::SessionCompleted {
            source: key.source,
            destination: key.destination,
            pgn: session.pgn,
        });
        ProcessResult::MessageComplete(CompletedMessage {
            pgn: session.pgn,
            priority: session.priority,
            source_address: key.source,
            destination_address: key.destination,
            payload: session.buffer,
            timestamp: now,
        })
    }

    fn abort(&mut self, key: SessionKey, reason: AbortReason, now: Instant) {
        let Some(session) = self.sessions.remove(&key) else {
            return;
        };
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "TP session {=u8:#X} -> {=u8:#X} pgn {=u32:#X} aborted: {:?}",
            key.source,
            key.destination,
            session.pgn,
            reason
        );
        if session.mode == SessionMode::RtsCts && session.answers {
            self.push_abort(key, session.pgn, reason, now);
        }
        self.events.push(TransportEvent::SessionAborted {
            source: key.source,
            destination: key.destination,
            pgn: session.pgn,
            reason,
        });
    }

    //==================================================================================Outbound
    /// Open the next CTS window: everything that remains, capped by the
    /// sender's and our own window limits.
    fn push_clear_to_send(&mut self, key: SessionKey, session: &mut Session, now: Instant) {
        let window = session
            .remaining_packets()
            .min(session.max_window)
            .min(self.config.max_packets_per_cts);
        session.window_end = session.next_sequence.saturating_sub(1).saturating_add(window);
        let cts = TpControl::ClearToSend {
            packets: window,
            next_packet: session.next_sequence,
            pgn: session.pgn,
        };
        self.push_control(key, cts, now);
    }

    fn push_abort(&mut self, key: SessionKey, pgn: u32, reason: AbortReason, now: Instant) {
        self.push_control(key, TpControl::Abort { reason, pgn }, now);
    }

    /// Queue a TP.CM frame from the session's receiver back to its sender.
    fn push_control(&mut self, key: SessionKey, control: TpControl, now: Instant) {
        if key.source == GLOBAL_ADDRESS {
            return;
        }
        let Ok(id) = CanId::builder(PGN_TP_CM, key.destination)
            .with_priority(TP_CONTROL_PRIORITY)
            .to_destination(key.source)
            .build()
        else {
            return;
        };
        self.outbound.push(RawFrame {
            id,
            extended: true,
            data: control.encode(),
            len: 8,
            timestamp: now,
        });
    }
}
