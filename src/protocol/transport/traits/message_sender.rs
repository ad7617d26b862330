//! `CanBus` extension transmitting complete J1939 messages: it composes the
//! frames, paces BAM packets, and runs the sender side of RTS/CTS transfers
//! (waiting for CTS windows and the final EndOfMsgACK).
//!
//! # Frames received during a transfer
//!
//! While waiting for flow control the bus keeps delivering unrelated traffic.
//! Those frames are handed to a [`FrameSink`], typically the
//! [`SessionManager`], so nothing is lost.
use futures_util::future::{select, Either};
use futures_util::pin_mut;

use crate::error::SendMessageError;
use crate::protocol::session::SessionManager;
use crate::protocol::transport::can_frame::RawFrame;
use crate::protocol::transport::can_id::CanId;
use crate::protocol::transport::tp::composer::{compose_message, transfer_kind, TransferKind};
use crate::protocol::transport::tp::{AbortReason, TpControl};
use crate::protocol::transport::traits::{can_bus::CanBus, korri_timer::KorriTimer};
use crate::protocol::transport::{
    BAM_INTER_PACKET_DELAY_MS, PGN_TP_CM, T1_TIMEOUT_MS, TP_CONTROL_PRIORITY,
};

/// Destination of frames that arrive while a transfer waits for flow control.
pub trait FrameSink {
    fn accept(&mut self, frame: RawFrame);
}

/// Sink dropping every frame.
pub struct DiscardFrames;

impl FrameSink for DiscardFrames {
    fn accept(&mut self, _frame: RawFrame) {}
}

impl FrameSink for SessionManager<'_> {
    fn accept(&mut self, frame: RawFrame) {
        // Non-J1939 traffic (standard identifiers) is not ours to report.
        let _ = self.on_frame(frame);
    }
}

#[derive(Debug, Clone, Copy)]
/// Parameters of a message to transmit.
pub struct OutboundMessage<'a> {
    pub pgn: u32,
    pub priority: u8,
    pub source_address: u8,
    /// 255 broadcasts the message.
    pub destination_address: u8,
    pub payload: &'a [u8],
}

/// Trait extending `CanBus` with a complete J1939 transmit path.
pub trait MessageSender: CanBus
where
    <Self as CanBus>::Error: core::fmt::Debug,
{
    /// Compose and send a message.
    ///
    /// - **≤ 8 bytes**: a single frame.
    /// - **Broadcast**: TP.CM_BAM then TP.DT packets spaced by
    ///   [`BAM_INTER_PACKET_DELAY_MS`].
    /// - **Addressed**: TP.CM_RTS, then TP.DT packets released per CTS window
    ///   until the receiver acknowledges with TP.CM_EndOfMsgACK.
    ///
    /// # Errors
    ///
    /// - [`SendMessageError::Compose`] when the frames cannot be built
    /// - [`SendMessageError::Send`] / [`SendMessageError::Receive`] on bus failures
    /// - [`SendMessageError::Timeout`] when the receiver stays silent for
    ///   [`T1_TIMEOUT_MS`]; a TP.Conn_Abort (reason 3) is sent first
    /// - [`SendMessageError::Aborted`] when the receiver aborts
    fn send_message<'a, T: KorriTimer, S: FrameSink>(
        &'a mut self,
        message: OutboundMessage<'a>,
        timer: &'a mut T,
        sink: &'a mut S,
    ) -> impl core::future::Future<Output = Result<(), SendMessageError<Self::Error>>> + 'a;
}

impl<C: CanBus> MessageSender for C
where
    C::Error: core::fmt::Debug,
{
    fn send_message<'a, T: KorriTimer, S: FrameSink>(
        &'a mut self,
        message: OutboundMessage<'a>,
        timer: &'a mut T,
        sink: &'a mut S,
    ) -> impl core::future::Future<Output = Result<(), SendMessageError<Self::Error>>> + 'a {
        async move {
            let frames = compose_message(
                message.pgn,
                message.priority,
                message.source_address,
                message.destination_address,
                message.payload,
            )?;

            match transfer_kind(message.payload.len(), message.destination_address) {
                TransferKind::SingleFrame => {
                    for frame in &frames {
                        self.send(frame).await.map_err(SendMessageError::Send)?;
                    }
                    Ok(())
                }
                TransferKind::Broadcast => {
                    for (index, frame) in frames.iter().enumerate() {
                        if index > 0 {
                            timer.delay_ms(BAM_INTER_PACKET_DELAY_MS).await;
                        }
                        self.send(frame).await.map_err(SendMessageError::Send)?;
                    }
                    Ok(())
                }
                TransferKind::Connection => {
                    send_connection(self, &frames, &message, timer, sink).await
                }
            }
        }
    }
}

/// Sender side of an RTS/CTS transfer. `frames[0]` is the RTS and
/// `frames[n]` is the TP.DT packet with sequence number `n`.
async fn send_connection<C: CanBus, T: KorriTimer, S: FrameSink>(
    bus: &mut C,
    frames: &[RawFrame],
    message: &OutboundMessage<'_>,
    timer: &mut T,
    sink: &mut S,
) -> Result<(), SendMessageError<C::Error>>
where
    C::Error: core::fmt::Debug,
{
    let local = message.source_address;
    let peer = message.destination_address;
    bus.send(&frames[0]).await.map_err(SendMessageError::Send)?;

    loop {
        let control = await_control(bus, timer, sink, local, peer, message.pgn)
            .await
            .map_err(SendMessageError::Receive)?;

        match control {
            None => {
                let abort = abort_frame(local, peer, message.pgn, AbortReason::Timeout);
                if let Some(abort) = abort {
                    bus.send(&abort).await.map_err(SendMessageError::Send)?;
                }
                return Err(SendMessageError::Timeout);
            }
            Some(TpControl::ClearToSend {
                packets,
                next_packet,
                ..
            }) => {
                // A window of 0 means "hold": keep waiting for the next CTS.
                // Sequence numbers start at 1, so index 0 (the RTS) is never resent.
                let first = (next_packet as usize).max(1);
                let last = (first + packets as usize).min(frames.len());
                for frame in frames.get(first..last).unwrap_or(&[]) {
                    bus.send(frame).await.map_err(SendMessageError::Send)?;
                }
            }
            Some(TpControl::EndOfMsgAck { .. }) => return Ok(()),
            Some(TpControl::Abort { reason, .. }) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Receiver {=u8:#X} aborted transfer: {:?}", peer, reason);
                return Err(SendMessageError::Aborted { reason });
            }
            Some(_) => {}
        }
    }
}

/// Wait up to [`T1_TIMEOUT_MS`] for a TP.CM frame from `peer` to `local` about
/// `pgn`. Returns `None` on timeout; every other frame goes to `sink`.
async fn await_control<C: CanBus, T: KorriTimer, S: FrameSink>(
    bus: &mut C,
    timer: &mut T,
    sink: &mut S,
    local: u8,
    peer: u8,
    pgn: u32,
) -> Result<Option<TpControl>, C::Error> {
    let deadline = timer.delay_ms(T1_TIMEOUT_MS as u32);
    pin_mut!(deadline);

    loop {
        let incoming = {
            let recv = bus.recv();
            pin_mut!(recv);

            match select(deadline.as_mut(), recv).await {
                Either::Left(_) => return Ok(None),
                Either::Right((incoming, _)) => incoming?,
            }
        };

        let is_flow_control = incoming.extended
            && incoming.id.pgn() == PGN_TP_CM
            && incoming.id.source_address() == peer
            && incoming.id.destination() == Some(local);
        if is_flow_control {
            if let Some(control) = TpControl::parse(incoming.payload()) {
                if control.pgn() == pgn {
                    return Ok(Some(control));
                }
            }
        }
        sink.accept(incoming);
    }
}

fn abort_frame(local: u8, peer: u8, pgn: u32, reason: AbortReason) -> Option<RawFrame> {
    let id = CanId::builder(PGN_TP_CM, local)
        .with_priority(TP_CONTROL_PRIORITY)
        .to_destination(peer)
        .build()
        .ok()?;
    Some(RawFrame {
        id,
        extended: true,
        data: TpControl::Abort { reason, pgn }.encode(),
        len: 8,
        timestamp: embassy_time::Instant::from_ticks(0),
    })
}
