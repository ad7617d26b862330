//! Driver-facing entry point of the library.
//!
//! [`SessionManager`] owns every in-flight transport session, the subscriber
//! list, and the address table. The driver feeds it raw frames through
//! [`SessionManager::on_frame`] and calls [`SessionManager::tick`]
//! periodically (well below the 1250 ms T1 timeout, e.g. every 50 ms) to
//! expire stale sessions and collect the completed messages.
//!
//! Nothing in here blocks or reads a clock: frame timestamps and the `now`
//! passed to `tick` are the only time sources. Calls must be serialized by the
//! driver. Dropping the manager discards in-flight sessions without notice.
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use embassy_time::Instant;

use crate::error::{InvalidFrame, SubscriberError};
use crate::protocol::dispatch::{
    DecodedMessage, DispatchReport, Dispatcher, MessageFilter, SubscriberHandle,
};
use crate::protocol::managment::address_table::AddressTable;
use crate::protocol::transport::can_frame::RawFrame;
use crate::protocol::transport::can_id::{decode_identifier, J1939Identifier};
use crate::protocol::transport::tp::assembler::{
    CompletedMessage, ProcessResult, TransportAssembler,
};
use crate::protocol::transport::PGN_ADDRESS_CLAIM;

pub mod config;
pub mod observer;

pub use config::{FlowControl, SessionConfig};
pub use observer::{SessionMode, TransportEvent, TransportObserver};

pub struct SessionManager<'a> {
    assembler: TransportAssembler,
    dispatcher: Dispatcher<'a>,
    addresses: AddressTable,
    /// Messages completed since the last `tick`, in completion order.
    completed: VecDeque<DecodedMessage>,
    observer: Option<Box<dyn TransportObserver + 'a>>,
}

impl Default for SessionManager<'_> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<'a> SessionManager<'a> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            assembler: TransportAssembler::new(config),
            dispatcher: Dispatcher::new(),
            addresses: AddressTable::new(),
            completed: VecDeque::new(),
            observer: None,
        }
    }

    /// Install the hook receiving [`TransportEvent`]s.
    pub fn with_observer<O: TransportObserver + 'a>(mut self, observer: O) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &SessionConfig {
        self.assembler.config()
    }

    /// Transport sessions currently receiving.
    pub fn active_sessions(&self) -> usize {
        self.assembler.active_sessions()
    }

    /// Messages completed but not yet returned by [`tick`](Self::tick).
    pub fn pending_messages(&self) -> usize {
        self.completed.len()
    }

    pub fn addresses(&self) -> &AddressTable {
        &self.addresses
    }

    //==================================================================================Subscribers
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberHandle
    where
        F: FnMut(&DecodedMessage) -> Result<(), SubscriberError> + 'a,
    {
        self.dispatcher.subscribe(callback)
    }

    pub fn subscribe_filtered<F>(&mut self, filter: MessageFilter, callback: F) -> SubscriberHandle
    where
        F: FnMut(&DecodedMessage) -> Result<(), SubscriberError> + 'a,
    {
        self.dispatcher.subscribe_filtered(filter, callback)
    }

    pub fn unsubscribe(&mut self, handle: SubscriberHandle) -> bool {
        self.dispatcher.unsubscribe(handle)
    }

    //==================================================================================Driver
    /// Ingest one frame.
    ///
    /// # Errors
    ///
    /// [`InvalidFrame`] when the frame cannot carry J1939 (standard identifier,
    /// identifier wider than 29 bits, more than eight data bytes). The session
    /// table is left untouched in that case. Protocol anomalies are reported
    /// to the observer instead.
    pub fn on_frame(&mut self, frame: RawFrame) -> Result<(), InvalidFrame> {
        let ident = decode_identifier(&frame)?;

        if TransportAssembler::is_transport_pgn(ident.pgn) {
            if let ProcessResult::MessageComplete(message) =
                self.assembler.process_frame(&ident, &frame)
            {
                self.accept(Self::from_completed(message));
            }
        } else {
            self.accept(Self::from_single_frame(&ident, &frame));
        }

        self.flush_events();
        Ok(())
    }

    /// Expire stale sessions, then dispatch and return every message completed
    /// since the previous call.
    pub fn tick(&mut self, now: Instant) -> Vec<DecodedMessage> {
        self.assembler.sweep(now);
        self.flush_events();

        let messages: Vec<DecodedMessage> = self.completed.drain(..).collect();
        for message in &messages {
            let report = self.dispatcher.dispatch(message);
            self.report_failures(report);
        }
        messages
    }

    /// Flow-control frames (CTS, EndOfMsgACK, Conn_Abort) the driver must
    /// transmit, in emission order.
    pub fn drain_outbound(&mut self) -> impl Iterator<Item = RawFrame> + '_ {
        self.assembler.drain_outbound()
    }

    /// Drop every in-flight session and undelivered message.
    pub fn shutdown(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Session manager shutdown: {=usize} sessions dropped",
            self.assembler.active_sessions()
        );
        self.assembler.clear();
        self.assembler.drain_outbound().for_each(drop);
        self.completed.clear();
    }

    //==================================================================================Internals
    fn accept(&mut self, mut message: DecodedMessage) {
        if message.pgn == PGN_ADDRESS_CLAIM {
            let _update =
                self.addresses
                    .observe(message.pgn, message.source_address, &message.payload);
            #[cfg(feature = "defmt")]
            defmt::trace!("Address claim update: {:?}", _update);
        }
        message.source_name = self.addresses.name_of(message.source_address);
        message.destination_name = self.addresses.name_of(message.destination_address);
        self.completed.push_back(message);
    }

    fn from_single_frame(ident: &J1939Identifier, frame: &RawFrame) -> DecodedMessage {
        DecodedMessage {
            pgn: ident.pgn,
            priority: ident.priority,
            source_address: ident.source_address,
            destination_address: ident.destination_address,
            payload: frame.payload().to_vec(),
            timestamp: frame.timestamp,
            source_name: None,
            destination_name: None,
        }
    }

    fn from_completed(message: CompletedMessage) -> DecodedMessage {
        DecodedMessage {
            pgn: message.pgn,
            priority: message.priority,
            source_address: message.source_address,
            destination_address: message.destination_address,
            payload: message.payload,
            timestamp: message.timestamp,
            source_name: None,
            destination_name: None,
        }
    }

    fn flush_events(&mut self) {
        match self.observer.as_mut() {
            Some(observer) => self
                .assembler
                .drain_events()
                .for_each(|event| observer.on_event(&event)),
            None => self.assembler.drain_events().for_each(drop),
        }
    }

    fn report_failures(&mut self, report: DispatchReport) {
        for (handle, error) in report.failures {
            #[cfg(feature = "defmt")]
            defmt::warn!("Subscriber {:?} failed: {:?}", handle, error);
            if let Some(observer) = self.observer.as_mut() {
                observer.on_event(&TransportEvent::SubscriberFailed { handle, error });
            }
        }
    }
}

impl core::fmt::Debug for SessionManager<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("assembler", &self.assembler)
            .field("dispatcher", &self.dispatcher)
            .field("addresses", &self.addresses)
            .field("pending", &self.completed.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
