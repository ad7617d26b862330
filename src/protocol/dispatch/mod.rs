//! Message dispatcher: decoded J1939 messages and the subscribers they are
//! delivered to.
//!
//! Delivery is synchronous and follows registration order. A subscriber that
//! returns an error is skipped and reported in the [`DispatchReport`];
//! the remaining subscribers still receive the message.
use alloc::boxed::Box;
use alloc::vec::Vec;
use embassy_time::Instant;

use crate::error::SubscriberError;
use crate::protocol::managment::iso_name::IsoName;
use crate::protocol::transport::GLOBAL_ADDRESS;

pub mod channel;

//==================================================================================DECODED_MESSAGE
/// One logical J1939 message, single-frame or reassembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub pgn: u32,
    pub priority: u8,
    pub source_address: u8,
    /// 255 for broadcast messages.
    pub destination_address: u8,
    pub payload: Vec<u8>,
    /// Reception time of the (last) frame.
    pub timestamp: Instant,
    /// NAME claimed by the source when it was known at reception.
    pub source_name: Option<IsoName>,
    /// NAME claimed by the destination when it was known at reception.
    pub destination_name: Option<IsoName>,
}

impl DecodedMessage {
    pub fn is_broadcast(&self) -> bool {
        self.destination_address == GLOBAL_ADDRESS
    }
}

//==================================================================================FILTER
/// Per-subscriber selection of messages. The default filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pgns: Option<Vec<u32>>,
    max_priority: Option<u8>,
    source: Option<u8>,
    destination: Option<u8>,
}

impl MessageFilter {
    /// Filter accepting every message.
    pub fn any() -> Self {
        Self::default()
    }

    /// Only accept the listed PGNs.
    pub fn with_pgns(mut self, pgns: &[u32]) -> Self {
        self.pgns = Some(pgns.to_vec());
        self
    }

    /// Only accept messages at least as urgent as `priority` (0 is the most urgent).
    pub fn with_max_priority(mut self, priority: u8) -> Self {
        self.max_priority = Some(priority & 0x07);
        self
    }

    pub fn from_source(mut self, source_address: u8) -> Self {
        self.source = Some(source_address);
        self
    }

    /// Only accept messages sent to `destination_address`. Broadcasts are
    /// accepted as well since they address every node.
    pub fn to_destination(mut self, destination_address: u8) -> Self {
        self.destination = Some(destination_address);
        self
    }

    pub fn matches(&self, message: &DecodedMessage) -> bool {
        let pgn_ok = self
            .pgns
            .as_ref()
            .map_or(true, |pgns| pgns.contains(&message.pgn));
        let priority_ok = self
            .max_priority
            .map_or(true, |max| message.priority <= max);
        let source_ok = self.source.map_or(true, |sa| message.source_address == sa);
        let destination_ok = self
            .destination
            .map_or(true, |da| message.is_broadcast() || message.destination_address == da);
        pgn_ok && priority_ok && source_ok && destination_ok
    }
}

//==================================================================================SUBSCRIBERS
/// Handle returned by [`Dispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscriberHandle(u32);

/// Callback invoked for every delivered message.
pub type SubscriberFn<'a> = Box<dyn FnMut(&DecodedMessage) -> Result<(), SubscriberError> + 'a>;

struct Subscription<'a> {
    handle: SubscriberHandle,
    filter: MessageFilter,
    callback: SubscriberFn<'a>,
}

/// Outcome of delivering one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers that accepted the message.
    pub delivered: usize,
    /// Subscribers that failed, in registration order.
    pub failures: Vec<(SubscriberHandle, SubscriberError)>,
}

/// Ordered list of subscribers.
#[derive(Default)]
pub struct Dispatcher<'a> {
    subscriptions: Vec<Subscription<'a>>,
    next_handle: u32,
}

impl<'a> Dispatcher<'a> {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_handle: 0,
        }
    }

    /// Register a subscriber receiving every message.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberHandle
    where
        F: FnMut(&DecodedMessage) -> Result<(), SubscriberError> + 'a,
    {
        self.subscribe_filtered(MessageFilter::any(), callback)
    }

    /// Register a subscriber receiving the messages accepted by `filter`.
    pub fn subscribe_filtered<F>(&mut self, filter: MessageFilter, callback: F) -> SubscriberHandle
    where
        F: FnMut(&DecodedMessage) -> Result<(), SubscriberError> + 'a,
    {
        let handle = SubscriberHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.subscriptions.push(Subscription {
            handle,
            filter,
            callback: Box::new(callback),
        });
        handle
    }

    /// Remove a subscriber. Returns `false` when the handle is unknown.
    pub fn unsubscribe(&mut self, handle: SubscriberHandle) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.handle != handle);
        self.subscriptions.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Deliver `message` to every matching subscriber in registration order.
    pub fn dispatch(&mut self, message: &DecodedMessage) -> DispatchReport {
        let mut report = DispatchReport::default();
        for subscription in self
            .subscriptions
            .iter_mut()
            .filter(|s| s.filter.matches(message))
        {
            match (subscription.callback)(message) {
                Ok(()) => report.delivered += 1,
                Err(error) => report.failures.push((subscription.handle, error)),
            }
        }
        report
    }
}

impl core::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
