//! Subscriber forwarding decoded messages into a pre-allocated
//! [`embassy_sync::channel::Channel`], so an async task can consume them.
//!
//! Delivery never blocks: a full channel reports
//! [`SubscriberError::QueueFull`] and the message is dropped for that
//! subscriber only.
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use crate::error::SubscriberError;
use crate::protocol::dispatch::DecodedMessage;

/// Forwards every message it receives into `channel`.
pub struct ChannelForwarder<'a, M: RawMutex, const N: usize> {
    channel: &'a Channel<M, DecodedMessage, N>,
}

impl<'a, M: RawMutex, const N: usize> ChannelForwarder<'a, M, N> {
    pub fn new(channel: &'a Channel<M, DecodedMessage, N>) -> Self {
        Self { channel }
    }

    pub fn forward(&self, message: &DecodedMessage) -> Result<(), SubscriberError> {
        self.channel
            .try_send(message.clone())
            .map_err(|_| SubscriberError::QueueFull)
    }

    /// Turn the forwarder into a callback for
    /// [`Dispatcher::subscribe`](crate::protocol::dispatch::Dispatcher::subscribe).
    pub fn into_subscriber(self) -> impl FnMut(&DecodedMessage) -> Result<(), SubscriberError> + 'a
    where
        M: 'a,
    {
        move |message| self.forward(message)
    }
}
