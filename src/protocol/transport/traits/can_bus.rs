//! Minimal abstraction for an asynchronous CAN bus. Allows the async sender
//! to plug into various implementations (embedded HAL, SocketCAN, test doubles).
use crate::protocol::transport::can_frame::RawFrame;
use futures_util::Future;

/// Contract to send and receive CAN frames asynchronously.
pub trait CanBus {
    type Error: core::fmt::Debug;
    /// Emit a frame on the bus.
    fn send<'a>(
        &'a mut self,
        frame: &'a RawFrame,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;
    /// Retrieve the next available frame, stamped with its reception time.
    fn recv<'a>(&'a mut self) -> impl Future<Output = Result<RawFrame, Self::Error>> + 'a;
}
