//! Async seams of the transmit path: the CAN bus, the delay source, and the
//! `MessageSender` extension built on top of both.
pub mod can_bus;
pub mod korri_timer;
pub mod message_sender;
