//! `korri-j1939` library: a sans-I/O SAE J1939 message layer for `no_std`
//! targets. Raw CAN frames go in through [`SessionManager::on_frame`], the
//! transport protocol (BAM and RTS/CTS) is reassembled internally, and decoded
//! messages come back out of [`SessionManager::tick`] and registered
//! subscribers. Outgoing payloads are fragmented by
//! [`compose_message`](protocol::transport::tp::composer::compose_message).
//!
//! [`SessionManager::on_frame`]: protocol::session::SessionManager::on_frame
//! [`SessionManager::tick`]: protocol::session::SessionManager::tick
#![no_std]
//==================================================================================
extern crate alloc;
//==================================================================================
/// Frame, composition, dispatch, and transfer errors.
pub mod error;
/// J1939 protocol implementation: CAN transport, TP sessions, dispatch,
/// and address tracking.
pub mod protocol;
//==================================================================================
