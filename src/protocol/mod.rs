//! High-level components of the J1939 message layer: transport (identifiers,
//! TP reassembly and composition), message dispatch, the session manager
//! driven by the external I/O loop, and address/NAME tracking.
pub mod dispatch;
pub mod managment;
pub mod session;
pub mod transport;
