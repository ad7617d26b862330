//! Asynchronous delay source for the transmit path: BAM packet spacing and
//! the T1 deadline while waiting for flow control.

/// Delay provider, usually backed by `embassy_time::Timer` on target.
pub trait KorriTimer {
    /// Complete after `millis` milliseconds. Dropping the future cancels
    /// the wait.
    fn delay_ms<'a>(&'a mut self, millis: u32) -> impl core::future::Future<Output = ()> + 'a;
}
