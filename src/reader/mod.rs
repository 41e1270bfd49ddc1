//! # Reader Module
//!
//! Source readers that feed state buckets.
//!
//! This module handles:
//! - Trait abstractions over the two device kinds, so readers can be tested without hardware
//! - The keyed-event reader (power/volume keys, exclusive capture)
//! - The raw-report reader (controller reports, blocking worker)

use async_trait::async_trait;
use std::io;
use std::time::Duration;

pub mod key_reader;
pub mod report_reader;

/// One EV_KEY transition: key code and key state (0 released, 1 pressed, 2 repeat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    pub code: u16,
    pub value: i32,
}

/// Trait for discrete key-event devices
#[async_trait]
pub trait KeySource: Send {
    /// Device path, for logs and errors
    fn path(&self) -> &str;

    /// Request exclusive capture so no other consumer sees the events
    fn grab(&mut self) -> io::Result<()>;

    /// Release exclusive capture
    fn ungrab(&mut self) -> io::Result<()>;

    /// Wait for the next key transition
    async fn next_key(&mut self) -> io::Result<KeyTransition>;
}

/// Trait for raw report devices
///
/// Reads block the calling thread, so readers run this on a blocking worker.
pub trait ReportSource: Send {
    /// Device path, for logs and errors
    fn path(&self) -> &str;

    /// Read one report into `buf`, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read; `0` means the timeout elapsed.
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}
