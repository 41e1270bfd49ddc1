//! # Raw-Report Reader
//!
//! Polls one [`ReportSource`] on a blocking worker thread, decodes every report
//! and overwrites the controller bucket.
//!
//! Each read is bounded by the read timeout and followed by a short sleep, so
//! the worker notices cancellation within one read timeout plus one poll interval.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::ReportSource;
use crate::config::Config;
use crate::controller::bucket::BucketWriter;
use crate::error::{DeckInputError, Result};
use crate::report::decoder::decode_report;
use crate::report::layout::REPORT_BUFFER_SIZE;

/// Polling parameters of the raw-report reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportReaderSettings {
    /// Read buffer size in bytes
    pub report_size: usize,
    /// Upper bound of one blocking read
    pub read_timeout: Duration,
    /// Sleep between reads
    pub poll_interval: Duration,
}

impl Default for ReportReaderSettings {
    fn default() -> Self {
        Self {
            report_size: REPORT_BUFFER_SIZE,
            read_timeout: Duration::from_millis(5),
            poll_interval: Duration::from_millis(1),
        }
    }
}

impl From<&Config> for ReportReaderSettings {
    fn from(config: &Config) -> Self {
        Self {
            report_size: config.devices.report_size,
            read_timeout: Duration::from_millis(config.timing.read_timeout_ms),
            poll_interval: Duration::from_millis(config.timing.poll_interval_ms),
        }
    }
}

/// Run the raw-report reader on the blocking thread pool
///
/// The device is moved onto the worker and closed there when the loop ends.
///
/// # Errors
///
/// - `DeviceRead`: the device failed mid-loop
/// - `Task`: the worker panicked
pub async fn run_report_reader(
    source: Box<dyn ReportSource>,
    writer: BucketWriter,
    settings: ReportReaderSettings,
    cancel: CancellationToken,
) -> Result<()> {
    tokio::task::spawn_blocking(move || poll_reports(source, writer, settings, cancel))
        .await
        .map_err(|e| DeckInputError::Task(format!("report reader worker: {}", e)))?
}

/// Blocking poll loop
///
/// Reports shorter than the minimum are skipped; fields missing from a short
/// report keep their previous value in the bucket.
pub fn poll_reports(
    mut source: Box<dyn ReportSource>,
    writer: BucketWriter,
    settings: ReportReaderSettings,
    cancel: CancellationToken,
) -> Result<()> {
    let path = source.path().to_string();
    let mut buf = vec![0u8; settings.report_size];
    let mut reports: u64 = 0;

    info!("Polling reports from {}", path);

    while !cancel.is_cancelled() {
        let len = source
            .read_report(&mut buf, settings.read_timeout)
            .map_err(|e| DeckInputError::DeviceRead {
                path: path.clone(),
                source: e,
            })?;

        match decode_report(&buf[..len]) {
            Ok(fields) => {
                writer.update(fields);
                reports += 1;
            }
            Err(e) => trace!("{}: skipping report: {}", path, e),
        }

        std::thread::sleep(settings.poll_interval);
    }

    debug!("Report reader for {} cancelled after {} reports", path, reports);
    Ok(())
}
