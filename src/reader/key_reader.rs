//! # Keyed-Event Reader
//!
//! Drives one [`KeySource`]: grabs it, records power/volume transitions into its
//! bucket, and always releases the grab on the way out.
//!
//! A reader without a bucket is a *muted* reader: it holds the grab so other
//! consumers never see the device's presses, and discards everything it reads.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::KeySource;
use crate::controller::bucket::BucketWriter;
use crate::controller::keys::map_key_transition;
use crate::error::{DeckInputError, Result};

/// Run a keyed-event reader until cancelled or the device fails
///
/// # Arguments
///
/// * `source` - Opened key device, exclusively owned by this reader
/// * `writer` - Bucket to record into, or `None` for a muted device
/// * `cancel` - Session cancellation token
///
/// # Errors
///
/// - `DeviceOpen`: the exclusive capture could not be acquired
/// - `DeviceRead`: the device failed mid-loop
///
/// Release failures are logged, never returned.
pub async fn run_key_reader(
    mut source: Box<dyn KeySource>,
    writer: Option<BucketWriter>,
    cancel: CancellationToken,
) -> Result<()> {
    let path = source.path().to_string();

    if let Err(e) = source.grab() {
        return Err(DeckInputError::DeviceOpen { path, source: e });
    }
    info!(
        "Grabbed key device {}{}",
        path,
        if writer.is_none() { " (muted)" } else { "" }
    );

    let result = read_loop(source.as_mut(), writer.as_ref(), &cancel).await;
    release(source.as_mut());
    result
}

async fn read_loop(
    source: &mut dyn KeySource,
    writer: Option<&BucketWriter>,
    cancel: &CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Key reader for {} cancelled", source.path());
                return Ok(());
            }
            next = source.next_key() => {
                let transition = next.map_err(|e| DeckInputError::DeviceRead {
                    path: source.path().to_string(),
                    source: e,
                })?;

                let Some(writer) = writer else { continue };
                if let Some((field, value)) = map_key_transition(transition) {
                    debug!("{}: {} = {}", source.path(), field, value);
                    writer.set(field, value);
                }
            }
        }
    }
}

/// Best-effort release of the exclusive capture.
fn release(source: &mut dyn KeySource) {
    match source.ungrab() {
        Ok(()) => info!("Released key device {}", source.path()),
        Err(e) => {
            let err = DeckInputError::CaptureRelease {
                path: source.path().to_string(),
                source: e,
            };
            error!("{}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::bucket::bucket;
    use crate::controller::field::{Field, FieldValue};
    use crate::reader::mocks::MockKeySource;
    use crate::reader::KeyTransition;
    use std::io;
    use std::time::Duration;

    fn key(code: u16, value: i32) -> io::Result<KeyTransition> {
        Ok(KeyTransition { code, value })
    }

    #[tokio::test]
    async fn test_records_recorded_keys_only() {
        let source = MockKeySource::new(
            "/dev/input/event5",
            vec![key(116, 1), key(30, 1), key(114, 1), key(114, 0)],
        );
        let probe = source.probe();
        let (writer, reader) = bucket("keys");
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_key_reader(Box::new(source), Some(writer), cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio_test::assert_ok!(task.await.unwrap());

        let state = reader.snapshot();
        assert_eq!(state.len(), 2);
        assert_eq!(state[&Field::Power], FieldValue::Bool(true));
        assert_eq!(state[&Field::VolumeDown], FieldValue::Bool(false));

        let probe = probe.lock().unwrap();
        assert_eq!(probe.grabs, 1);
        assert_eq!(probe.ungrabs, 1);
        assert!(probe.closed);
    }

    #[tokio::test]
    async fn test_read_error_ends_reader_and_releases() {
        let source = MockKeySource::new(
            "/dev/input/event5",
            vec![key(115, 1), Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))],
        );
        let probe = source.probe();
        let (writer, reader) = bucket("keys");

        let result = run_key_reader(Box::new(source), Some(writer), CancellationToken::new()).await;
        match result {
            Err(DeckInputError::DeviceRead { path, source }) => {
                assert_eq!(path, "/dev/input/event5");
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("Expected DeviceRead error, got: {:?}", other),
        }

        assert_eq!(reader.snapshot()[&Field::VolumeUp], FieldValue::Bool(true));
        assert_eq!(probe.lock().unwrap().ungrabs, 1);
    }

    #[tokio::test]
    async fn test_grab_failure_is_open_error() {
        let mut source = MockKeySource::new("/dev/input/event2", vec![key(116, 1)]);
        source.grab_error = Some(io::ErrorKind::ResourceBusy);
        let probe = source.probe();

        let result = run_key_reader(Box::new(source), None, CancellationToken::new()).await;
        assert!(matches!(result, Err(DeckInputError::DeviceOpen { .. })));

        // Nothing to release on a device that was never grabbed
        let probe = probe.lock().unwrap();
        assert_eq!(probe.reads, 0);
        assert_eq!(probe.ungrabs, 0);
        assert!(probe.closed);
    }

    #[tokio::test]
    async fn test_release_failure_is_not_propagated() {
        let mut source = MockKeySource::new("/dev/input/event5", vec![]);
        source.ungrab_error = Some(io::ErrorKind::PermissionDenied);
        let probe = source.probe();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_key_reader(Box::new(source), None, cancel).await;
        assert!(result.is_ok());
        // The failed release is retried once more when the device is dropped
        assert_eq!(probe.lock().unwrap().ungrabs, 2);
    }

    #[tokio::test]
    async fn test_aborted_reader_releases_on_drop() {
        let source = MockKeySource::new("/dev/input/event5", vec![key(116, 1)]);
        let probe = source.probe();
        let (writer, _reader) = bucket("keys");

        let task = tokio::spawn(run_key_reader(
            Box::new(source),
            Some(writer),
            CancellationToken::new(),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let probe = probe.lock().unwrap();
        assert_eq!(probe.grabs, 1);
        assert_eq!(probe.ungrabs, 1);
        assert!(probe.closed);
    }

    #[tokio::test]
    async fn test_muted_reader_drains_events() {
        let source = MockKeySource::new("/dev/input/event8", vec![key(116, 1), key(116, 0)]);
        let probe = source.probe();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_key_reader(Box::new(source), None, cancel.clone()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        assert!(task.await.unwrap().is_ok());

        let probe = probe.lock().unwrap();
        assert_eq!(probe.reads, 2);
        assert_eq!(probe.grabs, 1);
        assert_eq!(probe.ungrabs, 1);
    }
}
