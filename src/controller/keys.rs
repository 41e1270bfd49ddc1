//! # Keyed-Event Device
//!
//! Power and volume buttons of the Steam Deck, read from a Linux evdev node.
//!
//! ## Key Codes (EV_KEY)
//!
//! | Field | evdev Key | Code |
//! |-------|-----------|------|
//! | `VOLUME_DOWN` | KEY_VOLUMEDOWN | 114 |
//! | `VOLUME_UP` | KEY_VOLUMEUP | 115 |
//! | `POWER` | KEY_POWER | 116 |
//!
//! Any non-zero key state (press or autorepeat) counts as pressed.

use async_trait::async_trait;
use evdev::{Device, EventStream, EventType, Key};
use std::io;
use tracing::{debug, info, warn};

use super::field::{Field, FieldValue};
use crate::error::{DeckInputError, Result};
use crate::reader::{KeySource, KeyTransition};

/// Maps an evdev key code to its field, for the three recorded keys only.
pub fn field_for_key(code: u16) -> Option<Field> {
    match Key::new(code) {
        Key::KEY_VOLUMEDOWN => Some(Field::VolumeDown),
        Key::KEY_VOLUMEUP => Some(Field::VolumeUp),
        Key::KEY_POWER => Some(Field::Power),
        _ => None,
    }
}

/// Converts a key transition into a field update, if the key is recorded.
///
/// # Examples
///
/// ```
/// use deck_input::controller::field::{Field, FieldValue};
/// use deck_input::controller::keys::map_key_transition;
/// use deck_input::reader::KeyTransition;
///
/// let update = map_key_transition(KeyTransition { code: 116, value: 1 });
/// assert_eq!(update, Some((Field::Power, FieldValue::Bool(true))));
/// assert_eq!(map_key_transition(KeyTransition { code: 30, value: 1 }), None);
/// ```
pub fn map_key_transition(transition: KeyTransition) -> Option<(Field, FieldValue)> {
    field_for_key(transition.code).map(|field| (field, FieldValue::Bool(transition.value != 0)))
}

/// evdev input device handle
///
/// Owns the event stream of one `/dev/input/eventX` node. A grab still held
/// when the handle is dropped is released in `Drop`.
pub struct EvdevKeyDevice {
    stream: EventStream,
    device_path: String,
    grabbed: bool,
}

impl std::fmt::Debug for EvdevKeyDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevKeyDevice")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl EvdevKeyDevice {
    /// Open an evdev node and attach it to the tokio reactor
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DeviceOpen` if the node does not exist, permission is denied,
    /// or it cannot be registered for async reads.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deck_input::controller::keys::EvdevKeyDevice;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let device = EvdevKeyDevice::open("/dev/input/event5")?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str) -> Result<Self> {
        let open_err = |source| DeckInputError::DeviceOpen {
            path: path.to_string(),
            source,
        };

        let device = Device::open(path).map_err(open_err)?;
        info!(
            "Opened key device {}: {}",
            path,
            device.name().unwrap_or("unnamed")
        );

        let stream = device.into_event_stream().map_err(open_err)?;
        Ok(Self {
            stream,
            device_path: path.to_string(),
            grabbed: false,
        })
    }
}

impl Drop for EvdevKeyDevice {
    fn drop(&mut self) {
        if self.grabbed {
            if let Err(e) = self.stream.device_mut().ungrab() {
                warn!("Failed to release {} on drop: {}", self.device_path, e);
            }
        }
    }
}

#[async_trait]
impl KeySource for EvdevKeyDevice {
    fn path(&self) -> &str {
        &self.device_path
    }

    fn grab(&mut self) -> io::Result<()> {
        self.stream.device_mut().grab()?;
        self.grabbed = true;
        Ok(())
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.stream.device_mut().ungrab()?;
        self.grabbed = false;
        Ok(())
    }

    async fn next_key(&mut self) -> io::Result<KeyTransition> {
        loop {
            let event = self.stream.next_event().await?;
            if event.event_type() == EventType::KEY {
                return Ok(KeyTransition {
                    code: event.code(),
                    value: event.value(),
                });
            }
            // Sync and misc events carry no key state
            debug!("{}: skipping event type {:?}", self.device_path, event.event_type());
        }
    }
}
