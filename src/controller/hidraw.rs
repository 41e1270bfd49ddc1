//! # Raw HID Device
//!
//! Steam Deck controller reports read from a Linux hidraw node through `hidapi`.
//!
//! The controller emits a 64-byte report roughly every millisecond; see
//! [`crate::report::layout`] for its contents.

use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use std::io;
use std::time::Duration;
use std::fmt::Write;
use tracing::{debug, info};

use crate::error::{DeckInputError, Result};
use crate::reader::ReportSource;

/// Largest report descriptor the HID class allows
const MAX_REPORT_DESCRIPTOR_SIZE: usize = 4096;

/// hidraw device handle
pub struct HidrawDevice {
    device: HidDevice,
    device_path: String,
}

impl std::fmt::Debug for HidrawDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidrawDevice")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl HidrawDevice {
    /// Open a hidraw node by path
    ///
    /// Logs the manufacturer and product strings reported by the device.
    ///
    /// # Errors
    ///
    /// Returns `DeviceOpen` if the path is invalid, the node cannot be opened,
    /// or the HID library fails to initialise.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deck_input::controller::hidraw::HidrawDevice;
    ///
    /// let device = HidrawDevice::open("/dev/hidraw2")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: &str) -> Result<Self> {
        let open_err = |source: io::Error| DeckInputError::DeviceOpen {
            path: path.to_string(),
            source,
        };

        let c_path = CString::new(path)
            .map_err(|e| open_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let api = HidApi::new_without_enumerate().map_err(|e| open_err(io::Error::other(e)))?;
        let device = api
            .open_path(&c_path)
            .map_err(|e| open_err(io::Error::other(e)))?;

        let manufacturer = device.get_manufacturer_string().ok().flatten();
        let product = device.get_product_string().ok().flatten();
        info!(
            "Opened hidraw device {}: {} {}",
            path,
            manufacturer.as_deref().unwrap_or("unknown"),
            product.as_deref().unwrap_or("unknown")
        );

        let mut descriptor = vec![0u8; MAX_REPORT_DESCRIPTOR_SIZE];
        match device.get_report_descriptor(&mut descriptor) {
            Ok(len) => debug!("{} report descriptor: {}", path, descriptor_hex(&descriptor[..len])),
            Err(e) => debug!("{} report descriptor unavailable: {}", path, e),
        }

        Ok(Self {
            device,
            device_path: path.to_string(),
        })
    }
}

/// Renders bytes as contiguous lower-case hex.
fn descriptor_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

impl ReportSource for HidrawDevice {
    fn path(&self) -> &str {
        &self.device_path
    }

    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(io::Error::other)
    }
}
