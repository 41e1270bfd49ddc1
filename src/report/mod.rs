//! # Report Module
//!
//! Decoding of the Steam Deck's raw HID input report.
//!
//! This module handles:
//! - The fixed report layout as a table of (field, offset, encoding) rows
//! - Bit and little-endian axis extraction
//! - Tolerance for short reports (fields past the end are left out)

pub mod layout;
pub mod decoder;
