//! # Controller Module
//!
//! Steam Deck input devices and the state they produce.
//!
//! This module handles:
//! - The named input fields and their value types
//! - Per-source state buckets (single writer, many snapshot readers)
//! - The keyed-event device (power/volume keys) via evdev
//! - The raw controller report device via hidraw

pub mod bucket;
pub mod field;
pub mod hidraw;
pub mod keys;
