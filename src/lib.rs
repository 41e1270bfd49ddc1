//! # Deck Input Library
//!
//! Read the Steam Deck's built-in controls and get one debounced stream of changes.
//!
//! Two kinds of device feed the session: evdev nodes carrying the power and
//! volume keys (grabbed exclusively while running) and the hidraw node carrying
//! the controller's raw reports. Each source writes its own state bucket; an
//! aggregator merges the buckets every tick and notifies listeners of the
//! fields that changed.
//!
//! See [`session::DeckInput`] for the entry point.

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod reader;
pub mod report;
pub mod session;
