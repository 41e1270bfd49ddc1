//! # State Buckets
//!
//! Per-reader state fragments shared with the aggregator.
//!
//! Each bucket is a `watch` channel. The reader owns the only [`BucketWriter`]
//! (it is not `Clone`), so every field has exactly one writer. The aggregator
//! holds [`BucketReader`]s and copies each bucket out once per tick.

use std::collections::BTreeMap;
use tokio::sync::watch;

use super::field::{Field, FieldValue};

/// Latest value of every field a reader has produced.
pub type StateBucket = BTreeMap<Field, FieldValue>;

/// Creates a named, empty bucket and returns its writer/reader pair.
pub fn bucket(name: &'static str) -> (BucketWriter, BucketReader) {
    let (tx, rx) = watch::channel(StateBucket::new());
    (BucketWriter { name, tx }, BucketReader { name, rx })
}

/// Exclusive write side of a bucket.
#[derive(Debug)]
pub struct BucketWriter {
    name: &'static str,
    tx: watch::Sender<StateBucket>,
}

impl BucketWriter {
    /// Bucket name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sets one field. Receivers are only notified when the value changed.
    pub fn set(&self, field: Field, value: FieldValue) {
        self.tx
            .send_if_modified(|state| state.insert(field, value) != Some(value));
    }

    /// Overwrites every field present in `fields`, keeping the others.
    pub fn update(&self, fields: StateBucket) {
        self.tx.send_modify(|state| state.extend(fields));
    }
}

/// Read side of a bucket, held by the aggregator.
#[derive(Debug, Clone)]
pub struct BucketReader {
    name: &'static str,
    rx: watch::Receiver<StateBucket>,
}

impl BucketReader {
    /// Bucket name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Copies the bucket as it is right now.
    pub fn snapshot(&self) -> StateBucket {
        self.rx.borrow().clone()
    }

    /// Returns `true` once the writer has been dropped (its reader ended).
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

/// Builds the merged view: the union of every bucket's snapshot.
///
/// Field names never collide across buckets, so no precedence is applied.
pub fn merge_buckets(readers: &[BucketReader]) -> StateBucket {
    let mut merged = StateBucket::new();
    for reader in readers {
        merged.extend(reader.snapshot());
    }
    merged
}
