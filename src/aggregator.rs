//! # State Aggregator
//!
//! Merges all buckets on a fixed tick and announces per-field changes.
//!
//! ## Change rules
//!
//! Every field is compared against the last value *announced* for it (or its
//! class default, `false` / `0`, if nothing was announced yet):
//!
//! - Digital fields fire on any transition.
//! - Stick axes fire when they moved more than the stick threshold.
//! - Pad axes fire when they moved more than the pad threshold.
//!
//! Axis debouncing is relative to the last announced value, so slow drift in
//! sub-threshold steps never fires, and a fire re-bases the comparison.

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::bucket::{merge_buckets, BucketReader, StateBucket};
use crate::controller::field::{Field, FieldClass, FieldValue};
use crate::dispatcher::Dispatcher;

/// Axis debounce thresholds, in raw axis units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub stick: i32,
    pub pad: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { stick: 200, pad: 100 }
    }
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Self {
            stick: config.thresholds.stick,
            pad: config.thresholds.pad,
        }
    }
}

/// Per-field change detection with axis debouncing.
///
/// # Examples
///
/// ```
/// use deck_input::aggregator::{ChangeDetector, Thresholds};
/// use deck_input::controller::bucket::StateBucket;
/// use deck_input::controller::field::{Field, FieldValue};
///
/// let mut detector = ChangeDetector::new(Thresholds::default());
/// let mut merged = StateBucket::new();
///
/// merged.insert(Field::LeftStickX, FieldValue::Axis(150));
/// assert!(detector.detect(&merged).is_empty());
///
/// merged.insert(Field::LeftStickX, FieldValue::Axis(210));
/// assert_eq!(detector.detect(&merged), vec![(Field::LeftStickX, FieldValue::Axis(210))]);
/// ```
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    thresholds: Thresholds,
    announced: StateBucket,
}

impl ChangeDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            announced: StateBucket::new(),
        }
    }

    /// Values last handed to the dispatcher.
    pub fn announced(&self) -> &StateBucket {
        &self.announced
    }

    /// Compares a merged view against the announced state.
    ///
    /// Fired fields are recorded as announced before being returned, in field order.
    pub fn detect(&mut self, merged: &StateBucket) -> Vec<(Field, FieldValue)> {
        let mut fired = Vec::new();
        for (&field, &curr) in merged {
            let prev = self
                .announced
                .get(&field)
                .copied()
                .unwrap_or_else(|| field.class().default_value());

            if self.should_fire(field, prev, curr) {
                self.announced.insert(field, curr);
                fired.push((field, curr));
            }
        }
        fired
    }

    fn should_fire(&self, field: Field, prev: FieldValue, curr: FieldValue) -> bool {
        let threshold = match field.class() {
            FieldClass::Digital => return prev != curr,
            FieldClass::StickAxis => self.thresholds.stick,
            FieldClass::PadAxis => self.thresholds.pad,
        };

        match (prev, curr) {
            (FieldValue::Axis(p), FieldValue::Axis(c)) => {
                (i32::from(c) - i32::from(p)).abs() > threshold
            }
            // A boolean on an axis field cannot be debounced
            _ => prev != curr,
        }
    }
}

/// Tick-driven merge of all buckets into change notifications.
#[derive(Debug)]
pub struct Aggregator {
    readers: Vec<BucketReader>,
    detector: ChangeDetector,
    tick: Duration,
}

impl Aggregator {
    pub fn new(readers: Vec<BucketReader>, thresholds: Thresholds, tick: Duration) -> Self {
        Self {
            readers,
            detector: ChangeDetector::new(thresholds),
            tick,
        }
    }

    /// Runs one aggregation pass and dispatches what fired.
    ///
    /// Each bucket is copied once, so all fields of a bucket are judged against
    /// the same snapshot. Buckets are not snapshotted together.
    pub fn tick_once(&mut self, dispatcher: &mut Dispatcher) -> usize {
        let merged = merge_buckets(&self.readers);
        let fired = self.detector.detect(&merged);
        for &(field, value) in &fired {
            debug!("Change: {} = {}", field, value);
            dispatcher.dispatch(field, value);
        }
        fired.len()
    }

    /// Ticks until cancelled
    ///
    /// Keeps ticking after every reader has stopped; their fields simply stay
    /// at their last values.
    pub async fn run(&mut self, dispatcher: &mut Dispatcher, cancel: &CancellationToken) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut changes: u64 = 0;
        let mut sources_ended = false;

        info!(
            "Aggregating {} buckets every {:?}",
            self.readers.len(),
            self.tick
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            changes += self.tick_once(dispatcher) as u64;

            if !sources_ended
                && !self.readers.is_empty()
                && self.readers.iter().all(|r| r.is_closed())
            {
                warn!("All input sources have stopped; state is frozen until shutdown");
                sources_ended = true;
            }
        }

        info!("Aggregator stopped after {} changes", changes);
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::bucket::bucket;
    use std::sync::{Arc, Mutex};

    fn view(entries: &[(Field, FieldValue)]) -> StateBucket {
        entries.iter().copied().collect()
    }

    fn stick(value: i16) -> StateBucket {
        view(&[(Field::LeftStickX, FieldValue::Axis(value))])
    }

    fn pad(value: i16) -> StateBucket {
        view(&[(Field::RightPadY, FieldValue::Axis(value))])
    }

    #[test]
    fn test_defaults_are_not_announced() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        let merged = view(&[
            (Field::A, FieldValue::Bool(false)),
            (Field::Power, FieldValue::Bool(false)),
            (Field::LeftStickX, FieldValue::Axis(0)),
            (Field::LeftPadY, FieldValue::Axis(0)),
        ]);
        assert!(detector.detect(&merged).is_empty());
        assert!(detector.announced().is_empty());
    }

    #[test]
    fn test_stick_fires_once_past_threshold() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        let mut fired = Vec::new();
        for value in [50, 90, 150, 210] {
            fired.extend(detector.detect(&stick(value)));
        }
        assert_eq!(fired, vec![(Field::LeftStickX, FieldValue::Axis(210))]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        assert!(detector.detect(&stick(200)).is_empty());
        assert!(detector.detect(&stick(-200)).is_empty());
        assert_eq!(detector.detect(&stick(-201)).len(), 1);

        assert!(detector.detect(&pad(100)).is_empty());
        assert_eq!(detector.detect(&pad(101)), vec![(Field::RightPadY, FieldValue::Axis(101))]);
    }

    #[test]
    fn test_fire_rebases_debounce() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        assert_eq!(detector.detect(&stick(210)).len(), 1);

        // Large against the initial 0, small against the announced 210
        assert!(detector.detect(&stick(400)).is_empty());
        assert_eq!(detector.announced()[&Field::LeftStickX], FieldValue::Axis(210));

        assert_eq!(detector.detect(&stick(411)).len(), 1);
        assert!(detector.detect(&stick(300)).is_empty());
        assert_eq!(detector.detect(&stick(0)).len(), 1);
    }

    #[test]
    fn test_pad_uses_pad_threshold() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        assert!(detector.detect(&pad(-100)).is_empty());
        assert_eq!(detector.detect(&pad(-150)).len(), 1);
        // A stick would not fire on this delta
        assert!(detector.detect(&stick(150)).is_empty());
    }

    #[test]
    fn test_full_axis_range_does_not_overflow() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        assert_eq!(detector.detect(&stick(i16::MAX)).len(), 1);
        assert_eq!(detector.detect(&stick(i16::MIN)).len(), 1);
    }

    #[test]
    fn test_digital_fires_on_every_transition() {
        let mut detector = ChangeDetector::new(Thresholds { stick: 30000, pad: 30000 });
        let pressed = view(&[(Field::A, FieldValue::Bool(true))]);
        let released = view(&[(Field::A, FieldValue::Bool(false))]);

        assert_eq!(detector.detect(&pressed), vec![(Field::A, FieldValue::Bool(true))]);
        assert!(detector.detect(&pressed).is_empty());
        assert_eq!(detector.detect(&released), vec![(Field::A, FieldValue::Bool(false))]);
        assert_eq!(detector.detect(&pressed).len(), 1);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut detector = ChangeDetector::new(Thresholds { stick: 10, pad: 0 });
        assert_eq!(detector.detect(&stick(11)).len(), 1);
        assert_eq!(detector.detect(&pad(1)).len(), 1);
        assert!(detector.detect(&pad(1)).is_empty());
    }

    #[test]
    fn test_missing_fields_keep_announced_value() {
        let mut detector = ChangeDetector::new(Thresholds::default());
        detector.detect(&view(&[(Field::B, FieldValue::Bool(true))]));
        assert!(detector.detect(&StateBucket::new()).is_empty());
        assert_eq!(detector.announced()[&Field::B], FieldValue::Bool(true));
    }

    #[test]
    fn test_tick_once_dispatches_merged_buckets() {
        let (keys, keys_reader) = bucket("keys");
        let (report, report_reader) = bucket("report");
        let mut aggregator = Aggregator::new(
            vec![keys_reader, report_reader],
            Thresholds::default(),
            Duration::from_millis(1),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        let log = seen.clone();
        dispatcher.add_fn(move |field, value| log.lock().unwrap().push((field, value)));

        keys.set(Field::VolumeUp, FieldValue::Bool(true));
        report.set(Field::A, FieldValue::Bool(true));
        report.set(Field::LeftStickY, FieldValue::Axis(-50));
        assert_eq!(aggregator.tick_once(&mut dispatcher), 2);
        assert_eq!(aggregator.tick_once(&mut dispatcher), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Field::A, FieldValue::Bool(true)),
                (Field::VolumeUp, FieldValue::Bool(true)),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let (report, report_reader) = bucket("report");
        let mut aggregator = Aggregator::new(
            vec![report_reader],
            Thresholds::default(),
            Duration::from_millis(1),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        let log = seen.clone();
        dispatcher.add_fn(move |field, value| log.lock().unwrap().push((field, value)));

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let script = tokio::spawn(async move {
            for value in [50i16, 90, 150, 210] {
                report.set(Field::RightStickX, FieldValue::Axis(value));
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            stopper.cancel();
        });

        tokio::time::timeout(Duration::from_secs(2), aggregator.run(&mut dispatcher, &cancel))
            .await
            .expect("aggregator did not stop on cancel");
        script.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(Field::RightStickX, FieldValue::Axis(210))]);
        assert_eq!(aggregator.detector().announced()[&Field::RightStickX], FieldValue::Axis(210));
    }
}
