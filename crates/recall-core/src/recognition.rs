//! Recognition Signal Detection
//!
//! Old/new recognition tests are scored independently of the recall
//! matrices. Each probe is a target (studied) or a lure (new), and the
//! response is "old" or "new":
//!
//! | | said old | said new |
//! |---|---|---|
//! | target | hit | miss |
//! | lure | false alarm | correct rejection |
//!
//! `d' = z(hit rate) - z(false alarm rate)`, where `z` is the inverse of
//! the standard normal CDF. Rates of exactly `0` or `1` map to `∓∞`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, instrument};

use crate::error::{ratio, AnalysisError, Result};

/// Kind of recognition probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeKind {
	/// Studied item
	Target,
	/// Unstudied item
	Lure,
}

/// One recognition trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
	/// Whether the probe was studied
	pub probe: ProbeKind,
	/// Whether the subject responded "old"
	pub said_old: bool,
	/// Confidence rating attached to the response
	pub confidence: f64,
	/// Response time (ms); `0` marks a missing response
	pub rt_ms: f64,
}

/// Filters applied before tallying recognition events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecognitionConfig {
	/// Lowest valid confidence rating
	pub min_confidence: f64,
	/// Highest valid confidence rating
	pub max_confidence: f64,
}

impl Default for RecognitionConfig {
	fn default() -> Self {
		Self {
			min_confidence: 1.0,
			max_confidence: 5.0,
		}
	}
}

impl RecognitionConfig {
	/// Whether an event carries a usable response.
	#[must_use]
	pub fn accepts(&self, event: &RecognitionEvent) -> bool {
		(self.min_confidence..=self.max_confidence).contains(&event.confidence)
			&& event.rt_ms != 0.0
	}

	fn validate(&self) -> Result<()> {
		if self.min_confidence > self.max_confidence || self.min_confidence.is_nan() {
			return Err(AnalysisError::out_of_range(
				"confidence",
				format!(
					"empty rating range [{}, {}]",
					self.min_confidence, self.max_confidence
				),
			));
		}
		Ok(())
	}
}

/// Signal-detection outcome counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTally {
	/// Targets called old
	pub hits: u32,
	/// Targets called new
	pub misses: u32,
	/// Lures called old
	pub false_alarms: u32,
	/// Lures called new
	pub correct_rejections: u32,
}

impl SignalTally {
	/// Tally every event that passes `config`.
	///
	/// # Errors
	///
	/// - [`AnalysisError::MissingArgument`] if there are no events, or none
	///   survive filtering.
	/// - [`AnalysisError::OutOfRange`] if the confidence range is empty.
	pub fn from_events(events: &[RecognitionEvent], config: &RecognitionConfig) -> Result<Self> {
		config.validate()?;
		if events.is_empty() {
			return Err(AnalysisError::MissingArgument("events"));
		}

		let mut tally = Self::default();
		let mut ignored = 0_usize;
		for event in events {
			if config.accepts(event) {
				tally.record(event);
			} else {
				ignored += 1;
			}
		}

		if tally.total() == 0 {
			return Err(AnalysisError::MissingArgument("events"));
		}
		debug!(ignored, "Tallied recognition events");
		Ok(tally)
	}

	/// Add one event.
	pub fn record(&mut self, event: &RecognitionEvent) {
		let slot = match (event.probe, event.said_old) {
			(ProbeKind::Target, true) => &mut self.hits,
			(ProbeKind::Target, false) => &mut self.misses,
			(ProbeKind::Lure, true) => &mut self.false_alarms,
			(ProbeKind::Lure, false) => &mut self.correct_rejections,
		};
		*slot += 1;
	}

	/// Number of tallied targets.
	#[must_use]
	pub const fn targets(&self) -> u32 {
		self.hits + self.misses
	}

	/// Number of tallied lures.
	#[must_use]
	pub const fn lures(&self) -> u32 {
		self.false_alarms + self.correct_rejections
	}

	/// Number of tallied events.
	#[must_use]
	pub const fn total(&self) -> u32 {
		self.targets() + self.lures()
	}

	/// `hits / targets`; `NaN` without targets.
	#[must_use]
	pub fn hit_rate(&self) -> f64 {
		ratio(f64::from(self.hits), f64::from(self.targets()))
	}

	/// `false_alarms / lures`; `NaN` without lures.
	#[must_use]
	pub fn false_alarm_rate(&self) -> f64 {
		ratio(f64::from(self.false_alarms), f64::from(self.lures()))
	}
}

/// Inverse standard normal CDF; `NaN` passes through.
#[must_use]
pub fn probit(p: f64) -> f64 {
	if p.is_nan() {
		return f64::NAN;
	}
	Normal::standard().inverse_cdf(p)
}

/// A point on the z-transformed ROC.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZRocPoint {
	/// `z(false alarm rate)`
	pub z_false_alarm: f64,
	/// `z(hit rate)`
	pub z_hit: f64,
}

/// Sensitivity index d'.
///
/// # Errors
///
/// See [`SignalTally::from_events`].
#[instrument(skip_all, fields(events = events.len()))]
pub fn d_prime(events: &[RecognitionEvent], config: &RecognitionConfig) -> Result<f64> {
	let point = z_roc(events, config)?;
	Ok(point.z_hit - point.z_false_alarm)
}

/// z-transformed hit and false alarm rates.
///
/// # Errors
///
/// See [`SignalTally::from_events`].
#[instrument(skip_all, fields(events = events.len()))]
pub fn z_roc(events: &[RecognitionEvent], config: &RecognitionConfig) -> Result<ZRocPoint> {
	let tally = SignalTally::from_events(events, config)?;
	Ok(ZRocPoint {
		z_false_alarm: probit(tally.false_alarm_rate()),
		z_hit: probit(tally.hit_rate()),
	})
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
	use super::*;

	fn event(probe: ProbeKind, said_old: bool) -> RecognitionEvent {
		RecognitionEvent {
			probe,
			said_old,
			confidence: 3.0,
			rt_ms: 800.0,
		}
	}

	fn sample() -> Vec<RecognitionEvent> {
		// 3 of 4 targets hit, 1 of 4 lures false-alarmed
		vec![
			event(ProbeKind::Target, true),
			event(ProbeKind::Target, true),
			event(ProbeKind::Target, true),
			event(ProbeKind::Target, false),
			event(ProbeKind::Lure, true),
			event(ProbeKind::Lure, false),
			event(ProbeKind::Lure, false),
			event(ProbeKind::Lure, false),
		]
	}

	#[test]
	fn test_tally() {
		let tally = SignalTally::from_events(&sample(), &RecognitionConfig::default()).unwrap();
		assert_eq!(tally.hits, 3);
		assert_eq!(tally.misses, 1);
		assert_eq!(tally.false_alarms, 1);
		assert_eq!(tally.correct_rejections, 3);
		assert!((tally.hit_rate() - 0.75).abs() < 1e-12);
	}

	#[test]
	fn test_d_prime_symmetric() {
		let d = d_prime(&sample(), &RecognitionConfig::default()).unwrap();
		// z(0.75) is about 0.6745
		assert!((d - 2.0 * 0.674_489_75).abs() < 1e-6);
	}

	#[test]
	fn test_z_roc() {
		let point = z_roc(&sample(), &RecognitionConfig::default()).unwrap();
		assert!((point.z_hit + point.z_false_alarm).abs() < 1e-9);
		assert!(point.z_hit > 0.0);
	}

	#[test]
	fn test_invalid_events_ignored() {
		let mut events = sample();
		events.push(RecognitionEvent {
			confidence: 9.0,
			..event(ProbeKind::Lure, true)
		});
		events.push(RecognitionEvent {
			confidence: f64::NAN,
			..event(ProbeKind::Lure, true)
		});
		events.push(RecognitionEvent {
			rt_ms: 0.0,
			..event(ProbeKind::Lure, true)
		});
		let tally = SignalTally::from_events(&events, &RecognitionConfig::default()).unwrap();
		assert_eq!(tally.false_alarms, 1);
	}

	#[test]
	fn test_empty_events() {
		let err = d_prime(&[], &RecognitionConfig::default()).unwrap_err();
		assert_eq!(err, AnalysisError::MissingArgument("events"));

		let filtered = [RecognitionEvent {
			rt_ms: 0.0,
			..event(ProbeKind::Target, true)
		}];
		assert!(d_prime(&filtered, &RecognitionConfig::default()).is_err());
	}

	#[test]
	fn test_perfect_and_missing_rates() {
		let events = [event(ProbeKind::Target, true)];
		let point = z_roc(&events, &RecognitionConfig::default()).unwrap();
		assert_eq!(point.z_hit, f64::INFINITY);
		assert!(point.z_false_alarm.is_nan());
	}
}
