//! Transition Statistics
//!
//! Lag-CRP, lag-CRL and the temporal clustering factor share one walk over
//! each trial's recalls. At output position `k` the recalled serial
//! position joins the trial's *seen* set; the transition `k → k+1` is
//! scored only when both recalls are clean and `k ≥ skip_first_n`. A scored
//! transition is compared against every transition that was still
//! *possible*, i.e. towards any serial position not yet seen.
//!
//! Two aggregation modes come out of that comparison:
//!
//! - **Percentile rank** (clustering factors):
//!   `rank = mean over ties of (n - 1 - i) / (n - 1)` where `i` indexes the
//!   sorted possible values. `1.0` means the closest possible transition
//!   was taken, `0.0` the farthest.
//! - **Binned probability** (CRPs): `P(bin) = actual(bin) / possible(bin)`.
//!
//! Subjects (or bins) with nothing counted report `NaN`, never `0`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::error::{ensure_len, ensure_list_length, ensure_shape, ratio, AnalysisError, Result};
use crate::mask::clean_recalls_mask;
use crate::recalls::ensure_serial_positions;
use crate::subjects::SubjectGroups;

// ============================================================================
// Transition Walk
// ============================================================================

/// Serial positions already output on one trial.
///
/// Scoped to a single trial's walk; a fresh set is built for every row.
#[derive(Debug)]
pub(crate) struct SeenSet {
	flags: SmallVec<[bool; 64]>,
}

impl SeenSet {
	pub(crate) fn new(list_length: usize) -> Self {
		Self {
			flags: SmallVec::from_elem(false, list_length + 1),
		}
	}

	/// Mark a recall as seen. Intrusions and padding are ignored.
	pub(crate) fn insert(&mut self, serial_position: i64) {
		if let Some(flag) = usize::try_from(serial_position)
			.ok()
			.and_then(|sp| self.flags.get_mut(sp))
		{
			*flag = true;
		}
	}

	/// Serial positions that have not been recalled yet, ascending.
	pub(crate) fn unseen(&self) -> impl Iterator<Item = i64> + '_ {
		self.flags
			.iter()
			.enumerate()
			.skip(1)
			.filter(|(_, &seen)| !seen)
			.filter_map(|(sp, _)| i64::try_from(sp).ok())
	}
}

/// One scored transition between two clean recalls.
#[derive(Debug)]
pub(crate) struct Transition<'a> {
	/// Output position of the "from" recall (0-indexed)
	pub output_position: usize,
	/// Serial position transitioned from
	pub current: i64,
	/// Serial position transitioned to
	pub next: i64,
	/// Serial positions still available at this point (includes `next`)
	pub available: &'a [i64],
}

impl Transition<'_> {
	/// Signed serial-position lag of the actual transition.
	pub(crate) const fn lag(&self) -> i64 {
		self.next - self.current
	}
}

/// Walk one trial and hand every scored transition to `visit`.
///
/// Returns the number of transitions scored.
pub(crate) fn walk_trial<F>(
	recalls: ArrayView1<'_, i64>,
	clean: ArrayView1<'_, bool>,
	list_length: usize,
	skip_first_n: usize,
	mut visit: F,
) -> usize
where
	F: FnMut(&Transition<'_>),
{
	let mut seen = SeenSet::new(list_length);
	let mut available: SmallVec<[i64; 32]> = SmallVec::new();
	let mut scored = 0;

	for k in 0..recalls.len().saturating_sub(1) {
		let current = recalls[k];
		// Skipped transitions still shrink the set of possible ones
		seen.insert(current);

		if k < skip_first_n || !clean[k] || !clean[k + 1] {
			continue;
		}

		available.clear();
		available.extend(seen.unseen());
		visit(&Transition {
			output_position: k,
			current,
			next: recalls[k + 1],
			available: &available,
		});
		scored += 1;
	}

	scored
}

// ============================================================================
// Aggregation
// ============================================================================

/// Percentile rank of `actual` among `possible` transition values.
///
/// Values are distance-like: smaller means closer. The result is the
/// proportion of possible values farther than `actual`, with tied
/// positions averaged.
///
/// # Returns
///
/// `None` when fewer than two transitions were possible or `actual` is not
/// among them.
#[must_use]
pub fn percentile_rank(actual: f64, possible: &[f64]) -> Option<f64> {
	let n = possible.len();
	if n < 2 {
		return None;
	}

	let mut sorted: SmallVec<[f64; 32]> = possible.iter().copied().collect();
	sorted.sort_by(f64::total_cmp);

	#[allow(clippy::cast_precision_loss)]
	let span = (n - 1) as f64;
	let (total, matches) = sorted
		.iter()
		.enumerate()
		.filter(|(_, &value)| value == actual)
		.fold((0.0, 0_u32), |(total, matches), (i, _)| {
			#[allow(clippy::cast_precision_loss)]
			let farther = (n - 1 - i) as f64;
			(total + farther / span, matches + 1)
		});

	(matches > 0).then(|| total / f64::from(matches))
}

/// Running mean of percentile ranks for one subject.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PercentileScore {
	sum: f64,
	count: u32,
}

impl PercentileScore {
	pub(crate) fn record(&mut self, rank: Option<f64>) {
		if let Some(rank) = rank {
			self.sum += rank;
			self.count += 1;
		}
	}

	pub(crate) fn mean(self) -> f64 {
		ratio(self.sum, f64::from(self.count))
	}
}

/// Actual and possible transition counts per bin for one subject.
#[derive(Clone, Debug)]
pub(crate) struct BinCounts {
	actual: Vec<f64>,
	possible: Vec<f64>,
	marked: Vec<bool>,
}

impl BinCounts {
	pub(crate) fn new(bins: usize) -> Self {
		Self {
			actual: vec![0.0; bins],
			possible: vec![0.0; bins],
			marked: vec![false; bins],
		}
	}

	/// Count one transition. Each bin holding at least one possible value
	/// gains one possible transition, no matter how many values fall in it.
	pub(crate) fn record(
		&mut self,
		actual_bin: Option<usize>,
		possible_bins: impl IntoIterator<Item = usize>,
	) {
		if let Some(bin) = actual_bin {
			self.actual[bin] += 1.0;
		}
		self.marked.fill(false);
		for bin in possible_bins {
			if !self.marked[bin] {
				self.marked[bin] = true;
				self.possible[bin] += 1.0;
			}
		}
	}

	pub(crate) fn actual(&self) -> &[f64] {
		&self.actual
	}

	/// Write `actual / possible` per bin into `row`.
	pub(crate) fn write_probabilities(&self, mut row: ArrayViewMut1<'_, f64>) {
		for ((cell, &actual), &possible) in row.iter_mut().zip(&self.actual).zip(&self.possible) {
			*cell = ratio(actual, possible);
		}
	}
}

// ============================================================================
// Lag Configuration
// ============================================================================

/// Configuration for lag-CRP.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LagCrpConfig {
	/// Lag number, validated to lie in `1..list_length` (default:
	/// `list_length - 1`). The CRP table always spans every lag.
	pub max_lag: Option<usize>,
	/// Output positions whose outgoing transition is not scored
	pub skip_first_n: usize,
}

/// Resolve and validate the lag window.
fn resolve_max_lag(max_lag: Option<usize>, list_length: usize) -> Result<usize> {
	let lag = max_lag.unwrap_or_else(|| list_length.saturating_sub(1));
	if lag == 0 {
		return Err(AnalysisError::out_of_range(
			"lag_num",
			"lag number needs to be positive",
		));
	}
	if lag >= list_length {
		return Err(AnalysisError::out_of_range(
			"lag_num",
			format!("lag number {lag} must be less than list length {list_length}"),
		));
	}
	Ok(lag)
}

/// Column of `lag` in a `2 * max_lag + 1` wide lag table.
#[inline]
fn lag_bin(lag: i64, max_lag: usize) -> Option<usize> {
	let offset = usize::try_from(lag + i64::try_from(max_lag).ok()?).ok()?;
	(offset <= 2 * max_lag).then_some(offset)
}

fn validate_recalls<S>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
) -> Result<()> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	ensure_list_length(list_length)?;
	ensure_serial_positions(recalls, list_length)
}

// ============================================================================
// Lag-CRP
// ============================================================================

/// Conditional response probability as a function of lag.
///
/// # Arguments
///
/// * `recalls` - `[trials × recalls]` recalls matrix
/// * `subjects` - subject identifier per row
/// * `list_length` - number of serial positions per list
/// * `config` - lag window and leading transitions to skip
///
/// # Returns
///
/// `[subjects × (2 * list_length - 1)]` matrix; column
/// `list_length - 1 + lag` holds the CRP for `lag`. The center (lag 0)
/// column is always `NaN`, as is any lag that was never possible for a
/// subject. `config.max_lag` is validated but does not narrow the table;
/// slice the columns around the center to report a smaller window.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] if `subjects` has the wrong length.
/// - [`AnalysisError::OutOfRange`] if `max_lag` is not in `1..list_length`
///   or a recall exceeds `list_length`.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length))]
pub fn lag_crp<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
	config: &LagCrpConfig,
) -> Result<Array2<f64>> {
	validate_recalls(recalls, subjects, list_length)?;
	let _ = resolve_max_lag(config.max_lag, list_length)?;
	let center = list_length - 1;
	let width = 2 * center + 1;

	let clean = clean_recalls_mask(recalls);
	let groups = SubjectGroups::new(subjects);
	let mut result = Array2::from_elem((groups.len(), width), f64::NAN);
	let mut scored = 0;

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut counts = BinCounts::new(width);
		for &row in rows {
			scored += walk_trial(
				recalls.row(row),
				clean.row(row),
				list_length,
				config.skip_first_n,
				|transition| {
					counts.record(
						lag_bin(transition.lag(), center),
						transition
							.available
							.iter()
							.filter_map(|&sp| lag_bin(sp - transition.current, center)),
					);
				},
			);
		}
		counts.write_probabilities(result.row_mut(i));
	}

	result.column_mut(center).fill(f64::NAN);

	debug!(subjects = groups.len(), scored, "Computed lag-CRP");
	Ok(result)
}

// ============================================================================
// Lag-CRL
// ============================================================================

/// Conditional response latency: mean inter-response time by lag.
///
/// # Arguments
///
/// * `recalls` - `[trials × recalls]` recalls matrix
/// * `times` - `[trials × recalls]` recall times (ms), same shape as `recalls`
/// * `subjects` - subject identifier per row
/// * `list_length` - number of serial positions per list
/// * `max_lag` - largest absolute lag reported (default: `list_length - 1`)
///
/// # Returns
///
/// `[subjects × (2 * max_lag + 1)]` matrix of mean latencies; `NaN` for lags
/// with no transitions.
///
/// # Errors
///
/// Same as [`lag_crp`], plus [`AnalysisError::ShapeMismatch`] if `times`
/// does not match `recalls`.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length))]
pub fn lag_crl<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	times: ArrayView2<'_, f64>,
	subjects: &[S],
	list_length: usize,
	max_lag: Option<usize>,
) -> Result<Array2<f64>> {
	validate_recalls(recalls, subjects, list_length)?;
	ensure_shape("times", recalls.dim(), times.dim())?;
	let max_lag = resolve_max_lag(max_lag, list_length)?;
	let width = 2 * max_lag + 1;

	let clean = clean_recalls_mask(recalls);
	let groups = SubjectGroups::new(subjects);
	let mut result = Array2::from_elem((groups.len(), width), f64::NAN);

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut latency = vec![0.0; width];
		let mut count = vec![0.0; width];
		for &row in rows {
			let trial_times = times.row(row);
			let _ = walk_trial(recalls.row(row), clean.row(row), list_length, 0, |transition| {
				if let Some(bin) = lag_bin(transition.lag(), max_lag) {
					let k = transition.output_position;
					latency[bin] += trial_times[k + 1] - trial_times[k];
					count[bin] += 1.0;
				}
			});
		}
		for (cell, (&total, &n)) in result.row_mut(i).iter_mut().zip(latency.iter().zip(&count)) {
			*cell = ratio(total, n);
		}
	}

	debug!(subjects = groups.len(), "Computed lag-CRL");
	Ok(result)
}

// ============================================================================
// Temporal Clustering Factor
// ============================================================================

/// Lag-based temporal clustering factor per subject.
///
/// Each scored transition contributes the percentile rank of its absolute
/// lag among the absolute lags to every still-available serial position.
///
/// # Returns
///
/// One factor per subject in `[0, 1]`; `NaN` for subjects without a
/// scorable transition.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] if `subjects` has the wrong length.
/// - [`AnalysisError::OutOfRange`] if a recall exceeds `list_length`.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length))]
pub fn temporal_factor<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
	skip_first_n: usize,
) -> Result<Array1<f64>> {
	validate_recalls(recalls, subjects, list_length)?;

	let clean = clean_recalls_mask(recalls);
	let groups = SubjectGroups::new(subjects);
	let mut possible: SmallVec<[f64; 32]> = SmallVec::new();

	let factors: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let mut score = PercentileScore::default();
			for &row in rows {
				let _ = walk_trial(
					recalls.row(row),
					clean.row(row),
					list_length,
					skip_first_n,
					|transition| {
						possible.clear();
						possible.extend(
							transition
								.available
								.iter()
								.map(|&sp| abs_lag(sp - transition.current)),
						);
						score.record(percentile_rank(abs_lag(transition.lag()), &possible));
					},
				);
			}
			score.mean()
		})
		.collect();

	debug!(
		subjects = groups.len(),
		undefined = factors.iter().filter(|f| f.is_nan()).count(),
		"Computed temporal factor"
	);
	Ok(factors)
}

#[inline]
#[allow(clippy::cast_precision_loss)]
fn abs_lag(lag: i64) -> f64 {
	lag.unsigned_abs() as f64
}
