//! Positional Statistics
//!
//! Per-trial aggregations that need no transition bookkeeping: recall
//! probability by serial position or output position, stopping
//! probability, OR scores, and mask-defined transition and rejection rates.
//!
//! Rows of every result follow [`SubjectGroups`] order. Cells without
//! any data are `NaN`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ensure_len, ensure_list_length, ensure_shape, ratio, AnalysisError, Result};
use crate::mask::{clean_recalls_mask, mask_data};
use crate::recalls::ensure_serial_positions;
use crate::subjects::SubjectGroups;

/// Serial position index (0-based) of a positive recalls cell.
#[inline]
fn position_index(value: i64) -> Option<usize> {
	usize::try_from(value).ok()?.checked_sub(1)
}

#[inline]
#[allow(clippy::cast_precision_loss)]
fn as_count(n: usize) -> f64 {
	n as f64
}

// ============================================================================
// Serial Position Curve
// ============================================================================

/// Probability of recall by serial position.
///
/// Each trial contributes `1` for every serial position recalled at least
/// once (repeats and intrusions are ignored). Rows are averaged per subject.
///
/// # Arguments
///
/// * `recalls` - `[trials × recalls]` recalls matrix
/// * `subjects` - subject identifier per row
/// * `list_length` - number of serial positions per list
/// * `start_positions` - if given, only trials whose first recall is one of
///   these serial positions are used
///
/// # Returns
///
/// `[subjects × list_length]` matrix. A subject left with no trials after
/// start-position filtering gets a `NaN` row.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] if `subjects` has the wrong length.
/// - [`AnalysisError::OutOfRange`] for a zero list length or a recall
///   beyond it.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length))]
pub fn serial_position_curve<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
	start_positions: Option<&[i64]>,
) -> Result<Array2<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	ensure_list_length(list_length)?;
	ensure_serial_positions(recalls, list_length)?;

	let groups = SubjectGroups::new(subjects);
	let mut result = Array2::from_elem((groups.len(), list_length), f64::NAN);
	let mut recalled = vec![false; list_length];

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut totals = vec![0.0; list_length];
		let mut trials = 0.0;
		for &row in rows {
			let trial = recalls.row(row);
			if let Some(starts) = start_positions {
				if !trial.first().is_some_and(|first| starts.contains(first)) {
					continue;
				}
			}
			recalled.fill(false);
			for index in trial.iter().filter_map(|&value| position_index(value)) {
				recalled[index] = true;
			}
			for (total, &hit) in totals.iter_mut().zip(&recalled) {
				*total += f64::from(u8::from(hit));
			}
			trials += 1.0;
		}
		for (cell, &total) in result.row_mut(i).iter_mut().zip(&totals) {
			*cell = ratio(total, trials);
		}
	}

	debug!(subjects = groups.len(), "Computed serial position curve");
	Ok(result)
}

// ============================================================================
// Probability of Nth Recall
// ============================================================================

/// Probability of recalling each serial position at output position `n`.
///
/// `n` is 0-indexed: `n = 0` is the first recall. The denominator is the
/// subject's trial count, so a trial that ended before output `n` lowers
/// every probability.
///
/// # Errors
///
/// - [`AnalysisError::OutOfRange`] if `n >= list_length` or `n` is not a
///   column of `recalls`.
/// - [`AnalysisError::ShapeMismatch`] if `subjects` has the wrong length.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length, n = n))]
pub fn prob_nth_recall<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
	n: usize,
) -> Result<Array2<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	ensure_list_length(list_length)?;
	if n >= list_length {
		return Err(AnalysisError::out_of_range(
			"n",
			format!("output position {n} must be less than list length {list_length}"),
		));
	}
	if n >= recalls.ncols() {
		return Err(AnalysisError::out_of_range(
			"n",
			format!("output position {n} is beyond the {} recall columns", recalls.ncols()),
		));
	}
	ensure_serial_positions(recalls, list_length)?;

	let nth = recalls.column(n);
	let groups = SubjectGroups::new(subjects);
	let mut result = Array2::zeros((groups.len(), list_length));

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut probabilities = result.row_mut(i);
		for index in rows.iter().filter_map(|&row| position_index(nth[row])) {
			probabilities[index] += 1.0;
		}
		probabilities /= as_count(rows.len());
	}

	debug!(subjects = groups.len(), "Computed probability of nth recall");
	Ok(result)
}

/// Probability of first recall; [`prob_nth_recall`] at `n = 0`.
///
/// # Errors
///
/// See [`prob_nth_recall`].
pub fn prob_first_recall<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
) -> Result<Array2<f64>> {
	prob_nth_recall(recalls, subjects, list_length, 0)
}

// ============================================================================
// Probability of Stopping
// ============================================================================

/// Timing data used to drop trials that were cut off by the clock.
#[derive(Clone, Copy, Debug)]
pub struct StopTiming<'a> {
	/// `[trials × recalls]` recall times (ms); `0` for padding
	pub times: ArrayView2<'a, f64>,
	/// Length of the recall period (ms)
	pub recall_period_ms: f64,
	/// Minimum silence (ms) between the last recall and the end of the period
	pub exit_threshold_ms: f64,
}

impl StopTiming<'_> {
	/// Whether the subject chose to stop on this trial.
	///
	/// The final silence must exceed both the exit threshold and every
	/// inter-response time of the trial. `None` when the trial has no
	/// recall times at all.
	fn voluntary_stop(&self, row: usize) -> Option<bool> {
		let times = self.times.row(row);
		let last = times
			.iter()
			.rev()
			.copied()
			.find(|&t| t != 0.0 && !t.is_nan())?;
		let longest_irt = times
			.windows(2)
			.into_iter()
			.map(|pair| pair[1] - pair[0])
			.fold(0.0, f64::max);
		let silence = self.recall_period_ms - last;
		Some(silence > self.exit_threshold_ms && silence > longest_irt)
	}
}

/// Probability of stopping after a recall.
///
/// Recalls are first restricted to `mask` (default: clean recalls). Each
/// included trial adds its number of remaining recalls to the denominator
/// and, if it has any, one stop to the numerator.
///
/// # Returns
///
/// One probability per subject; `NaN` when no recall was counted.
///
/// # Errors
///
/// [`AnalysisError::ShapeMismatch`] if `subjects`, `mask` or the timing
/// matrix do not match `recalls`.
#[instrument(skip_all, fields(trials = recalls.nrows(), timed = timing.is_some()))]
pub fn prob_stopping<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	mask: Option<ArrayView2<'_, bool>>,
	timing: Option<&StopTiming<'_>>,
) -> Result<Array1<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	if let Some(timing) = timing {
		ensure_shape("times", recalls.dim(), timing.times.dim())?;
	}
	let masked = match mask {
		Some(mask) => mask_data(recalls, mask)?,
		None => mask_data(recalls, clean_recalls_mask(recalls).view())?,
	};

	let groups = SubjectGroups::new(subjects);
	let mut excluded = 0_usize;

	let result: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let (mut stops, mut outputs) = (0_usize, 0_usize);
			for &row in rows {
				if let Some(timing) = timing {
					if timing.voluntary_stop(row) != Some(true) {
						excluded += 1;
						continue;
					}
				}
				let made = masked.row(row).iter().filter(|&&value| value != 0).count();
				outputs += made;
				stops += usize::from(made > 0);
			}
			ratio(as_count(stops), as_count(outputs))
		})
		.collect();

	debug!(subjects = groups.len(), excluded, "Computed probability of stopping");
	Ok(result)
}

// ============================================================================
// Mask Transitions
// ============================================================================

/// How [`transition_probability`] aggregates over output positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionAveraging {
	/// Pool every from-event of the subject
	#[default]
	Total,
	/// Ratio per output position, then the mean over positions that had
	/// at least one from-event
	ByOutputPosition,
}

/// Probability that a from-mask event is followed by a to-mask event.
///
/// `to_mask` is expected to be aligned with `from_mask` already, usually via
/// [`crate::mask::shift_mask`]: cell `(i, j)` of both describes the
/// transition out of output position `j`.
///
/// # Returns
///
/// One probability per subject; `NaN` for subjects with no from-events.
///
/// # Errors
///
/// [`AnalysisError::ShapeMismatch`] if the masks differ in shape or
/// `subjects` has the wrong length.
#[instrument(skip_all, fields(trials = from_mask.nrows(), averaging = ?averaging))]
pub fn transition_probability<S: Ord + Clone>(
	subjects: &[S],
	from_mask: ArrayView2<'_, bool>,
	to_mask: ArrayView2<'_, bool>,
	averaging: TransitionAveraging,
) -> Result<Array1<f64>> {
	ensure_len("subjects", from_mask.nrows(), subjects.len())?;
	ensure_shape("to_mask", from_mask.dim(), to_mask.dim())?;

	let groups = SubjectGroups::new(subjects);
	let columns = from_mask.ncols();

	let result: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let mut from = vec![0.0; columns];
			let mut to = vec![0.0; columns];
			for &row in rows {
				let pairs = from_mask.row(row).into_iter().zip(to_mask.row(row));
				for (position, (&is_from, &is_to)) in pairs.enumerate() {
					if is_from {
						from[position] += 1.0;
						to[position] += f64::from(u8::from(is_to));
					}
				}
			}
			match averaging {
				TransitionAveraging::Total => {
					ratio(to.iter().sum(), from.iter().sum())
				}
				TransitionAveraging::ByOutputPosition => {
					let (sum, positions) = from
						.iter()
						.zip(&to)
						.filter(|(&n, _)| n > 0.0)
						.fold((0.0, 0.0), |(sum, positions), (&n, &k)| {
							(sum + k / n, positions + 1.0)
						});
					ratio(sum, positions)
				}
			}
		})
		.collect();

	debug!(subjects = groups.len(), "Computed transition probability");
	Ok(result)
}

// ============================================================================
// Positional CRP
// ============================================================================

/// Distribution of `output position - serial position` offsets.
///
/// Every positive recall (optionally restricted by `mask`) adds one count at
/// column `output_position - serial_position + list_length - 1`, with output
/// positions 1-indexed. Offsets outside `±(list_length - 1)` are not counted.
///
/// # Returns
///
/// `[subjects × (2 * list_length - 1)]` probabilities summing to `1` per
/// subject; a `NaN` row for subjects without a counted recall.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] if `subjects` or `mask` do not match.
/// - [`AnalysisError::OutOfRange`] for a zero list length or a recall
///   beyond it.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length))]
pub fn positional_crp<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
	mask: Option<ArrayView2<'_, bool>>,
) -> Result<Array2<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	ensure_list_length(list_length)?;
	ensure_serial_positions(recalls, list_length)?;
	let masked = match mask {
		Some(mask) => mask_data(recalls, mask)?,
		None => recalls.to_owned(),
	};

	let width = 2 * list_length - 1;
	let groups = SubjectGroups::new(subjects);
	let mut result = Array2::from_elem((groups.len(), width), f64::NAN);

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut counts = vec![0.0; width];
		let mut total = 0.0;
		for &row in rows {
			for (output, &value) in masked.row(row).iter().enumerate() {
				let Some(index) = position_index(value) else {
					continue;
				};
				// index < list_length, so this cannot underflow
				let offset = output + list_length - 1 - index;
				if let Some(count) = counts.get_mut(offset) {
					*count += 1.0;
					total += 1.0;
				}
			}
		}
		for (cell, &count) in result.row_mut(i).iter_mut().zip(&counts) {
			*cell = ratio(count, total);
		}
	}

	debug!(subjects = groups.len(), "Computed positional CRP");
	Ok(result)
}

// ============================================================================
// OR Scores
// ============================================================================

/// Probability of recalling either item of a pair, by the pair's lag.
///
/// For every lag `1..list_length`, each pair of serial positions
/// `(sp, sp + lag)` scores `1` on a trial where at least one of the two was
/// recalled. Scores are averaged over pairs and trials.
///
/// # Arguments
///
/// * `recalls` - `[trials × recalls]` recalls matrix
/// * `subjects` - subject identifier per row
/// * `list_length` - number of serial positions per list
/// * `mask` - recalls to count (default: clean recalls)
///
/// # Returns
///
/// `[subjects × (list_length - 1)]` matrix; column `lag - 1` holds the
/// score for `lag`. A subject with no trials gets a `NaN` row.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] if `subjects` or `mask` do not match.
/// - [`AnalysisError::OutOfRange`] for a zero list length or a recall
///   beyond it.
#[instrument(skip_all, fields(trials = recalls.nrows(), list_length = list_length))]
pub fn or_score<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	list_length: usize,
	mask: Option<ArrayView2<'_, bool>>,
) -> Result<Array2<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	ensure_list_length(list_length)?;
	ensure_serial_positions(recalls, list_length)?;
	let masked = match mask {
		Some(mask) => mask_data(recalls, mask)?,
		None => mask_data(recalls, clean_recalls_mask(recalls).view())?,
	};

	let lags = list_length - 1;
	let groups = SubjectGroups::new(subjects);
	let mut result = Array2::from_elem((groups.len(), lags), f64::NAN);
	let mut recalled = vec![false; list_length];

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut either = vec![0.0; lags];
		for &row in rows {
			recalled.fill(false);
			for index in masked.row(row).iter().filter_map(|&value| position_index(value)) {
				recalled[index] = true;
			}
			for (lag_index, total) in either.iter_mut().enumerate() {
				let lag = lag_index + 1;
				let pairs = recalled
					.iter()
					.zip(&recalled[lag..])
					.filter(|(&first, &second)| first || second)
					.count();
				*total += as_count(pairs);
			}
		}
		for (lag_index, (cell, &total)) in result.row_mut(i).iter_mut().zip(&either).enumerate() {
			let pairs = as_count(list_length - lag_index - 1);
			*cell = ratio(total, pairs * as_count(rows.len()));
		}
	}

	debug!(subjects = groups.len(), "Computed OR scores");
	Ok(result)
}

// ============================================================================
// Serial Ratios
// ============================================================================

/// Longest run of consecutive forward (`+1` lag) recalls in a trial.
fn longest_forward_run(trial: ArrayView1<'_, i64>) -> usize {
	let mut longest = 0;
	let mut run = 0;
	let mut previous = 0;
	for &value in trial {
		run = match value {
			v if v <= 0 => 0,
			v if run > 0 && v == previous + 1 => run + 1,
			_ => 1,
		};
		previous = value;
		longest = longest.max(run);
	}
	longest
}

/// Fraction of trials containing at least `min_run` consecutive forward recalls.
///
/// # Errors
///
/// - [`AnalysisError::OutOfRange`] if `min_run` is zero.
/// - [`AnalysisError::ShapeMismatch`] if `subjects` has the wrong length.
#[instrument(skip_all, fields(trials = recalls.nrows(), min_run = min_run))]
pub fn serial_ratios<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	min_run: usize,
) -> Result<Array1<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;
	if min_run == 0 {
		return Err(AnalysisError::out_of_range(
			"min_run",
			"a run needs at least one recall",
		));
	}

	let groups = SubjectGroups::new(subjects);
	let result: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let serial = rows
				.iter()
				.filter(|&&row| longest_forward_run(recalls.row(row)) >= min_run)
				.count();
			ratio(as_count(serial), as_count(rows.len()))
		})
		.collect();

	debug!(subjects = groups.len(), "Computed serial ratios");
	Ok(result)
}

// ============================================================================
// Timing
// ============================================================================

/// Inter-response times.
///
/// Cell `(i, j)` is `times[i, j + 1] - times[i, j]`, or `0` when recall
/// `j + 1` is padding. The last column is always `0`.
#[must_use]
pub fn inter_response_times(times: ArrayView2<'_, f64>) -> Array2<f64> {
	let mut irts = Array2::zeros(times.raw_dim());
	for (row, mut out) in times.rows().into_iter().zip(irts.rows_mut()) {
		for (j, pair) in row.windows(2).into_iter().enumerate() {
			if pair[1] != 0.0 {
				out[j] = pair[1] - pair[0];
			}
		}
	}
	irts
}

// ============================================================================
// Rejections
// ============================================================================

/// Probability that a mask-selected recall was rejected.
///
/// Used with externalized free recall, where subjects say every candidate
/// aloud and reject the ones they believe were not on the list.
///
/// # Arguments
///
/// * `rejects` - `[trials × recalls]`, `true` where the recall was rejected
/// * `recalls` - `[trials × recalls]` recalls matrix
/// * `subjects` - subject identifier per row
/// * `mask` - recalls to consider (default: [`clean_recalls_mask`] of `recalls`)
///
/// # Returns
///
/// One probability per subject; `NaN` when no recall was selected.
///
/// # Errors
///
/// [`AnalysisError::ShapeMismatch`] if the inputs disagree in shape.
#[instrument(skip_all, fields(trials = rejects.nrows(), masked = mask.is_some()))]
pub fn rejection_probability<S: Ord + Clone>(
	rejects: ArrayView2<'_, bool>,
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	mask: Option<ArrayView2<'_, bool>>,
) -> Result<Array1<f64>> {
	ensure_len("subjects", rejects.nrows(), subjects.len())?;
	ensure_shape("recalls", rejects.dim(), recalls.dim())?;
	let mask = match mask {
		Some(mask) => {
			ensure_shape("mask", rejects.dim(), mask.dim())?;
			mask.to_owned()
		}
		None => clean_recalls_mask(recalls),
	};

	let groups = SubjectGroups::new(subjects);
	let result: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let (mut rejected, mut selected) = (0_usize, 0_usize);
			for &row in rows {
				for (&reject, &keep) in rejects.row(row).iter().zip(mask.row(row)) {
					if keep {
						selected += 1;
						rejected += usize::from(reject);
					}
				}
			}
			ratio(as_count(rejected), as_count(selected))
		})
		.collect();

	debug!(subjects = groups.len(), "Computed rejection probability");
	Ok(result)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
	use super::*;
	use crate::recalls::make_recalls_matrix;
	use ndarray::array;

	// Serial position curve tests

	#[test]
	fn test_spc_single_recall() {
		let pres = array![[1, 2, 3]];
		let rec = array![[2, 0, 0]];
		let recalls = make_recalls_matrix(pres.view(), rec.view()).unwrap();
		let spc = serial_position_curve(recalls.view(), &[1], 3, None).unwrap();
		assert_eq!(spc, array![[0.0, 1.0, 0.0]]);
	}

	#[test]
	fn test_spc_ignores_repeats_and_intrusions() {
		let recalls = array![[2_i64, 2, -1], [1, 0, 0]];
		let spc = serial_position_curve(recalls.view(), &[7, 7], 3, None).unwrap();
		assert_eq!(spc, array![[0.5, 0.5, 0.0]]);
	}

	#[test]
	fn test_spc_start_position_filter() {
		let recalls = array![[1_i64, 2, 0], [3, 1, 0]];
		let spc = serial_position_curve(recalls.view(), &[1, 1], 3, Some(&[3])).unwrap();
		assert_eq!(spc, array![[1.0, 0.0, 1.0]]);

		let none = serial_position_curve(recalls.view(), &[1, 1], 3, Some(&[2])).unwrap();
		assert!(none.iter().all(|v| v.is_nan()));
	}

	// Probability of nth recall tests

	#[test]
	fn test_pnr() {
		let recalls = array![[1_i64, 2, 0], [2, 0, 0]];
		let pfr = prob_first_recall(recalls.view(), &[1, 1], 3).unwrap();
		assert_eq!(pfr, array![[0.5, 0.5, 0.0]]);
		let second = prob_nth_recall(recalls.view(), &[1, 1], 3, 1).unwrap();
		assert_eq!(second, array![[0.0, 0.5, 0.0]]);
	}

	#[test]
	fn test_pnr_n_at_list_length_is_error() {
		let recalls = array![[1_i64, 2, 3]];
		let err = prob_nth_recall(recalls.view(), &[1], 3, 3).unwrap_err();
		assert!(matches!(err, AnalysisError::OutOfRange { name: "n", .. }));
	}

	#[test]
	fn test_pnr_n_beyond_columns_is_error() {
		let recalls = array![[1_i64, 2]];
		assert!(prob_nth_recall(recalls.view(), &[1], 3, 2).is_err());
	}

	// Stopping tests

	#[test]
	fn test_p_stop_untimed() {
		let recalls = array![[1_i64, 2, 0], [3, 0, 0]];
		let p = prob_stopping(recalls.view(), &[1, 1], None, None).unwrap();
		assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn test_p_stop_drops_cut_off_trials() {
		let recalls = array![[1_i64, 2, 0], [3, 0, 0]];
		let times = array![[1000.0, 2000.0, 0.0], [8000.0, 0.0, 0.0]];
		let timing = StopTiming {
			times: times.view(),
			recall_period_ms: 10_000.0,
			exit_threshold_ms: 3000.0,
		};
		let p = prob_stopping(recalls.view(), &[1, 1], None, Some(&timing)).unwrap();
		assert_eq!(p[0], 0.5);
	}

	#[test]
	fn test_p_stop_explicit_mask_counts_repeats() {
		let recalls = array![[1_i64, 1, 2, 0]];
		let clean = prob_stopping(recalls.view(), &[1], None, None).unwrap();
		assert_eq!(clean[0], 0.5);

		let any_recall = recalls.mapv(|value| value > 0);
		let p = prob_stopping(recalls.view(), &[1], Some(any_recall.view()), None).unwrap();
		assert!((p[0] - 1.0 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn test_p_stop_no_data_is_nan() {
		let recalls = array![[1_i64, 0]];
		let times = array![[0.0, 0.0]];
		let timing = StopTiming {
			times: times.view(),
			recall_period_ms: 10_000.0,
			exit_threshold_ms: 0.0,
		};
		let p = prob_stopping(recalls.view(), &[1], None, Some(&timing)).unwrap();
		assert!(p[0].is_nan());
	}

	// Transition probability tests

	#[test]
	fn test_transition_probability_modes() {
		let from = array![[true, true, false], [true, false, false]];
		let to = array![[true, false, false], [false, false, false]];
		let total = transition_probability(
			&[1, 1],
			from.view(),
			to.view(),
			TransitionAveraging::Total,
		)
		.unwrap();
		assert!((total[0] - 1.0 / 3.0).abs() < 1e-12);

		let by_position = transition_probability(
			&[1, 1],
			from.view(),
			to.view(),
			TransitionAveraging::ByOutputPosition,
		)
		.unwrap();
		assert_eq!(by_position[0], 0.25);
	}

	#[test]
	fn test_transition_probability_into_prior_list_intrusion() {
		use crate::mask::{pli_mask, shift_mask};

		let recalls = array![[1_i64, -1, 2, 0], [-1, -1, 3, 0]];
		let intrusions = array![[0_i64, 1, 0, 0], [1, 2, 0, 0]];
		let from = clean_recalls_mask(recalls.view());
		let to = shift_mask(pli_mask(intrusions.view()).view());

		// Clean recalls at (0, 0), (0, 2), (1, 2); only the first is followed by a PLI
		let total =
			transition_probability(&[1, 1], from.view(), to.view(), TransitionAveraging::Total)
				.unwrap();
		assert!((total[0] - 1.0 / 3.0).abs() < 1e-12);

		let by_position = transition_probability(
			&[1, 1],
			from.view(),
			to.view(),
			TransitionAveraging::ByOutputPosition,
		)
		.unwrap();
		// Position 0: 1 / 1; position 2: 0 / 2
		assert_eq!(by_position[0], 0.5);
	}

	#[test]
	fn test_transition_probability_shape_mismatch() {
		let from = array![[true, false]];
		let to = array![[true]];
		assert!(transition_probability(&[1], from.view(), to.view(), TransitionAveraging::Total)
			.is_err());
	}

	// Positional CRP tests

	#[test]
	fn test_positional_crp() {
		let recalls = array![[2_i64, 1, 0], [0, 0, 0]];
		let crp = positional_crp(recalls.view(), &[1, 2], 3, None).unwrap();
		assert_eq!(crp.row(0).to_vec(), vec![0.0, 0.5, 0.0, 0.5, 0.0]);
		assert!(crp.row(1).iter().all(|v| v.is_nan()));
	}

	// OR score tests

	#[test]
	fn test_or_score_by_lag() {
		let recalls = array![[1_i64, 0, 0], [4, 4, 0]];
		let scores = or_score(recalls.view(), &[1, 1], 4, None).unwrap();
		assert_eq!(scores.dim(), (1, 3));
		// Lag 1: pairs (1,2) (2,3) (3,4) -> trial 1 covers 1, trial 2 covers 1; 2 / 6
		// Lag 2: pairs (1,3) (2,4) -> 1 + 1 of 4
		// Lag 3: pair (1,4) -> 1 + 1 of 2
		assert!((scores[[0, 0]] - 2.0 / 6.0).abs() < 1e-12);
		assert_eq!(scores[[0, 1]], 0.5);
		assert_eq!(scores[[0, 2]], 1.0);
	}

	#[test]
	fn test_or_score_mask_excludes_recalls() {
		let recalls = array![[1_i64, 2, 0]];
		let only_first = array![[true, false, false]];
		let scores = or_score(recalls.view(), &[1], 3, Some(only_first.view())).unwrap();
		// Lag 1: (1,2) yes, (2,3) no; lag 2: (1,3) yes
		assert_eq!(scores.row(0).to_vec(), vec![0.5, 1.0]);
	}

	#[test]
	fn test_or_score_single_item_lists() {
		let recalls = array![[1_i64]];
		let scores = or_score(recalls.view(), &[1], 1, None).unwrap();
		assert_eq!(scores.dim(), (1, 0));
	}

	// Serial ratio tests

	#[test]
	fn test_serial_ratios() {
		let recalls = array![[1_i64, 2, 3, 0], [3, 1, 2, 0]];
		let ratios = serial_ratios(recalls.view(), &[1, 1], 3).unwrap();
		assert_eq!(ratios[0], 0.5);
		assert!(serial_ratios(recalls.view(), &[1, 1], 0).is_err());
	}

	// Timing tests

	#[test]
	fn test_inter_response_times() {
		let times = array![[1000.0, 1500.0, 2500.0, 0.0]];
		assert_eq!(
			inter_response_times(times.view()),
			array![[500.0, 1000.0, 0.0, 0.0]]
		);
	}

	// Rejection tests

	#[test]
	fn test_rejection_probability() {
		let rejects = array![[true, false]];
		let recalls = array![[1_i64, 2]];
		let all = array![[true, true]];
		let none = array![[false, false]];
		let p = rejection_probability(rejects.view(), recalls.view(), &[1], Some(all.view()))
			.unwrap();
		assert_eq!(p[0], 0.5);
		let p = rejection_probability(rejects.view(), recalls.view(), &[1], Some(none.view()))
			.unwrap();
		assert!(p[0].is_nan());
	}

	#[test]
	fn test_rejection_probability_defaults_to_clean_recalls() {
		// The rejected repeat and intrusion fall outside the clean mask
		let rejects = array![[false, true, true, false]];
		let recalls = array![[2_i64, 2, -1, 3]];
		let p = rejection_probability(rejects.view(), recalls.view(), &[1], None).unwrap();
		assert_eq!(p[0], 0.0);

		let rejects = array![[true, false, false, false]];
		let p = rejection_probability(rejects.view(), recalls.view(), &[1], None).unwrap();
		assert_eq!(p[0], 0.5);
	}
}
