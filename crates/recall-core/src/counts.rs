//! Intrusion and Repetition Counts
//!
//! Simple per-subject tallies. Totals are returned as `f64` so that
//! per-list averages and raw counts share one output type.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::error::{ensure_len, ensure_shape, AnalysisError, Result};
use crate::intrusions::XLI;
use crate::subjects::SubjectGroups;

/// Options for [`pli_count`] and [`xli_count`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CountOptions {
	/// Divide each subject's total by their number of lists
	pub per_list: bool,
	/// Count each recalled item at most once per list (needs `rec_items`)
	pub exclude_reps: bool,
}

/// Options for [`repetition_count`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RepetitionOptions {
	/// Count repeated items rather than repeat events
	pub unique_reps: bool,
	/// Divide each subject's total by their number of lists
	pub per_list: bool,
}

#[inline]
#[allow(clippy::cast_precision_loss)]
fn as_count(n: usize) -> f64 {
	n as f64
}

/// Output positions holding the first occurrence of each value in a row.
fn first_occurrences(row: ArrayView1<'_, i64>) -> SmallVec<[bool; 32]> {
	let mut seen: SmallVec<[i64; 32]> = SmallVec::new();
	row.iter()
		.map(|&value| {
			let first = !seen.contains(&value);
			if first {
				seen.push(value);
			}
			first
		})
		.collect()
}

/// Shared tally for PLI and XLI counts.
fn intrusion_count<S: Ord + Clone>(
	intrusions: ArrayView2<'_, i64>,
	subjects: &[S],
	rec_items: Option<ArrayView2<'_, i64>>,
	options: &CountOptions,
	selects: impl Fn(i64) -> bool,
) -> Result<Array1<f64>> {
	ensure_len("subjects", intrusions.nrows(), subjects.len())?;
	let rec_items = match (options.exclude_reps, rec_items) {
		(true, None) => return Err(AnalysisError::MissingArgument("rec_items")),
		(true, Some(items)) => {
			ensure_shape("rec_items", intrusions.dim(), items.dim())?;
			Some(items)
		}
		(false, _) => None,
	};

	let groups = SubjectGroups::new(subjects);
	let counts = groups
		.iter()
		.map(|(_, rows)| {
			let total: usize = rows
				.iter()
				.map(|&row| {
					let labels = intrusions.row(row);
					match rec_items {
						Some(items) => labels
							.iter()
							.zip(first_occurrences(items.row(row)))
							.filter(|&(&label, first)| first && selects(label))
							.count(),
						None => labels.iter().filter(|&&label| selects(label)).count(),
					}
				})
				.sum();
			if options.per_list {
				as_count(total) / as_count(rows.len())
			} else {
				as_count(total)
			}
		})
		.collect();
	Ok(counts)
}

/// Prior-list intrusions per subject.
///
/// # Arguments
///
/// * `intrusions` - `[trials × recalls]` intrusions matrix
/// * `subjects` - subject identifier per row
/// * `rec_items` - recalled item numbers, required when `exclude_reps` is set
/// * `options` - per-list averaging and repeat exclusion
///
/// # Errors
///
/// - [`AnalysisError::MissingArgument`] if `exclude_reps` is set without `rec_items`.
/// - [`AnalysisError::ShapeMismatch`] if the inputs disagree in shape.
#[instrument(skip_all, fields(trials = intrusions.nrows(), per_list = options.per_list))]
pub fn pli_count<S: Ord + Clone>(
	intrusions: ArrayView2<'_, i64>,
	subjects: &[S],
	rec_items: Option<ArrayView2<'_, i64>>,
	options: &CountOptions,
) -> Result<Array1<f64>> {
	let counts = intrusion_count(intrusions, subjects, rec_items, options, |label| label > 0)?;
	debug!(subjects = counts.len(), "Counted prior-list intrusions");
	Ok(counts)
}

/// Extra-list intrusions per subject.
///
/// Same arguments and errors as [`pli_count`].
///
/// # Errors
///
/// See [`pli_count`].
#[instrument(skip_all, fields(trials = intrusions.nrows(), per_list = options.per_list))]
pub fn xli_count<S: Ord + Clone>(
	intrusions: ArrayView2<'_, i64>,
	subjects: &[S],
	rec_items: Option<ArrayView2<'_, i64>>,
	options: &CountOptions,
) -> Result<Array1<f64>> {
	let counts = intrusion_count(intrusions, subjects, rec_items, options, |label| label == XLI)?;
	debug!(subjects = counts.len(), "Counted extra-list intrusions");
	Ok(counts)
}

/// Repeated recalls per subject.
///
/// For every serial position recalled `c` times on a trial, `c - 1`
/// repetitions are counted, or `1` if `unique_reps` is set and `c > 1`.
///
/// # Errors
///
/// [`AnalysisError::ShapeMismatch`] if `subjects` has the wrong length.
#[instrument(skip_all, fields(trials = recalls.nrows(), unique_reps = options.unique_reps))]
pub fn repetition_count<S: Ord + Clone>(
	recalls: ArrayView2<'_, i64>,
	subjects: &[S],
	options: &RepetitionOptions,
) -> Result<Array1<f64>> {
	ensure_len("subjects", recalls.nrows(), subjects.len())?;

	let groups = SubjectGroups::new(subjects);
	let counts: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let total: usize = rows
				.iter()
				.map(|&row| trial_repetitions(recalls.row(row), options.unique_reps))
				.sum();
			if options.per_list {
				as_count(total) / as_count(rows.len())
			} else {
				as_count(total)
			}
		})
		.collect();

	debug!(subjects = groups.len(), "Counted repetitions");
	Ok(counts)
}

fn trial_repetitions(trial: ArrayView1<'_, i64>, unique_reps: bool) -> usize {
	let mut tally: SmallVec<[(i64, usize); 32]> = SmallVec::new();
	for &value in trial.iter().filter(|&&value| value > 0) {
		match tally.iter_mut().find(|(sp, _)| *sp == value) {
			Some((_, times)) => *times += 1,
			None => tally.push((value, 1)),
		}
	}
	tally
		.iter()
		.map(|&(_, times)| match (unique_reps, times) {
			(_, 1) => 0,
			(true, _) => 1,
			(false, t) => t - 1,
		})
		.sum()
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
	use super::*;
	use ndarray::array;

	#[test]
	fn test_pli_count_raw_and_per_list() {
		let intrusions = array![[0_i64, 1], [2, 0]];
		let raw = pli_count(intrusions.view(), &[1, 1], None, &CountOptions::default()).unwrap();
		assert_eq!(raw.to_vec(), vec![2.0]);

		let options = CountOptions {
			per_list: true,
			exclude_reps: false,
		};
		let per_list = pli_count(intrusions.view(), &[1, 1], None, &options).unwrap();
		assert_eq!(per_list.to_vec(), vec![1.0]);
	}

	#[test]
	fn test_xli_count_by_subject() {
		let intrusions = array![[-1_i64, -1, 0], [0, 1, -1]];
		let counts = xli_count(intrusions.view(), &["b", "a"], None, &CountOptions::default())
			.unwrap();
		assert_eq!(counts.to_vec(), vec![1.0, 2.0]);
	}

	#[test]
	fn test_exclude_reps_counts_items_once() {
		let intrusions = array![[1_i64, 1, 0, 2]];
		let rec_items = array![[40_i64, 40, 3, 50]];
		let options = CountOptions {
			per_list: false,
			exclude_reps: true,
		};
		let counts = pli_count(intrusions.view(), &[1], Some(rec_items.view()), &options).unwrap();
		assert_eq!(counts.to_vec(), vec![2.0]);
	}

	#[test]
	fn test_exclude_reps_needs_rec_items() {
		let intrusions = array![[1_i64]];
		let options = CountOptions {
			per_list: false,
			exclude_reps: true,
		};
		let err = xli_count(intrusions.view(), &[1], None, &options).unwrap_err();
		assert_eq!(err, AnalysisError::MissingArgument("rec_items"));
	}

	#[test]
	fn test_repetition_count() {
		let recalls = array![[1_i64, 1, 1, 2, 2, -1, -1], [3, 0, 0, 0, 0, 0, 0]];
		let all = repetition_count(recalls.view(), &[1, 1], &RepetitionOptions::default()).unwrap();
		assert_eq!(all.to_vec(), vec![3.0]);

		let options = RepetitionOptions {
			unique_reps: true,
			per_list: true,
		};
		let unique = repetition_count(recalls.view(), &[1, 1], &options).unwrap();
		assert_eq!(unique.to_vec(), vec![1.0]);
	}
}
