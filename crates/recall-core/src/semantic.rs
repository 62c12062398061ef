//! Semantic Transition Statistics
//!
//! The same transition walk as [`crate::transitions`], but transitions are
//! valued by looking up the recalled items in an `N × N` matrix over the
//! whole stimulus pool (item numbers are 1-indexed into the matrix).
//!
//! - [`distance_factor`] scores each transition by percentile rank.
//! - [`semantic_crp`] bins every matrix value by its rank among all
//!   off-diagonal entries and reports `actual / possible` per bin.
//! - [`semantic_crl`] uses the same bins for mean inter-response times.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, instrument};

use crate::error::{ensure_len, ensure_shape, ratio, AnalysisError, Result};
use crate::mask::clean_recalls_mask;
use crate::recalls::{item_at, make_recalls_matrix, ItemCode, ItemNumber};
use crate::subjects::SubjectGroups;
use crate::transitions::{percentile_rank, walk_trial, BinCounts, PercentileScore};

/// How to read the values of a pool matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proximity {
	/// Smaller values mean closer items
	Distance,
	/// Larger values mean closer items
	Similarity,
}

impl Proximity {
	/// Convert a distance-ordered percentile rank into a closeness score.
	#[inline]
	#[must_use]
	pub fn orient(self, rank: f64) -> f64 {
		match self {
			Self::Distance => rank,
			Self::Similarity => 1.0 - rank,
		}
	}
}

// ============================================================================
// Pool Matrix
// ============================================================================

/// Validated view of an item-by-item matrix.
#[derive(Clone, Copy, Debug)]
struct PoolMatrix<'a> {
	values: ArrayView2<'a, f64>,
}

impl<'a> PoolMatrix<'a> {
	fn new(values: ArrayView2<'a, f64>) -> Result<Self> {
		ensure_len("pool matrix columns", values.nrows(), values.ncols())?;
		Ok(Self { values })
	}

	/// Every presented item must index into the matrix.
	fn check_items<P: ItemNumber>(&self, pres_itemnos: ArrayView2<'_, P>) -> Result<()> {
		let pool = self.values.nrows();
		for &cell in &pres_itemnos {
			if let ItemCode::Item(item) = cell.code() {
				if !usize::try_from(item).is_ok_and(|i| i <= pool) {
					return Err(AnalysisError::out_of_range(
						"pres_itemnos",
						format!("item {item} is outside the {pool}-item pool matrix"),
					));
				}
			}
		}
		Ok(())
	}

	/// Matrix value between two item numbers; `None` on the diagonal or for `NaN`.
	#[inline]
	fn between(&self, a: i64, b: i64) -> Option<f64> {
		if a == b {
			return None;
		}
		let row = usize::try_from(a - 1).ok()?;
		let col = usize::try_from(b - 1).ok()?;
		self.values
			.get((row, col))
			.copied()
			.filter(|value| !value.is_nan())
	}

	/// Value between the items at two serial positions of one trial.
	#[inline]
	fn between_positions<P: ItemNumber>(
		&self,
		pres_row: ArrayView1<'_, P>,
		from: i64,
		to: i64,
	) -> Option<f64> {
		self.between(item_at(pres_row, from)?, item_at(pres_row, to)?)
	}
}

// ============================================================================
// Distance Factor
// ============================================================================

/// Semantic (or any pool-distance) clustering factor per subject.
///
/// # Arguments
///
/// * `rec_itemnos` - `[trials × recalls]` recalled item numbers
/// * `pres_itemnos` - `[trials × list_length]` presented item numbers
/// * `subjects` - subject identifier per row
/// * `pool_matrix` - `N × N` matrix over the stimulus pool
/// * `proximity` - whether the matrix holds distances or similarities
/// * `skip_first_n` - output positions whose outgoing transition is not scored
///
/// # Returns
///
/// One factor per subject in `[0, 1]`, where `1` means every transition went
/// to the closest still-available item. `NaN` for subjects without a
/// scorable transition.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] for mismatched rows or a non-square matrix.
/// - [`AnalysisError::OutOfRange`] if a presented item lies outside the matrix.
/// - [`AnalysisError::DuplicatePresentation`] from building the recalls matrix.
#[instrument(skip_all, fields(trials = rec_itemnos.nrows(), pool = pool_matrix.nrows()))]
pub fn distance_factor<R, P, S>(
	rec_itemnos: ArrayView2<'_, R>,
	pres_itemnos: ArrayView2<'_, P>,
	subjects: &[S],
	pool_matrix: ArrayView2<'_, f64>,
	proximity: Proximity,
	skip_first_n: usize,
) -> Result<Array1<f64>>
where
	R: ItemNumber,
	P: ItemNumber,
	S: Ord + Clone,
{
	ensure_len("subjects", rec_itemnos.nrows(), subjects.len())?;
	let matrix = PoolMatrix::new(pool_matrix)?;
	matrix.check_items(pres_itemnos)?;
	let recalls = make_recalls_matrix(pres_itemnos, rec_itemnos)?;
	let list_length = pres_itemnos.ncols();

	let clean = clean_recalls_mask(recalls.view());
	let groups = SubjectGroups::new(subjects);
	let mut possible: SmallVec<[f64; 32]> = SmallVec::new();

	let factors: Array1<f64> = groups
		.iter()
		.map(|(_, rows)| {
			let mut score = PercentileScore::default();
			for &row in rows {
				let pres_row = pres_itemnos.row(row);
				let _ = walk_trial(
					recalls.row(row),
					clean.row(row),
					list_length,
					skip_first_n,
					|transition| {
						let Some(actual) =
							matrix.between_positions(pres_row, transition.current, transition.next)
						else {
							return;
						};
						possible.clear();
						possible.extend(transition.available.iter().filter_map(|&sp| {
							matrix.between_positions(pres_row, transition.current, sp)
						}));
						score.record(
							percentile_rank(actual, &possible).map(|rank| proximity.orient(rank)),
						);
					},
				);
			}
			score.mean()
		})
		.collect();

	debug!(subjects = groups.len(), "Computed distance factor");
	Ok(factors)
}

// ============================================================================
// Similarity Bins
// ============================================================================

/// Rank-based bins over all off-diagonal values of a pool matrix.
///
/// All finite off-diagonal values are sorted and split into `n_bins`
/// contiguous groups of (nearly) equal size; the first `len % n_bins`
/// groups get one extra value. Each group's first value is its inclusive
/// lower edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBins {
	edges: Vec<f64>,
}

impl SimilarityBins {
	/// Build bins from a square pool matrix.
	///
	/// # Errors
	///
	/// - [`AnalysisError::ShapeMismatch`] if the matrix is not square.
	/// - [`AnalysisError::OutOfRange`] if `n_bins` is zero or exceeds the
	///   number of off-diagonal values.
	pub fn from_matrix(pool_matrix: ArrayView2<'_, f64>, n_bins: usize) -> Result<Self> {
		ensure_len("pool matrix columns", pool_matrix.nrows(), pool_matrix.ncols())?;

		let mut values: Vec<f64> = pool_matrix
			.indexed_iter()
			.filter(|((row, col), value)| row != col && !value.is_nan())
			.map(|(_, &value)| value)
			.collect();
		values.sort_by(f64::total_cmp);

		if n_bins == 0 || n_bins > values.len() {
			return Err(AnalysisError::out_of_range(
				"n_bins",
				format!(
					"{n_bins} bins requested for {} off-diagonal values",
					values.len()
				),
			));
		}

		let base = values.len() / n_bins;
		let extra = values.len() % n_bins;
		let mut start = 0;
		let edges = (0..n_bins)
			.map(|bin| {
				let edge = values[start];
				start += base + usize::from(bin < extra);
				edge
			})
			.collect();

		Ok(Self { edges })
	}

	/// Lower edge of every bin, ascending.
	#[must_use]
	pub fn edges(&self) -> &[f64] {
		&self.edges
	}

	/// Number of bins.
	#[must_use]
	pub fn len(&self) -> usize {
		self.edges.len()
	}

	/// Whether there are no bins.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.edges.is_empty()
	}

	/// Bin containing `value`: the last bin whose lower edge is `<= value`.
	///
	/// `None` for `NaN` or values below the first edge.
	#[must_use]
	pub fn bin_of(&self, value: f64) -> Option<usize> {
		if value.is_nan() {
			return None;
		}
		self.edges
			.partition_point(|&edge| edge <= value)
			.checked_sub(1)
	}
}

// ============================================================================
// Semantic CRP
// ============================================================================

/// Configuration for semantic CRP.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticCrpConfig {
	/// Number of similarity bins
	pub n_bins: usize,
	/// Output positions whose outgoing transition is not scored
	pub skip_first_n: usize,
}

impl Default for SemanticCrpConfig {
	fn default() -> Self {
		Self {
			n_bins: 10,
			skip_first_n: 0,
		}
	}
}

/// Semantic CRP per subject.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticCrp {
	/// Bin edges shared by all subjects
	pub bins: SimilarityBins,
	/// `[subjects × n_bins]` mean matrix value of actual transitions per bin
	pub bin_means: Array2<f64>,
	/// `[subjects × n_bins]` conditional response probability per bin
	pub crp: Array2<f64>,
}

/// Conditional response probability as a function of semantic similarity.
///
/// # Arguments
///
/// * `rec_itemnos` - `[trials × recalls]` recalled item numbers
/// * `pres_itemnos` - `[trials × list_length]` presented item numbers
/// * `subjects` - subject identifier per row
/// * `similarity` - `N × N` similarity matrix over the stimulus pool
/// * `config` - number of bins and leading transitions to skip
///
/// # Returns
///
/// Bin edges plus per-subject bin means and CRPs; cells with no actual
/// (means) or no possible (CRP) transitions are `NaN`.
///
/// # Errors
///
/// Same as [`distance_factor`], plus [`AnalysisError::OutOfRange`] for an
/// unusable bin count.
#[instrument(skip_all, fields(trials = rec_itemnos.nrows(), n_bins = config.n_bins))]
pub fn semantic_crp<R, P, S>(
	rec_itemnos: ArrayView2<'_, R>,
	pres_itemnos: ArrayView2<'_, P>,
	subjects: &[S],
	similarity: ArrayView2<'_, f64>,
	config: &SemanticCrpConfig,
) -> Result<SemanticCrp>
where
	R: ItemNumber,
	P: ItemNumber,
	S: Ord + Clone,
{
	ensure_len("subjects", rec_itemnos.nrows(), subjects.len())?;
	let matrix = PoolMatrix::new(similarity)?;
	matrix.check_items(pres_itemnos)?;
	let bins = SimilarityBins::from_matrix(similarity, config.n_bins)?;
	let recalls = make_recalls_matrix(pres_itemnos, rec_itemnos)?;
	let list_length = pres_itemnos.ncols();

	let clean = clean_recalls_mask(recalls.view());
	let groups = SubjectGroups::new(subjects);
	let shape = (groups.len(), bins.len());
	let mut crp = Array2::from_elem(shape, f64::NAN);
	let mut bin_means = Array2::from_elem(shape, f64::NAN);

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut counts = BinCounts::new(bins.len());
		let mut totals = vec![0.0; bins.len()];
		for &row in rows {
			let pres_row = pres_itemnos.row(row);
			let _ = walk_trial(
				recalls.row(row),
				clean.row(row),
				list_length,
				config.skip_first_n,
				|transition| {
					let Some(value) =
						matrix.between_positions(pres_row, transition.current, transition.next)
					else {
						return;
					};
					let actual_bin = bins.bin_of(value);
					if let Some(bin) = actual_bin {
						totals[bin] += value;
					}
					counts.record(
						actual_bin,
						transition.available.iter().filter_map(|&sp| {
							matrix
								.between_positions(pres_row, transition.current, sp)
								.and_then(|v| bins.bin_of(v))
						}),
					);
				},
			);
		}

		counts.write_probabilities(crp.row_mut(i));
		for ((mean, &total), &n) in bin_means
			.row_mut(i)
			.iter_mut()
			.zip(&totals)
			.zip(counts.actual())
		{
			*mean = ratio(total, n);
		}
	}

	debug!(subjects = groups.len(), "Computed semantic CRP");
	Ok(SemanticCrp {
		bins,
		bin_means,
		crp,
	})
}

// ============================================================================
// Semantic CRL
// ============================================================================

/// Semantic conditional response latency per subject.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticCrl {
	/// Bin edges shared by all subjects
	pub bins: SimilarityBins,
	/// `[subjects × n_bins]` mean matrix value of actual transitions per bin
	pub bin_means: Array2<f64>,
	/// `[subjects × n_bins]` mean inter-response time (ms) per bin
	pub crl: Array2<f64>,
}

/// Mean inter-response time as a function of semantic similarity.
///
/// Every clean transition whose items have a finite similarity adds
/// `times[k + 1] - times[k]` to the bin of that similarity.
///
/// # Arguments
///
/// * `rec_itemnos` - `[trials × recalls]` recalled item numbers
/// * `pres_itemnos` - `[trials × list_length]` presented item numbers
/// * `times` - `[trials × recalls]` recall times (ms)
/// * `subjects` - subject identifier per row
/// * `similarity` - `N × N` similarity matrix over the stimulus pool
/// * `n_bins` - number of similarity bins
///
/// # Returns
///
/// Bin edges plus per-subject bin means and latencies; bins without an
/// actual transition are `NaN`.
///
/// # Errors
///
/// Same as [`semantic_crp`], plus [`AnalysisError::ShapeMismatch`] if
/// `times` does not match `rec_itemnos`.
#[instrument(skip_all, fields(trials = rec_itemnos.nrows(), n_bins = n_bins))]
pub fn semantic_crl<R, P, S>(
	rec_itemnos: ArrayView2<'_, R>,
	pres_itemnos: ArrayView2<'_, P>,
	times: ArrayView2<'_, f64>,
	subjects: &[S],
	similarity: ArrayView2<'_, f64>,
	n_bins: usize,
) -> Result<SemanticCrl>
where
	R: ItemNumber,
	P: ItemNumber,
	S: Ord + Clone,
{
	ensure_len("subjects", rec_itemnos.nrows(), subjects.len())?;
	ensure_shape("times", rec_itemnos.dim(), times.dim())?;
	let matrix = PoolMatrix::new(similarity)?;
	matrix.check_items(pres_itemnos)?;
	let bins = SimilarityBins::from_matrix(similarity, n_bins)?;
	let recalls = make_recalls_matrix(pres_itemnos, rec_itemnos)?;
	let list_length = pres_itemnos.ncols();

	let clean = clean_recalls_mask(recalls.view());
	let groups = SubjectGroups::new(subjects);
	let shape = (groups.len(), bins.len());
	let mut crl = Array2::from_elem(shape, f64::NAN);
	let mut bin_means = Array2::from_elem(shape, f64::NAN);

	for (i, (_, rows)) in groups.iter().enumerate() {
		let mut latency = vec![0.0; bins.len()];
		let mut values = vec![0.0; bins.len()];
		let mut count = vec![0.0; bins.len()];
		for &row in rows {
			let pres_row = pres_itemnos.row(row);
			let trial_times = times.row(row);
			let _ = walk_trial(recalls.row(row), clean.row(row), list_length, 0, |transition| {
				let Some((bin, value)) = matrix
					.between_positions(pres_row, transition.current, transition.next)
					.and_then(|value| Some((bins.bin_of(value)?, value)))
				else {
					return;
				};
				let k = transition.output_position;
				latency[bin] += trial_times[k + 1] - trial_times[k];
				values[bin] += value;
				count[bin] += 1.0;
			});
		}

		let sums = latency.iter().zip(&values).zip(&count);
		let cells = crl.row_mut(i).into_iter().zip(bin_means.row_mut(i));
		for ((latency_cell, mean_cell), ((&total, &value), &n)) in cells.zip(sums) {
			*latency_cell = ratio(total, n);
			*mean_cell = ratio(value, n);
		}
	}

	debug!(subjects = groups.len(), "Computed semantic CRL");
	Ok(SemanticCrl {
		bins,
		bin_means,
		crl,
	})
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
	use super::*;
	use ndarray::array;

	/// Four-item pool with a clear similarity structure: {1, 2} and {3, 4} are close.
	fn pool() -> Array2<f64> {
		array![
			[f64::NAN, 0.9, 0.1, 0.2],
			[0.9, f64::NAN, 0.3, 0.4],
			[0.1, 0.3, f64::NAN, 0.8],
			[0.2, 0.4, 0.8, f64::NAN],
		]
	}

	// Bin tests

	#[test]
	fn test_bins_equal_partitions() {
		// Off-diagonal values sorted: .1 .1 .2 .2 .3 .3 .4 .4 .8 .8 .9 .9
		let bins = SimilarityBins::from_matrix(pool().view(), 3).unwrap();
		assert_eq!(bins.edges(), &[0.1, 0.3, 0.8]);
		assert_eq!(bins.bin_of(0.1), Some(0));
		assert_eq!(bins.bin_of(0.29), Some(0));
		assert_eq!(bins.bin_of(0.3), Some(1));
		assert_eq!(bins.bin_of(0.95), Some(2));
		assert_eq!(bins.bin_of(f64::NAN), None);
	}

	#[test]
	fn test_bins_uneven_split() {
		let matrix = array![[0.0, 1.0, 2.0], [3.0, 0.0, 4.0], [5.0, 6.0, 0.0]];
		// 6 values into 4 bins: sizes 2, 2, 1, 1
		let bins = SimilarityBins::from_matrix(matrix.view(), 4).unwrap();
		assert_eq!(bins.edges(), &[1.0, 3.0, 5.0, 6.0]);
	}

	#[test]
	fn test_bins_too_many() {
		let matrix = array![[0.0, 1.0], [1.0, 0.0]];
		assert!(SimilarityBins::from_matrix(matrix.view(), 3).is_err());
		assert!(SimilarityBins::from_matrix(matrix.view(), 0).is_err());
	}

	// Distance factor tests

	#[test]
	fn test_distance_factor_similarity() {
		let pres = array![[1, 2, 3, 4]];
		// 1 -> 2 takes the most similar of {0.9, 0.1, 0.2}
		let rec = array![[1, 2, 0, 0]];
		let factors = distance_factor(
			rec.view(),
			pres.view(),
			&[1],
			pool().view(),
			Proximity::Similarity,
			0,
		)
		.unwrap();
		assert_eq!(factors[0], 1.0);
	}

	#[test]
	fn test_distance_factor_distance_reading() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[1, 2, 0, 0]];
		let factors = distance_factor(
			rec.view(),
			pres.view(),
			&[1],
			pool().view(),
			Proximity::Distance,
			0,
		)
		.unwrap();
		// Read as distances, 0.9 is the farthest option
		assert_eq!(factors[0], 0.0);
	}

	#[test]
	fn test_distance_factor_skip_first_n() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[1, 2, 3, 0]];
		let factor = |skip| {
			distance_factor(
				rec.view(),
				pres.view(),
				&[1],
				pool().view(),
				Proximity::Similarity,
				skip,
			)
			.unwrap()[0]
		};
		// 1 -> 2 takes the most similar (1.0); 2 -> 3 takes .3 over .4 (0.0)
		assert_eq!(factor(0), 0.5);
		assert_eq!(factor(1), 0.0);
		assert!(factor(2).is_nan());
	}

	#[test]
	fn test_distance_factor_undefined() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[3, -1, 0, 0]];
		let factors = distance_factor(
			rec.view(),
			pres.view(),
			&[1],
			pool().view(),
			Proximity::Similarity,
			0,
		)
		.unwrap();
		assert!(factors[0].is_nan());
	}

	#[test]
	fn test_distance_factor_item_outside_pool() {
		let pres = array![[1, 2, 9]];
		let rec = array![[1, 2, 0]];
		let err = distance_factor(
			rec.view(),
			pres.view(),
			&[1],
			pool().view(),
			Proximity::Similarity,
			0,
		)
		.unwrap_err();
		assert!(matches!(err, AnalysisError::OutOfRange { name: "pres_itemnos", .. }));
	}

	// Semantic CRP tests

	#[test]
	fn test_semantic_crp_counts() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[1, 2, 4, 0]];
		let config = SemanticCrpConfig {
			n_bins: 3,
			skip_first_n: 0,
		};
		let result =
			semantic_crp(rec.view(), pres.view(), &[1], pool().view(), &config).unwrap();

		// 1 -> 2: value .9 (bin 2); possible .9, .1, .2 -> bins {2, 0}
		// 2 -> 4: value .4 (bin 1); possible .3, .4 -> bins {1}
		assert_eq!(result.crp[[0, 0]], 0.0);
		assert_eq!(result.crp[[0, 1]], 1.0);
		assert_eq!(result.crp[[0, 2]], 1.0);
		assert!(result.bin_means[[0, 0]].is_nan());
		assert!((result.bin_means[[0, 1]] - 0.4).abs() < 1e-12);
		assert!((result.bin_means[[0, 2]] - 0.9).abs() < 1e-12);
	}

	#[test]
	fn test_semantic_crp_skip_first_n() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[1, 2, 4, 0]];
		let config = SemanticCrpConfig {
			n_bins: 3,
			skip_first_n: 1,
		};
		let result =
			semantic_crp(rec.view(), pres.view(), &[1], pool().view(), &config).unwrap();
		// Only 2 -> 4 is scored; item 1 is still excluded from the possible set
		assert!(result.crp[[0, 0]].is_nan());
		assert_eq!(result.crp[[0, 1]], 1.0);
		assert!(result.crp[[0, 2]].is_nan());
	}

	#[test]
	fn test_semantic_crp_no_transitions() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[1, 0, 0, 0]];
		let result = semantic_crp(
			rec.view(),
			pres.view(),
			&[1],
			pool().view(),
			&SemanticCrpConfig {
				n_bins: 2,
				skip_first_n: 0,
			},
		)
		.unwrap();
		assert!(result.crp.iter().all(|v| v.is_nan()));
	}

	// Semantic CRL tests

	#[test]
	fn test_semantic_crl_mean_latency() {
		let pres = array![[1, 2, 3, 4], [1, 2, 3, 4]];
		let rec = array![[1, 2, 4, 0], [2, 1, 0, 0]];
		let times = array![[1000.0, 1500.0, 3500.0, 0.0], [500.0, 1500.0, 0.0, 0.0]];
		let result =
			semantic_crl(rec.view(), pres.view(), times.view(), &[1, 1], pool().view(), 3).unwrap();

		// 1 -> 2 (.9, 500 ms), 2 -> 4 (.4, 2000 ms), 2 -> 1 (.9, 1000 ms)
		assert!(result.crl[[0, 0]].is_nan());
		assert_eq!(result.crl[[0, 1]], 2000.0);
		assert_eq!(result.crl[[0, 2]], 750.0);
		assert!(result.bin_means[[0, 0]].is_nan());
		assert!((result.bin_means[[0, 1]] - 0.4).abs() < 1e-12);
		assert!((result.bin_means[[0, 2]] - 0.9).abs() < 1e-12);
	}

	#[test]
	fn test_semantic_crl_times_shape() {
		let pres = array![[1, 2, 3, 4]];
		let rec = array![[1, 2, 0, 0]];
		let times = array![[1000.0, 1500.0]];
		let err = semantic_crl(rec.view(), pres.view(), times.view(), &[1], pool().view(), 3)
			.unwrap_err();
		assert!(matches!(err, AnalysisError::ShapeMismatch { what: "times", .. }));
	}
}
