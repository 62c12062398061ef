//! Recall Masks
//!
//! Boolean matrices with the shape of a recalls or intrusions matrix that
//! select a subset of recall events. Masks compose with [`mask_data`] to
//! restrict a matrix before handing it to another analysis, and with
//! [`shift_mask`] to talk about "the recall right after one of type X".

use ndarray::{Array2, ArrayView2, Axis, Zip};
use smallvec::SmallVec;

use crate::error::{ensure_shape, Result};

/// Mask of clean recalls: correct recalls at their first output only.
///
/// A cell is `true` iff it holds a positive serial position that has not
/// appeared earlier in the same row. Intrusions, padding and repeats are
/// `false`.
#[must_use]
pub fn clean_recalls_mask(recalls: ArrayView2<'_, i64>) -> Array2<bool> {
	first_occurrences(recalls, true)
}

/// Mask of repetitions: correct recalls of a serial position already recalled
/// earlier in the same row.
#[must_use]
pub fn repetition_mask(recalls: ArrayView2<'_, i64>) -> Array2<bool> {
	first_occurrences(recalls, false)
}

fn first_occurrences(recalls: ArrayView2<'_, i64>, want_first: bool) -> Array2<bool> {
	let mut mask = Array2::from_elem(recalls.raw_dim(), false);
	for (recall_row, mut mask_row) in recalls.rows().into_iter().zip(mask.rows_mut()) {
		let mut seen: SmallVec<[i64; 32]> = SmallVec::new();
		for (&value, cell) in recall_row.iter().zip(mask_row.iter_mut()) {
			if value <= 0 {
				continue;
			}
			let first = !seen.contains(&value);
			if first {
				seen.push(value);
			}
			*cell = first == want_first;
		}
	}
	mask
}

/// Mask of prior-list intrusions (any positive lists-back value).
#[must_use]
pub fn pli_mask(intrusions: ArrayView2<'_, i64>) -> Array2<bool> {
	intrusions.mapv(|value| value != 0 && value != -1)
}

/// Mask of extra-list intrusions (`-1`).
#[must_use]
pub fn xli_mask(intrusions: ArrayView2<'_, i64>) -> Array2<bool> {
	intrusions.mapv(|value| value == -1)
}

/// Derive a "to" mask from a "from" mask.
///
/// Shifts every row left by one output position and pads the last column
/// with `false`, so cell `(i, j)` of the result describes recall `j + 1`.
#[must_use]
pub fn shift_mask(from_mask: ArrayView2<'_, bool>) -> Array2<bool> {
	let mut to_mask = Array2::from_elem(from_mask.raw_dim(), false);
	if from_mask.ncols() > 1 {
		let (_, tail) = from_mask.view().split_at(Axis(1), 1);
		let (mut head, _) = to_mask.view_mut().split_at(Axis(1), from_mask.ncols() - 1);
		head.assign(&tail);
	}
	to_mask
}

/// All-true mask of the given shape.
#[must_use]
pub fn blank_mask(rows: usize, cols: usize) -> Array2<bool> {
	Array2::from_elem((rows, cols), true)
}

/// Mask of cells that hold a value (not `NaN`), e.g. in a recall-times matrix.
#[must_use]
pub fn finite_mask(data: ArrayView2<'_, f64>) -> Array2<bool> {
	data.mapv(|value| !value.is_nan())
}

/// Zero out every cell of `data` where `mask` is `false`.
///
/// # Errors
///
/// Returns [`crate::AnalysisError::ShapeMismatch`] if the shapes differ.
pub fn mask_data<T: Copy + Default>(
	data: ArrayView2<'_, T>,
	mask: ArrayView2<'_, bool>,
) -> Result<Array2<T>> {
	ensure_shape("mask", data.dim(), mask.dim())?;
	Ok(Zip::from(&data)
		.and(&mask)
		.map_collect(|&value, &keep| if keep { value } else { T::default() }))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::array;

	#[test]
	fn test_clean_mask_drops_repeats_and_intrusions() {
		let recalls = array![[3_i64, -1, 3, 1, 0], [2, 2, 2, 0, 0]];
		let mask = clean_recalls_mask(recalls.view());
		assert_eq!(
			mask,
			array![[true, false, false, true, false], [true, false, false, false, false]]
		);
	}

	#[test]
	fn test_repetition_mask() {
		let recalls = array![[3_i64, -1, 3, 1, 3]];
		let mask = repetition_mask(recalls.view());
		assert_eq!(mask, array![[false, false, true, false, true]]);
	}

	#[test]
	fn test_clean_mask_idempotent() {
		let recalls = array![[4_i64, 4, -1, 2, 0, 2]];
		let mask = clean_recalls_mask(recalls.view());
		let masked = mask_data(recalls.view(), mask.view()).unwrap();
		assert_eq!(clean_recalls_mask(masked.view()), mask);
	}

	#[test]
	fn test_intrusion_masks() {
		let intrusions = array![[0_i64, 1, -1, 3]];
		assert_eq!(
			pli_mask(intrusions.view()),
			array![[false, true, false, true]]
		);
		assert_eq!(
			xli_mask(intrusions.view()),
			array![[false, false, true, false]]
		);
	}

	#[test]
	fn test_shift_mask() {
		let from = array![[true, true, false, true]];
		assert_eq!(
			shift_mask(from.view()),
			array![[true, false, true, false]]
		);
	}

	#[test]
	fn test_shift_single_column() {
		let from = array![[true], [false]];
		assert_eq!(shift_mask(from.view()), array![[false], [false]]);
	}

	#[test]
	fn test_mask_data_shape_mismatch() {
		let data = array![[1_i64, 2]];
		let mask = array![[true, false, true]];
		assert!(mask_data(data.view(), mask.view()).is_err());
	}

	#[test]
	fn test_finite_mask() {
		let times = array![[100.0, f64::NAN]];
		assert_eq!(finite_mask(times.view()), array![[true, false]]);
	}

	#[test]
	fn test_blank_mask() {
		assert!(blank_mask(2, 3).iter().all(|&cell| cell));
	}
}
