//! Recalls Matrix
//!
//! Converts raw item numbers into the canonical recalls matrix that every
//! other analysis consumes. For each recall cell:
//!
//! - `> 0` serial position (1-indexed) at which the item was presented on that trial
//! - `0` padding, no recall
//! - `-1` intrusion of an item not presented on that trial
//!
//! Item-number matrices may be integers or floats. Float matrices may use
//! `NaN` as padding, which is treated exactly like `0`. A fractional or
//! infinite float matches no presented item and is an intrusion.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ensure_len, AnalysisError, Result};

/// Recall cell value for an intrusion.
pub const INTRUSION: i64 = -1;

/// Recall cell value for padding.
pub const NO_RECALL: i64 = 0;

// ============================================================================
// Item Numbers
// ============================================================================

/// Meaning of one raw item-number cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCode {
	/// Padding (`0` or `NaN`)
	Empty,
	/// Explicit extra-list sentinel (any negative value), or a float that
	/// cannot name a wordpool item (fractional or infinite)
	ExtraList,
	/// Wordpool item number
	Item(i64),
}

/// A scalar that can hold a wordpool item number.
pub trait ItemNumber: Copy {
	/// Decode the cell.
	fn code(self) -> ItemCode;
}

impl ItemNumber for i64 {
	#[inline]
	fn code(self) -> ItemCode {
		match self {
			0 => ItemCode::Empty,
			v if v < 0 => ItemCode::ExtraList,
			v => ItemCode::Item(v),
		}
	}
}

impl ItemNumber for i32 {
	#[inline]
	fn code(self) -> ItemCode {
		i64::from(self).code()
	}
}

impl ItemNumber for u32 {
	#[inline]
	fn code(self) -> ItemCode {
		i64::from(self).code()
	}
}

impl ItemNumber for f64 {
	#[inline]
	#[allow(clippy::cast_possible_truncation)]
	fn code(self) -> ItemCode {
		if self.is_nan() || self == 0.0 {
			ItemCode::Empty
		} else if self < 0.0 || !self.is_finite() || self.fract() != 0.0 {
			ItemCode::ExtraList
		} else {
			ItemCode::Item(self as i64)
		}
	}
}

/// Item number presented at a 1-indexed serial position, if any.
#[inline]
pub(crate) fn item_at<P: ItemNumber>(pres_row: ArrayView1<'_, P>, serial_position: i64) -> Option<i64> {
	let index = usize::try_from(serial_position).ok()?.checked_sub(1)?;
	match pres_row.get(index)?.code() {
		ItemCode::Item(v) => Some(v),
		_ => None,
	}
}

// ============================================================================
// Recalls Matrix Builder
// ============================================================================

/// Build a recalls matrix from presented and recalled item numbers.
///
/// # Arguments
///
/// * `pres_itemnos` - `[trials × items]` item numbers of presented items (positive)
/// * `rec_itemnos` - `[trials × recalls]` item numbers of recalled items; `-1` marks
///   items outside the stimulus pool; rows may be padded with `0` or `NaN`
///
/// # Returns
///
/// `[trials × recalls]` recalls matrix with the same shape as `rec_itemnos`.
///
/// # Errors
///
/// - [`AnalysisError::ShapeMismatch`] if the row counts differ.
/// - [`AnalysisError::DuplicatePresentation`] if a recalled item matches more
///   than one presented item on its trial.
#[instrument(skip_all, fields(trials = rec_itemnos.nrows(), recalls = rec_itemnos.ncols()))]
pub fn make_recalls_matrix<P: ItemNumber, R: ItemNumber>(
	pres_itemnos: ArrayView2<'_, P>,
	rec_itemnos: ArrayView2<'_, R>,
) -> Result<Array2<i64>> {
	ensure_len("rec_itemnos rows", pres_itemnos.nrows(), rec_itemnos.nrows())?;

	let mut recalls = Array2::<i64>::zeros(rec_itemnos.raw_dim());
	let mut intrusions = 0_usize;

	for (trial, (rec_row, pres_row)) in rec_itemnos
		.rows()
		.into_iter()
		.zip(pres_itemnos.rows())
		.enumerate()
	{
		for (output, &cell) in rec_row.iter().enumerate() {
			let value = match cell.code() {
				ItemCode::Empty => NO_RECALL,
				ItemCode::ExtraList => INTRUSION,
				ItemCode::Item(item) => serial_position(pres_row, item)
					.map_err(|()| AnalysisError::DuplicatePresentation { trial, item })?
					.unwrap_or(INTRUSION),
			};
			if value == INTRUSION {
				intrusions += 1;
			}
			recalls[[trial, output]] = value;
		}
	}

	debug!(intrusions, "Built recalls matrix");
	Ok(recalls)
}

/// Find the 1-indexed position of `item` in a presentation row.
///
/// `Err(())` when the item occurs more than once.
fn serial_position<P: ItemNumber>(
	pres_row: ArrayView1<'_, P>,
	item: i64,
) -> std::result::Result<Option<i64>, ()> {
	let mut found = None;
	for (index, &presented) in pres_row.iter().enumerate() {
		if presented.code() == ItemCode::Item(item) {
			if found.is_some() {
				return Err(());
			}
			#[allow(clippy::cast_possible_wrap)]
			let position = index as i64 + 1;
			found = Some(position);
		}
	}
	Ok(found)
}

/// Fail if any recalls cell names a serial position beyond the list.
pub(crate) fn ensure_serial_positions(recalls: ArrayView2<'_, i64>, list_length: usize) -> Result<()> {
	#[allow(clippy::cast_possible_wrap)]
	let max = list_length as i64;
	match recalls.iter().find(|&&value| value > max) {
		Some(value) => Err(AnalysisError::out_of_range(
			"recalls",
			format!("serial position {value} exceeds list length {list_length}"),
		)),
		None => Ok(()),
	}
}
