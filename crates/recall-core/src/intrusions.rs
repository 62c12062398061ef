//! Intrusion Classification
//!
//! Labels every recall cell as one of:
//!
//! - `0` correct recall (or padding)
//! - `-1` extra-list intrusion (XLI)
//! - `k > 0` prior-list intrusion (PLI) of an item presented `k` lists back
//!
//! Rows of the same subject and session are assumed to be in chronological
//! order. The backward search never crosses a subject/session boundary, so
//! an item that only matches another session's list stays an XLI. Without
//! session labels every row of a subject counts as one session.

use std::collections::HashSet;

use ndarray::{Array2, ArrayView2};
use tracing::{debug, instrument};

use crate::error::{ensure_len, Result};
use crate::recalls::{ItemCode, ItemNumber};

/// Intrusions cell value for an extra-list intrusion.
pub const XLI: i64 = -1;

/// Build an intrusions matrix.
///
/// # Arguments
///
/// * `rec_itemnos` - `[trials × recalls]` recalled item numbers (`-1` for explicit XLIs)
/// * `pres_itemnos` - `[trials × items]` presented item numbers
/// * `subjects` - subject identifier per row
/// * `sessions` - session identifier per row, or `None` when each subject
///   has a single session
///
/// # Returns
///
/// `[trials × recalls]` intrusions matrix, same shape as `rec_itemnos`.
///
/// # Errors
///
/// Returns [`crate::AnalysisError::ShapeMismatch`] if `pres_itemnos`,
/// `subjects` or `sessions` do not have one entry per recall row.
#[instrument(skip_all, fields(trials = rec_itemnos.nrows()))]
pub fn create_intrusions<R, P, S, E>(
	rec_itemnos: ArrayView2<'_, R>,
	pres_itemnos: ArrayView2<'_, P>,
	subjects: &[S],
	sessions: Option<&[E]>,
) -> Result<Array2<i64>>
where
	R: ItemNumber,
	P: ItemNumber,
	S: PartialEq,
	E: PartialEq,
{
	let trials = rec_itemnos.nrows();
	ensure_len("subjects", trials, subjects.len())?;
	if let Some(sessions) = sessions {
		ensure_len("sessions", trials, sessions.len())?;
	}
	ensure_len("pres_itemnos rows", trials, pres_itemnos.nrows())?;

	let presented: Vec<HashSet<i64>> = pres_itemnos
		.rows()
		.into_iter()
		.map(|row| {
			row.iter()
				.filter_map(|&cell| match cell.code() {
					ItemCode::Item(item) => Some(item),
					_ => None,
				})
				.collect()
		})
		.collect();

	let mut intrusions = Array2::<i64>::zeros(rec_itemnos.raw_dim());
	let (mut plis, mut xlis) = (0_usize, 0_usize);

	for ((trial, output), &cell) in rec_itemnos.indexed_iter() {
		let label = match cell.code() {
			ItemCode::Empty => 0,
			ItemCode::ExtraList => XLI,
			ItemCode::Item(item) if presented[trial].contains(&item) => 0,
			ItemCode::Item(item) => lists_back(item, trial, &presented, subjects, sessions),
		};
		match label {
			XLI => xlis += 1,
			k if k > 0 => plis += 1,
			_ => {}
		}
		intrusions[[trial, output]] = label;
	}

	debug!(plis, xlis, "Classified intrusions");
	Ok(intrusions)
}

/// Walk back through the same subject/session and count lists until `item` was presented.
fn lists_back<S: PartialEq, E: PartialEq>(
	item: i64,
	trial: usize,
	presented: &[HashSet<i64>],
	subjects: &[S],
	sessions: Option<&[E]>,
) -> i64 {
	let same_session = |prior: usize| match sessions {
		Some(sessions) => sessions[prior] == sessions[trial],
		None => true,
	};
	let mut back: i64 = 1;
	for prior in (0..trial).rev() {
		if subjects[prior] != subjects[trial] || !same_session(prior) {
			break;
		}
		if presented[prior].contains(&item) {
			return back;
		}
		back += 1;
	}
	XLI
}
