//! Dataset Assembly
//!
//! Projects a flat list of typed study events into the per-trial matrices
//! every analysis consumes. Loading and parsing the events is left to the
//! caller; this module only groups, orders and pads.

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ensure_len, ensure_list_length, AnalysisError, Result};
use crate::intrusions::create_intrusions;
use crate::recalls::make_recalls_matrix;

/// Kind of study event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
	/// An item shown during study
	Presentation,
	/// An item produced during recall
	Recall,
}

/// One study or recall event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudyEvent {
	/// Subject identifier
	pub subject: String,
	/// Session number
	pub session: i64,
	/// Trial (list) number within the session
	pub trial: i64,
	/// Wordpool item number; negative for recalls outside the pool
	pub item_number: i64,
	/// Presentation or recall
	pub kind: EventKind,
	/// Time since the start of the recall period (ms), recalls only
	pub time_ms: Option<f64>,
}

/// Free-recall data for a set of trials, one row per trial.
///
/// Rows are ordered by subject, session and trial. Recall-shaped matrices
/// are right-padded with `0`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FreeRecallData {
	/// Subject of each row
	pub subjects: Vec<String>,
	/// Session of each row
	pub sessions: Vec<i64>,
	/// Trial number of each row
	pub trials: Vec<i64>,
	/// Items presented per trial
	pub list_length: usize,
	/// `[trials × list_length]` presented item numbers
	pub pres_itemnos: Array2<i64>,
	/// `[trials × recalls]` recalled item numbers
	pub rec_itemnos: Array2<i64>,
	/// `[trials × recalls]` recall times (ms); `0` for padding or unknown times
	pub times: Array2<f64>,
	/// `[trials × recalls]` recalls matrix
	pub recalls: Array2<i64>,
	/// `[trials × recalls]` intrusions matrix
	pub intrusions: Array2<i64>,
}

#[derive(Default)]
struct TrialEvents {
	presented: Vec<i64>,
	recalled: Vec<(i64, f64)>,
}

type TrialKey = (String, i64, i64);

impl FreeRecallData {
	/// Assemble trial matrices from events.
	///
	/// Events of one trial keep their relative order, so presentations and
	/// recalls must be listed in the order they happened.
	///
	/// # Errors
	///
	/// - [`AnalysisError::MissingArgument`] if `events` is empty.
	/// - [`AnalysisError::OutOfRange`] for a presented item number `<= 0`.
	/// - [`AnalysisError::ShapeMismatch`] if trials present different numbers
	///   of items.
	/// - [`AnalysisError::DuplicatePresentation`] if a recalled item was
	///   presented twice on its trial.
	#[instrument(skip_all, fields(events = events.len()))]
	pub fn from_events(events: &[StudyEvent]) -> Result<Self> {
		if events.is_empty() {
			return Err(AnalysisError::MissingArgument("events"));
		}

		let mut by_trial: BTreeMap<TrialKey, TrialEvents> = BTreeMap::new();
		for event in events {
			let trial = by_trial
				.entry((event.subject.clone(), event.session, event.trial))
				.or_default();
			match event.kind {
				EventKind::Presentation => {
					if event.item_number <= 0 {
						return Err(AnalysisError::out_of_range(
							"item_number",
							format!("presented item {} must be positive", event.item_number),
						));
					}
					trial.presented.push(event.item_number);
				}
				EventKind::Recall => trial
					.recalled
					.push((event.item_number, event.time_ms.unwrap_or(0.0))),
			}
		}

		let list_length = by_trial
			.values()
			.map(|trial| trial.presented.len())
			.max()
			.unwrap_or(0);
		ensure_list_length(list_length)?;
		for trial in by_trial.values() {
			ensure_len("presented items", list_length, trial.presented.len())?;
		}

		let max_recalls = by_trial
			.values()
			.map(|trial| trial.recalled.len())
			.max()
			.unwrap_or(0);
		let n_trials = by_trial.len();

		let mut pres_itemnos = Array2::zeros((n_trials, list_length));
		let mut rec_itemnos = Array2::zeros((n_trials, max_recalls));
		let mut times = Array2::zeros((n_trials, max_recalls));
		let mut subjects = Vec::with_capacity(n_trials);
		let mut sessions = Vec::with_capacity(n_trials);
		let mut trials = Vec::with_capacity(n_trials);

		for (row, ((subject, session, trial), data)) in by_trial.into_iter().enumerate() {
			for (cell, &item) in pres_itemnos.row_mut(row).iter_mut().zip(&data.presented) {
				*cell = item;
			}
			for (output, &(item, time)) in data.recalled.iter().enumerate() {
				rec_itemnos[[row, output]] = item;
				times[[row, output]] = time;
			}
			subjects.push(subject);
			sessions.push(session);
			trials.push(trial);
		}

		let recalls = make_recalls_matrix(pres_itemnos.view(), rec_itemnos.view())?;
		let intrusions = create_intrusions(
			rec_itemnos.view(),
			pres_itemnos.view(),
			&subjects,
			Some(sessions.as_slice()),
		)?;

		debug!(trials = n_trials, list_length, max_recalls, "Assembled free-recall data");
		Ok(Self {
			subjects,
			sessions,
			trials,
			list_length,
			pres_itemnos,
			rec_itemnos,
			times,
			recalls,
			intrusions,
		})
	}

	/// Number of trial rows.
	#[must_use]
	pub fn len(&self) -> usize {
		self.subjects.len()
	}

	/// Whether there are no trials.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.subjects.is_empty()
	}
}
