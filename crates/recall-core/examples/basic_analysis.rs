//! Basic Free-Recall Analysis Example
//!
//! This example demonstrates the core analysis pipeline:
//! 1. Assemble trial matrices from study events
//! 2. Compute serial position and first-recall curves
//! 3. Measure temporal clustering with the lag-CRP and temporal factor
//! 4. Count intrusions
//!
//! Run with: `cargo run --example basic_analysis`

use ndarray::s;
use recall_core::{
	lag_crp, pli_count, prob_first_recall, serial_position_curve, temporal_factor, xli_count,
	CountOptions, EventKind, FreeRecallData, LagCrpConfig, StudyEvent,
};

fn event(subject: &str, trial: i64, item_number: i64, kind: EventKind, time_ms: Option<f64>) -> StudyEvent {
	StudyEvent {
		subject: subject.to_owned(),
		session: 1,
		trial,
		item_number,
		kind,
		time_ms,
	}
}

/// Two subjects, three lists of five words each.
fn study_events() -> Vec<StudyEvent> {
	let recalls: [(&str, i64, &[i64]); 6] = [
		("alice", 1, &[5, 4, 1, 2, 3]),
		("alice", 2, &[8, 9, 10, 2]),  // 2 is a prior-list intrusion
		("alice", 3, &[11, 12, 13]),
		("bob", 1, &[1, 3, 5]),
		("bob", 2, &[10, 99, 6]),      // 99 was never presented
		("bob", 3, &[15, 14, 13, 12]),
	];

	let mut events = Vec::new();
	for (subject, trial, recalled) in recalls {
		let first = (trial - 1) * 5 + 1;
		for item in first..first + 5 {
			events.push(event(subject, trial, item, EventKind::Presentation, None));
		}
		for (output, &item) in (1_i64..).zip(recalled) {
			#[allow(clippy::cast_precision_loss)]
			let time = (output * 1500) as f64;
			events.push(event(subject, trial, item, EventKind::Recall, Some(time)));
		}
	}
	events
}

fn main() -> recall_core::Result<()> {
	println!("=== Basic Free-Recall Analysis ===\n");

	let data = FreeRecallData::from_events(&study_events())?;
	println!("Trials: {}, list length: {}", data.len(), data.list_length);
	println!("Recalls matrix:\n{}\n", data.recalls);

	let spc = serial_position_curve(data.recalls.view(), &data.subjects, data.list_length, None)?;
	println!("Serial position curve (rows: alice, bob):\n{spc:.2}\n");

	let pfr = prob_first_recall(data.recalls.view(), &data.subjects, data.list_length)?;
	println!("Probability of first recall:\n{pfr:.2}\n");

	let crp = lag_crp(
		data.recalls.view(),
		&data.subjects,
		data.list_length,
		&LagCrpConfig::default(),
	)?;
	// Columns span lags -4..=4; keep the three nearest on each side
	let center = data.list_length - 1;
	let near = crp.slice(s![.., center - 3..=center + 3]);
	println!("Lag-CRP for lags -3..=3:\n{near:.2}\n");

	let factor = temporal_factor(data.recalls.view(), &data.subjects, data.list_length, 0)?;
	println!("Temporal factor: {factor:.3}");

	let options = CountOptions::default();
	let plis = pli_count(data.intrusions.view(), &data.subjects, None, &options)?;
	let xlis = xli_count(data.intrusions.view(), &data.subjects, None, &options)?;
	println!("PLIs: {plis}, XLIs: {xlis}");

	Ok(())
}
