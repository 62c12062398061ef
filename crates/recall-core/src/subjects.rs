//! Subject Grouping
//!
//! Every per-subject statistic walks the trial rows of one subject at a
//! time. Rows are grouped by a stable sort-unique over the subject vector,
//! so output row `i` always belongs to the `i`-th smallest identifier and
//! rows inside a group keep their chronological order.

use std::collections::BTreeMap;

/// Trial rows grouped by subject identifier, ascending.
#[derive(Clone, Debug)]
pub struct SubjectGroups<S> {
	ids: Vec<S>,
	rows: Vec<Vec<usize>>,
}

impl<S: Ord + Clone> SubjectGroups<S> {
	/// Group row indices by subject.
	#[must_use]
	pub fn new(subjects: &[S]) -> Self {
		let mut groups: BTreeMap<&S, Vec<usize>> = BTreeMap::new();
		for (row, subject) in subjects.iter().enumerate() {
			groups.entry(subject).or_default().push(row);
		}

		let (ids, rows) = groups
			.into_iter()
			.map(|(id, rows)| (id.clone(), rows))
			.unzip();

		Self { ids, rows }
	}

	/// Unique subject identifiers in output order.
	#[must_use]
	pub fn ids(&self) -> &[S] {
		&self.ids
	}

	/// Number of unique subjects.
	#[must_use]
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	/// Whether there are no subjects at all.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	/// Row indices belonging to the `i`-th subject.
	#[must_use]
	pub fn rows(&self, i: usize) -> &[usize] {
		&self.rows[i]
	}

	/// Iterate `(subject, rows)` pairs in output order.
	pub fn iter(&self) -> impl Iterator<Item = (&S, &[usize])> {
		self.ids
			.iter()
			.zip(self.rows.iter().map(Vec::as_slice))
	}
}
