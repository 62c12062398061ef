//! Error types for recall analyses.
//!
//! Every public entry point validates its inputs before computing anything,
//! so an error always means "no output at all". Subjects that simply have no
//! data for a statistic are not errors; they get `NaN` cells instead.

/// Errors raised while validating or transforming recall data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
	/// A required input was not supplied.
	#[error("Missing required argument: {0}")]
	MissingArgument(&'static str),

	/// Companion arrays disagree in row count, length or shape.
	#[error("Shape mismatch for {what}: expected {expected}, found {found}")]
	ShapeMismatch {
		/// Which input disagreed
		what: &'static str,
		/// Size implied by the reference input
		expected: usize,
		/// Size actually supplied
		found: usize,
	},

	/// A scalar parameter or cell value lies outside its valid domain.
	#[error("{name} out of range: {reason}")]
	OutOfRange {
		/// Parameter name
		name: &'static str,
		/// Why the value was rejected
		reason: String,
	},

	/// An item appears more than once in one trial's presentation row.
	#[error("Item {item} was presented more than once on trial {trial}")]
	DuplicatePresentation {
		/// Trial (row) index
		trial: usize,
		/// Offending item number
		item: i64,
	},
}

impl AnalysisError {
	/// Check if this error was caused by malformed arguments rather than corrupt data.
	#[must_use]
	pub const fn is_input_error(&self) -> bool {
		matches!(
			self,
			Self::MissingArgument(_) | Self::ShapeMismatch { .. } | Self::OutOfRange { .. }
		)
	}

	/// Check if this error indicates corrupt upstream data.
	#[must_use]
	pub const fn is_data_integrity(&self) -> bool {
		matches!(self, Self::DuplicatePresentation { .. })
	}

	pub(crate) fn out_of_range(name: &'static str, reason: impl Into<String>) -> Self {
		Self::OutOfRange {
			name,
			reason: reason.into(),
		}
	}
}

/// Result type alias for recall analyses.
pub type Result<T> = std::result::Result<T, AnalysisError>;

// ============================================================================
// Shared validation
// ============================================================================

/// Fail unless `found == expected`.
pub(crate) fn ensure_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
	if expected == found {
		Ok(())
	} else {
		Err(AnalysisError::ShapeMismatch {
			what,
			expected,
			found,
		})
	}
}

/// Fail unless two matrices have identical `(rows, cols)`.
pub(crate) fn ensure_shape(
	what: &'static str,
	expected: (usize, usize),
	found: (usize, usize),
) -> Result<()> {
	ensure_len(what, expected.0, found.0)?;
	ensure_len(what, expected.1, found.1)
}

/// Fail unless the list length is usable.
pub(crate) fn ensure_list_length(list_length: usize) -> Result<()> {
	if list_length == 0 {
		return Err(AnalysisError::out_of_range(
			"list_length",
			"lists must contain at least one item",
		));
	}
	Ok(())
}

// ============================================================================
// Undefined results
// ============================================================================

/// `numerator / denominator`, or `NaN` when nothing was counted.
///
/// An empty denominator means "no data", which must stay distinguishable
/// from a measured zero.
#[inline]
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
	if denominator == 0.0 {
		f64::NAN
	} else {
		numerator / denominator
	}
}
