//! # Recall Core
//!
//! Behavioral analysis of free-recall memory experiments: serial position
//! curves, lag-CRPs, temporal and semantic clustering factors, intrusion
//! counts and recognition signal detection.
//!
//! ## The Recalls Matrix
//!
//! Every analysis starts from the same canonical encoding. Given the item
//! numbers presented on each trial and the item numbers recalled, in
//! output order, [`make_recalls_matrix`] produces one row per trial:
//!
//! ```text
//! presented: [12, 40, 7, 33]       recalled: [7, 33, 99, 12, 0]
//! recalls:                                   [3,  4, -1,  1, 0]
//! ```
//!
//! - `> 0` serial position of the recalled item (1-indexed)
//! - `0` padding, no recall
//! - `-1` intrusion
//!
//! [`create_intrusions`] then tells prior-list intrusions (`k` lists back)
//! from extra-list intrusions (`-1`), and the [`mask`] module selects
//! subsets of recalls (clean recalls, repetitions, PLIs, XLIs).
//!
//! ## Transitions
//!
//! The clustering statistics share one walk over each trial. At every
//! clean transition the recall actually made is compared against all
//! recalls that were still possible:
//!
//! 1. **Lag-CRP** bins the possible lags and reports
//!    ```text
//!    CRP(lag) = actual(lag) / possible(lag)
//!    ```
//! 2. **Temporal factor** ranks the actual `|lag|` among the possible ones
//!    (`1.0` = always the nearest neighbor).
//! 3. **Semantic factor / semantic CRP** do the same with values looked up
//!    in an item-by-item similarity matrix.
//!
//! Subjects (or bins) without data are `NaN`, never `0`: a zero is a
//! measurement, `NaN` means nothing was measured.
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use recall_core::{lag_crp, make_recalls_matrix, serial_position_curve, LagCrpConfig};
//!
//! let presented = array![[1, 2, 3], [4, 5, 6]];
//! let recalled = array![[1, 2, 3], [6, 5, 0]];
//! let subjects = ["s1", "s1"];
//!
//! let recalls = make_recalls_matrix(presented.view(), recalled.view())?;
//!
//! let spc = serial_position_curve(recalls.view(), &subjects, 3, None)?;
//! assert_eq!(spc.row(0).to_vec(), vec![0.5, 1.0, 1.0]);
//!
//! let crp = lag_crp(recalls.view(), &subjects, 3, &LagCrpConfig::default())?;
//! // Columns are lags -2..=2; lag 0 is undefined
//! assert!(crp[[0, 2]].is_nan());
//! # Ok::<(), recall_core::AnalysisError>(())
//! ```
//!
//! ## Logging
//!
//! Public entry points are instrumented with [`tracing`] spans and emit a
//! `debug` summary event. No subscriber is installed by the library.
//!
//! ## References
//!
//! - Kahana, M. J. (1996). *Associative retrieval processes in free recall* -
//!   Lag-CRP
//! - Polyn, S. M., Norman, K. A., & Kahana, M. J. (2009). *A context
//!   maintenance and retrieval model of organizational processes in free
//!   recall* - Temporal and semantic clustering factors
//! - Kahana, M. J. (2012). *Foundations of Human Memory* - Recall analyses

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod counts;
pub mod dataset;
pub mod error;
pub mod intrusions;
pub mod mask;
pub mod positional;
pub mod recalls;
pub mod recognition;
pub mod semantic;
pub mod subjects;
pub mod transitions;

pub use counts::{pli_count, repetition_count, xli_count, CountOptions, RepetitionOptions};
pub use dataset::{EventKind, FreeRecallData, StudyEvent};
pub use error::{AnalysisError, Result};
pub use intrusions::{create_intrusions, XLI};
pub use mask::{
	blank_mask, clean_recalls_mask, finite_mask, mask_data, pli_mask, repetition_mask,
	shift_mask, xli_mask,
};
pub use positional::{
	inter_response_times, or_score, positional_crp, prob_first_recall, prob_nth_recall,
	prob_stopping, rejection_probability, serial_position_curve, serial_ratios,
	transition_probability, StopTiming, TransitionAveraging,
};
pub use recalls::{make_recalls_matrix, ItemCode, ItemNumber, INTRUSION, NO_RECALL};
pub use recognition::{
	d_prime, probit, z_roc, ProbeKind, RecognitionConfig, RecognitionEvent, SignalTally,
	ZRocPoint,
};
pub use semantic::{
	distance_factor, semantic_crl, semantic_crp, Proximity, SemanticCrl, SemanticCrp,
	SemanticCrpConfig, SimilarityBins,
};
pub use subjects::SubjectGroups;
pub use transitions::{lag_crl, lag_crp, percentile_rank, temporal_factor, LagCrpConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
