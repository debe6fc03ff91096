// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Errors and warnings raised by the counting core. Setup problems are recoverable at the
//! setup boundary; count-time problems are fatal and end the status stream.

use thiserror::Error;

/// Raised by the setup methods (`add_group`, `add_candidate`, `add_voter`). The caller must
/// not proceed to `start()` after one of these; the instance is left in a well-defined but
/// incomplete state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("group {0} was already added")]
    DuplicateGroup(String),
    #[error("candidate {0} was already added")]
    DuplicateCandidate(String),
    #[error("voter {0} was already added")]
    DuplicateVoter(String),
    #[error("candidate {candidate} references unknown group {group}")]
    UnknownGroup { candidate: String, group: String },
    #[error("a voter id must not be empty")]
    EmptyVoterId,
}

/// Non-fatal setup problems. These do not stop setup; they are handed to whatever
/// [`WarningSink`] the instance was constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupWarning {
    /// A voter's preference list named a candidate code that was never added.
    UnknownCandidateCode { voter: String, code: String },
    /// A voter's preference list named the same candidate code twice; the later
    /// occurrence was skipped.
    DuplicateCandidateCode { voter: String, code: String },
}

impl std::fmt::Display for SetupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SetupWarning::UnknownCandidateCode { voter, code } => write!(
                f,
                "voter {voter} listed unknown candidate code {code}, skipped"
            ),
            SetupWarning::DuplicateCandidateCode { voter, code } => write!(
                f,
                "voter {voter} listed candidate code {code} twice, later occurrence skipped"
            ),
        }
    }
}

/// Accepts [`SetupWarning`]s as they occur. Pass [`DiscardWarnings`] to ignore them, or
/// [`CollectWarnings`] to retain them for inspection after setup.
pub trait WarningSink {
    fn warn(&mut self, warning: SetupWarning);
}

/// The default sink: warnings are raised and immediately forgotten.
#[derive(Default)]
pub struct DiscardWarnings;

impl WarningSink for DiscardWarnings {
    fn warn(&mut self, _warning: SetupWarning) {}
}

/// A sink that keeps every warning in arrival order.
#[derive(Default)]
pub struct CollectWarnings(pub Vec<SetupWarning>);

impl WarningSink for CollectWarnings {
    fn warn(&mut self, warning: SetupWarning) {
        self.0.push(warning);
    }
}

/// Fatal, count-time conditions. These end the status stream with no partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CountError {
    /// Gap repair could not reactivate enough deactivated candidates to fill the active
    /// list back up to the number of unfilled seats.
    #[error(
        "reactivation failed in round {round}.{subround}: needed {needed} more active \
         candidates but only {available} deactivated candidates remained"
    )]
    ReactivationFailed {
        round: usize,
        subround: usize,
        needed: usize,
        available: usize,
    },
}

/// An aggregate invariant from the data model failed. This should never happen; it
/// indicates a bug in the engine rather than bad input. Checked with `debug_assert!` at the
/// call sites that establish each invariant rather than returned from every operation,
/// matching the "should not happen" severity in the error handling design:
/// `allocation.rs::allocate_voter` checks a voter's committed weight plus waste sums to one,
/// `reduction.rs::reduce_candidate` checks a winner's committed weight equals `wonatquota`
/// once its reduction pass completes, and `engine.rs::run` checks group seat counts never
/// exceed their quota and that the graph's vote total is conserved at termination.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);
