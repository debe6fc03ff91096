// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The five-state edge (`VoteLink`) that joins a voter to a candidate, and the static
//! transition table that is the only way its status is allowed to change.

use crate::index::{CandidateIndex, VoterIndex};
use serde::{Deserialize, Serialize};

/// Status of a single voter-candidate edge. The numeric values are part of the observable
/// contract (front-ends key off them), so they are fixed by `#[repr(i8)]` rather than left
/// to derive order.
#[repr(i8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeStatus {
    /// Permanently lost support: the candidate's group is full and will never un-fill.
    Excluded = -2,
    /// Temporarily lost support: candidate may be reactivated.
    Deactivated = -1,
    /// Open support, not yet a winner.
    Active = 0,
    /// Edge to a winner that may not get to keep all of this weight.
    Partial = 1,
    /// Edge to a winner whose weight has been fixed by the reduction operator.
    Full = 2,
}

impl EdgeStatus {
    pub fn code(self) -> i8 {
        self as i8
    }
}

/// Whether `new` is a legal transition from `old`, per the table in the data model.
/// Transitioning a status to itself is always a legal no-op.
pub fn is_legal_transition(old: EdgeStatus, new: EdgeStatus) -> bool {
    use EdgeStatus::*;
    if old == new {
        return true;
    }
    matches!(
        (old, new),
        (Active, Deactivated)
            | (Deactivated, Active)
            | (Active, Excluded)
            | (Deactivated, Excluded)
            | (Active, Partial)
            | (Partial, Full)
            | (Full, Partial)
    )
}

/// A single weighted edge between a voter and a candidate, in the voter's preference order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteLink {
    pub voter: VoterIndex,
    pub candidate: CandidateIndex,
    pub weight: f64,
    pub status: EdgeStatus,
}

impl VoteLink {
    pub(crate) fn new(voter: VoterIndex, candidate: CandidateIndex) -> Self {
        VoteLink {
            voter,
            candidate,
            weight: 0.0,
            status: EdgeStatus::Active,
        }
    }

    /// Move to `new`, panicking in debug builds on an illegal transition. Release builds
    /// just apply it; the fixpoint driver never constructs an illegal transition itself,
    /// so this is a should-not-happen assertion rather than user-facing validation.
    pub(crate) fn set_status(&mut self, new: EdgeStatus) {
        debug_assert!(
            is_legal_transition(self.status, new),
            "illegal edge transition {:?} -> {:?}",
            self.status,
            new
        );
        self.status = new;
    }
}
