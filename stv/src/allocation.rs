// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The allocation operator: per-voter redistribution of a voter's unit weight to its live
//! preferences.

use crate::ballot_graph::Stv;
use crate::edge::EdgeStatus;
use crate::error::InvariantViolation;
use crate::index::VoterIndex;
use crate::ALLOCATION_TOLERANCE;

impl Stv {
    /// Send a voter's whole unit of support to the highest-ranked preference still able to
    /// accept it. Weight already fixed by a PARTIAL/FULL edge is left alone; everything else
    /// is zeroed and then re-sent to the first ACTIVE/PARTIAL edge in preference order. Any
    /// leftover (no live preference left) becomes waste.
    pub(crate) fn allocate_voter(&mut self, voter: VoterIndex) {
        self.voters[voter.0].needs_allocation = false;

        let edges: Vec<_> = self.voters[voter.0].edges.clone();
        let mut total = 1.0;
        for &edge_index in &edges {
            let edge = &self.edges[edge_index.0];
            match edge.status {
                EdgeStatus::Partial | EdgeStatus::Full => total -= edge.weight,
                _ => {
                    if edge.weight > 0.0 {
                        self.edges[edge_index.0].weight = 0.0;
                        self.candidates[edge.candidate.0].mark_votes_dirty();
                    }
                }
            }
        }

        if total > ALLOCATION_TOLERANCE {
            for &edge_index in &edges {
                let status = self.edges[edge_index.0].status;
                if matches!(status, EdgeStatus::Active | EdgeStatus::Partial) {
                    self.edges[edge_index.0].weight += total;
                    total = 0.0;
                    let candidate = self.edges[edge_index.0].candidate;
                    self.candidates[candidate.0].mark_votes_dirty();
                    if self.candidates[candidate.0].wonatquota > 0.0 {
                        self.set_edge_status(edge_index, EdgeStatus::Partial);
                        self.candidates[candidate.0].needs_reduction = true;
                    }
                    break;
                }
            }
        }

        self.voters[voter.0].waste = total;

        let committed: f64 = edges.iter().map(|&e| self.edges[e.0].weight).sum::<f64>() + total;
        debug_assert!(
            (committed - 1.0).abs() <= ALLOCATION_TOLERANCE,
            "{}",
            InvariantViolation(format!(
                "voter {} weight+waste {committed} != 1 after allocation",
                self.voters[voter.0].id
            ))
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DiscardWarnings;

    use super::*;

    fn build_two_candidate_graph() -> Stv {
        let mut stv = Stv::new(false, false);
        stv.add_group("g", 1).unwrap();
        stv.add_candidate("a", "Alice", "g").unwrap();
        stv.add_candidate("b", "Bob", "g").unwrap();
        stv.add_voter(
            "v1",
            &["a".to_string(), "b".to_string()],
            &mut DiscardWarnings,
        )
        .unwrap();
        stv
    }

    #[test]
    fn first_active_preference_absorbs_full_weight() {
        let mut stv = build_two_candidate_graph();
        stv.allocate_voter(VoterIndex(0));
        assert_eq!(stv.voters[0].waste, 0.0);
        let first_edge = stv.voters[0].edges[0];
        assert_eq!(stv.edges[first_edge.0].weight, 1.0);
    }

    #[test]
    fn no_live_preference_becomes_waste() {
        let mut stv = build_two_candidate_graph();
        for &edge_index in stv.voters[0].edges.clone().iter() {
            stv.set_edge_status(edge_index, EdgeStatus::Deactivated);
        }
        stv.allocate_voter(VoterIndex(0));
        assert_eq!(stv.voters[0].waste, 1.0);
    }
}
