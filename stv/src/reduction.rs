// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The reduction operator: a one-pass water-filling iteration that caps a winner's supporter
//! edges at the weight it is entitled to keep.

use crate::ballot_graph::Stv;
use crate::edge::EdgeStatus;
use crate::error::InvariantViolation;
use crate::index::{CandidateIndex, EdgeIndex};
use crate::ALLOCATION_TOLERANCE;

impl Stv {
    /// Reduce a winner that was marked `needs_reduction`: find the common support weight
    /// (`threshold`) that every full supporter would contribute if every non-full supporter
    /// gave only what it can, and fix every full edge's weight to that threshold.
    ///
    /// `threshold` is monotonically non-decreasing as the loop walks `partials` (ascending by
    /// weight) then `fulls`: each partial promoted to full only raises the numerator less
    /// than it raises the denominator shrinks, so later thresholds are never smaller.
    pub(crate) fn reduce_candidate(&mut self, candidate: CandidateIndex) {
        self.candidates[candidate.0].needs_reduction = false;

        let mut fulls: Vec<EdgeIndex> = Vec::new();
        let mut partials: Vec<EdgeIndex> = Vec::new();
        for &edge_index in &self.candidates[candidate.0].edges {
            match self.edges[edge_index.0].status {
                EdgeStatus::Full => fulls.push(edge_index),
                EdgeStatus::Partial if self.edges[edge_index.0].weight > 0.0 => {
                    partials.push(edge_index)
                }
                _ => {}
            }
        }
        partials.sort_by(|&a, &b| {
            self.edges[a.0]
                .weight
                .partial_cmp(&self.edges[b.0].weight)
                .unwrap()
        });

        let wonatquota = self.candidates[candidate.0].wonatquota;
        let total_supporters = fulls.len() + partials.len();
        let mut partial_count = 0usize;
        let mut partial_weight = 0.0;

        for &edge_index in partials.iter().chain(fulls.iter()) {
            let threshold = (wonatquota - partial_weight) / (total_supporters - partial_count) as f64;
            let mut status = self.edges[edge_index.0].status;
            if status == EdgeStatus::Partial {
                if self.edges[edge_index.0].weight < threshold {
                    partial_count += 1;
                    partial_weight += self.edges[edge_index.0].weight;
                } else {
                    self.set_edge_status(edge_index, EdgeStatus::Full);
                    status = EdgeStatus::Full;
                }
            }
            if status == EdgeStatus::Full {
                self.edges[edge_index.0].weight = threshold;
                self.candidates[candidate.0].mark_votes_dirty();
                let voter = self.edges[edge_index.0].voter;
                self.voters[voter.0].needs_allocation = true;
            }
        }

        let committed: f64 = fulls
            .iter()
            .map(|&e| self.edges[e.0].weight)
            .sum::<f64>()
            + partial_weight;
        debug_assert!(
            (committed - wonatquota).abs() <= ALLOCATION_TOLERANCE,
            "{}",
            InvariantViolation(format!(
                "candidate {} committed weight {committed} != wonatquota {wonatquota} after reduction",
                self.candidates[candidate.0].code
            ))
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DiscardWarnings;
    use crate::index::VoterIndex;

    use super::*;

    /// Four voters ranking the same winner first; the winner's quota is 2, so it keeps 2.0
    /// spread evenly across its four full-weight-1.0 supporters once reduced: threshold 0.5.
    #[test]
    fn even_split_among_equal_partial_supporters() {
        let mut stv = Stv::new(false, false);
        stv.add_group("g", 1).unwrap();
        let a = stv.add_candidate("a", "Alice", "g").unwrap();
        for i in 0..4 {
            stv.add_voter(
                &format!("v{i}"),
                &["a".to_string()],
                &mut DiscardWarnings,
            )
            .unwrap();
        }
        for voter in 0..4 {
            stv.allocate_voter(VoterIndex(voter));
        }
        assert_eq!(stv.candidate_votes(a), 4.0);

        stv.candidates[a.0].wonatquota = 2.0;
        for &edge_index in stv.candidates[a.0].edges.clone().iter() {
            stv.set_edge_status(edge_index, EdgeStatus::Partial);
        }
        stv.reduce_candidate(a);

        for &edge_index in &stv.candidates[a.0].edges {
            assert_eq!(stv.edges[edge_index.0].status, EdgeStatus::Full);
            assert!((stv.edges[edge_index.0].weight - 0.5).abs() < 1e-9);
        }
    }
}
