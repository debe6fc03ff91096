// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The round engine: sequences the fixpoint driver and the decision step, materialising the
//! status stream that drives [`crate::progress::StvProgress`] and any other consumer.

use crate::ballot_graph::Stv;
use crate::edge::EdgeStatus;
use crate::error::{CountError, InvariantViolation};
use crate::index::CandidateIndex;
use crate::ALLOCATION_TOLERANCE;
use serde::{Deserialize, Serialize};

/// How detailed a view of the count a consumer wants. A consumer subscribed at level `V`
/// should only keep events with `yield_level <= V`; finer-grained levels are suppressed.
#[repr(i8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum YieldLevel {
    Initial = -1,
    Begin = 0,
    End = 1,
    Round = 2,
    Subround = 3,
    Loop = 4,
}

/// One event in the status stream: which granularity it was emitted at, and (for decision
/// events) what happened.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub yield_level: YieldLevel,
    pub winner: Option<CandidateIndex>,
    pub loser: Option<CandidateIndex>,
    pub excluded_by_group: Vec<CandidateIndex>,
    pub reactivated: Vec<CandidateIndex>,
}

impl Status {
    fn new(yield_level: YieldLevel) -> Self {
        Status {
            yield_level,
            winner: None,
            loser: None,
            excluded_by_group: Vec::new(),
            reactivated: Vec::new(),
        }
    }

    /// True when a `Position` built from this status represents a win or a loss, per the
    /// progress recorder's `has_decision`.
    pub fn has_decision(&self) -> bool {
        self.winner.is_some() || self.loser.is_some()
    }
}

/// Which of the four candidate lists a move is to or from.
#[derive(Clone, Copy)]
enum CandidateList {
    Active,
    Deactivated,
    Winners,
    Excluded,
}

impl Stv {
    fn list_mut(&mut self, which: CandidateList) -> &mut Vec<CandidateIndex> {
        match which {
            CandidateList::Active => &mut self.active,
            CandidateList::Deactivated => &mut self.deactivated,
            CandidateList::Winners => &mut self.winners,
            CandidateList::Excluded => &mut self.excluded,
        }
    }

    /// Move a candidate from one list to another and update every incident edge's status
    /// (and, if requested, mark every incident voter for allocation).
    fn process_candidate(
        &mut self,
        candidate: CandidateIndex,
        from: CandidateList,
        to: CandidateList,
        new_status: EdgeStatus,
        voters_do_allocate: bool,
    ) {
        let position = self.list_mut(from).iter().position(|&c| c == candidate).expect(
            "process_candidate called with a candidate not present in the source list",
        );
        self.list_mut(from).remove(position);
        self.list_mut(to).push(candidate);

        let edges = self.candidates[candidate.0].edges.clone();
        for edge_index in edges {
            self.set_edge_status(edge_index, new_status);
            let voter = self.edges[edge_index.0].voter;
            self.voters[voter.0].needs_allocation = voters_do_allocate;
        }
    }

    /// Move deactivated candidates back to active, most-recently-deactivated first. With no
    /// limit, every deactivated candidate is reactivated (full reactivation mode); with a
    /// limit, reactivation stops once that many candidates have been moved (gap repair).
    fn reactivate(&mut self, limit: Option<usize>) -> Vec<CandidateIndex> {
        let mut reactivated = Vec::new();
        let candidates: Vec<CandidateIndex> = self.deactivated.iter().rev().copied().collect();
        for candidate in candidates {
            self.process_candidate(
                candidate,
                CandidateList::Deactivated,
                CandidateList::Active,
                EdgeStatus::Active,
                true,
            );
            reactivated.push(candidate);
            if let Some(limit) = limit {
                if reactivated.len() >= limit {
                    break;
                }
            }
        }
        reactivated
    }

    /// Run the fixpoint driver (allocation then reduction, repeated until no reduction
    /// occurs) and append its LOOP-level events to `events`. `on_event` is invoked with the
    /// graph still in the state the event describes, before the next phase mutates it
    /// further — the closest a materialised event list can get to a generator's yield point.
    fn run_fixpoint(&mut self, events: &mut Vec<Status>, on_event: &mut dyn FnMut(&Stv, &Status)) {
        let mut repeat_reduce = true;
        while repeat_reduce {
            repeat_reduce = false;
            self.loopcount += 1;

            let to_allocate: Vec<_> = self
                .voters
                .iter()
                .enumerate()
                .filter(|(_, v)| v.needs_allocation)
                .map(|(i, _)| crate::index::VoterIndex(i))
                .collect();
            for voter in to_allocate {
                self.allocate_voter(voter);
                self.allocationcount += 1;
            }
            if self.allocationcount > 0 {
                let status = Status::new(YieldLevel::Loop);
                on_event(self, &status);
                events.push(status);
                self.allocationcount = 0;
            }

            let to_reduce: Vec<_> = self
                .winners
                .iter()
                .copied()
                .filter(|&c| self.candidates[c.0].needs_reduction)
                .collect();
            for winner in to_reduce {
                repeat_reduce = true;
                self.reduce_candidate(winner);
                self.reductioncount += 1;
            }
            if self.reductioncount > 0 {
                let status = Status::new(YieldLevel::Loop);
                on_event(self, &status);
                events.push(status);
                self.reductioncount = 0;
            }
        }
    }

    /// Drive the count to completion, returning every status event in order. Call once per
    /// instance; the engine has no resumable state beyond what is already in `self`.
    pub fn start(&mut self) -> Result<Vec<Status>, CountError> {
        self.run(|_, _| {})
    }

    /// Like [`Stv::start`], but `on_event` is called with a read-only view of the graph at
    /// the moment each event is produced, before the next phase mutates it further. This is
    /// the hook [`crate::progress::StvProgress`] uses to build its snapshots, and the one any
    /// other consumer that needs the graph's *historical* per-event state (rather than only
    /// its final state once `start()` returns) should use instead of re-querying `self` after
    /// the count has already run to completion.
    pub fn run(
        &mut self,
        mut on_event: impl FnMut(&Stv, &Status),
    ) -> Result<Vec<Status>, CountError> {
        let begin = Status::new(YieldLevel::Begin);
        on_event(self, &begin);
        let mut events = vec![begin];

        loop {
            if self.is_subround {
                self.subrounds += 1;
            } else {
                self.rounds += 1;
                self.subrounds = 1;
            }
            self.is_subround = true;
            self.loopcount = 0;

            self.run_fixpoint(&mut events, &mut on_event);
            self.sort_active();

            if self.rounds == 1 && self.subrounds == 1 {
                let initial = Status::new(YieldLevel::Initial);
                on_event(self, &initial);
                events.push(initial);
            }

            let mut decision = Status::new(YieldLevel::Round);
            let top = self.active[0];
            let quota = self.quota();
            let votes = self.candidate_votes(top);

            if votes >= quota || self.winners.len() + self.active.len() == self.total_seats as usize {
                self.candidates[top.0].wonatquota = if votes > quota { quota } else { votes };
                self.process_candidate(
                    top,
                    CandidateList::Active,
                    CandidateList::Winners,
                    EdgeStatus::Partial,
                    false,
                );
                self.candidates[top.0].needs_reduction = true;
                decision.winner = Some(top);

                let group = self.candidates[top.0].group;
                self.groups[group.0].seats_won += 1;
                debug_assert!(
                    self.groups[group.0].seats_won <= self.groups[group.0].seats,
                    "{}",
                    InvariantViolation(format!(
                        "group {} seats_won {} exceeds seats {}",
                        self.groups[group.0].name,
                        self.groups[group.0].seats_won,
                        self.groups[group.0].seats
                    ))
                );

                if self.use_groups && self.groups[group.0].is_full() {
                    let to_exclude: Vec<CandidateIndex> = self
                        .active
                        .iter()
                        .chain(self.deactivated.iter())
                        .copied()
                        .filter(|&c| self.candidates[c.0].group == group)
                        .collect();
                    for candidate in to_exclude {
                        let from = if self.active.contains(&candidate) {
                            CandidateList::Active
                        } else {
                            CandidateList::Deactivated
                        };
                        self.process_candidate(
                            candidate,
                            from,
                            CandidateList::Excluded,
                            EdgeStatus::Excluded,
                            true,
                        );
                        decision.excluded_by_group.push(candidate);
                    }
                }

                if self.winners.len() == self.total_seats as usize {
                    decision.yield_level = YieldLevel::End;
                    on_event(self, &decision);
                    events.push(decision);

                    // Conservation, checked two independent ways: the candidate-vote cache
                    // (built from edge weights incrementally) and the per-voter waste field
                    // (set directly by the allocation operator) must agree on how much of
                    // the total support voters still hold versus have wasted.
                    let held: f64 = self
                        .winners
                        .iter()
                        .chain(self.active.iter())
                        .map(|&c| self.candidate_votes(c))
                        .sum();
                    let waste: f64 = self.voters.iter().map(|v| v.waste).sum();
                    debug_assert!(
                        (held + waste - self.voters.len() as f64).abs() <= ALLOCATION_TOLERANCE,
                        "{}",
                        InvariantViolation(format!(
                            "conservation violated at termination: candidate-held {held} + voter-waste {waste} != {} voters",
                            self.voters.len()
                        ))
                    );

                    return Ok(events);
                } else if self.reactivation_mode {
                    decision.reactivated = self.reactivate(None);
                }
                self.is_subround = false;
            } else {
                let bottom = *self.active.last().expect("active list is never empty before terminal");
                self.process_candidate(
                    bottom,
                    CandidateList::Active,
                    CandidateList::Deactivated,
                    EdgeStatus::Deactivated,
                    true,
                );
                decision.loser = Some(bottom);
            }

            let missing_seats =
                self.total_seats as isize - self.winners.len() as isize - self.active.len() as isize;
            if missing_seats > 0 {
                let reactivated = self.reactivate(Some(missing_seats as usize));
                if reactivated.len() != missing_seats as usize {
                    return Err(CountError::ReactivationFailed {
                        round: self.rounds,
                        subround: self.subrounds,
                        needed: missing_seats as usize,
                        available: reactivated.len(),
                    });
                }
                decision.reactivated = reactivated;
            }

            decision.yield_level = if self.is_subround {
                YieldLevel::Subround
            } else {
                YieldLevel::Round
            };
            on_event(self, &decision);
            events.push(decision);
        }
    }
}

/// Keep only events a consumer subscribed at `view_level` would see.
pub fn filter_for_view_level(events: &[Status], view_level: YieldLevel) -> Vec<&Status> {
    events.iter().filter(|e| e.yield_level <= view_level).collect()
}
