// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The bipartite ballot graph: groups, candidates, voters and the edges between them, plus
//! the setup methods that build it and the small set of derived quantities the engine needs.
//!
//! Groups, candidates, voters and edges are arenas (`Vec`s) owned by [`Stv`]; every other
//! structure addresses them by the stable indices in [`crate::index`]. Nothing is ever
//! removed once added, so an index stays valid for the life of the instance.

use crate::edge::{EdgeStatus, VoteLink};
use crate::error::{SetupError, SetupWarning, WarningSink};
use crate::index::{CandidateIndex, EdgeIndex, GroupIndex, VoterIndex};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

/// A political/affiliation group with a target seat count.
pub struct Group {
    pub name: String,
    pub seats: u32,
    pub seats_won: u32,
}

impl Group {
    pub fn is_full(&self) -> bool {
        self.seats_won >= self.seats
    }
}

/// A candidate. `votes` is a lazily recomputed cache, refreshed on read by
/// [`Stv::candidate_votes`]; `needs_refresh` is not observable state, just a task marker for
/// that cache, which is why both live behind a [`Cell`] rather than requiring `&mut self` to
/// read.
pub struct Candidate {
    pub code: String,
    pub name: String,
    pub group: GroupIndex,
    pub edges: Vec<EdgeIndex>,
    votes_cache: Cell<f64>,
    needs_refresh: Cell<bool>,
    /// The weight this candidate is entitled to retain once it wins. Zero until win time.
    pub wonatquota: f64,
    pub(crate) needs_reduction: bool,
}

impl Candidate {
    pub(crate) fn mark_votes_dirty(&self) {
        self.needs_refresh.set(true);
    }
}

/// A voter, holding its incident edges in ballot preference order (first = most preferred).
pub struct Voter {
    pub id: String,
    pub edges: Vec<EdgeIndex>,
    pub waste: f64,
    pub(crate) needs_allocation: bool,
}

/// The counting core: ballot graph plus round/loop counters and the four candidate lists.
/// No file I/O, no CLI, no JSON — those live in the `stv-cli` crate.
pub struct Stv {
    pub use_groups: bool,
    pub reactivation_mode: bool,

    pub(crate) groups: Vec<Group>,
    pub(crate) candidates: Vec<Candidate>,
    pub(crate) voters: Vec<Voter>,
    pub(crate) edges: Vec<VoteLink>,

    group_codes: HashMap<String, GroupIndex>,
    candidate_codes: HashMap<String, CandidateIndex>,
    voter_ids: HashMap<String, VoterIndex>,

    pub total_seats: u32,
    pub rounds: usize,
    pub(crate) is_subround: bool,
    pub subrounds: usize,
    pub loopcount: usize,
    pub allocationcount: usize,
    pub reductioncount: usize,

    pub winners: Vec<CandidateIndex>,
    pub active: Vec<CandidateIndex>,
    pub deactivated: Vec<CandidateIndex>,
    pub excluded: Vec<CandidateIndex>,
}

impl Stv {
    pub fn new(use_groups: bool, reactivation_mode: bool) -> Self {
        Stv {
            use_groups,
            reactivation_mode,
            groups: Vec::new(),
            candidates: Vec::new(),
            voters: Vec::new(),
            edges: Vec::new(),
            group_codes: HashMap::new(),
            candidate_codes: HashMap::new(),
            voter_ids: HashMap::new(),
            total_seats: 0,
            rounds: 0,
            is_subround: false,
            subrounds: 0,
            loopcount: 0,
            allocationcount: 0,
            reductioncount: 0,
            winners: Vec::new(),
            active: Vec::new(),
            deactivated: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn add_group(&mut self, name: &str, seats: u32) -> Result<GroupIndex, SetupError> {
        if self.group_codes.contains_key(name) {
            return Err(SetupError::DuplicateGroup(name.to_string()));
        }
        let index = GroupIndex(self.groups.len());
        self.groups.push(Group {
            name: name.to_string(),
            seats,
            seats_won: 0,
        });
        self.group_codes.insert(name.to_string(), index);
        self.total_seats += seats;
        Ok(index)
    }

    pub fn add_candidate(
        &mut self,
        code: &str,
        name: &str,
        group_name: &str,
    ) -> Result<CandidateIndex, SetupError> {
        if self.candidate_codes.contains_key(code) {
            return Err(SetupError::DuplicateCandidate(code.to_string()));
        }
        let group = *self
            .group_codes
            .get(group_name)
            .ok_or_else(|| SetupError::UnknownGroup {
                candidate: code.to_string(),
                group: group_name.to_string(),
            })?;
        let index = CandidateIndex(self.candidates.len());
        self.candidates.push(Candidate {
            code: code.to_string(),
            name: name.to_string(),
            group,
            edges: Vec::new(),
            votes_cache: Cell::new(0.0),
            needs_refresh: Cell::new(false),
            wonatquota: 0.0,
            needs_reduction: false,
        });
        self.candidate_codes.insert(code.to_string(), index);
        self.active.push(index); // every candidate starts active
        Ok(index)
    }

    /// Add a voter and its ballot. Unknown candidate codes and repeated codes are reported to
    /// `sink` and skipped rather than rejected; a voter with zero valid preferences is
    /// accepted, and its whole weight becomes waste once counting starts.
    pub fn add_voter(
        &mut self,
        id: &str,
        candidate_codes: &[String],
        sink: &mut impl WarningSink,
    ) -> Result<VoterIndex, SetupError> {
        if id.is_empty() {
            return Err(SetupError::EmptyVoterId);
        }
        if self.voter_ids.contains_key(id) {
            return Err(SetupError::DuplicateVoter(id.to_string()));
        }
        let voter_index = VoterIndex(self.voters.len());
        self.voters.push(Voter {
            id: id.to_string(),
            edges: Vec::new(),
            waste: 0.0,
            needs_allocation: true,
        });
        self.voter_ids.insert(id.to_string(), voter_index);

        let mut seen = HashSet::new();
        for code in candidate_codes {
            if !seen.insert(code.clone()) {
                sink.warn(SetupWarning::DuplicateCandidateCode {
                    voter: id.to_string(),
                    code: code.clone(),
                });
                continue;
            }
            let Some(&candidate_index) = self.candidate_codes.get(code) else {
                sink.warn(SetupWarning::UnknownCandidateCode {
                    voter: id.to_string(),
                    code: code.clone(),
                });
                continue;
            };
            let edge_index = EdgeIndex(self.edges.len());
            self.edges.push(VoteLink::new(voter_index, candidate_index));
            self.voters[voter_index.0].edges.push(edge_index);
            self.candidates[candidate_index.0].edges.push(edge_index);
        }
        Ok(voter_index)
    }

    pub fn group(&self, index: GroupIndex) -> &Group {
        &self.groups[index.0]
    }

    pub fn candidate(&self, index: CandidateIndex) -> &Candidate {
        &self.candidates[index.0]
    }

    pub fn voter(&self, index: VoterIndex) -> &Voter {
        &self.voters[index.0]
    }

    pub fn edge(&self, index: EdgeIndex) -> &VoteLink {
        &self.edges[index.0]
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn voters(&self) -> impl Iterator<Item = &Voter> {
        self.voters.iter()
    }

    pub fn num_voters(&self) -> usize {
        self.voters.len()
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// The candidate's current total vote weight, refreshing the cache if it was marked
    /// dirty since the last read. Read-only: callable at any time, including mid-count.
    pub fn candidate_votes(&self, index: CandidateIndex) -> f64 {
        let candidate = &self.candidates[index.0];
        if candidate.needs_refresh.get() {
            let mut total = 0.0;
            for &edge_index in &candidate.edges {
                total += self.edges[edge_index.0].weight;
            }
            candidate.votes_cache.set(total);
            candidate.needs_refresh.set(false);
        }
        candidate.votes_cache.get()
    }

    /// The classic Hare quota: total voters divided by total seats.
    pub fn quota(&self) -> f64 {
        self.voters.len() as f64 / self.total_seats as f64
    }

    /// Voters minus the vote total currently held by winners and active candidates: weight
    /// that has nowhere live to go.
    pub fn total_waste(&self) -> f64 {
        let held: f64 = self
            .winners
            .iter()
            .chain(self.active.iter())
            .map(|&c| self.candidate_votes(c))
            .sum();
        self.voters.len() as f64 - held
    }

    /// Stable descending sort of `active` by current vote total, ties broken by the earliest
    /// insertion (the candidate added first stays first among equals), matching Python's
    /// stable `list.sort`.
    pub(crate) fn sort_active(&mut self) {
        self.active
            .sort_by(|&a, &b| self.candidate_votes(b).partial_cmp(&self.candidate_votes(a)).unwrap());
    }

    /// Set an edge's status, enforcing the legal-transition table in debug builds.
    pub(crate) fn set_edge_status(&mut self, edge: EdgeIndex, status: EdgeStatus) {
        self.edges[edge.0].set_status(status);
    }
}
