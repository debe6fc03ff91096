// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The progress recorder: an immutable chain of [`Position`] snapshots joined by [`Transform`]
//! deltas, for visualisation/animation front-ends that want to replay a count step by step.

use crate::ballot_graph::Stv;
use crate::edge::EdgeStatus;
use crate::engine::{Status, YieldLevel};
use crate::error::CountError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A candidate's code and vote total at the moment of a snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub code: String,
    pub votes: f64,
}

/// What kind of step a [`Position`] represents, for front-ends that want to style a win
/// differently from a routine reduction pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    Unknown,
    Reduction,
    Allocation,
    Loss,
    Win,
}

/// One voter-candidate edge's weight and status at the moment of a snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoteFraction {
    pub voter_id: String,
    pub fraction: f64,
    pub candidate_code: String,
    pub status: EdgeStatus,
}

/// An immutable snapshot of the whole graph at one yield point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub round: usize,
    pub subround: usize,
    pub loopcount: usize,
    pub loop_kind: LoopKind,
    pub message: String,
    pub excluded_group: Option<String>,
    pub winners: Vec<CandidateSnapshot>,
    pub active: Vec<CandidateSnapshot>,
    pub deactivated: Vec<CandidateSnapshot>,
    pub excluded: Vec<CandidateSnapshot>,
    /// Keyed by (voter id, candidate code); a `BTreeMap` rather than a `HashMap` so that
    /// [`Transform::between`]'s iteration order, and therefore the order of `sendvfs`/
    /// `returnvfs`, is reproducible across runs.
    pub vote_fractions: BTreeMap<(String, String), VoteFraction>,
    pub waste: BTreeMap<String, f64>,
    pub has_decision: bool,
}

impl Position {
    fn new(stv: &Stv, status: &Status) -> Position {
        let snapshot_list = |list: &[crate::index::CandidateIndex]| -> Vec<CandidateSnapshot> {
            list.iter()
                .map(|&c| CandidateSnapshot {
                    code: stv.candidate(c).code.clone(),
                    votes: stv.candidate_votes(c),
                })
                .collect()
        };

        let mut vote_fractions = BTreeMap::new();
        let mut waste = BTreeMap::new();
        for voter in stv.voters() {
            waste.insert(voter.id.clone(), voter.waste);
            for &edge_index in &voter.edges {
                let edge = stv.edge(edge_index);
                let candidate_code = stv.candidate(edge.candidate).code.clone();
                vote_fractions.insert(
                    (voter.id.clone(), candidate_code.clone()),
                    VoteFraction {
                        voter_id: voter.id.clone(),
                        fraction: edge.weight,
                        candidate_code,
                        status: edge.status,
                    },
                );
            }
        }

        let loop_kind = if status.winner.is_some() {
            LoopKind::Win
        } else if status.loser.is_some() {
            LoopKind::Loss
        } else if stv.allocationcount > 0 {
            LoopKind::Allocation
        } else if stv.reductioncount > 0 {
            LoopKind::Reduction
        } else {
            LoopKind::Unknown
        };

        let message = if let Some(winner) = status.winner {
            format!("Win:{}", stv.candidate(winner).name)
        } else if let Some(loser) = status.loser {
            format!("Loss:{}", stv.candidate(loser).name)
        } else if loop_kind == LoopKind::Allocation {
            format!("Allocations: {}", stv.allocationcount)
        } else if loop_kind == LoopKind::Reduction {
            format!("Reductions: {}", stv.reductioncount)
        } else {
            "Beginning".to_string()
        };

        let excluded_group = status
            .excluded_by_group
            .first()
            .map(|&c| stv.group(stv.candidate(c).group).name.clone());

        Position {
            round: stv.rounds,
            subround: stv.subrounds,
            loopcount: stv.loopcount,
            loop_kind,
            message,
            excluded_group,
            winners: snapshot_list(&stv.winners),
            active: snapshot_list(&stv.active),
            deactivated: snapshot_list(&stv.deactivated),
            excluded: snapshot_list(&stv.excluded),
            vote_fractions,
            waste,
            has_decision: status.has_decision(),
        }
    }
}

/// The directed flow of weight between two consecutive positions: edges whose weight grew
/// (`sendvfs`) and edges whose weight shrank (`returnvfs`), each carrying the magnitude of the
/// change rather than the signed delta.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transform {
    pub sendvfs: Vec<VoteFraction>,
    pub returnvfs: Vec<VoteFraction>,
}

impl Transform {
    fn between(previous: &Position, next: &Position) -> Transform {
        let mut transform = Transform::default();
        for (key, next_vf) in &next.vote_fractions {
            let Some(previous_vf) = previous.vote_fractions.get(key) else {
                continue;
            };
            let diff = next_vf.fraction - previous_vf.fraction;
            if diff == 0.0 {
                continue;
            }
            let vf = VoteFraction {
                voter_id: next_vf.voter_id.clone(),
                fraction: diff.abs(),
                candidate_code: next_vf.candidate_code.clone(),
                status: next_vf.status,
            };
            if diff > 0.0 {
                transform.sendvfs.push(vf);
            } else {
                transform.returnvfs.push(vf);
            }
        }
        transform
    }
}

/// Drives a fresh `Stv` instance to completion and records the full position/transform chain.
pub struct StvProgress {
    positions: Vec<Position>,
    transforms: Vec<Transform>,
}

impl StvProgress {
    /// Run `stv` to completion, building a `Position` for every event except the `INITIAL`
    /// pretty-printing hint (which carries no new information over the preceding `BEGIN` or
    /// `LOOP` position), and a `Transform` between every consecutive pair.
    pub fn new(stv: &mut Stv) -> Result<StvProgress, CountError> {
        let mut positions: Vec<Position> = Vec::new();
        stv.run(|live, status| {
            if status.yield_level == YieldLevel::Initial {
                return;
            }
            positions.push(Position::new(live, status));
        })?;

        let transforms = positions
            .windows(2)
            .map(|pair| Transform::between(&pair[0], &pair[1]))
            .collect();

        Ok(StvProgress {
            positions,
            transforms,
        })
    }

    pub fn start_position(&self) -> &Position {
        &self.positions[0]
    }

    /// Walk the chain from the start position: `(None, start)` first, then `(Some(transform),
    /// position)` for every subsequent snapshot.
    pub fn iter_transform_and_position(&self) -> impl Iterator<Item = (Option<&Transform>, &Position)> {
        std::iter::once((None, &self.positions[0])).chain(
            self.transforms
                .iter()
                .zip(self.positions.iter().skip(1))
                .map(|(t, p)| (Some(t), p)),
        )
    }
}
