// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! A JSON front-end function mirroring the cloud-function contract: one call, taking the
//! whole election as a JSON value and returning every position the count passed through,
//! each annotated with per-candidate status and the running quota. Grounded directly on
//! `stv_lebanon/lambda_function.py`'s `lambda_handler`/`pos_to_json`, translated from a
//! dict-of-dicts response into a typed `serde`-serializable struct.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stv::error::CollectWarnings;
use stv::progress::StvProgress;
use stv::ballot_graph::Stv;

/// The maximum number of votes a single call will count. `lambda_function.py` enforces the
/// same limit (`VOTES_LIMIT`) to keep a single cloud-function invocation inside its time
/// budget.
pub const VOTES_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct JsonGroup {
    pub name: String,
    pub seats: u32,
}

#[derive(Deserialize)]
pub struct JsonCandidate {
    pub code: String,
    pub name: String,
    pub group: String,
}

#[derive(Deserialize)]
pub struct JsonVote {
    pub voterid: String,
    pub ballot: Vec<String>,
}

/// The request body, mirroring `event` in `lambda_handler`.
#[derive(Deserialize)]
pub struct ElectionRequest {
    pub usegroups: bool,
    pub reactivation: bool,
    pub groups: Vec<JsonGroup>,
    pub candidates: Vec<JsonCandidate>,
    pub votes: Vec<JsonVote>,
    /// The voter whose ballot trace should be reported in every loop's `viewballot`, if any.
    /// Mirrors `event.get('viewvoter')`: absent from the request body is the same as `null`.
    #[serde(default)]
    pub viewvoter: Option<String>,
}

#[derive(Serialize)]
pub struct CandidateStatus {
    pub votes: f64,
    pub status: &'static str,
    pub quota: f64,
}

/// One entry of `viewvoter`'s ballot trace, mirroring the `{ccode, fraction, status}` dict
/// `pos_to_json` builds from `pos.votefractions` filtered by `vf.voterid == viewvoter`.
#[derive(Serialize)]
pub struct BallotLine {
    pub ccode: String,
    pub fraction: f64,
    pub status: i8,
}

/// One loop's worth of the progress chain, in `pos_to_json`'s shape.
#[derive(Serialize)]
pub struct LoopJson {
    pub round: usize,
    pub subround: usize,
    pub loopcount: usize,
    pub looptype: String,
    pub message: String,
    pub candidates: HashMap<String, CandidateStatus>,
    pub waste: f64,
    /// `None` unless the request named a `viewvoter` that actually exists among the voters.
    pub viewballot: Option<Vec<BallotLine>>,
}

#[derive(Serialize)]
pub struct ElectionResponse {
    pub quota: f64,
    pub loops: Vec<LoopJson>,
    pub viewvoter: Option<String>,
}

fn loop_kind_name(kind: stv::progress::LoopKind) -> &'static str {
    use stv::progress::LoopKind::*;
    match kind {
        Unknown => "unknown",
        Reduction => "reduction",
        Allocation => "allocation",
        Loss => "loss",
        Win => "win",
    }
}

/// Build the whole candidate-limited, group-aware count from `request` and return every
/// position it passed through, each with a per-candidate status/votes/quota snapshot.
pub fn run_from_json(request: ElectionRequest) -> Result<ElectionResponse> {
    if request.votes.len() > VOTES_LIMIT {
        return Err(anyhow!("Function limited to {VOTES_LIMIT} votes"));
    }

    let mut stv = Stv::new(request.usegroups, request.reactivation);
    for group in &request.groups {
        stv.add_group(&group.name, group.seats)?;
    }
    for candidate in &request.candidates {
        stv.add_candidate(&candidate.code, &candidate.name, &candidate.group)?;
    }
    let mut warnings = CollectWarnings::default();
    for vote in &request.votes {
        stv.add_voter(&vote.voterid, &vote.ballot, &mut warnings)?;
    }

    // Mirrors `if viewvoter not in stv.voters: viewvoter = None` — a viewvoter naming a
    // nonexistent voter is silently treated as not having asked for a ballot trace at all.
    let viewvoter = request
        .viewvoter
        .filter(|id| stv.voters().any(|voter| &voter.id == id));

    let initquota = stv.quota();
    let progress = StvProgress::new(&mut stv)?;

    let winners_quota: HashMap<String, f64> = stv
        .winners
        .iter()
        .map(|&c| (stv.candidate(c).code.clone(), stv.candidate(c).wonatquota))
        .collect();

    let mut loops = Vec::new();
    for (_, position) in progress.iter_transform_and_position() {
        let mut candidates = HashMap::new();
        for (list, status) in [
            (&position.winners, "winner"),
            (&position.active, "active"),
            (&position.deactivated, "deactivated"),
            (&position.excluded, "excluded"),
        ] {
            for snapshot in list {
                let quota = if status == "winner" {
                    *winners_quota.get(&snapshot.code).unwrap_or(&initquota)
                } else {
                    initquota
                };
                candidates.insert(
                    snapshot.code.clone(),
                    CandidateStatus {
                        votes: snapshot.votes,
                        status,
                        quota,
                    },
                );
            }
        }

        let viewballot = viewvoter.as_ref().map(|voter_id| {
            position
                .vote_fractions
                .values()
                .filter(|vf| &vf.voter_id == voter_id)
                .map(|vf| BallotLine {
                    ccode: vf.candidate_code.clone(),
                    fraction: vf.fraction,
                    status: vf.status.code(),
                })
                .collect()
        });

        loops.push(LoopJson {
            round: position.round,
            subround: position.subround,
            loopcount: position.loopcount,
            looptype: loop_kind_name(position.loop_kind).to_string(),
            message: position.message.clone(),
            candidates,
            waste: position.waste.values().sum(),
            viewballot,
        });
    }

    Ok(ElectionResponse {
        quota: initquota,
        loops,
        viewvoter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_seat_two_candidate_contract() {
        let request = ElectionRequest {
            usegroups: false,
            reactivation: false,
            groups: vec![JsonGroup { name: "g".to_string(), seats: 1 }],
            candidates: vec![
                JsonCandidate { code: "a".to_string(), name: "Alice".to_string(), group: "g".to_string() },
                JsonCandidate { code: "b".to_string(), name: "Bob".to_string(), group: "g".to_string() },
            ],
            votes: vec![
                JsonVote { voterid: "v1".to_string(), ballot: vec!["a".to_string(), "b".to_string()] },
                JsonVote { voterid: "v2".to_string(), ballot: vec!["a".to_string()] },
            ],
            viewvoter: None,
        };
        let response = run_from_json(request).unwrap();
        assert!((response.quota - 2.0).abs() < 1e-9);
        assert!(!response.loops.is_empty());
        let last = response.loops.last().unwrap();
        assert_eq!(last.candidates["a"].status, "winner");
        assert!(last.viewballot.is_none());
    }

    #[test]
    fn rejects_too_many_votes() {
        let votes = (0..60)
            .map(|i| JsonVote { voterid: i.to_string(), ballot: vec!["a".to_string()] })
            .collect();
        let request = ElectionRequest {
            usegroups: false,
            reactivation: false,
            groups: vec![JsonGroup { name: "g".to_string(), seats: 1 }],
            candidates: vec![JsonCandidate { code: "a".to_string(), name: "Alice".to_string(), group: "g".to_string() }],
            votes,
            viewvoter: None,
        };
        assert!(run_from_json(request).is_err());
    }

    #[test]
    fn viewvoter_reports_ballot_trace_and_unknown_viewvoter_is_ignored() {
        let request = ElectionRequest {
            usegroups: false,
            reactivation: false,
            groups: vec![JsonGroup { name: "g".to_string(), seats: 1 }],
            candidates: vec![
                JsonCandidate { code: "a".to_string(), name: "Alice".to_string(), group: "g".to_string() },
                JsonCandidate { code: "b".to_string(), name: "Bob".to_string(), group: "g".to_string() },
            ],
            votes: vec![
                JsonVote { voterid: "v1".to_string(), ballot: vec!["a".to_string(), "b".to_string()] },
                JsonVote { voterid: "v2".to_string(), ballot: vec!["a".to_string()] },
            ],
            viewvoter: Some("v1".to_string()),
        };
        let response = run_from_json(request).unwrap();
        assert_eq!(response.viewvoter.as_deref(), Some("v1"));
        let last = response.loops.last().unwrap();
        let trace = last.viewballot.as_ref().expect("v1 exists, should get a ballot trace");
        assert!(trace.iter().any(|line| line.ccode == "a"));

        let request_unknown = ElectionRequest {
            usegroups: false,
            reactivation: false,
            groups: vec![JsonGroup { name: "g".to_string(), seats: 1 }],
            candidates: vec![JsonCandidate { code: "a".to_string(), name: "Alice".to_string(), group: "g".to_string() }],
            votes: vec![JsonVote { voterid: "v1".to_string(), ballot: vec!["a".to_string()] }],
            viewvoter: Some("nobody".to_string()),
        };
        let response_unknown = run_from_json(request_unknown).unwrap();
        assert!(response_unknown.viewvoter.is_none());
        assert!(response_unknown.loops.last().unwrap().viewballot.is_none());
    }
}
