// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Seed scenarios and universal invariants for the counting core.

use stv::ballot_graph::Stv;
use stv::edge::EdgeStatus;
use stv::engine::YieldLevel;
use stv::error::DiscardWarnings;
use stv::progress::StvProgress;

const EPS: f64 = 5e-3;

/// Every universal invariant from the testable-properties list that can be checked purely
/// from the engine's final public state (T1-T6; T7 is checked structurally by
/// `edge::is_legal_transition`'s own unit tests, since by the time a count finishes there is
/// no record of the transition history left to replay).
fn assert_invariants(stv: &Stv) {
    // T1: every voter's weight + waste sums to 1.
    for voter in stv.voters() {
        let total_weight: f64 = voter
            .edges
            .iter()
            .map(|&e| stv.edge(e).weight)
            .sum();
        assert!(
            (total_weight + voter.waste - 1.0).abs() <= EPS,
            "voter {} weight {total_weight} + waste {} != 1",
            voter.id,
            voter.waste
        );
    }

    // T2: every winner's committed (PARTIAL/FULL) weight equals its wonatquota.
    for &winner in &stv.winners {
        let candidate = stv.candidate(winner);
        let committed: f64 = candidate
            .edges
            .iter()
            .map(|&e| stv.edge(e))
            .filter(|edge| matches!(edge.status, EdgeStatus::Partial | EdgeStatus::Full))
            .map(|edge| edge.weight)
            .sum();
        assert!(
            (committed - candidate.wonatquota).abs() <= EPS,
            "winner {} committed {committed} != wonatquota {}",
            candidate.code,
            candidate.wonatquota
        );
    }

    // T3: conservation of weight across the whole electorate.
    let won_and_active: f64 = stv
        .winners
        .iter()
        .chain(stv.active.iter())
        .map(|&c| stv.candidate_votes(c))
        .sum();
    assert!(
        (won_and_active + stv.total_waste() - stv.num_voters() as f64).abs() <= EPS,
        "won_and_active {won_and_active} + waste {} != voters {}",
        stv.total_waste(),
        stv.num_voters()
    );

    // T4: every candidate is in exactly one of the four lists.
    let total_listed = stv.winners.len() + stv.active.len() + stv.deactivated.len() + stv.excluded.len();
    assert_eq!(total_listed, stv.num_candidates());

    // T5: group seat quotas are respected.
    if stv.use_groups {
        for group in stv.groups() {
            assert!(group.seats_won <= group.seats, "group {} over quota", group.name);
        }
    }
}

fn add_simple_voter(stv: &mut Stv, id: &str, prefs: &[&str]) {
    let codes: Vec<String> = prefs.iter().map(|s| s.to_string()).collect();
    stv.add_voter(id, &codes, &mut DiscardWarnings).unwrap();
}

/// S1 — basic transfer: the first winner is unambiguous (a, at votes=3=quota); the scenario's
/// own description hedges on the exact subsequent round-by-round path, so this test checks
/// what the seed scenario pins down precisely (the first win) plus the universal invariants
/// on termination, rather than a brittle hand-traced final winner list.
#[test]
fn s1_basic_transfer_first_winner_and_termination() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(false, false);
    stv.add_group("g", 2)?;
    for code in ["a", "b", "c", "d"] {
        stv.add_candidate(code, code, "g")?;
    }
    add_simple_voter(&mut stv, "v1", &["a", "b"]);
    add_simple_voter(&mut stv, "v2", &["a", "b"]);
    add_simple_voter(&mut stv, "v3", &["a", "c"]);
    add_simple_voter(&mut stv, "v4", &["b", "d"]);
    add_simple_voter(&mut stv, "v5", &["c", "d"]);
    add_simple_voter(&mut stv, "v6", &["d", "c"]);

    assert!((stv.quota() - 3.0).abs() < 1e-9);

    let events = stv.start()?;

    let first_win = events.iter().find(|e| e.winner.is_some()).unwrap();
    assert_eq!(stv.candidate(first_win.winner.unwrap()).code, "a");

    assert_eq!(stv.winners.len(), 2);
    assert_invariants(&stv);
    Ok(())
}

/// S2 — surplus transfer / win without quota. Seats=1, a,b; v1..v4 rank a,b; v5 ranks b. `a`
/// never reaches the quota of 5 but wins once it is the only candidate left standing.
#[test]
fn s2_win_without_quota() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(false, false);
    stv.add_group("g", 1)?;
    stv.add_candidate("a", "a", "g")?;
    stv.add_candidate("b", "b", "g")?;
    for i in 1..=4 {
        add_simple_voter(&mut stv, &format!("v{i}"), &["a", "b"]);
    }
    add_simple_voter(&mut stv, "v5", &["b"]);

    assert!((stv.quota() - 5.0).abs() < 1e-9);

    let events = stv.start()?;
    let decision = events.iter().find(|e| e.winner.is_some()).unwrap();
    let winner = stv.candidate(decision.winner.unwrap());
    assert_eq!(winner.code, "a");
    assert!((winner.wonatquota - 4.0).abs() < 1e-9);
    assert_eq!(stv.winners.len(), 1);
    assert_invariants(&stv);
    Ok(())
}

/// S3 — group exclusion. Groups {g1:1, g2:1}; a,b in g1, c in g2. v1..v4 rank a,b,c; v5 ranks
/// c. `a` wins immediately, fills g1, excludes `b`; the surplus that would have gone to `b`
/// flows to `c`, which then also reaches quota.
#[test]
fn s3_group_exclusion() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(true, false);
    stv.add_group("g1", 1)?;
    stv.add_group("g2", 1)?;
    stv.add_candidate("a", "a", "g1")?;
    stv.add_candidate("b", "b", "g1")?;
    stv.add_candidate("c", "c", "g2")?;
    for i in 1..=4 {
        add_simple_voter(&mut stv, &format!("v{i}"), &["a", "b", "c"]);
    }
    add_simple_voter(&mut stv, "v5", &["c"]);

    let events = stv.start()?;

    assert_eq!(stv.winners.len(), 2);
    let winner_codes: Vec<&str> = stv
        .winners
        .iter()
        .map(|&c| stv.candidate(c).code.as_str())
        .collect();
    assert!(winner_codes.contains(&"a"));
    assert!(winner_codes.contains(&"c"));

    let b_excluded = events
        .iter()
        .any(|e| e.excluded_by_group.iter().any(|&c| stv.candidate(c).code == "b"));
    assert!(b_excluded);

    for &winner in &stv.winners {
        assert!((stv.candidate(winner).wonatquota - 2.5).abs() < 1e-9);
    }
    assert_invariants(&stv);
    Ok(())
}

/// S4 — reactivation. Groups {g:3}; a,b,c,d each with one first-preference voter. Every win
/// is below quota and triggers a reactivation round; by the time the group fills, exactly
/// three of the four candidates have won and the fourth is excluded.
#[test]
fn s4_reactivation_fills_all_seats() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(true, true);
    stv.add_group("g", 3)?;
    for code in ["a", "b", "c", "d"] {
        stv.add_candidate(code, code, "g")?;
    }
    add_simple_voter(&mut stv, "v1", &["a"]);
    add_simple_voter(&mut stv, "v2", &["b"]);
    add_simple_voter(&mut stv, "v3", &["c"]);
    add_simple_voter(&mut stv, "v4", &["d"]);

    let _events = stv.start()?;

    assert_eq!(stv.winners.len(), 3);
    assert_eq!(stv.winners.len() + stv.excluded.len(), 4);
    assert_invariants(&stv);
    Ok(())
}

/// S5 — fixpoint convergence. After `start()` returns (by whatever path), the counters the
/// fixpoint driver uses as its own task queue are back at zero: every phase that ran had its
/// count consumed by a yielded event before the next phase began.
#[test]
fn s5_fixpoint_quiesces() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(false, false);
    stv.add_group("g", 1)?;
    stv.add_candidate("a", "a", "g")?;
    stv.add_candidate("b", "b", "g")?;
    add_simple_voter(&mut stv, "v1", &["a", "b"]);
    add_simple_voter(&mut stv, "v2", &["a", "b"]);

    let events = stv.start()?;
    assert_eq!(stv.allocationcount, 0);
    assert_eq!(stv.reductioncount, 0);
    assert!(events.iter().any(|e| e.yield_level == YieldLevel::End));
    Ok(())
}

/// S6 — progress diff coverage. Re-run S3 through the progress recorder; every transform's
/// total sent weight equals its total returned weight (weight only ever moves between
/// buckets, it is never created or destroyed by a transform).
#[test]
fn s6_progress_transforms_conserve_weight() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(true, false);
    stv.add_group("g1", 1)?;
    stv.add_group("g2", 1)?;
    stv.add_candidate("a", "a", "g1")?;
    stv.add_candidate("b", "b", "g1")?;
    stv.add_candidate("c", "c", "g2")?;
    for i in 1..=4 {
        add_simple_voter(&mut stv, &format!("v{i}"), &["a", "b", "c"]);
    }
    add_simple_voter(&mut stv, "v5", &["c"]);

    let progress = StvProgress::new(&mut stv)?;
    for (transform, _position) in progress.iter_transform_and_position() {
        let Some(transform) = transform else { continue };
        let sent: f64 = transform.sendvfs.iter().map(|vf| vf.fraction).sum();
        let returned: f64 = transform.returnvfs.iter().map(|vf| vf.fraction).sum();
        assert!(
            (sent - returned).abs() < 1e-9,
            "transform sent {sent} != returned {returned}"
        );
    }
    Ok(())
}

/// A voter with no valid preferences contributes its entire weight to waste permanently.
#[test]
fn empty_ballot_is_total_waste() -> Result<(), Box<dyn std::error::Error>> {
    let mut stv = Stv::new(false, false);
    stv.add_group("g", 1)?;
    stv.add_candidate("a", "a", "g")?;
    add_simple_voter(&mut stv, "v1", &[]);
    add_simple_voter(&mut stv, "v2", &["a"]);

    let _events = stv.start()?;
    let v1 = stv.voters().find(|v| v.id == "v1").unwrap();
    assert_eq!(v1.waste, 1.0);
    Ok(())
}
