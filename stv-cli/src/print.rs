// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Pretty-printing of rounds to stdout, grounded in
//! `preference_distribution::PreferenceDistributor::print_candidates_names`/`print_tallys`
//! (one tab-separated header line, then one tab-separated tally line per round) and
//! `stv_progress.py`'s `test_using_shell` (per-round message plus send/return fraction lines).

use stv::ballot_graph::Stv;
use stv::engine::{Status, YieldLevel};
use stv::error::CountError;
use stv::index::CandidateIndex;

/// One header line naming every candidate, matching `print_candidates_names`'s
/// tab-separated-names-plus-"Exhausted" convention (here "Waste", since this variant has no
/// exhaustion in the classical-STV sense, only waste).
pub fn print_candidate_names(stv: &Stv) {
    let names: Vec<String> = (0..stv.num_candidates())
        .map(|i| stv.candidate(CandidateIndex(i)).name.clone())
        .collect();
    println!("{}\tWaste", names.join("\t"));
}

/// A tally line's worth of state, captured live at the moment one [`Status`] event fired —
/// unlike reading straight off an `Stv` after `start()` has returned, which only ever sees
/// the count's final state for every event.
pub struct RoundSnapshot {
    pub yield_level: YieldLevel,
    pub tallys: Vec<f64>,
    pub waste: f64,
    pub label: String,
}

/// Drive `stv` to completion, recording a [`RoundSnapshot`] for every event at the moment it
/// is produced, the same way [`stv::progress::StvProgress::new`] records [`stv::progress::Position`]s.
pub fn capture_rounds(stv: &mut Stv) -> Result<Vec<RoundSnapshot>, CountError> {
    let mut snapshots = Vec::new();
    stv.run(|live, status| {
        let tallys = (0..live.num_candidates())
            .map(|i| live.candidate_votes(CandidateIndex(i)))
            .collect();
        let label = match (status.winner, status.loser) {
            (Some(w), _) => format!("Win:{}", live.candidate(w).name),
            (_, Some(l)) => format!("Loss:{}", live.candidate(l).name),
            _ => format!("{:?}", status.yield_level),
        };
        snapshots.push(RoundSnapshot {
            yield_level: status.yield_level,
            tallys,
            waste: live.total_waste(),
            label,
        });
    })?;
    Ok(snapshots)
}

/// One tally line per snapshot at or below `view_level`, matching `print_tallys`'s
/// tab-separated-votes-plus-exhausted-total convention.
pub fn print_rounds(snapshots: &[RoundSnapshot], view_level: YieldLevel) {
    for snapshot in snapshots {
        if snapshot.yield_level > view_level {
            continue;
        }
        let tallys: Vec<String> = snapshot.tallys.iter().map(|v| format!("{v:.2}")).collect();
        println!("{}\t{:.2}\t{}", tallys.join("\t"), snapshot.waste, snapshot.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stv::error::DiscardWarnings;

    fn two_candidate_election() -> Stv {
        let mut stv = Stv::new(false, false);
        stv.add_group("g", 1).unwrap();
        stv.add_candidate("a", "Alice", "g").unwrap();
        stv.add_candidate("b", "Bob", "g").unwrap();
        stv.add_voter("v1", &["a".to_string()], &mut DiscardWarnings).unwrap();
        stv.add_voter("v2", &["a".to_string()], &mut DiscardWarnings).unwrap();
        stv
    }

    #[test]
    fn snapshots_reflect_historical_state_not_final_state() {
        let mut stv = two_candidate_election();
        let snapshots = capture_rounds(&mut stv).unwrap();

        // The BEGIN event fires before any allocation has happened, so every candidate's
        // live tally must still be zero at that point. A buggy implementation that reads
        // the already-final `stv` for every event would show Alice's *final* (winning)
        // tally here instead.
        let begin = &snapshots[0];
        assert_eq!(begin.yield_level, YieldLevel::Begin);
        assert_eq!(begin.tallys[0], 0.0);

        // The final event must show her actual winning tally, strictly different from the
        // BEGIN snapshot above.
        let last = snapshots.last().unwrap();
        assert!(last.tallys[0] > 0.0);
    }
}
