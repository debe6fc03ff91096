// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Loading a small election from a directory of CSV files and counting it end to end.

use std::fs;
use stv::error::DiscardWarnings;
use stv_cli::csv_input::{read_candidates, read_groups, read_votes};

#[test]
fn loads_and_counts_a_three_candidate_one_seat_election() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("Groups.csv"), "g,1\n")?;
    fs::write(dir.path().join("Candidates.csv"), "a,Alice,g\nb,Bob,g\nc,Carol,g\n")?;
    fs::write(dir.path().join("Votes.csv"), "v1,a,b\nv2,a,b\nv3,b,a\nv4,c\n")?;

    let mut stv = stv::ballot_graph::Stv::new(false, false);
    read_groups(&mut stv, &dir.path().join("Groups.csv"))?;
    read_candidates(&mut stv, &dir.path().join("Candidates.csv"))?;
    read_votes(&mut stv, &dir.path().join("Votes.csv"), &mut DiscardWarnings)?;

    assert_eq!(stv.num_candidates(), 3);
    assert_eq!(stv.num_voters(), 4);

    let events = stv.start()?;
    assert_eq!(stv.winners.len(), 1);
    assert!(!events.is_empty());
    Ok(())
}
