// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Reads the three CSV files an election is described by: `Groups.csv`, `Candidates.csv` and
//! `Votes.csv`. `Votes.csv` is deliberately ragged (one row per voter, a different number of
//! preference columns per row), so it is read with `flexible(true)` rather than a fixed-width
//! struct, the same way `sa::parse_sa` reads the SA candidate lists.

use anyhow::{Context, Result};
use std::path::Path;
use stv::ballot_graph::Stv;
use stv::error::WarningSink;

/// `Groups.csv`: `groupname,seats`. No header row.
pub fn read_groups(stv: &mut Stv, path: &Path) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for result in reader.records() {
        let record = result.with_context(|| format!("reading a row of {}", path.display()))?;
        let name = record
            .get(0)
            .with_context(|| format!("{}: row missing a group name", path.display()))?;
        let seats: u32 = record
            .get(1)
            .with_context(|| format!("{}: row missing a seat count", path.display()))?
            .trim()
            .parse()
            .with_context(|| format!("{}: seat count for group {name} is not a number", path.display()))?;
        stv.add_group(name.trim(), seats)
            .with_context(|| format!("{}: group {name}", path.display()))?;
    }
    Ok(())
}

/// `Candidates.csv`: `code,name,groupname`. No header row.
pub fn read_candidates(stv: &mut Stv, path: &Path) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for result in reader.records() {
        let record = result.with_context(|| format!("reading a row of {}", path.display()))?;
        let code = record
            .get(0)
            .with_context(|| format!("{}: row missing a candidate code", path.display()))?;
        let name = record
            .get(1)
            .with_context(|| format!("{}: row missing a candidate name", path.display()))?;
        let group = record
            .get(2)
            .with_context(|| format!("{}: row missing a group name", path.display()))?;
        stv.add_candidate(code.trim(), name.trim(), group.trim())
            .with_context(|| format!("{}: candidate {code}", path.display()))?;
    }
    Ok(())
}

/// `Votes.csv`: `voterid,code1,code2,...`, a ragged row per voter in preference order. No
/// header row. Setup warnings (unknown/duplicate candidate codes) are handed to `sink` rather
/// than aborting the whole load.
pub fn read_votes(stv: &mut Stv, path: &Path, sink: &mut impl WarningSink) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    for result in reader.records() {
        let record = result.with_context(|| format!("reading a row of {}", path.display()))?;
        let voter_id = record
            .get(0)
            .with_context(|| format!("{}: row missing a voter id", path.display()))?;
        let preferences: Vec<String> = record.iter().skip(1).map(|s| s.trim().to_string()).collect();
        stv.add_voter(voter_id.trim(), &preferences, sink)
            .with_context(|| format!("{}: voter {voter_id}", path.display()))?;
    }
    Ok(())
}
