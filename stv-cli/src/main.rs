// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stv_cli::csv_input::{read_candidates, read_groups, read_votes};
use stv_cli::print::{capture_rounds, print_candidate_names, print_rounds};
use stv::ballot_graph::Stv;
use stv::engine::YieldLevel;
use stv::error::CollectWarnings;

/// Count a Single Transferable Vote election from a directory of CSV files.
#[derive(Parser)]
#[command(version, author = "Andrew Conway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read Groups.csv/Candidates.csv/Votes.csv from a directory and print every round.
    Count {
        /// Directory containing Groups.csv, Candidates.csv and Votes.csv.
        input: PathBuf,
        /// Enforce per-group seat quotas.
        #[arg(long)]
        groups: bool,
        /// Reactivate deactivated candidates whenever a win leaves surplus flow.
        #[arg(long)]
        reactivation: bool,
        /// How fine-grained a view of the count to print: begin, end, round, subround or loop.
        #[arg(long, value_enum, default_value = "round")]
        view_level: ViewLevel,
    },
    /// Read the same CSVs, drive the progress recorder, and emit its transform chain as JSON.
    Progress {
        input: PathBuf,
        #[arg(long)]
        groups: bool,
        #[arg(long)]
        reactivation: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ViewLevel {
    Begin,
    End,
    Round,
    Subround,
    Loop,
}

impl From<ViewLevel> for YieldLevel {
    fn from(level: ViewLevel) -> YieldLevel {
        match level {
            ViewLevel::Begin => YieldLevel::Begin,
            ViewLevel::End => YieldLevel::End,
            ViewLevel::Round => YieldLevel::Round,
            ViewLevel::Subround => YieldLevel::Subround,
            ViewLevel::Loop => YieldLevel::Loop,
        }
    }
}

fn load_stv(input: &PathBuf, use_groups: bool, reactivation: bool) -> Result<Stv> {
    let mut stv = Stv::new(use_groups, reactivation);
    read_groups(&mut stv, &input.join("Groups.csv"))?;
    read_candidates(&mut stv, &input.join("Candidates.csv"))?;
    let mut warnings = CollectWarnings::default();
    read_votes(&mut stv, &input.join("Votes.csv"), &mut warnings)?;
    for warning in warnings.0 {
        log::warn!("{warning}");
    }
    Ok(stv)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Count { input, groups, reactivation, view_level } => {
            let mut stv = load_stv(&input, groups, reactivation)?;
            log::info!("loaded {} voters, {} candidates", stv.num_voters(), stv.num_candidates());
            print_candidate_names(&stv);
            let snapshots = capture_rounds(&mut stv)?;
            print_rounds(&snapshots, view_level.into());
        }
        Command::Progress { input, groups, reactivation } => {
            let mut stv = load_stv(&input, groups, reactivation)?;
            let progress = stv::progress::StvProgress::new(&mut stv)?;
            let transforms: Vec<_> = progress
                .iter_transform_and_position()
                .map(|(transform, position)| (transform.cloned(), position.clone()))
                .collect();
            serde_json::to_writer_pretty(std::io::stdout(), &transforms)?;
        }
    }
    Ok(())
}
