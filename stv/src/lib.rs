// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! A Single Transferable Vote counting core: a bipartite ballot graph of voters and
//! candidates, the allocation/reduction operators that redistribute weight between them, and
//! the round engine that drives the whole count to a fixed number of winners.
//!
//! This crate has no file I/O and no CLI; see the `stv-cli` crate for CSV ingestion, the
//! command line, and a JSON front-end function.

pub mod allocation;
pub mod ballot_graph;
pub mod edge;
pub mod engine;
pub mod error;
pub mod index;
pub mod progress;
pub mod reduction;

/// Weight below this is treated as zero. Floating-point drift would otherwise cause the
/// allocation operator to keep re-sending negligible remainders back and forth forever.
pub const ALLOCATION_TOLERANCE: f64 = 5e-3;
