// Copyright 2021-2022 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The JSON front-end function's request/response contract, round-tripped through
//! `serde_json` the way a real cloud-function invocation would see it.

use serde_json::json;
use stv_cli::json_api::{run_from_json, ElectionRequest};

#[test]
fn request_parses_from_raw_json_and_response_serializes() -> Result<(), Box<dyn std::error::Error>> {
    let raw = json!({
        "usegroups": false,
        "reactivation": false,
        "groups": [{"name": "g", "seats": 1}],
        "candidates": [
            {"code": "a", "name": "Alice", "group": "g"},
            {"code": "b", "name": "Bob", "group": "g"}
        ],
        "votes": [
            {"voterid": "v1", "ballot": ["a", "b"]},
            {"voterid": "v2", "ballot": ["a"]},
            {"voterid": "v3", "ballot": ["b"]}
        ]
    });

    let request: ElectionRequest = serde_json::from_value(raw)?;
    let response = run_from_json(request)?;

    let serialized = serde_json::to_value(&response)?;
    assert!(serialized["quota"].is_number());
    assert!(serialized["loops"].as_array().unwrap().len() > 0);
    Ok(())
}
