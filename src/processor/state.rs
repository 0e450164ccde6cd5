// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The type tag written into every saved state.
pub const STATE_TYPE: &str = "DrumSampler";

/// A saved processor state: a type tag plus parameter values by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTree {
    #[serde(rename = "type")]
    pub state_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

impl StateTree {
    /// Creates an empty state with the processor's type tag.
    pub fn new() -> StateTree {
        StateTree {
            state_type: STATE_TYPE.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    /// Adds a parameter value.
    pub fn with_parameter(mut self, id: &str, value: f32) -> StateTree {
        self.parameters.insert(id.to_string(), value);
        self
    }

    /// Serializes the state to JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StateError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a state, rejecting documents written by something else.
    pub fn from_bytes(bytes: &[u8]) -> Result<StateTree, StateError> {
        let state: StateTree = serde_json::from_slice(bytes)?;
        if state.state_type != STATE_TYPE {
            return Err(StateError::TypeMismatch(state.state_type));
        }
        Ok(state)
    }
}

impl Default for StateTree {
    fn default() -> Self {
        StateTree::new()
    }
}

/// Error types for saved state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Malformed state: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("State type {0} doesn't match DrumSampler")]
    TypeMismatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let state = StateTree::new().with_parameter("Sound Choice", 3.0);
        let bytes = state.to_bytes().expect("state should serialize");

        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!("DrumSampler", json["type"]);
        assert_eq!(3.0f64, json["parameters"]["Sound Choice"]);

        assert_eq!(state, StateTree::from_bytes(&bytes).expect("state should parse"));
    }

    #[test]
    fn test_rejects_other_types() {
        let bytes = br#"{"type": "SomethingElse", "parameters": {"Sound Choice": 1.0}}"#;
        assert!(matches!(
            StateTree::from_bytes(bytes),
            Err(StateError::TypeMismatch(tag)) if tag == "SomethingElse"
        ));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            StateTree::from_bytes(b"<xml/>"),
            Err(StateError::Malformed(_))
        ));
        assert!(matches!(
            StateTree::from_bytes(br#"{"parameters": {}}"#),
            Err(StateError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_parameters_defaults_empty() {
        let state = StateTree::from_bytes(br#"{"type": "DrumSampler"}"#).expect("should parse");
        assert!(state.parameters.is_empty());
    }
}
