//! Versioned state file container.
//!
//! The container wraps a [`State`] with a format version, an optional engine
//! version, a lineage and a serial. It is JSON on the wire. Reading checks
//! the format version before decoding the rest.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::StateFileError;
use crate::state::State;
use crate::value::Value;

/// The only container format this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub format_version: u32,
    /// Engine version that wrote the file; `None` when unversioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub lineage: String,
    #[serde(default)]
    pub serial: u64,
    pub state: State,
}

impl StateFile {
    pub fn new(state: State, lineage: impl Into<String>, serial: u64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            engine_version: None,
            lineage: lineage.into(),
            serial,
            state,
        }
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    format_version: Option<u32>,
}

/// Encode `file` into `w`.
///
/// Fails without writing anything when the state holds a value JSON cannot
/// represent.
pub fn write(file: &StateFile, mut w: impl Write) -> Result<(), StateFileError> {
    check_representable(&file.state)?;
    let encoded = serde_json::to_vec_pretty(file).map_err(|e| StateFileError::Encode(e.to_string()))?;
    w.write_all(&encoded)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

fn check_representable(state: &State) -> Result<(), StateFileError> {
    let attributes = state
        .resources
        .values()
        .flat_map(|r| r.attributes.iter().map(move |(name, value)| (format!("{}.{name}", r.address()), value)));
    let outputs = state
        .outputs
        .iter()
        .map(|(name, value)| (format!("output.{name}"), value));
    for (path, value) in attributes.chain(outputs) {
        if !is_finite(value) {
            return Err(StateFileError::Encode(format!("{path} holds a non-finite number")));
        }
    }
    Ok(())
}

fn is_finite(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_finite(),
        Value::List(items) => items.iter().all(is_finite),
        Value::Object(fields) => fields.values().all(is_finite),
        Value::Null | Value::Bool(_) | Value::String(_) => true,
    }
}

/// Decode a state file from `r`.
pub fn read(mut r: impl Read) -> Result<StateFile, StateFileError> {
    let mut raw = Vec::new();
    r.read_to_end(&mut raw)?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(StateFileError::Malformed("state file is empty".into()));
    }

    let header: VersionHeader =
        serde_json::from_slice(&raw).map_err(|e| StateFileError::Malformed(e.to_string()))?;
    match header.format_version {
        Some(FORMAT_VERSION) => {}
        Some(found) => {
            return Err(StateFileError::UnsupportedVersion {
                found,
                supported: FORMAT_VERSION,
            })
        }
        None => return Err(StateFileError::Malformed("missing format_version".into())),
    }

    serde_json::from_slice(&raw).map_err(|e| StateFileError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Attributes, ResourceInstance};

    fn sample_state() -> State {
        let mut state = State::new();
        let mut attributes = Attributes::new();
        attributes.insert("id".into(), Value::from("4242"));
        attributes.insert(
            "triggers".into(),
            Value::Object([("rev".to_string(), Value::Number(3.0))].into()),
        );
        state.set_resource(ResourceInstance::new("null_resource", "web", "null", attributes));
        state.outputs.insert("greeting".into(), Value::from("hi"));
        state
    }

    #[test]
    fn test_round_trip() {
        let file = StateFile::new(sample_state(), "", 0);
        let mut buf = Vec::new();

        write(&file, &mut buf).unwrap();
        let read_back = read(buf.as_slice()).unwrap();

        assert_eq!(read_back, file);
        assert_eq!(read_back.serial, 0);
        assert_eq!(read_back.engine_version, None);
    }

    #[test]
    fn test_write_rejects_non_finite_numbers() {
        let mut state = sample_state();
        state.outputs.insert(
            "ratio".into(),
            Value::List(vec![Value::Number(1.0), Value::Number(f64::INFINITY)]),
        );
        let mut buf = Vec::new();

        let err = write(&StateFile::new(state, "", 0), &mut buf).unwrap_err();

        assert!(matches!(err, StateFileError::Encode(ref m) if m.contains("output.ratio")));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let raw = br#"{"format_version": 9, "state": {}}"#;

        let err = read(&raw[..]).unwrap_err();

        assert!(matches!(err, StateFileError::UnsupportedVersion { found: 9, .. }));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(read(&b"{not json"[..]), Err(StateFileError::Malformed(_))));
        assert!(matches!(read(&b"  \n"[..]), Err(StateFileError::Malformed(_))));
        assert!(matches!(read(&br#"{"state": {}}"#[..]), Err(StateFileError::Malformed(_))));
    }

    #[test]
    fn test_defaults_missing_metadata() {
        let raw = br#"{"format_version": 1, "state": {"resources": {}}}"#;

        let file = read(&raw[..]).unwrap();

        assert_eq!(file.lineage, "");
        assert_eq!(file.serial, 0);
        assert!(file.state.is_empty());
    }
}
