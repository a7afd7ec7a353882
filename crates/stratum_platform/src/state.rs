//! State persistence on the handle.
//!
//! Files are written to a sibling temporary file and renamed into place.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use stratum_engine::{statefile, StateFile};
use tracing::debug;

use crate::error::PlatformResult;
use crate::platform::Platform;

impl Platform {
    /// Encode the current state, lineage and serial into `w`.
    pub fn write_state(&self, w: impl Write) -> PlatformResult<()> {
        let file = StateFile::new((*self.state).clone(), self.lineage.clone(), self.serial);
        statefile::write(&file, w)?;
        Ok(())
    }

    /// Replace the current state with the one decoded from `r`.
    pub fn read_state(&mut self, r: impl Read) -> PlatformResult<&mut Self> {
        let file = statefile::read(r)?;
        self.state = Arc::new(file.state);
        self.lineage = file.lineage;
        self.serial = file.serial;
        Ok(self)
    }

    pub fn write_state_to_file(&self, path: impl AsRef<Path>) -> PlatformResult<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        self.write_state(tmp.as_file_mut())?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!("Wrote state to {}", path.display());
        Ok(())
    }

    pub fn read_state_from_file(&mut self, path: impl AsRef<Path>) -> PlatformResult<&mut Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!("Reading state from {}", path.display());
        self.read_state(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_engine::{ResourceInstance, State, Value};

    fn sample_state() -> State {
        let mut state = State::new();
        state.set_resource(ResourceInstance::new(
            "null_resource",
            "a",
            "null",
            [("id".to_string(), Value::from("1234"))].into(),
        ));
        state.outputs.insert("id".into(), Value::from("1234"));
        state
    }

    #[test]
    fn test_round_trip_through_buffer() {
        let mut source = Platform::new("");
        source.replace_state(sample_state());
        let mut buf = Vec::new();
        source.write_state(&mut buf).unwrap();

        let mut target = Platform::new("");
        target.read_state(buf.as_slice()).unwrap();

        assert_eq!(target.state(), source.state());
        assert_eq!(target.lineage(), source.lineage());
        assert_eq!(target.serial(), 1);
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratum.tfstate");
        let mut source = Platform::new("");
        source.replace_state(sample_state());

        source.write_state_to_file(&path).unwrap();
        let mut target = Platform::new("");
        target.read_state_from_file(&path).unwrap();

        assert_eq!(target.state(), &sample_state());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut platform = Platform::new("");

        let err = platform.read_state_from_file(dir.path().join("absent.json")).unwrap_err();

        assert!(matches!(err, crate::PlatformError::Io(_)));
    }
}
