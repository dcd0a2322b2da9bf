//! Headset jack switch state
//!
//! The kernel exposes the h2w (headset 2-wire) switch as a sysfs
//! pseudo-file holding a small decimal number: 0 when nothing is
//! plugged in, positive when headphones (or a headset) are present.
//! The file mutates in place, so a long-lived handle must rewind to
//! offset 0 before every read.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::uevent::atoi;

/// Well-known path of the h2w switch state file.
pub const H2W_STATE_PATH: &str = "/sys/class/switch/h2w/state";

#[derive(Debug, Error)]
pub enum JackError {
    #[error("cannot open jack switch state {path}: {source}")]
    SourceUnavailable { path: PathBuf, source: io::Error },

    #[error("cannot read jack switch state {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
}

/// Plugged/unplugged status of the headphone connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JackState {
    Unplugged,
    Plugged,
}

impl JackState {
    /// Strictly positive means plugged; zero, negative and unparseable
    /// content all read as unplugged.
    pub fn from_raw(value: i32) -> Self {
        if value > 0 {
            JackState::Plugged
        } else {
            JackState::Unplugged
        }
    }
}

/// Anything that can answer "is the jack plugged in right now?".
///
/// The state is never cached: the switch file is the source of truth
/// and every decision re-reads it.
pub trait JackStateSource {
    fn jack_state(&mut self) -> Result<JackState, JackError>;
}

/// Long-lived handle on the switch state file, opened once at daemon
/// startup. Every query rewinds and re-reads.
#[derive(Debug)]
pub struct SwitchFile {
    file: File,
    path: PathBuf,
}

impl SwitchFile {
    /// Open the platform h2w switch file.
    pub fn open() -> Result<Self, JackError> {
        Self::open_path(H2W_STATE_PATH)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, JackError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| JackError::SourceUnavailable {
            path: path.clone(),
            source,
        })?;
        Ok(Self { file, path })
    }
}

impl JackStateSource for SwitchFile {
    fn jack_state(&mut self) -> Result<JackState, JackError> {
        let read_failed = |source| JackError::ReadFailed {
            path: self.path.clone(),
            source,
        };

        self.file.seek(SeekFrom::Start(0)).map_err(read_failed)?;
        let mut content = Vec::new();
        self.file.read_to_end(&mut content).map_err(read_failed)?;

        Ok(JackState::from_raw(atoi(&content)))
    }
}

/// One-shot open/read/close query, for callers that hold no handle
/// (the mixer shim does this once per intercepted write).
pub fn read_state_once(path: impl AsRef<Path>) -> Result<JackState, JackError> {
    let mut switch = SwitchFile::open_path(path)?;
    switch.jack_state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_state(file: &mut File, content: &str) {
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn positive_state_is_plugged() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write_state(tmp.as_file_mut(), "1\n");

        let mut switch = SwitchFile::open_path(tmp.path()).unwrap();
        assert_eq!(switch.jack_state().unwrap(), JackState::Plugged);
    }

    #[test]
    fn zero_state_is_unplugged() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write_state(tmp.as_file_mut(), "0\n");

        let mut switch = SwitchFile::open_path(tmp.path()).unwrap();
        assert_eq!(switch.jack_state().unwrap(), JackState::Unplugged);
    }

    #[test]
    fn garbage_state_is_unplugged() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write_state(tmp.as_file_mut(), "wat\n");

        let mut switch = SwitchFile::open_path(tmp.path()).unwrap();
        assert_eq!(switch.jack_state().unwrap(), JackState::Unplugged);
    }

    #[test]
    fn rereads_pick_up_in_place_changes() {
        // simulates the sysfs file mutating under an open handle
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write_state(tmp.as_file_mut(), "0\n");

        let mut switch = SwitchFile::open_path(tmp.path()).unwrap();
        assert_eq!(switch.jack_state().unwrap(), JackState::Unplugged);

        write_state(tmp.as_file_mut(), "2\n");
        assert_eq!(switch.jack_state().unwrap(), JackState::Plugged);

        write_state(tmp.as_file_mut(), "0\n");
        assert_eq!(switch.jack_state().unwrap(), JackState::Unplugged);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = SwitchFile::open_path("/nonexistent/h2w/state").unwrap_err();
        assert!(matches!(err, JackError::SourceUnavailable { .. }));
    }

    #[test]
    fn read_state_once_round_trip() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write_state(tmp.as_file_mut(), "1\n");
        assert_eq!(read_state_once(tmp.path()).unwrap(), JackState::Plugged);
    }
}
