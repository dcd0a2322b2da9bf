//! ALSA mixer control access
//!
//! Thin typed wrapper over the hctl interface. Every operation is a
//! fresh open/load/lookup/operate cycle with the handle dropped on all
//! exit paths; nothing is pooled or cached across calls. That costs a
//! little latency per write but cannot hold a stale handle over the
//! daemon's long lifetime.
//!
//! Note the two writes of a route change are *not* one transaction:
//! another writer racing between them can observe (and create) an
//! intermediate routing state. Accepted gap, see DESIGN.md.

use alsa::ctl::ElemValue;
use alsa::hctl::{Elem, HCtl};
use thiserror::Error;
use tracing::debug;

/// Card index of the onboard codec.
pub const MIXER_CARD: u32 = 0;

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("cannot open mixer device hw:{card}: {source}")]
    BackendUnavailable { card: u32, source: alsa::Error },

    #[error("mixer control {name:?} not found")]
    ControlNotFound { name: String },

    #[error("failed to read mixer control {name:?}: {source}")]
    ReadFailed { name: String, source: alsa::Error },

    #[error("failed to write mixer control {name:?}: {source}")]
    WriteFailed { name: String, source: alsa::Error },
}

/// The mixer as the routing policy sees it: a register file of named
/// integer controls. Injected so tests can substitute a fake.
pub trait MixerBackend {
    fn control_value(&self, name: &str) -> Result<i32, MixerError>;
    fn set_control_value(&self, name: &str, value: i32) -> Result<(), MixerError>;
}

/// Real backend talking to the ALSA control device.
pub struct AlsaMixer {
    card: u32,
}

impl AlsaMixer {
    pub fn new(card: u32) -> Self {
        Self { card }
    }

    fn open(&self) -> Result<HCtl, MixerError> {
        let unavailable = |source| MixerError::BackendUnavailable {
            card: self.card,
            source,
        };
        let hctl = HCtl::new(&format!("hw:{}", self.card), false).map_err(unavailable)?;
        hctl.load().map_err(unavailable)?;
        Ok(hctl)
    }

    fn find_elem<'a>(&self, hctl: &'a HCtl, name: &str) -> Result<Elem<'a>, MixerError> {
        for elem in hctl.elem_iter() {
            let matches = elem
                .get_id()
                .ok()
                .and_then(|id| id.get_name().ok().map(|n| n == name))
                .unwrap_or(false);
            if matches {
                return Ok(elem);
            }
        }
        Err(MixerError::ControlNotFound {
            name: name.to_string(),
        })
    }
}

impl MixerBackend for AlsaMixer {
    fn control_value(&self, name: &str) -> Result<i32, MixerError> {
        let hctl = self.open()?;
        let elem = self.find_elem(&hctl, name)?;

        let value = elem.read().map_err(|source| MixerError::ReadFailed {
            name: name.to_string(),
            source,
        })?;

        let raw = first_channel(&value).ok_or_else(|| MixerError::ReadFailed {
            name: name.to_string(),
            source: alsa::Error::new("snd_hctl_elem_read", libc::EINVAL),
        })?;

        debug!(name, value = raw, "read mixer control");
        Ok(raw)
    }

    fn set_control_value(&self, name: &str, value: i32) -> Result<(), MixerError> {
        let write_failed = |source| MixerError::WriteFailed {
            name: name.to_string(),
            source,
        };

        let hctl = self.open()?;
        let elem = self.find_elem(&hctl, name)?;

        // Read-modify-write: start from the element's live value so
        // channels beyond the first keep whatever the device holds.
        let mut elem_value = elem.read().map_err(write_failed)?;
        set_first_channel(&mut elem_value, value)
            .ok_or_else(|| write_failed(alsa::Error::new("snd_hctl_elem_write", libc::EINVAL)))?;
        elem.write(&elem_value).map_err(write_failed)?;

        debug!(name, value, "wrote mixer control");
        Ok(())
    }
}

/// Channel 0 of a control as a plain integer, whatever its element
/// type (integer, boolean switch or enumerated label index).
fn first_channel(value: &ElemValue) -> Option<i32> {
    value
        .get_integer(0)
        .or_else(|| value.get_boolean(0).map(i32::from))
        .or_else(|| value.get_enumerated(0).map(|v| v as i32))
}

fn set_first_channel(value: &mut ElemValue, raw: i32) -> Option<()> {
    value
        .set_integer(0, raw)
        .or_else(|| value.set_boolean(0, raw != 0))
        .or_else(|| value.set_enumerated(0, raw as u32))
}
