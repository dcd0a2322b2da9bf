//! Event loop and dispatch
//!
//! Single-threaded and fully blocking: the only suspension point is
//! the wait for the next uevent, and everything after a wake-up runs
//! to completion before the next wait.

use thiserror::Error;
use tracing::{debug, warn};

use crate::jack::JackStateSource;
use crate::mixer::MixerBackend;
use crate::netlink::{EventSource, EventSourceError, UEVENT_MSG_LEN};
use crate::policy::{PolicyError, RoutePolicy, HD_GATE_SWITCH, ON};
use crate::uevent::Uevent;

/// Device path the jack switch reports its state changes under.
pub const JACK_SWITCH_DEVPATH: &str = "/devices/virtual/switch/h2w";

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Events(#[from] EventSourceError),

    #[error("failed to update headset routing: {0}")]
    Reconcile(#[from] PolicyError),
}

/// The daemon proper: an event source, the jack switch file, a mixer
/// backend and the routing policy, all injected.
pub struct Daemon<E, J, M> {
    events: E,
    jack: J,
    mixer: M,
    policy: RoutePolicy,
}

impl<E, J, M> Daemon<E, J, M>
where
    E: EventSource,
    J: JackStateSource,
    M: MixerBackend,
{
    pub fn new(events: E, jack: J, mixer: M, policy: RoutePolicy) -> Self {
        Self {
            events,
            jack,
            mixer,
            policy,
        }
    }

    /// Tear the daemon back down into its collaborators. Tests use
    /// this to inspect injected fakes after a run.
    pub fn into_parts(self) -> (E, J, M, RoutePolicy) {
        (self.events, self.jack, self.mixer, self.policy)
    }

    /// Handle one raw uevent message. Returns whether the routing
    /// policy ran.
    ///
    /// Only a `change` on the jack switch device path qualifies, and
    /// then only while the HD audio gate control reads on. A failed
    /// gate read counts as gate-off, not as an error.
    pub fn dispatch(&mut self, msg: &[u8]) -> Result<bool, DaemonError> {
        let event = Uevent::parse(msg);
        if event.action != "change" || event.device_path != JACK_SWITCH_DEVPATH {
            return Ok(false);
        }
        debug!(devpath = %event.device_path, "jack switch event");

        match self.mixer.control_value(HD_GATE_SWITCH) {
            Ok(value) if value == ON => {}
            Ok(value) => {
                debug!(gate = value, "hd audio gate off, ignoring jack event");
                return Ok(false);
            }
            Err(err) => {
                warn!("cannot read hd audio gate, ignoring jack event: {err}");
                return Ok(false);
            }
        }

        self.policy.reconcile(&mut self.jack, &self.mixer)?;
        Ok(true)
    }

    /// Block on the event source forever.
    ///
    /// Returns only on a fatal condition: a wait failure, a jack state
    /// read failure or a routing write failure. A failed or empty
    /// receive is logged and skipped.
    pub fn run(&mut self) -> Result<(), DaemonError> {
        let mut buf = [0u8; UEVENT_MSG_LEN];
        loop {
            match self.events.recv(&mut buf) {
                Ok(0) => {
                    warn!("empty uevent message, skipping");
                }
                Ok(n) => {
                    self.dispatch(&buf[..n])?;
                }
                Err(EventSourceError::Recv(err)) => {
                    warn!("failed to read uevent message: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
