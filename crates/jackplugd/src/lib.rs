//! jackplugd: headset jack detection for the onboard codec
//!
//! Listens for kernel hotplug uevents from the h2w switch and drives
//! the ALSA amp switches so that exactly one of {speaker, headphone}
//! output paths is enabled at any time.
//!
//! Two deployable forms wrap the same core:
//!
//! - the `jackplugd` binary, a blocking single-threaded daemon over a
//!   netlink uevent socket;
//! - the `mixer-shim` preload library, which reuses [`policy`] and
//!   [`jack`] to rewrite mixer writes made by other processes.
//!
//! All process-external state (event socket, switch file, mixer
//! device) is reached through injected traits so the core is testable
//! with fakes.

pub mod daemon;
pub mod jack;
pub mod mixer;
pub mod netlink;
pub mod policy;
pub mod uevent;

pub use daemon::{Daemon, DaemonError, JACK_SWITCH_DEVPATH};
pub use jack::{read_state_once, JackError, JackState, JackStateSource, SwitchFile, H2W_STATE_PATH};
pub use mixer::{AlsaMixer, MixerBackend, MixerError, MIXER_CARD};
pub use netlink::{EventSource, EventSourceError, NetlinkUevents, UEVENT_MSG_LEN};
pub use policy::{substitute, PolicyError, RoutePolicy, Substitution, WriteOrder};
pub use uevent::Uevent;
