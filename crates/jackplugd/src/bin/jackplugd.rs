//! jackplugd daemon binary
//!
//! Wires the real collaborators together: the kernel uevent socket,
//! the h2w switch file and the card 0 mixer. No flags, no config file;
//! log level comes from `RUST_LOG`.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jackplugd::mixer::{AlsaMixer, MixerBackend, MIXER_CARD};
use jackplugd::policy::{RoutePolicy, OFF, VOLKEY_SWITCH};
use jackplugd::{Daemon, NetlinkUevents, SwitchFile};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("jackplugd {} starting", env!("CARGO_PKG_VERSION"));

    let events = NetlinkUevents::open().context("opening uevent netlink socket")?;
    let jack = SwitchFile::open().context("opening h2w switch state")?;
    let mixer = AlsaMixer::new(MIXER_CARD);

    // The volume-key speaker function fights the jack routing; force it
    // off once before entering the loop.
    mixer
        .set_control_value(VOLKEY_SWITCH, OFF)
        .context("disabling volume-key speaker function")?;

    let mut daemon = Daemon::new(events, jack, mixer, RoutePolicy::default());
    daemon.run().context("event loop terminated")?;

    Ok(())
}
