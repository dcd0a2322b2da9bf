//! Output path reconciliation
//!
//! The one rule this whole system exists for: when headphones are
//! plugged in, the headphone amp path is on and the speaker amp path is
//! off; otherwise the reverse. Exactly one of the two is ever enabled
//! after a successful reconcile.
//!
//! Two deployment forms share this module:
//!
//! - the daemon reacts to a jack switch event by issuing both amp
//!   writes itself ([`RoutePolicy::reconcile`]);
//! - the preload shim transforms a single mixer write already in
//!   flight, without ever issuing a second one ([`substitute`]).

use thiserror::Error;
use tracing::{debug, info};

use crate::jack::{JackError, JackState, JackStateSource};
use crate::mixer::{MixerBackend, MixerError};

/// External speaker amplifier switch.
pub const SPEAKER_SWITCH: &str = "Ext_Speaker_Amp_Switch";
/// External headphone amplifier switch.
pub const HEADPHONE_SWITCH: &str = "Ext_Headphone_Amp_Switch";
/// HD audio switch the daemon treats as a "feature enabled" gate.
pub const HD_GATE_SWITCH: &str = "Audio_I2S0dl1_hd_Switch";
/// Volume-key speaker function, forced off once at startup.
pub const VOLKEY_SWITCH: &str = "VOLKEY_SWITCH";

pub const ON: i32 = 1;
pub const OFF: i32 = 0;

/// tinyalsa numids of the controls the shim intercepts.
pub const SPEAKER_SWITCH_NUMID: u32 = 6;
pub const HEADPHONE_SWITCH_NUMID: u32 = 7;
pub const GAIN_LEFT_NUMID: u32 = 9;
pub const GAIN_RIGHT_NUMID: u32 = 10;

/// Enum labels used by the codec's switch and gain controls.
pub const LABEL_ON: &str = "On";
pub const LABEL_OFF: &str = "Off";
/// Fixed gain forced on both channels regardless of what was asked for.
pub const GAIN_OVERRIDE_LABEL: &str = "9Db";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    State(#[from] JackError),

    #[error(transparent)]
    Mixer(#[from] MixerError),
}

/// Which of the two amp writes is issued first.
///
/// The field firmware shipped both sequences at different points; the
/// order is a named parameter rather than a silently-baked-in choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteOrder {
    /// Speaker amp is always written first, then headphone amp.
    #[default]
    SpeakerFirst,
    /// The path being turned off is written first, then the path being
    /// turned on.
    DisableFirst,
}

/// Daemon-variant policy: drives both amp switches to match the jack.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutePolicy {
    pub order: WriteOrder,
}

impl RoutePolicy {
    pub fn new(order: WriteOrder) -> Self {
        Self { order }
    }

    /// The two (control, value) writes for a given jack state, in the
    /// order they must be issued.
    fn writes(&self, state: JackState) -> [(&'static str, i32); 2] {
        match (self.order, state) {
            (_, JackState::Plugged) => [(SPEAKER_SWITCH, OFF), (HEADPHONE_SWITCH, ON)],
            (WriteOrder::SpeakerFirst, JackState::Unplugged) => {
                [(SPEAKER_SWITCH, ON), (HEADPHONE_SWITCH, OFF)]
            }
            (WriteOrder::DisableFirst, JackState::Unplugged) => {
                [(HEADPHONE_SWITCH, OFF), (SPEAKER_SWITCH, ON)]
            }
        }
    }

    /// Re-read the jack state and drive the amp switches to match.
    ///
    /// Fail-fast: if the first write errors the second is never
    /// attempted and whatever was already applied stays applied.
    pub fn reconcile<J, M>(&self, jack: &mut J, mixer: &M) -> Result<JackState, PolicyError>
    where
        J: JackStateSource + ?Sized,
        M: MixerBackend + ?Sized,
    {
        let state = jack.jack_state()?;
        match state {
            JackState::Plugged => info!("jack plugged, switching to headphones"),
            JackState::Unplugged => info!("jack unplugged, switching to speakers"),
        }

        for (name, value) in self.writes(state) {
            mixer.set_control_value(name, value)?;
        }
        Ok(state)
    }
}

/// Outcome of the shim-variant policy for one intercepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// Forward the caller's value untouched.
    Pass,
    /// Forward this label instead.
    Replace(&'static str),
}

/// Shim-variant policy: rewrite the single mixer write in flight.
///
/// The jack state closure is only invoked on the branches that need it,
/// so unrelated controls never touch the switch file.
pub fn substitute(
    numid: u32,
    requested: &str,
    jack_state: impl FnOnce() -> JackState,
) -> Substitution {
    match numid {
        SPEAKER_SWITCH_NUMID if requested == LABEL_ON => {
            if jack_state() == JackState::Plugged {
                debug!(numid, "headphones present, suppressing speaker enable");
                Substitution::Replace(LABEL_OFF)
            } else {
                Substitution::Pass
            }
        }
        HEADPHONE_SWITCH_NUMID if requested == LABEL_ON => {
            if jack_state() == JackState::Plugged {
                Substitution::Replace(LABEL_ON)
            } else {
                debug!(numid, "no headphones, suppressing headphone enable");
                Substitution::Replace(LABEL_OFF)
            }
        }
        GAIN_LEFT_NUMID | GAIN_RIGHT_NUMID => {
            debug!(numid, requested, "forcing fixed gain");
            Substitution::Replace(GAIN_OVERRIDE_LABEL)
        }
        _ => Substitution::Pass,
    }
}
