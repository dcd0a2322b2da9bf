//! tinyalsa mixer write interception
//!
//! Preloaded into audio clients via `LD_PRELOAD`. Exports
//! `mixer_ctl_set_enum_by_string` so our definition shadows
//! tinyalsa's; each call consults the headset routing policy, possibly
//! rewrites the requested label, then forwards to the real function
//! resolved with `dlsym(RTLD_NEXT)`.
//!
//! The shim transforms only the single write in flight. It never
//! issues writes of its own, and it reads the jack switch file
//! synchronously (open/read/close) at call time; a failed read
//! degrades to "unplugged", matching a switch value of 0.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr, CString};
use std::sync::Once;

use jackplugd::jack::{read_state_once, JackState, H2W_STATE_PATH};
use jackplugd::policy::{substitute, Substitution};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Leading fields of tinyalsa's `struct mixer_ctl`. Only `info` is
/// ever dereferenced; the layout must stay in sync with tinyalsa.
#[repr(C)]
struct MixerCtl {
    mixer: *mut c_void,
    info: *mut SndCtlElemInfo,
    ename: *mut *mut c_char,
}

/// `struct snd_ctl_elem_info` begins with the element id.
#[repr(C)]
struct SndCtlElemInfo {
    id: SndCtlElemId,
    // rest of the kernel struct unused
}

/// `struct snd_ctl_elem_id` begins with the numid.
#[repr(C)]
struct SndCtlElemId {
    numid: c_uint,
    // rest of the kernel struct unused
}

type SetEnumByString = unsafe extern "C" fn(*mut MixerCtl, *const c_char) -> c_int;

/// A preload library has no main, so the subscriber is installed on
/// first interception instead.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .try_init();
    });
}

unsafe fn resolve_next() -> Option<SetEnumByString> {
    let sym = libc::dlsym(
        libc::RTLD_NEXT,
        c"mixer_ctl_set_enum_by_string".as_ptr() as *const c_char,
    );
    if sym.is_null() {
        None
    } else {
        Some(std::mem::transmute::<*mut c_void, SetEnumByString>(sym))
    }
}

fn jack_state_now() -> JackState {
    read_state_once(H2W_STATE_PATH).unwrap_or(JackState::Unplugged)
}

/// Shadowed tinyalsa entry point.
///
/// # Safety
/// Called by C code; `ctl` must be a live tinyalsa `mixer_ctl` and
/// `string` a NUL-terminated label, as tinyalsa itself requires.
#[no_mangle]
pub unsafe extern "C" fn mixer_ctl_set_enum_by_string(
    ctl: *mut MixerCtl,
    string: *const c_char,
) -> c_int {
    init_tracing();

    let Some(orig) = resolve_next() else {
        error!("real mixer_ctl_set_enum_by_string not found");
        return -1;
    };

    if ctl.is_null() {
        error!("mixer_ctl_set_enum_by_string passed NULL ctl");
        return -1;
    }
    if string.is_null() {
        return orig(ctl, string);
    }

    let Ok(requested) = CStr::from_ptr(string).to_str() else {
        return orig(ctl, string);
    };
    let numid = (*(*ctl).info).id.numid;
    debug!(numid, requested, "intercepted mixer enum write");

    match substitute(numid, requested, jack_state_now) {
        Substitution::Pass => orig(ctl, string),
        Substitution::Replace(label) => {
            debug!(numid, label, "substituting mixer enum write");
            let label = CString::new(label).expect("substitution labels contain no NUL");
            orig(ctl, label.as_ptr())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    // The unsafe numid read relies on these kernel/tinyalsa layouts.
    #[test]
    fn numid_sits_at_offset_zero() {
        assert_eq!(offset_of!(SndCtlElemId, numid), 0);
        assert_eq!(offset_of!(SndCtlElemInfo, id), 0);
    }

    #[test]
    fn info_pointer_is_second_field() {
        assert_eq!(
            offset_of!(MixerCtl, info),
            std::mem::size_of::<*mut c_void>()
        );
    }
}
