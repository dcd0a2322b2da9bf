//! Kernel uevent decoding
//!
//! A kobject uevent arrives as one datagram holding NUL-terminated
//! `KEY=VALUE` segments packed back to back:
//!
//! ```text
//! change\0ACTION=change\0DEVPATH=/devices/virtual/switch/h2w\0SUBSYSTEM=switch\0...
//! ```
//!
//! [`Uevent::parse`] walks the segments by byte offset, fills in the
//! fields it recognizes and ignores everything else. Decoding never
//! fails: a malformed or truncated message just leaves the untouched
//! fields at their defaults.

/// One decoded kernel hotplug notification.
///
/// String fields default to `""` (including `action` - callers compare
/// against real kernel actions, so the empty string can never match).
/// Numeric fields default to `-1`, the sentinel for "not present".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uevent {
    pub action: String,
    pub device_path: String,
    pub subsystem: String,
    pub firmware: String,
    pub partition_name: String,
    pub device_name: String,
    pub modalias: String,
    pub partition_number: i32,
    pub major: i32,
    pub minor: i32,
}

impl Default for Uevent {
    fn default() -> Self {
        Self {
            action: String::new(),
            device_path: String::new(),
            subsystem: String::new(),
            firmware: String::new(),
            partition_name: String::new(),
            device_name: String::new(),
            modalias: String::new(),
            partition_number: -1,
            major: -1,
            minor: -1,
        }
    }
}

impl Uevent {
    /// Decode a raw uevent datagram.
    ///
    /// Scans NUL-delimited segments in order; the scan stops at an empty
    /// segment or when the buffer runs out. Each recognized key is
    /// assigned at most once per segment (first matching entry wins);
    /// unknown keys are skipped.
    pub fn parse(buf: &[u8]) -> Uevent {
        let mut event = Uevent::default();
        let mut pos = 0;

        while pos < buf.len() {
            let end = buf[pos..]
                .iter()
                .position(|&b| b == 0)
                .map(|i| pos + i)
                .unwrap_or(buf.len());
            if end == pos {
                // empty segment terminates the stream
                break;
            }
            event.apply_segment(&buf[pos..end]);
            pos = end + 1;
        }

        event
    }

    fn apply_segment(&mut self, segment: &[u8]) {
        // Segments without '=' (e.g. the "action@devpath" header line
        // some senders prepend) carry no field.
        let Some(eq) = segment.iter().position(|&b| b == b'=') else {
            return;
        };
        let (key, value) = (&segment[..eq], &segment[eq + 1..]);

        match key {
            b"ACTION" => self.action = text(value),
            b"DEVPATH" => self.device_path = text(value),
            b"SUBSYSTEM" => self.subsystem = text(value),
            b"FIRMWARE" => self.firmware = text(value),
            b"PARTNAME" => self.partition_name = text(value),
            b"PARTN" | b"PARTNUM" => self.partition_number = atoi(value),
            b"DEVNAME" => self.device_name = text(value),
            b"MODALIAS" => self.modalias = text(value),
            b"MAJOR" => self.major = atoi(value),
            b"MINOR" => self.minor = atoi(value),
            _ => {}
        }
    }
}

fn text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// C-`atoi` semantics: skip leading whitespace, optional sign, consume
/// leading digits, ignore trailing garbage. Anything unparseable is 0.
pub(crate) fn atoi(bytes: &[u8]) -> i32 {
    let mut it = bytes
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .peekable();

    let negative = match it.peek() {
        Some(b'-') => {
            it.next();
            true
        }
        Some(b'+') => {
            it.next();
            false
        }
        _ => false,
    };

    let mut magnitude: i64 = 0;
    for b in it {
        if !b.is_ascii_digit() {
            break;
        }
        magnitude = magnitude * 10 + i64::from(b - b'0');
        if magnitude > i64::from(i32::MAX) + 1 {
            break;
        }
    }

    let signed = if negative { -magnitude } else { magnitude };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_yields_defaults() {
        let event = Uevent::parse(b"");
        assert_eq!(event, Uevent::default());
        assert_eq!(event.action, "");
        assert_eq!(event.partition_number, -1);
        assert_eq!(event.major, -1);
        assert_eq!(event.minor, -1);
    }

    #[test]
    fn decodes_jack_switch_change() {
        let event =
            Uevent::parse(b"ACTION=change\0DEVPATH=/devices/virtual/switch/h2w\0MAJOR=5\0");
        assert_eq!(event.action, "change");
        assert_eq!(event.device_path, "/devices/virtual/switch/h2w");
        assert_eq!(event.major, 5);

        // everything else stays defaulted
        assert_eq!(event.subsystem, "");
        assert_eq!(event.minor, -1);
        assert_eq!(event.partition_number, -1);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let event = Uevent::parse(b"SEQNUM=4711\0ACTION=add\0WEIRD_KEY=zap\0SUBSYSTEM=switch\0");
        assert_eq!(event.action, "add");
        assert_eq!(event.subsystem, "switch");
        assert_eq!(event.device_path, "");
    }

    #[test]
    fn header_segment_without_equals_is_skipped() {
        let event = Uevent::parse(b"change@/devices/virtual/switch/h2w\0ACTION=change\0");
        assert_eq!(event.action, "change");
        assert_eq!(event.device_path, "");
    }

    #[test]
    fn empty_segment_terminates_scan() {
        let event = Uevent::parse(b"ACTION=remove\0\0DEVPATH=/devices/foo\0");
        assert_eq!(event.action, "remove");
        assert_eq!(event.device_path, "");
    }

    #[test]
    fn truncated_final_segment_still_decodes() {
        // no trailing NUL on the last segment
        let event = Uevent::parse(b"ACTION=change\0MINOR=12");
        assert_eq!(event.action, "change");
        assert_eq!(event.minor, 12);
    }

    #[test]
    fn all_recognized_keys() {
        let event = Uevent::parse(
            b"ACTION=add\0DEVPATH=/devices/x\0SUBSYSTEM=block\0FIRMWARE=fw.bin\0\
              PARTNAME=system\0PARTN=3\0DEVNAME=sda3\0MODALIAS=mod:x\0MAJOR=8\0MINOR=3\0",
        );
        assert_eq!(event.action, "add");
        assert_eq!(event.device_path, "/devices/x");
        assert_eq!(event.subsystem, "block");
        assert_eq!(event.firmware, "fw.bin");
        assert_eq!(event.partition_name, "system");
        assert_eq!(event.partition_number, 3);
        assert_eq!(event.device_name, "sda3");
        assert_eq!(event.modalias, "mod:x");
        assert_eq!(event.major, 8);
        assert_eq!(event.minor, 3);
    }

    #[test]
    fn partnum_is_an_alias_for_partn() {
        let event = Uevent::parse(b"PARTNUM=7\0");
        assert_eq!(event.partition_number, 7);
    }

    #[test]
    fn numeric_garbage_parses_as_zero() {
        let event = Uevent::parse(b"MAJOR=banana\0MINOR=\0");
        assert_eq!(event.major, 0);
        assert_eq!(event.minor, 0);
    }

    #[test]
    fn atoi_matches_c_behavior() {
        assert_eq!(atoi(b"42"), 42);
        assert_eq!(atoi(b"  42"), 42);
        assert_eq!(atoi(b"42abc"), 42);
        assert_eq!(atoi(b"-17"), -17);
        assert_eq!(atoi(b"+8"), 8);
        assert_eq!(atoi(b""), 0);
        assert_eq!(atoi(b"abc"), 0);
        assert_eq!(atoi(b"1\n"), 1);
    }
}
