//! Shared fakes for the dispatch tests: a scripted event source, a
//! fixed jack switch and a recording mixer.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;

use jackplugd::jack::{JackError, JackState, JackStateSource};
use jackplugd::mixer::{MixerBackend, MixerError};
use jackplugd::netlink::{EventSource, EventSourceError};

/// Replays a script of receive outcomes, then fails the wait so
/// `Daemon::run` terminates.
pub struct ScriptedEvents {
    script: VecDeque<Result<Vec<u8>, EventSourceError>>,
}

impl ScriptedEvents {
    pub fn new(messages: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            script: messages.into_iter().map(Ok).collect(),
        }
    }

    pub fn push_recv_error(&mut self) {
        self.script.push_back(Err(EventSourceError::Recv(io::Error::new(
            io::ErrorKind::Other,
            "scripted recv failure",
        ))));
    }
}

impl EventSource for ScriptedEvents {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, EventSourceError> {
        match self.script.pop_front() {
            Some(Ok(msg)) => {
                buf[..msg.len()].copy_from_slice(&msg);
                Ok(msg.len())
            }
            Some(Err(err)) => Err(err),
            None => Err(EventSourceError::Wait(io::Error::new(
                io::ErrorKind::Other,
                "script exhausted",
            ))),
        }
    }
}

pub struct FakeJack(pub JackState);

impl JackStateSource for FakeJack {
    fn jack_state(&mut self) -> Result<JackState, JackError> {
        Ok(self.0)
    }
}

/// A switch file whose reads always fail, as if the sysfs node went
/// away under the open handle.
pub struct FailingJack;

impl JackStateSource for FailingJack {
    fn jack_state(&mut self) -> Result<JackState, JackError> {
        Err(JackError::ReadFailed {
            path: "/sys/class/switch/h2w/state".into(),
            source: io::Error::new(io::ErrorKind::Other, "scripted read failure"),
        })
    }
}

/// In-memory control register file. Records all writes in order.
#[derive(Default)]
pub struct RecordingMixer {
    pub controls: RefCell<HashMap<String, i32>>,
    pub writes: RefCell<Vec<(String, i32)>>,
    pub fail_writes_on: Option<&'static str>,
}

impl RecordingMixer {
    pub fn with_control(self, name: &str, value: i32) -> Self {
        self.controls.borrow_mut().insert(name.to_string(), value);
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }
}

impl MixerBackend for RecordingMixer {
    fn control_value(&self, name: &str) -> Result<i32, MixerError> {
        self.controls
            .borrow()
            .get(name)
            .copied()
            .ok_or_else(|| MixerError::ControlNotFound {
                name: name.to_string(),
            })
    }

    fn set_control_value(&self, name: &str, value: i32) -> Result<(), MixerError> {
        if self.fail_writes_on == Some(name) {
            // stands in for any backend write failure
            return Err(MixerError::ControlNotFound {
                name: name.to_string(),
            });
        }
        self.controls.borrow_mut().insert(name.to_string(), value);
        self.writes.borrow_mut().push((name.to_string(), value));
        Ok(())
    }
}
