//! Kernel uevent source
//!
//! Hotplug notifications arrive on a `NETLINK_KOBJECT_UEVENT` datagram
//! socket subscribed to the kernel broadcast group. Receives are
//! blocking with no framing beyond datagram boundaries; one datagram is
//! one uevent message.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use thiserror::Error;
use tracing::{info, warn};

/// Maximum uevent payload accepted per receive.
pub const UEVENT_MSG_LEN: usize = 4096;

/// Kobject uevent broadcast group.
const UEVENT_GROUP_KERNEL: u32 = 1;

#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("cannot open uevent socket: {0}")]
    Open(io::Error),

    #[error("wait for uevent failed: {0}")]
    Wait(io::Error),

    #[error("uevent receive failed: {0}")]
    Recv(io::Error),
}

/// Blocking source of raw uevent messages. The daemon never needs more
/// than "give me the next datagram", so that is the whole contract.
pub trait EventSource {
    /// Block until a message arrives; returns the number of bytes
    /// written into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, EventSourceError>;
}

/// The real kernel socket. Closed on drop via `OwnedFd`.
pub struct NetlinkUevents {
    fd: OwnedFd,
}

impl NetlinkUevents {
    pub fn open() -> Result<Self, EventSourceError> {
        let raw = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_DGRAM | libc::SOCK_CLOEXEC,
                libc::NETLINK_KOBJECT_UEVENT,
            )
        };
        if raw < 0 {
            return Err(EventSourceError::Open(io::Error::last_os_error()));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        addr.nl_groups = UEVENT_GROUP_KERNEL;

        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(EventSourceError::Open(io::Error::last_os_error()));
        }

        // A hotplug storm (e.g. USB enumeration) can overflow the
        // default receive buffer while we hold the mixer open.
        let rcvbuf: libc::c_int = 256 * 1024;
        let rc = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &rcvbuf as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            warn!(
                "could not enlarge uevent receive buffer: {}",
                io::Error::last_os_error()
            );
        }

        info!("subscribed to kernel uevent broadcast");
        Ok(Self { fd })
    }
}

impl EventSource for NetlinkUevents {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, EventSourceError> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            let nr = unsafe { libc::poll(&mut pfd, 1, -1) };
            if nr < 0 {
                // fatal by contract: the daemon restarts under
                // supervision instead of self-healing
                return Err(EventSourceError::Wait(io::Error::last_os_error()));
            }
            if pfd.revents & libc::POLLIN == 0 {
                continue;
            }

            let n = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    0,
                )
            };
            if n < 0 {
                return Err(EventSourceError::Recv(io::Error::last_os_error()));
            }
            return Ok(n as usize);
        }
    }
}
