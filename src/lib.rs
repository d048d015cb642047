//
//   Copyright 2026 Basil Crow
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.
//

//! Raw socket privilege separation.
//!
//! `rawsocket-helper` is installed with `CAP_NET_RAW` and does exactly one
//! thing: open a raw socket for its unprivileged parent and hand the
//! descriptor back over an inherited `AF_UNIX` channel using `SCM_RIGHTS`.
//! The library exposes the pieces of that pipeline plus [`request_raw_socket`]
//! for callers that want to launch the helper themselves.

use std::io;
use std::process::ExitStatus;

use nix::errno::Errno;

pub mod args;
pub mod client;
pub mod diag;
pub mod socket;

pub use args::{parse_args, parse_int, Action, Invocation};
pub use client::request_raw_socket;
pub use diag::Diag;
pub use socket::{open_raw, recv_fd, send_fd, transfer};

// Error handling philosophy: the helper runs with elevated capability and is invoked fresh for every
// request, so every error is terminal. Nothing here retries; the caller decides whether to launch the
// helper again. Errors carry enough context for a one-line message on stderr and nothing more.

/// Unified error type for the helper and its client.
#[derive(Debug)]
pub enum Error {
    /// Malformed invocation: wrong argument count or non-numeric content.
    Usage(String),
    /// The kernel refused to create the raw socket.
    Socket(Errno),
    /// Passing the descriptor over the channel failed.
    Transfer(Errno),
    /// The channel delivered something other than a single descriptor.
    Protocol(String),
    /// I/O error outside the descriptor handshake, e.g. spawning the helper.
    Io(io::Error),
    /// The helper ran but reported failure.
    Helper(ExitStatus),
}

impl Error {
    pub fn usage(reason: impl Into<String>) -> Self {
        Error::Usage(reason.into())
    }

    /// Whether the error originates from a missing privilege rather than bad input.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::Socket(Errno::EPERM | Errno::EACCES))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Socket(e) | Error::Transfer(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Usage(_) | Error::Protocol(_) | Error::Helper(_) => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Usage(reason) => write!(f, "{}", reason),
            Error::Socket(e) => {
                write!(f, "cannot open raw socket: {}", e)?;
                if self.is_permission_denied() {
                    write!(f, " (raw sockets require CAP_NET_RAW)")?;
                }
                Ok(())
            }
            Error::Transfer(e) => write!(f, "cannot pass descriptor: {}", e),
            Error::Protocol(reason) => write!(f, "{}", reason),
            Error::Io(e) => write!(f, "{}", e),
            Error::Helper(status) => write!(f, "helper failed: {}", status),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Errno> for Error {
    fn from(e: Errno) -> Self {
        Error::Io(io::Error::from(e))
    }
}

impl From<lexopt::Error> for Error {
    fn from(e: lexopt::Error) -> Self {
        Error::Usage(e.to_string())
    }
}
