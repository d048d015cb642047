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

use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use nix::errno::Errno;
use nix::libc;
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

use crate::{recv_fd, Error};

/// Launch the helper at `helper` and return the raw socket it opens.
///
/// Both ends of the channel are created close-on-exec; the child clears the
/// flag on its end after fork, so concurrent spawns elsewhere in this
/// process never inherit it.
pub fn request_raw_socket(helper: &Path, family: i32, protocol: i32) -> Result<OwnedFd, Error> {
    let (ours, theirs) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::SOCK_CLOEXEC,
    )?;
    let inherited = theirs.as_raw_fd();

    let mut cmd = Command::new(helper);
    cmd.arg(inherited.to_string())
        .arg(family.to_string())
        .arg(protocol.to_string())
        .stdin(Stdio::null());
    // SAFETY: fcntl(2) is async-signal-safe and touches only the child's
    // descriptor table.
    unsafe {
        cmd.pre_exec(move || {
            Errno::result(libc::fcntl(inherited, libc::F_SETFD, 0))
                .map(drop)
                .map_err(io::Error::from)
        });
    }

    let status = cmd.status()?;
    drop(theirs);
    if !status.success() {
        return Err(Error::Helper(status));
    }
    recv_fd(ours.as_fd())
}
