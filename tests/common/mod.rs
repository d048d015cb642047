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

#![allow(dead_code)]

use std::io;
use std::mem::size_of;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use nix::errno::Errno;
use nix::libc;
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

/// Placeholder in helper arguments replaced by the inherited channel number.
pub const CHANNEL: &str = "{channel}";

// Find an executable produced by the Cargo build
pub fn find_exec(name: &str) -> PathBuf {
    // Find the path where Cargo has placed the executables by looking at this test process's
    // executable, which was also built by Cargo.
    let this_exec = std::env::current_exe().unwrap();
    let exec_dir = this_exec.parent().unwrap().parent().unwrap();

    exec_dir.join(name)
}

/// Whether this process may open raw sockets, and therefore the helper too.
pub fn raw_sockets_available() -> bool {
    rawsocket::open_raw(libc::AF_INET, libc::IPPROTO_ICMP).is_ok()
}

/// Run the helper with one end of a fresh socketpair inherited by the child.
///
/// Returns the helper's output and our end of the channel. The child's end
/// is closed in this process before returning, so reading from our end
/// yields EOF once the helper has exited without sending anything.
pub fn run_helper(args: &[&str], env: &[(&str, &str)]) -> (Output, OwnedFd) {
    let (ours, theirs) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::SOCK_CLOEXEC,
    )
    .expect("socketpair failed");
    let inherited = theirs.as_raw_fd();
    let inherited_str = inherited.to_string();

    let mut cmd = Command::new(find_exec("rawsocket-helper"));
    cmd.args(args.iter().map(|a| {
        if *a == CHANNEL {
            inherited_str.as_str()
        } else {
            *a
        }
    }))
    .env_remove(rawsocket::diag::VERBOSE_ENV)
    .envs(env.iter().copied())
    .stdin(Stdio::null());
    // SAFETY: only an async-signal-safe fcntl(2) runs between fork and exec.
    unsafe {
        cmd.pre_exec(move || {
            Errno::result(libc::fcntl(inherited, libc::F_SETFD, 0))
                .map(drop)
                .map_err(io::Error::from)
        });
    }

    let output = cmd.output().expect("failed to run rawsocket-helper");
    drop(theirs);
    (output, ours)
}

fn int_sockopt(fd: &OwnedFd, opt: libc::c_int) -> libc::c_int {
    let mut val: libc::c_int = 0;
    let mut len = size_of::<libc::c_int>() as libc::socklen_t;
    let ret = unsafe {
        libc::getsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            opt,
            &mut val as *mut libc::c_int as *mut libc::c_void,
            &mut len,
        )
    };
    assert_eq!(ret, 0, "getsockopt({}) failed: {}", opt, Errno::last());
    val
}

/// Address family of a socket, via SO_DOMAIN.
pub fn socket_family(fd: &OwnedFd) -> libc::c_int {
    int_sockopt(fd, libc::SO_DOMAIN)
}

/// Protocol of a socket, via SO_PROTOCOL.
pub fn socket_protocol(fd: &OwnedFd) -> libc::c_int {
    int_sockopt(fd, libc::SO_PROTOCOL)
}
