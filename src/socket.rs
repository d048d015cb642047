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

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::libc;
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};

use crate::{Diag, Error, Invocation};

/// Open a `SOCK_RAW` socket for an arbitrary family/protocol pair.
///
/// nix's `SockProtocol` only covers a fixed set of protocols, so this goes
/// through socket(2) directly.
pub fn open_raw(family: i32, protocol: i32) -> Result<OwnedFd, Error> {
    let ret = unsafe { libc::socket(family, libc::SOCK_RAW | libc::SOCK_CLOEXEC, protocol) };
    let fd = Errno::result(ret).map_err(Error::Socket)?;
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Send `fd` over `channel` as `SCM_RIGHTS`.
///
/// The payload is a single zero byte; some platforms drop ancillary data
/// attached to an empty message. The caller keeps its own copy of `fd`.
pub fn send_fd(channel: BorrowedFd<'_>, fd: BorrowedFd<'_>) -> Result<(), Error> {
    let payload = [0u8; 1];
    let iov = [IoSlice::new(&payload)];
    let fds = [fd.as_raw_fd()];
    let cmsgs = [ControlMessage::ScmRights(&fds)];

    loop {
        match sendmsg::<()>(channel.as_raw_fd(), &iov, &cmsgs, MsgFlags::empty(), None) {
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::Transfer(e)),
        }
    }
}

/// Receive one descriptor sent by [`send_fd`].
///
/// The new descriptor is close-on-exec. Extra descriptors in the same
/// message are closed. A closed channel or a message without rights is a
/// protocol error.
pub fn recv_fd(channel: BorrowedFd<'_>) -> Result<OwnedFd, Error> {
    let mut payload = [0u8; 1];
    let mut cmsg_buf = nix::cmsg_space!(RawFd);

    loop {
        let mut iov = [IoSliceMut::new(&mut payload)];
        let msg = match recvmsg::<()>(
            channel.as_raw_fd(),
            &mut iov,
            Some(&mut cmsg_buf),
            MsgFlags::MSG_CMSG_CLOEXEC,
        ) {
            Ok(msg) => msg,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::Transfer(e)),
        };

        let mut received: Option<OwnedFd> = None;
        for cmsg in msg.cmsgs().map_err(Error::Transfer)? {
            if let ControlMessageOwned::ScmRights(fds) = cmsg {
                for fd in fds {
                    let fd = unsafe { OwnedFd::from_raw_fd(fd) };
                    if received.is_none() {
                        received = Some(fd);
                    }
                }
            }
        }

        if msg.flags.contains(MsgFlags::MSG_CTRUNC) {
            return Err(Error::Protocol("control message truncated".to_string()));
        }
        return match received {
            Some(fd) => Ok(fd),
            None if msg.bytes == 0 => Err(Error::Protocol(
                "channel closed before a descriptor arrived".to_string(),
            )),
            None => Err(Error::Protocol("message carried no descriptor".to_string())),
        };
    }
}

/// Take ownership of an inherited descriptor number.
///
/// F_GETFD guards the adoption: wrapping a number that is not open in an
/// `OwnedFd` would close someone else's descriptor later.
fn adopt_channel(raw: RawFd) -> Result<OwnedFd, Error> {
    let ret = unsafe { libc::fcntl(raw, libc::F_GETFD) };
    Errno::result(ret).map_err(Error::Transfer)?;
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

/// Open the raw socket described by `invocation` and pass it to the peer on
/// the channel.
///
/// The channel and the local copy of the raw socket are closed on every
/// return path. On success the peer holds the only remaining descriptor.
pub fn transfer(invocation: &Invocation, diag: &Diag) -> Result<(), Error> {
    let channel = adopt_channel(invocation.channel)?;

    let raw = open_raw(invocation.family, invocation.protocol)?;
    diag.log(format_args!(
        "Opened raw socket {} (family {}, protocol {})",
        raw.as_raw_fd(),
        invocation.family,
        invocation.protocol
    ));

    send_fd(channel.as_fd(), raw.as_fd())?;
    diag.log(format_args!(
        "Passed descriptor over channel {}",
        channel.as_raw_fd()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::socket::{
        getsockopt, socket, socketpair, sockopt, AddressFamily, SockFlag, SockType,
    };
    use std::os::fd::IntoRawFd;

    fn channel_pair() -> (OwnedFd, OwnedFd) {
        socketpair(
            AddressFamily::Unix,
            SockType::Stream,
            None,
            SockFlag::SOCK_CLOEXEC,
        )
        .expect("socketpair")
    }

    #[test]
    fn passes_a_udp_socket() {
        let (ours, theirs) = channel_pair();
        let udp = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .expect("udp socket");

        send_fd(ours.as_fd(), udp.as_fd()).expect("send_fd");
        let received = recv_fd(theirs.as_fd()).expect("recv_fd");

        assert_ne!(received.as_raw_fd(), udp.as_raw_fd());
        assert_eq!(
            getsockopt(&received, sockopt::SockType).unwrap(),
            SockType::Datagram
        );
    }

    #[test]
    fn recv_on_closed_channel_is_protocol_error() {
        let (ours, theirs) = channel_pair();
        drop(ours);
        match recv_fd(theirs.as_fd()) {
            Err(Error::Protocol(msg)) => assert!(msg.contains("closed"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn recv_without_rights_is_protocol_error() {
        let (ours, theirs) = channel_pair();
        nix::unistd::write(&ours, b"x").expect("write");
        match recv_fd(theirs.as_fd()) {
            Err(Error::Protocol(msg)) => assert!(msg.contains("no descriptor"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn send_to_vanished_peer_fails() {
        let (ours, theirs) = channel_pair();
        drop(theirs);
        let err = send_fd(ours.as_fd(), ours.as_fd()).unwrap_err();
        assert!(matches!(err, Error::Transfer(Errno::EPIPE)), "{:?}", err);
    }

    #[test]
    fn unsupported_family_is_socket_error() {
        let err = open_raw(12345, 0).unwrap_err();
        assert!(matches!(err, Error::Socket(_)), "{:?}", err);
    }

    #[test]
    fn transfer_closes_channel_either_way() {
        let (ours, theirs) = channel_pair();
        let invocation = Invocation {
            channel: ours.into_raw_fd(),
            family: libc::AF_INET,
            protocol: libc::IPPROTO_ICMP,
        };

        match transfer(&invocation, &Diag::default()) {
            Ok(()) => {
                let raw = recv_fd(theirs.as_fd()).expect("recv_fd");
                assert_eq!(getsockopt(&raw, sockopt::SockType).unwrap(), SockType::Raw);
            }
            Err(e) => {
                assert!(e.is_permission_denied(), "{:?}", e);
                // Nothing was sent and our end of the channel is gone.
                assert!(matches!(recv_fd(theirs.as_fd()), Err(Error::Protocol(_))));
            }
        }
    }
}
