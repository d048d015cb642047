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

use std::os::fd::RawFd;

use crate::{Diag, Error};

/// The three integers the parent passes on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Inherited `AF_UNIX` endpoint the descriptor is sent over.
    pub channel: RawFd,
    /// Address family for socket(2), e.g. `AF_INET`.
    pub family: i32,
    /// Protocol for socket(2), e.g. `IPPROTO_ICMP`.
    pub protocol: i32,
}

/// What the command line asks the helper to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Run(Invocation),
    Help,
    Version,
}

/// Parse a base-10 C `int`, consuming the whole string.
///
/// Unlike strtol(3), an empty string is an error rather than zero, and
/// leading whitespace is not skipped.
pub fn parse_int(what: &str, s: &str) -> Result<i32, Error> {
    if s.is_empty() {
        return Err(Error::usage(format!("empty {}", what)));
    }
    s.parse::<i32>()
        .map_err(|e| Error::usage(format!("invalid {} '{}': {}", what, s, e)))
}

impl Invocation {
    /// Validate exactly three positional values: channel, family, protocol.
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Result<Invocation, Error> {
        let [channel, family, protocol] = values else {
            return Err(Error::usage(format!(
                "expected 3 arguments (channel family protocol), got {}",
                values.len()
            )));
        };

        let channel = parse_int("channel descriptor", channel.as_ref())?;
        if channel < 0 {
            return Err(Error::usage(format!(
                "invalid channel descriptor '{}'",
                channel
            )));
        }

        Ok(Invocation {
            channel,
            family: parse_int("address family", family.as_ref())?,
            protocol: parse_int("protocol", protocol.as_ref())?,
        })
    }
}

/// Parse the helper's command line.
///
/// Every positional value is echoed to `diag` before validation so a
/// rejected invocation can still be inspected.
pub fn parse_args(mut parser: lexopt::Parser, diag: &Diag) -> Result<Action, Error> {
    use lexopt::prelude::*;

    let mut values = Vec::new();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => return Ok(Action::Help),
            Short('V') | Long("version") => return Ok(Action::Version),
            Value(val) => {
                let s = val
                    .into_string()
                    .map_err(|v| Error::usage(format!("invalid argument {:?}", v)))?;
                values.push(s);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    diag.log(format_args!("Arguments: {}", values.len()));
    for (i, value) in values.iter().enumerate() {
        diag.log(format_args!("  Arg #{}: {}", i + 1, value));
    }

    Invocation::from_values(&values[..]).map(Action::Run)
}
