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

// Install with only the capability it needs, e.g.
//
//   chown root:yourgroup rawsocket-helper
//   chmod 750 rawsocket-helper
//   setcap cap_net_raw+ep rawsocket-helper

use std::process::exit;

use rawsocket::{Action, Diag, Error};

fn print_usage() {
    eprintln!("Usage: rawsocket-helper CHANNEL_FD FAMILY PROTOCOL");
    eprintln!("Open a raw socket and pass it over an inherited AF_UNIX socket.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  CHANNEL_FD       Inherited descriptor connected to the requesting process");
    eprintln!("  FAMILY           Address family, e.g. 2 for AF_INET");
    eprintln!("  PROTOCOL         Protocol, e.g. 1 for IPPROTO_ICMP");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -h, --help       Print help");
    eprintln!("  -V, --version    Print version");
    eprintln!();
    eprintln!("Set {}=1 to trace progress on stdout.", rawsocket::diag::VERBOSE_ENV);
}

fn fail(e: Error) -> ! {
    eprintln!("rawsocket-helper: {}", e);
    exit(1);
}

fn main() {
    let diag = Diag::from_env();

    let invocation = match rawsocket::parse_args(lexopt::Parser::from_env(), &diag) {
        Ok(Action::Run(invocation)) => invocation,
        Ok(Action::Help) => {
            print_usage();
            exit(0);
        }
        Ok(Action::Version) => {
            println!("rawsocket-helper {}", env!("CARGO_PKG_VERSION"));
            exit(0);
        }
        Err(e) => fail(e),
    };

    if let Err(e) = rawsocket::transfer(&invocation, &diag) {
        fail(e);
    }
    diag.log(format_args!("Operation successful"));
}
