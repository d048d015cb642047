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

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::io::{self, Write};

/// Environment variable that turns on diagnostic output at startup.
pub const VERBOSE_ENV: &str = "RAWSOCKET_HELPER_VERBOSE";

/// Diagnostic sink for the helper.
///
/// Built once in `main` and passed down by reference. When verbose, trace
/// lines go to stdout; otherwise everything is discarded. Output is never
/// part of the helper's contract, so write errors are ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct Diag {
    verbose: bool,
}

impl Diag {
    pub fn new(verbose: bool) -> Self {
        Diag { verbose }
    }

    /// Verbose if built with the `verbose` feature or if [`VERBOSE_ENV`] is
    /// set to anything other than an empty string, `0` or `false`.
    pub fn from_env() -> Self {
        let var = env::var_os(VERBOSE_ENV);
        Diag::new(cfg!(feature = "verbose") || enabled_by(var.as_deref()))
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn log(&self, args: fmt::Arguments) {
        if self.verbose {
            let mut out = io::stdout().lock();
            let _ = out.write_fmt(args);
            let _ = out.write_all(b"\n");
            let _ = out.flush();
        }
    }
}

fn enabled_by(value: Option<&OsStr>) -> bool {
    match value.and_then(OsStr::to_str) {
        None => value.is_some(),
        Some(s) => !matches!(s.trim(), "" | "0") && !s.trim().eq_ignore_ascii_case("false"),
    }
}
