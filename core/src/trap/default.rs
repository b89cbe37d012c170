// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::io::Write;

use crate::Error;
use crate::trap::Trap;

/// Reports appender failures on standard error, one line per error.
///
/// Lines are prefixed with `sharelog:` so they can be told apart from the application's own
/// output. Nothing is reported when standard error is closed.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl DefaultTrap {
    fn report(out: &mut impl Write, err: &Error) -> io::Result<()> {
        writeln!(out, "sharelog: {err}")
    }
}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _ = Self::report(&mut io::stderr().lock(), err);
    }
}
