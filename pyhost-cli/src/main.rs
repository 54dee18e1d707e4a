// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod cli;
mod host_module;
mod interpreter;

fn main() {
    // Python errors are reported by the interpreter and already folded into
    // the exit code. Anything reaching here happened outside of Python.
    let exit_code = cli::run().unwrap_or_else(|err| {
        eprintln!("error: {:?}", err);
        1
    });

    std::process::exit(exit_code);
}
