// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for the embedded interpreter.
//!
//! An interpreter is process-global state, so every test that starts one
//! runs in its own forked process via `rusty_fork_test!`.

use {crate::InterpreterConfig, std::path::PathBuf};

mod eval;

/// Directory holding Python files used by tests.
pub const TESTS_DIR: &str = env!("PYHOST_TESTS_DIR");

/// Obtain an [InterpreterConfig] suitable for use in tests.
///
/// Python files in [TESTS_DIR] are importable.
pub fn default_interpreter_config() -> InterpreterConfig {
    InterpreterConfig {
        sys_paths: vec![PathBuf::from(TESTS_DIR)],
        ..InterpreterConfig::default()
    }
}
