// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data structures for configuring an embedded Python interpreter.

use std::{ffi::OsString, path::PathBuf};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Defines how an embedded interpreter is started.
///
/// The default value reproduces what
/// [initialize_interpreter(true)](crate::initialize_interpreter) does.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serialization", serde(default, rename_all = "kebab-case"))]
pub struct InterpreterConfig {
    /// Whether Python installs its signal handlers.
    ///
    /// See https://docs.python.org/3/c-api/init.html#c.Py_InitializeEx.
    pub init_signal_handlers: bool,

    /// Whether to append `.` to `sys.path`.
    ///
    /// This makes `.py` files in the current working directory importable.
    pub append_current_dir: bool,

    /// Additional filesystem paths to append to `sys.path`.
    ///
    /// These are added after `.`, in order.
    pub sys_paths: Vec<PathBuf>,

    /// Value for `sys.argv`.
    ///
    /// If `None`, `sys.argv` is left as Python initializes it. Not
    /// serialized: raw OS strings have no portable text form.
    #[cfg_attr(feature = "serialization", serde(skip))]
    pub argv: Option<Vec<OsString>>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            init_signal_handlers: true,
            append_current_dir: true,
            sys_paths: vec![],
            argv: None,
        }
    }
}
