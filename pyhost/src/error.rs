// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {
    pyo3::{prelude::*, PyErr},
    thiserror::Error,
};

/// Format a PyErr in a crude manner.
///
/// This is meant to be called during interpreter initialization. We can't
/// call PyErr_Print() because sys.stdout may not be available yet.
fn format_pyerr(py: Python, err: &PyErr) -> Result<String, &'static str> {
    let type_repr = err
        .get_type(py)
        .repr()
        .map_err(|_| "unable to get repr of error type")?;

    let value_repr = err
        .value(py)
        .repr()
        .map_err(|_| "unable to get repr of error value")?;

    Ok(format!(
        "{}: {}",
        type_repr.to_string_lossy(),
        value_repr.to_string_lossy()
    ))
}

/// Primary crate error type.
///
/// Python exceptions raised by evaluated code are not represented here:
/// evaluation functions return [PyResult] so callers see the original
/// exception.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("can't add new modules after the interpreter has been initialized")]
    AlreadyInitialized,

    #[error("an embedded module named {0} is already registered")]
    DuplicateModule(String),

    #[error("invalid embedded module name: {0:?}")]
    InvalidModuleName(String),

    #[error("insufficient memory to add a new module")]
    InittabAllocation,

    #[error("the interpreter must be finalized by the thread that initialized it")]
    WrongThread,

    #[error("cannot finalize the interpreter while this thread holds the GIL")]
    GilHeld,

    #[error("error finalizing the interpreter; buffered data may not have been flushed")]
    Finalize,

    #[error("during {context}: {message}")]
    Python { context: String, message: String },
}

impl HostError {
    /// Construct an instance from a Python exception raised during `context`.
    pub fn from_pyerr(py: Python, err: PyErr, context: &str) -> Self {
        let message = match format_pyerr(py, &err) {
            Ok(value) => value,
            Err(msg) => msg.to_string(),
        };

        HostError::Python {
            context: context.to_string(),
            message,
        }
    }
}

/// Result type for this crate.
pub type Result<T, E = HostError> = std::result::Result<T, E>;
