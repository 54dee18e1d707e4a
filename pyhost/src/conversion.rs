// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge Rust and Python string types.

use {
    pyo3::{ffi as pyffi, prelude::*, types::PyList},
    std::ffi::{OsStr, OsString},
};

#[cfg(unix)]
use {std::os::raw::c_char, std::os::unix::ffi::OsStrExt};

#[cfg(windows)]
use std::os::windows::prelude::OsStrExt;

/// Convert an [OsStr] to a Python `str`.
///
/// On POSIX the raw bytes are decoded with the filesystem encoding and
/// error handler, so undecodable bytes survive as surrogates.
#[cfg(unix)]
pub fn osstr_to_pyobject<'py>(py: Python<'py>, s: &OsStr) -> PyResult<&'py PyAny> {
    let b = s.as_bytes();

    unsafe {
        let o = pyffi::PyUnicode_DecodeFSDefaultAndSize(
            b.as_ptr() as *const c_char,
            b.len() as pyffi::Py_ssize_t,
        );
        py.from_owned_ptr_or_err(o)
    }
}

#[cfg(windows)]
pub fn osstr_to_pyobject<'py>(py: Python<'py>, s: &OsStr) -> PyResult<&'py PyAny> {
    let w: Vec<u16> = s.encode_wide().collect();

    unsafe {
        let o = pyffi::PyUnicode_FromWideChar(w.as_ptr(), w.len() as pyffi::Py_ssize_t);
        py.from_owned_ptr_or_err(o)
    }
}

/// Replace `sys.argv` with the given arguments.
pub fn set_argv(py: Python, args: &[OsString]) -> PyResult<()> {
    let args = args
        .iter()
        .map(|arg| osstr_to_pyobject(py, arg))
        .collect::<PyResult<Vec<_>>>()?;

    py.import("sys")?.setattr("argv", PyList::new(py, args))
}
