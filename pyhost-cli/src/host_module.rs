// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `pyhost` module exposed to evaluated code.

use pyhost::{
    pyo3::{
        prelude::*,
        types::{PyCFunction, PyDict, PyTuple},
    },
    EmbeddedModule,
};

pub struct HostModule;

impl EmbeddedModule for HostModule {
    const NAME: &'static str = "pyhost";

    fn initialize(py: Python<'_>, module: &PyModule) -> PyResult<()> {
        let add = PyCFunction::new_closure(
            py,
            Some("add"),
            Some("add(i, j)\n--\n\nAdd two integers."),
            |args: &PyTuple, _kwargs: Option<&PyDict>| -> PyResult<i64> {
                let (i, j): (i64, i64) = args.extract()?;
                Ok(i + j)
            },
        )?;

        module.setattr("add", add)?;
        module.setattr("version", env!("CARGO_PKG_VERSION"))
    }
}
