// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Start, use, and stop an embedded Python interpreter.

The `pyhost` crate manages the lifecycle of a Python interpreter running in
the current process and provides helpers for evaluating Python source from
strings and files. Values and callables cross the language boundary through
[pyo3], which this crate re-exports.

The most important items in this crate are:

* [initialize_interpreter] and [finalize_interpreter], which start and stop
  the process-global interpreter.
* [ScopedInterpreter], a guard that does both for a lexical scope.
* [EmbeddedModule] and [add_embedded_module], which expose modules
  implemented by the host as Python builtins.
* [eval], [eval_with_mode], and [eval_file], which run Python source.

```ignore
use pyhost::{pyo3::prelude::*, ScopedInterpreter};

let interp = ScopedInterpreter::new()?;
interp.with_gil(|py| -> PyResult<()> {
    let value: i64 = pyhost::eval(py, "6 * 7", None, None)?.extract()?;
    assert_eq!(value, 42);
    Ok(())
})?;
```

# Dependencies

Under the hood, `pyhost` uses the `pyo3` crate for interfacing with the
Python C API. Process-global state is kept in `once_cell` statics and
lifecycle events are reported through the `log` facade.
*/

mod config;
mod conversion;
mod error;
mod interpreter;
mod module;
mod python_eval;

#[cfg(test)]
mod test;

pub use pyo3;

pub use crate::{
    config::InterpreterConfig,
    conversion::{osstr_to_pyobject, set_argv},
    error::{HostError, Result},
    interpreter::{
        finalize_interpreter, globals, initialize_interpreter,
        initialize_interpreter_with_config, is_initialized, main_module, ScopedInterpreter,
    },
    module::{
        add_embedded_module, add_extension_module, registered_modules, EmbeddedModule,
        ExtensionModule, ModuleInitFunc,
    },
    python_eval::{eval, eval_file, eval_file_with_mode, eval_with_mode, EvalMode},
};
