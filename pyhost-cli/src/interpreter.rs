// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::host_module::HostModule,
    anyhow::{Context, Result},
    log::debug,
    pyhost::{
        add_embedded_module, eval_file, eval_with_mode,
        pyo3::{exceptions::PySystemExit, prelude::*},
        EvalMode, InterpreterConfig, ScopedInterpreter,
    },
    std::{ffi::OsString, path::Path},
};

/// Load an interpreter configuration from a YAML file.
///
/// The default configuration is used when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<InterpreterConfig> {
    let path = match path {
        Some(path) => path,
        None => return Ok(InterpreterConfig::default()),
    };

    debug!("loading interpreter configuration from {}", path.display());
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    serde_yaml::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the process exit code for an uncaught Python exception.
///
/// Mirrors what `python` does: `SystemExit` carries the exit code, anything
/// else prints a traceback and exits with 1.
fn exit_code_for_error(py: Python, err: PyErr) -> i32 {
    if !err.is_instance_of::<PySystemExit>(py) {
        err.print(py);
        return 1;
    }

    let code = match err.value(py).getattr("code") {
        Ok(code) => code,
        Err(_) => return 1,
    };

    if code.is_none() {
        0
    } else if let Ok(code) = code.extract::<i32>() {
        code
    } else {
        // sys.exit("message") prints the message and exits with 1.
        if let Ok(message) = code.str() {
            eprintln!("{}", message);
        }
        1
    }
}

fn start_interpreter(config: &InterpreterConfig) -> Result<ScopedInterpreter> {
    add_embedded_module::<HostModule>().context("registering pyhost module")?;

    ScopedInterpreter::with_config(config).context("initializing Python interpreter")
}

/// Evaluate a file as `__main__`, with `sys.argv` set to the file and `args`.
pub fn run_file(mut config: InterpreterConfig, path: &Path, args: &[OsString]) -> Result<i32> {
    config.argv = Some(
        std::iter::once(path.as_os_str().to_os_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>(),
    );

    let interp = start_interpreter(&config)?;

    debug!("evaluating {}", path.display());
    Ok(interp.with_gil(|py| match eval_file(py, path, None, None) {
        Ok(_) => 0,
        Err(err) => exit_code_for_error(py, err),
    }))
}

/// Evaluate a snippet of code in `__main__`.
///
/// In expression mode a result other than `None` is printed via its `repr()`.
pub fn eval_code(config: InterpreterConfig, mode: EvalMode, code: &str) -> Result<i32> {
    let interp = start_interpreter(&config)?;

    Ok(interp.with_gil(|py| {
        let res = eval_with_mode(py, mode, code, None, None).and_then(|value| {
            if mode == EvalMode::Expression && !value.is_none() {
                // Printing from Python keeps ordering with output buffered by
                // sys.stdout.
                py.import("builtins")?
                    .getattr("print")?
                    .call1((value.repr()?,))?;
            }

            Ok(())
        });

        match res {
            Ok(()) => 0,
            Err(err) => exit_code_for_error(py, err),
        }
    }))
}
