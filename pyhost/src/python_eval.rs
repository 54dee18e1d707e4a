// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Functionality for evaluating Python code.

use {
    crate::{conversion::osstr_to_pyobject, interpreter::globals as main_globals},
    pyo3::{
        exceptions::PyRuntimeError,
        prelude::*,
        types::{PyBytes, PyDict, PyString},
    },
    std::{borrow::Cow, path::Path, str::FromStr},
};

/// How source code is compiled before it is evaluated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvalMode {
    /// A single expression. Evaluation returns its value.
    Expression,
    /// A single interactive statement. Expression values are passed to
    /// `sys.displayhook`, like in the REPL. Evaluation returns `None`.
    SingleStatement,
    /// A sequence of statements, like a module body. Evaluation returns
    /// `None`.
    Statements,
}

impl EvalMode {
    /// The `mode` argument to Python's `compile()` builtin.
    pub fn compile_mode(&self) -> &'static str {
        match self {
            Self::Expression => "eval",
            Self::SingleStatement => "single",
            Self::Statements => "exec",
        }
    }
}

impl FromStr for EvalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expression" | "eval" => Ok(Self::Expression),
            "single" => Ok(Self::SingleStatement),
            "statements" | "exec" => Ok(Self::Statements),
            _ => Err(format!("unknown evaluation mode: {}", s)),
        }
    }
}

/// Support raw string literals by removing common leading whitespace.
///
/// Only applies when the source begins with a newline, which is how an
/// indented multi-line literal starts.
fn dedent_source<'a>(py: Python, source: &'a str) -> PyResult<Cow<'a, str>> {
    if source.starts_with('\n') {
        let dedented = py
            .import("textwrap")?
            .call_method1("dedent", (source,))?
            .extract::<String>()?;

        Ok(Cow::Owned(dedented))
    } else {
        Ok(Cow::Borrowed(source))
    }
}

fn compile_and_eval<'py>(
    py: Python<'py>,
    mode: EvalMode,
    source: &'py PyAny,
    filename: &'py PyAny,
    globals: Option<&'py PyDict>,
    locals: Option<&'py PyDict>,
) -> PyResult<&'py PyAny> {
    let globals = match globals {
        Some(globals) => globals,
        None => main_globals(py)?,
    };
    let locals = locals.unwrap_or(globals);

    // eval() inserts __builtins__ into globals when it is missing.
    let builtins = py.import("builtins")?;
    let code = builtins.call_method1("compile", (source, filename, mode.compile_mode()))?;

    builtins.call_method1("eval", (code, globals, locals))
}

/// Evaluate Python source code using the given compile mode.
///
/// `globals` defaults to `__main__.__dict__` and `locals` defaults to
/// `globals`.
pub fn eval_with_mode<'py>(
    py: Python<'py>,
    mode: EvalMode,
    source: &str,
    globals: Option<&'py PyDict>,
    locals: Option<&'py PyDict>,
) -> PyResult<&'py PyAny> {
    let source = dedent_source(py, source)?;

    compile_and_eval(
        py,
        mode,
        PyString::new(py, &source),
        PyString::new(py, "<string>"),
        globals,
        locals,
    )
}

/// Evaluate a Python expression and return its value.
pub fn eval<'py>(
    py: Python<'py>,
    source: &str,
    globals: Option<&'py PyDict>,
    locals: Option<&'py PyDict>,
) -> PyResult<&'py PyAny> {
    eval_with_mode(py, EvalMode::Expression, source, globals, locals)
}

/// Evaluate a Python source file as a sequence of statements.
pub fn eval_file<'py>(
    py: Python<'py>,
    path: impl AsRef<Path>,
    globals: Option<&'py PyDict>,
    locals: Option<&'py PyDict>,
) -> PyResult<&'py PyAny> {
    eval_file_with_mode(py, EvalMode::Statements, path, globals, locals)
}

/// Evaluate a Python source file using the given compile mode.
///
/// The file is compiled with its path as the code filename so tracebacks
/// reference it, and encoding declarations in the file are honored.
/// `__file__` is set in `globals` if not already defined.
pub fn eval_file_with_mode<'py>(
    py: Python<'py>,
    mode: EvalMode,
    path: impl AsRef<Path>,
    globals: Option<&'py PyDict>,
    locals: Option<&'py PyDict>,
) -> PyResult<&'py PyAny> {
    let path = path.as_ref();

    let data = std::fs::read(path).map_err(|_| {
        PyRuntimeError::new_err(format!("File \"{}\" could not be opened!", path.display()))
    })?;

    let globals = match globals {
        Some(globals) => globals,
        None => main_globals(py)?,
    };

    let filename = osstr_to_pyobject(py, path.as_os_str())?;

    if !globals.contains("__file__")? {
        globals.set_item("__file__", filename)?;
    }

    compile_and_eval(
        py,
        mode,
        PyBytes::new(py, &data),
        filename,
        Some(globals),
        locals,
    )
}
