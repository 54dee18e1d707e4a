// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    super::{default_interpreter_config, TESTS_DIR},
    crate::{eval, eval_file, eval_with_mode, globals, EvalMode, ScopedInterpreter},
    pyo3::{
        exceptions::{PyRuntimeError, PySyntaxError},
        prelude::*,
        types::{IntoPyDict, PyCFunction, PyDict, PyTuple},
    },
    rusty_fork::rusty_fork_test,
    std::{
        io::Write,
        path::PathBuf,
        sync::{
            atomic::{AtomicI64, Ordering},
            Arc,
        },
    },
};

fn call_test(py: Python) -> &PyCFunction {
    PyCFunction::new_closure(py, None, None, |_args: &PyTuple, _kwargs: Option<&PyDict>| 42i64)
        .unwrap()
}

fn get_i64(dict: &PyDict, key: &str) -> i64 {
    dict.get_item(key).unwrap().unwrap().extract().unwrap()
}

#[test]
fn eval_mode_from_str() {
    assert_eq!("expression".parse::<EvalMode>(), Ok(EvalMode::Expression));
    assert_eq!("eval".parse::<EvalMode>(), Ok(EvalMode::Expression));
    assert_eq!("single".parse::<EvalMode>(), Ok(EvalMode::SingleStatement));
    assert_eq!("statements".parse::<EvalMode>(), Ok(EvalMode::Statements));
    assert_eq!("exec".parse::<EvalMode>(), Ok(EvalMode::Statements));
    assert!("bogus".parse::<EvalMode>().is_err());

    assert_eq!(EvalMode::SingleStatement.compile_mode(), "single");
}

rusty_fork_test! {
    #[test]
    fn eval_statements() {
        let interp = ScopedInterpreter::new().unwrap();

        interp.with_gil(|py| {
            let locals = PyDict::new(py);
            locals.set_item("call_test", call_test(py)).unwrap();
            let globals = globals(py).unwrap();

            eval_with_mode(
                py,
                EvalMode::Statements,
                "message = 'Hello World!'\nx = call_test()",
                Some(globals),
                Some(locals),
            )
            .unwrap();
            assert_eq!(get_i64(locals, "x"), 42);

            // Indented multi-line literal.
            let res = eval_with_mode(
                py,
                EvalMode::Statements,
                r#"
                if x == 42:
                    x = 43
                else:
                    raise RuntimeError
                "#,
                Some(globals),
                Some(locals),
            )
            .unwrap();

            assert_eq!(get_i64(locals, "x"), 43);
            assert!(res.is_none());
        });
    }

    #[test]
    fn eval_expression() {
        let interp = ScopedInterpreter::new().unwrap();

        interp.with_gil(|py| {
            let locals = [("x", 42)].into_py_dict(py);
            let x: i64 = eval(py, "x+1", Some(globals(py).unwrap()), Some(locals))
                .unwrap()
                .extract()
                .unwrap();
            assert_eq!(x, 43);

            let err = eval(py, "nonsense code ...", None, None).unwrap_err();
            assert!(err.is_instance_of::<PySyntaxError>(py));
            assert!(err.to_string().contains("invalid syntax"));
        });
    }

    #[test]
    fn eval_single_statement() {
        let interp = ScopedInterpreter::new().unwrap();

        interp.with_gil(|py| {
            let locals = PyDict::new(py);
            locals.set_item("call_test", call_test(py)).unwrap();

            let res = eval_with_mode(
                py,
                EvalMode::SingleStatement,
                "x = call_test()",
                Some(PyDict::new(py)),
                Some(locals),
            )
            .unwrap();

            assert!(res.is_none());
            assert_eq!(get_i64(locals, "x"), 42);
        });
    }

    #[test]
    fn eval_defaults_to_main_globals() {
        let interp = ScopedInterpreter::new().unwrap();

        interp.with_gil(|py| {
            eval_with_mode(py, EvalMode::Statements, "answer = 6 * 7", None, None).unwrap();
            assert_eq!(get_i64(globals(py).unwrap(), "answer"), 42);

            let answer: i64 = eval(py, "answer", None, None).unwrap().extract().unwrap();
            assert_eq!(answer, 42);
        });
    }

    #[test]
    fn eval_file_calls_host_function() {
        let interp = ScopedInterpreter::with_config(&default_interpreter_config()).unwrap();

        let val_out = Arc::new(AtomicI64::new(0));

        interp.with_gil(|py| {
            let sink = val_out.clone();
            let call_test2 = PyCFunction::new_closure(
                py,
                None,
                None,
                move |args: &PyTuple, _kwargs: Option<&PyDict>| -> PyResult<()> {
                    sink.store(args.get_item(0)?.extract()?, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap();

            let locals = PyDict::new(py);
            locals.set_item("y", 43).unwrap();
            locals.set_item("call_test2", call_test2).unwrap();

            let path = PathBuf::from(TESTS_DIR).join("test_eval_call.py");
            let res = eval_file(py, &path, Some(globals(py).unwrap()), Some(locals)).unwrap();
            assert!(res.is_none());

            let err = eval_file(py, "non-existing file", None, None).unwrap_err();
            assert!(err.is_instance_of::<PyRuntimeError>(py));
            assert!(err.to_string().contains("could not be opened!"));
        });

        assert_eq!(val_out.load(Ordering::SeqCst), 43);
    }

    #[test]
    fn eval_file_sets_file_and_honors_encoding() {
        let td = tempfile::Builder::new().prefix("pyhost-test-").tempdir().unwrap();
        let path = td.path().join("latin1.py");

        let mut fh = std::fs::File::create(&path).unwrap();
        fh.write_all(b"# -*- coding: latin-1 -*-\nvalue = '\xe9'\nfilename = __file__\n")
            .unwrap();
        drop(fh);

        let interp = ScopedInterpreter::new().unwrap();

        interp.with_gil(|py| {
            let scope = PyDict::new(py);
            eval_file(py, &path, Some(scope), None).unwrap();

            let value: String = scope.get_item("value").unwrap().unwrap().extract().unwrap();
            assert_eq!(value, "\u{e9}");

            let filename: String = scope.get_item("filename").unwrap().unwrap().extract().unwrap();
            assert_eq!(PathBuf::from(filename), path);
        });
    }

    #[test]
    fn eval_file_reports_filename() {
        let td = tempfile::Builder::new().prefix("pyhost-test-").tempdir().unwrap();
        let path = td.path().join("broken.py");
        std::fs::write(&path, "def broken(:\n    pass\n").unwrap();

        let interp = ScopedInterpreter::new().unwrap();

        interp.with_gil(|py| {
            let err = eval_file(py, &path, Some(PyDict::new(py)), None).unwrap_err();
            assert!(err.is_instance_of::<PySyntaxError>(py));

            let filename: String = err.value(py).getattr("filename").unwrap().extract().unwrap();
            assert_eq!(PathBuf::from(filename), path);
        });
    }
}
