// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manage the lifecycle of the embedded Python interpreter.

use {
    crate::{
        config::InterpreterConfig,
        conversion::{osstr_to_pyobject, set_argv},
        error::{HostError, Result},
        module::install_module_table,
    },
    log::{debug, warn},
    once_cell::sync::Lazy,
    pyo3::{
        ffi as pyffi,
        prelude::*,
        types::{PyDict, PyList},
    },
    std::{
        marker::PhantomData,
        sync::{Mutex, MutexGuard, PoisonError},
        thread::{self, ThreadId},
    },
};

/// Process-wide state of an interpreter started by this crate.
struct LifecycleState {
    /// Thread state of the initializing thread, saved when the GIL was
    /// released after initialization.
    main_thread_state: *mut pyffi::PyThreadState,
    /// Thread that initialized the interpreter.
    owner: Option<ThreadId>,
}

// The thread state pointer is only dereferenced by the runtime, on the
// owning thread.
unsafe impl Send for LifecycleState {}

static LIFECYCLE: Lazy<Mutex<LifecycleState>> = Lazy::new(|| {
    Mutex::new(LifecycleState {
        main_thread_state: std::ptr::null_mut(),
        owner: None,
    })
});

fn lifecycle() -> MutexGuard<'static, LifecycleState> {
    LIFECYCLE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether a Python interpreter is running in this process.
pub fn is_initialized() -> bool {
    unsafe { pyffi::Py_IsInitialized() != 0 }
}

fn configure_interpreter(py: Python, config: &InterpreterConfig) -> PyResult<()> {
    // Associates the initializing thread with threading's main thread, which
    // avoids an AssertionError at finalization.
    py.import("threading")?;

    let sys = py.import("sys")?;
    let sys_path: &PyList = sys.getattr("path")?.downcast()?;

    // Make .py files in the working directory available by default.
    if config.append_current_dir {
        sys_path.append(".")?;
    }

    for path in &config.sys_paths {
        sys_path.append(osstr_to_pyobject(py, path.as_os_str())?)?;
    }

    if let Some(argv) = &config.argv {
        set_argv(py, argv)?;
    }

    Ok(())
}

/// Finalize with the GIL held by the calling thread.
///
/// # Safety
///
/// The calling thread must hold the GIL and no Python objects may be used
/// afterwards.
unsafe fn finalize_locked(state: &mut LifecycleState) -> Result<()> {
    state.main_thread_state = std::ptr::null_mut();
    state.owner = None;

    debug!("finalizing Python interpreter");
    if pyffi::Py_FinalizeEx() != 0 {
        warn!("Py_FinalizeEx() reported an error");
        return Err(HostError::Finalize);
    }

    Ok(())
}

/// Initialize, returning whether this call started the interpreter.
fn initialize(config: &InterpreterConfig) -> Result<bool> {
    let mut state = lifecycle();

    if is_initialized() {
        debug!("Python interpreter already initialized; nothing to do");
        return Ok(false);
    }

    install_module_table()?;

    debug!(
        "initializing Python interpreter (signal handlers: {})",
        config.init_signal_handlers
    );
    unsafe {
        pyffi::Py_InitializeEx(if config.init_signal_handlers { 1 } else { 0 });
    }
    state.owner = Some(thread::current().id());

    // Py_InitializeEx() leaves the GIL held by this thread.
    let res = Python::with_gil(|py| {
        configure_interpreter(py, config)
            .map_err(|err| HostError::from_pyerr(py, err, "configuring interpreter"))
    });

    if let Err(err) = res {
        // The GIL is still held. Tear down so a later attempt starts clean.
        if let Err(finalize_err) = unsafe { finalize_locked(&mut state) } {
            warn!("{}", finalize_err);
        }

        return Err(err);
    }

    // Release the GIL so any thread can enter via Python::with_gil().
    state.main_thread_state = unsafe { pyffi::PyEval_SaveThread() };

    Ok(true)
}

/// Initialize the Python interpreter.
///
/// No Python APIs can be called before this is done, with the exception of
/// registering modules via [add_embedded_module](crate::add_embedded_module).
/// `init_signal_handlers` controls whether Python installs its signal
/// handlers (see the documentation of `Py_InitializeEx`).
///
/// Calling this while an interpreter is already running is a no-op.
///
/// `.` is appended to `sys.path` so `.py` files in the working directory are
/// importable. Upon return the GIL is released; enter the interpreter with
/// [Python::with_gil].
pub fn initialize_interpreter(init_signal_handlers: bool) -> Result<()> {
    initialize_interpreter_with_config(&InterpreterConfig {
        init_signal_handlers,
        ..InterpreterConfig::default()
    })
}

/// Initialize the Python interpreter from an [InterpreterConfig].
///
/// Behaves like [initialize_interpreter] otherwise.
pub fn initialize_interpreter_with_config(config: &InterpreterConfig) -> Result<()> {
    initialize(config).map(|_| ())
}

/// Shut down the Python interpreter.
///
/// No Python APIs can be called after this. In addition, Python objects must
/// not outlive the interpreter: drop every `Py<T>` before calling this.
///
/// Must be called from the thread that initialized the interpreter and
/// outside of [Python::with_gil]. Calling this when no interpreter is running
/// is a no-op. If the host started the interpreter through the C API, it must
/// release the GIL (`PyEval_SaveThread`) before calling this.
///
/// Python cannot unload binary extension modules. If the interpreter is
/// initialized again, the initializers of those modules run a second time and
/// may fail. This is a known CPython limitation. pyo3 also caches type
/// objects for the lifetime of the process, so a `#[pyclass]` added by an
/// [EmbeddedModule](crate::EmbeddedModule) refers to a dead interpreter after
/// a restart. Only register classes in processes that start the interpreter
/// once.
pub fn finalize_interpreter() -> Result<()> {
    let mut state = lifecycle();

    if !is_initialized() {
        return Ok(());
    }

    if let Some(owner) = state.owner {
        if owner != thread::current().id() {
            return Err(HostError::WrongThread);
        }
    }

    unsafe {
        // A GIL guard further up the stack would release its thread state
        // against a finalized runtime.
        if pyffi::PyGILState_Check() != 0 {
            return Err(HostError::GilHeld);
        }

        if state.main_thread_state.is_null() {
            // Started by someone else. Attach this thread before tearing down.
            pyffi::PyGILState_Ensure();
        } else {
            pyffi::PyEval_RestoreThread(state.main_thread_state);
        }

        finalize_locked(&mut state)
    }
}

/// Scope guard version of [initialize_interpreter] and [finalize_interpreter].
///
/// ```ignore
/// let interp = pyhost::ScopedInterpreter::new()?;
/// interp.with_gil(|py| py.run("print('Hello, World!')", None, None))?;
/// ```
///
/// If an interpreter was already running when the guard was created, the
/// guard leaves it running when dropped.
///
/// The guard must be dropped on the thread that created it, so it is
/// neither `Send` nor `Sync`.
///
/// Creating another guard after one has finalized the interpreter restarts
/// it. See [finalize_interpreter] for what does not survive a restart, in
/// particular `#[pyclass]` types registered by embedded modules.
pub struct ScopedInterpreter {
    owns_interpreter: bool,
    _not_send: PhantomData<*const ()>,
}

impl ScopedInterpreter {
    /// Initialize an interpreter with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&InterpreterConfig::default())
    }

    /// Initialize an interpreter from a configuration.
    pub fn with_config(config: &InterpreterConfig) -> Result<Self> {
        let owns_interpreter = initialize(config)?;

        Ok(Self {
            owns_interpreter,
            _not_send: PhantomData,
        })
    }

    /// Whether this guard started the interpreter and will finalize it.
    pub fn owns_interpreter(&self) -> bool {
        self.owns_interpreter
    }

    /// Run a closure with the GIL held.
    pub fn with_gil<F, R>(&self, f: F) -> R
    where
        F: for<'py> FnOnce(Python<'py>) -> R,
    {
        Python::with_gil(f)
    }
}

impl Drop for ScopedInterpreter {
    fn drop(&mut self) {
        if self.owns_interpreter {
            if let Err(err) = finalize_interpreter() {
                warn!("error finalizing Python interpreter: {}", err);
            }
        }
    }
}

/// Return the `__main__` module.
pub fn main_module(py: Python) -> PyResult<&PyModule> {
    py.import("__main__")
}

/// Return the global symbol table, i.e. `__main__.__dict__`.
pub fn globals(py: Python) -> PyResult<&PyDict> {
    Ok(main_module(py)?.dict())
}
