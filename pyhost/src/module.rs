// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Modules implemented by the host and exposed as Python builtins.

Modules are registered in the interpreter's builtin module table
(`PyImport_Inittab`) and must be registered before the interpreter is
initialized. Once the interpreter is running, `import <name>` finds them
like any module compiled into `libpython`.
*/

use {
    crate::error::{HostError, Result},
    log::debug,
    once_cell::sync::Lazy,
    pyo3::{exceptions::PyImportError, ffi as pyffi, panic::PanicException, prelude::*},
    std::{
        any::Any,
        ffi::CString,
        sync::{Mutex, MutexGuard, PoisonError},
    },
};

/// Signature of a single-phase module initialization function (`PyInit_<name>`).
pub type ModuleInitFunc = unsafe extern "C" fn() -> *mut pyffi::PyObject;

/// A module whose contents are defined by the host program.
///
/// ```ignore
/// struct Calculator;
///
/// impl EmbeddedModule for Calculator {
///     const NAME: &'static str = "calculator";
///
///     fn initialize(py: Python<'_>, module: &PyModule) -> PyResult<()> {
///         module.add_function(wrap_pyfunction!(add, module)?)
///     }
/// }
///
/// pyhost::add_embedded_module::<Calculator>()?;
/// let interp = pyhost::ScopedInterpreter::new()?;
/// ```
pub trait EmbeddedModule {
    /// Name the module is importable under.
    const NAME: &'static str;

    /// Populate a freshly created module object.
    ///
    /// Called once per interpreter, the first time the module is imported.
    fn initialize(py: Python<'_>, module: &PyModule) -> PyResult<()>;
}

/// Defines an extension module backed by a raw initialization function.
///
/// This is how modules produced by `#[pymodule]` or written against the
/// C API are made available to an embedded interpreter.
#[derive(Clone, Debug)]
pub struct ExtensionModule {
    /// Name of the extension module.
    pub name: CString,

    /// Extension module initialization function.
    pub init_func: ModuleInitFunc,
}

struct Registration {
    name: CString,
    init_func: ModuleInitFunc,
    /// Module definition for [EmbeddedModule] registrations.
    ///
    /// Boxed so the address handed to the runtime is stable.
    definition: Option<Box<pyffi::PyModuleDef>>,
}

/// Shadow copy of the runtime's builtin module table.
///
/// CPython has buggy code around memory handling for PyImport_Inittab.
/// See https://github.com/python/cpython/pull/19746. So, we can't trust
/// the official APIs to do the correct thing if the interpreter is
/// initialized more than once per process.
///
/// We maintain our own table and synchronize it to PyImport_Inittab
/// during interpreter initialization so we don't call the broken APIs.
struct ModuleTable {
    /// Entries present in `PyImport_Inittab` before we first touched it.
    original: Option<Vec<pyffi::_inittab>>,
    /// Table currently installed as `PyImport_Inittab`.
    installed: Vec<pyffi::_inittab>,
    registrations: Vec<Registration>,
}

// The raw pointers only reference data owned by the table itself or
// 'static data owned by libpython.
unsafe impl Send for ModuleTable {}

static MODULE_TABLE: Lazy<Mutex<ModuleTable>> = Lazy::new(|| {
    Mutex::new(ModuleTable {
        original: None,
        installed: vec![],
        registrations: vec![],
    })
});

fn module_table() -> MutexGuard<'static, ModuleTable> {
    MODULE_TABLE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_definition(name: &CString) -> Box<pyffi::PyModuleDef> {
    Box::new(pyffi::PyModuleDef {
        m_base: pyffi::PyModuleDef_HEAD_INIT,
        m_name: name.as_ptr(),
        m_doc: std::ptr::null(),
        m_size: -1,
        m_methods: std::ptr::null_mut(),
        m_slots: std::ptr::null_mut(),
        m_traverse: None,
        m_clear: None,
        m_free: None,
    })
}

fn register(name: &str, init_func: ModuleInitFunc, embedded: bool) -> Result<()> {
    if unsafe { pyffi::Py_IsInitialized() } != 0 {
        return Err(HostError::AlreadyInitialized);
    }

    if name.is_empty() {
        return Err(HostError::InvalidModuleName(name.to_string()));
    }
    let c_name =
        CString::new(name).map_err(|_| HostError::InvalidModuleName(name.to_string()))?;

    let mut table = module_table();

    if table.registrations.iter().any(|r| r.name == c_name) {
        return Err(HostError::DuplicateModule(name.to_string()));
    }

    table
        .registrations
        .try_reserve(1)
        .map_err(|_| HostError::InittabAllocation)?;

    let definition = if embedded {
        Some(new_definition(&c_name))
    } else {
        None
    };

    debug!("registering builtin module {}", name);
    table.registrations.push(Registration {
        name: c_name,
        init_func,
        definition,
    });

    Ok(())
}

/// Register an [EmbeddedModule] in the builtin module table.
///
/// Must be called before the interpreter is initialized.
pub fn add_embedded_module<M: EmbeddedModule>() -> Result<()> {
    register(M::NAME, init_embedded_module::<M>, true)
}

/// Register a raw extension module in the builtin module table.
///
/// Must be called before the interpreter is initialized.
pub fn add_extension_module(module: ExtensionModule) -> Result<()> {
    let name = module
        .name
        .to_str()
        .map_err(|_| HostError::InvalidModuleName(module.name.to_string_lossy().to_string()))?
        .to_string();

    register(&name, module.init_func, false)
}

/// Names of modules registered through this crate, in registration order.
pub fn registered_modules() -> Vec<String> {
    module_table()
        .registrations
        .iter()
        .map(|r| r.name.to_string_lossy().to_string())
        .collect()
}

/// Set `PyImport_Inittab` to the original builtins plus our registrations.
///
/// Must be called before the interpreter is initialized.
pub(crate) fn install_module_table() -> Result<()> {
    let mut table = module_table();
    let table = &mut *table;

    // If this is our first time, copy the canonical source to our shadow
    // copy.
    if table.original.is_none() {
        let mut entries = vec![];

        unsafe {
            for i in 0.. {
                let record = pyffi::PyImport_Inittab.offset(i);

                if (*record).name.is_null() {
                    break;
                }

                entries.push(*record);
            }
        }

        table.original = Some(entries);
    }

    let original = table.original.as_deref().unwrap_or_default();

    let mut extensions = Vec::new();
    extensions
        .try_reserve_exact(original.len() + table.registrations.len() + 1)
        .map_err(|_| HostError::InittabAllocation)?;
    extensions.extend_from_slice(original);

    for registration in table.registrations.iter_mut() {
        if let Some(definition) = registration.definition.as_mut() {
            // A previous interpreter may have stashed state in the old
            // definition that the runtime still references. Leak it and
            // start fresh.
            std::mem::forget(std::mem::replace(
                definition,
                new_definition(&registration.name),
            ));
        }

        extensions.push(pyffi::_inittab {
            name: registration.name.as_ptr(),
            initfunc: Some(registration.init_func),
        });
    }

    // Add sentinel record with NULLs.
    extensions.push(pyffi::_inittab {
        name: std::ptr::null(),
        initfunc: None,
    });

    // And finally replace the static in Python's code with our instance.
    table.installed = extensions;
    unsafe {
        pyffi::PyImport_Inittab = table.installed.as_mut_ptr();
    }

    debug!(
        "installed builtin module table with {} host modules",
        table.registrations.len()
    );

    Ok(())
}

fn module_definition(name: &str) -> Option<*mut pyffi::PyModuleDef> {
    module_table()
        .registrations
        .iter_mut()
        .find(|r| r.name.as_bytes() == name.as_bytes())
        .and_then(|r| r.definition.as_mut())
        .map(|definition| &mut **definition as *mut _)
}

fn create_embedded_module<M: EmbeddedModule>(py: Python) -> PyResult<*mut pyffi::PyObject> {
    let definition = module_definition(M::NAME).ok_or_else(|| {
        PyImportError::new_err(format!("embedded module {} is not registered", M::NAME))
    })?;

    let module: &PyModule =
        unsafe { py.from_owned_ptr_or_err(pyffi::PyModule_Create(definition))? };

    M::initialize(py, module)?;

    Ok(IntoPy::<PyObject>::into_py(module, py).into_ptr())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// `PyInit_*` function for an [EmbeddedModule].
///
/// Panics must not unwind into the interpreter, so they are converted to a
/// `PanicException`.
unsafe extern "C" fn init_embedded_module<M: EmbeddedModule>() -> *mut pyffi::PyObject {
    let res = std::panic::catch_unwind(|| {
        Python::with_gil(|py| match create_embedded_module::<M>(py) {
            Ok(module) => module,
            Err(err) => {
                err.restore(py);
                std::ptr::null_mut()
            }
        })
    });

    match res {
        Ok(module) => module,
        Err(payload) => Python::with_gil(|py| {
            PanicException::new_err(format!(
                "panic initializing module {}: {}",
                M::NAME,
                panic_message(payload.as_ref())
            ))
            .restore(py);

            std::ptr::null_mut()
        }),
    }
}
