// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {pyo3_build_config::PythonImplementation, std::path::PathBuf};

fn main() {
    println!("cargo:rerun-if-env-changed=PYO3_CONFIG_FILE");
    println!("cargo:rerun-if-env-changed=PYO3_PYTHON");

    let config = pyo3_build_config::get();

    if config.implementation == PythonImplementation::PyPy {
        panic!("embedding the interpreter is not supported on PyPy");
    }

    // Tests import Python files shipped next to the crate.
    let manifest_dir = PathBuf::from(
        std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR should be set"),
    );
    println!(
        "cargo:rustc-env=PYHOST_TESTS_DIR={}",
        manifest_dir.join("src").join("test").join("py").display()
    );
}
