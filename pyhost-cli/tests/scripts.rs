// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runs every `tests/scripts/*.py` through `pyhost run`.
//!
//! Each script is paired with files sharing its stem:
//!
//! * `.stdout` (required): expected standard output.
//! * `.args` (optional): arguments passed after the script, one per line.
//! * `.status` (optional): expected exit code. Defaults to 0.

use {
    anyhow::{Context, Result},
    assert_cmd::Command,
    libtest_mimic::{Arguments, Trial},
    predicates::prelude::*,
    std::path::{Path, PathBuf},
};

fn read_optional(path: &Path) -> Result<Option<String>> {
    if path.exists() {
        Ok(Some(std::fs::read_to_string(path).with_context(|| {
            format!("reading {}", path.display())
        })?))
    } else {
        Ok(None)
    }
}

fn run_script(script_path: &Path) -> Result<()> {
    let expected_stdout = std::fs::read_to_string(script_path.with_extension("stdout"))
        .with_context(|| format!("reading expected output of {}", script_path.display()))?;

    let args = read_optional(&script_path.with_extension("args"))?
        .map(|data| data.lines().map(String::from).collect::<Vec<_>>())
        .unwrap_or_default();

    let status = match read_optional(&script_path.with_extension("status"))? {
        Some(data) => data.trim().parse::<i32>().context("parsing expected status")?,
        None => 0,
    };

    Command::cargo_bin("pyhost")?
        .arg("run")
        .arg(script_path)
        .args(&args)
        .assert()
        .code(status)
        .stdout(predicate::eq(expected_stdout.as_str()).normalize());

    Ok(())
}

fn main() -> Result<()> {
    let args = Arguments::from_args();

    let tests = glob::glob("tests/scripts/*.py")?
        .collect::<Result<Vec<PathBuf>, _>>()?
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            Trial::test(name, move || run_script(&path).map_err(Into::into))
        })
        .collect::<Vec<_>>();

    libtest_mimic::run(&args, tests).exit();
}
