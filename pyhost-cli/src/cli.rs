// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::interpreter::{eval_code, load_config, run_file},
    anyhow::{anyhow, Result},
    clap::{value_parser, Arg, ArgAction, Command},
    log::LevelFilter,
    pyhost::EvalMode,
    std::{ffi::OsString, path::PathBuf},
};

const PYHOST_VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();
}

pub fn run() -> Result<i32> {
    let app = Command::new("pyhost")
        .arg_required_else_help(true)
        .version(PYHOST_VERSION)
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Run Python code in an embedded interpreter")
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times."),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("YAML file describing how to configure the interpreter"),
        );

    let app = app.subcommand(
        Command::new("run")
            .about("Evaluate a Python file as the __main__ module")
            .arg_required_else_help(true)
            .arg(
                Arg::new("path")
                    .required(true)
                    .value_name("FILE")
                    .value_parser(value_parser!(PathBuf))
                    .help("Path to Python file to evaluate"),
            )
            .arg(
                Arg::new("args")
                    .action(ArgAction::Append)
                    .num_args(0..)
                    .value_parser(value_parser!(OsString))
                    .trailing_var_arg(true)
                    .allow_hyphen_values(true)
                    .help("Arguments made available via sys.argv"),
            ),
    );

    let app = app.subcommand(
        Command::new("eval")
            .about("Evaluate a snippet of Python code")
            .arg_required_else_help(true)
            .arg(
                Arg::new("mode")
                    .long("mode")
                    .value_parser(["expression", "single", "statements"])
                    .default_value("expression")
                    .help("How the code is compiled"),
            )
            .arg(
                Arg::new("code")
                    .required(true)
                    .value_name("CODE")
                    .help("Python source code"),
            ),
    );

    let matches = app.get_matches();

    init_logging(matches.get_count("verbose"));

    let config = load_config(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))?;

    match matches.subcommand() {
        Some(("run", args)) => {
            let path = args
                .get_one::<PathBuf>("path")
                .ok_or_else(|| anyhow!("path should be set"))?;
            let program_args = args
                .get_many::<OsString>("args")
                .unwrap_or_default()
                .cloned()
                .collect::<Vec<_>>();

            run_file(config, path, &program_args)
        }
        Some(("eval", args)) => {
            let mode = args
                .get_one::<String>("mode")
                .ok_or_else(|| anyhow!("mode should be set"))?
                .parse::<EvalMode>()
                .map_err(|e| anyhow!(e))?;
            let code = args
                .get_one::<String>("code")
                .ok_or_else(|| anyhow!("code should be set"))?;

            eval_code(config, mode, code)
        }
        _ => Err(anyhow!("invalid sub-command")),
    }
}
