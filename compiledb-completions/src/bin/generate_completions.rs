// SPDX-License-Identifier: GPL-3.0-or-later

//! Generates the shell completion scripts of `compiledb`.
//!
//! Usage: `generate-completions <OUT_DIR>`, writes one script per supported
//! shell into the given directory.

use clap::ValueEnum;
use clap_complete::{Shell, generate_to};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(out_dir) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: generate-completions <OUT_DIR>");
        return ExitCode::FAILURE;
    };
    if let Err(error) = std::fs::create_dir_all(&out_dir) {
        eprintln!("Failed to create '{}': {error}", out_dir.display());
        return ExitCode::FAILURE;
    }

    let mut command = compiledb::args::cli();
    for shell in Shell::value_variants() {
        match generate_to(*shell, &mut command, "compiledb", &out_dir) {
            Ok(path) => println!("Generated {}", path.display()),
            Err(error) => {
                eprintln!("Failed to generate {shell} completion: {error}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
