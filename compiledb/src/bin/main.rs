// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Context as AnyhowContext;
use compiledb::output::{OutputWriter, STANDARD_STREAM};
use compiledb::{args, config, context, parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, fs, io};

/// Driver function of the application.
fn main() -> anyhow::Result<ExitCode> {
    // Parse the command line arguments.
    let matches = args::cli().get_matches();
    let arguments = args::Arguments::try_from(matches)?;

    // Initialize the logging system, the verbose flag only changes the default.
    let default_level = if arguments.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    // Get the package name and version from Cargo
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    log::info!("{pkg_name} v{pkg_version}");
    let os = env::consts::OS;
    let family = env::consts::FAMILY;
    let arch = env::consts::ARCH;
    log::info!("Running on... {family}/{os} {arch}");
    log::debug!("{arguments}");

    // Capture application context.
    let context = context::Context::capture()?;
    log::debug!("{context}");
    // Load the configuration.
    let configuration = config::Loader::load(&context, &arguments.config)?;
    log::debug!("{configuration}");

    // Run the application.
    match run(&context, &arguments, configuration) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            log::error!("{error:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Scans the build log and writes the compilation database.
fn run(context: &context::Context, arguments: &args::Arguments, configuration: config::Main) -> anyhow::Result<()> {
    let scan_config = scan_config(context, arguments, &configuration.parse);
    let format = output_format(arguments, configuration.format);

    log::info!("Processing build commands from {}", input_name(&arguments.input));
    let result = if arguments.input == STANDARD_STREAM {
        parser::parse_build_log(io::stdin().lock(), &scan_config)?
    } else {
        let file = fs::File::open(&arguments.input)
            .with_context(|| format!("Failed to open build log '{}'", arguments.input))?;
        parser::parse_build_log(io::BufReader::new(file), &scan_config)?
    };
    log::info!("{result}");

    let writer = OutputWriter::from((&arguments.output, &format));
    log::info!("Writing compilation database with {} entries to {}", result.entry_count(), writer.destination());
    let count = writer.write(result.into_entries())?;
    log::debug!("Written {count} entries");
    log::info!("Done");
    Ok(())
}

/// Merges the command line and the configured scan parameters.
fn scan_config(
    context: &context::Context,
    arguments: &args::Arguments,
    configuration: &config::Parse,
) -> parser::ScanConfig {
    let project_directory =
        arguments.build_dir.as_ref().map(PathBuf::from).unwrap_or_else(|| context.current_directory.clone());

    let mut result = parser::ScanConfig::new(project_directory);
    result.extra_flags =
        arguments.extra_flags.iter().chain(configuration.extra_flags.iter()).cloned().collect();
    result.verbose = arguments.verbose;
    result.strict_directories = configuration.strict_directories;
    result
}

/// The command line flags override the configured output format.
fn output_format(arguments: &args::Arguments, mut format: config::Format) -> config::Format {
    if arguments.command_style {
        format.use_array_format = false;
    }
    if arguments.compact {
        format.pretty = false;
    }
    format
}

fn input_name(input: &str) -> &str {
    if input == STANDARD_STREAM { "<stdin>" } else { input }
}
