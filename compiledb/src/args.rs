// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The module is defining types to represent a structured form of the
//! program invocation.

use clap::{ArgAction, ArgMatches, Command, arg, command};
use std::fmt;

/// Common constants used in the module.
const DEFAULT_INPUT_FILE: &str = "-";
const DEFAULT_OUTPUT_FILE: &str = "compile_commands.json";

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The path of the configuration file.
    pub config: Option<String>,
    // The build log to read, `-` is the standard input.
    pub input: String,
    // Where the compilation database is written.
    pub output: Output,
    // The directory the build was started in.
    pub build_dir: Option<String>,
    // Flags added to every entry.
    pub extra_flags: Vec<String>,
    pub verbose: bool,
    pub command_style: bool,
    pub compact: bool,
}

#[derive(Debug, PartialEq)]
pub struct Output {
    pub file_name: String,
    pub append: bool,
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let config = matches.get_one::<String>("config").map(String::to_string);
        let input = matches
            .get_one::<String>("parse")
            .map(String::to_string)
            .unwrap_or_else(|| DEFAULT_INPUT_FILE.to_string());
        let output = Output::try_from(&matches)?;
        let build_dir = matches.get_one::<String>("build-dir").map(String::to_string);
        let extra_flags = matches
            .get_many::<String>("extra-flags")
            .map(|values| split_flag_lists(values.map(String::as_str)))
            .unwrap_or_default();

        Ok(Arguments {
            config,
            input,
            output,
            build_dir,
            extra_flags,
            verbose: matches.get_flag("verbose"),
            command_style: matches.get_flag("command-style"),
            compact: matches.get_flag("compact"),
        })
    }
}

impl TryFrom<&ArgMatches> for Output {
    type Error = anyhow::Error;

    fn try_from(matches: &ArgMatches) -> Result<Self, Self::Error> {
        let file_name = matches
            .get_one::<String>("output")
            .map(String::to_string)
            .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string());
        let append = matches.get_flag("append");
        Ok(Output { file_name, append })
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arguments:")?;
        writeln!(f, "Config: {}", self.config.as_deref().unwrap_or("<default>"))?;
        writeln!(f, "Input: {}", self.input)?;
        writeln!(f, "Output: {} (append: {})", self.output.file_name, self.output.append)?;
        writeln!(f, "Build directory: {}", self.build_dir.as_deref().unwrap_or("<current>"))?;
        write!(f, "Extra flags: {:?}", self.extra_flags)
    }
}

/// Splits the comma separated flag lists, drops the empty items.
fn split_flag_lists<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|flag| !flag.is_empty())
        .map(String::from)
        .collect()
}

/// Represents the command line interface of the application.
///
/// The build log is read from a file or the standard input, the compilation
/// database is written to a file or the standard output.
pub fn cli() -> Command {
    command!().args(&[
        arg!(-p --parse <FILE> "Build log file to parse compilation commands from")
            .default_value(DEFAULT_INPUT_FILE)
            .hide_default_value(false),
        arg!(-o --output <FILE> "Output file, use '-' for the standard output")
            .default_value(DEFAULT_OUTPUT_FILE)
            .hide_default_value(false),
        arg!(-d --"build-dir" <DIR> "Path of the build directory, defaults to the current directory"),
        arg!(-e --"extra-flags" <FLAGS> "Comma separated list of flags added to every entry")
            .allow_hyphen_values(true)
            .action(ArgAction::Append),
        arg!(-a --append "Append result to an existing output file").action(ArgAction::SetTrue),
        arg!(-c --config <FILE> "Path of the config file"),
        arg!(-v --verbose "Print the accepted entries and progress").action(ArgAction::SetTrue),
        arg!(--"command-style" "Write the command as a single string instead of an argument array")
            .action(ArgAction::SetTrue),
        arg!(--compact "Write the JSON output without pretty printing").action(ArgAction::SetTrue),
    ])
}
