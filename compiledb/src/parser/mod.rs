// SPDX-License-Identifier: GPL-3.0-or-later

//! This module is responsible for scanning build logs.
//!
//! The input is the transcript of a `make` style build: the commands it
//! executed, interleaved with the `Entering directory`/`Leaving directory`
//! markers of recursive invocations. The output is the list of compilation
//! database entries found in the transcript.
//!
//! The scan is a single forward pass over the logical lines of the log:
//!
//! - directory markers update the tracked working directory,
//! - compiler invocations are tokenized and their arguments classified,
//! - every other line is counted as skipped.
//!
//! Per line anomalies never stop the scan. The only error before the scan is
//! a missing project directory; during the scan only reading the input (or an
//! unbalanced directory marker in strict mode) can fail.

pub mod arguments;
pub mod directory;
pub mod invocation;
pub mod lines;
pub mod tokens;

use crate::output::clang::Entry;
use directory::{DirectoryChange, DirectoryStack};
use invocation::CompilerIdentity;
use lines::LogicalLines;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{fmt, io};
use thiserror::Error;

/// The parameters of a build log scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// The directory the build was started from.
    pub project_directory: PathBuf,
    /// Flags added to every entry, right after the compiler.
    pub extra_flags: Vec<String>,
    /// Log every accepted entry at info level.
    pub verbose: bool,
    /// Fail on a `Leaving directory` marker without a matching `Entering directory`.
    pub strict_directories: bool,
}

impl ScanConfig {
    pub fn new(project_directory: impl Into<PathBuf>) -> Self {
        Self {
            project_directory: project_directory.into(),
            extra_flags: Vec::new(),
            verbose: false,
            strict_directories: false,
        }
    }
}

/// The result of a build log scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsingResult {
    /// Lines which did not produce an entry (directory markers excluded).
    pub skipped: usize,
    /// All logical lines of the log.
    pub total_lines: usize,
    /// The compilation database entries in order of appearance.
    pub entries: Vec<Entry>,
}

impl ParsingResult {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl fmt::Display for ParsingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line count: {}, Skipped: {}, Entries: {}", self.total_lines, self.skipped, self.entries.len())
    }
}

/// Represents the errors of a build log scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Project directory '{0}' does not exist")]
    ProjectDirectoryNotFound(PathBuf),
    #[error("Failed to read the build log: {0}")]
    Read(#[from] io::Error),
    #[error("Leaving directory without entering one at line {line}")]
    UnbalancedDirectory { line: usize },
}

/// Scans a build log and collects the compilation database entries.
pub fn parse_build_log(reader: impl io::BufRead, config: &ScanConfig) -> Result<ParsingResult, ScanError> {
    let root = project_root(&config.project_directory)?;
    log::debug!("Scanning build log, project root: {root}");

    let mut context = ScanContext::new(root, config);
    for line in LogicalLines::new(reader) {
        context.process(&line?)?;
    }

    log::debug!("{}", context.result);
    Ok(context.result)
}

/// Checks the project directory and makes it absolute (without resolving links).
fn project_root(directory: &Path) -> Result<String, ScanError> {
    if !directory.is_dir() {
        return Err(ScanError::ProjectDirectoryNotFound(directory.to_path_buf()));
    }
    let absolute = std::path::absolute(directory)
        .map_err(|_| ScanError::ProjectDirectoryNotFound(directory.to_path_buf()))?;
    Ok(absolute.to_string_lossy().into_owned())
}

/// The state owned by a single scan.
struct ScanContext<'a> {
    config: &'a ScanConfig,
    directories: DirectoryStack,
    seen_files: HashSet<String>,
    result: ParsingResult,
}

impl<'a> ScanContext<'a> {
    fn new(root: String, config: &'a ScanConfig) -> Self {
        Self {
            config,
            directories: DirectoryStack::new(root),
            seen_files: HashSet::new(),
            result: ParsingResult::default(),
        }
    }

    fn process(&mut self, line: &str) -> Result<(), ScanError> {
        self.result.total_lines += 1;

        if let Some(change) = DirectoryChange::recognize(line) {
            return self.change_directory(change);
        }

        let Some(compiler) = invocation::recognize(line) else {
            self.result.skipped += 1;
            return Ok(());
        };

        match self.assemble(compiler, line) {
            Some(entry) => self.result.entries.push(entry),
            None => self.result.skipped += 1,
        }
        Ok(())
    }

    fn change_directory(&mut self, change: DirectoryChange) -> Result<(), ScanError> {
        if self.directories.apply(change) {
            log::trace!("Working directory: {}", self.directories.current());
            return Ok(());
        }

        let line = self.result.total_lines;
        if self.config.strict_directories {
            return Err(ScanError::UnbalancedDirectory { line });
        }
        log::warn!("Leaving directory without entering one at line {line}, ignored.");
        self.result.skipped += 1;
        Ok(())
    }

    /// Builds the entry of a compiler invocation, unless it has no source file
    /// or the source file was already recorded.
    fn assemble(&mut self, compiler: CompilerIdentity, line: &str) -> Option<Entry> {
        let words = tokens::split_command_line(line);
        let classified = arguments::classify(words.get(1..).unwrap_or_default());

        let Some(file) = classified.file else {
            log::debug!("No source file found in: {line}");
            return None;
        };
        if self.seen_files.contains(&file) {
            log::debug!("Already recorded source file: {file}");
            return None;
        }

        let mut arguments = Vec::with_capacity(classified.arguments.len() + self.config.extra_flags.len() + 2);
        arguments.push(compiler.to_string());
        arguments.extend(self.config.extra_flags.iter().filter(|flag| !flag.is_empty()).cloned());
        arguments.extend(classified.arguments);

        if self.config.verbose {
            log::info!("args={} --> {}", arguments.len(), file);
        } else {
            log::debug!("args={} --> {}", arguments.len(), file);
        }

        arguments.push(file.clone());
        self.seen_files.insert(file.clone());

        Some(Entry::from_arguments(self.directories.current(), file, arguments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(log: &str, config: &ScanConfig) -> ParsingResult {
        parse_build_log(log.as_bytes(), config).unwrap()
    }

    fn project() -> (tempfile::TempDir, ScanConfig) {
        let directory = tempfile::tempdir().unwrap();
        let config = ScanConfig::new(directory.path());
        (directory, config)
    }

    fn root_of(config: &ScanConfig) -> String {
        std::path::absolute(&config.project_directory).unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn test_single_c_invocation() {
        let (_guard, config) = project();

        let result = scan("cc -c -I./inc -DFOO=1 -Wall foo.c\n", &config);

        assert_eq!(
            result.entries,
            vec![Entry::from_arguments_str(
                &root_of(&config),
                "foo.c",
                vec!["cc", "-c", "-I./inc", "-DFOO=1", "-Wall", "foo.c"],
            )]
        );
        assert_eq!(result.skipped, 0);
        assert_eq!(result.total_lines, 1);
    }

    #[test]
    fn test_entering_and_leaving_directory() {
        let (_guard, config) = project();
        let log = "\
make[1]: Entering directory '/p/sub'
g++ -std=c++17 bar.cpp
make[1]: Leaving directory '/p/sub'
";

        let result = scan(log, &config);

        assert_eq!(
            result.entries,
            vec![Entry::from_arguments_str("/p/sub", "bar.cpp", vec!["c++", "-std=c++17", "bar.cpp"])]
        );
        assert_eq!(result.skipped, 0);
        assert_eq!(result.total_lines, 3);
    }

    #[test]
    fn test_nested_directories_are_restored() {
        let (_guard, config) = project();
        let log = "\
make[1]: Entering directory '/p/a'
make[2]: Entering directory '/p/a/b'
gcc -c b.c
make[2]: Leaving directory '/p/a/b'
gcc -c a.c
make[1]: Leaving directory '/p/a'
gcc -c root.c
";

        let result = scan(log, &config);

        let directories: Vec<_> = result.entries.iter().map(|entry| entry.directory.as_str()).collect();
        assert_eq!(directories, vec!["/p/a/b", "/p/a", root_of(&config).as_str()]);
    }

    #[test]
    fn test_duplicate_file_is_skipped() {
        let (_guard, config) = project();
        let log = "cc -c -Wall foo.c\ncc -c -Werror foo.c\n";

        let result = scan(log, &config);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].arguments, vec!["cc", "-c", "-Wall", "foo.c"]);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_unrecognized_line_is_skipped() {
        let (_guard, config) = project();
        let log = "echo building...\ngcc -c main.c\n";

        let result = scan(log, &config);

        assert_eq!(result.skipped, 1);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.total_lines, 2);
    }

    #[test]
    fn test_invocation_without_source_is_skipped() {
        let (_guard, config) = project();
        let log = "gcc -o app main.o util.o\n";

        let result = scan(log, &config);

        assert!(result.entries.is_empty());
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_invalid_pair_is_dropped() {
        let (_guard, config) = project();
        let log = "gcc -c -I out/target_intermediates/include -Iinc main.c\n";

        let result = scan(log, &config);

        assert_eq!(result.entries[0].arguments, vec!["cc", "-c", "-Iinc", "main.c"]);
    }

    #[test]
    fn test_extra_flags_follow_the_compiler() {
        let (_guard, mut config) = project();
        config.extra_flags = vec!["-DEXTRA".into(), "".into(), "-m32".into()];

        let result = scan("g++ -c -Wall main.cpp\n", &config);

        assert_eq!(result.entries[0].arguments, vec!["c++", "-DEXTRA", "-m32", "-c", "-Wall", "main.cpp"]);
    }

    #[test]
    fn test_continuation_lines() {
        let (_guard, config) = project();
        let log = "gcc -c \\\n  -DFOO \\\n  main.c\n";

        let result = scan(log, &config);

        assert_eq!(result.total_lines, 1);
        assert_eq!(result.entries[0].arguments, vec!["cc", "-c", "-DFOO", "main.c"]);
    }

    #[test]
    fn test_quoted_define_is_one_argument() {
        let (_guard, config) = project();
        let log = "gcc -c '-DMSG=\"hello world\"' main.c\n";

        let result = scan(log, &config);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].file, "main.c");
        assert_eq!(result.entries[0].arguments, vec!["cc", "-c", "main.c"]);
    }

    #[test]
    fn test_define_with_quoted_value_is_kept_verbatim() {
        let (_guard, config) = project();
        let log = "gcc -c -DMSG=\"hello world\" main.c\n";

        let result = scan(log, &config);

        assert_eq!(result.entries[0].arguments, vec!["cc", "-c", "-DMSG=\"hello world\"", "main.c"]);
    }

    #[test]
    fn test_unnamed_directory_keeps_the_entry_directory() {
        let (_guard, config) = project();
        let log = "\
make: Entering directory ''
gcc -c a.c
make: Leaving directory ''
gcc -c b.c
";

        let result = scan(log, &config);

        let directories: Vec<_> = result.entries.iter().map(|entry| entry.directory.as_str()).collect();
        assert_eq!(directories, vec![root_of(&config).as_str(), root_of(&config).as_str()]);
        assert_eq!(result.skipped, 0);
        assert!(result.entries.into_iter().all(|entry| entry.validate().is_ok()));
    }

    #[test]
    fn test_unbalanced_leave_is_clamped() {
        let (_guard, config) = project();
        let log = "make: Leaving directory '/p'\ngcc -c main.c\n";

        let result = scan(log, &config);

        assert_eq!(result.skipped, 1);
        assert_eq!(result.entries[0].directory, root_of(&config));
    }

    #[test]
    fn test_unbalanced_leave_fails_in_strict_mode() {
        let (_guard, mut config) = project();
        config.strict_directories = true;
        let log = "gcc -c main.c\nmake: Leaving directory '/p'\n";

        let result = parse_build_log(log.as_bytes(), &config);

        assert!(matches!(result, Err(ScanError::UnbalancedDirectory { line: 2 })));
    }

    #[test]
    fn test_missing_project_directory() {
        let config = ScanConfig::new("/this/directory/does/not/exist");

        let result = parse_build_log("gcc -c main.c\n".as_bytes(), &config);

        assert!(matches!(result, Err(ScanError::ProjectDirectoryNotFound(_))));
    }

    #[test]
    fn test_relative_project_directory_is_made_absolute() {
        let config = ScanConfig::new(".");

        let result = scan("gcc -c main.c\n", &config);

        assert!(Path::new(&result.entries[0].directory).is_absolute());
    }

    #[test]
    fn test_display_summary() {
        let (_guard, config) = project();

        let result = scan("echo hi\ngcc -c main.c\n", &config);

        assert_eq!(result.to_string(), "Line count: 2, Skipped: 1, Entries: 1");
    }
}
