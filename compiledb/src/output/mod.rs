// SPDX-License-Identifier: GPL-3.0-or-later

//! This module is responsible for writing the compilation database.
//!
//! The `OutputWriter` takes the entries found by the build log scan, shapes
//! them as configured (`arguments` array or `command` string), optionally
//! merges them with the entries of an existing database, and writes them as a
//! JSON array. Files are written atomically: the content goes to a temporary
//! file next to the destination, which is then renamed over it.

pub mod clang;
mod json;

use crate::{args, config};
use clang::Entry;
use std::collections::HashSet;
use std::io::Write;
use std::{fs, io, path};
use thiserror::Error;

/// The file name which means the standard output.
pub const STANDARD_STREAM: &str = "-";

/// Where the compilation database goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(path::PathBuf),
}

impl Destination {
    pub fn from_name(name: &str) -> Self {
        if name == STANDARD_STREAM {
            Destination::Stdout
        } else {
            Destination::File(path::PathBuf::from(name))
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Stdout => f.write_str("<stdout>"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Represents the output writer for JSON compilation databases.
#[derive(Debug)]
pub struct OutputWriter {
    destination: Destination,
    append: bool,
    format: config::Format,
}

impl From<(&args::Output, &config::Format)> for OutputWriter {
    fn from(value: (&args::Output, &config::Format)) -> Self {
        let (args, format) = value;
        Self::new(Destination::from_name(&args.file_name), args.append, format.clone())
    }
}

impl OutputWriter {
    pub fn new(destination: Destination, append: bool, format: config::Format) -> Self {
        Self { destination, append, format }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Writes the entries to the destination, returns the number of entries written.
    pub fn write(&self, entries: Vec<Entry>) -> Result<usize, WriterError> {
        let entries = self.merge_with_previous(entries);
        let entries: Vec<Entry> = entries.into_iter().filter_map(|entry| self.shape(entry)).collect();
        let count = entries.len();

        match &self.destination {
            Destination::Stdout => {
                let stdout = io::stdout();
                self.write_to(stdout.lock(), entries)
                    .map_err(|error| WriterError::Io(self.destination.to_string(), error))?;
            }
            Destination::File(path) => self.write_atomically(path, entries)?,
        }
        Ok(count)
    }

    /// Converts the entry to the configured form, drops it if that fails.
    fn shape(&self, entry: Entry) -> Option<Entry> {
        let shaped = if self.format.use_array_format {
            entry.validate().and_then(Entry::to_arguments)
        } else {
            entry.validate().map(Entry::to_command)
        };
        shaped
            .inspect_err(|error| log::warn!("Dropping invalid entry: {error}"))
            .ok()
    }

    fn write_to(&self, mut writer: impl io::Write, entries: Vec<Entry>) -> Result<(), SerializationError> {
        json::serialize_seq(&mut writer, entries.into_iter(), self.format.pretty)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_atomically(&self, path: &path::Path, entries: Vec<Entry>) -> Result<(), WriterError> {
        let error_with_path = |error: SerializationError| WriterError::Io(path.display().to_string(), error);

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => path::Path::new("."),
        };
        let temporary =
            Self::temporary_file(directory, path).map_err(|error| error_with_path(SerializationError::Io(error)))?;

        self.write_to(io::BufWriter::new(temporary.as_file()), entries).map_err(error_with_path)?;

        temporary
            .persist(path)
            .map_err(|error| error_with_path(SerializationError::Io(error.error)))?;
        Ok(())
    }

    /// Creates the temporary file with the permissions the destination will have.
    ///
    /// A new file gets the umask based default, an existing one keeps its mode.
    fn temporary_file(directory: &path::Path, destination: &path::Path) -> io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let temporary = builder.tempfile_in(directory)?;

        if let Ok(metadata) = fs::metadata(destination) {
            temporary.as_file().set_permissions(metadata.permissions())?;
        }
        Ok(temporary)
    }

    /// Prepends the entries of the existing database in append mode.
    ///
    /// Previous entries for files which are also in the new scan are dropped.
    fn merge_with_previous(&self, entries: Vec<Entry>) -> Vec<Entry> {
        if !self.append {
            return entries;
        }
        let Destination::File(path) = &self.destination else {
            log::warn!("Can't append to the standard output, the append option is ignored.");
            return entries;
        };
        if !path.exists() {
            log::warn!("The output file does not exist, the append option is ignored.");
            return entries;
        }

        let previous = match Self::read_from_compilation_db(path) {
            Ok(previous) => previous,
            Err(error) => {
                log::warn!("Problems to read previous entries, they are ignored: {error}");
                return entries;
            }
        };

        let current_files: HashSet<&str> = entries.iter().map(|entry| entry.file.as_str()).collect();
        let mut merged: Vec<Entry> =
            previous.into_iter().filter(|entry| !current_files.contains(entry.file.as_str())).collect();
        log::debug!("Keeping {} entries from the previous database", merged.len());
        merged.extend(entries);
        merged
    }

    fn read_from_compilation_db(source: &path::Path) -> Result<Vec<Entry>, SerializationError> {
        let file = fs::File::open(source).map(io::BufReader::new)?;
        let entries = json::deserialize_seq_lenient(file, |error| {
            log::warn!("Problems to read previous entry: {error}");
        })?;
        Ok(entries)
    }
}

/// Represents errors of the serialization.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Represents errors that can occur while writing output.
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to write the compilation database {0}: {1}")]
    Io(String, SerializationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn entries() -> Vec<Entry> {
        vec![
            Entry::from_arguments_str("/p", "a.c", vec!["cc", "-c", "a.c"]),
            Entry::from_arguments_str("/p/sub", "b.cpp", vec!["c++", "-DNAME=x y", "b.cpp"]),
        ]
    }

    fn read(path: &path::Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_write_array_format() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        let sut = OutputWriter::new(Destination::File(path.clone()), false, config::Format::default());

        let count = sut.write(entries()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            read(&path),
            json!([
                {"directory": "/p", "file": "a.c", "arguments": ["cc", "-c", "a.c"]},
                {"directory": "/p/sub", "file": "b.cpp", "arguments": ["c++", "-DNAME=x y", "b.cpp"]},
            ])
        );
        assert!(fs::read_to_string(&path).unwrap().ends_with("]\n"));
    }

    #[test]
    fn test_write_command_format() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        let format = config::Format { use_array_format: false, pretty: false };
        let sut = OutputWriter::new(Destination::File(path.clone()), false, format);

        sut.write(entries()).unwrap();

        assert_eq!(
            read(&path),
            json!([
                {"directory": "/p", "file": "a.c", "command": "cc -c a.c"},
                {"directory": "/p/sub", "file": "b.cpp", "command": "c++ '-DNAME=x y' b.cpp"},
            ])
        );
    }

    #[test]
    fn test_write_overwrites_without_append() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        fs::write(&path, r#"[{"directory": "/old", "file": "old.c", "arguments": ["cc", "old.c"]}]"#).unwrap();
        let sut = OutputWriter::new(Destination::File(path.clone()), false, config::Format::default());

        sut.write(entries()).unwrap();

        assert_eq!(read(&path).as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_append_keeps_previous_and_replaces_same_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        fs::write(
            &path,
            r#"[
                {"directory": "/old", "file": "old.c", "command": "cc -c old.c"},
                {"directory": "/old", "file": "a.c", "arguments": ["cc", "-O2", "a.c"]}
            ]"#,
        )
        .unwrap();
        let sut = OutputWriter::new(Destination::File(path.clone()), true, config::Format::default());

        let count = sut.write(entries()).unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            read(&path),
            json!([
                {"directory": "/old", "file": "old.c", "arguments": ["cc", "-c", "old.c"]},
                {"directory": "/p", "file": "a.c", "arguments": ["cc", "-c", "a.c"]},
                {"directory": "/p/sub", "file": "b.cpp", "arguments": ["c++", "-DNAME=x y", "b.cpp"]},
            ])
        );
    }

    #[test]
    fn test_append_with_broken_previous_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        fs::write(&path, "this is not json").unwrap();
        let sut = OutputWriter::new(Destination::File(path.clone()), true, config::Format::default());

        let count = sut.write(entries()).unwrap();

        assert_eq!(count, 2);
    }

    #[test]
    fn test_append_to_missing_file() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        let sut = OutputWriter::new(Destination::File(path.clone()), true, config::Format::default());

        sut.write(entries()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("missing").join("compile_commands.json");
        let sut = OutputWriter::new(Destination::File(path), false, config::Format::default());

        assert!(sut.write(entries()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        for mode in [0o644, 0o640] {
            let directory = tempfile::tempdir().unwrap();
            let path = directory.path().join("compile_commands.json");
            fs::write(&path, "[]").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            let sut = OutputWriter::new(Destination::File(path.clone()), false, config::Format::default());

            sut.write(entries()).unwrap();

            let written = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(written, mode, "{written:o} != {mode:o}");
            assert_eq!(read(&path).as_array().map(Vec::len), Some(2));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_not_private() {
        use std::os::unix::fs::PermissionsExt;

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        let sut = OutputWriter::new(Destination::File(path.clone()), false, config::Format::default());

        sut.write(entries()).unwrap();

        // Matches what a plain file creation gives under the current umask.
        let reference = directory.path().join("reference");
        fs::write(&reference, "").unwrap();
        let expected = fs::metadata(&reference).unwrap().permissions().mode() & 0o777;
        let written = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(written, expected, "{written:o} != {expected:o}");
    }

    #[test]
    fn test_written_count_matches_scanned_entries() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("compile_commands.json");
        let scan_config = crate::parser::ScanConfig::new(directory.path());
        let log = "make: Entering directory ''\ngcc -c a.c\n";
        let scanned = crate::parser::parse_build_log(log.as_bytes(), &scan_config).unwrap();
        let sut = OutputWriter::new(Destination::File(path.clone()), false, config::Format::default());

        let count = sut.write(scanned.entries.clone()).unwrap();

        assert_eq!(count, scanned.entry_count());
        assert_eq!(read(&path).as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_destination_from_name() {
        assert_eq!(Destination::from_name("-"), Destination::Stdout);
        assert_eq!(Destination::from_name("out.json"), Destination::File("out.json".into()));
    }
}
