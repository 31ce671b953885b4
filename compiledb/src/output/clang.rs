// SPDX-License-Identifier: GPL-3.0-or-later

//! The JSON compilation database entry.
//!
//! The format is defined in the LLVM project
//! [documentation](https://clang.llvm.org/docs/JSONCompilationDatabase.html).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents an entry of the compilation database.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The working directory of the compilation. Relative paths in the
    /// arguments and the file field are relative to this directory.
    pub directory: String,
    /// The source file of the compilation, as it was written in the build log.
    pub file: String,
    /// The compiler argv, the compiler first and the source file last.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub arguments: Vec<String>,
    /// The same as `arguments` as a single shell escaped string.
    #[serde(skip_serializing_if = "String::is_empty")]
    #[serde(default)]
    pub command: String,
}

impl Entry {
    pub fn from_arguments(directory: impl Into<String>, file: impl Into<String>, arguments: Vec<String>) -> Self {
        Entry { directory: directory.into(), file: file.into(), arguments, command: String::default() }
    }

    /// Checks that the entry has all mandatory fields.
    pub fn validate(self) -> Result<Self, EntryError> {
        if self.file.is_empty() {
            return Err(EntryError::EmptyFileName);
        }
        if self.directory.is_empty() {
            return Err(EntryError::EmptyDirectory);
        }
        if self.command.is_empty() && self.arguments.is_empty() {
            return Err(EntryError::CommandOrArgumentsAreMissing);
        }
        Ok(self)
    }

    /// Convert entry to a form when only the command field is available.
    pub fn to_command(self) -> Entry {
        if !self.command.is_empty() {
            return self;
        }
        Entry {
            command: shell_words::join(&self.arguments),
            arguments: Vec::default(),
            directory: self.directory,
            file: self.file,
        }
    }

    /// Convert entry to a form when only the arguments field is available.
    ///
    /// Fails if the command field is not a valid shell escaped string.
    pub fn to_arguments(self) -> Result<Entry, EntryError> {
        if self.command.is_empty() {
            return Ok(self);
        }
        Ok(Entry {
            arguments: shell_words::split(&self.command)?,
            command: String::default(),
            directory: self.directory,
            file: self.file,
        })
    }

    /// Constructor method for testing purposes.
    #[cfg(test)]
    pub fn from_arguments_str(directory: &str, file: &str, arguments: Vec<&str>) -> Entry {
        Entry::from_arguments(directory, file, arguments.into_iter().map(String::from).collect())
    }
}

/// Represents the possible errors that can occur when validating an entry.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("Entry has an empty file field")]
    EmptyFileName,
    #[error("Entry has an empty directory field")]
    EmptyDirectory,
    #[error("Both command and arguments fields are empty")]
    CommandOrArgumentsAreMissing,
    #[error("Entry has an invalid command field: {0}")]
    InvalidCommand(#[from] shell_words::ParseError),
}
