// SPDX-License-Identifier: GPL-3.0-or-later

//! Working directory tracking.
//!
//! `make --print-directory` (enabled by default for recursive builds) announces
//! every directory change with a pair of marker lines:
//!
//! ```text
//! make[1]: Entering directory '/home/user/project/lib'
//! ...
//! make[1]: Leaving directory '/home/user/project/lib'
//! ```
//!
//! The tracker follows these markers with a stack, so the compiler invocations
//! in between can be attributed to the right working directory.

use regex_lite::Regex;
use std::sync::LazyLock;

static ENTERING_DIRECTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*make.*: Entering directory [`'"](?P<dir>.*)[`'"]\s*$"#)
        .expect("Invalid entering directory pattern")
});

static LEAVING_DIRECTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*make.*: Leaving directory .*$").expect("Invalid leaving directory pattern")
});

/// A directory change announced by the build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryChange {
    Enter(String),
    Leave,
}

impl DirectoryChange {
    /// Recognizes a directory marker line.
    pub fn recognize(line: &str) -> Option<Self> {
        if let Some(captures) = ENTERING_DIRECTORY.captures(line) {
            let directory = captures.name("dir").map_or("", |m| m.as_str());
            return Some(DirectoryChange::Enter(directory.to_string()));
        }
        if LEAVING_DIRECTORY.is_match(line) {
            return Some(DirectoryChange::Leave);
        }
        None
    }
}

/// The stack of working directories, the bottom is the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStack {
    directories: Vec<String>,
}

impl DirectoryStack {
    pub fn new(root: impl Into<String>) -> Self {
        Self { directories: vec![root.into()] }
    }

    /// The current working directory of the build.
    pub fn current(&self) -> &str {
        // The root is never popped, so the stack is never empty.
        self.directories.last().map_or("", String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.directories.len()
    }

    pub fn push(&mut self, directory: impl Into<String>) {
        self.directories.push(directory.into());
    }

    /// Leaves the current directory.
    ///
    /// Returns `false` when the stack is at the root, which is kept.
    pub fn pop(&mut self) -> bool {
        if self.directories.len() > 1 {
            self.directories.pop();
            true
        } else {
            false
        }
    }

    /// Applies a directory change, returns `false` if it had to be clamped.
    pub fn apply(&mut self, change: DirectoryChange) -> bool {
        match change {
            DirectoryChange::Enter(directory) if directory.is_empty() => {
                // Stays balanced with the matching leave marker.
                log::warn!("Entering an unnamed directory, staying in {}", self.current());
                let current = self.current().to_string();
                self.push(current);
                true
            }
            DirectoryChange::Enter(directory) => {
                self.push(directory);
                true
            }
            DirectoryChange::Leave => self.pop(),
        }
    }
}
