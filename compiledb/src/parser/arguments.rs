// SPDX-License-Identifier: GPL-3.0-or-later

//! Compiler argument classification.
//!
//! Only a handful of compiler flags matter to clang tooling: include paths,
//! macro definitions, warnings, language standard, target width and sysroot.
//! Everything else (output files, optimization, linker flags) is dropped.
//!
//! The rules are data: the source file patterns, the significant flag
//! allow-list, the flags taking a separate value and the pattern of values
//! pointing into build intermediates are all tables below.

use super::tokens::unescape;
use regex_lite::Regex;
use std::sync::LazyLock;

/// Patterns of the source files the compilation database is about.
pub const SOURCE_FILE_PATTERNS: &[&str] = &[r"^.+\.c$", r"^.+\.cc$", r"^.+\.cpp$", r"^.+\.cxx$"];

/// The allow-list of significant flags, each pattern matches the whole word.
pub const SIGNIFICANT_FLAG_PATTERNS: &[&str] = &[
    // compile only
    "-c",
    // target width: -m32, -m64
    "-m[0-9+]+",
    // warnings, but not the assembler/linker passthrough forms like -Wa,-foo
    "-W[^,]*",
    // includes, defines and framework paths
    "-[iIDF].*",
    // language standard and standard library
    "-std=[a-z0-9+]+",
    "-(no)?std(lib|inc)",
    "-D([a-zA-Z0-9_]+)=?(.*)",
    "--sysroot=?.*",
];

/// Flags which take their value as the following word.
pub const PAIRING_FLAGS: &[&str] =
    &["-D", "-o", "-I", "-isystem", "-iquote", "-include", "-imacros", "-isysroot", "--sysroot"];

/// Values pointing into build system intermediates or proguard configurations.
pub const INVALID_VALUE_PATTERN: &str = r"(^.*out/.+_intermediates.*$)|(.+/proguard.flags$)";

static SOURCE_FILE: LazyLock<Regex> =
    LazyLock::new(|| alternation(SOURCE_FILE_PATTERNS, "Invalid source file pattern"));

static SIGNIFICANT_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    let anchored: Vec<String> =
        SIGNIFICANT_FLAG_PATTERNS.iter().map(|pattern| format!("^{pattern}$")).collect();
    let anchored: Vec<&str> = anchored.iter().map(String::as_str).collect();
    alternation(&anchored, "Invalid significant flag pattern")
});

static INVALID_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INVALID_VALUE_PATTERN).expect("Invalid value pattern"));

fn alternation(patterns: &[&str], message: &str) -> Regex {
    let joined = patterns.iter().map(|pattern| format!("(?:{pattern})")).collect::<Vec<_>>().join("|");
    Regex::new(&joined).expect(message)
}

pub fn is_source_file(word: &str) -> bool {
    SOURCE_FILE.is_match(word)
}

pub fn is_significant_flag(word: &str) -> bool {
    word.starts_with('-') && SIGNIFICANT_FLAG.is_match(word)
}

pub fn is_pairing_flag(word: &str) -> bool {
    PAIRING_FLAGS.contains(&word)
}

pub fn is_invalid_value(value: &str) -> bool {
    INVALID_VALUE.is_match(value)
}

/// The outcome of classifying the words of one compiler invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classified {
    /// The source file of the invocation, the last candidate wins.
    pub file: Option<String>,
    /// The significant flags, in their original order.
    pub arguments: Vec<String>,
}

/// Classifies the words of a compiler invocation (compiler word excluded).
pub fn classify<S: AsRef<str>>(words: &[S]) -> Classified {
    let mut result = Classified::default();

    for (index, word) in words.iter().enumerate() {
        let word = word.as_ref();
        if is_source_file(word) {
            result.file = Some(word.to_string());
        }

        if !is_significant_flag(word) {
            continue;
        }
        let flag = unescape(word).into_owned();

        // The value word is not skipped, it is visited as any other word.
        let value: Option<&str> =
            words.get(index + 1).map(|next| next.as_ref()).filter(|next| !next.starts_with('-'));
        match value {
            Some(value) if is_pairing_flag(&flag) => {
                if is_invalid_value(value) {
                    log::debug!("Dropping flag with invalid value: {flag} {value}");
                } else {
                    result.arguments.push(flag);
                    result.arguments.push(value.to_string());
                }
            }
            _ => match flag.strip_prefix("-I") {
                Some(path) if is_invalid_value(path) => {
                    log::debug!("Dropping include with invalid path: {flag}");
                }
                Some(path) => result.arguments.push(format!("-I{path}")),
                None => result.arguments.push(flag),
            },
        }
    }

    result
}
