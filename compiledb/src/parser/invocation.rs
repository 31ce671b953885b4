// SPDX-License-Identifier: GPL-3.0-or-later

//! Compiler invocation recognition.
//!
//! A build log line is considered as a compiler call when its beginning looks
//! like a C or C++ compiler execution. The recognition is an ordered pattern
//! table, the first matching row decides the compiler identity.

use regex_lite::Regex;
use std::fmt;
use std::sync::LazyLock;

/// The compiler identity written into the compilation database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerIdentity {
    Cc,
    Cxx,
}

impl CompilerIdentity {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerIdentity::Cc => "cc",
            CompilerIdentity::Cxx => "c++",
        }
    }
}

impl fmt::Display for CompilerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the invocation table.
pub struct InvocationRule {
    pub pattern: Regex,
    pub identity: CompilerIdentity,
}

impl InvocationRule {
    fn new(pattern: &str, identity: CompilerIdentity) -> Self {
        let pattern = Regex::new(pattern).expect("Invalid compiler invocation pattern");
        Self { pattern, identity }
    }
}

/// The invocation table, evaluated top to bottom.
///
/// The patterns are not anchored to the executable name: a line that mentions
/// a C compiler anywhere before a space is attributed to the C row, even when
/// a C++ compiler is named as well.
pub static INVOCATION_RULES: LazyLock<Vec<InvocationRule>> = LazyLock::new(|| {
    vec![
        InvocationRule::new(r"^(?:.*-?g?cc |.*-?clang )", CompilerIdentity::Cc),
        InvocationRule::new(r"^(?:.*-?[gc]\+\+ |.*-?clang\+\+ )", CompilerIdentity::Cxx),
    ]
});

/// Returns the compiler identity when the line is a compiler invocation.
pub fn recognize(line: &str) -> Option<CompilerIdentity> {
    INVOCATION_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(line))
        .map(|rule| rule.identity)
}
