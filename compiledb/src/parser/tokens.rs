// SPDX-License-Identifier: GPL-3.0-or-later

//! Splitting build log lines into words.
//!
//! This is not a shell parser. Lines are split on whitespace, then words are
//! glued back together while a quote is left open, so a quoted value with
//! spaces in it stays one word. Quotes are kept in the word text. Escaped
//! quotes, nested quotes and other separators are not understood.

use std::borrow::Cow;

/// Splits a line into shell-like words.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in line.split_whitespace() {
        match words.last_mut() {
            Some(previous) if has_unbalanced_quotes(previous) => {
                previous.push(' ');
                previous.push_str(word);
            }
            _ => words.push(word.to_string()),
        }
    }
    words
}

/// True when the text has an odd number of single or double quotes.
pub fn has_unbalanced_quotes(text: &str) -> bool {
    let (single, double) = text.chars().fold((0usize, 0usize), |(single, double), c| match c {
        '\'' => (single + 1, double),
        '"' => (single, double + 1),
        _ => (single, double),
    });
    single % 2 == 1 || double % 2 == 1
}

/// Resolves backslash escape sequences.
///
/// Recognized: `\\`, `\'`, `\"`, `\a`, `\b`, `\f`, `\n`, `\r`, `\t`, `\v`,
/// `\xHH`, `\OOO` (octal, up to three digits), `\uHHHH` and `\UHHHHHHHH`.
/// Anything else, including malformed numeric escapes, is kept as written.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut index = 0;
    while index < chars.len() {
        let current = chars[index];
        if current != '\\' || index + 1 == chars.len() {
            result.push(current);
            index += 1;
            continue;
        }

        let (decoded, consumed) = match chars[index + 1] {
            '\\' => (Some('\\'), 2),
            '\'' => (Some('\''), 2),
            '"' => (Some('"'), 2),
            'a' => (Some('\x07'), 2),
            'b' => (Some('\x08'), 2),
            'f' => (Some('\x0c'), 2),
            'n' => (Some('\n'), 2),
            'r' => (Some('\r'), 2),
            't' => (Some('\t'), 2),
            'v' => (Some('\x0b'), 2),
            'x' => (hex_escape(&chars[index + 2..], 2), 4),
            'u' => (hex_escape(&chars[index + 2..], 4), 6),
            'U' => (hex_escape(&chars[index + 2..], 8), 10),
            '0'..='7' => octal_escape(&chars[index + 1..]),
            _ => (None, 0),
        };

        match decoded {
            Some(c) => {
                result.push(c);
                index += consumed;
            }
            None => {
                result.push('\\');
                index += 1;
            }
        }
    }
    Cow::Owned(result)
}

fn hex_escape(chars: &[char], digits: usize) -> Option<char> {
    if chars.len() < digits {
        return None;
    }
    let text: String = chars[..digits].iter().collect();
    if !text.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(&text, 16).ok().and_then(char::from_u32)
}

fn octal_escape(chars: &[char]) -> (Option<char>, usize) {
    let digits = chars.iter().take(3).take_while(|c| matches!(c, '0'..='7')).count();
    let text: String = chars[..digits].iter().collect();
    let decoded = u32::from_str_radix(&text, 8).ok().and_then(char::from_u32);
    // The backslash plus the digits.
    (decoded, digits + 1)
}
