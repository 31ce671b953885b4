// SPDX-License-Identifier: GPL-3.0-or-later

//! Logical line reader.
//!
//! Build logs break long command lines with a trailing backslash. This module
//! joins those physical lines back into a single logical line while reading
//! the stream forward only, holding nothing but the line being assembled.

use std::io;

const CONTINUATION: u8 = b'\\';

/// Iterator over the logical lines of a build log.
pub struct LogicalLines<R> {
    reader: R,
    buffer: Vec<u8>,
    finished: bool,
}

impl<R: io::BufRead> LogicalLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buffer: Vec::new(), finished: false }
    }

    /// Reads one physical line into the buffer.
    ///
    /// Returns `None` at the end of the stream, otherwise the content of the
    /// line (terminator removed) and whether the line had a terminator.
    fn read_physical(&mut self) -> io::Result<Option<(Vec<u8>, bool)>> {
        self.buffer.clear();
        let count = self.reader.read_until(b'\n', &mut self.buffer)?;
        if count == 0 {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.buffer);
        let terminated = line.last() == Some(&b'\n');
        if terminated {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(Some((line, terminated)))
    }

    fn next_logical(&mut self) -> io::Result<Option<String>> {
        let mut accumulated: Option<Vec<u8>> = None;

        loop {
            match self.read_physical()? {
                None => {
                    // The stream may end in the middle of a continuation.
                    self.finished = true;
                    return Ok(accumulated.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));
                }
                Some((mut line, terminated)) => {
                    let continued = terminated && line.last() == Some(&CONTINUATION);
                    if continued {
                        line.pop();
                    }
                    let current = accumulated.get_or_insert_with(Vec::new);
                    current.extend_from_slice(&line);

                    if !continued {
                        return Ok(accumulated.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));
                    }
                }
            }
        }
    }
}

impl<R: io::BufRead> Iterator for LogicalLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_logical() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}
