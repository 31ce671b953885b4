// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains functions to serialize and deserialize JSON arrays.
//!
//! Entries are written one by one from an iterator into a JSON array, so the
//! whole database does not need to be rendered in memory first. The format is
//! a JSON array of objects, *not* JSON lines.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::ser::{SerializeSeq, Serializer};
use std::io;

/// Serialize entries from an iterator into a JSON array.
pub fn serialize_seq<W, T>(writer: W, entries: impl Iterator<Item = T>, pretty: bool) -> Result<(), serde_json::Error>
where
    W: io::Write,
    T: Serialize,
{
    if pretty {
        write_seq(&mut serde_json::Serializer::pretty(writer), entries)
    } else {
        write_seq(&mut serde_json::Serializer::new(writer), entries)
    }
}

fn write_seq<S, T>(serializer: S, entries: impl Iterator<Item = T>) -> Result<(), S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut seq = serializer.serialize_seq(None)?;
    for entry in entries {
        seq.serialize_element(&entry)?;
    }
    seq.end()?;
    Ok(())
}

/// Deserialize a JSON array, dropping the elements that can't be read.
///
/// The `on_error` callback is called for every element which is not of the
/// expected shape. If the document is not a JSON array, that is an error.
pub fn deserialize_seq_lenient<T, R>(
    reader: R,
    mut on_error: impl FnMut(serde_json::Error),
) -> Result<Vec<T>, serde_json::Error>
where
    T: DeserializeOwned,
    R: io::Read,
{
    let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
    let entries = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(error) => {
                on_error(error);
                None
            }
        })
        .collect();
    Ok(entries)
}
