use std::fmt;

use serde_json::{Map, Value as JsonValue};

/// A dot-separated path split into its segments.
///
/// Segments address object keys, or array indexes when the container at that
/// point is an array and the segment is a decimal integer. There is no
/// escaping: a `.` always ends a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DottedPath {
    raw: String,
    segments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    Empty,
    EmptySegment,
}

impl PathError {
    pub fn message(&self) -> &'static str {
        match self {
            PathError::Empty => "path is empty",
            PathError::EmptySegment => "path segment is empty",
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl DottedPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment);
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Raised by [`write`] when an existing value along the path cannot hold the
/// next segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConflict {
    /// Number of segments walked before the conflict.
    pub depth: usize,
}

/// Walks `segments` down from `value`.
///
/// Returns `None` when a segment is missing or the value at that point is not
/// a container. A stored `null` is returned as `Some(&Value::Null)`; use
/// [`is_present`] for presence checks.
pub fn read<'a, S: AsRef<str>>(value: &'a JsonValue, segments: &[S]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in segments {
        let segment = segment.as_ref();
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            JsonValue::Array(items) => items.get(parse_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Sets `value` at `segments`, creating intermediate objects on the way.
///
/// Missing and `null` intermediates become empty objects. Arrays are
/// addressed by index, and an index equal to the array length appends.
pub fn write<S: AsRef<str>>(
    root: &mut JsonValue,
    segments: &[S],
    value: JsonValue,
) -> Result<(), WriteConflict> {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        if current.is_null() {
            *current = JsonValue::Object(Map::new());
        }
        current = child_slot(current, segment.as_ref()).ok_or(WriteConflict { depth })?;
    }

    if current.is_null() {
        *current = JsonValue::Object(Map::new());
    }
    let slot = child_slot(current, last.as_ref()).ok_or(WriteConflict {
        depth: parents.len(),
    })?;
    *slot = value;
    Ok(())
}

/// `true` when a path resolved to a non-null value.
pub fn is_present(value: Option<&JsonValue>) -> bool {
    value.is_some_and(|value| !value.is_null())
}

fn child_slot<'a>(container: &'a mut JsonValue, segment: &str) -> Option<&'a mut JsonValue> {
    match container {
        JsonValue::Object(map) => Some(map.entry(segment.to_string()).or_insert(JsonValue::Null)),
        JsonValue::Array(items) => {
            let index = parse_index(segment)?;
            if index == items.len() {
                items.push(JsonValue::Null);
            }
            items.get_mut(index)
        }
        _ => None,
    }
}

/// Canonical decimal indexes only; `01` never aliases slot 1.
fn parse_index(segment: &str) -> Option<usize> {
    let bytes = segment.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    segment.parse().ok()
}
