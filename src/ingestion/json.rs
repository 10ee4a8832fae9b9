//! JSON array row source.
//!
//! The whole document is parsed up front and must be an array. Columns are the union of keys of
//! every element, sorted lexicographically. With [`JsonOptions::flatten`], nested objects are
//! merged into their parent using dot-joined keys (`{"user":{"name":..}}` -> `user.name`);
//! arrays are never flattened.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::{ReaderError, ReaderResult};
use crate::reader::{Reader, ReaderOptions, RowSource};
use crate::types::Value;

/// Options for JSON documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Merge nested objects into the parent namespace with `.`-joined keys.
    pub flatten: bool,
}

/// Raw rows from a parsed JSON array.
#[derive(Debug)]
pub struct JsonArraySource {
    items: Vec<Map<String, JsonValue>>,
    keys: Vec<String>,
    pos: usize,
}

impl JsonArraySource {
    /// Parse a JSON document held in memory.
    pub fn from_json_str(input: &str, options: &JsonOptions) -> ReaderResult<Self> {
        let doc: JsonValue = serde_json::from_str(input)?;
        Self::from_value(doc, options)
    }

    /// Parse a JSON document from a stream.
    pub fn from_reader<R: Read>(input: R, options: &JsonOptions) -> ReaderResult<Self> {
        let doc: JsonValue = serde_json::from_reader(input)?;
        Self::from_value(doc, options)
    }

    /// Open and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>, options: &JsonOptions) -> ReaderResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }

    /// Use an already-parsed document.
    pub fn from_value(doc: JsonValue, options: &JsonOptions) -> ReaderResult<Self> {
        let JsonValue::Array(elements) = doc else {
            return Err(ReaderError::MalformedInput {
                message: format!("json document must be an array, got {}", json_kind(&doc)),
            });
        };

        // Non-object elements contribute no keys and come out as all-null rows.
        let items = elements
            .into_iter()
            .map(|el| match el {
                JsonValue::Object(obj) if options.flatten => flatten_object(&obj),
                JsonValue::Object(obj) => obj,
                _ => Map::new(),
            })
            .collect();

        Ok(Self {
            items,
            keys: Vec::new(),
            pos: 0,
        })
    }

    /// Number of elements in the document.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the document is an empty array.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl RowSource for JsonArraySource {
    fn format_name(&self) -> &'static str {
        "json"
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        if self.items.is_empty() {
            return Err(ReaderError::EmptyInput {
                message: "json array has no elements".to_string(),
            });
        }

        let union: BTreeSet<&String> = self.items.iter().flat_map(|obj| obj.keys()).collect();
        if union.is_empty() {
            return Err(ReaderError::NoKeys {
                message: format!("none of the {} json elements has any keys", self.items.len()),
            });
        }

        self.keys = union.into_iter().cloned().collect();
        Ok(self.keys.clone())
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        let obj = self.items.get(self.pos)?;
        self.pos += 1;
        Some(Ok(project(obj, &self.keys)))
    }

    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        let skipped = n.min(self.items.len() - self.pos);
        self.pos += skipped;
        Ok(skipped)
    }
}

/// Values of `keys` in order; missing keys become [`Value::Null`].
pub(crate) fn project(obj: &Map<String, JsonValue>, keys: &[String]) -> Vec<Value> {
    keys.iter()
        .map(|k| obj.get(k).map(Value::from_json).unwrap_or(Value::Null))
        .collect()
}

/// Flatten nested objects into one level using dot-joined keys. Arrays are kept as-is.
pub fn flatten_object(obj: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut out = Map::new();
    flatten_into(&mut out, None, obj);
    out
}

fn flatten_into(out: &mut Map<String, JsonValue>, prefix: Option<&str>, obj: &Map<String, JsonValue>) {
    for (k, v) in obj {
        let key = match prefix {
            Some(p) => format!("{p}.{k}"),
            None => k.clone(),
        };
        match v {
            JsonValue::Object(inner) => flatten_into(out, Some(&key), inner),
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a bool",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Open a JSON array file as a [`Reader`].
pub fn read_json_from_path(
    path: impl AsRef<Path>,
    json_options: &JsonOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<JsonArraySource>> {
    let path = path.as_ref();
    let source = JsonArraySource::from_path(path, json_options)?;
    Ok(Reader::new(source, options).with_source_label(path.display().to_string()))
}

/// Build a [`Reader`] over an in-memory JSON array.
pub fn read_json_from_str(
    input: &str,
    json_options: &JsonOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<JsonArraySource>> {
    Ok(Reader::new(JsonArraySource::from_json_str(input, json_options)?, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_joins_nested_keys_and_keeps_arrays() {
        let v: JsonValue =
            serde_json::from_str(r#"{"id":1,"user":{"name":"Ada","geo":{"lat":1.5}},"tags":["a",{"x":1}]}"#)
                .unwrap();
        let flat = flatten_object(v.as_object().unwrap());
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "user.name", "user.geo.lat", "tags"]);
        assert!(flat["tags"].is_array());
    }

    #[test]
    fn headers_are_sorted_union() {
        let mut src =
            JsonArraySource::from_json_str(r#"[{"b":1,"a":2},{"c":3}]"#, &JsonOptions::default()).unwrap();
        assert_eq!(src.read_headers().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(
            src.next_row().unwrap().unwrap(),
            vec![Value::Int64(2), Value::Int64(1), Value::Null]
        );
    }

    #[test]
    fn non_array_document_is_malformed() {
        let err = JsonArraySource::from_json_str(r#"{"a":1}"#, &JsonOptions::default()).unwrap_err();
        assert!(matches!(err, ReaderError::MalformedInput { .. }));
        let err = JsonArraySource::from_json_str("[{", &JsonOptions::default()).unwrap_err();
        assert!(matches!(err, ReaderError::Json(_)));
    }

    #[test]
    fn array_without_keys_is_rejected() {
        let mut src = JsonArraySource::from_json_str("[1, {}, []]", &JsonOptions::default()).unwrap();
        assert!(matches!(src.read_headers().unwrap_err(), ReaderError::NoKeys { .. }));
    }
}
