//! Materialized output records.
//!
//! A reader yields either a [`Record`] (positional and by-name access over a layout shared by
//! every record of that reader) or a plain ordered [`RowMap`]. The choice is made once per reader
//! through [`ReturnType`].

use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::Value;

/// Ordered `field name -> value` mapping.
pub type RowMap = IndexMap<String, Value>;

/// Output shape produced by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnType {
    /// [`Row::Record`] values.
    #[default]
    Record,
    /// [`Row::Map`] values.
    Map,
}

/// Field names of a record plus a name -> position index.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordLayout {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl RecordLayout {
    /// Build a layout; on duplicate names the first position wins for by-name lookup.
    pub fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    /// Field names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the layout has no fields.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A structured record: values addressed by position or by field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    layout: Arc<RecordLayout>,
    values: Vec<Value>,
}

impl Record {
    /// Create a record. `values` must have the same length as the layout.
    pub fn new(layout: Arc<RecordLayout>, values: Vec<Value>) -> Self {
        debug_assert_eq!(layout.len(), values.len());
        Self { layout, values }
    }

    /// Value of the named field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout.position(name).and_then(|i| self.values.get(i))
    }

    /// Value at position `idx`.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Field names in order.
    pub fn names(&self) -> &[String] {
        self.layout.names()
    }

    /// Values in field order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(name, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.layout
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Convert into an ordered mapping.
    pub fn into_map(self) -> RowMap {
        self.layout.names().iter().cloned().zip(self.values).collect()
    }
}

impl Index<usize> for Record {
    type Output = Value;

    fn index(&self, idx: usize) -> &Value {
        &self.values[idx]
    }
}

impl Index<&str> for Record {
    type Output = Value;

    /// # Panics
    ///
    /// Panics if the record has no field called `name`.
    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(v) => v,
            None => panic!("record has no field '{name}'"),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One item yielded by a reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Structured record output.
    Record(Record),
    /// Ordered mapping output.
    Map(RowMap),
}

impl Row {
    /// Value of the named field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Row::Record(r) => r.get(name),
            Row::Map(m) => m.get(name),
        }
    }

    /// Value at position `idx`.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        match self {
            Row::Record(r) => r.get_index(idx),
            Row::Map(m) => m.get_index(idx).map(|(_, v)| v),
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        match self {
            Row::Record(r) => r.len(),
            Row::Map(m) => m.len(),
        }
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The structured record, if this row is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Row::Record(r) => Some(r),
            Row::Map(_) => None,
        }
    }

    /// Convert into an ordered mapping regardless of shape.
    pub fn into_map(self) -> RowMap {
        match self {
            Row::Record(r) => r.into_map(),
            Row::Map(m) => m,
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Row::Record(r) => r.serialize(serializer),
            Row::Map(m) => m.serialize(serializer),
        }
    }
}

/// Build one output row from canonical headers and a raw row.
///
/// - the raw row is padded with [`Value::Null`] up to the data-column count
/// - when `rownum` is `Some`, its value is appended as the final field
/// - anything beyond the header length is dropped
///
/// `rownum` must only be `Some` when the last header is the synthetic row-number column.
pub fn materialize(
    layout: &Arc<RecordLayout>,
    raw: &[Value],
    rownum: Option<i64>,
    return_type: ReturnType,
) -> Row {
    let n = layout.len();
    let data_cols = if rownum.is_some() { n.saturating_sub(1) } else { n };

    let mut values: Vec<Value> = raw.to_vec();
    if values.len() < data_cols {
        values.resize(data_cols, Value::Null);
    }
    if let Some(num) = rownum {
        // A long row is cut back to the data columns so the number lands in its own column.
        values.truncate(data_cols);
        values.push(Value::Int64(num));
    }
    values.truncate(n);

    match return_type {
        ReturnType::Record => Row::Record(Record::new(Arc::clone(layout), values)),
        ReturnType::Map => Row::Map(layout.names().iter().cloned().zip(values).collect()),
    }
}
