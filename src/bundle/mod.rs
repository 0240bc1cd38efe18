use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// The ten event categories a demo yields, in export order.
pub const CATEGORIES: [&str; 10] = [
    "header", "rounds", "grenades", "kills", "damages", "bomb", "smokes", "infernos", "shots",
    "ticks",
];

/// A single cell value inside a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Arrow type this value maps to; nulls land in Utf8.
    fn data_type(&self) -> DataType {
        match self {
            Scalar::Null | Scalar::Str(_) => DataType::Utf8,
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::Int(_) => DataType::Int64,
            Scalar::Float(_) => DataType::Float64,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// A single-record structure: field names mapped to scalars, insertion order
/// preserved. Promoted to a one-row table by the normalizer.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Scalar)> {
        self.fields.iter()
    }

    /// Promote to a one-row [`RecordBatch`], one column per field, field order.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        if self.fields.is_empty() {
            return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            fields.push(Field::new(name.as_str(), value.data_type(), true));
            let array: ArrayRef = match value {
                Scalar::Null => Arc::new(StringArray::from(vec![None::<&str>])),
                Scalar::Bool(v) => Arc::new(BooleanArray::from(vec![Some(*v)])),
                Scalar::Int(v) => Arc::new(Int64Array::from(vec![Some(*v)])),
                Scalar::Float(v) => Arc::new(Float64Array::from(vec![Some(*v)])),
                Scalar::Str(v) => Arc::new(StringArray::from(vec![Some(v.as_str())])),
            };
            arrays.push(array);
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .context("promoting record to a one-row batch")
    }
}

/// Typed values of one column in a [`ColumnSet`].
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Bool(Vec<Option<bool>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnValues::Bool(_) => DataType::Boolean,
            ColumnValues::Int(_) => DataType::Int64,
            ColumnValues::Float(_) => DataType::Float64,
            ColumnValues::Str(_) => DataType::Utf8,
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            ColumnValues::Bool(v) => Arc::new(BooleanArray::from(v.clone())),
            ColumnValues::Int(v) => Arc::new(Int64Array::from(v.clone())),
            ColumnValues::Float(v) => Arc::new(Float64Array::from(v.clone())),
            ColumnValues::Str(v) => Arc::new(StringArray::from(v.clone())),
        }
    }
}

/// One named, typed column.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// The alternate column-major table form a source may hand over. Column order
/// is the table's natural order and is preserved through conversion.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// Convert to a [`RecordBatch`]. All columns must have the same length.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        if self.columns.is_empty() {
            return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
        }

        let rows = self.num_rows();
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if column.values.len() != rows {
                bail!(
                    "column `{}` has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    rows
                );
            }
            fields.push(Field::new(column.name.as_str(), column.values.data_type(), true));
            arrays.push(column.values.to_array());
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .context("building record batch from column set")
    }
}

/// What a source reported for one category. Resolved once at the source
/// boundary; downstream stages never re-inspect raw values.
#[derive(Debug, Clone)]
pub enum TableData {
    /// The source had no data for this category.
    Absent,
    /// Column-major form, convertible to a standard table.
    Columnar(ColumnSet),
    /// A single record, to be promoted to a one-row table.
    Record(Record),
    /// Already a standard table.
    Table(RecordBatch),
    /// Not a tabular value; carries a description for diagnostics.
    Unrecognized(String),
}

/// The complete set of category results from one parse invocation. Iteration
/// order is the fixed order of [`CATEGORIES`].
#[derive(Debug)]
pub struct TableBundle {
    entries: Vec<(&'static str, TableData)>,
}

impl TableBundle {
    /// A bundle with every category absent.
    pub fn empty() -> Self {
        Self {
            entries: CATEGORIES.iter().map(|n| (*n, TableData::Absent)).collect(),
        }
    }

    /// Replace the data for a known category.
    ///
    /// Panics on a name outside [`CATEGORIES`]; sources only produce the fixed
    /// ten.
    pub fn set(&mut self, name: &str, data: TableData) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = data,
            None => panic!("unknown category `{}`", name),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TableData> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TableData)> {
        self.entries.iter().map(|(n, d)| (*n, d))
    }
}

impl IntoIterator for TableBundle {
    type Item = (&'static str, TableData);
    type IntoIter = std::vec::IntoIter<(&'static str, TableData)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
