//! Dataset representation and table loading using Polars

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::tuple::{Attribute, Item, Tuple, Value};

/// In-memory table: an attribute schema plus one row of values per example.
///
/// Example indices are stable for the lifetime of the dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    attributes: Vec<Arc<Attribute>>,
    examples: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, checking every row against the schema.
    pub fn new(attributes: Vec<Attribute>, examples: Vec<Vec<Value>>) -> Result<Self> {
        let attributes: Vec<Arc<Attribute>> = attributes.into_iter().map(Arc::new).collect();
        for (row, values) in examples.iter().enumerate() {
            if values.len() != attributes.len() {
                return Err(Error::RowLength {
                    row,
                    expected: attributes.len(),
                    found: values.len(),
                });
            }
            for (attribute, value) in attributes.iter().zip(values) {
                // tuple_at relies on this kind check.
                Item::new(Arc::clone(attribute), value.clone())?;
            }
        }
        Ok(Self {
            attributes,
            examples,
        })
    }

    pub fn example_count(&self) -> usize {
        self.examples.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().map(|a| a.as_ref())
    }

    /// Raw value of `attribute` for `example`, `None` if either index is out of range.
    ///
    /// The attribute index is checked against the attribute count, not the example count.
    pub fn attribute_value(&self, example: usize, attribute: usize) -> Option<&Value> {
        if attribute >= self.attribute_count() {
            return None;
        }
        self.examples.get(example).and_then(|row| row.get(attribute))
    }

    /// Tuple for the example at `index`.
    pub fn tuple_at(&self, index: usize) -> Result<Tuple> {
        let row = self.examples.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.example_count(),
        })?;
        let items = self
            .attributes
            .iter()
            .zip(row)
            .map(|(attribute, value)| Item::new(Arc::clone(attribute), value.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple::new(items))
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.examples.iter().enumerate() {
            write!(f, "{}:", i)?;
            for value in row {
                write!(f, "{} ", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Supplies datasets by table name.
pub trait TableSource: Send + Sync {
    /// Load the named table.
    fn load_table(&self, name: &str) -> Result<Dataset>;
}

/// Table source reading `<root>/<table>.csv` files.
///
/// Numeric columns become continuous attributes over their observed `[min, max]`,
/// string and boolean columns become discrete attributes over their distinct values.
/// Columns of any other type are skipped. Nulls load as [`Value::Missing`].
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    root: PathBuf,
}

impl CsvTableSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::InvalidTableName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.csv", name)))
    }
}

impl TableSource for CsvTableSource {
    fn load_table(&self, name: &str) -> Result<Dataset> {
        let path = self.table_path(name)?;
        if !path.is_file() {
            return Err(Error::TableNotFound(name.to_string()));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;

        let dataset = dataset_from_frame(name, &df)?;
        info!(
            "Loaded table '{}' from {:?}: {} examples, {} attributes",
            name,
            path,
            dataset.example_count(),
            dataset.attribute_count()
        );
        Ok(dataset)
    }
}

/// Introspect the frame schema and convert every usable column.
fn dataset_from_frame(name: &str, df: &DataFrame) -> Result<Dataset> {
    let mut attributes = Vec::new();
    let mut columns: Vec<Vec<Value>> = Vec::new();

    for series in df.get_columns() {
        let index = attributes.len();
        let dtype = series.dtype();
        if dtype.is_numeric() {
            let values = numeric_column(series)?;
            let (min, max) = observed_range(&values);
            attributes.push(Attribute::continuous(series.name(), index, min, max));
            columns.push(values);
        } else if matches!(dtype, DataType::String | DataType::Boolean) {
            let values = text_column(series)?;
            let distinct: BTreeSet<String> = values
                .iter()
                .filter_map(|v| match v {
                    Value::Discrete(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
            attributes.push(Attribute::discrete(series.name(), index, distinct));
            columns.push(values);
        } else {
            debug!("Skipping column '{}' of unsupported type {}", series.name(), dtype);
        }
    }

    if attributes.is_empty() {
        return Err(Error::NoAttributes(name.to_string()));
    }

    let examples = (0..df.height())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect();

    Dataset::new(attributes, examples)
}

fn numeric_column(series: &Series) -> Result<Vec<Value>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => Value::Continuous(x),
            _ => Value::Missing,
        })
        .collect())
}

fn text_column(series: &Series) -> Result<Vec<Value>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| match v {
            Some(s) => Value::Discrete(s.to_string()),
            None => Value::Missing,
        })
        .collect())
}

/// Min and max over the present values; `(0, 0)` for a column without any.
fn observed_range(values: &[Value]) -> (f64, f64) {
    let mut present = values.iter().filter_map(|v| match v {
        Value::Continuous(x) => Some(*x),
        _ => None,
    });
    match present.next() {
        Some(first) => present.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x))),
        None => (0.0, 0.0),
    }
}
