//! Attributes, values, items and tuples.
//!
//! An [`Item`] pairs a value with the [`Attribute`] it belongs to. The attribute kind
//! decides how two values are compared:
//!
//! - discrete attributes compare by equality (`0.0` or `1.0`),
//! - continuous attributes scale both values into `[0, 1]` using the attribute's
//!   `[min, max]` domain and return the absolute difference.
//!
//! A [`Tuple`] is an immutable row of items; its distance to another tuple is the sum
//! of the per-position item distances.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::error::{Error, Result};

/// Distance contributed by a position whose values cannot be compared.
///
/// Covers a counterpart of the other kind, a missing value on either side and
/// non-finite continuous values.
pub const MISMATCH_DISTANCE: f64 = 1.0;

/// Domain of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Nominal attribute with its distinct values.
    Discrete {
        /// Distinct values observed for the attribute.
        values: BTreeSet<String>,
    },
    /// Numeric attribute with its observed range.
    Continuous {
        /// Smallest observed value.
        min: f64,
        /// Largest observed value.
        max: f64,
    },
}

/// A named column of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    index: usize,
    #[serde(flatten)]
    kind: AttributeKind,
}

impl Attribute {
    /// Discrete attribute over the given values.
    pub fn discrete<I, S>(name: impl Into<String>, index: usize, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            index,
            kind: AttributeKind::Discrete {
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Continuous attribute over `[min, max]`.
    pub fn continuous(name: impl Into<String>, index: usize, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            index,
            kind: AttributeKind::Continuous { min, max },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self.kind, AttributeKind::Continuous { .. })
    }

    /// Number of distinct values of a discrete attribute, `None` for continuous ones.
    pub fn distinct_values(&self) -> Option<usize> {
        match &self.kind {
            AttributeKind::Discrete { values } => Some(values.len()),
            AttributeKind::Continuous { .. } => None,
        }
    }

    /// Scale `v` into `[0, 1]` using the attribute domain.
    ///
    /// A degenerate domain (`max == min`) scales everything to `0.0`.
    /// Discrete attributes return `None`.
    pub fn scale(&self, v: f64) -> Option<f64> {
        match self.kind {
            AttributeKind::Continuous { min, max } => {
                let span = max - min;
                if span == 0.0 {
                    Some(0.0)
                } else {
                    Some((v - min) / span)
                }
            }
            AttributeKind::Discrete { .. } => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A raw cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Discrete(String),
    Continuous(f64),
    Missing,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Discrete(s) => f.write_str(s),
            Value::Continuous(v) => write!(f, "{}", v),
            Value::Missing => f.write_str("?"),
        }
    }
}

/// A value bound to its attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    attribute: Arc<Attribute>,
    value: Value,
}

impl Item {
    /// Bind `value` to `attribute`.
    ///
    /// Fails if the value kind does not match the attribute kind. `Value::Missing`
    /// is accepted for both kinds.
    pub fn new(attribute: Arc<Attribute>, value: Value) -> Result<Self> {
        let compatible = matches!(
            (&attribute.kind, &value),
            (_, Value::Missing)
                | (AttributeKind::Discrete { .. }, Value::Discrete(_))
                | (AttributeKind::Continuous { .. }, Value::Continuous(_))
        );
        if !compatible {
            return Err(Error::ValueKindMismatch {
                attribute: attribute.name.clone(),
                expected: if attribute.is_continuous() {
                    "number"
                } else {
                    "text"
                },
            });
        }
        Ok(Self { attribute, value })
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Distance between this item's value and `other`, read under this item's attribute.
    ///
    /// Never fails: incomparable pairs contribute [`MISMATCH_DISTANCE`].
    pub fn distance(&self, other: &Value) -> f64 {
        match (&self.attribute.kind, &self.value, other) {
            (AttributeKind::Discrete { .. }, Value::Discrete(a), Value::Discrete(b)) => {
                if a == b {
                    0.0
                } else {
                    1.0
                }
            }
            (AttributeKind::Continuous { .. }, Value::Continuous(a), Value::Continuous(b)) => {
                match (self.attribute.scale(*a), self.attribute.scale(*b)) {
                    (Some(sa), Some(sb)) if sa.is_finite() && sb.is_finite() => (sa - sb).abs(),
                    _ => MISMATCH_DISTANCE,
                }
            }
            _ => MISMATCH_DISTANCE,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// An immutable, fixed-length row of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    items: Vec<Item>,
}

impl Tuple {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Item> {
        self.items.get(i)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Sum of per-position item distances.
    ///
    /// # Errors
    ///
    /// [`Error::TupleLengthMismatch`] if the tuples differ in length.
    pub fn distance(&self, other: &Tuple) -> Result<f64> {
        if self.len() != other.len() {
            return Err(Error::TupleLengthMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(self
            .items
            .iter()
            .zip(other.items.iter())
            .map(|(a, b)| a.distance(&b.value))
            .sum())
    }

    /// Mean distance from this tuple to the examples of `dataset` listed in `members`.
    ///
    /// An empty member set gives `0.0`.
    pub fn avg_distance<I>(&self, dataset: &Dataset, members: I) -> Result<f64>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut total = 0.0;
        let mut count = 0usize;
        for id in members {
            total += self.distance(&dataset.tuple_at(id)?)?;
            count += 1;
        }
        if count == 0 {
            return Ok(0.0);
        }
        Ok(total / count as f64)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            fmt::Display::fmt(item, f)?;
        }
        Ok(())
    }
}
