//! Product descriptors: the identity of a layer or metric instance.
//!
//! Products declare their naming attributes explicitly as ordered
//! major/minor lists. The cache naming engine consumes only this
//! declaration; it never inspects product state directly.

use geo_types::Polygon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::crs::CrsCode;
use crate::error::{LayersError, LayersResult};

/// The serialized form a product produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// Geocoded raster grid
    RasterGrid,
    /// Geocoded feature table (geometries with attributes)
    FeatureTable,
    /// Plain row table (no geometry)
    RowTable,
}

impl OutputKind {
    /// File extension for artifacts of this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::RasterGrid => "grid",
            OutputKind::FeatureTable => "geojson",
            OutputKind::RowTable => "csv",
        }
    }
}

/// Whether a product is a base layer or a derived metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductFamily {
    Layer,
    Metric,
}

impl ProductFamily {
    /// Path segment used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductFamily::Layer => "layers",
            ProductFamily::Metric => "metrics",
        }
    }
}

/// A typed constructor-parameter value that participates in naming.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "{}", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

/// One naming attribute: key, value, and whether the value equals the
/// product type's declared default for that parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NamingAttribute {
    pub key: &'static str,
    pub value: AttributeValue,
    pub is_default: bool,
}

impl NamingAttribute {
    /// An attribute with no declared default; always counts as custom.
    pub fn new(key: &'static str, value: impl Into<AttributeValue>) -> Self {
        Self {
            key,
            value: value.into(),
            is_default: false,
        }
    }

    /// An attribute compared against its declared default.
    pub fn with_default(
        key: &'static str,
        value: impl Into<AttributeValue>,
        default: impl Into<AttributeValue>,
    ) -> Self {
        let value = value.into();
        let is_default = value == default.into();
        Self {
            key,
            value,
            is_default,
        }
    }
}

/// The identity of a layer or metric instance.
///
/// Major attributes participate in the human-meaningful product name;
/// minor attributes only in the disambiguating suffix. Implementations are
/// value objects: immutable after construction, never persisted.
pub trait Product {
    /// Type name used as the base of the product file id.
    fn class_name(&self) -> &'static str;

    fn family(&self) -> ProductFamily;

    fn output_kind(&self) -> OutputKind;

    /// Attributes included in the product name, in declaration order.
    fn major_attributes(&self) -> Vec<NamingAttribute> {
        Vec::new()
    }

    /// Attributes included only in the disambiguating suffix.
    fn minor_attributes(&self) -> Vec<NamingAttribute> {
        Vec::new()
    }

    /// Whether every naming attribute is at its declared default.
    ///
    /// Standard products go to the shared published cache tree; anything
    /// else is routed to the derivative tree.
    fn is_standard(&self) -> bool {
        self.major_attributes()
            .iter()
            .chain(self.minor_attributes().iter())
            .all(|a| a.is_default)
    }
}

/// One geocoded feature: a geometry with attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: String,
    pub geometry: Polygon<f64>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// A geocoded feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub crs: CrsCode,
    pub features: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new(crs: CrsCode, features: Vec<FeatureRecord>) -> Self {
        Self { crs, features }
    }

    /// Re-attach a CRS to a table deserialized without one.
    pub fn with_crs(mut self, crs: CrsCode) -> Self {
        self.crs = crs;
        self
    }
}

/// A plain row table with named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, checking arity against the declared columns.
    pub fn push_row(&mut self, row: Vec<String>) -> LayersResult<()> {
        if row.len() != self.columns.len() {
            return Err(LayersError::InvalidParameter {
                param: "row".to_string(),
                message: format!(
                    "expected {} values, got {}",
                    self.columns.len(),
                    row.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }
}
