//! Best-effort conversion of raw API records into typed records.
//!
//! Each dataset declares a fixed schema (field name and [`FieldType`]). In
//! [`ConversionMode::Lenient`] a value that does not convert is replaced by
//! the type's default and reported as a [`ConversionError`] in
//! [`Normalized::issues`]; normalization itself never fails. In
//! [`ConversionMode::Strict`] the first bad value is returned as an error.
//!
//! Missing, null and blank values are not conversion failures: they take the
//! default silently and are summarized per field at INFO level.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::fetcher::{json_kind, RawRecord};
use crate::sheets::Cell;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Format used when a datetime is written to a sheet cell.
pub const SHEET_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `i64`, default 0.
    Integer,
    /// `String`, default empty.
    Text,
    /// `Option<String>`, default `None`.
    NullableText,
    /// `Option<NaiveDateTime>`, default `None`.
    DateTime,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Integer => "integer",
            FieldType::Text => "string",
            FieldType::NullableText => "nullable string",
            FieldType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// One column of a dataset schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind }
    }
}

/// A typed record built from one raw API item.
pub trait Record: Sized {
    /// Dataset label used in logs and run reports.
    const DATASET: &'static str;

    /// Columns in sheet order. Header names are the raw field names.
    fn schema() -> &'static [Field];

    /// Read every schema field through `reader`.
    fn from_raw(reader: &mut FieldReader<'_>) -> Result<Self, ConversionError>;

    /// Cells in the same order as [`Record::schema`].
    fn to_row(&self) -> Vec<Cell>;

    fn headers() -> Vec<&'static str> {
        Self::schema().iter().map(|f| f.name).collect()
    }
}

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

/// A single value that could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("record {index}: field '{field}' cannot be converted to {expected}: {reason}")]
pub struct ConversionError {
    pub index: usize,
    pub field: String,
    pub expected: FieldType,
    pub value: Value,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionMode {
    /// Substitute defaults and keep going.
    #[default]
    Lenient,
    /// Stop at the first conversion failure.
    Strict,
}

/// Output of [`normalize`]: one record per input item plus every recovered
/// conversion failure.
#[derive(Debug, Clone)]
pub struct Normalized<R> {
    pub records: Vec<R>,
    pub issues: Vec<ConversionError>,
}

// ---------------------------------------------------------------------------
// Value conversions
// ---------------------------------------------------------------------------

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Convert to an integer. Integral floats and numeric strings are accepted;
/// a string may carry a fraction of zeros (`"7.00"`) but no exponent.
pub fn to_integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                if n.is_f64() {
                    n.as_f64().and_then(exact_integral_f64)
                } else {
                    None
                }
            })
            .ok_or_else(|| format!("{} is not an integer in range", n)),
        Value::String(s) => {
            parse_integer_str(s.trim()).ok_or_else(|| format!("'{}' is not an integer", s))
        }
        other => Err(format!("got {}", json_kind(other))),
    }
}

/// Largest magnitude below which every integer is exactly representable.
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

fn exact_integral_f64(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_F64).then_some(f as i64)
}

fn parse_integer_str(s: &str) -> Option<i64> {
    let whole = match s.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
        Some(_) => return None,
        None => s,
    };
    whole.parse().ok()
}

/// Convert a scalar to its text form.
pub fn to_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(format!("got {}", json_kind(other))),
    }
}

/// Parse a datetime string. Offsets are dropped, keeping the wall-clock time
/// as sent by the API. A bare date means midnight.
pub fn to_datetime(value: &Value) -> Result<NaiveDateTime, String> {
    let s = match value {
        Value::String(s) => s.trim(),
        other => return Err(format!("got {}", json_kind(other))),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("'{}' is not a recognized datetime", s))
}

// ---------------------------------------------------------------------------
// FieldReader
// ---------------------------------------------------------------------------

/// Per-record accessor handed to [`Record::from_raw`].
pub struct FieldReader<'a> {
    raw: &'a RawRecord,
    index: usize,
    mode: ConversionMode,
    issues: &'a mut Vec<ConversionError>,
    missing: &'a mut BTreeMap<&'static str, usize>,
}

impl<'a> FieldReader<'a> {
    fn read<T>(
        &mut self,
        field: &'static str,
        expected: FieldType,
        default: T,
        convert: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Result<T, ConversionError> {
        let raw = self.raw;
        let value = match raw.get(field) {
            Some(v) if !is_blank(v) => v,
            _ => {
                *self.missing.entry(field).or_insert(0) += 1;
                return Ok(default);
            }
        };

        match convert(value) {
            Ok(converted) => Ok(converted),
            Err(reason) => {
                let err = ConversionError {
                    index: self.index,
                    field: field.to_string(),
                    expected,
                    value: value.clone(),
                    reason,
                };
                if self.mode == ConversionMode::Strict {
                    return Err(err);
                }
                tracing::warn!(
                    "Record {}: failed to convert '{}' to {} ({}); using default",
                    self.index,
                    field,
                    expected,
                    err.reason
                );
                self.issues.push(err);
                Ok(default)
            }
        }
    }

    pub fn integer(&mut self, field: &'static str) -> Result<i64, ConversionError> {
        self.read(field, FieldType::Integer, 0, to_integer)
    }

    pub fn text(&mut self, field: &'static str) -> Result<String, ConversionError> {
        self.read(field, FieldType::Text, String::new(), to_text)
    }

    pub fn nullable_text(&mut self, field: &'static str) -> Result<Option<String>, ConversionError> {
        let raw = self.raw;
        match raw.get(field) {
            // Empty strings are real values for nullable text.
            Some(Value::String(s)) => Ok(Some(s.clone())),
            _ => self.read(field, FieldType::NullableText, None, |v| to_text(v).map(Some)),
        }
    }

    pub fn datetime(&mut self, field: &'static str) -> Result<Option<NaiveDateTime>, ConversionError> {
        self.read(field, FieldType::DateTime, None, |v| to_datetime(v).map(Some))
    }
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Convert raw records into `R`, one output record per input item.
///
/// Never fails in lenient mode.
pub fn normalize<R: Record>(
    raw: &[RawRecord],
    mode: ConversionMode,
) -> Result<Normalized<R>, ConversionError> {
    let mut issues = Vec::new();
    let mut missing = BTreeMap::new();
    let mut records = Vec::with_capacity(raw.len());

    for (index, item) in raw.iter().enumerate() {
        let mut reader = FieldReader {
            raw: item,
            index,
            mode,
            issues: &mut issues,
            missing: &mut missing,
        };
        records.push(R::from_raw(&mut reader)?);
    }

    for (field, count) in &missing {
        tracing::info!(
            "{}: field '{}' missing or empty in {} of {} records; default used",
            R::DATASET,
            field,
            count,
            raw.len()
        );
    }
    if issues.is_empty() {
        tracing::info!("{}: normalized {} records", R::DATASET, records.len());
    } else {
        tracing::warn!(
            "{}: normalized {} records with {} conversion issue(s)",
            R::DATASET,
            records.len(),
            issues.len()
        );
    }

    Ok(Normalized { records, issues })
}
