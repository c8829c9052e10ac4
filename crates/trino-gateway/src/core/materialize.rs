//! Turns engine rows into generic JSON-ready values.
//!
//! Each column gets a [`ValueKind`] once, from the type the engine reports for
//! it, and every cell in that column is decoded through the same kind.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::arrow::datatypes::DataType;
use duckdb::core::{LogicalTypeHandle, LogicalTypeId};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Rows;
use thiserror::Error;

use crate::core::types::{Column, ResultPage, Value};
use crate::error::{AppError, AppResult};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Float64,
    Int64,
    Bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} value")]
    Mismatch { expected: &'static str },

    #[error("{0} does not fit in a 64-bit integer")]
    OutOfRange(String),

    #[error("nested values are not supported")]
    Unsupported,

    #[error("{0}")]
    Invalid(String),
}

impl ValueKind {
    /// Priority order: text, float, integer, boolean, then text as fallback.
    pub fn for_type(id: LogicalTypeId) -> Self {
        if is_textual(id) {
            ValueKind::Text
        } else if is_float(id) {
            ValueKind::Float64
        } else if is_integer(id) {
            ValueKind::Int64
        } else if id == LogicalTypeId::Boolean {
            ValueKind::Bool
        } else {
            ValueKind::Text
        }
    }

    pub fn decode(self, value: ValueRef<'_>) -> Result<Value, DecodeError> {
        if matches!(value, ValueRef::Null) {
            return Ok(Value::Null);
        }
        match self {
            ValueKind::Text => render_text(value).map(Value::String),
            ValueKind::Float64 => decode_float(value).map(Value::Float64),
            ValueKind::Int64 => decode_int(value).map(Value::Int64),
            ValueKind::Bool => match value {
                ValueRef::Boolean(b) => Ok(Value::Bool(b)),
                _ => Err(DecodeError::Mismatch { expected: "boolean" }),
            },
        }
    }
}

/// How one result column is reported and decoded.
struct ColumnPlan {
    column: Column,
    kind: ValueKind,
    id: LogicalTypeId,
}

impl ColumnPlan {
    fn new(name: String, logical: &LogicalTypeHandle, arrow: &DataType) -> Self {
        let id = logical.id();
        Self {
            column: Column {
                name,
                type_name: native_type_name(logical, Some(arrow)),
            },
            kind: ValueKind::for_type(id),
            id,
        }
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<Value, DecodeError> {
        match (self.id, value) {
            // Zoned timestamps hold a UTC instant.
            (LogicalTypeId::TimestampTZ, ValueRef::Timestamp(unit, v)) => {
                render_timestamp(to_micros(unit, v)).map(|ts| Value::String(format!("{ts}+00")))
            }
            (LogicalTypeId::Uuid, ValueRef::Blob(bytes)) if bytes.len() == 16 => {
                Ok(Value::String(render_uuid(bytes)))
            }
            _ => self.kind.decode(value),
        }
    }

    fn failure(&self, reason: &str) -> AppError {
        AppError::Decode(format!(
            "cannot decode column {} ({}): {reason}",
            self.column.name, self.column.type_name
        ))
    }
}

/// Drains `rows` into a page. The first undecodable cell fails the whole page.
pub fn materialize(rows: &mut Rows<'_>) -> AppResult<ResultPage> {
    let stmt = rows
        .as_ref()
        .ok_or_else(|| AppError::Internal("result set has no statement".into()))?;
    let plan: Vec<ColumnPlan> = stmt
        .column_names()
        .into_iter()
        .enumerate()
        .map(|(i, name)| ColumnPlan::new(name, &stmt.column_logical_type(i), &stmt.column_type(i)))
        .collect();

    let mut data = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(plan.len());
        for (i, column) in plan.iter().enumerate() {
            let raw = row.get_ref(i).map_err(|e| column.failure(&e.to_string()))?;
            let value = column.decode(raw).map_err(|e| column.failure(&e.to_string()))?;
            values.push(value);
        }
        data.push(values);
    }

    Ok(ResultPage {
        columns: plan.into_iter().map(|p| p.column).collect(),
        rows: data,
    })
}

/// The engine's spelling of a column type. A type alias (`JSON`, a named
/// `ENUM`) wins over the underlying type. `arrow` only supplies what the
/// logical type does not expose, such as fixed array sizes.
pub fn native_type_name(logical: &LogicalTypeHandle, arrow: Option<&DataType>) -> String {
    if let Some(alias) = logical.get_alias() {
        return alias;
    }
    let name = match logical.id() {
        LogicalTypeId::Boolean => "BOOLEAN",
        LogicalTypeId::Tinyint => "TINYINT",
        LogicalTypeId::Smallint => "SMALLINT",
        LogicalTypeId::Integer => "INTEGER",
        LogicalTypeId::Bigint => "BIGINT",
        LogicalTypeId::Hugeint => "HUGEINT",
        LogicalTypeId::UTinyint => "UTINYINT",
        LogicalTypeId::USmallint => "USMALLINT",
        LogicalTypeId::UInteger => "UINTEGER",
        LogicalTypeId::UBigint => "UBIGINT",
        LogicalTypeId::UHugeint => "UHUGEINT",
        LogicalTypeId::Float => "FLOAT",
        LogicalTypeId::Double => "DOUBLE",
        LogicalTypeId::Decimal => {
            return format!(
                "DECIMAL({},{})",
                logical.decimal_width(),
                logical.decimal_scale()
            );
        }
        LogicalTypeId::Varchar => "VARCHAR",
        LogicalTypeId::Blob => "BLOB",
        LogicalTypeId::Bit => "BIT",
        LogicalTypeId::Bignum => "BIGNUM",
        LogicalTypeId::Uuid => "UUID",
        LogicalTypeId::Date => "DATE",
        LogicalTypeId::Time => "TIME",
        LogicalTypeId::TimeNs => "TIME_NS",
        LogicalTypeId::TimeTZ => "TIME WITH TIME ZONE",
        LogicalTypeId::Timestamp => "TIMESTAMP",
        LogicalTypeId::TimestampS => "TIMESTAMP_S",
        LogicalTypeId::TimestampMs => "TIMESTAMP_MS",
        LogicalTypeId::TimestampNs => "TIMESTAMP_NS",
        LogicalTypeId::TimestampTZ => "TIMESTAMP WITH TIME ZONE",
        LogicalTypeId::Interval => "INTERVAL",
        LogicalTypeId::Enum => "ENUM",
        LogicalTypeId::Geometry => "GEOMETRY",
        LogicalTypeId::Variant => "VARIANT",
        LogicalTypeId::SqlNull => "\"NULL\"",
        LogicalTypeId::List => {
            let child = match arrow {
                Some(DataType::List(field) | DataType::LargeList(field)) => Some(field.data_type()),
                _ => None,
            };
            return format!("{}[]", native_type_name(&logical.child(0), child));
        }
        LogicalTypeId::Array => {
            return match arrow {
                Some(DataType::FixedSizeList(field, size)) => format!(
                    "{}[{size}]",
                    native_type_name(&logical.child(0), Some(field.data_type()))
                ),
                _ => format!("{}[]", native_type_name(&logical.child(0), None)),
            };
        }
        LogicalTypeId::Struct | LogicalTypeId::Union => {
            let keyword = if logical.id() == LogicalTypeId::Struct { "STRUCT" } else { "UNION" };
            let fields = match arrow {
                Some(DataType::Struct(fields)) => Some(fields),
                _ => None,
            };
            let members: Vec<String> = (0..logical.num_children())
                .map(|i| {
                    let hint = fields.and_then(|f| f.get(i)).map(|f| f.data_type());
                    format!(
                        "{} {}",
                        logical.child_name(i),
                        native_type_name(&logical.child(i), hint)
                    )
                })
                .collect();
            return format!("{keyword}({})", members.join(", "));
        }
        LogicalTypeId::Map => {
            return format!(
                "MAP({}, {})",
                native_type_name(&logical.child(0), None),
                native_type_name(&logical.child(1), None)
            );
        }
        other => return format!("{other:?}").to_uppercase(),
    };
    name.to_string()
}

fn is_textual(id: LogicalTypeId) -> bool {
    id == LogicalTypeId::Varchar
}

fn is_float(id: LogicalTypeId) -> bool {
    matches!(
        id,
        LogicalTypeId::Float | LogicalTypeId::Double | LogicalTypeId::Decimal
    )
}

fn is_integer(id: LogicalTypeId) -> bool {
    matches!(
        id,
        LogicalTypeId::Tinyint
            | LogicalTypeId::Smallint
            | LogicalTypeId::Integer
            | LogicalTypeId::Bigint
            | LogicalTypeId::Hugeint
            | LogicalTypeId::UTinyint
            | LogicalTypeId::USmallint
            | LogicalTypeId::UInteger
            | LogicalTypeId::UBigint
            | LogicalTypeId::UHugeint
    )
}

fn decode_float(value: ValueRef<'_>) -> Result<f64, DecodeError> {
    match value {
        ValueRef::Float(v) => Ok(f64::from(v)),
        ValueRef::Double(v) => Ok(v),
        ValueRef::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_err(|e| DecodeError::Invalid(e.to_string())),
        ValueRef::TinyInt(v) => Ok(f64::from(v)),
        ValueRef::SmallInt(v) => Ok(f64::from(v)),
        ValueRef::Int(v) => Ok(f64::from(v)),
        ValueRef::BigInt(v) => Ok(v as f64),
        ValueRef::HugeInt(v) => Ok(v as f64),
        ValueRef::UTinyInt(v) => Ok(f64::from(v)),
        ValueRef::USmallInt(v) => Ok(f64::from(v)),
        ValueRef::UInt(v) => Ok(f64::from(v)),
        ValueRef::UBigInt(v) => Ok(v as f64),
        ValueRef::UHugeInt(v) => Ok(v as f64),
        _ => Err(DecodeError::Mismatch {
            expected: "floating-point",
        }),
    }
}

fn decode_int(value: ValueRef<'_>) -> Result<i64, DecodeError> {
    match value {
        ValueRef::TinyInt(v) => Ok(i64::from(v)),
        ValueRef::SmallInt(v) => Ok(i64::from(v)),
        ValueRef::Int(v) => Ok(i64::from(v)),
        ValueRef::BigInt(v) => Ok(v),
        ValueRef::UTinyInt(v) => Ok(i64::from(v)),
        ValueRef::USmallInt(v) => Ok(i64::from(v)),
        ValueRef::UInt(v) => Ok(i64::from(v)),
        ValueRef::UBigInt(v) => i64::try_from(v).map_err(|_| out_of_range(v)),
        ValueRef::HugeInt(v) => i64::try_from(v).map_err(|_| out_of_range(v)),
        ValueRef::UHugeInt(v) => i64::try_from(v).map_err(|_| out_of_range(v)),
        _ => Err(DecodeError::Mismatch { expected: "integer" }),
    }
}

fn out_of_range(v: impl ToString) -> DecodeError {
    DecodeError::OutOfRange(v.to_string())
}

fn render_text(value: ValueRef<'_>) -> Result<String, DecodeError> {
    let text = match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| DecodeError::Invalid(format!("invalid UTF-8: {e}")))?
            .to_string(),
        ValueRef::Enum(..) => value
            .as_str()
            .map_err(|e| DecodeError::Invalid(format!("enum label: {e}")))?
            .to_string(),
        ValueRef::Boolean(v) => v.to_string(),
        ValueRef::TinyInt(v) => v.to_string(),
        ValueRef::SmallInt(v) => v.to_string(),
        ValueRef::Int(v) => v.to_string(),
        ValueRef::BigInt(v) => v.to_string(),
        ValueRef::HugeInt(v) => v.to_string(),
        ValueRef::UTinyInt(v) => v.to_string(),
        ValueRef::USmallInt(v) => v.to_string(),
        ValueRef::UInt(v) => v.to_string(),
        ValueRef::UBigInt(v) => v.to_string(),
        ValueRef::UHugeInt(v) => v.to_string(),
        ValueRef::Float(v) => v.to_string(),
        ValueRef::Double(v) => v.to_string(),
        ValueRef::Decimal(d) => d.to_string(),
        ValueRef::Blob(bytes) | ValueRef::Geometry(bytes) => STANDARD.encode(bytes),
        ValueRef::Date32(days) => render_date(days)?,
        ValueRef::Time64(unit, v) => render_time(to_micros(unit, v))?,
        ValueRef::Timestamp(unit, v) => render_timestamp(to_micros(unit, v))?,
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => render_interval(months, days, nanos),
        _ => return Err(DecodeError::Unsupported),
    };
    Ok(text)
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn render_date(days: i32) -> Result<String, DecodeError> {
    days.checked_add(UNIX_EPOCH_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| DecodeError::Invalid(format!("date out of range: {days} days")))
}

fn render_time(micros: i64) -> Result<String, DecodeError> {
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok();
    secs.zip(nanos)
        .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
        .map(|t| t.format("%H:%M:%S%.f").to_string())
        .ok_or_else(|| DecodeError::Invalid(format!("time out of range: {micros} us")))
}

fn render_timestamp(micros: i64) -> Result<String, DecodeError> {
    DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .ok_or_else(|| DecodeError::Invalid(format!("timestamp out of range: {micros} us")))
}

fn render_uuid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(36);
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn render_interval(months: i32, days: i32, nanos: i64) -> String {
    fn unit(n: i32, singular: &str) -> String {
        if n == 1 || n == -1 {
            format!("{n} {singular}")
        } else {
            format!("{n} {singular}s")
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "month"));
    }
    if days != 0 {
        parts.push(unit(days, "day"));
    }
    if nanos != 0 || parts.is_empty() {
        let sign = if nanos < 0 { "-" } else { "" };
        let micros = (nanos / 1_000).unsigned_abs();
        let (secs, frac) = (micros / 1_000_000, micros % 1_000_000);
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if frac != 0 {
            clock.push_str(&format!(".{frac:06}"));
        }
        parts.push(clock);
    }
    parts.join(" ")
}
