//! Converter registry: bidirectional text <-> typed-value mappings.
//!
//! The registry is session-scoped (`ConverterRegistry`, owned by
//! `ExecutionContext`) rather than a bare thread-local. A process-wide,
//! read-only default snapshot is built once with `lazy_static`, and every
//! session starts from a copy-on-write overlay of it, so registering a
//! converter in one session can never be observed by another.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use lazy_static::lazy_static;
use thiserror::Error;

/// Renders a time as `HH:MM:SS`, appending `.ffffff` only when the
/// sub-second component is nonzero -- matching the original converter's
/// `to_string(time(1,2,3))` == `'01:02:03'` vs.
/// `to_string(time(1,2,3,4))` == `'01:02:03.000004'`.
fn format_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}

/// A fully-resolved, typed value flowing through the interpreter: the
/// result of converting a wire string, or the argument to a conversion
/// back to a wire string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Void,
}

impl Value {
    /// The type tag used to pick a converter for this runtime value -- the
    /// Rust stand-in for "the type of the value being converted" in the
    /// original dynamically-typed design.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Void => "void",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", format_time(t)),
            Value::DateTime(dt) => write!(f, "{} {}", dt.format("%Y-%m-%d"), format_time(&dt.time())),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Void => write!(f, ""),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConvertError {
    #[error("'{0}' is not a valid {1}")]
    BadFormat(String, &'static str),
    #[error("no converter registered for type '{0}' supports parsing from text")]
    Unsupported(String),
}

/// Bidirectional text <-> value mapping for one type tag.
pub trait Converter: Send + Sync {
    fn to_string(&self, value: &Value) -> String;
    fn from_string(&self, text: &str) -> Result<Value, ConvertError>;
}

pub struct StrConverter;
impl Converter for StrConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        Ok(Value::Str(text.to_owned()))
    }
}

pub struct IntConverter;
impl Converter for IntConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConvertError::BadFormat(text.to_owned(), "int"))
    }
}

pub struct FloatConverter;
impl Converter for FloatConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        text.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConvertError::BadFormat(text.to_owned(), "float"))
    }
}

/// `yes`/`no` boolean spelling, case-insensitive on the way in.
pub struct YesNoConverter;
impl Converter for YesNoConverter {
    fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Bool(true) => "yes".to_owned(),
            _ => "no".to_owned(),
        }
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        Ok(Value::Bool(text.eq_ignore_ascii_case("yes")))
    }
}

/// `true`/`false` boolean spelling, case-insensitive on the way in. This is
/// the default `bool` converter (matches the upstream behavior where
/// `YesNoConverter` is opt-in per session).
pub struct TrueFalseConverter;
impl Converter for TrueFalseConverter {
    fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Bool(true) => "true".to_owned(),
            _ => "false".to_owned(),
        }
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        Ok(Value::Bool(text.eq_ignore_ascii_case("true")))
    }
}

pub struct DateConverter;
impl Converter for DateConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| ConvertError::BadFormat(text.to_owned(), "date"))
    }
}

pub struct TimeConverter;
impl Converter for TimeConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        let text = text.trim();
        NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
            .map(Value::Time)
            .map_err(|_| ConvertError::BadFormat(text.to_owned(), "time"))
    }
}

pub struct DateTimeConverter;
impl Converter for DateTimeConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
            .map(Value::DateTime)
            .map_err(|_| ConvertError::BadFormat(text.to_owned(), "datetime"))
    }
}

/// Base converter: used for any type tag with no registration. `to_string`
/// falls back to `Display`; `from_string` is unsupported, matching
/// upstream's `Converter.from_string` raising `NotImplementedError`.
pub struct BaseConverter;
impl Converter for BaseConverter {
    fn to_string(&self, value: &Value) -> String {
        value.to_string()
    }
    fn from_string(&self, text: &str) -> Result<Value, ConvertError> {
        Err(ConvertError::Unsupported(text.to_owned()))
    }
}

type ConverterTable = HashMap<String, Arc<dyn Converter>>;

fn builtin_table() -> ConverterTable {
    let mut table: ConverterTable = HashMap::new();
    table.insert("str".to_owned(), Arc::new(StrConverter));
    table.insert("int".to_owned(), Arc::new(IntConverter));
    table.insert("float".to_owned(), Arc::new(FloatConverter));
    table.insert("bool".to_owned(), Arc::new(TrueFalseConverter));
    table.insert("date".to_owned(), Arc::new(DateConverter));
    table.insert("time".to_owned(), Arc::new(TimeConverter));
    table.insert("datetime".to_owned(), Arc::new(DateTimeConverter));
    table
}

lazy_static! {
    /// Process-wide, read-only default registry snapshot. Never mutated
    /// after startup; sessions clone it into their own overlay.
    static ref DEFAULT_TABLE: ConverterTable = builtin_table();
}

/// Session-owned, copy-on-write overlay on top of the process default.
/// Mutations (`register`) are visible only within the owning session.
#[derive(Clone)]
pub struct ConverterRegistry {
    overlay: ConverterTable,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self {
            overlay: HashMap::new(),
        }
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a converter under a type tag for this session only.
    pub fn register(&mut self, type_tag: &str, converter: Arc<dyn Converter>) {
        self.overlay.insert(type_tag.to_owned(), converter);
    }

    /// Looks up the converter registered (in this session, or the process
    /// default) for a type tag, falling back to `BaseConverter`.
    pub fn converter_for_tag(&self, type_tag: &str) -> Arc<dyn Converter> {
        if let Some(c) = self.overlay.get(type_tag) {
            return c.clone();
        }
        if let Some(c) = DEFAULT_TABLE.get(type_tag) {
            return c.clone();
        }
        Arc::new(BaseConverter)
    }

    /// Looks up the converter for a runtime value's own type.
    pub fn converter_for(&self, value: &Value) -> Arc<dyn Converter> {
        self.converter_for_tag(value.type_tag())
    }

    /// Converts a wire string to a typed `Value` using the converter
    /// registered for `type_tag`. Lists recurse element-wise; each
    /// element's text is split on the list item's own conversion (callers
    /// pass pre-split items for a `Value::List` conversion).
    pub fn from_string(&self, type_tag: &str, text: &str) -> Result<Value, ConvertError> {
        self.converter_for_tag(type_tag).from_string(text)
    }

    /// Converts a scalar typed `Value` back to its wire string form,
    /// dispatching on the value's own runtime type. Not meant for
    /// `Value::List` -- a list has no single string representation on the
    /// wire, only a nested one; see `to_wire`.
    pub fn to_string(&self, value: &Value) -> String {
        self.converter_for(value).to_string(value)
    }

    /// Converts a typed `Value` to its wire representation: a scalar
    /// becomes a single `codec::Value::Str`, a list becomes a nested
    /// `codec::Value::List` of each element's own conversion (recursing,
    /// so nested lists pack correctly). This mirrors the original
    /// `IterableConverter.to_string`, which returns a list of converted
    /// strings rather than one joined string, so the runner can parse a
    /// fixture's list return value element-by-element off the wire.
    pub fn to_wire(&self, value: &Value) -> crate::codec::Value {
        match value {
            Value::List(items) => crate::codec::Value::List(items.iter().map(|v| self.to_wire(v)).collect()),
            other => crate::codec::Value::Str(self.to_string(other)),
        }
    }
}

/// What converter to apply to one positional argument of a fixture method:
/// either "use the converter for this declared type tag" or an explicit
/// converter instance. This is the Rust stand-in for the `convert_arg`
/// decorator's `to_type=`/`using=` keyword arguments -- explicit data
/// instead of decorating a callable, per the builder-style-wrapper
/// redesign note.
#[derive(Clone)]
pub enum ArgSpec {
    ByTag(&'static str),
    Explicit(Arc<dyn Converter>),
}

impl ArgSpec {
    pub fn convert(&self, registry: &ConverterRegistry, text: &str) -> Result<Value, ConvertError> {
        match self {
            ArgSpec::ByTag(tag) => registry.from_string(tag, text),
            ArgSpec::Explicit(converter) => converter.from_string(text),
        }
    }
}
