//! The SLIM list codec: a recursive, fixed-width length-prefixed encoding.
//!
//! `pack`/`unpack` are a bijection modulo stringification: every `List`
//! round-trips through `unpack(&pack(list))`, see the tests at the bottom
//! of this module and the end-to-end scenarios in `tests/session.rs`.

use nom::bytes::complete::{tag, take};
use nom::character::complete::digit1;
use nom::combinator::map_res;
use nom::error::{ErrorKind, ParseError, VerboseError};
use nom::multi::count;
use nom::sequence::terminated;
use thiserror::Error;

/// Width of every length/count field on the wire.
const WIDTH: usize = 6;
/// One past the largest count/length `pack` will emit without overflowing
/// the fixed six-digit field.
const MAX_COUNT: usize = 1_000_000;

pub type PResult<'i, O> = nom::IResult<&'i str, O, nom::error::VerboseError<&'i str>>;

/// A logical value on the wire: either a leaf string (or the absent-value
/// sentinel) or a nested list of values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Null,
    List(Vec<Value>),
}

impl Value {
    pub fn str<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Errors `unpack` (or encoding overflow in `pack`) can raise. Carries the
/// offending input so callers can log a useful diagnostic.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum UnpackingError {
    #[error("'{0}' has no leading '['")]
    NoLeadingBracket(String),
    #[error("'{0}' has no trailing ']'")]
    NoTrailingBracket(String),
    #[error("malformed list in '{0}': {1}")]
    Malformed(String, String),
    #[error("count or length overflowed the 6-digit field while encoding")]
    Overflow,
}

fn count_field(i: &str) -> PResult<usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(i)
}

fn frame(i: &str) -> PResult<Value> {
    let (i, len) = terminated(count_field, tag(":"))(i)?;
    let (i, payload) = take(len)(i)?;
    let (i, _) = tag(":")(i)?;
    let value = if payload.starts_with('[') {
        let (rem, v) = list(payload)?;
        if !rem.is_empty() {
            return Err(nom::Err::Failure(VerboseError::from_error_kind(
                payload,
                ErrorKind::Verify,
            )));
        }
        v
    } else {
        Value::Str(payload.to_owned())
    };
    Ok((i, value))
}

fn list(i: &str) -> PResult<Value> {
    let (i, _) = tag("[")(i)?;
    let (i, n) = terminated(count_field, tag(":"))(i)?;
    let (i, items) = count(frame, n)(i)?;
    let (i, _) = tag("]")(i)?;
    Ok((i, Value::List(items)))
}

fn six_digit(n: usize) -> Result<String, UnpackingError> {
    if n >= MAX_COUNT {
        return Err(UnpackingError::Overflow);
    }
    Ok(format!("{:0width$}", n, width = WIDTH))
}

fn pack_value(value: &Value, out: &mut String) -> Result<(), UnpackingError> {
    match value {
        Value::List(items) => {
            out.push('[');
            out.push_str(&six_digit(items.len())?);
            out.push(':');
            for item in items {
                let mut inner = String::new();
                pack_value(item, &mut inner)?;
                out.push_str(&six_digit(inner.len())?);
                out.push(':');
                out.push_str(&inner);
                out.push(':');
            }
            out.push(']');
        }
        Value::Str(s) => out.push_str(s),
        Value::Null => out.push_str("null"),
    }
    Ok(())
}

/// Encode a list of values into its framed wire representation.
///
/// `pack(&Value::list([]))` == `"[000000:]"`.
pub fn pack(value: &Value) -> Result<String, UnpackingError> {
    let mut out = String::new();
    match value {
        Value::List(_) => pack_value(value, &mut out)?,
        other => {
            // top-level pack always takes a list; wrap bare values defensively
            pack_value(&Value::List(vec![other.clone()]), &mut out)?
        }
    }
    Ok(out)
}

/// Decode a framed list payload back into nested `Value`s.
///
/// Requires a leading `[` and trailing `]`; any other malformed input fails
/// with a descriptive `UnpackingError`.
pub fn unpack(text: &str) -> Result<Value, UnpackingError> {
    if !text.starts_with('[') {
        return Err(UnpackingError::NoLeadingBracket(text.to_owned()));
    }
    if !text.ends_with(']') {
        return Err(UnpackingError::NoTrailingBracket(text.to_owned()));
    }
    match list(text) {
        Ok((rem, value)) if rem.is_empty() => Ok(value),
        Ok((rem, _)) => Err(UnpackingError::Malformed(
            text.to_owned(),
            format!("{} unconsumed bytes trailing", rem.len()),
        )),
        Err(e) => Err(UnpackingError::Malformed(text.to_owned(), e.to_string())),
    }
}

/// Convenience: pack a flat list of strings (the common case for result
/// records and simple instruction lists).
pub fn pack_strings<I, S>(items: I) -> Result<String, UnpackingError>
where
    I: IntoIterator<Item = S>,
    S: Into<Value>,
{
    pack(&Value::list(items.into_iter().map(Into::into)))
}

/// Flatten a decoded top-level list into its direct children, erroring if
/// the decoded value was not a list.
pub fn into_items(value: Value) -> Result<Vec<Value>, UnpackingError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(UnpackingError::Malformed(
            format!("{:?}", other),
            "expected a list".to_owned(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Value {
        Value::Str(v.to_owned())
    }

    #[test]
    fn pack_empty_list() {
        assert_eq!(pack(&Value::list(vec![])).unwrap(), "[000000:]");
    }

    #[test]
    fn unpack_empty_list() {
        assert_eq!(unpack("[000000:]").unwrap(), Value::list(vec![]));
    }

    #[test]
    fn pack_single_item() {
        assert_eq!(pack(&Value::list(vec![s("hello")])).unwrap(), "[000001:000005:hello:]");
    }

    #[test]
    fn pack_two_items() {
        assert_eq!(
            pack(&Value::list(vec![s("hello"), s("world")])).unwrap(),
            "[000002:000005:hello:000005:world:]"
        );
    }

    #[test]
    fn pack_null_sentinel() {
        assert_eq!(pack(&Value::list(vec![Value::Null])).unwrap(), "[000001:000004:null:]");
    }

    #[test]
    fn pack_nested_list() {
        let nested = Value::list(vec![Value::list(vec![s("element")])]);
        assert_eq!(pack(&nested).unwrap(), "[000001:000024:[000001:000007:element:]:]");
    }

    #[test]
    fn unpack_nested_list_reverses_pack() {
        let packed = "[000001:000024:[000001:000007:element:]:]";
        let expected = Value::list(vec![Value::list(vec![s("element")])]);
        assert_eq!(unpack(packed).unwrap(), expected);
    }

    #[test]
    fn roundtrip_list_of_strings_and_nested_lists() {
        let original = Value::list(vec![
            s("a"),
            Value::list(vec![s("b"), s("c")]),
            s("d"),
        ]);
        let packed = pack(&original).unwrap();
        assert_eq!(unpack(&packed).unwrap(), original);
    }

    #[test]
    fn unpack_empty_string_fails() {
        assert_eq!(
            unpack("").unwrap_err(),
            UnpackingError::NoLeadingBracket("".into())
        );
    }

    #[test]
    fn unpack_missing_trailing_bracket_fails() {
        assert_matches::assert_matches!(
            unpack("[hello").unwrap_err(),
            UnpackingError::NoTrailingBracket(_)
        );
    }

    #[test]
    fn unpack_missing_leading_bracket_fails() {
        assert_matches::assert_matches!(
            unpack("hello]").unwrap_err(),
            UnpackingError::NoLeadingBracket(_)
        );
    }

    #[test]
    fn pack_overflow_is_fatal() {
        let huge: Vec<Value> = (0..MAX_COUNT).map(|_| s("x")).collect();
        assert_eq!(pack(&Value::list(huge)).unwrap_err(), UnpackingError::Overflow);
    }
}
