//! Field-level access to raw create payloads.
//!
//! Payloads arrive as loose JSON objects. Every accessor reports the offending
//! field by name so callers can point the analyst at the exact input to fix.
//! `null` is treated the same as an absent field.

use std::str::FromStr;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// A borrowed view over a JSON object payload.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
  fields: &'a Map<String, Value>,
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
  Error::InvalidPayload {
    field:  field.to_owned(),
    reason: reason.into(),
  }
}

impl<'a> Payload<'a> {
  pub fn new(fields: &'a Map<String, Value>) -> Self { Self { fields } }

  fn get(&self, field: &str) -> Option<&'a Value> {
    self.fields.get(field).filter(|v| !v.is_null())
  }

  pub fn required_str(&self, field: &str) -> Result<String> {
    match self.optional_str(field)? {
      Some(s) if !s.trim().is_empty() => Ok(s),
      Some(_) => Err(invalid(field, "must not be blank")),
      None => Err(invalid(field, "is required")),
    }
  }

  pub fn optional_str(&self, field: &str) -> Result<Option<String>> {
    match self.get(field) {
      None => Ok(None),
      Some(Value::String(s)) => Ok(Some(s.clone())),
      Some(other) => Err(invalid(field, format!("expected a string, got {other}"))),
    }
  }

  /// Integers are accepted as JSON numbers or as decimal strings.
  pub fn optional_int(&self, field: &str) -> Result<Option<i64>> {
    match self.get(field) {
      None => Ok(None),
      Some(Value::Number(n)) => n
        .as_i64()
        .map(Some)
        .ok_or_else(|| invalid(field, format!("expected an integer, got {n}"))),
      Some(Value::String(s)) => s
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| invalid(field, format!("expected an integer, got {s:?}"))),
      Some(other) => Err(invalid(field, format!("expected an integer, got {other}"))),
    }
  }

  pub fn bool_or(&self, field: &str, default: bool) -> Result<bool> {
    match self.get(field) {
      None => Ok(default),
      Some(Value::Bool(b)) => Ok(*b),
      Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
      Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
      Some(other) => Err(invalid(field, format!("expected a boolean, got {other}"))),
    }
  }

  /// A reference to another plan entity, given as a UUID string.
  pub fn optional_id(&self, field: &str) -> Result<Option<Uuid>> {
    self
      .optional_str(field)?
      .map(|s| {
        Uuid::parse_str(s.trim())
          .map_err(|e| invalid(field, format!("expected a UUID: {e}")))
      })
      .transpose()
  }

  pub fn required_enum<T: FromStr>(&self, field: &str) -> Result<T> {
    let raw = self.required_str(field)?;
    raw
      .trim()
      .parse()
      .map_err(|_| invalid(field, format!("unknown value {raw:?}")))
  }

  pub fn enum_or<T: FromStr>(&self, field: &str, default: T) -> Result<T> {
    match self.get(field) {
      None => Ok(default),
      Some(_) => self.required_enum(field),
    }
  }
}
