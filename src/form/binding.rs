use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value};

use super::error::{FormError, FormResult};
use super::field::{FieldAccessor, FieldKey, FieldKind};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S%.f"];

impl FieldAccessor<Value> {
    /// Writes raw control text, coerced by the field's kind (text when untagged). A successful
    /// write clears the field error; a failed one sets it.
    pub fn set_input(&self, raw: &str) -> FormResult<()> {
        let kind = self.kind().unwrap_or(FieldKind::Text);
        match coerce_input(self.name(), kind, raw) {
            Ok(value) => {
                self.set_value(value);
                self.set_error(None);
                Ok(())
            }
            Err(error) => {
                if let FormError::InvalidInput { message, .. } = &error {
                    self.set_error(Some(message.clone()));
                }
                Err(error)
            }
        }
    }

    pub fn display(&self) -> String {
        display_value(&self.value())
    }
}

pub fn coerce_input(field: &FieldKey, kind: FieldKind, raw: &str) -> FormResult<Value> {
    coerce(kind, raw).map_err(|message| FormError::InvalidInput {
        field: field.clone(),
        kind,
        message,
    })
}

fn coerce(kind: FieldKind, raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    match kind {
        FieldKind::Text => Ok(Value::String(raw.to_string())),
        FieldKind::Number | FieldKind::Decimal if trimmed.is_empty() => Ok(Value::Null),
        FieldKind::Number => {
            let decimal = parse_decimal(trimmed)?;
            decimal_to_number(decimal)
                .map(Value::Number)
                .ok_or_else(|| format!("'{trimmed}' is out of range"))
        }
        // Kept as a string so no precision is lost on the way to `Decimal`.
        FieldKind::Decimal => Ok(Value::String(parse_decimal(trimmed)?.normalize().to_string())),
        FieldKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => Ok(Value::Bool(true)),
            "" | "off" | "false" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err(format!("'{trimmed}' is not a boolean")),
        },
        FieldKind::Date | FieldKind::DateTime if trimmed.is_empty() => Ok(Value::Null),
        FieldKind::Date => {
            if is_iso_date(trimmed) {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(format!("'{trimmed}' is not a YYYY-MM-DD date"))
            }
        }
        FieldKind::DateTime => {
            if is_iso_datetime(trimmed) {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(format!("'{trimmed}' is not a YYYY-MM-DDTHH:MM date and time"))
            }
        }
        FieldKind::List => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        FieldKind::Json if trimmed.is_empty() => Ok(Value::Null),
        FieldKind::Json => serde_json::from_str(trimmed).map_err(|error| error.to_string()),
    }
}

/// Renders a stored value back into control text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| format!("'{raw}' is not a number"))
}

fn decimal_to_number(value: Decimal) -> Option<Number> {
    let value = value.normalize();
    if value.scale() == 0 {
        if let Some(integer) = value.to_i64() {
            return Some(Number::from(integer));
        }
    }
    Number::from_f64(value.to_f64()?)
}

/// chrono alone would also take unpadded months and days.
fn is_iso_date(raw: &str) -> bool {
    raw.len() == 10 && NaiveDate::parse_from_str(raw, DATE_FORMAT).is_ok()
}

/// `%.f` also matches a missing fraction.
fn is_iso_datetime(raw: &str) -> bool {
    raw.get(..10).is_some_and(is_iso_date)
        && DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(raw, format).is_ok())
}
