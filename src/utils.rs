use std::fmt;

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;
use url::Url;

/// Parses the leading integer of `raw` the way browsers' `parseInt` does:
/// leading whitespace, an optional sign, then at least one decimal digit.
/// Anything after the digits is ignored.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Identifier supplied by a caller, normalised to an integer for comparison
/// with cached entities. The raw form is kept for building request paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    raw: String,
    id: Option<i64>,
}

impl ResourceKey {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let id = parse_leading_int(&raw);
        Self { raw, id }
    }

    /// Integer form, `None` when the key does not start with a number.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Integer-normalised equality against a stored identifier.
    pub fn matches(&self, stored: i64) -> bool {
        self.id == Some(stored)
    }

    pub fn path_segment(&self) -> String {
        urlencoding::encode(self.raw.trim()).into_owned()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<i64> for ResourceKey {
    fn from(id: i64) -> Self {
        Self {
            raw: id.to_string(),
            id: Some(id),
        }
    }
}

impl From<i32> for ResourceKey {
    fn from(id: i32) -> Self {
        Self::from(i64::from(id))
    }
}

impl From<u32> for ResourceKey {
    fn from(id: u32) -> Self {
        Self::from(i64::from(id))
    }
}

impl From<&str> for ResourceKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ResourceKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for ResourceKey {
    fn from(raw: &String) -> Self {
        Self::new(raw.as_str())
    }
}

/// Joins an API path onto the base URL, keeping any path prefix of the base.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    base.join(path.trim_start_matches('/'))
}

fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// Accepts an identifier sent either as a JSON number or a numeric string.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| D::Error::custom(format!("invalid identifier: {}", value)))
}

pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => id_from_value(&v)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid identifier: {}", v))),
    }
}

/// Accepts a monetary amount sent as a JSON number or a decimal string.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let amount = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount
        .filter(|a| a.is_finite())
        .ok_or_else(|| D::Error::custom(format!("invalid amount: {}", value)))
}

/// Accepts a boolean flag sent as `true`/`false`, `0`/`1` or their string forms.
/// A missing or null flag reads as `false`.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid flag: {}", other))),
        },
        Some(other) => Err(D::Error::custom(format!("invalid flag: {}", other))),
    }
}
