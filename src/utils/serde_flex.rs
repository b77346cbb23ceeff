//! Lenient deserializers for the tests backend, which returns numbers and
//! booleans in whatever shape its database driver produced (`1`, `"1"`,
//! `"70.00"`, `true`, `null`).

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrNumber {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Float(f64),
    String(String),
}

pub fn bool_flexible<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_bool_flexible(deserializer)?.unwrap_or(false))
}

pub fn opt_bool_flexible<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BoolOrNumber>::deserialize(deserializer)?;
    let Some(raw) = raw else { return Ok(None) };
    match raw {
        BoolOrNumber::Bool(b) => Ok(Some(b)),
        BoolOrNumber::Int(i) => Ok(Some(i != 0)),
        BoolOrNumber::Float(f) => Ok(Some(f != 0.0)),
        BoolOrNumber::String(s) => match s.trim() {
            "true" | "1" | "t" => Ok(Some(true)),
            "false" | "0" | "f" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "Invalid boolean string: {}",
                other
            ))),
        },
    }
}

/// Non-negative whole number; fractional values are rounded, negatives clamp to zero.
pub fn opt_u32_flexible<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Number>::deserialize(deserializer)?;
    let Some(raw) = raw else { return Ok(None) };
    let value = match raw {
        Number::Int(i) => i as f64,
        Number::Float(f) => f,
        Number::String(s) if s.trim().is_empty() => return Ok(None),
        Number::String(s) => s.trim().parse::<f64>().map_err(|e| {
            serde::de::Error::custom(format!("Invalid numeric string {:?}: {}", s, e))
        })?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom("Non-finite number"));
    }
    Ok(Some(value.round().clamp(0.0, u32::MAX as f64) as u32))
}

pub fn u32_flexible<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_u32_flexible(deserializer)?.unwrap_or(0))
}
