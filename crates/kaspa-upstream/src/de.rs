//! Lenient number deserializers.
//!
//! The explorer serializes large integers (DAA scores, amounts, timestamps)
//! as strings on some endpoints and as numbers on others.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

impl NumberOrString {
    fn to_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            }),
            Self::String(s) => s.trim().parse().ok(),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

pub fn u64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = NumberOrString::deserialize(deserializer)?;
    raw.to_u64()
        .ok_or_else(|| de::Error::custom("expected an unsigned integer or integer string"))
}

pub fn option_u64_lenient<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.to_u64()))
}

pub fn f64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = NumberOrString::deserialize(deserializer)?;
    raw.to_f64()
        .ok_or_else(|| de::Error::custom("expected a number or numeric string"))
}

pub fn option_f64_lenient<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let raw = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| r.to_f64()))
}
