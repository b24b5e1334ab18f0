//! Serde helpers that carry big integers as decimal strings.
//!
//! Use with `#[serde(with = "crate::serde_decimal")]`.

use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_str_radix(10))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BigUint::parse_bytes(s.trim().as_bytes(), 10)
        .ok_or_else(|| de::Error::custom(format!("invalid decimal integer: {:?}", s)))
}
