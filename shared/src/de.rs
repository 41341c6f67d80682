//! Lenient deserializers for services that send numbers as strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn number_from_value<E: serde::de::Error>(value: Value) -> Result<f64, E> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| E::custom(format!("Number out of range: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("Invalid numeric string: {}", s))),
        other => Err(E::custom(format!("Expected number or string, got {}", other))),
    }
}

pub fn f64_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    number_from_value(value)
}

pub fn option_f64_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => number_from_value(value).map(Some),
    }
}

pub fn u32_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = number_from_value::<D::Error>(value)?;
    if number.fract() != 0.0 || number < 0.0 || number > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "Expected a whole non-negative number, got {}",
            number
        )));
    }
    Ok(number as u32)
}

pub fn u64_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid unsigned number: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid unsigned string: {}", s))),
        _ => Err(serde::de::Error::custom("Expected number or string")),
    }
}

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("Expected string or number")),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Ages {
        #[serde(deserialize_with = "super::u32_or_string")]
        age: u32,
        #[serde(deserialize_with = "super::u64_or_string")]
        expires_in: u64,
    }

    #[test]
    fn whole_numbers_accept_both_encodings() {
        let parsed: Ages = serde_json::from_str(r#"{"age":"37","expires_in":"3600"}"#).unwrap();
        assert_eq!(parsed.age, 37);
        assert_eq!(parsed.expires_in, 3600);

        let parsed: Ages = serde_json::from_str(r#"{"age":37,"expires_in":3600}"#).unwrap();
        assert_eq!(parsed.age, 37);
    }

    #[test]
    fn fractional_age_is_rejected() {
        assert!(serde_json::from_str::<Ages>(r#"{"age":"37.5","expires_in":1}"#).is_err());
        assert!(serde_json::from_str::<Ages>(r#"{"age":-1,"expires_in":1}"#).is_err());
    }
}
