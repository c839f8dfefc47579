//! Human friendly instants, e.g. `2024-03-01 10:00:00` (UTC) or full RFC 3339.
use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    humantime::parse_rfc3339_weak(raw)
        .map(DateTime::<Utc>::from)
        .map_err(|error| format!("invalid instant {raw:?}: {error}"))
}

pub fn serialize<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_some(&value.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_instant(&raw).map_err(D::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_parse_space_separated_utc_instant() {
        assert_eq!(
            parse_instant("2024-03-01 10:00:00"),
            Ok(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn should_parse_instant_with_offset() {
        assert_eq!(
            parse_instant("2024-03-01T13:00:00+03:00"),
            Ok(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn should_reject_garbage() {
        assert!(parse_instant("tomorrow").is_err());
    }
}
