//! Serde adapters for human-readable durations (`"25s"`, `"3400ms"`, `"20m"`).
//!
//! Bare integers are read as seconds. Optional thresholds additionally
//! accept `"off"`, which is also how `None` is written since TOML has no null.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

const DISABLED: &str = "off";
const DISABLED_ALIASES: &[&str] = &[DISABLED, "none", "disabled", ""];

/// Reads either form; `allow_disabled` gates the `"off"` keywords
struct DurationVisitor {
    allow_disabled: bool,
}

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Option<Duration>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        if self.allow_disabled {
            formatter.write_str(
                "\"off\", a number of seconds or a duration string such as \"3400ms\"",
            )
        } else {
            formatter.write_str("a number of seconds or a duration string such as \"25s\"")
        }
    }

    fn visit_u64<E: de::Error>(self, seconds: u64) -> Result<Self::Value, E> {
        Ok(Some(Duration::from_secs(seconds)))
    }

    fn visit_i64<E: de::Error>(self, seconds: i64) -> Result<Self::Value, E> {
        u64::try_from(seconds)
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|_| E::custom(format!("duration must not be negative, got {seconds}")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        let value = value.trim();
        if self.allow_disabled && DISABLED_ALIASES.iter().any(|kw| value.eq_ignore_ascii_case(kw)) {
            return Ok(None);
        }
        humantime::parse_duration(value)
            .map(Some)
            .map_err(|e| E::custom(format!("invalid duration '{value}': {e}")))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        if self.allow_disabled {
            Ok(None)
        } else {
            Err(E::custom("a duration is required"))
        }
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

fn render(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&render(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer
            .deserialize_any(DurationVisitor { allow_disabled: false })?
            .ok_or_else(|| de::Error::custom("a duration is required"))
    }
}

pub mod option_duration {
    use super::*;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_str(&render(*d)),
            None => serializer.serialize_str(DISABLED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        deserializer.deserialize_option(DurationVisitor { allow_disabled: true })
    }
}
