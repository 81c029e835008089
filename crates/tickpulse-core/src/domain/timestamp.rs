//! Candle and session timestamps.
//!
//! Everything downstream of the provider boundary works in UTC. The upstream
//! quotes candle times in the exchange-local offset, so alongside the strict
//! UTC parser there is a coercing parser for upstream payloads and the
//! minute-precision request format the historical endpoint expects.

use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// An instant pinned to UTC. Construction goes through [`UtcDateTime::parse`]
/// or [`UtcDateTime::coerce`], so a value of this type can never carry a
/// non-zero offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Strict parser for timestamps this system produced: the input must be
    /// RFC3339 and already denominated in UTC.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| not_utc(input))?;
        if parsed.offset() != UtcOffset::UTC {
            return Err(not_utc(input));
        }
        Ok(Self(parsed))
    }

    /// Lenient parser for upstream payloads: any RFC3339 offset is accepted
    /// and converted to its UTC equivalent.
    pub fn parse_offset(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| not_utc(input))?;
        Ok(Self::coerce(parsed))
    }

    /// Converts an arbitrary-offset datetime to the same instant in UTC.
    pub fn coerce(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    /// This instant shifted `days` calendar days into the past: the start of
    /// a lookback window ending here.
    pub fn days_back(self, days: u32) -> Self {
        Self(self.0 - Duration::days(i64::from(days)))
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }

    /// Minute-precision `YYYY-MM-DD HH:MM` rendering, the shape the upstream's
    /// historical candle endpoint takes for its date-range parameters.
    pub fn format_minute(self) -> String {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day(),
            self.0.hour(),
            self.0.minute()
        )
    }
}

fn not_utc(input: &str) -> ValidationError {
    ValidationError::TimestampNotUtc {
        value: input.to_owned(),
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
