/// ANS timestamp.
///
/// Always UTC. On the wire it is an ISO-8601 string with millisecond
/// precision and a `Z` suffix, e.g. `2025-06-01T12:30:00.123Z`.
///
/// Held at millisecond precision, so a timestamp always equals its own
/// wire round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(chrono::DateTime<chrono::Utc>);

fn to_millis_precision(
    t: chrono::DateTime<chrono::Utc>,
) -> chrono::DateTime<chrono::Utc> {
    use chrono::SubsecRound;

    t.trunc_subsecs(3)
}

impl Timestamp {
    /// Construct a new timestamp of "now".
    pub fn now() -> Self {
        Self(to_millis_precision(chrono::Utc::now()))
    }

    /// Construct a timestamp from milliseconds since unix epoch.
    ///
    /// Returns `None` if the value is out of the representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        chrono::DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Get the milliseconds since unix epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Render as an ISO-8601 string.
    pub fn to_iso8601(&self) -> String {
        self.0
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    /// Parse an ISO-8601 (RFC 3339) string.
    pub fn parse_iso8601(s: &str) -> Result<Self, chrono::ParseError> {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&chrono::Utc))
            .map(|t| Self(to_millis_precision(t)))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl std::str::FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_iso8601(s)
    }
}

impl From<std::time::SystemTime> for Timestamp {
    fn from(t: std::time::SystemTime) -> Self {
        Self(to_millis_precision(t.into()))
    }
}

impl From<Timestamp> for std::time::SystemTime {
    fn from(t: Timestamp) -> Self {
        t.0.into()
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: std::borrow::Cow<'de, str> =
            serde::Deserialize::deserialize(deserializer)?;
        Self::parse_iso8601(&s).map_err(serde::de::Error::custom)
    }
}
