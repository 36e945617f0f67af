use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ISO-8601 / RFC 3339 instant, normalized to UTC.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn parse(raw: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|t| Self(t.with_timezone(&Utc)))
    }

    /// Canonical wire form, e.g. `2024-11-20T12:30:00Z`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
    }

    /// Short day/month/time label used on popup cards, e.g. `20 Nov, 12:30`.
    pub fn short_label(&self) -> String {
        self.0.format("%d %b, %H:%M").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn parses_zulu_and_offset_forms() {
        let a = Timestamp::parse("2024-11-20T12:30:00Z").expect("zulu");
        let b = Timestamp::parse("2024-11-20T13:30:00+01:00").expect("offset");
        assert_eq!(a, b);
        assert_eq!(a.to_rfc3339(), "2024-11-20T12:30:00Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_none());
        assert!(Timestamp::parse("").is_none());
    }

    #[test]
    fn short_label_format() {
        let t = Timestamp::parse("2024-11-09T08:05:00Z").unwrap();
        assert_eq!(t.short_label(), "09 Nov, 08:05");
    }
}
