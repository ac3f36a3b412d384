//! Timestamp sources.
//!
//! The engine never calls the system clock directly; it asks an injected
//! `Clock`. Tests use `FixedClock` for reproducible logs and timestamps.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Produces ISO-8601 (RFC 3339, UTC) timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn now_iso8601(&self) -> String {
        format_iso8601(self.now())
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Default for FixedClock {
    fn default() -> Self {
        Self(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub fn format_iso8601(t: OffsetDateTime) -> String {
    t.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Parse a stored timestamp. Returns `None` for empty or malformed values.
pub fn parse_iso8601(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s.trim(), &Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_formats_epoch() {
        assert_eq!(FixedClock::default().now_iso8601(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn parses_browser_style_timestamps() {
        let t = parse_iso8601("2024-03-01T10:20:30.123Z").unwrap();
        assert_eq!(t.year(), 2024);
        assert!(parse_iso8601("yesterday").is_none());
    }
}
