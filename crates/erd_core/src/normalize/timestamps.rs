use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::offset;
use time::{format_description, Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::domain::ValidationWarning;
use crate::error::AppError;

/// A stored timestamp resolved to an absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    pub instant: OffsetDateTime,
    /// True when the raw value carried no offset and UTC was assumed.
    pub offset_assumed: bool,
}

// ISO-like forms without an offset. Deterministic allowlist only, no fuzzy parsing.
const NAIVE_FORMATS: [&str; 4] = [
    "[year]-[month]-[day]T[hour]:[minute]:[second]",
    "[year]-[month]-[day]T[hour]:[minute]",
    "[year]-[month]-[day] [hour]:[minute]:[second]",
    "[year]-[month]-[day] [hour]:[minute]",
];

fn parse_naive(raw: &str) -> Option<PrimitiveDateTime> {
    for fmt in NAIVE_FORMATS {
        let Ok(items) = format_description::parse(fmt) else {
            continue;
        };
        if let Ok(pdt) = PrimitiveDateTime::parse(raw, &items) {
            return Some(pdt);
        }
    }
    None
}

/// Parse an ISO-8601 timestamp. RFC3339 values keep their recorded offset; offset-less values
/// from the allowlist are read as UTC. Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<ParsedTimestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(ParsedTimestamp {
            instant: dt,
            offset_assumed: false,
        });
    }
    parse_naive(trimmed).map(|pdt| ParsedTimestamp {
        instant: pdt.assume_utc(),
        offset_assumed: true,
    })
}

/// Parse a stored timestamp, recording a warning when it is unusable or when UTC had to be
/// assumed. `unparseable_code` lets callers distinguish occurrence times from event times.
pub fn parse_field(
    unparseable_code: &str,
    subject: &str,
    raw: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<OffsetDateTime> {
    match parse_timestamp(raw) {
        Some(p) => {
            if p.offset_assumed {
                warnings.push(
                    ValidationWarning::new(
                        "DATA_TS_TZ_ASSUMED_UTC",
                        format!("Assumed UTC offset for {subject}"),
                    )
                    .with_details(format!("value={}", raw.trim())),
                );
            }
            Some(p.instant)
        }
        None => {
            warnings.push(
                ValidationWarning::new(
                    unparseable_code,
                    format!("Unparseable timestamp for {subject}"),
                )
                .with_details(format!("value={raw}")),
            );
            None
        }
    }
}

/// Canonical RFC3339 UTC rendering, used when the store stamps new timeline entries.
pub fn canonical_rfc3339_utc(dt: OffsetDateTime) -> Result<String, AppError> {
    dt.to_offset(UtcOffset::UTC).format(&Rfc3339).map_err(|e| {
        AppError::new("TS_FORMAT_FAILED", "Failed to format timestamp").with_details(e.to_string())
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum PolicyRepr {
    Utc,
    FixedOffset { hours: i8, minutes: i8 },
}

/// Single reporting offset used to project instants onto the calendar for month bucketing,
/// date grouping and `HH:MM` labels. Ordering always uses the absolute instant.
///
/// Every instant goes through the same offset, so wall-clock order and instant order agree.
/// The offset is checked on construction; an out-of-range value cannot be represented.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "PolicyRepr", into = "PolicyRepr")]
pub struct TimezonePolicy {
    offset: UtcOffset,
}

impl TimezonePolicy {
    pub const UTC: TimezonePolicy = TimezonePolicy {
        offset: UtcOffset::UTC,
    };

    pub fn fixed_offset(hours: i8, minutes: i8) -> Result<Self, AppError> {
        UtcOffset::from_hms(hours, minutes, 0)
            .map(|offset| Self { offset })
            .map_err(|e| {
                AppError::new("CONFIG_INVALID", "Reporting offset is out of range")
                    .with_details(format!("hours={hours}; minutes={minutes}; err={e}"))
            })
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn wall_clock(&self, instant: OffsetDateTime) -> PrimitiveDateTime {
        let local = instant.to_offset(self.offset);
        PrimitiveDateTime::new(local.date(), local.time())
    }
}

/// Reports are filed in Philippine time (`+08:00`).
impl Default for TimezonePolicy {
    fn default() -> Self {
        Self {
            offset: offset!(+8),
        }
    }
}

impl TryFrom<PolicyRepr> for TimezonePolicy {
    type Error = AppError;

    fn try_from(repr: PolicyRepr) -> Result<Self, Self::Error> {
        match repr {
            PolicyRepr::Utc => Ok(Self::UTC),
            PolicyRepr::FixedOffset { hours, minutes } => Self::fixed_offset(hours, minutes),
        }
    }
}

impl From<TimezonePolicy> for PolicyRepr {
    fn from(policy: TimezonePolicy) -> Self {
        let (hours, minutes, _) = policy.offset.as_hms();
        if hours == 0 && minutes == 0 {
            PolicyRepr::Utc
        } else {
            PolicyRepr::FixedOffset { hours, minutes }
        }
    }
}

/// `October 11, 2025`
pub fn date_label(date: Date) -> String {
    format!("{} {}, {}", date.month(), date.day(), date.year())
}

/// 24-hour `HH:MM`.
pub fn clock_label(wall: PrimitiveDateTime) -> String {
    format!("{:02}:{:02}", wall.hour(), wall.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn default_policy_reads_manila_wall_clock() {
        let p = parse_timestamp("2025-10-11T17:33:00+08:00").expect("parse");
        assert!(!p.offset_assumed);
        let wall = TimezonePolicy::default().wall_clock(p.instant);
        assert_eq!(clock_label(wall), "17:33");
        assert_eq!(date_label(wall.date()), "October 11, 2025");
    }

    #[test]
    fn utc_stamped_and_offset_stamped_values_share_one_clock() {
        let policy = TimezonePolicy::default();
        let stored = parse_timestamp("2025-10-11T17:55:00+08:00").expect("parse");
        let appended = parse_timestamp("2025-10-11T10:30:00Z").expect("parse");
        let (a, b) = (policy.wall_clock(appended.instant), policy.wall_clock(stored.instant));
        assert_eq!(clock_label(a), "18:30");
        assert!(a > b);
        assert_eq!(a.date(), b.date());
    }

    #[test]
    fn naive_values_assume_utc_and_warn() {
        let mut warnings = Vec::new();
        let dt = parse_field("DATA_EVENT_TS_UNPARSEABLE", "event", "2025-10-11 08:05", &mut warnings)
            .expect("parse");
        assert_eq!(dt.offset(), UtcOffset::UTC);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "DATA_TS_TZ_ASSUMED_UTC");
    }

    #[test]
    fn garbage_is_unparseable() {
        let mut warnings = Vec::new();
        assert!(parse_field("DATA_EVENT_TS_UNPARSEABLE", "event", "yesterday", &mut warnings).is_none());
        assert!(parse_timestamp("   ").is_none());
        assert_eq!(warnings[0].code, "DATA_EVENT_TS_UNPARSEABLE");
    }

    #[test]
    fn reporting_offset_moves_across_midnight() {
        let p = parse_timestamp("2025-09-30T20:00:00Z").expect("parse");
        let wall = TimezonePolicy::default().wall_clock(p.instant);
        assert_eq!(wall.month(), Month::October);
        assert_eq!(clock_label(wall), "04:00");
        assert_eq!(TimezonePolicy::UTC.wall_clock(p.instant).month(), Month::September);
    }

    #[test]
    fn out_of_range_offsets_cannot_be_built_or_decoded() {
        assert!(TimezonePolicy::fixed_offset(8, 0).is_ok());
        assert_eq!(
            TimezonePolicy::fixed_offset(30, 0).expect_err("range").code,
            "CONFIG_INVALID"
        );
        let bad = serde_json::from_str::<TimezonePolicy>(r#"{"mode":"fixed_offset","hours":30,"minutes":0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn policy_serializes_as_tagged_mode() {
        let json = serde_json::to_string(&TimezonePolicy::default()).expect("encode");
        assert_eq!(json, r#"{"mode":"fixed_offset","hours":8,"minutes":0}"#);
        let utc: TimezonePolicy = serde_json::from_str(r#"{"mode":"utc"}"#).expect("decode");
        assert_eq!(utc, TimezonePolicy::UTC);
    }
}
