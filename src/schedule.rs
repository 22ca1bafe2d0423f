use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use time_tz::{OffsetDateTimeExt, timezones};

pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
pub const DEFAULT_SCHEDULE: [&str; 2] = ["09:00", "20:00"];
pub const MAX_SCHEDULE_ENTRIES: usize = 6;

/// Strict reminder-time shape: zero-padded `HH:MM`, hour 00-23, minute 00-59.
/// `9:00` is rejected rather than normalized.
pub fn is_valid_time(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    hour < 24 && minute < 60
}

/// Keeps only well-formed `HH:MM` strings, drops duplicates preserving
/// first-seen order, and caps the result at [`MAX_SCHEDULE_ENTRIES`].
/// Non-string entries are dropped silently.
pub fn sanitize_schedule(entries: &[JsonValue]) -> Vec<String> {
    let mut sanitized: Vec<String> = Vec::new();
    for entry in entries {
        let Some(value) = entry.as_str() else {
            continue;
        };
        if !is_valid_time(value) {
            continue;
        }
        if sanitized.iter().any(|seen| seen == value) {
            continue;
        }
        sanitized.push(value.to_string());
        if sanitized.len() == MAX_SCHEDULE_ENTRIES {
            break;
        }
    }
    sanitized
}

/// Resolves the reminder times that actually apply to a subscriber:
/// subscription schedule, else the budget-snapshot mirror, else the default.
pub fn effective_schedule(
    subscription: Option<&[String]>,
    budget_mirror: Option<&[String]>,
) -> Vec<String> {
    if let Some(schedule) = subscription
        && !schedule.is_empty()
    {
        return schedule.to_vec();
    }
    if let Some(schedule) = budget_mirror
        && !schedule.is_empty()
    {
        return schedule.to_vec();
    }
    DEFAULT_SCHEDULE.iter().map(|s| s.to_string()).collect()
}

pub fn timezone_or_default(timezone: Option<&str>) -> &str {
    match timezone {
        Some(tz) if !tz.trim().is_empty() => tz,
        _ => DEFAULT_TIMEZONE,
    }
}

/// Formats `instant` as the zero-padded local `HH:MM` in the given IANA zone.
/// Unknown zone names fall back to the default zone rather than failing the
/// subscriber.
pub fn local_hhmm(instant: OffsetDateTime, timezone: &str) -> String {
    let zone = timezones::get_by_name(timezone)
        .or_else(|| timezones::get_by_name(DEFAULT_TIMEZONE));
    let local = match zone {
        Some(zone) => instant.to_timezone(zone),
        None => instant,
    };
    format!("{:02}:{:02}", local.hour(), local.minute())
}
