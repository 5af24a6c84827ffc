use chrono::{DateTime, FixedOffset, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Parses `+HH:MM` / `-HH:MM` into an offset.
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Publish timestamp in the site offset.
///
/// Accepts RFC 2822 (RSS) and RFC 3339 (Atom); anything else, or no date at
/// all, falls back to `now`.
pub fn format_timestamp(raw: Option<&str>, offset: FixedOffset, now: DateTime<Utc>) -> String {
    let parsed = raw.map(str::trim).filter(|r| !r.is_empty()).and_then(|r| {
        DateTime::parse_from_rfc2822(r)
            .or_else(|_| DateTime::parse_from_rfc3339(r))
            .ok()
    });
    let instant = match parsed {
        Some(dt) => dt.with_timezone(&offset),
        None => now.with_timezone(&offset),
    };
    instant.format(TIMESTAMP_FORMAT).to_string()
}
