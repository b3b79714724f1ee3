use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const DEFAULT_ASSUMED_YEAR: i32 = 2025;
pub const CAPTION_LIMIT: usize = 200;
pub const NO_CAPTION: &str = "No caption";

// India Standard Time, UTC+05:30, no daylight saving.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;
const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000+00:00";

static IST_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+ist\s*$").expect("valid IST suffix pattern"));
static WEEKDAY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?\s+")
        .expect("valid weekday pattern")
});

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("{0}")]
    Format(String),
    #[error(transparent)]
    Parse(#[from] chrono::ParseError),
    #[error("invalid IST offset")]
    Offset,
    #[error("{0}")]
    Unexpected(String),
}

/// Parse a timestamp such as `18 Mar, 14:44 ist` (IST, no year) into UTC.
///
/// The trailing ` ist` is matched case-insensitively and a leading weekday
/// (`Tue 18 Mar, 14:44 ist`) is ignored.
pub fn parse_ist_timestamp(input: &str, year: i32) -> Result<DateTime<Utc>, TimestampError> {
    let stripped = IST_SUFFIX.replace(input.trim(), "");
    let (date_part, time_part) = stripped.split_once(',').ok_or_else(|| {
        TimestampError::Format(format!("expected '<day> <month>, <HH:MM>', got '{}'", input))
    })?;
    let date_part = WEEKDAY_PREFIX.replace(date_part.trim(), "");

    let full = format!("{} {} {}", date_part, year, time_part.trim());
    let naive = NaiveDateTime::parse_from_str(&full, "%d %b %Y %H:%M")?;

    let ist = FixedOffset::east_opt(IST_OFFSET_SECS).ok_or(TimestampError::Offset)?;
    let local = ist
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimestampError::Unexpected(format!("ambiguous local time {}", naive)))?;
    Ok(local.with_timezone(&Utc))
}

/// Convert an IST timestamp to `YYYY-MM-DDTHH:MM:SS.000+00:00`.
///
/// Never fails: problems are returned as a message starting with `Error:`
/// or `An unexpected error occurred:`.
pub fn normalize_ist_timestamp(input: &str, year: i32) -> String {
    match parse_ist_timestamp(input, year) {
        Ok(utc) => utc.format(ISO_UTC_FORMAT).to_string(),
        Err(TimestampError::Format(msg)) => format!(
            "Error: Could not parse date/time. Please check the input format. {}",
            msg
        ),
        Err(TimestampError::Parse(e)) => format!(
            "Error: Could not parse date/time. Please check the input format. {}",
            e
        ),
        Err(TimestampError::Offset) => "Error: Unknown timezone offset for IST.".to_string(),
        Err(TimestampError::Unexpected(msg)) => format!("An unexpected error occurred: {}", msg),
    }
}

/// Caption as shown in reports: placeholder when missing, cut at [`CAPTION_LIMIT`] chars.
pub fn caption_preview(caption: Option<&str>) -> String {
    match caption.filter(|c| !c.is_empty()) {
        Some(text) => truncate_chars(text, CAPTION_LIMIT),
        None => NO_CAPTION.to_string(),
    }
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_evening_ist_to_utc() {
        assert_eq!(
            normalize_ist_timestamp("20 Jul, 19:48 ist", 2025),
            "2025-07-20T14:18:00.000+00:00"
        );
    }

    #[test]
    fn converts_afternoon_ist_to_utc() {
        assert_eq!(
            normalize_ist_timestamp("18 Mar, 14:44 ist", 2025),
            "2025-03-18T09:14:00.000+00:00"
        );
    }

    #[test]
    fn early_morning_rolls_back_a_day() {
        assert_eq!(
            normalize_ist_timestamp("1 Jan, 03:00 ist", 2025),
            "2024-12-31T21:30:00.000+00:00"
        );
    }

    #[test]
    fn suffix_is_case_insensitive_and_weekday_ignored() {
        assert_eq!(
            normalize_ist_timestamp("Tue 18 Mar, 14:44 IST", 2025),
            "2025-03-18T09:14:00.000+00:00"
        );
    }

    #[test]
    fn year_comes_from_caller() {
        assert_eq!(
            normalize_ist_timestamp("18 Mar, 14:44 ist", 2024),
            "2024-03-18T09:14:00.000+00:00"
        );
    }

    #[test]
    fn repeated_calls_agree() {
        let inputs = ["Sat 20 Jul, 19:48 ist", "18 Mar, 14:44 Ist", "1 Jan, 03:00  IST "];
        for input in inputs {
            let first = parse_ist_timestamp(input, 2025).unwrap();
            assert_eq!(parse_ist_timestamp(input, 2025).unwrap(), first, "{}", input);
        }
    }

    #[test]
    fn missing_comma_is_reported_not_raised() {
        let out = normalize_ist_timestamp("18 Mar 14:44 ist", 2025);
        assert!(out.starts_with("Error:"), "{}", out);
    }

    #[test]
    fn impossible_dates_are_reported() {
        assert!(normalize_ist_timestamp("31 Feb, 10:00 ist", 2025).starts_with("Error:"));
        assert!(normalize_ist_timestamp("18 Foo, 10:00 ist", 2025).starts_with("Error:"));
        assert!(normalize_ist_timestamp("18 Mar, 25:00 ist", 2025).starts_with("Error:"));
    }

    #[test]
    fn short_caption_is_kept() {
        let caption = "a".repeat(200);
        assert_eq!(caption_preview(Some(&caption)), caption);
    }

    #[test]
    fn long_caption_is_truncated() {
        let caption = "b".repeat(201);
        let preview = caption_preview(Some(&caption));
        assert_eq!(preview, format!("{}...", "b".repeat(200)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let caption = "é".repeat(250);
        let preview = caption_preview(Some(&caption));
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn missing_caption_uses_placeholder() {
        assert_eq!(caption_preview(None), NO_CAPTION);
        assert_eq!(caption_preview(Some("")), NO_CAPTION);
    }
}
