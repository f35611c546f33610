//! Free-text date recognition: ordinals ("10th September 2024") and
//! qualified times ("at 3.32 p.m. on 10th September 2024") resolved down to
//! an ISO `YYYY-MM-DD`. Used as the fallback when a stage's ISO-tagged
//! element (`<EnactmentDate>`, `<Made>`, `<ComingIntoForce>`) is absent and
//! only a `<DateText>` node is present.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    })
}

fn date_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})(?:st|nd|rd|th)?\s+([A-Za-z]+)\s+(\d{4})").unwrap()
    })
}

/// Parses the first recognizable day/month/year triple out of free text,
/// ignoring any leading time-of-day qualifier such as "at 3.32 p.m. on".
pub fn parse_free_text_date(text: &str) -> Option<NaiveDate> {
    let captures = date_text_regex().captures(text)?;
    let day: u32 = captures.get(1)?.as_str().parse().ok()?;
    let month = month_number(captures.get(2)?.as_str())?;
    let year: i32 = captures.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
