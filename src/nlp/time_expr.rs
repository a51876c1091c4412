use std::sync::OnceLock;

use chrono::{Duration, NaiveTime};
use regex::Regex;

fn relative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:(?:in\s+)?(?P<h>\d+)\s+(?:hours?|hrs?)(?:\s+and\s+(?P<hm>\d+)\s+min(?:ute)?s?)?)|(?:(?:in\s+)?(?P<m>\d+)\s+min(?:ute)?s?)|(?:(?P<fm>\d+)\s+min(?:ute)?s?\s+from\s+now)",
        )
        .expect("Pattern is known to be valid.")
    })
}

fn absolute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:(?P<h12>1[0-2]|0?[1-9])(?::(?P<m12>[0-5][0-9]))?\s*(?P<ampm>am|pm))|(?:(?P<h24>2[0-3]|[0-1]?[0-9]):(?P<m24>[0-5][0-9]))",
        )
        .expect("Pattern is known to be valid.")
    })
}

/// Resolves a natural-language time fragment to a time-of-day.
///
/// Relative forms ("in 2 hours", "30 minutes from now") are tried before
/// absolute ones ("7:30 am", "18:00") and win when a fragment contains both.
/// Returns `None` when no time expression is present; callers treat that as
/// "no time found", not as an error.
pub fn parse_time(text: &str, now: NaiveTime) -> Option<NaiveTime> {
    let text = text.to_lowercase();
    parse_relative(&text, now).or_else(|| parse_absolute(&text))
}

fn parse_relative(text: &str, now: NaiveTime) -> Option<NaiveTime> {
    let caps = relative_regex().captures(text)?;

    if let Some(hours) = caps.name("h") {
        let hours: i64 = hours.as_str().parse().ok()?;
        let minutes: i64 = caps
            .name("hm")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return Some(now + Duration::hours(hours) + Duration::minutes(minutes));
    }

    let minutes = caps.name("m").or_else(|| caps.name("fm"))?;
    let minutes: i64 = minutes.as_str().parse().ok()?;
    Some(now + Duration::minutes(minutes))
}

/// Absolute-only variant used where a relative reading makes no sense,
/// e.g. the anchor of "3 alarms starting at 6 am".
pub(crate) fn parse_absolute(text: &str) -> Option<NaiveTime> {
    let caps = absolute_regex().captures(text)?;

    if let Some(hour) = caps.name("h12") {
        let hour: u32 = hour.as_str().parse().ok()?;
        let minute: u32 = caps
            .name("m12")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let pm = caps.name("ampm").map(|s| s.as_str()) == Some("pm");
        let hour = match (hour, pm) {
            (12, true) => 12,
            (12, false) => 0,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    let hour: u32 = caps.name("h24")?.as_str().parse().ok()?;
    let minute: u32 = caps.name("m24")?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn hours_and_minutes_are_added_to_now() {
        let resolved = parse_time("in 1 hour and 30 minutes", at(9, 0));
        assert_eq!(resolved, Some(at(10, 30)));
    }

    #[test]
    fn bare_minute_count_is_relative() {
        assert_eq!(parse_time("in 20 minutes", at(9, 0)), Some(at(9, 20)));
        assert_eq!(parse_time("45 mins from now", at(9, 0)), Some(at(9, 45)));
    }

    #[test]
    fn relative_addition_rolls_over_midnight() {
        assert_eq!(parse_time("in 3 hours", at(23, 0)), Some(at(2, 0)));
    }

    #[test]
    fn twelve_hour_forms_require_meridiem() {
        assert_eq!(parse_time("7:30am", at(0, 0)), Some(at(7, 30)));
        assert_eq!(parse_time("7 pm", at(0, 0)), Some(at(19, 0)));
        assert_eq!(
            parse_time("7:30", at(0, 0)),
            Some(at(7, 30)),
            "Falls through to the 24-hour form."
        );
        assert_eq!(parse_time("7", at(0, 0)), None);
    }

    #[test]
    fn noon_and_midnight_follow_twelve_hour_convention() {
        assert_eq!(parse_time("12 pm", at(0, 0)), Some(at(12, 0)));
        assert_eq!(parse_time("12 am", at(0, 0)), Some(at(0, 0)));
        assert_eq!(parse_time("12:15 am", at(0, 0)), Some(at(0, 15)));
    }

    #[test]
    fn relative_wins_over_absolute_in_mixed_fragments() {
        let resolved = parse_time("in 10 minutes, not at 7 am", at(9, 0));
        assert_eq!(resolved, Some(at(9, 10)));
    }

    #[test]
    fn fragment_without_time_yields_none() {
        assert_eq!(parse_time("wake me up", at(9, 0)), None);
        assert_eq!(parse_time("", at(9, 0)), None);
    }

    proptest! {
        #[test]
        fn twenty_four_hour_strings_round_trip(hour in 0u32..24, minute in 0u32..60) {
            let text = format!("{hour:02}:{minute:02}");
            let parsed = parse_time(&text, at(0, 0));

            prop_assert_eq!(parsed, Some(at(hour, minute)));
        }
    }
}
