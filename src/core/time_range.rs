use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use regex::Regex;

use crate::model::time_window::TimeWindow;

pub const RANGE_SEPARATOR: &str = " » ";

/// Locale prefixes the calendar puts in front of today's start time.
const TODAY_PREFIXES: &[&str] = &["本日,", "Today,", "today,"];

static MERIDIEM_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\.?$").unwrap()
});

/// Parses `"本日, 09:15 » 10:55"` style text into a window on `today`.
///
/// A start time listed in `timetable` is pulled `grace` earlier so the
/// window opens a little before the period does.
pub fn parse_time_range(
    text: &str,
    today: NaiveDate,
    timetable: &[NaiveTime],
    grace: TimeDelta,
) -> TimeWindow {
    let parts: Vec<&str> = text.split(RANGE_SEPARATOR).collect();
    if parts.len() < 2 {
        return TimeWindow::empty();
    }

    let (Some(start), Some(end)) = (
        parse_clock_time(strip_today_prefix(parts[0])),
        parse_clock_time(parts[1]),
    ) else {
        return TimeWindow::empty();
    };

    let mut start = today.and_time(start);
    if timetable.contains(&start.time()) {
        // Never earlier than midnight; the window stays on `today`.
        start = start
            .checked_sub_signed(grace)
            .unwrap_or(start)
            .max(today.and_time(NaiveTime::MIN));
    }

    TimeWindow::new(start, today.and_time(end))
}

fn strip_today_prefix(part: &str) -> &str {
    let part = part.trim();
    TODAY_PREFIXES
        .iter()
        .find_map(|prefix| part.strip_prefix(prefix))
        .unwrap_or(part)
        .trim()
}

/// 24-hour `HH:MM` first, then 12-hour forms like `9AM` or `9:30 pm`.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Some(time);
    }

    let caps = MERIDIEM_TIME.captures(raw)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    let is_pm = caps.get(3)?.as_str().eq_ignore_ascii_case("p");
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}
