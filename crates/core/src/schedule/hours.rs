//! Best-effort parsing of the free-text working-hours spec, e.g.
//! "Mon-Fri 09:00-18:00". Day ranges expand by walking forward from the
//! start token to the end token modulo 7; an unparseable spec means no
//! weekday filter and the default daily window.

use std::collections::HashSet;

use chrono::Weekday;

/// Default 09:00-18:00 window, in minutes of day.
pub const DEFAULT_WINDOW: (u32, u32) = (9 * 60, 18 * 60);

/// Weekday set derived from a day-range token pair ("mon-fri",
/// "sat - sun"). `None` when the spec names no parseable range, meaning no
/// weekday filter is applied.
pub fn allowed_weekdays(spec: &str) -> Option<HashSet<Weekday>> {
    let lowered = spec.to_lowercase();
    let bytes = lowered.as_bytes();

    let mut index = 0;
    while let Some(found) = lowered[index..].find('-') {
        let dash = index + found;
        let before = lowered[..dash].trim_end();
        let after = lowered[dash + 1..].trim_start();

        let start = last_word(before).and_then(weekday_token);
        let end = first_word(after).and_then(weekday_token);
        if let (Some(start), Some(end)) = (start, end) {
            return Some(expand_range(start, end));
        }

        index = dash + 1;
        if index >= bytes.len() {
            break;
        }
    }
    None
}

/// Daily open window in minutes of day, from `H:MM-H:MM` or a bare `H-H`
/// pair. `None` when nothing resembling a window is present.
pub fn daily_window(spec: &str) -> Option<(u32, u32)> {
    let numbers = clock_numbers(spec);
    for window in numbers.windows(2) {
        let ((start_h, start_m), (end_h, end_m)) = (window[0], window[1]);
        if start_h <= 23 && end_h <= 23 && start_m <= 59 && end_m <= 59 {
            return Some((start_h * 60 + start_m, end_h * 60 + end_m));
        }
    }
    None
}

/// `daily_window` with the 09:00-18:00 default applied.
pub fn daily_window_or_default(spec: &str) -> (u32, u32) {
    daily_window(spec).unwrap_or(DEFAULT_WINDOW)
}

/// Convenience for date filtering: is the business open on this weekday
/// according to the spec? Unparseable specs are treated as always open.
pub fn open_on(spec: &str, weekday: Weekday) -> bool {
    allowed_weekdays(spec).map_or(true, |allowed| allowed.contains(&weekday))
}

fn expand_range(start: Weekday, end: Weekday) -> HashSet<Weekday> {
    let mut allowed = HashSet::new();
    let mut current = start;
    allowed.insert(current);
    while current != end {
        current = current.succ();
        allowed.insert(current);
        if allowed.len() > 7 {
            break;
        }
    }
    allowed
}

fn weekday_token(token: &str) -> Option<Weekday> {
    let weekday = match token {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

fn last_word(text: &str) -> Option<&str> {
    text.rsplit(|ch: char| !ch.is_ascii_alphabetic()).find(|word| !word.is_empty())
}

fn first_word(text: &str) -> Option<&str> {
    text.split(|ch: char| !ch.is_ascii_alphabetic()).find(|word| !word.is_empty())
}

/// Hour/minute pairs around a dash: "9:00-18:30" → [(9,0), (18,30)];
/// "9-18" → [(9,0), (18,0)]. Scans digit groups and optional `:MM`.
fn clock_numbers(spec: &str) -> Vec<(u32, u32)> {
    let bytes = spec.as_bytes();
    let mut pairs = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }

        let start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }
        let Ok(hour) = spec[start..index].parse::<u32>() else {
            continue;
        };
        if index - start > 2 {
            continue;
        }

        let mut minute = 0;
        if bytes.get(index) == Some(&b':') || bytes.get(index) == Some(&b'.') {
            let minute_start = index + 1;
            let mut minute_end = minute_start;
            while minute_end < bytes.len() && bytes[minute_end].is_ascii_digit() {
                minute_end += 1;
            }
            if minute_end - minute_start == 2 {
                if let Ok(parsed) = spec[minute_start..minute_end].parse::<u32>() {
                    minute = parsed;
                    index = minute_end;
                }
            }
        }

        pairs.push((hour, minute));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::{allowed_weekdays, daily_window, daily_window_or_default, open_on};

    #[test]
    fn weekday_ranges_expand_inclusively() {
        let allowed = allowed_weekdays("Mon-Fri 09:00-18:00").expect("range");
        assert_eq!(allowed.len(), 5);
        assert!(allowed.contains(&Weekday::Mon));
        assert!(allowed.contains(&Weekday::Fri));
        assert!(!allowed.contains(&Weekday::Sat));
    }

    #[test]
    fn ranges_wrap_across_the_week_boundary() {
        let allowed = allowed_weekdays("Sat-Mon 10:00-16:00").expect("range");
        assert_eq!(allowed.len(), 3);
        assert!(allowed.contains(&Weekday::Sat));
        assert!(allowed.contains(&Weekday::Sun));
        assert!(allowed.contains(&Weekday::Mon));
    }

    #[test]
    fn unparseable_specs_apply_no_weekday_filter() {
        assert_eq!(allowed_weekdays("open whenever"), None);
        assert_eq!(allowed_weekdays(""), None);
        assert!(open_on("open whenever", Weekday::Sun));
    }

    #[test]
    fn time_windows_parse_with_and_without_minutes() {
        assert_eq!(daily_window("Mon-Fri 09:00-18:00"), Some((540, 1080)));
        assert_eq!(daily_window("Mon-Fri 9-18"), Some((540, 1080)));
        assert_eq!(daily_window("Tue-Sat 10:30-19:00"), Some((630, 1140)));
        assert_eq!(daily_window("weekdays"), None);
        assert_eq!(daily_window_or_default("weekdays"), (540, 1080));
    }
}
