//! Time extraction rules, tried in priority order: `HH:MM` / `HH.MM`,
//! `HH MM`, "at HH", then the spoken-number table.

use chrono::NaiveTime;

use crate::extract::scan::{clear_after, clear_before, number_runs, separator, space_separated};
use crate::extract::words;
use crate::schedule::hours::daily_window;

/// First recognizable time of day in the text.
pub fn extract_time(text: &str) -> Option<NaiveTime> {
    let lowered = text.to_lowercase();
    let (hour, minute) = parse_clock_time(&lowered)
        .or_else(|| parse_spaced_time(&lowered))
        .or_else(|| parse_at_hour(&lowered))
        .or_else(|| parse_spoken_time(&lowered))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// True when the text carries any recognizable time signal.
pub fn has_time_token(text: &str) -> bool {
    extract_time(text).is_some()
}

/// `17:00` or `17.30`. A dotted candidate that continues into another
/// dotted group (`16.02.2026`) is a date, not a time.
pub fn parse_clock_time(lowered: &str) -> Option<(u32, u32)> {
    let runs = number_runs(lowered);
    for window in runs.windows(2) {
        let [hour, minute] = [window[0], window[1]];
        if hour.digits > 2 || minute.digits != 2 {
            continue;
        }
        let sep = match separator(lowered, &hour, &minute) {
            Some(sep @ (b':' | b'.')) => sep,
            _ => continue,
        };
        if !clear_before(lowered, hour.start) || !clear_after(lowered, minute.end) {
            continue;
        }
        if sep == b'.' && continues_as_dotted_date(lowered, minute.end) {
            continue;
        }
        if hour.value <= 23 && minute.value <= 59 {
            return Some((hour.value, minute.value));
        }
    }
    None
}

/// `17 00`: speech transcription often drops the colon.
pub fn parse_spaced_time(lowered: &str) -> Option<(u32, u32)> {
    let runs = number_runs(lowered);
    for window in runs.windows(2) {
        let [hour, minute] = [window[0], window[1]];
        if hour.digits > 2 || minute.digits != 2 {
            continue;
        }
        if !space_separated(lowered, &hour, &minute) {
            continue;
        }
        if !clear_before(lowered, hour.start) || !clear_after(lowered, minute.end) {
            continue;
        }
        if hour.value <= 23 && minute.value <= 59 {
            return Some((hour.value, minute.value));
        }
    }
    None
}

/// "at 17", a bare hour introduced by "at".
pub fn parse_at_hour(lowered: &str) -> Option<(u32, u32)> {
    let tokens = words(lowered);
    for pair in tokens.windows(2) {
        if pair[0] != "at" || pair[1].len() > 2 {
            continue;
        }
        if let Ok(hour) = pair[1].parse::<u32>() {
            if hour <= 23 {
                return Some((hour, 0));
            }
        }
    }
    None
}

/// Spoken-number idioms: "at five", "five o'clock", "five in the evening".
/// Unqualified small hours default to the afternoon reading ("five" is
/// 17:00 far more often than 05:00); "morning" keeps the spoken hour and
/// "evening"/"afternoon" force the PM reading.
pub fn parse_spoken_time(lowered: &str) -> Option<(u32, u32)> {
    let tokens = words(lowered);
    let morning = tokens.iter().any(|token| token == "morning");
    let evening = tokens.iter().any(|token| token == "evening" || token == "afternoon");

    for (index, token) in tokens.iter().enumerate() {
        let Some(spoken) = spoken_number(token) else {
            continue;
        };

        let introduced = index > 0 && tokens[index - 1] == "at";
        let o_clock = tokens
            .get(index + 1)
            .map_or(false, |next| next == "o'clock" || next == "oclock");
        if !introduced && !o_clock && !morning && !evening {
            continue;
        }

        let hour = if morning {
            spoken
        } else if evening {
            if spoken < 12 {
                spoken + 12
            } else {
                spoken
            }
        } else if (1..=7).contains(&spoken) {
            spoken + 12
        } else {
            spoken
        };
        return Some((hour, 0));
    }
    None
}

/// Reinterpret a small extracted hour as PM when the business only opens
/// late: "half two" at a 12:00-19:00 salon means 14:30.
pub fn normalize_ambiguous_hour(time: NaiveTime, working_hours: &str) -> (NaiveTime, bool) {
    use chrono::Timelike;

    let Some((start_minute, _)) = daily_window(working_hours) else {
        return (time, false);
    };

    let hour = time.hour();
    if start_minute / 60 >= 11 && (1..=7).contains(&hour) {
        if let Some(shifted) = NaiveTime::from_hms_opt(hour + 12, time.minute(), 0) {
            return (shifted, true);
        }
    }
    (time, false)
}

fn continues_as_dotted_date(lowered: &str, end: usize) -> bool {
    let bytes = lowered.as_bytes();
    bytes.get(end) == Some(&b'.') && bytes.get(end + 1).map_or(false, u8::is_ascii_digit)
}

fn spoken_number(token: &str) -> Option<u32> {
    let value = match token {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{extract_time, normalize_ambiguous_hour, parse_clock_time, parse_spoken_time};

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time")
    }

    #[test]
    fn clock_forms_parse_with_all_separators() {
        assert_eq!(extract_time("come at 17:00"), Some(time(17, 0)));
        assert_eq!(extract_time("come at 17.30"), Some(time(17, 30)));
        assert_eq!(extract_time("come at 17 30"), Some(time(17, 30)));
        assert_eq!(extract_time("at 9"), Some(time(9, 0)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("17:75"), None);
    }

    #[test]
    fn dotted_dates_are_not_misread_as_times() {
        assert_eq!(extract_time("book me for 16.02.2026"), None);
        // A real dotted time next to a dotted date still wins.
        assert_eq!(extract_time("16.02.2026 at 14.30"), Some(time(14, 30)));
    }

    #[test]
    fn spoken_numbers_default_to_the_afternoon_reading() {
        assert_eq!(parse_spoken_time("friday at five"), Some((17, 0)));
        assert_eq!(parse_spoken_time("five o'clock works"), Some((17, 0)));
        assert_eq!(parse_spoken_time("five in the morning"), Some((5, 0)));
        assert_eq!(parse_spoken_time("five in the evening"), Some((17, 0)));
        assert_eq!(parse_spoken_time("ten o'clock"), Some((10, 0)));
        // A bare number word with no time context is not a time.
        assert_eq!(parse_spoken_time("we are five people"), None);
    }

    #[test]
    fn ambiguous_hours_shift_only_for_late_opening_businesses() {
        let (shifted, changed) = normalize_ambiguous_hour(time(2, 30), "Mon-Fri 12:00-19:00");
        assert_eq!(shifted, time(14, 30));
        assert!(changed);

        let (kept, changed) = normalize_ambiguous_hour(time(2, 30), "Mon-Fri 09:00-18:00");
        assert_eq!(kept, time(2, 30));
        assert!(!changed);

        let (kept, changed) = normalize_ambiguous_hour(time(8, 0), "Mon-Fri 12:00-19:00");
        assert_eq!(kept, time(8, 0));
        assert!(!changed);
    }
}
