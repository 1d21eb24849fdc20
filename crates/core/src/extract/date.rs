//! Date extraction rules, tried in priority order: ISO, dotted numeric,
//! ordinal day-of-month, month-name pairs, then weekday / relative words.
//! Each rule is a named function so it can be tested on its own.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::extract::scan::{clear_after, clear_before, number_runs, separator};
use crate::extract::words;

/// Outcome of resolving a target date from free text.
///
/// When the text names both an explicit date and a weekday that disagree,
/// the computed date is wrapped in `WeekdayMismatch` instead of being
/// returned plainly; the caller must ask the user to disambiguate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedDate {
    Exact(NaiveDate),
    WeekdayMismatch(NaiveDate),
}

impl ResolvedDate {
    pub fn date(self) -> NaiveDate {
        match self {
            Self::Exact(date) | Self::WeekdayMismatch(date) => date,
        }
    }

    pub fn is_mismatch(self) -> bool {
        matches!(self, Self::WeekdayMismatch(_))
    }
}

/// Resolve the target date of an utterance relative to `today`.
pub fn resolve_target_date(text: &str, today: NaiveDate) -> Option<ResolvedDate> {
    let lowered = text.to_lowercase();

    let explicit = parse_explicit_date(&lowered, today).or_else(|| {
        if let Some(weekday) = parse_weekday(&lowered) {
            return Some(next_weekday(today, weekday));
        }
        relative_day(&lowered, today)
    })?;

    if let Some(weekday) = parse_weekday(&lowered) {
        if explicit.weekday() != weekday {
            return Some(ResolvedDate::WeekdayMismatch(explicit));
        }
    }

    Some(ResolvedDate::Exact(explicit))
}

/// True when the text carries any recognizable date signal.
pub fn has_date_token(text: &str, today: NaiveDate) -> bool {
    let lowered = text.to_lowercase();
    parse_explicit_date(&lowered, today).is_some()
        || parse_weekday(&lowered).is_some()
        || relative_day(&lowered, today).is_some()
}

/// Explicitly written dates only; weekday and today/tomorrow words are
/// handled by the caller so mismatch checks can compare against them.
pub fn parse_explicit_date(lowered: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_iso_date(lowered)
        .or_else(|| parse_dotted_date(lowered, today))
        .or_else(|| parse_ordinal_day(lowered, today))
        .or_else(|| parse_month_name_date(lowered, today))
}

/// `YYYY-MM-DD`.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let runs = number_runs(text);
    for window in runs.windows(3) {
        let [year, month, day] = [window[0], window[1], window[2]];
        if year.digits != 4 || month.digits != 2 || day.digits != 2 {
            continue;
        }
        if separator(text, &year, &month) != Some(b'-') || separator(text, &month, &day) != Some(b'-')
        {
            continue;
        }
        if !clear_before(text, year.start) || !clear_after(text, day.end) {
            continue;
        }
        if let Some(date) = NaiveDate::from_ymd_opt(year.value as i32, month.value, day.value) {
            return Some(date);
        }
    }
    None
}

/// `DD.MM.YYYY` or `DD.MM.YY` (also with `/`). Two-digit years are taken
/// as 2000+YY, and a year in the past is coerced to the current year:
/// speech transcription regularly produces stale years.
pub fn parse_dotted_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let runs = number_runs(text);
    for window in runs.windows(3) {
        let [day, month, year] = [window[0], window[1], window[2]];
        if day.digits > 2 || month.digits > 2 || (year.digits != 2 && year.digits != 4) {
            continue;
        }
        let first = separator(text, &day, &month);
        let second = separator(text, &month, &year);
        if !matches!(first, Some(b'.') | Some(b'/')) || !matches!(second, Some(b'.') | Some(b'/')) {
            continue;
        }
        if !clear_before(text, day.start) || !clear_after(text, year.end) {
            continue;
        }

        let mut year_value = year.value as i32;
        if year_value < 100 {
            year_value += 2000;
        }
        if year_value < today.year() {
            year_value = today.year();
        }

        if let Some(date) = NaiveDate::from_ymd_opt(year_value, month.value, day.value) {
            return Some(date);
        }
        return None;
    }
    None
}

/// Ordinal day-of-month: "the 16th". Resolves to the nearest future
/// occurrence of that day, rolling into next month once this month's has
/// passed.
pub fn parse_ordinal_day(lowered: &str, today: NaiveDate) -> Option<NaiveDate> {
    for token in words(lowered) {
        if let Some(day) = ordinal_number(&token) {
            if (1..=31).contains(&day) {
                return same_or_next_month_day(today, day);
            }
        }
    }
    None
}

/// Month-name dates: "16 february", "february 16", "february 16th 2027".
/// The year defaults to the current one when not spoken.
pub fn parse_month_name_date(lowered: &str, today: NaiveDate) -> Option<NaiveDate> {
    let tokens = words(lowered);
    for (index, pair) in tokens.windows(2).enumerate() {
        let (day, month) = match (day_number(&pair[0]), month_number(&pair[1])) {
            (Some(day), Some(month)) => (day, month),
            _ => match (month_number(&pair[0]), day_number(&pair[1])) {
                (Some(month), Some(day)) => (day, month),
                _ => continue,
            },
        };

        let year = tokens
            .get(index + 2)
            .and_then(|token| token.parse::<i32>().ok())
            .filter(|year| (1000..=9999).contains(year))
            .unwrap_or_else(|| today.year());

        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Named weekday as a whole token (full names and usual abbreviations).
pub fn parse_weekday(lowered: &str) -> Option<Weekday> {
    for token in words(lowered) {
        let weekday = match token.as_str() {
            "monday" | "mon" => Weekday::Mon,
            "tuesday" | "tue" | "tues" => Weekday::Tue,
            "wednesday" | "wed" => Weekday::Wed,
            "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
            "friday" | "fri" => Weekday::Fri,
            "saturday" | "sat" => Weekday::Sat,
            "sunday" | "sun" => Weekday::Sun,
            _ => continue,
        };
        return Some(weekday);
    }
    None
}

fn relative_day(lowered: &str, today: NaiveDate) -> Option<NaiveDate> {
    for token in words(lowered) {
        match token.as_str() {
            "tomorrow" => return Some(today + Duration::days(1)),
            "today" => return Some(today),
            _ => {}
        }
    }
    None
}

/// Next future occurrence of `weekday`, always at least one day ahead: a
/// bare weekday never means today.
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Duration::days(i64::from(ahead))
}

fn same_or_next_month_day(today: NaiveDate, day: u32) -> Option<NaiveDate> {
    let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), day)?;
    if this_month >= today {
        return Some(this_month);
    }

    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn ordinal_number(token: &str) -> Option<u32> {
    let digits = token
        .strip_suffix("st")
        .or_else(|| token.strip_suffix("nd"))
        .or_else(|| token.strip_suffix("rd"))
        .or_else(|| token.strip_suffix("th"))?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn day_number(token: &str) -> Option<u32> {
    let day = ordinal_number(token)
        .or_else(|| (token.len() <= 2).then(|| token.parse::<u32>().ok()).flatten())?;
    (1..=31).contains(&day).then_some(day)
}

fn month_number(token: &str) -> Option<u32> {
    let month = match token {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        parse_dotted_date, parse_iso_date, parse_month_name_date, parse_ordinal_day,
        parse_weekday, resolve_target_date, ResolvedDate,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    // A Monday, so weekday arithmetic is easy to follow in the cases below.
    fn today() -> NaiveDate {
        date(2026, 2, 9)
    }

    #[test]
    fn iso_and_dotted_forms_agree() {
        assert_eq!(parse_iso_date("see you 2026-02-16 then"), Some(date(2026, 2, 16)));
        assert_eq!(parse_dotted_date("see you 16.02.2026 then", today()), Some(date(2026, 2, 16)));
        assert_eq!(parse_dotted_date("see you 16/02/2026 then", today()), Some(date(2026, 2, 16)));
    }

    #[test]
    fn two_digit_years_are_normalized_and_stale_years_coerced() {
        // 16.02.22 reads as 2022, which is in the past relative to 2026.
        assert_eq!(parse_dotted_date("16.02.22", today()), Some(date(2026, 2, 16)));
        assert_eq!(parse_dotted_date("16.02.2024", today()), Some(date(2026, 2, 16)));
    }

    #[test]
    fn dates_embedded_in_words_are_rejected() {
        assert_eq!(parse_iso_date("ref a2026-02-16"), None);
        assert_eq!(parse_iso_date("2026-02-16th"), None);
    }

    #[test]
    fn ordinal_day_rolls_into_next_month_when_passed() {
        assert_eq!(parse_ordinal_day("the 16th works", today()), Some(date(2026, 2, 16)));
        assert_eq!(parse_ordinal_day("the 3rd works", today()), Some(date(2026, 3, 3)));
    }

    #[test]
    fn month_name_dates_accept_both_orders_and_optional_year() {
        assert_eq!(parse_month_name_date("16 february", today()), Some(date(2026, 2, 16)));
        assert_eq!(parse_month_name_date("february 16th", today()), Some(date(2026, 2, 16)));
        assert_eq!(parse_month_name_date("march 2 2027", today()), Some(date(2027, 3, 2)));
        assert_eq!(parse_month_name_date("see you in february", today()), None);
    }

    #[test]
    fn bare_weekday_resolves_to_next_future_occurrence() {
        let resolved = resolve_target_date("friday please", today());
        assert_eq!(resolved, Some(ResolvedDate::Exact(date(2026, 2, 13))));

        // Today is Monday; a bare "monday" means next week, never today.
        let resolved = resolve_target_date("monday please", today());
        assert_eq!(resolved, Some(ResolvedDate::Exact(date(2026, 2, 16))));
    }

    #[test]
    fn relative_words_resolve_against_today() {
        assert_eq!(resolve_target_date("tomorrow", today()), Some(ResolvedDate::Exact(date(2026, 2, 10))));
        assert_eq!(resolve_target_date("today if possible", today()), Some(ResolvedDate::Exact(today())));
        assert_eq!(resolve_target_date("soon", today()), None);
    }

    #[test]
    fn weekday_and_explicit_date_disagreement_is_flagged() {
        // 2026-04-16 is a Thursday; the text claims Friday.
        let resolved = resolve_target_date("this friday the 16th", date(2026, 4, 13));
        assert_eq!(resolved, Some(ResolvedDate::WeekdayMismatch(date(2026, 4, 16))));
        assert!(resolved.expect("resolved").is_mismatch());

        // 2026-02-13 actually is a Friday, so the same phrasing is exact.
        let resolved = resolve_target_date("friday the 13th", today());
        assert_eq!(resolved, Some(ResolvedDate::Exact(date(2026, 2, 13))));
    }

    #[test]
    fn weekday_tokens_do_not_match_inside_other_words() {
        assert_eq!(parse_weekday("monitor the monthly satchel"), None);
        assert!(parse_weekday("next wed works").is_some());
    }
}
