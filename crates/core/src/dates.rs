//! Best-effort normalization of free-text travel dates.
//!
//! This is deliberately not a general date parser. The rules are tried in a
//! fixed order against the lower-cased input and the first one that applies
//! decides the result:
//!
//! 1. `summer` maps to `06/15-08/31/<year>`
//! 2. `winter` maps to `12/01-02/28/<year>`
//! 3. `<n> week(s) ... <month>` maps to `MM/DD-MM/DD` starting on the 1st of the month
//! 4. anything containing `-` or `to` is returned as written, with `to` replaced by `-`
//! 5. otherwise a single date is picked out of the text and rendered `MM/DD/YYYY`
//!
//! Seasons move to the following year when the text mentions `next`. Any
//! failure yields `None` and the caller is expected to ask again.

use chrono::{Datelike, Duration, NaiveDate};

pub fn parse_flexible_date(input: &str, today: NaiveDate) -> Option<String> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    if lowered.contains("summer") {
        return Some(format!("06/15-08/31/{}", season_year(&lowered, today)));
    }
    if lowered.contains("winter") {
        return Some(format!("12/01-02/28/{}", season_year(&lowered, today)));
    }
    if lowered.contains("week") {
        return parse_week_span(&lowered, today);
    }
    // Replaces inside words too ("tomorrow" -> "-morrow"). Casing is kept.
    if lowered.contains('-') || lowered.contains("to") {
        return Some(trimmed.replace("to", "-"));
    }

    parse_single_date(&lowered, today).map(|date| date.format("%m/%d/%Y").to_string())
}

fn season_year(text: &str, today: NaiveDate) -> i32 {
    if text.contains("next") {
        today.year() + 1
    } else {
        today.year()
    }
}

fn parse_week_span(text: &str, today: NaiveDate) -> Option<String> {
    let tokens = words(text);
    let week_index = tokens.iter().position(|token| token == "week" || token == "weeks")?;
    let count = parse_count(tokens.get(week_index.checked_sub(1)?)?)?;
    let month = tokens[week_index + 1..].iter().find_map(|token| month_from_name(token))?;

    let start = NaiveDate::from_ymd_opt(today.year(), month, 1)?;
    let end = start.checked_add_signed(Duration::days(i64::from(count) * 7))?;
    Some(format!("{}-{}", start.format("%m/%d"), end.format("%m/%d")))
}

fn parse_single_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let tokens = words(text);

    if let Some(date) = tokens.iter().find_map(|token| parse_slash_date(token, today)) {
        return Some(date);
    }

    let mut month = None;
    let mut day = None;
    let mut year = None;

    for token in &tokens {
        if month.is_none() {
            if let Some(found) = month_from_name(token) {
                month = Some(found);
                continue;
            }
        }
        if year.is_none() && token.len() == 4 {
            if let Ok(found) = token.parse::<i32>() {
                if (1900..=2100).contains(&found) {
                    year = Some(found);
                    continue;
                }
            }
        }
        if day.is_none() {
            if let Some(found) = parse_day(token) {
                day = Some(found);
            }
        }
    }

    if month.is_none() && day.is_none() && year.is_none() {
        return None;
    }

    NaiveDate::from_ymd_opt(
        year.unwrap_or_else(|| today.year()),
        month.unwrap_or_else(|| today.month()),
        day.unwrap_or_else(|| today.day()),
    )
}

fn parse_slash_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let parts = token.split('/').collect::<Vec<_>>();
    let (month, day, year) = match parts.as_slice() {
        [month, day] => (month.parse().ok()?, day.parse().ok()?, today.year()),
        [month, day, year] => {
            let year = year.parse::<i32>().ok()?;
            let year = if year < 100 { 2000 + year } else { year };
            (month.parse().ok()?, day.parse().ok()?, year)
        }
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_day(token: &str) -> Option<u32> {
    let digits = token
        .strip_suffix("st")
        .or_else(|| token.strip_suffix("nd"))
        .or_else(|| token.strip_suffix("rd"))
        .or_else(|| token.strip_suffix("th"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    digits.parse::<u32>().ok().filter(|day| (1..=31).contains(day))
}

fn parse_count(token: &str) -> Option<u32> {
    let count = match token {
        "a" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        other => other.parse::<u32>().ok()?,
    };
    (count > 0).then_some(count)
}

fn month_from_name(token: &str) -> Option<u32> {
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

fn words(text: &str) -> Vec<String> {
    text.split(|character: char| character.is_whitespace() || character == ',')
        .map(|token| {
            token.trim_matches(|character: char| !character.is_alphanumeric() && character != '/')
        })
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
