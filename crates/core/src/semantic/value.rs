//! Casting typed strings into filter values.

use time::macros::format_description;
use time::{Date, Month};

use crate::composition::{base_names, parse_flag, Tagme};
use crate::error::SemanticError;
use crate::range::TextRange;

/// Whether `text` carries a `*` or `?` wildcard.
pub fn is_pattern(text: &str) -> bool {
    text.contains(['*', '?'])
}

fn cast_error(value: &str, expected: &'static str, range: TextRange) -> SemanticError {
    SemanticError::TypeCast {
        value: value.to_string(),
        expected,
        range,
    }
}

/// A literal that abbreviates several values, such as a whole month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complex<T> {
    One(T),
    /// Every value in `[begin, end)`.
    Span { begin: T, end: T },
}

pub fn number(text: &str, range: TextRange) -> Result<i64, SemanticError> {
    text.parse::<i64>()
        .map_err(|_| cast_error(text, "number", range))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNumber {
    Number(Complex<i64>),
    /// Digits with `*` or inner `?`, matched as text.
    Pattern(String),
}

/// A number where trailing `?`s stand for whole decades: `12??` is
/// `[1200, 1300)`. Any other wildcard digit string is a pattern.
pub fn pattern_number(text: &str, range: TextRange) -> Result<PatternNumber, SemanticError> {
    let wildcard_digits = text.chars().all(|c| c.is_ascii_digit() || c == '*' || c == '?');
    if !wildcard_digits || !is_pattern(text) {
        return number(text, range).map(|n| PatternNumber::Number(Complex::One(n)));
    }
    let digits = text.trim_end_matches('?');
    let places = text.len() - digits.len();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(PatternNumber::Pattern(text.to_string()));
    }
    let scale = u32::try_from(places)
        .ok()
        .and_then(|p| 10i64.checked_pow(p));
    let span = number(digits, range).ok().and_then(|prefix| {
        let scale = scale?;
        Some(Complex::Span {
            begin: prefix.checked_mul(scale)?,
            end: prefix.checked_add(1)?.checked_mul(scale)?,
        })
    });
    span.map(PatternNumber::Number)
        .ok_or_else(|| cast_error(text, "number", range))
}

/// Byte count with an optional unit. `k`/`kb` and up are powers of 1000,
/// `kib` and up powers of 1024; a bare number is bytes.
pub fn size(text: &str, range: TextRange) -> Result<u64, SemanticError> {
    let lower = text.to_ascii_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(lower.len());
    let (digits, unit) = lower.split_at(split);
    let multiplier: u64 = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        _ => return Err(cast_error(text, "size", range)),
    };
    let amount: f64 = digits
        .parse()
        .map_err(|_| cast_error(text, "size", range))?;
    let bytes = amount * multiplier as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(cast_error(text, "size", range));
    }
    Ok(bytes.round() as u64)
}

/// A full date, or a span of days for a partial one. Parts may be split
/// by `-`, `/` or `.` (a dotted path). Two parts are `yyyy-MM` when the
/// first is a four-digit year, `MM-dd` of `current_year` otherwise; one
/// part is a year or a month of `current_year` the same way.
pub fn date(text: &str, current_year: i32, range: TextRange) -> Result<Complex<Date>, SemanticError> {
    let fail = || cast_error(text, "date", range);
    let parts = text
        .splitn(3, ['-', '/', '.'])
        .map(|p| p.parse::<i32>().map_err(|_| fail()))
        .collect::<Result<Vec<_>, _>>()?;
    let day = |year: i32, month: i32, day: i32| -> Result<Date, SemanticError> {
        let month = u8::try_from(month).ok().and_then(|m| Month::try_from(m).ok());
        let day = u8::try_from(day).ok();
        match (month, day) {
            (Some(month), Some(day)) => Date::from_calendar_date(year, month, day).map_err(|_| fail()),
            _ => Err(fail()),
        }
    };
    let month_span = |year: i32, month: i32| -> Result<Complex<Date>, SemanticError> {
        let begin = day(year, month, 1)?;
        let end = if begin.month() == Month::December {
            day(year + 1, 1, 1)?
        } else {
            day(year, month + 1, 1)?
        };
        Ok(Complex::Span { begin, end })
    };
    match parts.as_slice() {
        [y, m, d] => day(*y, *m, *d).map(Complex::One),
        [y, m] if *y >= 1000 => month_span(*y, *m),
        [m, d] => day(current_year, *m, *d).map(Complex::One),
        [y] if *y >= 1000 => Ok(Complex::Span {
            begin: day(*y, 1, 1)?,
            end: day(*y + 1, 1, 1)?,
        }),
        [m] => month_span(current_year, *m),
        _ => Err(fail()),
    }
}

pub fn tagme(text: &str, range: TextRange) -> Result<Tagme, SemanticError> {
    parse_flag::<Tagme>(text).ok_or_else(|| SemanticError::EnumCast {
        value: text.to_string(),
        type_name: "tagme",
        expected: base_names::<Tagme>()
            .into_iter()
            .map(str::to_lowercase)
            .collect(),
        range,
    })
}

/// `YYYY-MM-DD` for plans and rendered queries.
pub fn format_date(date: &Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(format).unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r() -> TextRange {
        TextRange::new(0, 1)
    }

    #[test]
    fn numbers() {
        assert_eq!(number("42", r()).unwrap(), 42);
        assert_eq!(number("-7", r()).unwrap(), -7);
        let err = number("4x", r()).unwrap_err();
        assert!(matches!(err, SemanticError::TypeCast { expected: "number", .. }));
    }

    #[test]
    fn sizes_with_units() {
        assert_eq!(size("512", r()).unwrap(), 512);
        assert_eq!(size("10b", r()).unwrap(), 10);
        assert_eq!(size("2KB", r()).unwrap(), 2_000);
        assert_eq!(size("1.5m", r()).unwrap(), 1_500_000);
        assert_eq!(size("1kib", r()).unwrap(), 1024);
        assert_eq!(size("3MiB", r()).unwrap(), 3 << 20);
        assert!(size("3 parsecs", r()).is_err());
        assert!(size("mb", r()).is_err());
    }

    fn day(y: i32, m: Month, d: u8) -> Date {
        Date::from_calendar_date(y, m, d).unwrap()
    }

    #[test]
    fn full_dates_in_every_spelling() {
        let expected = Complex::One(day(2024, Month::March, 5));
        assert_eq!(date("2024-03-05", 2000, r()).unwrap(), expected);
        assert_eq!(date("2024.3.5", 2000, r()).unwrap(), expected);
        assert_eq!(date("2024/3/5", 2000, r()).unwrap(), expected);
        assert!(date("2024-13-01", 2000, r()).is_err());
        assert!(date("2024-1-2-3", 2000, r()).is_err());
        assert!(date("yesterday", 2000, r()).is_err());
        assert_eq!(format_date(&day(2024, Month::March, 5)), "2024-03-05");
    }

    #[test]
    fn partial_dates_are_spans() {
        assert_eq!(
            date("2024", 2000, r()).unwrap(),
            Complex::Span {
                begin: day(2024, Month::January, 1),
                end: day(2025, Month::January, 1),
            }
        );
        assert_eq!(
            date("2024-12", 2000, r()).unwrap(),
            Complex::Span {
                begin: day(2024, Month::December, 1),
                end: day(2025, Month::January, 1),
            }
        );
        assert_eq!(
            date("03", 2021, r()).unwrap(),
            Complex::Span {
                begin: day(2021, Month::March, 1),
                end: day(2021, Month::April, 1),
            }
        );
        assert_eq!(date("3-7", 2021, r()).unwrap(), Complex::One(day(2021, Month::March, 7)));
        assert!(date("13", 2021, r()).is_err());
        assert!(date("2-30", 2021, r()).is_err());
    }

    #[test]
    fn pattern_numbers() {
        let n = |t: &str| pattern_number(t, r()).unwrap();
        assert_eq!(n("12"), PatternNumber::Number(Complex::One(12)));
        assert_eq!(
            n("12??"),
            PatternNumber::Number(Complex::Span {
                begin: 1200,
                end: 1300
            })
        );
        assert_eq!(n("1?2"), PatternNumber::Pattern("1?2".into()));
        assert_eq!(n("12*"), PatternNumber::Pattern("12*".into()));
        assert_eq!(n("??"), PatternNumber::Pattern("??".into()));
        assert!(pattern_number("ab?", r()).is_err());
        assert!(pattern_number("9999999999999999999?", r()).is_err());
    }

    #[test]
    fn tagme_names() {
        assert_eq!(tagme("author", r()).unwrap(), Tagme::AUTHOR);
        let SemanticError::EnumCast { expected, .. } = tagme("nope", r()).unwrap_err() else {
            panic!("expected an enum cast error");
        };
        assert_eq!(expected, vec!["tag", "author", "topic", "source"]);
    }

    #[test]
    fn patterns() {
        assert!(is_pattern("12*"));
        assert!(is_pattern("a?c"));
        assert!(!is_pattern("abc"));
    }
}
