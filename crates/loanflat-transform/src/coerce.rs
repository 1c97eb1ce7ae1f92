//! Coercion of chain output to the declared column type.

use chrono::{NaiveDate, NaiveDateTime};
use loanflat_model::{CellValue, DataType, IntWidth};

use crate::error::CoercionError;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_INPUTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coerced {
    pub value: CellValue,
    /// Text was cut to the column's declared length.
    pub truncated: bool,
}

impl Coerced {
    fn exact(value: CellValue) -> Self {
        Self {
            value,
            truncated: false,
        }
    }
}

/// Convert trimmed text to `data_type`.
///
/// With `truncate` set, over-long text is cut to the declared length instead
/// of failing.
pub fn coerce(raw: &str, data_type: DataType, truncate: bool) -> Result<Coerced, CoercionError> {
    let value = raw.trim();
    match data_type {
        DataType::String { max_len } => coerce_text(value, max_len, truncate),
        DataType::Integer { width } => coerce_integer(value, width).map(Coerced::exact),
        DataType::Decimal { scale } => coerce_decimal(value, scale).map(Coerced::exact),
        DataType::Bit => coerce_bit(value).map(Coerced::exact),
        DataType::DateTime => parse_datetime(value)
            .map(|datetime| {
                Coerced::exact(CellValue::DateTime(
                    datetime.format(DATETIME_FORMAT).to_string(),
                ))
            })
            .ok_or(CoercionError::NotADate),
        DataType::Date => parse_datetime(value)
            .map(|datetime| datetime.date())
            .or_else(|| parse_date(value))
            .map(|date| Coerced::exact(CellValue::Date(date.format(DATE_FORMAT).to_string())))
            .ok_or(CoercionError::NotADate),
    }
}

fn coerce_text(
    value: &str,
    max_len: Option<usize>,
    truncate: bool,
) -> Result<Coerced, CoercionError> {
    match max_len {
        Some(max_len) if value.chars().count() > max_len => {
            if !truncate {
                return Err(CoercionError::TooLong { max_len });
            }
            Ok(Coerced {
                value: CellValue::Text(value.chars().take(max_len).collect()),
                truncated: true,
            })
        }
        _ => Ok(Coerced::exact(CellValue::Text(value.to_string()))),
    }
}

fn coerce_integer(value: &str, width: IntWidth) -> Result<CellValue, CoercionError> {
    let parsed = match value.parse::<i64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            // "12.00" is an integer in disguise; "12.5" is not
            let (whole, fraction) = split_decimal(value).ok_or(CoercionError::NotANumber)?;
            if fraction.bytes().any(|b| b != b'0') {
                return Err(CoercionError::Fractional);
            }
            whole.parse::<i64>().map_err(|_| CoercionError::OutOfRange)?
        }
    };
    if !width.contains(parsed) {
        return Err(CoercionError::OutOfRange);
    }
    Ok(CellValue::Integer(parsed))
}

fn coerce_decimal(value: &str, scale: Option<u32>) -> Result<CellValue, CoercionError> {
    let (whole, fraction) = split_decimal(value).ok_or(CoercionError::NotANumber)?;
    let Some(scale) = scale else {
        let text = if fraction.is_empty() {
            whole
        } else {
            format!("{whole}.{fraction}")
        };
        return Ok(CellValue::Decimal(text));
    };
    Ok(CellValue::Decimal(rescale(&whole, fraction, scale as usize)))
}

/// Validate `[+-]digits[.digits]` and return `(signed whole, fraction)`.
///
/// Either side of the dot may be empty, but not both.
fn split_decimal(value: &str) -> Option<(String, &str)> {
    let (negative, unsigned) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits(whole) || !digits(fraction) {
        return None;
    }
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    let signed = if negative && (whole != "0" || fraction.bytes().any(|b| b != b'0')) {
        format!("-{whole}")
    } else {
        whole.to_string()
    };
    Some((signed, fraction))
}

/// Round half away from zero to `scale` fraction digits.
fn rescale(whole: &str, fraction: &str, scale: usize) -> String {
    let (negative, magnitude) = match whole.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, whole),
    };

    let mut digits: Vec<u8> = magnitude.bytes().map(|b| b - b'0').collect();
    let mut kept: Vec<u8> = fraction.bytes().map(|b| b - b'0').collect();
    let round_up = kept.get(scale).is_some_and(|d| *d >= 5);
    kept.resize(scale, 0);
    digits.extend(kept);

    if round_up {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - scale;
    let mut text = String::with_capacity(digits.len() + 2);
    if negative && digits.iter().any(|d| *d != 0) {
        text.push('-');
    }
    for digit in &digits[..split] {
        text.push(char::from(b'0' + digit));
    }
    if scale > 0 {
        text.push('.');
        for digit in &digits[split..] {
            text.push(char::from(b'0' + digit));
        }
    }
    text
}

fn coerce_bit(value: &str) -> Result<CellValue, CoercionError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Ok(CellValue::Bit(true)),
        "0" | "false" | "n" | "no" => Ok(CellValue::Bit(false)),
        _ => Err(CoercionError::NotABit),
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_utc());
    }
    DATETIME_INPUTS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| parse_date(value).and_then(|date| date.and_hms_opt(0, 0, 0)))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_INPUTS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(raw: &str, data_type: DataType) -> Result<CellValue, CoercionError> {
        coerce(raw, data_type, true).map(|coerced| coerced.value)
    }

    #[test]
    fn integers_respect_width() {
        let small = DataType::Integer {
            width: IntWidth::Small,
        };
        assert_eq!(cell(" 42 ", small), Ok(CellValue::Integer(42)));
        assert_eq!(cell("42.00", small), Ok(CellValue::Integer(42)));
        assert_eq!(cell("42.5", small), Err(CoercionError::Fractional));
        assert_eq!(cell("40000", small), Err(CoercionError::OutOfRange));
        assert_eq!(cell("abc", small), Err(CoercionError::NotANumber));
    }

    #[test]
    fn decimals_are_rescaled() {
        let money = DataType::Decimal { scale: Some(2) };
        assert_eq!(cell("15000", money), Ok(CellValue::Decimal("15000.00".into())));
        assert_eq!(cell("2.675", money), Ok(CellValue::Decimal("2.68".into())));
        assert_eq!(cell("-0.004", money), Ok(CellValue::Decimal("0.00".into())));
        assert_eq!(cell("9.999", money), Ok(CellValue::Decimal("10.00".into())));
        assert_eq!(cell(".5", money), Ok(CellValue::Decimal("0.50".into())));
        assert_eq!(
            cell("0.5", DataType::Decimal { scale: Some(0) }),
            Ok(CellValue::Decimal("1".into()))
        );
        assert_eq!(
            cell("-007.10", DataType::Decimal { scale: None }),
            Ok(CellValue::Decimal("-7.10".into()))
        );
        assert_eq!(cell("1e5", money), Err(CoercionError::NotANumber));
    }

    #[test]
    fn dates_and_datetimes() {
        assert_eq!(
            cell("2024-03-01T10:15:00", DataType::DateTime),
            Ok(CellValue::DateTime("2024-03-01 10:15:00".into()))
        );
        assert_eq!(
            cell("2024-03-01", DataType::DateTime),
            Ok(CellValue::DateTime("2024-03-01 00:00:00".into()))
        );
        assert_eq!(
            cell("03/01/2024", DataType::Date),
            Ok(CellValue::Date("2024-03-01".into()))
        );
        assert_eq!(
            cell("2024-03-01 23:59:59", DataType::Date),
            Ok(CellValue::Date("2024-03-01".into()))
        );
        assert_eq!(cell("yesterday", DataType::Date), Err(CoercionError::NotADate));
    }

    #[test]
    fn text_truncation() {
        let short = DataType::String { max_len: Some(5) };
        let coerced = coerce("Annabelle", short, true).unwrap();
        assert_eq!(coerced.value, CellValue::Text("Annab".into()));
        assert!(coerced.truncated);
        assert_eq!(
            coerce("Annabelle", short, false),
            Err(CoercionError::TooLong { max_len: 5 })
        );
    }

    #[test]
    fn bits() {
        assert_eq!(cell("Yes", DataType::Bit), Ok(CellValue::Bit(true)));
        assert_eq!(cell("0", DataType::Bit), Ok(CellValue::Bit(false)));
        assert_eq!(cell("2", DataType::Bit), Err(CoercionError::NotABit));
    }
}
