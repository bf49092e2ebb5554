use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum DateError {
    #[error("unrecognised date {0:?}")]
    Unrecognised(String),
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

// Slashed dates are read month first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d %Y",
    "%b %d, %Y",
];

/// Parses the date formats spreadsheets commonly export. Date-only values land on midnight.
pub fn parse_date(text: &str) -> Result<NaiveDateTime, DateError> {
    let text = text.trim();

    if let Some(parsed) = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Ok(parsed);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| compact_date(text))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| DateError::Unrecognised(text.to_string()))
}

/// `YYYYMMDD`
fn compact_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year = text[0..4].parse().ok()?;
    let month = text[4..6].parse().ok()?;
    let day = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_date_only_formats() -> Result<()> {
        let expected = ymd(2024, 3, 7).and_hms_opt(0, 0, 0).unwrap();

        for text in [
            "2024-03-07",
            "2024/03/07",
            "03/07/2024",
            "07.03.2024",
            "20240307",
            "7 Mar 2024",
            "07-Mar-2024",
            "Mar 7 2024",
            "March 7, 2024",
            "  2024-03-07  ",
        ] {
            assert_eq!(parse_date(text)?, expected, "parsing {:?}", text);
        }

        Ok(())
    }

    #[test]
    fn test_date_time_formats() -> Result<()> {
        let parsed = parse_date("2024-03-07 14:30:05")?;
        assert_eq!(parsed, ymd(2024, 3, 7).and_hms_opt(14, 30, 5).unwrap());

        let parsed = parse_date("2024-03-07T08:15")?;
        assert_eq!(parsed, ymd(2024, 3, 7).and_hms_opt(8, 15, 0).unwrap());

        Ok(())
    }

    #[test]
    fn test_rejects_nonsense() {
        for text in ["", "tomorrow", "2024-13-01", "20241301", "31/31/2024", "2024"] {
            assert_eq!(parse_date(text), Err(DateError::Unrecognised(text.to_string())));
        }
    }
}
