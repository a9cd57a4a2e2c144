use chrono::{Datelike, NaiveDate, Utc};

use crate::error::EngineError;

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Normalize a date string the platform may send in regional variants
/// (`YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`) to `YYYY-MM-DD`.
/// Unparseable input is returned as-is so the operator still sees it.
pub fn normalize_date(value: Option<String>) -> Option<String> {
    let raw = value?.trim().to_string();
    if raw.is_empty() {
        return None;
    }

    match parse_date(&raw) {
        Some(date) => Some(date.format("%Y-%m-%d").to_string()),
        None => Some(raw),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let formats = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), fmt) {
            return Some(date);
        }
    }
    None
}

/// Parse a target month of the form `YYYY-MM`.
pub fn parse_year_month(raw: &str) -> Result<(i32, u32), EngineError> {
    let parsed = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| EngineError::Validation(format!("invalid target month: {raw:?}")))?;
    Ok((parsed.year(), parsed.month()))
}

/// Last calendar day of a month, handling 28/29/30/31-day months and the
/// December to January rollover.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .expect("first day of a month always has a predecessor")
}

/// First and last day of a `YYYY-MM` month.
pub fn month_bounds(target_month: &str) -> Result<(NaiveDate, NaiveDate), EngineError> {
    let (year, month) = parse_year_month(target_month)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::Validation(format!("invalid target month: {target_month:?}")))?;
    Ok((first, last_day_of_month(year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slash_dates() {
        assert_eq!(
            normalize_date(Some("2026/02/20".to_string())),
            Some("2026-02-20".to_string())
        );
        assert_eq!(
            normalize_date(Some("2026-02-20".to_string())),
            Some("2026-02-20".to_string())
        );
    }

    #[test]
    fn keeps_unparseable_dates_visible() {
        assert_eq!(
            normalize_date(Some("2月20日".to_string())),
            Some("2月20日".to_string())
        );
        assert_eq!(normalize_date(Some("  ".to_string())), None);
        assert_eq!(normalize_date(None), None);
    }

    #[test]
    fn month_end_handles_leap_years() {
        assert_eq!(
            last_day_of_month(2026, 2),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2025, 12),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_target_month() {
        assert!(parse_year_month("2026-13").is_err());
        assert!(parse_year_month("banana").is_err());
        assert_eq!(parse_year_month("2026-02").unwrap(), (2026, 2));
    }
}
