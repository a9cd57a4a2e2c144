use chrono::NaiveDate;

use crate::error::EngineError;
use crate::models::InvoiceDates;
use crate::services::classifier::ClosingRule;
use crate::utils::{last_day_of_month, parse_year_month};

/// Compute billing and due dates for a closing rule and a `YYYY-MM` target
/// month.
///
/// Billing falls inside the target month (day 20, day 15, or its last
/// day); the due date is always the last calendar day of the following
/// month. `ClosingRule::None` yields `Ok(None)`: the caller copies the
/// template invoice's own dates verbatim instead.
pub fn compute_dates(
    rule: ClosingRule,
    target_month: &str,
) -> Result<Option<InvoiceDates>, EngineError> {
    let (year, month) = parse_year_month(target_month)?;

    let billing_date = match rule {
        ClosingRule::Day20 => NaiveDate::from_ymd_opt(year, month, 20),
        ClosingRule::Day15 => NaiveDate::from_ymd_opt(year, month, 15),
        ClosingRule::EndOfMonth => Some(last_day_of_month(year, month)),
        ClosingRule::None => return Ok(None),
    }
    .ok_or_else(|| EngineError::Validation(format!("invalid target month: {target_month:?}")))?;

    let (due_year, due_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    Ok(Some(InvoiceDates {
        billing_date,
        due_date: last_day_of_month(due_year, due_month),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day20_rule() {
        let dates = compute_dates(ClosingRule::Day20, "2026-02").unwrap().unwrap();
        assert_eq!(dates.billing_date, date(2026, 2, 20));
        assert_eq!(dates.due_date, date(2026, 3, 31));
    }

    #[test]
    fn day15_rule() {
        let dates = compute_dates(ClosingRule::Day15, "2026-04").unwrap().unwrap();
        assert_eq!(dates.billing_date, date(2026, 4, 15));
        assert_eq!(dates.due_date, date(2026, 5, 31));
    }

    #[test]
    fn end_of_month_rule() {
        let dates = compute_dates(ClosingRule::EndOfMonth, "2026-02")
            .unwrap()
            .unwrap();
        assert_eq!(dates.billing_date, date(2026, 2, 28));
        assert_eq!(dates.due_date, date(2026, 3, 31));
    }

    #[test]
    fn end_of_month_rule_in_leap_year() {
        let dates = compute_dates(ClosingRule::EndOfMonth, "2024-02")
            .unwrap()
            .unwrap();
        assert_eq!(dates.billing_date, date(2024, 2, 29));
        assert_eq!(dates.due_date, date(2024, 3, 31));
    }

    #[test]
    fn december_rolls_over_to_january() {
        let dates = compute_dates(ClosingRule::Day20, "2025-12").unwrap().unwrap();
        assert_eq!(dates.billing_date, date(2025, 12, 20));
        assert_eq!(dates.due_date, date(2026, 1, 31));
    }

    #[test]
    fn none_rule_computes_nothing() {
        assert_eq!(compute_dates(ClosingRule::None, "2026-02").unwrap(), None);
    }

    #[test]
    fn malformed_month_is_a_validation_error() {
        let err = compute_dates(ClosingRule::Day20, "2026/02").unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
