//! Validation & repair stage
//!
//! Deterministic, no model calls. Coerces a draft into a schema-valid
//! record, repairing what it can: a bad category falls back to keyword
//! inference, a bad date falls back to today. A missing or
//! non-positive amount is never invented and fails the stage. The
//! repaired record is re-checked against the schema before it leaves;
//! a second failure is fatal.

use chrono::NaiveDate;
use tracing::debug;

use crate::category::infer_category;
use crate::error::{Error, Result};
use crate::models::{Category, ExpenseDraft, ExpenseRecord};
use crate::schema::{check_date, validate_expense};

const DEFAULT_DESCRIPTION: &str = "Expense";

/// Repair a draft into a schema-valid record
///
/// Idempotent: feeding a valid record's fields back through produces
/// the same record.
pub fn validate_and_repair(draft: &ExpenseDraft, today: NaiveDate) -> Result<ExpenseRecord> {
    let amount = parse_amount(draft.amount.as_ref())?;

    let merchant = draft.merchant.as_deref().unwrap_or("");
    let description = draft
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    let category = match draft.category.as_deref() {
        Some(raw) => raw.parse::<Category>().unwrap_or_else(|_| {
            let inferred = infer_category(merchant, &description);
            debug!(raw, inferred = %inferred, "Repaired category via keyword inference");
            inferred
        }),
        None => infer_category(merchant, &description),
    };

    let date = match draft.date.as_deref() {
        Some(raw) => check_date(raw).unwrap_or_else(|_| {
            debug!(raw, "Repaired unparseable date to today");
            today
        }),
        None => today,
    };

    let record = ExpenseRecord {
        amount,
        category,
        description,
        date,
        merchant: draft.merchant.clone().filter(|m| !m.trim().is_empty()),
    };

    // Re-check the repaired record; a failure here is not repairable
    let value = serde_json::to_value(&record)?;
    validate_expense(&value).map_err(|v| Error::Validation(v.to_string()))?;

    Ok(record)
}

/// Coerce a raw amount value into a strictly positive f64
///
/// Accepts JSON numbers and strings with currency symbols, thousands
/// separators, or whitespace. Missing and non-positive amounts fail.
fn parse_amount(raw: Option<&serde_json::Value>) -> Result<f64> {
    let raw = raw.ok_or_else(|| Error::Validation("amount: required field missing".into()))?;

    let amount = if let Some(n) = raw.as_f64() {
        n
    } else if let Some(s) = raw.as_str() {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
            .collect();
        cleaned
            .parse::<f64>()
            .map_err(|_| Error::Validation(format!("amount: cannot parse '{}'", s)))?
    } else {
        return Err(Error::Validation(format!(
            "amount: expected number or string, got {}",
            raw
        )));
    };

    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(format!(
            "amount: must be positive, got {}",
            amount
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 17).unwrap()
    }

    fn draft(amount: serde_json::Value) -> ExpenseDraft {
        ExpenseDraft {
            amount: Some(amount),
            category: Some("Food".into()),
            description: Some("Lunch".into()),
            date: Some("2026-02-17".into()),
            merchant: None,
        }
    }

    #[test]
    fn test_clean_draft_passes_through() {
        let record = validate_and_repair(&draft(json!(15.5)), today()).unwrap();
        assert_eq!(record.amount, 15.5);
        assert_eq!(record.category, Category::Food);
        assert_eq!(record.date, today());
    }

    #[test]
    fn test_currency_string_amount_coerced() {
        for raw in ["$15.50", " 15.50 ", "€15.50"] {
            let record = validate_and_repair(&draft(json!(raw)), today()).unwrap();
            assert_eq!(record.amount, 15.5, "{}", raw);
        }
        let record = validate_and_repair(&draft(json!("$1,299.00")), today()).unwrap();
        assert_eq!(record.amount, 1299.0);
    }

    #[test]
    fn test_missing_amount_fails() {
        let mut d = draft(json!(1));
        d.amount = None;
        assert!(matches!(
            validate_and_repair(&d, today()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_zero_and_negative_amount_fail() {
        for raw in [json!(0), json!(-5.0), json!("$0.00")] {
            assert!(validate_and_repair(&draft(raw), today()).is_err());
        }
    }

    #[test]
    fn test_unknown_category_repaired_by_keywords() {
        let d = ExpenseDraft {
            amount: Some(json!(40)),
            category: Some("Fuel".into()),
            description: Some("Gas station fill-up".into()),
            date: None,
            merchant: Some("Shell".into()),
        };
        let record = validate_and_repair(&d, today()).unwrap();
        assert_eq!(record.category, Category::Transportation);
        assert_eq!(record.date, today());
    }

    #[test]
    fn test_missing_category_inferred() {
        let d = ExpenseDraft {
            amount: Some(json!(12)),
            category: None,
            description: Some("Pharmacy run".into()),
            date: Some("2026-02-17".into()),
            merchant: None,
        };
        assert_eq!(
            validate_and_repair(&d, today()).unwrap().category,
            Category::Healthcare
        );
    }

    #[test]
    fn test_bad_date_repaired_to_today() {
        let mut d = draft(json!(5));
        d.date = Some("last tuesday".into());
        assert_eq!(validate_and_repair(&d, today()).unwrap().date, today());
    }

    #[test]
    fn test_blank_description_gets_placeholder() {
        let mut d = draft(json!(5));
        d.description = Some("   ".into());
        assert_eq!(
            validate_and_repair(&d, today()).unwrap().description,
            DEFAULT_DESCRIPTION
        );
    }

    #[test]
    fn test_over_long_description_is_fatal() {
        let mut d = draft(json!(5));
        d.description = Some("x".repeat(201));
        assert!(matches!(
            validate_and_repair(&d, today()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let first = validate_and_repair(&draft(json!("$15.50")), today()).unwrap();
        let again = validate_and_repair(
            &ExpenseDraft {
                amount: Some(json!(first.amount)),
                category: Some(first.category.as_str().into()),
                description: Some(first.description.clone()),
                date: Some(first.date.to_string()),
                merchant: first.merchant.clone(),
            },
            today(),
        )
        .unwrap();
        assert_eq!(first, again);
    }
}
