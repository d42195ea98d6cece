//! Structural validation for expense data
//!
//! A single shared check used identically by the text and receipt
//! pipelines. Violations are always caught at the stage boundary and
//! converted into the stage error taxonomy, never surfaced raw.

use chrono::NaiveDate;

use crate::models::Category;

/// Maximum description length accepted by the schema
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// A schema check failure, carrying the offending field and reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub field: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Validate an arbitrary JSON mapping against the expense schema
///
/// Required: `amount` (non-negative number), `category` (member of the
/// closed category set), `date` (`YYYY-MM-DD`, a real calendar date).
/// Optional: `description` (string, at most 200 characters). Pure
/// check, no side effects.
pub fn validate_expense(value: &serde_json::Value) -> Result<(), SchemaViolation> {
    let map = value
        .as_object()
        .ok_or_else(|| SchemaViolation::new("$", "expected a JSON object"))?;

    // amount
    let amount = map
        .get("amount")
        .ok_or_else(|| SchemaViolation::new("amount", "required field missing"))?;
    let amount = amount
        .as_f64()
        .ok_or_else(|| SchemaViolation::new("amount", "must be a number"))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(SchemaViolation::new("amount", "must be non-negative"));
    }

    // category
    let category = map
        .get("category")
        .ok_or_else(|| SchemaViolation::new("category", "required field missing"))?;
    let category = category
        .as_str()
        .ok_or_else(|| SchemaViolation::new("category", "must be a string"))?;
    if Category::ALL.iter().all(|c| c.as_str() != category) {
        return Err(SchemaViolation::new(
            "category",
            format!("'{}' is not a valid category", category),
        ));
    }

    // date
    let date = map
        .get("date")
        .ok_or_else(|| SchemaViolation::new("date", "required field missing"))?;
    let date = date
        .as_str()
        .ok_or_else(|| SchemaViolation::new("date", "must be a string"))?;
    check_date(date)?;

    // description (optional)
    if let Some(description) = map.get("description") {
        let description = description
            .as_str()
            .ok_or_else(|| SchemaViolation::new("description", "must be a string"))?;
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(SchemaViolation::new(
                "description",
                format!("longer than {} characters", MAX_DESCRIPTION_LEN),
            ));
        }
    }

    Ok(())
}

/// Check a date string is `YYYY-MM-DD` and a parseable calendar date
pub fn check_date(date: &str) -> Result<NaiveDate, SchemaViolation> {
    if date.len() != 10 {
        return Err(SchemaViolation::new("date", "must be YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| SchemaViolation::new("date", format!("'{}' is not a valid date", date)))
}
