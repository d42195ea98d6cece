//! Domain models for Centsible

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The closed expense category set
///
/// Defined once and shared by the schema validator, the normalization
/// prompt, and the keyword inference engine. `Other` is the mandatory
/// fallback for anything unclassifiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transportation,
    Entertainment,
    Shopping,
    Bills,
    Healthcare,
    Education,
    Other,
}

impl Category {
    /// All categories in inference priority order (first match wins)
    pub const ALL: [Category; 8] = [
        Self::Food,
        Self::Transportation,
        Self::Entertainment,
        Self::Shopping,
        Self::Bills,
        Self::Healthcare,
        Self::Education,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transportation => "Transportation",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Bills => "Bills",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" => Ok(Self::Food),
            "transportation" => Ok(Self::Transportation),
            "entertainment" => Ok(Self::Entertainment),
            "shopping" => Ok(Self::Shopping),
            "bills" => Ok(Self::Bills),
            "healthcare" => Ok(Self::Healthcare),
            "education" => Ok(Self::Education),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unvalidated expense data produced by an extraction step
///
/// All fields are optional and untrusted. `amount` is kept as a raw
/// JSON value because models return it as a number, a bare string, or
/// a string with currency symbols. Created by the extraction stage,
/// mutated by normalization, consumed by validation & repair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
}

/// Schema-valid expense data ready for persistence
///
/// Invariant: every record leaving the core passes the schema
/// validator. The date serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub amount: f64,
    pub category: Category,
    pub description: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
}

/// A monthly spending limit, overall or per category
///
/// `category: None` means the total budget. `month` is `YYYY-MM`; the
/// most recently stored limit for a scope wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimit {
    pub monthly_limit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub month: String,
}

/// Spend against a budget limit for one scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub monthly_limit: f64,
    pub spent: f64,
    pub remaining: f64,
}

/// Companion pet persona for the chat assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetKind {
    #[default]
    Penguin,
    Dragon,
    Cat,
    Fox,
}

impl PetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Penguin => "penguin",
            Self::Dragon => "dragon",
            Self::Cat => "cat",
            Self::Fox => "fox",
        }
    }

    /// Pet display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Penguin => "Penny",
            Self::Dragon => "Ember",
            Self::Cat => "Mochi",
            Self::Fox => "Scout",
        }
    }

    /// Personality traits injected into the chat prompt
    pub fn traits(&self) -> &'static str {
        match self {
            Self::Penguin => "friendly, warm, practical, encouraging",
            Self::Dragon => "wise, enthusiastic, inspiring",
            Self::Cat => "playful, sweet, sometimes sassy",
            Self::Fox => "clever, curious, upbeat",
        }
    }
}

impl std::str::FromStr for PetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "penguin" => Ok(Self::Penguin),
            "dragon" => Ok(Self::Dragon),
            "cat" => Ok(Self::Cat),
            "fox" => Ok(Self::Fox),
            _ => Err(format!("Unknown pet: {}", s)),
        }
    }
}

impl std::fmt::Display for PetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user budget context assembled by the caller for chat/insights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    pub selected_pet: PetKind,
    /// 1-10; adjusts the chat tone
    pub friendship_level: u8,
    pub budget: f64,
    pub total_spent: f64,
    #[serde(default)]
    pub recent_expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    pub category_totals: BTreeMap<String, f64>,
}

/// Cost-of-living indices for a city, supplied by the caller
///
/// The lookup/cache lives outside the core; this is just the shape the
/// chat prompt consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityCostData {
    pub city: String,
    #[serde(default)]
    pub cost_index: Option<f64>,
    #[serde(default)]
    pub rent_index: Option<f64>,
    #[serde(default)]
    pub groceries_index: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for cat in Category::ALL {
            let parsed: Category = cat.as_str().parse().unwrap();
            assert_eq!(parsed, cat);
        }
    }

    #[test]
    fn test_category_parse_case_insensitive() {
        assert_eq!("food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!("HEALTHCARE".parse::<Category>().unwrap(), Category::Healthcare);
        assert!("groceries".parse::<Category>().is_err());
    }

    #[test]
    fn test_record_serializes_iso_date() {
        let record = ExpenseRecord {
            amount: 15.0,
            category: Category::Food,
            description: "Lunch".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 17).unwrap(),
            merchant: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2026-02-17");
        assert_eq!(json["category"], "Food");
        assert!(json.get("merchant").is_none());
    }

    #[test]
    fn test_draft_ignores_unknown_fields() {
        let draft: ExpenseDraft = serde_json::from_str(
            r#"{"amount": "$12.50", "category": "food", "metadata": {"tax": 1.0}}"#,
        )
        .unwrap();
        assert_eq!(draft.amount, Some(serde_json::json!("$12.50")));
        assert_eq!(draft.category.as_deref(), Some("food"));
        assert!(draft.date.is_none());
    }
}
