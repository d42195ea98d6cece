//! Structured function calling
//!
//! Turns a natural-language request into a typed, validated function
//! call and executes it against a store. Three stages: the model
//! identifies the function and its arguments, the arguments are
//! checked against the closed schema, then the call runs. A
//! `FunctionCall` can only be constructed with valid arguments, so
//! execution never re-validates.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{BudgetLimit, BudgetStatus, Category, ExpenseRecord};
use crate::parsing::extract_json_object;
use crate::prompts::{PromptId, PromptLibrary};
use crate::providers::{Provider, ProviderClient, ProviderConfig};
use crate::schema::{check_date, MAX_DESCRIPTION_LEN};
use crate::store::ExpenseStore;

const DEFAULT_QUERY_LIMIT: usize = 50;
const MAX_QUERY_LIMIT: usize = 500;

/// Arguments for adding an expense
#[derive(Debug, Clone, Deserialize)]
pub struct AddExpenseArgs {
    pub amount: f64,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    pub date: String,
}

/// Arguments for setting a budget limit
#[derive(Debug, Clone, Deserialize)]
pub struct SetBudgetArgs {
    pub amount: f64,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub month: Option<String>,
}

/// Arguments for querying stored expenses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryExpensesArgs {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Arguments for a budget status check
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetBudgetStatusArgs {
    #[serde(default)]
    pub category: Option<Category>,
}

/// A validated function call, ready to execute
#[derive(Debug, Clone)]
pub enum FunctionCall {
    AddExpense(AddExpenseArgs),
    SetBudget(SetBudgetArgs),
    QueryExpenses(QueryExpensesArgs),
    GetBudgetStatus(GetBudgetStatusArgs),
}

/// Shape of the model's reply
#[derive(Debug, Deserialize)]
struct RawFunctionCall {
    function: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl FunctionCall {
    /// Build from a function name and raw argument object
    ///
    /// Deserialization enforces types and the category set; the checks
    /// below cover the value constraints. Anything invalid comes back
    /// as `Error::Validation`.
    pub fn from_raw(function: &str, arguments: serde_json::Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::Validation(format!("{}: {}", function, e));
        match function {
            "add_expense" => {
                let args: AddExpenseArgs = serde_json::from_value(arguments).map_err(invalid)?;
                check_amount(args.amount)?;
                check_date(&args.date).map_err(|v| Error::Validation(v.to_string()))?;
                if let Some(ref description) = args.description {
                    if description.chars().count() > MAX_DESCRIPTION_LEN {
                        return Err(Error::Validation(format!(
                            "description: longer than {} characters",
                            MAX_DESCRIPTION_LEN
                        )));
                    }
                }
                Ok(Self::AddExpense(args))
            }
            "set_budget" => {
                let args: SetBudgetArgs = serde_json::from_value(arguments).map_err(invalid)?;
                check_amount(args.amount)?;
                if let Some(ref month) = args.month {
                    check_month(month)?;
                }
                Ok(Self::SetBudget(args))
            }
            "query_expenses" => {
                let args: QueryExpensesArgs = serde_json::from_value(arguments).map_err(invalid)?;
                for date in [&args.start_date, &args.end_date].into_iter().flatten() {
                    check_date(date).map_err(|v| Error::Validation(v.to_string()))?;
                }
                if let Some(limit) = args.limit {
                    if limit == 0 || limit > MAX_QUERY_LIMIT {
                        return Err(Error::Validation(format!(
                            "limit: must be between 1 and {}",
                            MAX_QUERY_LIMIT
                        )));
                    }
                }
                Ok(Self::QueryExpenses(args))
            }
            "get_budget_status" => {
                let args: GetBudgetStatusArgs =
                    serde_json::from_value(arguments).map_err(invalid)?;
                Ok(Self::GetBudgetStatus(args))
            }
            other => Err(Error::Validation(format!("Unknown function: {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddExpense(_) => "add_expense",
            Self::SetBudget(_) => "set_budget",
            Self::QueryExpenses(_) => "query_expenses",
            Self::GetBudgetStatus(_) => "get_budget_status",
        }
    }
}

/// What a function call produced
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionResult {
    ExpenseAdded {
        record: ExpenseRecord,
    },
    BudgetSet {
        limit: BudgetLimit,
    },
    Expenses {
        expenses: Vec<ExpenseRecord>,
        total: f64,
        count: usize,
    },
    BudgetStatus {
        statuses: Vec<BudgetStatus>,
    },
}

/// Outcome of an executed function call
#[derive(Debug, Clone, Serialize)]
pub struct FunctionReply {
    pub function: &'static str,
    pub message: String,
    pub result: FunctionResult,
}

/// Function calling over the configured text provider
#[derive(Clone)]
pub struct FunctionRouter {
    config: ProviderConfig,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl FunctionRouter {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Build with an embedded-only prompt library (no override dir)
    pub fn with_embedded_prompts(config: ProviderConfig) -> Self {
        Self {
            config,
            prompts: Arc::new(RwLock::new(PromptLibrary::embedded_only())),
        }
    }

    /// Identify and execute the function call in a message
    pub async fn handle<S: ExpenseStore + ?Sized>(
        &self,
        message: &str,
        owner: &str,
        store: &S,
    ) -> Result<FunctionReply> {
        let call = self.identify(message).await?;
        info!(function = call.name(), "Identified function call");
        self.execute(&call, owner, store).await
    }

    /// Ask the model which function the message maps onto
    pub async fn identify(&self, message: &str) -> Result<FunctionCall> {
        let provider = self.text_provider()?;
        let today = chrono::Local::now().date_naive().to_string();

        let prompt = {
            let mut prompts = self
                .prompts
                .write()
                .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
            let template = prompts.get(PromptId::IdentifyFunction)?;
            let mut vars = HashMap::new();
            vars.insert("message", message);
            vars.insert("today", today.as_str());
            template.render_user(&vars)
        };

        let reply = provider
            .generate(&prompt, None)
            .await
            .map_err(|e| Error::Extraction(format!("Function identification failed: {}", e)))?;
        let json = extract_json_object(&reply)
            .map_err(|_| Error::Extraction("No function call identified".into()))?;
        let raw: RawFunctionCall = serde_json::from_str(json)
            .map_err(|e| Error::Extraction(format!("Malformed function call: {}", e)))?;

        FunctionCall::from_raw(&raw.function, raw.arguments)
    }

    /// Run a validated call against the store
    pub async fn execute<S: ExpenseStore + ?Sized>(
        &self,
        call: &FunctionCall,
        owner: &str,
        store: &S,
    ) -> Result<FunctionReply> {
        match call {
            FunctionCall::AddExpense(args) => add_expense(owner, args, store).await,
            FunctionCall::SetBudget(args) => set_budget(owner, args, store).await,
            FunctionCall::QueryExpenses(args) => query_expenses(owner, args, store).await,
            FunctionCall::GetBudgetStatus(args) => get_budget_status(owner, args, store).await,
        }
    }

    fn text_provider(&self) -> Result<&ProviderClient> {
        self.config
            .text
            .as_ref()
            .ok_or_else(|| Error::InvalidData("No text provider configured".into()))
    }
}

async fn add_expense<S: ExpenseStore + ?Sized>(
    owner: &str,
    args: &AddExpenseArgs,
    store: &S,
) -> Result<FunctionReply> {
    let date = check_date(&args.date).map_err(|v| Error::Validation(v.to_string()))?;
    let record = ExpenseRecord {
        amount: args.amount,
        category: args.category,
        description: args
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("Expense")
            .to_string(),
        date,
        merchant: None,
    };
    store.create_expense(owner, &record).await?;

    Ok(FunctionReply {
        function: "add_expense",
        message: format!("Added {} expense: ${:.2}", record.category, record.amount),
        result: FunctionResult::ExpenseAdded { record },
    })
}

async fn set_budget<S: ExpenseStore + ?Sized>(
    owner: &str,
    args: &SetBudgetArgs,
    store: &S,
) -> Result<FunctionReply> {
    let limit = BudgetLimit {
        monthly_limit: args.amount,
        category: args.category,
        month: args.month.clone().unwrap_or_else(current_month),
    };
    store.set_budget(owner, &limit).await?;

    let scope = limit.category.map(|c| c.as_str()).unwrap_or("total");
    Ok(FunctionReply {
        function: "set_budget",
        message: format!("Set {} budget to ${:.2}", scope, limit.monthly_limit),
        result: FunctionResult::BudgetSet { limit },
    })
}

async fn query_expenses<S: ExpenseStore + ?Sized>(
    owner: &str,
    args: &QueryExpensesArgs,
    store: &S,
) -> Result<FunctionReply> {
    let start = parse_filter_date(args.start_date.as_deref())?;
    let end = parse_filter_date(args.end_date.as_deref())?;
    let limit = args.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

    let mut expenses: Vec<ExpenseRecord> = store
        .list_expenses(owner)
        .await?
        .into_iter()
        .filter(|e| args.category.is_none_or(|c| e.category == c))
        .filter(|e| start.is_none_or(|s| e.date >= s))
        .filter(|e| end.is_none_or(|d| e.date <= d))
        .collect();
    expenses.truncate(limit);

    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    let count = expenses.len();
    Ok(FunctionReply {
        function: "query_expenses",
        message: format!("Found {} expenses", count),
        result: FunctionResult::Expenses {
            expenses,
            total,
            count,
        },
    })
}

async fn get_budget_status<S: ExpenseStore + ?Sized>(
    owner: &str,
    args: &GetBudgetStatusArgs,
    store: &S,
) -> Result<FunctionReply> {
    let month = current_month();
    let budgets = store.list_budgets(owner).await?;
    let expenses = store.list_expenses(owner).await?;

    // Report the requested scope, or every scope with a limit this
    // month: total first, then categories in their fixed order.
    let scopes: Vec<Option<Category>> = match args.category {
        Some(c) => vec![Some(c)],
        None => std::iter::once(None)
            .chain(Category::ALL.into_iter().map(Some))
            .collect(),
    };

    let statuses: Vec<BudgetStatus> = scopes
        .into_iter()
        .filter_map(|scope| {
            let monthly_limit = latest_limit(&budgets, &month, scope)?;
            let spent: f64 = expenses
                .iter()
                .filter(|e| e.date.format("%Y-%m").to_string() == month)
                .filter(|e| scope.is_none_or(|c| e.category == c))
                .map(|e| e.amount)
                .sum();
            Some(BudgetStatus {
                category: scope,
                monthly_limit,
                spent,
                remaining: monthly_limit - spent,
            })
        })
        .collect();

    let message = if statuses.is_empty() {
        format!("No budget set for {}", month)
    } else {
        "Budget status retrieved".to_string()
    };
    Ok(FunctionReply {
        function: "get_budget_status",
        message,
        result: FunctionResult::BudgetStatus { statuses },
    })
}

/// Most recently stored limit for a scope and month
fn latest_limit(budgets: &[BudgetLimit], month: &str, category: Option<Category>) -> Option<f64> {
    budgets
        .iter()
        .rev()
        .find(|b| b.month == month && b.category == category)
        .map(|b| b.monthly_limit)
}

fn parse_filter_date(date: Option<&str>) -> Result<Option<NaiveDate>> {
    date.map(|d| check_date(d).map_err(|v| Error::Validation(v.to_string())))
        .transpose()
}

fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::Validation(format!(
            "amount: must be non-negative, got {}",
            amount
        )));
    }
    Ok(())
}

fn check_month(month: &str) -> Result<()> {
    let valid = month.len() == 7
        && NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok();
    if !valid {
        return Err(Error::Validation(format!(
            "month: '{}' is not YYYY-MM",
            month
        )));
    }
    Ok(())
}

fn current_month() -> String {
    chrono::Local::now().format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn router_with(text: MockProvider) -> FunctionRouter {
        FunctionRouter::with_embedded_prompts(ProviderConfig {
            text: Some(ProviderClient::Mock(text)),
            vision: None,
            ocr: None,
        })
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    #[test]
    fn test_unknown_function_rejected() {
        let err = FunctionCall::from_raw("delete_everything", json!({})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_add_expense_args_validated() {
        let valid = json!({"amount": 25.0, "category": "Food", "date": "2026-02-17"});
        assert!(matches!(
            FunctionCall::from_raw("add_expense", valid).unwrap(),
            FunctionCall::AddExpense(_)
        ));

        let bad_category = json!({"amount": 25.0, "category": "Groceries", "date": "2026-02-17"});
        assert!(FunctionCall::from_raw("add_expense", bad_category).is_err());

        let negative = json!({"amount": -1.0, "category": "Food", "date": "2026-02-17"});
        assert!(FunctionCall::from_raw("add_expense", negative).is_err());

        let bad_date = json!({"amount": 25.0, "category": "Food", "date": "02/17/2026"});
        assert!(FunctionCall::from_raw("add_expense", bad_date).is_err());

        let missing_amount = json!({"category": "Food", "date": "2026-02-17"});
        assert!(FunctionCall::from_raw("add_expense", missing_amount).is_err());
    }

    #[test]
    fn test_query_limit_bounds() {
        assert!(FunctionCall::from_raw("query_expenses", json!({"limit": 0})).is_err());
        assert!(FunctionCall::from_raw("query_expenses", json!({"limit": 501})).is_err());
        assert!(FunctionCall::from_raw("query_expenses", json!({"limit": 500})).is_ok());
        assert!(FunctionCall::from_raw("query_expenses", json!({})).is_ok());
    }

    #[test]
    fn test_set_budget_month_pattern() {
        assert!(FunctionCall::from_raw("set_budget", json!({"amount": 100, "month": "2026-02"}))
            .is_ok());
        assert!(FunctionCall::from_raw("set_budget", json!({"amount": 100, "month": "Feb 2026"}))
            .is_err());
        assert!(FunctionCall::from_raw("set_budget", json!({"amount": 100, "month": "2026-13"}))
            .is_err());
    }

    #[tokio::test]
    async fn test_identify_scrapes_surrounding_prose() {
        let mock = MockProvider::new();
        mock.push_reply(
            r#"Sure! {"function": "add_expense", "arguments": {"amount": 25.0, "category": "Food", "description": "Dinner", "date": "2026-02-17"}}"#,
        );
        let call = router_with(mock).identify("Add a $25 dinner").await.unwrap();
        assert_eq!(call.name(), "add_expense");
    }

    #[tokio::test]
    async fn test_identify_without_json_is_extraction_error() {
        let mock = MockProvider::new();
        mock.push_reply("I'm not sure what you want me to do.");
        let err = router_with(mock).identify("???").await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn test_handle_add_expense_persists_record() {
        let mock = MockProvider::new();
        mock.push_reply(
            r#"{"function": "add_expense", "arguments": {"amount": 25.0, "category": "Food", "description": "Dinner at Italian restaurant", "date": "2026-02-17"}}"#,
        );
        let store = MemoryStore::new();

        let reply = router_with(mock)
            .handle("Add a $25 expense for dinner", "alice", &store)
            .await
            .unwrap();

        assert_eq!(reply.function, "add_expense");
        assert!(reply.message.contains("$25.00"));
        let stored = store.list_expenses("alice").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].amount, 25.0);
        assert_eq!(stored[0].category, Category::Food);
    }

    #[tokio::test]
    async fn test_query_filters_by_category_and_date() {
        let store = MemoryStore::new();
        let base = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        for (i, category) in [Category::Food, Category::Food, Category::Bills]
            .into_iter()
            .enumerate()
        {
            let record = ExpenseRecord {
                amount: 10.0 + i as f64,
                category,
                description: "entry".into(),
                date: base + chrono::Duration::days(i as i64),
                merchant: None,
            };
            store.create_expense("alice", &record).await.unwrap();
        }

        let router = router_with(MockProvider::new());
        let call = FunctionCall::from_raw(
            "query_expenses",
            json!({"category": "Food", "start_date": "2026-02-11"}),
        )
        .unwrap();
        let reply = router.execute(&call, "alice", &store).await.unwrap();

        match reply.result {
            FunctionResult::Expenses {
                expenses,
                total,
                count,
            } => {
                assert_eq!(count, 1);
                assert_eq!(expenses[0].amount, 11.0);
                assert_eq!(total, 11.0);
            }
            other => panic!("expected Expenses, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_budget_status_math() {
        let store = MemoryStore::new();
        let router = router_with(MockProvider::new());

        let set_total = FunctionCall::from_raw("set_budget", json!({"amount": 2000.0})).unwrap();
        let set_food =
            FunctionCall::from_raw("set_budget", json!({"amount": 400.0, "category": "Food"}))
                .unwrap();
        router.execute(&set_total, "alice", &store).await.unwrap();
        router.execute(&set_food, "alice", &store).await.unwrap();

        // One Food expense this month, one Bills expense last year
        store
            .create_expense(
                "alice",
                &ExpenseRecord {
                    amount: 150.0,
                    category: Category::Food,
                    description: "Groceries".into(),
                    date: today(),
                    merchant: None,
                },
            )
            .await
            .unwrap();
        store
            .create_expense(
                "alice",
                &ExpenseRecord {
                    amount: 999.0,
                    category: Category::Bills,
                    description: "Old bill".into(),
                    date: NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
                    merchant: None,
                },
            )
            .await
            .unwrap();

        let status = FunctionCall::from_raw("get_budget_status", json!({})).unwrap();
        let reply = router.execute(&status, "alice", &store).await.unwrap();
        match reply.result {
            FunctionResult::BudgetStatus { statuses } => {
                assert_eq!(statuses.len(), 2);
                assert_eq!(statuses[0].category, None);
                assert_eq!(statuses[0].spent, 150.0);
                assert_eq!(statuses[0].remaining, 1850.0);
                assert_eq!(statuses[1].category, Some(Category::Food));
                assert_eq!(statuses[1].remaining, 250.0);
            }
            other => panic!("expected BudgetStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_budget_status_without_budgets() {
        let store = MemoryStore::new();
        let router = router_with(MockProvider::new());
        let status = FunctionCall::from_raw("get_budget_status", json!({})).unwrap();
        let reply = router.execute(&status, "alice", &store).await.unwrap();
        assert!(reply.message.contains("No budget set"));
        match reply.result {
            FunctionResult::BudgetStatus { statuses } => assert!(statuses.is_empty()),
            other => panic!("expected BudgetStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_latest_budget_limit_wins() {
        let store = MemoryStore::new();
        let router = router_with(MockProvider::new());
        for amount in [1000.0, 2500.0] {
            let call = FunctionCall::from_raw("set_budget", json!({ "amount": amount })).unwrap();
            router.execute(&call, "alice", &store).await.unwrap();
        }

        let status = FunctionCall::from_raw("get_budget_status", json!({})).unwrap();
        let reply = router.execute(&status, "alice", &store).await.unwrap();
        match reply.result {
            FunctionResult::BudgetStatus { statuses } => {
                assert_eq!(statuses[0].monthly_limit, 2500.0);
            }
            other => panic!("expected BudgetStatus, got {:?}", other),
        }
    }
}
