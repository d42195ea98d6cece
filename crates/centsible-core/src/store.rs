//! Expense and budget persistence
//!
//! Only schema-valid records reach a store; validation lives entirely
//! in the pipeline. `JsonlStore` appends one JSON line per entry to a
//! per-owner file, `MemoryStore` backs tests and ephemeral use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{BudgetLimit, ExpenseRecord};

/// Storage backend for validated expense records and budget limits
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Append a record under an owner key
    async fn create_expense(&self, owner: &str, record: &ExpenseRecord) -> Result<()>;

    /// All records for an owner, in insertion order
    async fn list_expenses(&self, owner: &str) -> Result<Vec<ExpenseRecord>>;

    /// Append a budget limit under an owner key
    async fn set_budget(&self, owner: &str, limit: &BudgetLimit) -> Result<()>;

    /// All budget limits for an owner, in insertion order
    async fn list_budgets(&self, owner: &str) -> Result<Vec<BudgetLimit>>;
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Vec<ExpenseRecord>>>>,
    budgets: Arc<Mutex<HashMap<String, Vec<BudgetLimit>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn create_expense(&self, owner: &str, record: &ExpenseRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::InvalidData("Store lock poisoned".into()))?;
        records
            .entry(owner.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn list_expenses(&self, owner: &str) -> Result<Vec<ExpenseRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::InvalidData("Store lock poisoned".into()))?;
        Ok(records.get(owner).cloned().unwrap_or_default())
    }

    async fn set_budget(&self, owner: &str, limit: &BudgetLimit) -> Result<()> {
        let mut budgets = self
            .budgets
            .lock()
            .map_err(|_| Error::InvalidData("Store lock poisoned".into()))?;
        budgets
            .entry(owner.to_string())
            .or_default()
            .push(limit.clone());
        Ok(())
    }

    async fn list_budgets(&self, owner: &str) -> Result<Vec<BudgetLimit>> {
        let budgets = self
            .budgets
            .lock()
            .map_err(|_| Error::InvalidData("Store lock poisoned".into()))?;
        Ok(budgets.get(owner).cloned().unwrap_or_default())
    }
}

/// Append-only JSON-lines store, one expense file and one budget file
/// per owner
#[derive(Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the platform data dir (~/.local/share/centsible/expenses)
    pub fn default_location() -> Option<Self> {
        dirs::data_local_dir().map(|d| Self::new(d.join("centsible").join("expenses")))
    }

    fn owner_path(&self, owner: &str, suffix: &str) -> Result<PathBuf> {
        // Owner keys become file names; keep them path-safe
        if owner.is_empty()
            || !owner
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            return Err(Error::InvalidData(format!("Invalid owner key: {:?}", owner)));
        }
        Ok(self.dir.join(format!("{}.{}", owner, suffix)))
    }

    async fn append_line<T: Serialize>(&self, path: &PathBuf, entry: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn read_lines<T: DeserializeOwned>(&self, path: &PathBuf) -> Result<Vec<T>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Error::Json))
            .collect()
    }
}

#[async_trait]
impl ExpenseStore for JsonlStore {
    async fn create_expense(&self, owner: &str, record: &ExpenseRecord) -> Result<()> {
        let path = self.owner_path(owner, "jsonl")?;
        self.append_line(&path, record).await?;
        debug!(owner, path = %path.display(), "Appended expense record");
        Ok(())
    }

    async fn list_expenses(&self, owner: &str) -> Result<Vec<ExpenseRecord>> {
        let path = self.owner_path(owner, "jsonl")?;
        self.read_lines(&path).await
    }

    async fn set_budget(&self, owner: &str, limit: &BudgetLimit) -> Result<()> {
        let path = self.owner_path(owner, "budgets.jsonl")?;
        self.append_line(&path, limit).await?;
        debug!(owner, path = %path.display(), "Appended budget limit");
        Ok(())
    }

    async fn list_budgets(&self, owner: &str) -> Result<Vec<BudgetLimit>> {
        let path = self.owner_path(owner, "budgets.jsonl")?;
        self.read_lines(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::NaiveDate;

    fn record(amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            amount,
            category: Category::Food,
            description: "Lunch".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 17).unwrap(),
            merchant: None,
        }
    }

    fn limit(monthly_limit: f64, category: Option<Category>) -> BudgetLimit {
        BudgetLimit {
            monthly_limit,
            category,
            month: "2026-02".into(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store.create_expense("alice", &record(1.0)).await.unwrap();
        store.create_expense("alice", &record(2.0)).await.unwrap();
        store.create_expense("bob", &record(3.0)).await.unwrap();

        let alice = store.list_expenses("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[1].amount, 2.0);
        assert_eq!(store.list_expenses("carol").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_budgets() {
        let store = MemoryStore::new();
        store.set_budget("alice", &limit(2000.0, None)).await.unwrap();
        store
            .set_budget("alice", &limit(400.0, Some(Category::Food)))
            .await
            .unwrap();

        let budgets = store.list_budgets("alice").await.unwrap();
        assert_eq!(budgets.len(), 2);
        assert_eq!(budgets[0].category, None);
        assert_eq!(budgets[1].monthly_limit, 400.0);
        assert!(store.list_budgets("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jsonl_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());
        store.create_expense("alice", &record(9.5)).await.unwrap();
        store.create_expense("alice", &record(4.25)).await.unwrap();

        let loaded = store.list_expenses("alice").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].amount, 9.5);
        assert_eq!(loaded[1].amount, 4.25);
    }

    #[tokio::test]
    async fn test_jsonl_budgets_kept_apart_from_expenses() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());
        store.create_expense("alice", &record(9.5)).await.unwrap();
        store.set_budget("alice", &limit(1500.0, None)).await.unwrap();

        assert_eq!(store.list_expenses("alice").await.unwrap().len(), 1);
        let budgets = store.list_budgets("alice").await.unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].monthly_limit, 1500.0);
    }

    #[tokio::test]
    async fn test_jsonl_missing_owner_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());
        assert!(store.list_expenses("nobody").await.unwrap().is_empty());
        assert!(store.list_budgets("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jsonl_rejects_unsafe_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path());
        assert!(store.create_expense("../evil", &record(1.0)).await.is_err());
        assert!(store.create_expense("", &record(1.0)).await.is_err());
    }
}
