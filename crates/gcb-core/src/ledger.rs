//! Durable "already sent" set of code identifiers.
//!
//! The ledger is a membership set only: one row per delivered code, inserted
//! after the delivery succeeded, never updated or deleted.

use std::{collections::HashSet, future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::{any::AnyPoolOptions, AnyPool};
use tokio::sync::Mutex;

use crate::{errors::Error, Result};

/// What `record` did. Both variants are success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    AlreadyRecorded,
}

/// Port for the sent-codes ledger.
///
/// Store failures surface as `Error::StoreUnavailable`. A duplicate `record`
/// is never an error.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Create the backing table/set if it does not exist yet. Idempotent.
    async fn init(&self) -> Result<()>;

    async fn exists(&self, code: &str) -> Result<bool>;

    async fn record(&self, code: &str) -> Result<RecordOutcome>;

    /// Number of recorded codes.
    async fn recorded_count(&self) -> Result<u64>;
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS sent_codes (code TEXT PRIMARY KEY)";
const SELECT_CODE: &str = "SELECT 1 FROM sent_codes WHERE code = $1";
const INSERT_CODE: &str = "INSERT INTO sent_codes (code) VALUES ($1) ON CONFLICT DO NOTHING";
const COUNT_CODES: &str = "SELECT COUNT(*) FROM sent_codes";

/// SQL-backed ledger over `sqlx`'s `Any` driver.
///
/// Accepts `postgres://` and `sqlite:` connection strings. Uniqueness comes
/// from the primary key, so concurrent writers need no extra locking.
#[derive(Clone, Debug)]
pub struct SqlLedger {
    pool: AnyPool,
    timeout: Duration,
}

impl SqlLedger {
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await?;

        Ok(Self::from_pool(pool, timeout))
    }

    pub fn from_pool(pool: AnyPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::StoreUnavailable(format!(
                "{op} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl Ledger for SqlLedger {
    async fn init(&self) -> Result<()> {
        self.bounded("init", async {
            sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    async fn exists(&self, code: &str) -> Result<bool> {
        self.bounded("exists", async {
            let row = sqlx::query(SELECT_CODE)
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.is_some())
        })
        .await
    }

    async fn record(&self, code: &str) -> Result<RecordOutcome> {
        self.bounded("record", async {
            let res = sqlx::query(INSERT_CODE)
                .bind(code)
                .execute(&self.pool)
                .await?;
            Ok(if res.rows_affected() == 0 {
                RecordOutcome::AlreadyRecorded
            } else {
                RecordOutcome::Inserted
            })
        })
        .await
    }

    async fn recorded_count(&self) -> Result<u64> {
        self.bounded("count", async {
            let n: i64 = sqlx::query_scalar(COUNT_CODES)
                .fetch_one(&self.pool)
                .await?;
            Ok(n.max(0) as u64)
        })
        .await
    }
}

/// In-process ledger. Not durable; for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    codes: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<String> {
        let mut out = self.codes.lock().await.iter().cloned().collect::<Vec<_>>();
        out.sort();
        out
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, code: &str) -> Result<bool> {
        Ok(self.codes.lock().await.contains(code))
    }

    async fn record(&self, code: &str) -> Result<RecordOutcome> {
        let inserted = self.codes.lock().await.insert(code.to_string());
        Ok(if inserted {
            RecordOutcome::Inserted
        } else {
            RecordOutcome::AlreadyRecorded
        })
    }

    async fn recorded_count(&self) -> Result<u64> {
        Ok(self.codes.lock().await.len() as u64)
    }
}
