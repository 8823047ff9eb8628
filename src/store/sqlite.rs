use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::domain::order::{Order, OrderId, Status};

use super::{HistoryRecord, OrderStore, StoreError};

// ============================================================================
// SQLite Order Store
// ============================================================================
//
// Relational backend over sqlx. Two tables, matching the dual model:
// - orders: id + numeric status scalar, with an index on status so the
//   denormalized-scalar strategy is an indexed equality scan
// - order_status_history: append-only rows in the legacy textual domain,
//   FK to orders with ON DELETE CASCADE
//
// record_transition runs both writes inside one database transaction; the
// derived-latest strategy is a single window-function query, never one
// round trip per order.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        status INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS index_by_status ON orders (status)",
    "CREATE TABLE IF NOT EXISTS order_status_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS index_history_by_order ON order_status_history (order_id)",
];

// Newest history row per order by (created_at, id), filtered on the legacy
// label; orders with no history fall back to the default label through the
// COALESCE. created_at is stored as fixed-width RFC 3339 UTC, so text
// ordering is chronological ordering.
const DERIVED_LATEST_SQL: &str = "
    SELECT o.id
    FROM orders AS o
    LEFT JOIN (
        SELECT order_id, status,
               ROW_NUMBER() OVER (
                   PARTITION BY order_id
                   ORDER BY created_at DESC, id DESC
               ) AS recency
        FROM order_status_history
    ) AS ranked ON ranked.order_id = o.id AND ranked.recency = 1
    WHERE COALESCE(ranked.status, ?) = ?
    ORDER BY o.id ASC
";

pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    /// Connect and make sure the schema exists. URLs like `sqlite::memory:`
    /// or `sqlite://orders.db` are accepted.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            // Cascade deletes depend on FK enforcement being on
            .foreign_keys(true);

        // Single connection: an in-memory database exists per connection,
        // and the schema must stay visible across every call.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    // Fixed width keeps lexicographic order == chronological order
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StoreError::Backend(format!("bad created_at {raw:?}: {err}")))
}

fn decode_status_code(code: i64) -> Result<Status, StoreError> {
    Status::from_code(code as i16)
        .ok_or_else(|| StoreError::Backend(format!("unknown status code in order row: {code}")))
}

fn decode_status_label(label: &str) -> Result<Status, StoreError> {
    Status::from_label(label)
        .ok_or_else(|| StoreError::Backend(format!("unknown status label in history: {label:?}")))
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn insert_order(&self) -> Result<OrderId, StoreError> {
        let result = sqlx::query("INSERT INTO orders (status) VALUES (?)")
            .bind(Status::Pending.code() as i64)
            .execute(&self.pool)
            .await?;
        Ok(OrderId(result.last_insert_rowid()))
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT id, status FROM orders WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((order_id, code)) => Ok(Some(Order {
                id: OrderId(order_id),
                status: decode_status_code(code)?,
            })),
            None => Ok(None),
        }
    }

    async fn record_transition(
        &self,
        id: OrderId,
        status: Status,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Scalar first (the hot read path), history append second; commit
        // makes them visible together or not at all.
        let updated = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.code() as i64)
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls back the (empty) update
            return Err(StoreError::NotFound(id));
        }

        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, created_at) VALUES (?, ?, ?)",
        )
        .bind(id.0)
        .bind(status.label())
        .bind(encode_timestamp(occurred_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::trace!(order_id = %id, status = status.label(), "Recorded transition");
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn history(&self, id: OrderId) -> Result<Vec<HistoryRecord>, StoreError> {
        let rows: Vec<(i64, i64, String, String)> = sqlx::query_as(
            "SELECT id, order_id, status, created_at
             FROM order_status_history
             WHERE order_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (row_id, order_id, label, created_at) in rows {
            records.push(HistoryRecord {
                id: row_id,
                order_id: OrderId(order_id),
                status: decode_status_label(&label)?,
                created_at: decode_timestamp(&created_at)?,
            });
        }
        Ok(records)
    }

    async fn ids_by_current_status(&self, status: Status) -> Result<Vec<OrderId>, StoreError> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM orders WHERE status = ? ORDER BY id ASC")
                .bind(status.code() as i64)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(OrderId).collect())
    }

    async fn ids_by_latest_history(&self, status: Status) -> Result<Vec<OrderId>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar(DERIVED_LATEST_SQL)
            .bind(Status::Pending.label())
            .bind(status.label())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(OrderId).collect())
    }

    async fn count_orders(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
