use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::order::{Order, OrderId, Status};

// ============================================================================
// Order Store - Persistence Layer
// ============================================================================
//
// Durable storage for orders and their append-only status history. The
// contract every backend must honor: record_transition applies the scalar
// update and the history append inside ONE atomic unit of work. Partial
// application is the single disallowed failure mode, because it breaks the
// cross-representation invariant with no compensating signal.
//
// ============================================================================

pub mod memory;
pub mod sqlite;

pub use memory::MemoryOrderStore;
pub use sqlite::SqliteOrderStore;

/// One append-only status history row.
///
/// Rows are never mutated or individually deleted; they only go away when
/// the owning order is deleted (cascade). The id is assigned in insertion
/// order and breaks recency ties between identical timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// Errors surfaced by storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation referenced an order that does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The scalar and the latest history row disagree. Only observable if a
    /// backend broke the atomicity contract; unrecoverable when it happens.
    #[error("order {order_id}: current status {scalar} disagrees with latest history {derived:?}")]
    InvariantViolation {
        order_id: OrderId,
        scalar: Status,
        derived: Option<Status>,
    },

    /// Opaque storage-layer fault, propagated unchanged. Retry policy
    /// belongs to the caller.
    #[error("storage backend fault: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Trait defining the interface storage backends must implement.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order row with the default Pending scalar and no
    /// history. Returns the system-assigned identifier.
    async fn insert_order(&self) -> Result<OrderId, StoreError>;

    /// Fetch one order by id.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Apply one status transition: rewrite the scalar, then append the
    /// history row, inside a single atomic unit of work.
    async fn record_transition(
        &self,
        id: OrderId,
        status: Status,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete an order, cascading to its history rows.
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError>;

    /// Full history for one order, ascending by (created_at, id).
    async fn history(&self, id: OrderId) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Denormalized-scalar query primitive: equality filter on the status
    /// column, ids ascending. Backed by an index on the scalar.
    async fn ids_by_current_status(&self, status: Status) -> Result<Vec<OrderId>, StoreError>;

    /// Derived-latest query primitive: newest history row per order by
    /// (created_at, id), filtered on the legacy label, ids ascending.
    /// Orders without history derive the construction default, Pending,
    /// so they match that target and no other. Must run as one
    /// bounded-cost pass or query, never one round trip per order.
    async fn ids_by_latest_history(&self, status: Status) -> Result<Vec<OrderId>, StoreError>;

    /// Number of order rows currently stored.
    async fn count_orders(&self) -> Result<u64, StoreError>;
}
