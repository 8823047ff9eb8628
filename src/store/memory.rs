use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::order::{Order, OrderId, Status};

use super::{HistoryRecord, OrderStore, StoreError};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// Table layout mirrors the relational backend: an order map keyed by id
// holding the numeric scalar, an append-only history vector holding the
// legacy text labels, and a maintained status index (code -> ordered id
// set) standing in for the database index the scalar strategy relies on.
//
// The write lock is the atomic unit of work: scalar update, history append
// and index maintenance all happen under one guard, so readers never
// observe the two representations mid-disagreement.
//
// ============================================================================

#[derive(Debug, Clone)]
struct HistoryRow {
    id: i64,
    order_id: OrderId,
    // Legacy textual domain, exactly as a relational history table stores it
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    next_order_id: i64,
    next_history_id: i64,
    orders: BTreeMap<OrderId, i16>,
    history: Vec<HistoryRow>,
    status_index: HashMap<i16, BTreeSet<OrderId>>,
}

#[derive(Default)]
pub struct MemoryOrderStore {
    tables: RwLock<Tables>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: rewrite the scalar without touching history, breaking the
    /// atomicity contract on purpose so invariant detection can be tested.
    #[cfg(test)]
    pub(crate) async fn corrupt_scalar(&self, id: OrderId, status: Status) {
        let mut tables = self.tables.write().await;
        if let Some(code) = tables.orders.get(&id).copied() {
            tables.status_index.entry(code).or_default().remove(&id);
            tables.orders.insert(id, status.code());
            tables.status_index.entry(status.code()).or_default().insert(id);
        }
    }
}

fn parse_label(label: &str) -> Result<Status, StoreError> {
    Status::from_label(label)
        .ok_or_else(|| StoreError::Backend(format!("unknown status label in history: {label:?}")))
}

fn parse_code(code: i16) -> Result<Status, StoreError> {
    Status::from_code(code)
        .ok_or_else(|| StoreError::Backend(format!("unknown status code in order row: {code}")))
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert_order(&self) -> Result<OrderId, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_order_id += 1;
        let id = OrderId(tables.next_order_id);

        let code = Status::Pending.code();
        tables.orders.insert(id, code);
        tables.status_index.entry(code).or_default().insert(id);
        Ok(id)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let tables = self.tables.read().await;
        match tables.orders.get(&id) {
            Some(code) => Ok(Some(Order {
                id,
                status: parse_code(*code)?,
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
        let mut tables = self.tables.write().await;

        let old_code = match tables.orders.get(&id) {
            Some(code) => *code,
            None => return Err(StoreError::NotFound(id)),
        };

        // Scalar first (the hot read path), then the history append; both
        // under the same write guard.
        let new_code = status.code();
        tables.orders.insert(id, new_code);
        tables.status_index.entry(old_code).or_default().remove(&id);
        tables.status_index.entry(new_code).or_default().insert(id);

        tables.next_history_id += 1;
        let row = HistoryRow {
            id: tables.next_history_id,
            order_id: id,
            status: status.label().to_string(),
            created_at: occurred_at,
        };
        tables.history.push(row);

        tracing::trace!(order_id = %id, status = status.label(), "Recorded transition");
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let code = match tables.orders.remove(&id) {
            Some(code) => code,
            None => return Err(StoreError::NotFound(id)),
        };
        tables.status_index.entry(code).or_default().remove(&id);
        // Cascade: history rows go away with their owner
        tables.history.retain(|row| row.order_id != id);
        Ok(())
    }

    async fn history(&self, id: OrderId) -> Result<Vec<HistoryRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut records = Vec::new();
        for row in tables.history.iter().filter(|row| row.order_id == id) {
            records.push(HistoryRecord {
                id: row.id,
                order_id: row.order_id,
                status: parse_label(&row.status)?,
                created_at: row.created_at,
            });
        }
        records.sort_by_key(|record| (record.created_at, record.id));
        Ok(records)
    }

    async fn ids_by_current_status(&self, status: Status) -> Result<Vec<OrderId>, StoreError> {
        let tables = self.tables.read().await;
        // BTreeSet iteration is already ascending by id
        Ok(tables
            .status_index
            .get(&status.code())
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn ids_by_latest_history(&self, status: Status) -> Result<Vec<OrderId>, StoreError> {
        let tables = self.tables.read().await;

        // Single grouping pass: keep the max (created_at, id) row per order.
        let mut latest: HashMap<OrderId, &HistoryRow> = HashMap::new();
        for row in &tables.history {
            match latest.entry(row.order_id) {
                Entry::Occupied(mut slot) => {
                    let current = *slot.get();
                    if (row.created_at, row.id) > (current.created_at, current.id) {
                        slot.insert(row);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
        }

        // Orders with no history derive the construction default, Pending.
        // BTreeMap iteration keeps the ids ascending.
        let wanted = status.label();
        let default_matches = status == Status::Pending;
        let ids: Vec<OrderId> = tables
            .orders
            .keys()
            .filter(|id| match latest.get(*id) {
                Some(row) => row.status == wanted,
                None => default_matches,
            })
            .copied()
            .collect();
        Ok(ids)
    }

    async fn count_orders(&self) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.len() as u64)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
