use std::sync::Arc;

use crate::domain::order::{OrderId, Status};
use crate::store::{OrderStore, StoreError};

// ============================================================================
// Query Engine - Two Strategies, One Contract
// ============================================================================
//
// Given a target status, return the orders whose current status equals it,
// ordered by id ascending. Callers compare result sets across strategies,
// so the ordering is part of the contract.
//
// DerivedLatest reconstructs "current" from the newest history row per
// order; DenormalizedScalar reads the maintained column. On any dataset
// built through the write path the two must agree.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStrategy {
    /// Newest history row per order by (created_at, id), then filter.
    /// Deliberately the expensive path, kept for audit and for readers
    /// that have not migrated to the scalar.
    DerivedLatest,
    /// Indexed equality filter on the maintained current-status column.
    DenormalizedScalar,
}

pub struct OrderQueries {
    store: Arc<dyn OrderStore>,
}

impl OrderQueries {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Orders currently in `target`, ids ascending.
    pub async fn by_status(
        &self,
        target: Status,
        strategy: QueryStrategy,
    ) -> Result<Vec<OrderId>, StoreError> {
        let ids = match strategy {
            QueryStrategy::DerivedLatest => self.store.ids_by_latest_history(target).await?,
            QueryStrategy::DenormalizedScalar => self.store.ids_by_current_status(target).await?,
        };
        tracing::debug!(
            target = target.label(),
            ?strategy,
            matched = ids.len(),
            "Status query"
        );
        Ok(ids)
    }

    /// Audit the cross-representation invariant for one order: the scalar
    /// must equal the newest history row's status, or Pending when no
    /// history exists. A disagreement means a backend broke the atomic
    /// unit of work; it is surfaced, never swallowed.
    pub async fn verify_consistency(&self, id: OrderId) -> Result<(), StoreError> {
        let order = self
            .store
            .fetch_order(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let derived = self.store.history(id).await?.last().map(|row| row.status);

        let consistent = match derived {
            Some(latest) => latest == order.status,
            None => order.status == Status::Pending,
        };
        if consistent {
            Ok(())
        } else {
            tracing::error!(
                order_id = %id,
                scalar = order.status.label(),
                ?derived,
                "Status invariant violated"
            );
            Err(StoreError::InvariantViolation {
                order_id: id,
                scalar: order.status,
                derived,
            })
        }
    }
}

// ============================================================================
// Property Tests - run against both backends
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderCommandHandler;
    use crate::store::{MemoryOrderStore, SqliteOrderStore};

    fn memory() -> Arc<dyn OrderStore> {
        Arc::new(MemoryOrderStore::new())
    }

    async fn sqlite() -> Arc<dyn OrderStore> {
        Arc::new(SqliteOrderStore::in_memory().await.unwrap())
    }

    async fn assert_strategies_agree(queries: &OrderQueries) {
        for target in Status::ALL {
            let derived = queries
                .by_status(target, QueryStrategy::DerivedLatest)
                .await
                .unwrap();
            let scalar = queries
                .by_status(target, QueryStrategy::DenormalizedScalar)
                .await
                .unwrap();
            assert_eq!(derived, scalar, "strategies disagree on {target}");
        }
    }

    /// Three orders: A cancel -> complete, B cancel, C complete -> cancel.
    async fn run_concrete_scenario(store: Arc<dyn OrderStore>) {
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store);

        let a = handler.create_order().await.unwrap();
        let b = handler.create_order().await.unwrap();
        let c = handler.create_order().await.unwrap();

        handler.cancel_order(a).await.unwrap();
        handler.complete_order(a).await.unwrap();
        handler.cancel_order(b).await.unwrap();
        handler.complete_order(c).await.unwrap();
        handler.cancel_order(c).await.unwrap();

        for strategy in [QueryStrategy::DerivedLatest, QueryStrategy::DenormalizedScalar] {
            assert_eq!(
                queries.by_status(Status::Cancelled, strategy).await.unwrap(),
                vec![b, c]
            );
            assert_eq!(
                queries.by_status(Status::Complete, strategy).await.unwrap(),
                vec![a]
            );
        }
        assert_strategies_agree(&queries).await;
    }

    #[tokio::test]
    async fn test_concrete_scenario_on_memory() {
        run_concrete_scenario(memory()).await;
    }

    #[tokio::test]
    async fn test_concrete_scenario_on_sqlite() {
        run_concrete_scenario(sqlite().await).await;
    }

    /// Untransitioned orders show up under Pending with both strategies,
    /// and nowhere else.
    async fn run_default_status(store: Arc<dyn OrderStore>) {
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store);

        let untouched = handler.create_order().await.unwrap();

        for strategy in [QueryStrategy::DerivedLatest, QueryStrategy::DenormalizedScalar] {
            assert_eq!(
                queries.by_status(Status::Pending, strategy).await.unwrap(),
                vec![untouched]
            );
        }

        for target in [Status::Complete, Status::Cancelled] {
            for strategy in [QueryStrategy::DerivedLatest, QueryStrategy::DenormalizedScalar] {
                assert!(queries.by_status(target, strategy).await.unwrap().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_default_status_on_memory() {
        run_default_status(memory()).await;
    }

    #[tokio::test]
    async fn test_default_status_on_sqlite() {
        run_default_status(sqlite().await).await;
    }

    /// Latest-by-recency wins even when an earlier Cancelled row exists.
    async fn run_monotonic_history(store: Arc<dyn OrderStore>) {
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store);

        let id = handler.create_order().await.unwrap();
        handler.cancel_order(id).await.unwrap();
        handler.complete_order(id).await.unwrap();

        assert_eq!(
            queries
                .by_status(Status::Complete, QueryStrategy::DerivedLatest)
                .await
                .unwrap(),
            vec![id]
        );
        assert!(queries
            .by_status(Status::Cancelled, QueryStrategy::DerivedLatest)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_monotonic_history_on_memory() {
        run_monotonic_history(memory()).await;
    }

    #[tokio::test]
    async fn test_monotonic_history_on_sqlite() {
        run_monotonic_history(sqlite().await).await;
    }

    /// Double cancel: two history rows, the order appears exactly once.
    async fn run_idempotent_re_cancel(store: Arc<dyn OrderStore>) {
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store.clone());

        let id = handler.create_order().await.unwrap();
        handler.cancel_order(id).await.unwrap();
        handler.cancel_order(id).await.unwrap();

        assert_eq!(store.history(id).await.unwrap().len(), 2);
        for strategy in [QueryStrategy::DerivedLatest, QueryStrategy::DenormalizedScalar] {
            assert_eq!(
                queries.by_status(Status::Cancelled, strategy).await.unwrap(),
                vec![id]
            );
        }
    }

    #[tokio::test]
    async fn test_idempotent_re_cancel_on_memory() {
        run_idempotent_re_cancel(memory()).await;
    }

    #[tokio::test]
    async fn test_idempotent_re_cancel_on_sqlite() {
        run_idempotent_re_cancel(sqlite().await).await;
    }

    /// Deleting an order removes it from every result set, both strategies.
    async fn run_cascade_delete(store: Arc<dyn OrderStore>) {
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store);

        let keep = handler.create_order().await.unwrap();
        let gone = handler.create_order().await.unwrap();
        handler.cancel_order(keep).await.unwrap();
        handler.cancel_order(gone).await.unwrap();

        handler.delete_order(gone).await.unwrap();

        for strategy in [QueryStrategy::DerivedLatest, QueryStrategy::DenormalizedScalar] {
            assert_eq!(
                queries.by_status(Status::Cancelled, strategy).await.unwrap(),
                vec![keep]
            );
        }
    }

    #[tokio::test]
    async fn test_cascade_delete_on_memory() {
        run_cascade_delete(memory()).await;
    }

    #[tokio::test]
    async fn test_cascade_delete_on_sqlite() {
        run_cascade_delete(sqlite().await).await;
    }

    /// Bulk equivalence across a mixed dataset built only through the
    /// write path, for every target and both strategies.
    async fn run_bulk_equivalence(store: Arc<dyn OrderStore>) {
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store);

        for group in 0..20 {
            let pending = handler.create_order().await.unwrap();
            let cancelled = handler.create_order().await.unwrap();
            let completed = handler.create_order().await.unwrap();

            handler.cancel_order(cancelled).await.unwrap();
            handler.complete_order(completed).await.unwrap();

            // Every third group gets extra churn on the pending order too
            if group % 3 == 0 {
                handler.complete_order(pending).await.unwrap();
                handler.cancel_order(pending).await.unwrap();
            }
        }

        assert_strategies_agree(&queries).await;
    }

    #[tokio::test]
    async fn test_bulk_equivalence_on_memory() {
        run_bulk_equivalence(memory()).await;
    }

    #[tokio::test]
    async fn test_bulk_equivalence_on_sqlite() {
        run_bulk_equivalence(sqlite().await).await;
    }

    #[tokio::test]
    async fn test_verify_consistency_accepts_written_data() {
        let store = memory();
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store);

        let pending = handler.create_order().await.unwrap();
        let cancelled = handler.create_order().await.unwrap();
        handler.cancel_order(cancelled).await.unwrap();

        queries.verify_consistency(pending).await.unwrap();
        queries.verify_consistency(cancelled).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_consistency_surfaces_violation() {
        let store = Arc::new(MemoryOrderStore::new());
        let handler = OrderCommandHandler::new(store.clone());
        let queries = OrderQueries::new(store.clone());

        let id = handler.create_order().await.unwrap();
        handler.cancel_order(id).await.unwrap();

        // Break the contract on purpose: scalar flips without a history row
        store.corrupt_scalar(id, Status::Complete).await;

        match queries.verify_consistency(id).await {
            Err(StoreError::InvariantViolation {
                order_id,
                scalar,
                derived,
            }) => {
                assert_eq!(order_id, id);
                assert_eq!(scalar, Status::Complete);
                assert_eq!(derived, Some(Status::Cancelled));
            }
            other => panic!("expected InvariantViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_consistency_on_missing_order() {
        let queries = OrderQueries::new(memory());
        match queries.verify_consistency(OrderId(5)).await {
            Err(StoreError::NotFound(id)) => assert_eq!(id, OrderId(5)),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
