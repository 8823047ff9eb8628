use std::sync::Arc;

use crate::store::{OrderStore, StoreError};

use super::aggregate::Order;
use super::commands::OrderCommand;
use super::value_objects::OrderId;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command -> Aggregate -> Event -> Store
//
// The scalar update and the history append always travel together through
// OrderStore::record_transition, so the handler cannot produce the
// partial-application state that would break the status invariant.
//
// ============================================================================

pub struct OrderCommandHandler {
    store: Arc<dyn OrderStore>,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Create a new order in the default Pending status, with no history.
    pub async fn create_order(&self) -> Result<OrderId, StoreError> {
        let id = self.store.insert_order().await?;
        tracing::debug!(order_id = %id, "Order created");
        Ok(id)
    }

    /// Handle a command against an existing order and persist the resulting
    /// transition. Returns the post-transition aggregate state.
    pub async fn handle(&self, id: OrderId, command: OrderCommand) -> Result<Order, StoreError> {
        let mut order = self
            .store
            .fetch_order(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let event = order.handle_command(&command);
        self.store
            .record_transition(id, event.status(), event.occurred_at())
            .await?;
        order.apply_event(&event);

        tracing::debug!(
            order_id = %id,
            status = order.status.label(),
            "Order transitioned"
        );
        Ok(order)
    }

    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.handle(id, OrderCommand::Cancel).await
    }

    pub async fn complete_order(&self, id: OrderId) -> Result<Order, StoreError> {
        self.handle(id, OrderCommand::Complete).await
    }

    /// Delete an order, cascading to its history rows. Deletion is an
    /// external-collaborator concern; the core never deletes implicitly.
    pub async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        self.store.delete_order(id).await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::Status;
    use crate::store::MemoryOrderStore;

    fn handler() -> OrderCommandHandler {
        OrderCommandHandler::new(Arc::new(MemoryOrderStore::new()))
    }

    #[tokio::test]
    async fn test_create_order_starts_pending_with_no_history() {
        let store = Arc::new(MemoryOrderStore::new());
        let handler = OrderCommandHandler::new(store.clone());

        let id = handler.create_order().await.unwrap();

        let order = store.fetch_order(id).await.unwrap().unwrap();
        assert_eq!(order.status, Status::Pending);
        assert!(store.history(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_updates_scalar_and_appends_history() {
        let store = Arc::new(MemoryOrderStore::new());
        let handler = OrderCommandHandler::new(store.clone());

        let id = handler.create_order().await.unwrap();
        let order = handler.cancel_order(id).await.unwrap();
        assert_eq!(order.status, Status::Cancelled);

        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, Status::Cancelled);
        assert_eq!(
            store.fetch_order(id).await.unwrap().unwrap().status,
            Status::Cancelled
        );
    }

    #[tokio::test]
    async fn test_transition_on_unknown_order_is_not_found() {
        let handler = handler();
        let missing = OrderId(9999);

        match handler.cancel_order(missing).await {
            Err(StoreError::NotFound(id)) => assert_eq!(id, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
        match handler.complete_order(missing).await {
            Err(StoreError::NotFound(id)) => assert_eq!(id, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_order_cascades_to_history() {
        let store = Arc::new(MemoryOrderStore::new());
        let handler = OrderCommandHandler::new(store.clone());

        let id = handler.create_order().await.unwrap();
        handler.cancel_order(id).await.unwrap();
        handler.delete_order(id).await.unwrap();

        assert!(store.fetch_order(id).await.unwrap().is_none());
        assert!(store.history(id).await.unwrap().is_empty());
    }
}
