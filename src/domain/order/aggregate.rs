use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::commands::OrderCommand;
use super::events::{OrderCancelled, OrderCompleted, OrderEvent};
use super::value_objects::{OrderId, Status};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// The aggregate owns the current-status scalar. All mutation flows through
// handle_command -> event -> apply_event; there is no general status setter.
// The scalar must always agree with the order's most recent history row,
// which is why the store persists both inside one atomic unit of work.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: Status,
}

impl Order {
    /// New order: Pending by construction, no history yet.
    pub fn new(id: OrderId) -> Self {
        Self {
            id,
            status: Status::Pending,
        }
    }

    /// Handle a command and emit the transition event.
    ///
    /// There is no guard on the current status: re-cancelling an already
    /// cancelled order is permitted and simply appends another history row.
    pub fn handle_command(&self, command: &OrderCommand) -> OrderEvent {
        match command {
            OrderCommand::Cancel => OrderEvent::Cancelled(OrderCancelled {
                occurred_at: Utc::now(),
            }),
            OrderCommand::Complete => OrderEvent::Completed(OrderCompleted {
                occurred_at: Utc::now(),
            }),
        }
    }

    /// Fold a transition event into the scalar.
    pub fn apply_event(&mut self, event: &OrderEvent) {
        self.status = event.status();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
