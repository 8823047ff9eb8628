use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::Status;

// ============================================================================
// Order Events - Status transitions that have occurred
// ============================================================================
//
// Each event becomes exactly one append-only history row. The timestamp is
// assigned when the event is emitted and is the sole recency signal for the
// derived-latest query strategy.
//
// ============================================================================

/// Order Event - union type for all order status transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Cancelled(OrderCancelled),
    Completed(OrderCompleted),
}

/// Order Cancelled - order moved to the Cancelled status
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCancelled {
    pub occurred_at: DateTime<Utc>,
}

/// Order Completed - order moved to the Complete status
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCompleted {
    pub occurred_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Logical status this event records.
    pub fn status(&self) -> Status {
        match self {
            OrderEvent::Cancelled(_) => Status::Cancelled,
            OrderEvent::Completed(_) => Status::Complete,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Cancelled(e) => e.occurred_at,
            OrderEvent::Completed(e) => e.occurred_at,
        }
    }
}
