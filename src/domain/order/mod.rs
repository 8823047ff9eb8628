// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderId, Status and its dual-domain mapping)
// - Events (OrderCancelled, OrderCompleted)
// - Commands (Cancel, Complete)
// - Aggregate (Order with transition logic)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod aggregate;
pub mod command_handler;
pub mod commands;
pub mod events;
pub mod value_objects;

// Re-export for convenience
pub use aggregate::*;
pub use command_handler::*;
pub use commands::*;
pub use events::*;
pub use value_objects::*;
