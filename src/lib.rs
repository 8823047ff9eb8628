// ============================================================================
// Order Status Tracking
// ============================================================================
//
// Tracks order lifecycle status with two coexisting representations:
// - an append-only status history (legacy textual domain)
// - a denormalized current-status column (numeric domain)
//
// The write path keeps both in sync inside one atomic unit of work; the
// query layer answers "which orders are in status X" through either
// representation and the two answers must always agree.
//
// ============================================================================

pub mod domain;
pub mod query;
pub mod store;
