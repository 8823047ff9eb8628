// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Domain-specific aggregates and business logic, separate from the storage
// infrastructure in src/store/.
//
// ============================================================================

pub mod order;
