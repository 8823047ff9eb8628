// ============================================================================
// Order Commands - Represent caller intent
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCommand {
    Cancel,
    Complete,
}
