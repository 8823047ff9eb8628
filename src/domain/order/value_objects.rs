use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order identifier, assigned by the store in creation order. Sorting by id
/// is therefore sorting by creation time, which the query contract relies on.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Logical order status.
///
/// Two persisted representations exist: history rows carry the legacy text
/// label, the order row carries the numeric code. `STATUS_TABLE` is the
/// single source for both directions so the domains cannot drift.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Complete,
    Cancelled,
}

const STATUS_TABLE: [(Status, i16, &str); 3] = [
    (Status::Pending, 0, "Pending"),
    (Status::Complete, 1, "Complete"),
    (Status::Cancelled, 2, "Cancelled"),
];

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::Complete, Status::Cancelled];

    /// Numeric code stored in the order row's status column.
    pub fn code(self) -> i16 {
        STATUS_TABLE
            .iter()
            .find(|(status, _, _)| *status == self)
            .map(|(_, code, _)| *code)
            .unwrap_or_else(|| unreachable!("status missing from mapping table"))
    }

    /// Legacy text label stored in history rows.
    pub fn label(self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(status, _, _)| *status == self)
            .map(|(_, _, label)| *label)
            .unwrap_or_else(|| unreachable!("status missing from mapping table"))
    }

    pub fn from_code(code: i16) -> Option<Status> {
        STATUS_TABLE
            .iter()
            .find(|(_, candidate, _)| *candidate == code)
            .map(|(status, _, _)| *status)
    }

    pub fn from_label(label: &str) -> Option<Status> {
        STATUS_TABLE
            .iter()
            .find(|(_, _, candidate)| *candidate == label)
            .map(|(status, _, _)| *status)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_legacy_ordering() {
        assert_eq!(Status::Pending.code(), 0);
        assert_eq!(Status::Complete.code(), 1);
        assert_eq!(Status::Cancelled.code(), 2);
    }

    #[test]
    fn test_status_labels_match_legacy_domain() {
        assert_eq!(Status::Pending.label(), "Pending");
        assert_eq!(Status::Complete.label(), "Complete");
        assert_eq!(Status::Cancelled.label(), "Cancelled");
    }

    #[test]
    fn test_mapping_is_total_in_both_directions() {
        for status in Status::ALL {
            assert_eq!(Status::from_code(status.code()), Some(status));
            assert_eq!(Status::from_label(status.label()), Some(status));
        }
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert_eq!(Status::from_code(3), None);
        assert_eq!(Status::from_code(-1), None);
        assert_eq!(Status::from_label("Shipped"), None);
        assert_eq!(Status::from_label("pending"), None);
    }

    #[test]
    fn test_order_ids_sort_by_creation_order() {
        let mut ids = vec![OrderId(3), OrderId(1), OrderId(2)];
        ids.sort();
        assert_eq!(ids, vec![OrderId(1), OrderId(2), OrderId(3)]);
    }
}
