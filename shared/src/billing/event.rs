//! Settlement events - facts broadcast after a settlement commits

use serde::{Deserialize, Serialize};

/// What a settlement event reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementEventKind {
    /// A settlement fragment committed
    FragmentSettled,
    /// The root bill completed and the visit checked out
    BillCompleted,
}

/// A settlement fact, broadcast to subscribed terminals
///
/// Emitted only after the storage transaction commits, so every event
/// describes durable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEvent {
    /// Event unique ID
    pub event_id: String,
    /// What happened
    pub kind: SettlementEventKind,
    /// Root bill the settlement belongs to
    pub root_bill_id: String,
    /// Fragment created by the settlement
    pub child_bill_id: String,
    /// Visit the root bill belongs to
    pub visit_id: String,
    /// Amount the fragment settled
    pub amount: i64,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
}

impl SettlementEvent {
    pub fn new(
        kind: SettlementEventKind,
        root_bill_id: impl Into<String>,
        child_bill_id: impl Into<String>,
        visit_id: impl Into<String>,
        amount: i64,
        timestamp: i64,
    ) -> Self {
        Self {
            event_id: crate::util::new_id(),
            kind,
            root_bill_id: root_bill_id.into(),
            child_bill_id: child_bill_id.into(),
            visit_id: visit_id.into(),
            amount,
            timestamp,
        }
    }
}
