//! Visit checkout notifications
//!
//! When a root bill completes, the visit is checked out in the same
//! transaction and seating is signaled afterwards so the table can be
//! released. Notification failures are logged and swallowed; they never
//! fail the settlement that already committed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A completed visit, as announced to seating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitSettled {
    /// Visit that checked out
    pub visit_id: String,
    /// Root bill that completed
    pub root_bill_id: String,
    /// Final settled total
    pub total: i64,
    /// Checkout timestamp
    pub settled_at: i64,
}

/// Downstream signal for completed visits
pub trait VisitNotifier: Send + Sync {
    fn visit_settled(&self, notice: VisitSettled);
}

/// Broadcast-backed notifier; seating terminals subscribe
pub struct BroadcastVisitNotifier {
    tx: broadcast::Sender<VisitSettled>,
}

impl BroadcastVisitNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to checkout notices
    pub fn subscribe(&self) -> broadcast::Receiver<VisitSettled> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastVisitNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl VisitNotifier for BroadcastVisitNotifier {
    fn visit_settled(&self, notice: VisitSettled) {
        if self.tx.send(notice).is_err() {
            tracing::warn!("Visit notification dropped: no active receivers");
        }
    }
}

/// No-op notifier for deployments without seating integration
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVisitNotifier;

impl VisitNotifier for NullVisitNotifier {
    fn visit_settled(&self, notice: VisitSettled) {
        tracing::debug!(visit_id = %notice.visit_id, "Visit settled (no notifier configured)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_notices() {
        let notifier = BroadcastVisitNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.visit_settled(VisitSettled {
            visit_id: "visit-1".to_string(),
            root_bill_id: "bill-1".to_string(),
            total: 3300,
            settled_at: 1_700_000_000_000,
        });

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.visit_id, "visit-1");
        assert_eq!(notice.total, 3300);
    }

    #[test]
    fn send_without_receivers_does_not_panic() {
        let notifier = BroadcastVisitNotifier::new(8);
        notifier.visit_settled(VisitSettled {
            visit_id: "visit-1".to_string(),
            root_bill_id: "bill-1".to_string(),
            total: 100,
            settled_at: 0,
        });
    }
}
