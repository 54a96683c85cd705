//! BillManager - Settlement orchestration over the ledger store
//!
//! This module handles:
//! - Visit check-in and root bill construction
//! - Settlement request validation and dispatch
//! - Persistence to redb (transactional)
//! - Event broadcasting after commit
//!
//! # Settlement Flow
//!
//! ```text
//! settle(request)
//!     ├─ 1. Structural validation (validator derives)
//!     ├─ 2. Convert request to action
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Execute action (mode, sequence, amount checks; fragment write)
//!     ├─ 5. Commit transaction (any error above drops it unchanged)
//!     ├─ 6. Broadcast settlement event(s)
//!     ├─ 7. Signal visit checkout (final fragment only)
//!     └─ 8. Return the fragment
//! ```

use super::actions::{SettlementAction, SettlementContext, SettlementOutcome};
use super::money;
use crate::clock::{Clock, SystemClock};
use crate::directory::{InMemoryUserDirectory, UserDirectory};
use crate::error::{SettlementError, SettlementResult};
use crate::notify::{NullVisitNotifier, VisitNotifier};
use crate::storage::{LedgerStorage, StorageError};
use shared::billing::{
    Bill, BillLine, BillStatus, ChildSettlement, LineInput, RemainingSettlement, SettlementEvent,
    SettlementEventKind, SettlementRequest, TaxRates, UnpaidLine, Visit,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use validator::Validate;

#[cfg(test)]
mod tests;

/// Event channel capacity
///
/// Sized for a day of settlement traffic with slow subscribers; the
/// channel drops the oldest events past this point.
const EVENT_CHANNEL_CAPACITY: usize = 16384;

/// Core settlement manager
///
/// Owns the ledger storage and the seams settlement needs: a clock for
/// server-side stamps, a user directory for display names, and a visit
/// notifier for seating. One write transaction per request; the broadcast
/// channel only ever carries committed state.
pub struct BillManager {
    storage: LedgerStorage,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn VisitNotifier>,
    event_tx: broadcast::Sender<SettlementEvent>,
    rates: TaxRates,
}

impl std::fmt::Debug for BillManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillManager")
            .field("rates", &self.rates)
            .finish_non_exhaustive()
    }
}

impl BillManager {
    /// Create a new manager with persistent storage
    pub fn new(db_path: impl AsRef<Path>, rates: TaxRates) -> SettlementResult<Self> {
        let storage = LedgerStorage::open(db_path)?;
        tracing::info!("BillManager initialized");
        Ok(Self::with_parts(storage, rates))
    }

    /// Create a manager over in-memory storage
    #[cfg(test)]
    pub fn with_storage(storage: LedgerStorage, rates: TaxRates) -> Self {
        Self::with_parts(storage, rates)
    }

    fn with_parts(storage: LedgerStorage, rates: TaxRates) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            directory: Arc::new(InMemoryUserDirectory::new()),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NullVisitNotifier),
            event_tx,
            rates,
        }
    }

    /// Set the user directory used to resolve display names
    pub fn set_directory(&mut self, directory: Arc<dyn UserDirectory>) {
        self.directory = directory;
    }

    /// Set the notifier signaled when a visit checks out
    pub fn set_notifier(&mut self, notifier: Arc<dyn VisitNotifier>) {
        self.notifier = notifier;
    }

    /// Replace the time source
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Subscribe to settlement event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    /// Tax rates the manager prices with
    pub fn rates(&self) -> TaxRates {
        self.rates
    }

    // ========== Visit / Bill Construction ==========

    /// Check a party in and open its root bill
    ///
    /// Both records are written in one transaction; a visit never exists
    /// without a bill to settle against.
    pub fn open_bill(
        &self,
        table_ref: Option<String>,
        party_size: Option<u32>,
    ) -> SettlementResult<(Visit, Bill)> {
        let now = self.clock.now_ms();
        let visit = Visit::check_in(table_ref, party_size, now);
        let bill = Bill::open(&visit.id, now);

        let txn = self.storage.begin_write()?;
        self.storage.store_visit(&txn, &visit)?;
        self.storage.store_bill(&txn, &bill)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            visit_id = %visit.id,
            bill_id = %bill.id,
            party_size = ?party_size,
            "Visit checked in"
        );
        Ok((visit, bill))
    }

    /// Add a line to an open root bill
    ///
    /// Lines are frozen once settlement starts; a PARTIAL bill would
    /// break conservation if its lines kept moving underneath committed
    /// fragments.
    pub fn add_line(&self, bill_id: &str, input: LineInput) -> SettlementResult<BillLine> {
        input.validate()?;
        money::validate_amount(input.subtotal, "subtotal")?;
        money::validate_amount(input.line_discount, "line_discount")?;

        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(bill_id.to_string()))?;

        if bill.is_fragment() {
            return Err(SettlementError::Validation(format!(
                "Bill {} is a settlement fragment; lines go on the root",
                bill_id
            )));
        }
        if bill.status != BillStatus::Open {
            return Err(SettlementError::Validation(format!(
                "Bill {} has settlement in progress; lines are frozen",
                bill_id
            )));
        }

        let line = BillLine {
            id: shared::util::new_id(),
            bill_id: bill.id.clone(),
            item_ref: input.item_ref,
            item_name: input.item_name,
            quantity: input.quantity,
            subtotal: input.subtotal,
            tax_bucket: input.tax_bucket,
            line_discount: input.line_discount,
        };
        self.storage.store_line(&txn, &line)?;

        // Keep the root's running figures in step with its lines
        let lines = self.storage.get_lines_for_bill_txn(&txn, bill_id)?;
        bill.subtotal = lines.iter().map(|l| l.subtotal).sum();
        bill.total = money::discounted_bill_total(&lines, bill.discount, &self.rates);
        self.storage.store_bill(&txn, &bill)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(line)
    }

    /// Set the bill-level discount on an open root bill
    pub fn set_discount(&self, bill_id: &str, discount: i64) -> SettlementResult<Bill> {
        money::validate_amount(discount, "discount")?;

        let txn = self.storage.begin_write()?;
        let mut bill = self
            .storage
            .get_bill_txn(&txn, bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(bill_id.to_string()))?;

        if bill.is_fragment() || bill.status != BillStatus::Open {
            return Err(SettlementError::Validation(format!(
                "Bill {} does not accept discount changes",
                bill_id
            )));
        }

        bill.discount = discount;
        let lines = self.storage.get_lines_for_bill_txn(&txn, bill_id)?;
        bill.total = money::discounted_bill_total(&lines, discount, &self.rates);
        self.storage.store_bill(&txn, &bill)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(bill)
    }

    // ========== Settlement ==========

    /// Execute a settlement request and return the committed fragment
    pub fn settle(&self, request: &SettlementRequest) -> SettlementResult<Bill> {
        let outcome = self.process_settlement(request)?;

        // Broadcast events after successful commit
        for event in self.events_for(&outcome) {
            if self.event_tx.send(event).is_err() {
                tracing::warn!("Event broadcast failed: no active receivers");
                break;
            }
        }
        if let Some(notice) = outcome.notice {
            self.notifier.visit_settled(notice);
        }

        Ok(outcome.child)
    }

    /// Validate, execute, and commit a settlement request
    fn process_settlement(
        &self,
        request: &SettlementRequest,
    ) -> SettlementResult<SettlementOutcome> {
        tracing::debug!(bill_id = %request.bill_id(), "Processing settlement request");
        request.validate()?;

        let action = SettlementAction::from(request);
        let txn = self.storage.begin_write()?;
        let mut ctx =
            SettlementContext::new(&txn, &self.storage, self.rates, self.clock.now_ms());

        // Any error here drops the transaction; nothing partial lands
        let outcome = action.execute(&mut ctx)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            bill_id = %outcome.root.id,
            child_bill_id = %outcome.child.id,
            amount = outcome.child.total,
            completed = outcome.completed,
            "Settlement committed"
        );
        Ok(outcome)
    }

    fn events_for(&self, outcome: &SettlementOutcome) -> Vec<SettlementEvent> {
        let now = self.clock.now_ms();
        let mut events = vec![SettlementEvent::new(
            SettlementEventKind::FragmentSettled,
            &outcome.root.id,
            &outcome.child.id,
            &outcome.root.visit_id,
            outcome.child.total,
            now,
        )];
        if outcome.completed {
            events.push(SettlementEvent::new(
                SettlementEventKind::BillCompleted,
                &outcome.root.id,
                &outcome.child.id,
                &outcome.root.visit_id,
                outcome.root.total,
                now,
            ));
        }
        events
    }

    // ========== Queries ==========

    /// Fetch a bill
    pub fn bill(&self, bill_id: &str) -> SettlementResult<Bill> {
        self.storage
            .get_bill(bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(bill_id.to_string()))
    }

    /// Fetch a bill's lines
    pub fn lines(&self, bill_id: &str) -> SettlementResult<Vec<BillLine>> {
        Ok(self.storage.get_lines_for_bill(bill_id)?)
    }

    /// Fetch a visit
    pub fn visit(&self, visit_id: &str) -> SettlementResult<Visit> {
        self.storage
            .get_visit(visit_id)?
            .ok_or_else(|| SettlementError::VisitNotFound(visit_id.to_string()))
    }

    /// Mid-settlement progress for a root bill
    ///
    /// Shows what is left to pay (unpaid lines with tax) alongside the
    /// fragments already committed, with cashier names resolved.
    pub fn remaining_settlement(&self, bill_id: &str) -> SettlementResult<RemainingSettlement> {
        let bill = self.bill(bill_id)?;
        if bill.is_fragment() {
            return Err(SettlementError::Validation(format!(
                "Bill {} is a settlement fragment",
                bill_id
            )));
        }

        let lines = self.storage.get_lines_for_bill(bill_id)?;
        let children = self.storage.get_children(bill_id)?;

        let unpaid_lines: Vec<UnpaidLine> = lines
            .iter()
            .map(|line| UnpaidLine {
                line_id: line.id.clone(),
                item_name: line.item_name.clone(),
                quantity: line.quantity,
                subtotal: line.subtotal,
                line_discount: line.line_discount,
                tax_bucket: line.tax_bucket,
                tax_rate: self.rates.rate(line.tax_bucket),
                total_with_tax: money::taxed_line_total(line, &self.rates),
            })
            .collect();

        let settled: i64 = children.iter().map(|c| c.total).sum();
        let total = if bill.status == BillStatus::Completed {
            // Completed roots carry the aggregated fragment total
            bill.total
        } else if bill.has_split() {
            // Split fragments never take lines off the root
            money::discounted_bill_total(&lines, bill.discount, &self.rates)
        } else {
            // Itemized fragments do; add back what they carried away
            money::discounted_bill_total(&lines, bill.discount, &self.rates) + settled
        };

        let children = children
            .into_iter()
            .map(|child| ChildSettlement {
                cashier_name: child
                    .cashier_id
                    .as_deref()
                    .and_then(|id| self.directory.display_name(id)),
                bill_id: child.id,
                split_index: child.split_index,
                total: child.total,
                payment_method_id: child.payment_method_id,
                settled_at: child.settled_at,
            })
            .collect();

        Ok(RemainingSettlement {
            bill_id: bill.id,
            total,
            settled,
            remaining: (total - settled).max(0),
            unpaid_lines,
            children,
            fully_settled: bill.status == BillStatus::Completed,
        })
    }
}
