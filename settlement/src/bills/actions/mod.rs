//! Settlement action implementations
//!
//! One action per settlement mode:
//! - **SplitPayment**: claim one share of an even split
//! - **ItemizedPayment**: pay for selected line quantities
//!
//! Actions run inside the manager's write transaction. They validate,
//! write the fragment, and (on the final fragment) aggregate the root and
//! check the visit out. Any error aborts the whole transaction.

mod itemized_payment;
mod split_payment;

pub use itemized_payment::ItemizedPaymentAction;
pub use split_payment::SplitPaymentAction;

use crate::error::{SettlementError, SettlementResult};
use crate::notify::VisitSettled;
use crate::storage::LedgerStorage;
use redb::WriteTransaction;
use shared::billing::{Bill, BillStatus, LineSelection, SettlementRequest, TaxRates};

/// Everything an action needs while the write transaction is open
pub struct SettlementContext<'a> {
    pub txn: &'a WriteTransaction,
    pub storage: &'a LedgerStorage,
    pub rates: TaxRates,
    /// Server time for checkout stamps
    pub now_ms: i64,
}

impl<'a> SettlementContext<'a> {
    pub fn new(
        txn: &'a WriteTransaction,
        storage: &'a LedgerStorage,
        rates: TaxRates,
        now_ms: i64,
    ) -> Self {
        Self {
            txn,
            storage,
            rates,
            now_ms,
        }
    }
}

/// Result of a settlement action
pub struct SettlementOutcome {
    /// The fragment this settlement created
    pub child: Bill,
    /// The root bill after the settlement
    pub root: Bill,
    /// Whether this settlement completed the root
    pub completed: bool,
    /// Checkout notice to send after commit, when the visit was closed
    pub notice: Option<VisitSettled>,
}

/// SettlementAction enum - dispatches to concrete action implementations
pub enum SettlementAction {
    Split(SplitPaymentAction),
    Itemized(ItemizedPaymentAction),
}

impl SettlementAction {
    pub fn execute(&self, ctx: &mut SettlementContext<'_>) -> SettlementResult<SettlementOutcome> {
        match self {
            SettlementAction::Split(action) => action.execute(ctx),
            SettlementAction::Itemized(action) => action.execute(ctx),
        }
    }
}

/// Convert SettlementRequest to SettlementAction
///
/// This is the ONLY place with a match on SettlementRequest variants.
impl From<&SettlementRequest> for SettlementAction {
    fn from(request: &SettlementRequest) -> Self {
        match request {
            SettlementRequest::Split(req) => SettlementAction::Split(SplitPaymentAction {
                bill_id: req.bill_id.clone(),
                split_count: req.split_count,
                split_index: req.split_index,
                payment_method_id: req.payment_method_id.clone(),
                cashier_id: req.cashier_id.clone(),
                deposit: req.deposit,
                settled_at: req.settled_at,
            }),
            SettlementRequest::Itemized(req) => {
                SettlementAction::Itemized(ItemizedPaymentAction {
                    bill_id: req.bill_id.clone(),
                    selections: req.selections.clone(),
                    payment_method_id: req.payment_method_id.clone(),
                    cashier_id: req.cashier_id.clone(),
                    deposit: req.deposit,
                    discount: req.discount,
                    settled_at: req.settled_at,
                })
            }
        }
    }
}

// ============================================================================
// Shared validation
// ============================================================================

/// The bill a settlement targets must be a settlable root
pub(super) fn validate_root_bill(bill: &Bill) -> SettlementResult<()> {
    if bill.is_fragment() {
        return Err(SettlementError::Validation(format!(
            "Bill {} is a settlement fragment and cannot be settled itself",
            bill.id
        )));
    }
    match bill.status {
        BillStatus::Open | BillStatus::Partial => Ok(()),
        BillStatus::Completed => Err(SettlementError::Validation(format!(
            "Bill {} is already completed",
            bill.id
        ))),
    }
}

pub(super) enum SettleMode {
    Split,
    Itemized,
}

/// Validate that a settlement mode is allowed given the root's state
///
/// A bill commits to the mode of its first fragment. Itemized fragments
/// leave `split_count` unset; an even split sets it with the first share.
pub(super) fn validate_mode_allowed(bill: &Bill, mode: SettleMode) -> SettlementResult<()> {
    match mode {
        SettleMode::Split => {
            // Itemized settlement in progress → no even split on top
            if bill.status == BillStatus::Partial && !bill.has_split() {
                return Err(SettlementError::ModeConflict(format!(
                    "Bill {} has an itemized settlement in progress",
                    bill.id
                )));
            }
        }
        SettleMode::Itemized => {
            // Even split in progress → no itemized payments on top
            if bill.has_split() {
                return Err(SettlementError::ModeConflict(format!(
                    "Bill {} has an even split in progress",
                    bill.id
                )));
            }
        }
    }
    Ok(())
}

/// Reject duplicate line IDs (would double-count quantities)
pub(super) fn validate_no_duplicate_selections(
    selections: &[LineSelection],
) -> SettlementResult<()> {
    let mut seen = std::collections::HashSet::new();
    for selection in selections {
        if !seen.insert(&selection.line_id) {
            return Err(SettlementError::Validation(format!(
                "Duplicate line_id '{}' in selections",
                selection.line_id
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Root finalization
// ============================================================================

/// Aggregate the committed fragments into the root and close the visit
///
/// Runs when the final fragment commits. Fragment amounts are rolled up
/// into the root, every fragment is marked completed, and the visit is
/// checked out in the same transaction. Returns the checkout notice to
/// broadcast after commit, or `None` when the visit was already closed.
pub(super) fn finalize_root(
    ctx: &mut SettlementContext<'_>,
    root: &mut Bill,
    settled_at: i64,
) -> SettlementResult<Option<VisitSettled>> {
    let mut children = ctx.storage.get_children_txn(ctx.txn, &root.id)?;

    let mut total: i64 = 0;
    let mut deposit: i64 = 0;
    let mut child_discount: i64 = 0;
    for child in children.iter_mut() {
        total += child.total;
        deposit += child.deposit;
        child_discount += child.discount;
        if child.status != BillStatus::Completed {
            child.status = BillStatus::Completed;
            ctx.storage.store_bill(ctx.txn, child)?;
        }
    }

    // The root keeps its own pre-tax subtotal; fragments roll up the
    // settled total, tendered deposits, and fragment-level discounts.
    root.total = total;
    root.deposit = deposit;
    root.discount += child_discount;
    root.status = BillStatus::Completed;
    root.settled_at = Some(settled_at);
    ctx.storage.store_bill(ctx.txn, root)?;

    // Close the visit in the same transaction; signal only on the flip
    let mut visit = ctx
        .storage
        .get_visit_txn(ctx.txn, &root.visit_id)?
        .ok_or_else(|| SettlementError::VisitNotFound(root.visit_id.clone()))?;
    if !visit.active {
        return Ok(None);
    }
    visit.active = false;
    visit.checked_out_at = Some(ctx.now_ms);
    ctx.storage.store_visit(ctx.txn, &visit)?;

    Ok(Some(VisitSettled {
        visit_id: visit.id,
        root_bill_id: root.id.clone(),
        total: root.total,
        settled_at,
    }))
}
