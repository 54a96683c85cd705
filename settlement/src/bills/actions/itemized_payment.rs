//! Itemized settlement
//!
//! Pays for selected quantities of the root's lines. Paid quantities and
//! their pre-tax value move onto a fresh fragment; a line drained to zero
//! is deleted from the root. The floor remainder of a partial quantity
//! stays on the root line until it is exhausted, so nothing leaks.

use super::{
    SettleMode, SettlementContext, SettlementOutcome, finalize_root, validate_mode_allowed,
    validate_no_duplicate_selections, validate_root_bill,
};
use crate::bills::money::{line_portion, taxed_line_total, validate_amount};
use crate::error::{SettlementError, SettlementResult};
use shared::billing::{Bill, BillLine, BillStatus, LineSelection};

/// Pay for selected line quantities
pub struct ItemizedPaymentAction {
    pub bill_id: String,
    pub selections: Vec<LineSelection>,
    pub payment_method_id: String,
    pub cashier_id: String,
    pub deposit: i64,
    pub discount: i64,
    pub settled_at: i64,
}

/// One validated selection, ready to apply
struct PlannedTake {
    source: BillLine,
    take: u32,
    portion: i64,
}

impl ItemizedPaymentAction {
    pub fn execute(&self, ctx: &mut SettlementContext<'_>) -> SettlementResult<SettlementOutcome> {
        // Load and validate the root
        let mut root = ctx
            .storage
            .get_bill_txn(ctx.txn, &self.bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(self.bill_id.clone()))?;
        validate_root_bill(&root)?;
        validate_mode_allowed(&root, SettleMode::Itemized)?;
        validate_no_duplicate_selections(&self.selections)?;
        validate_amount(self.deposit, "deposit")?;
        validate_amount(self.discount, "discount")?;
        if self.selections.is_empty() {
            return Err(SettlementError::Validation(
                "at least one line selection is required".to_string(),
            ));
        }

        // First pass: validate every selection and price the takes
        let mut planned = Vec::with_capacity(self.selections.len());
        for selection in &self.selections {
            let line = ctx
                .storage
                .get_line_txn(ctx.txn, &root.id, &selection.line_id)?
                .ok_or_else(|| SettlementError::LineNotFound(selection.line_id.clone()))?;
            if selection.quantity == 0 {
                return Err(SettlementError::Validation(format!(
                    "quantity for line {} must be at least 1",
                    selection.line_id
                )));
            }
            if selection.quantity > line.quantity {
                return Err(SettlementError::QuantityUnavailable {
                    line_id: line.id.clone(),
                    available: line.quantity,
                    requested: selection.quantity,
                });
            }
            let portion = line_portion(line.subtotal, line.quantity, selection.quantity);
            planned.push(PlannedTake {
                source: line,
                take: selection.quantity,
                portion,
            });
        }

        // Price the fragment: per-line tax on the moved portions, then
        // the fragment discount, floored at zero
        let child_id = shared::util::new_id();
        let mut child_lines = Vec::with_capacity(planned.len());
        let mut taxed_sum: i64 = 0;
        let mut subtotal_sum: i64 = 0;
        for plan in &planned {
            let child_line = BillLine {
                id: shared::util::new_id(),
                bill_id: child_id.clone(),
                item_ref: plan.source.item_ref.clone(),
                item_name: plan.source.item_name.clone(),
                quantity: plan.take,
                subtotal: plan.portion,
                tax_bucket: plan.source.tax_bucket,
                // Line discounts stay behind on the root line
                line_discount: 0,
            };
            taxed_sum += taxed_line_total(&child_line, &ctx.rates);
            subtotal_sum += child_line.subtotal;
            child_lines.push(child_line);
        }
        let total = (taxed_sum - self.discount).max(0);

        if self.deposit < total {
            return Err(SettlementError::InsufficientDeposit {
                required: total,
                tendered: self.deposit,
            });
        }

        // Second pass: move the quantities off the root
        for plan in &planned {
            let remaining_qty = plan.source.quantity - plan.take;
            if remaining_qty == 0 {
                ctx.storage.remove_line(ctx.txn, &root.id, &plan.source.id)?;
            } else {
                let mut reduced = plan.source.clone();
                reduced.quantity = remaining_qty;
                reduced.subtotal -= plan.portion;
                ctx.storage.store_line(ctx.txn, &reduced)?;
            }
        }
        for child_line in &child_lines {
            ctx.storage.store_line(ctx.txn, child_line)?;
        }

        // The root completes once its lines are exhausted
        let remaining = ctx.storage.get_lines_for_bill_txn(ctx.txn, &root.id)?;
        let is_final = remaining.is_empty();

        if root.status == BillStatus::Open {
            root.status = BillStatus::Partial;
        }

        let child = Bill {
            id: child_id,
            visit_id: root.visit_id.clone(),
            parent_id: Some(root.id.clone()),
            status: if is_final {
                BillStatus::Completed
            } else {
                BillStatus::Partial
            },
            subtotal: subtotal_sum,
            discount: self.discount,
            total,
            deposit: self.deposit,
            payment_method_id: Some(self.payment_method_id.clone()),
            cashier_id: Some(self.cashier_id.clone()),
            split_index: None,
            split_count: None,
            opened_at: self.settled_at,
            settled_at: Some(self.settled_at),
        };

        ctx.storage.store_bill(ctx.txn, &child)?;
        ctx.storage.append_child(ctx.txn, &root.id, &child.id)?;
        ctx.storage.store_bill(ctx.txn, &root)?;

        // The last take completes the root and checks the visit out
        let mut notice = None;
        if is_final {
            notice = finalize_root(ctx, &mut root, self.settled_at)?;
        }

        Ok(SettlementOutcome {
            child,
            root,
            completed: is_final,
            notice,
        })
    }
}
