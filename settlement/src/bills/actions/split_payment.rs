//! Even-split settlement
//!
//! The discounted bill total is divided into `split_count` equal shares;
//! each request claims exactly one share, strictly in order. The floor
//! remainder lands on the last share, so the shares always reconstruct
//! the total.

use super::{
    SettleMode, SettlementContext, SettlementOutcome, finalize_root, validate_mode_allowed,
    validate_root_bill,
};
use crate::bills::money::{
    MONEY_EPSILON, discounted_bill_total, split_share, validate_amount, validate_split_bounds,
};
use crate::error::{SettlementError, SettlementResult};
use shared::billing::{Bill, BillStatus};

/// Claim one share of an even split
pub struct SplitPaymentAction {
    pub bill_id: String,
    pub split_count: u32,
    pub split_index: u32,
    pub payment_method_id: String,
    pub cashier_id: String,
    pub deposit: i64,
    pub settled_at: i64,
}

impl SplitPaymentAction {
    pub fn execute(&self, ctx: &mut SettlementContext<'_>) -> SettlementResult<SettlementOutcome> {
        // Load and validate the root
        let mut root = ctx
            .storage
            .get_bill_txn(ctx.txn, &self.bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(self.bill_id.clone()))?;
        validate_root_bill(&root)?;
        validate_mode_allowed(&root, SettleMode::Split)?;
        validate_split_bounds(self.split_index, self.split_count)?;
        validate_amount(self.deposit, "deposit")?;

        // An in-progress split pins the share count
        if let Some(count) = root.split_count
            && count != self.split_count
        {
            return Err(SettlementError::Validation(format!(
                "Bill {} is split into {} shares, got {}",
                root.id, count, self.split_count
            )));
        }

        // Party size bounds the share count when it was recorded at
        // check-in. An unknown party size skips the check entirely:
        // walk-ins without a headcount can still split freely.
        let visit = ctx
            .storage
            .get_visit_txn(ctx.txn, &root.visit_id)?
            .ok_or_else(|| SettlementError::VisitNotFound(root.visit_id.clone()))?;
        if let Some(party_size) = visit.party_size
            && self.split_count > party_size
        {
            return Err(SettlementError::InvalidSplitCount {
                party_size,
                split_count: self.split_count,
            });
        }

        // Shares are claimed strictly in order
        let committed = ctx.storage.child_count_txn(ctx.txn, &root.id)?;
        if committed != self.split_index - 1 {
            return Err(SettlementError::SequenceViolation {
                expected: committed + 1,
                got: self.split_index,
            });
        }

        // This share of the discounted total
        let lines = ctx.storage.get_lines_for_bill_txn(ctx.txn, &root.id)?;
        let total = discounted_bill_total(&lines, root.discount, &ctx.rates);
        let amount = split_share(total, self.split_count, self.split_index);

        if self.deposit < amount {
            return Err(SettlementError::InsufficientDeposit {
                required: amount,
                tendered: self.deposit,
            });
        }

        // Committed shares plus this one must stay within the total
        let children = ctx.storage.get_children_txn(ctx.txn, &root.id)?;
        let paid: i64 = children.iter().map(|c| c.total).sum();
        if paid + amount > total + MONEY_EPSILON {
            return Err(SettlementError::OverPayment {
                total,
                attempted: paid + amount,
            });
        }

        // The first share locks the bill into split mode
        if self.split_index == 1 {
            root.status = BillStatus::Partial;
            root.split_count = Some(self.split_count);
        }

        let is_final = self.split_index == self.split_count;
        let child = Bill {
            id: shared::util::new_id(),
            visit_id: root.visit_id.clone(),
            parent_id: Some(root.id.clone()),
            status: if is_final {
                BillStatus::Completed
            } else {
                BillStatus::Partial
            },
            // A split share carries no line decomposition
            subtotal: 0,
            discount: 0,
            total: amount,
            deposit: self.deposit,
            payment_method_id: Some(self.payment_method_id.clone()),
            cashier_id: Some(self.cashier_id.clone()),
            split_index: Some(self.split_index),
            split_count: Some(self.split_count),
            opened_at: self.settled_at,
            settled_at: Some(self.settled_at),
        };

        ctx.storage.store_bill(ctx.txn, &child)?;
        ctx.storage.append_child(ctx.txn, &root.id, &child.id)?;
        ctx.storage.store_bill(ctx.txn, &root)?;

        // The final share completes the root and checks the visit out
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
