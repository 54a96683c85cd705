//! ReceiptLedger - receipt issuance, reprint, and void
//!
//! Receipts cover a bill's remaining balance, in full or in part. The
//! remaining balance is computed fresh inside the issuing transaction
//! from the bill's current lines minus all non-voided receipts, so
//! concurrent issuance can never overdraw a bill. Idempotency keys are
//! looked up in the same write transaction that inserts them; redb's
//! single-writer model makes the lookup-then-insert pair exactly-once.

use super::apportion::{self, TaxSplit};
use crate::clock::{Clock, SystemClock};
use crate::directory::{InMemoryUserDirectory, UserDirectory};
use crate::error::{SettlementError, SettlementResult};
use crate::storage::{LedgerStorage, StorageError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::billing::{
    Bill, BillSummary, BucketBreakdown, Receipt, ReceiptIssueRequest, ReceiptMode, ReceiptView,
    ReceiptVoidRequest, RemainingBalance, TaxRates,
};
use std::sync::Arc;
use validator::Validate;

/// Issues and manages tax receipts against settled bills
pub struct ReceiptLedger {
    storage: LedgerStorage,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    rates: TaxRates,
    tz: Tz,
}

impl std::fmt::Debug for ReceiptLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptLedger")
            .field("rates", &self.rates)
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}

impl ReceiptLedger {
    /// Create a ledger over existing storage
    ///
    /// The timezone fixes the business day that receipt numbers reset on.
    pub fn new(storage: LedgerStorage, rates: TaxRates, tz: Tz) -> Self {
        Self {
            storage,
            directory: Arc::new(InMemoryUserDirectory::new()),
            clock: Arc::new(SystemClock),
            rates,
            tz,
        }
    }

    /// Set the user directory used to resolve issuers
    pub fn set_directory(&mut self, directory: Arc<dyn UserDirectory>) {
        self.directory = directory;
    }

    /// Replace the time source
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    // ========== Issuance ==========

    /// Issue a receipt against a bill
    ///
    /// FULL mode covers the whole remaining balance; AMOUNT mode covers
    /// the requested amount, capped by the remaining balance. A repeated
    /// idempotency key returns the original receipt with no new writes.
    pub fn issue(&self, request: &ReceiptIssueRequest) -> SettlementResult<Receipt> {
        request.validate()?;
        let requested = match request.mode {
            ReceiptMode::Full => None,
            ReceiptMode::Amount => Some(request.amount.ok_or_else(|| {
                SettlementError::Validation("amount is required for AMOUNT mode".to_string())
            })?),
        };

        let txn = self.storage.begin_write()?;

        // Replay of a keyed request returns the original, side-effect free
        if let Some(key) = &request.idempotency_key
            && let Some(existing) = self.storage.find_by_issuance_key_txn(&txn, key)?
        {
            tracing::warn!(
                idempotency_key = %key,
                receipt_no = %existing.receipt_no,
                "Duplicate issuance request"
            );
            return Ok(existing);
        }

        if !self.directory.exists(&request.issuer_id) {
            return Err(SettlementError::UserNotFound(request.issuer_id.clone()));
        }

        let bill = self
            .storage
            .get_bill_txn(&txn, &request.bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(request.bill_id.clone()))?;
        let remaining = self.remaining_in_txn(&txn, &bill)?;

        let amount = requested.unwrap_or_else(|| remaining.sum());
        if amount > remaining.sum() {
            return Err(SettlementError::AmountExceedsRemaining {
                remaining: remaining.sum(),
                requested: amount,
            });
        }
        if amount <= 0 {
            return Err(SettlementError::Validation(format!(
                "Bill {} has no remaining balance to issue against",
                bill.id
            )));
        }

        let split = apportion::apportion(amount, &remaining, &self.rates);

        let now = self.clock.now_ms();
        let date_key = self.business_day(now);
        let seq = self.storage.next_receipt_sequence(&txn, date_key)?;

        let receipt = Receipt {
            id: shared::util::new_id(),
            bill_id: bill.id.clone(),
            receipt_no: format!("R{}-{:04}", date_key, seq),
            net_standard: split.net_standard,
            tax_standard: split.tax_standard,
            net_reduced: split.net_reduced,
            tax_reduced: split.tax_reduced,
            total: amount,
            issuer_id: request.issuer_id.clone(),
            issued_at: now,
            reprint_count: 0,
            voided: false,
            voided_at: None,
            voided_by: None,
            idempotency_key: request.idempotency_key.clone(),
        };
        self.storage.store_receipt(&txn, &receipt)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            receipt_no = %receipt.receipt_no,
            bill_id = %receipt.bill_id,
            total = receipt.total,
            "Receipt issued"
        );
        Ok(receipt)
    }

    /// Record a reprint of an issued receipt
    ///
    /// Amounts never change; only the reprint counter moves.
    pub fn reprint(&self, receipt_id: &str) -> SettlementResult<Receipt> {
        let txn = self.storage.begin_write()?;
        let mut receipt = self
            .storage
            .get_receipt_txn(&txn, receipt_id)?
            .ok_or_else(|| SettlementError::ReceiptNotFound(receipt_id.to_string()))?;

        if receipt.voided {
            return Err(SettlementError::AlreadyVoided(receipt_id.to_string()));
        }

        receipt.reprint_count += 1;
        self.storage.update_receipt(&txn, &receipt)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            receipt_no = %receipt.receipt_no,
            reprint_count = receipt.reprint_count,
            "Receipt reprinted"
        );
        Ok(receipt)
    }

    /// Void an issued receipt
    ///
    /// The record stays for audit; its amounts drop out of the issued
    /// sums, so the balance it covered becomes issuable again.
    pub fn void(&self, request: &ReceiptVoidRequest) -> SettlementResult<Receipt> {
        request.validate()?;
        if !self.directory.exists(&request.voided_by) {
            return Err(SettlementError::UserNotFound(request.voided_by.clone()));
        }

        let txn = self.storage.begin_write()?;
        let mut receipt = self
            .storage
            .get_receipt_txn(&txn, &request.receipt_id)?
            .ok_or_else(|| SettlementError::ReceiptNotFound(request.receipt_id.clone()))?;

        if receipt.voided {
            return Err(SettlementError::AlreadyVoided(request.receipt_id.clone()));
        }

        receipt.voided = true;
        receipt.voided_at = Some(self.clock.now_ms());
        receipt.voided_by = Some(request.voided_by.clone());
        self.storage.update_receipt(&txn, &receipt)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            receipt_no = %receipt.receipt_no,
            voided_by = %request.voided_by,
            "Receipt voided"
        );
        Ok(receipt)
    }

    // ========== Queries ==========

    /// Fetch a receipt
    pub fn receipt(&self, receipt_id: &str) -> SettlementResult<Receipt> {
        self.storage
            .get_receipt(receipt_id)?
            .ok_or_else(|| SettlementError::ReceiptNotFound(receipt_id.to_string()))
    }

    /// Per-bucket balance of a bill not yet covered by receipts
    pub fn remaining_balance(&self, bill_id: &str) -> SettlementResult<RemainingBalance> {
        let bill = self
            .storage
            .get_bill(bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(bill_id.to_string()))?;
        let lines = self.storage.get_lines_for_bill(bill_id)?;
        let receipts = self.storage.get_receipts_for_bill(bill_id)?;

        let totals = apportion::bucket_totals(&lines, bill.discount, &self.rates);
        Ok(remaining_after_issuance(&totals, &receipts))
    }

    /// Payment summary for a bill: totals, per-bucket breakdown, and
    /// what receipts still have left to cover
    pub fn summary(&self, bill_id: &str) -> SettlementResult<BillSummary> {
        let bill = self
            .storage
            .get_bill(bill_id)?
            .ok_or_else(|| SettlementError::BillNotFound(bill_id.to_string()))?;
        let lines = self.storage.get_lines_for_bill(bill_id)?;
        let receipts = self.storage.get_receipts_for_bill(bill_id)?;

        let totals = apportion::bucket_totals(&lines, bill.discount, &self.rates);
        let remaining = remaining_after_issuance(&totals, &receipts);

        Ok(BillSummary {
            bill_id: bill.id,
            status: bill.status,
            subtotal: bill.subtotal,
            discount: bill.discount,
            total: bill.total,
            standard: BucketBreakdown {
                net: totals.net_standard,
                tax: totals.tax_standard,
                gross: totals.gross_standard(),
            },
            reduced: BucketBreakdown {
                net: totals.net_reduced,
                tax: totals.tax_reduced,
                gross: totals.gross_reduced(),
            },
            remaining,
        })
    }

    /// All receipts issued against a bill, newest first
    pub fn receipts_for_bill(&self, bill_id: &str) -> SettlementResult<Vec<ReceiptView>> {
        let mut receipts = self.storage.get_receipts_for_bill(bill_id)?;
        receipts.sort_by(|a, b| {
            b.issued_at
                .cmp(&a.issued_at)
                .then_with(|| b.receipt_no.cmp(&a.receipt_no))
        });

        Ok(receipts
            .into_iter()
            .map(|receipt| ReceiptView {
                issuer_name: self.directory.display_name(&receipt.issuer_id),
                voided_by_name: receipt
                    .voided_by
                    .as_deref()
                    .and_then(|id| self.directory.display_name(id)),
                receipt_id: receipt.id,
                bill_id: receipt.bill_id,
                receipt_no: receipt.receipt_no,
                net_standard: receipt.net_standard,
                tax_standard: receipt.tax_standard,
                net_reduced: receipt.net_reduced,
                tax_reduced: receipt.tax_reduced,
                total: receipt.total,
                issued_at: receipt.issued_at,
                reprint_count: receipt.reprint_count,
                voided: receipt.voided,
                voided_at: receipt.voided_at,
            })
            .collect())
    }

    // ========== Internals ==========

    /// Remaining balance computed inside the issuing transaction
    fn remaining_in_txn(
        &self,
        txn: &WriteTransaction,
        bill: &Bill,
    ) -> SettlementResult<RemainingBalance> {
        let lines = self.storage.get_lines_for_bill_txn(txn, &bill.id)?;
        let receipts = self.storage.get_receipts_for_bill_txn(txn, &bill.id)?;
        let totals = apportion::bucket_totals(&lines, bill.discount, &self.rates);
        Ok(remaining_after_issuance(&totals, &receipts))
    }

    /// Business day (yyyymmdd) the configured timezone says `now_ms` falls on
    fn business_day(&self, now_ms: i64) -> u64 {
        let date_str = DateTime::from_timestamp_millis(now_ms)
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.tz)
            .format("%Y%m%d")
            .to_string();
        date_str.parse().unwrap_or_default()
    }
}

/// Bucket totals minus the gross of every non-voided receipt
fn remaining_after_issuance(totals: &TaxSplit, receipts: &[Receipt]) -> RemainingBalance {
    let mut issued_standard: i64 = 0;
    let mut issued_reduced: i64 = 0;
    for receipt in receipts.iter().filter(|r| !r.voided) {
        issued_standard += receipt.gross_standard();
        issued_reduced += receipt.gross_reduced();
    }

    RemainingBalance {
        standard: (totals.gross_standard() - issued_standard).max(0),
        reduced: (totals.gross_reduced() - issued_reduced).max(0),
    }
}
