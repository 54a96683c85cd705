use super::*;
use crate::clock::FixedClock;
use crate::notify::BroadcastVisitNotifier;
use crate::receipts::ReceiptLedger;
use shared::billing::{
    ItemizedPaymentRequest, LineSelection, ReceiptIssueRequest, ReceiptMode, ReceiptVoidRequest,
    SplitPaymentRequest, TaxBucket,
};

/// 2024-01-15T00:00:00Z
const SETTLED_AT: i64 = 1_705_276_800_000;

fn test_directory() -> Arc<InMemoryUserDirectory> {
    let directory = InMemoryUserDirectory::new();
    directory.register("cashier-1", "Aoi Tanaka");
    directory.register("cashier-2", "Ren Sato");
    Arc::new(directory)
}

fn create_test_manager() -> BillManager {
    let storage = LedgerStorage::open_in_memory().unwrap();
    let mut manager = BillManager::with_storage(storage, TaxRates::default());
    manager.set_directory(test_directory());
    manager
}

fn create_test_ledger(manager: &BillManager) -> ReceiptLedger {
    let mut ledger = ReceiptLedger::new(
        manager.storage().clone(),
        manager.rates(),
        chrono_tz::Asia::Tokyo,
    );
    ledger.set_directory(test_directory());
    ledger
}

fn line_input(
    item_ref: &str,
    item_name: &str,
    quantity: u32,
    subtotal: i64,
    bucket: TaxBucket,
) -> LineInput {
    LineInput {
        item_ref: item_ref.to_string(),
        item_name: item_name.to_string(),
        quantity,
        subtotal,
        tax_bucket: bucket,
        line_discount: 0,
    }
}

// ========================================================================
// Helper: check a visit in and compose its bill
// ========================================================================

fn open_bill_with_lines(
    manager: &BillManager,
    party_size: Option<u32>,
    lines: Vec<LineInput>,
) -> (Visit, Bill) {
    let (visit, bill) = manager
        .open_bill(Some("table-1".to_string()), party_size)
        .unwrap();
    for input in lines {
        manager.add_line(&bill.id, input).unwrap();
    }
    let bill = manager.bill(&bill.id).unwrap();
    (visit, bill)
}

fn split_request(bill_id: &str, split_count: u32, split_index: u32, deposit: i64) -> SettlementRequest {
    SettlementRequest::Split(SplitPaymentRequest {
        bill_id: bill_id.to_string(),
        split_count,
        split_index,
        payment_method_id: "cash".to_string(),
        cashier_id: "cashier-1".to_string(),
        deposit,
        settled_at: SETTLED_AT,
    })
}

fn itemized_request(
    bill_id: &str,
    selections: &[(&str, u32)],
    deposit: i64,
    discount: i64,
) -> SettlementRequest {
    SettlementRequest::Itemized(ItemizedPaymentRequest {
        bill_id: bill_id.to_string(),
        selections: selections
            .iter()
            .map(|(line_id, quantity)| LineSelection {
                line_id: line_id.to_string(),
                quantity: *quantity,
            })
            .collect(),
        payment_method_id: "card".to_string(),
        cashier_id: "cashier-2".to_string(),
        deposit,
        discount,
        settled_at: SETTLED_AT,
    })
}

fn issue_request(bill_id: &str, mode: ReceiptMode, amount: Option<i64>) -> ReceiptIssueRequest {
    ReceiptIssueRequest {
        bill_id: bill_id.to_string(),
        mode,
        amount,
        issuer_id: "cashier-1".to_string(),
        idempotency_key: None,
    }
}

mod test_itemized;
mod test_receipts;
