//! Settlement Walkthrough - a visit from check-in to receipt
//!
//! This example runs the whole settlement flow against a throwaway
//! database:
//! 1. Check a party in and compose its bill
//! 2. Split the bill into two even shares and settle both
//! 3. Issue a full tax receipt against the settled bill
//! 4. Reprint and list the receipts
//!
//! Run: cargo run -p settlement --example settle_walkthrough

use settlement::{BillManager, BroadcastVisitNotifier, InMemoryUserDirectory, ReceiptLedger};
use shared::billing::{
    LineInput, ReceiptIssueRequest, ReceiptMode, SettlementRequest, SplitPaymentRequest, TaxBucket,
    TaxRates,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    settlement::init_logger();

    println!("=== Settlement Walkthrough ===\n");

    // === 1. Open the ledger ===
    let data_dir = std::env::temp_dir().join("settlement-walkthrough");
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("ledger.redb");

    let directory = Arc::new(InMemoryUserDirectory::new());
    directory.register("cashier-1", "Aoi Tanaka");

    let notifier = Arc::new(BroadcastVisitNotifier::default());
    let mut checkout_rx = notifier.subscribe();

    let mut manager = BillManager::new(&db_path, TaxRates::default())?;
    manager.set_directory(directory.clone());
    manager.set_notifier(notifier);
    println!("1. Ledger open at {}\n", db_path.display());

    // === 2. Check in and compose the bill ===
    let (visit, bill) = manager.open_bill(Some("table-5".to_string()), Some(2))?;
    manager.add_line(
        &bill.id,
        LineInput {
            item_ref: "menu-ramen".to_string(),
            item_name: "Shoyu Ramen".to_string(),
            quantity: 2,
            subtotal: 1600,
            tax_bucket: TaxBucket::Standard,
            line_discount: 0,
        },
    )?;
    manager.add_line(
        &bill.id,
        LineInput {
            item_ref: "menu-bento".to_string(),
            item_name: "Takeout Bento".to_string(),
            quantity: 1,
            subtotal: 1000,
            tax_bucket: TaxBucket::Reduced,
            line_discount: 0,
        },
    )?;
    let bill = manager.bill(&bill.id)?;
    println!(
        "2. Visit {} seated at table-5, bill total {} (tax included)\n",
        visit.id, bill.total
    );

    // === 3. Settle in two even shares ===
    let mut event_rx = manager.subscribe();
    for index in 1..=2 {
        let share = manager.settle(&SettlementRequest::Split(SplitPaymentRequest {
            bill_id: bill.id.clone(),
            split_count: 2,
            split_index: index,
            payment_method_id: "cash".to_string(),
            cashier_id: "cashier-1".to_string(),
            deposit: 1500,
            settled_at: shared::util::now_millis(),
        }))?;
        println!(
            "3.{index} Share {index}/2 settled: {} paid, {} change",
            share.total,
            share.deposit - share.total
        );
    }
    while let Ok(event) = event_rx.try_recv() {
        println!("    event: {:?} amount {}", event.kind, event.amount);
    }
    if let Ok(notice) = checkout_rx.try_recv() {
        println!("    visit {} checked out, total {}\n", notice.visit_id, notice.total);
    }

    // === 4. Issue the tax receipt ===
    let mut ledger = ReceiptLedger::new(
        manager.storage().clone(),
        manager.rates(),
        chrono_tz::Asia::Tokyo,
    );
    ledger.set_directory(directory);

    let receipt = ledger.issue(&ReceiptIssueRequest {
        bill_id: bill.id.clone(),
        mode: ReceiptMode::Full,
        amount: None,
        issuer_id: "cashier-1".to_string(),
        idempotency_key: Some("walkthrough-1".to_string()),
    })?;
    println!("4. Receipt {} issued, total {}", receipt.receipt_no, receipt.total);
    println!(
        "    standard: net {} tax {} / reduced: net {} tax {}",
        receipt.net_standard, receipt.tax_standard, receipt.net_reduced, receipt.tax_reduced
    );

    // === 5. Reprint and list ===
    let reprinted = ledger.reprint(&receipt.id)?;
    println!("5. Reprinted ({} reprint so far)", reprinted.reprint_count);
    for view in ledger.receipts_for_bill(&bill.id)? {
        println!(
            "    {} | total {} | issued by {} | voided: {}",
            view.receipt_no,
            view.total,
            view.issuer_name.as_deref().unwrap_or("?"),
            view.voided
        );
    }

    let stats = manager.storage().get_stats()?;
    println!(
        "\nStored: {} bills, {} lines, {} visits, {} receipts",
        stats.bill_count, stats.line_count, stats.visit_count, stats.receipt_count
    );

    Ok(())
}
