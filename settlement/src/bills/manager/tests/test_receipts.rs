use super::*;

/// 500 standard + 300 reduced pre-tax: gross buckets {550, 324}
fn mixed_bucket_bill(manager: &BillManager) -> Bill {
    let (_, bill) = open_bill_with_lines(
        manager,
        None,
        vec![
            line_input("item-ramen", "Shoyu Ramen", 1, 500, TaxBucket::Standard),
            line_input("item-bento", "Takeout Bento", 1, 300, TaxBucket::Reduced),
        ],
    );
    bill
}

#[test]
fn test_full_receipt_covers_remaining() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();

    assert_eq!(receipt.total, 874);
    assert_eq!(receipt.net_standard, 500);
    assert_eq!(receipt.tax_standard, 50);
    assert_eq!(receipt.net_reduced, 300);
    assert_eq!(receipt.tax_reduced, 24);
    assert_eq!(receipt.reprint_count, 0);
    assert!(!receipt.voided);

    let remaining = ledger.remaining_balance(&bill.id).unwrap();
    assert_eq!(remaining.standard, 0);
    assert_eq!(remaining.reduced, 0);
}

#[test]
fn test_amount_receipt_apportions_across_buckets() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(400)))
        .unwrap();

    // 400 * 550/874 rounds to 252 standard, 148 reduced
    assert_eq!(receipt.total, 400);
    assert_eq!(receipt.net_standard, 229);
    assert_eq!(receipt.tax_standard, 23);
    assert_eq!(receipt.net_reduced, 137);
    assert_eq!(receipt.tax_reduced, 11);

    let remaining = ledger.remaining_balance(&bill.id).unwrap();
    assert_eq!(remaining.standard, 298);
    assert_eq!(remaining.reduced, 176);
}

#[test]
fn test_partial_then_full_exhausts_balance() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(400)))
        .unwrap();
    let second = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();

    assert_eq!(second.total, 474);
    assert_eq!(ledger.remaining_balance(&bill.id).unwrap().sum(), 0);
}

#[test]
fn test_amount_exceeding_remaining_rejected() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let result = ledger.issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(875)));
    assert!(matches!(
        result,
        Err(SettlementError::AmountExceedsRemaining {
            remaining: 874,
            requested: 875
        })
    ));
}

#[test]
fn test_full_with_nothing_remaining_rejected() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();
    let result = ledger.issue(&issue_request(&bill.id, ReceiptMode::Full, None));
    assert!(matches!(result, Err(SettlementError::Validation(_))));
}

#[test]
fn test_idempotent_issue_returns_original() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let mut request = issue_request(&bill.id, ReceiptMode::Amount, Some(400));
    request.idempotency_key = Some("terminal-7-req-42".to_string());

    let first = ledger.issue(&request).unwrap();
    let second = ledger.issue(&request).unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.receipt_no, first.receipt_no);
    assert_eq!(second.total, 400);

    // Exactly one receipt persisted; balance moved once
    assert_eq!(ledger.receipts_for_bill(&bill.id).unwrap().len(), 1);
    assert_eq!(ledger.remaining_balance(&bill.id).unwrap().sum(), 474);
}

#[test]
fn test_reprint_increments_count_only() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();

    let once = ledger.reprint(&receipt.id).unwrap();
    let twice = ledger.reprint(&receipt.id).unwrap();

    assert_eq!(once.reprint_count, 1);
    assert_eq!(twice.reprint_count, 2);
    assert_eq!(twice.total, receipt.total);
    assert_eq!(twice.receipt_no, receipt.receipt_no);
}

#[test]
fn test_void_restores_balance_keeps_audit_record() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(400)))
        .unwrap();
    assert_eq!(ledger.remaining_balance(&bill.id).unwrap().sum(), 474);

    let voided = ledger
        .void(&ReceiptVoidRequest {
            receipt_id: receipt.id.clone(),
            voided_by: "cashier-2".to_string(),
        })
        .unwrap();
    assert!(voided.voided);
    assert_eq!(voided.voided_by.as_deref(), Some("cashier-2"));
    assert!(voided.voided_at.is_some());

    // Balance restored, record retained
    let remaining = ledger.remaining_balance(&bill.id).unwrap();
    assert_eq!(remaining.standard, 550);
    assert_eq!(remaining.reduced, 324);
    assert_eq!(ledger.receipts_for_bill(&bill.id).unwrap().len(), 1);

    let replacement = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();
    assert_eq!(replacement.total, 874);
}

#[test]
fn test_void_twice_rejected() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();
    let void_request = ReceiptVoidRequest {
        receipt_id: receipt.id.clone(),
        voided_by: "cashier-1".to_string(),
    };

    ledger.void(&void_request).unwrap();
    let result = ledger.void(&void_request);
    assert!(matches!(result, Err(SettlementError::AlreadyVoided(_))));
}

#[test]
fn test_reprint_of_voided_receipt_rejected() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();
    ledger
        .void(&ReceiptVoidRequest {
            receipt_id: receipt.id.clone(),
            voided_by: "cashier-1".to_string(),
        })
        .unwrap();

    let result = ledger.reprint(&receipt.id);
    assert!(matches!(result, Err(SettlementError::AlreadyVoided(_))));
}

#[test]
fn test_receipt_numbers_increase_within_business_day() {
    let manager = create_test_manager();
    let mut ledger = create_test_ledger(&manager);
    ledger.set_clock(Arc::new(FixedClock(SETTLED_AT)));
    let bill = mixed_bucket_bill(&manager);

    let first = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(100)))
        .unwrap();
    let second = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(100)))
        .unwrap();

    // Midnight UTC on 2024-01-15 is 09:00 in Tokyo
    assert_eq!(first.receipt_no, "R20240115-0001");
    assert_eq!(second.receipt_no, "R20240115-0002");
    assert_eq!(first.issued_at, SETTLED_AT);
}

#[test]
fn test_unknown_issuer_rejected() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let mut request = issue_request(&bill.id, ReceiptMode::Full, None);
    request.issuer_id = "ghost".to_string();

    let result = ledger.issue(&request);
    assert!(matches!(result, Err(SettlementError::UserNotFound(_))));
}

#[test]
fn test_amount_mode_requires_amount() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    let result = ledger.issue(&issue_request(&bill.id, ReceiptMode::Amount, None));
    assert!(matches!(result, Err(SettlementError::Validation(_))));

    let result = ledger.issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(0)));
    assert!(matches!(result, Err(SettlementError::Validation(_))));
}

#[test]
fn test_bill_discount_shrinks_issuable_buckets() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);
    manager.set_discount(&bill.id, 100).unwrap();

    // 63 comes off standard, 37 off reduced
    let remaining = ledger.remaining_balance(&bill.id).unwrap();
    assert_eq!(remaining.standard, 487);
    assert_eq!(remaining.reduced, 287);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();
    assert_eq!(receipt.total, 774);
}

#[test]
fn test_receipt_against_itemized_fragment() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let (_, bill) = open_bill_with_lines(
        &manager,
        None,
        vec![line_input("item-ramen", "Shoyu Ramen", 1, 800, TaxBucket::Standard)],
    );
    let line_id = manager.lines(&bill.id).unwrap()[0].id.clone();

    let child = manager
        .settle(&itemized_request(&bill.id, &[(&line_id, 1)], 880, 0))
        .unwrap();

    // The fragment carries the moved lines, so receipts issue against it
    let receipt = ledger
        .issue(&issue_request(&child.id, ReceiptMode::Full, None))
        .unwrap();
    assert_eq!(receipt.total, 880);
    assert_eq!(receipt.net_standard, 800);
    assert_eq!(receipt.tax_standard, 80);
}

#[test]
fn test_receipt_respects_fragment_discount() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let (_, bill) = open_bill_with_lines(
        &manager,
        None,
        vec![line_input("item-ramen", "Shoyu Ramen", 1, 800, TaxBucket::Standard)],
    );
    let line_id = manager.lines(&bill.id).unwrap()[0].id.clone();

    let child = manager
        .settle(&itemized_request(&bill.id, &[(&line_id, 1)], 700, 180))
        .unwrap();
    assert_eq!(child.total, 700);

    let receipt = ledger
        .issue(&issue_request(&child.id, ReceiptMode::Full, None))
        .unwrap();
    assert_eq!(receipt.total, 700);
}

#[test]
fn test_receipt_against_split_settled_root() {
    let manager = create_test_manager();
    let ledger = create_test_ledger(&manager);
    let bill = mixed_bucket_bill(&manager);

    // Split settlement leaves the lines on the root
    manager.settle(&split_request(&bill.id, 2, 1, 437)).unwrap();
    manager.settle(&split_request(&bill.id, 2, 2, 437)).unwrap();
    assert_eq!(manager.bill(&bill.id).unwrap().status, BillStatus::Completed);

    let receipt = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Full, None))
        .unwrap();
    assert_eq!(receipt.total, 874);
    assert_eq!(receipt.net_standard, 500);
    assert_eq!(receipt.net_reduced, 300);
}

#[test]
fn test_listing_is_newest_first_with_names() {
    let manager = create_test_manager();
    let mut ledger = create_test_ledger(&manager);
    ledger.set_clock(Arc::new(FixedClock(SETTLED_AT)));
    let bill = mixed_bucket_bill(&manager);

    let first = ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(100)))
        .unwrap();
    ledger
        .issue(&issue_request(&bill.id, ReceiptMode::Amount, Some(200)))
        .unwrap();
    ledger
        .void(&ReceiptVoidRequest {
            receipt_id: first.id.clone(),
            voided_by: "cashier-2".to_string(),
        })
        .unwrap();

    let views = ledger.receipts_for_bill(&bill.id).unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].receipt_no, "R20240115-0002");
    assert_eq!(views[1].receipt_no, "R20240115-0001");
    assert_eq!(views[0].issuer_name.as_deref(), Some("Aoi Tanaka"));
    assert!(!views[0].voided);
    assert!(views[1].voided);
    assert_eq!(views[1].voided_by_name.as_deref(), Some("Ren Sato"));
}
