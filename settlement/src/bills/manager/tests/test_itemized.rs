use super::*;

fn two_line_bill(manager: &BillManager) -> (Visit, Bill, Vec<BillLine>) {
    let (visit, bill) = open_bill_with_lines(
        manager,
        None,
        vec![
            line_input("item-ramen", "Shoyu Ramen", 2, 1600, TaxBucket::Standard),
            line_input("item-beer", "Draft Beer", 3, 1500, TaxBucket::Standard),
        ],
    );
    let lines = manager.lines(&bill.id).unwrap();
    (visit, bill, lines)
}

fn line_by_ref<'a>(lines: &'a [BillLine], item_ref: &str) -> &'a BillLine {
    lines.iter().find(|l| l.item_ref == item_ref).unwrap()
}

#[test]
fn test_itemized_moves_selected_quantities() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");
    let beer = line_by_ref(&lines, "item-beer");

    let child = manager
        .settle(&itemized_request(
            &bill.id,
            &[(&ramen.id, 1), (&beer.id, 2)],
            2000,
            0,
        ))
        .unwrap();

    // 800 + 1000 pre-tax moved over, taxed at 10%
    assert_eq!(child.subtotal, 1800);
    assert_eq!(child.total, 1980);
    assert_eq!(child.status, BillStatus::Partial);
    assert_eq!(child.split_index, None);

    let child_lines = manager.lines(&child.id).unwrap();
    assert_eq!(child_lines.len(), 2);
    assert_eq!(line_by_ref(&child_lines, "item-ramen").quantity, 1);
    assert_eq!(line_by_ref(&child_lines, "item-ramen").subtotal, 800);
    assert_eq!(line_by_ref(&child_lines, "item-beer").quantity, 2);
    assert_eq!(line_by_ref(&child_lines, "item-beer").subtotal, 1000);

    let root_lines = manager.lines(&bill.id).unwrap();
    assert_eq!(line_by_ref(&root_lines, "item-ramen").quantity, 1);
    assert_eq!(line_by_ref(&root_lines, "item-ramen").subtotal, 800);
    assert_eq!(line_by_ref(&root_lines, "item-beer").quantity, 1);
    assert_eq!(line_by_ref(&root_lines, "item-beer").subtotal, 500);

    let root = manager.bill(&bill.id).unwrap();
    assert_eq!(root.status, BillStatus::Partial);
}

#[test]
fn test_line_drained_to_zero_is_deleted() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    manager
        .settle(&itemized_request(&bill.id, &[(&ramen.id, 2)], 1760, 0))
        .unwrap();

    let root_lines = manager.lines(&bill.id).unwrap();
    assert_eq!(root_lines.len(), 1);
    assert!(root_lines.iter().all(|l| l.item_ref != "item-ramen"));
}

#[test]
fn test_exhausting_all_lines_completes_root() {
    let manager = create_test_manager();
    let (visit, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");
    let beer = line_by_ref(&lines, "item-beer");

    manager
        .settle(&itemized_request(&bill.id, &[(&ramen.id, 2)], 1760, 0))
        .unwrap();
    let final_child = manager
        .settle(&itemized_request(&bill.id, &[(&beer.id, 3)], 1650, 0))
        .unwrap();
    assert_eq!(final_child.status, BillStatus::Completed);

    let root = manager.bill(&bill.id).unwrap();
    assert_eq!(root.status, BillStatus::Completed);
    assert!(manager.lines(&bill.id).unwrap().is_empty());

    // Fragments reconstruct the whole bill
    let children = manager.storage().get_children(&bill.id).unwrap();
    assert_eq!(children.iter().map(|c| c.subtotal).sum::<i64>(), 3100);
    assert_eq!(children.iter().map(|c| c.total).sum::<i64>(), 3410);
    assert_eq!(root.total, 3410);

    assert!(!manager.visit(&visit.id).unwrap().active);
}

#[test]
fn test_quantity_unavailable_rejected() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    let result = manager.settle(&itemized_request(&bill.id, &[(&ramen.id, 3)], 5000, 0));
    assert!(matches!(
        result,
        Err(SettlementError::QuantityUnavailable {
            available: 2,
            requested: 3,
            ..
        })
    ));
}

#[test]
fn test_failed_selection_rolls_back_everything() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");
    let beer = line_by_ref(&lines, "item-beer");

    // Second selection over-asks; the first must not land either
    let result = manager.settle(&itemized_request(
        &bill.id,
        &[(&ramen.id, 1), (&beer.id, 9)],
        9000,
        0,
    ));
    assert!(result.is_err());

    let root_lines = manager.lines(&bill.id).unwrap();
    assert_eq!(line_by_ref(&root_lines, "item-ramen").quantity, 2);
    assert_eq!(line_by_ref(&root_lines, "item-beer").quantity, 3);
    assert!(manager.storage().get_children(&bill.id).unwrap().is_empty());
    assert_eq!(manager.bill(&bill.id).unwrap().status, BillStatus::Open);
}

#[test]
fn test_duplicate_selection_rejected() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    let result = manager.settle(&itemized_request(
        &bill.id,
        &[(&ramen.id, 1), (&ramen.id, 1)],
        5000,
        0,
    ));
    assert!(matches!(result, Err(SettlementError::Validation(_))));
}

#[test]
fn test_itemized_in_progress_blocks_split() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    manager
        .settle(&itemized_request(&bill.id, &[(&ramen.id, 1)], 880, 0))
        .unwrap();
    let result = manager.settle(&split_request(&bill.id, 2, 1, 2000));
    assert!(matches!(result, Err(SettlementError::ModeConflict(_))));
}

#[test]
fn test_unknown_line_rejected() {
    let manager = create_test_manager();
    let (_, bill, _) = two_line_bill(&manager);

    let result = manager.settle(&itemized_request(&bill.id, &[("no-such-line", 1)], 5000, 0));
    assert!(matches!(result, Err(SettlementError::LineNotFound(_))));
}

#[test]
fn test_fragment_discount_reduces_total() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    let child = manager
        .settle(&itemized_request(&bill.id, &[(&ramen.id, 1)], 700, 180))
        .unwrap();

    // 800 taxed to 880, minus the fragment discount
    assert_eq!(child.total, 700);
    assert_eq!(child.discount, 180);
}

#[test]
fn test_fragment_discount_floors_at_zero() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    let child = manager
        .settle(&itemized_request(&bill.id, &[(&ramen.id, 1)], 0, 5000))
        .unwrap();
    assert_eq!(child.total, 0);
}

#[test]
fn test_child_lines_leave_line_discount_behind() {
    let manager = create_test_manager();
    let (_, bill) = open_bill_with_lines(
        &manager,
        None,
        vec![LineInput {
            item_ref: "item-set".to_string(),
            item_name: "Lunch Set".to_string(),
            quantity: 2,
            subtotal: 2000,
            tax_bucket: TaxBucket::Standard,
            line_discount: 200,
        }],
    );
    let lines = manager.lines(&bill.id).unwrap();

    let child = manager
        .settle(&itemized_request(&bill.id, &[(&lines[0].id, 1)], 1100, 0))
        .unwrap();

    let child_lines = manager.lines(&child.id).unwrap();
    assert_eq!(child_lines[0].line_discount, 0);
    assert_eq!(child_lines[0].subtotal, 1000);
    // Moved quantity is taxed undiscounted
    assert_eq!(child.total, 1100);

    let root_lines = manager.lines(&bill.id).unwrap();
    assert_eq!(root_lines[0].line_discount, 200);
    assert_eq!(root_lines[0].subtotal, 1000);
}

#[test]
fn test_insufficient_deposit_rejected() {
    let manager = create_test_manager();
    let (_, bill, lines) = two_line_bill(&manager);
    let ramen = line_by_ref(&lines, "item-ramen");

    let result = manager.settle(&itemized_request(&bill.id, &[(&ramen.id, 1)], 879, 0));
    assert!(matches!(
        result,
        Err(SettlementError::InsufficientDeposit {
            required: 880,
            tendered: 879
        })
    ));
}

#[test]
fn test_partial_takes_conserve_line_subtotal() {
    let manager = create_test_manager();
    let (_, bill) = open_bill_with_lines(
        &manager,
        None,
        vec![line_input("item-gyoza", "Gyoza", 3, 1000, TaxBucket::Standard)],
    );
    let line_id = manager.lines(&bill.id).unwrap()[0].id.clone();

    // 1000 over three single takes: 333 + 333 + 334
    let first = manager
        .settle(&itemized_request(&bill.id, &[(&line_id, 1)], 400, 0))
        .unwrap();
    assert_eq!(first.subtotal, 333);

    let second = manager
        .settle(&itemized_request(&bill.id, &[(&line_id, 1)], 400, 0))
        .unwrap();
    assert_eq!(second.subtotal, 333);

    let third = manager
        .settle(&itemized_request(&bill.id, &[(&line_id, 1)], 400, 0))
        .unwrap();
    assert_eq!(third.subtotal, 334);

    assert_eq!(first.subtotal + second.subtotal + third.subtotal, 1000);
    assert_eq!(manager.bill(&bill.id).unwrap().status, BillStatus::Completed);
}

#[test]
fn test_mixed_buckets_price_per_line() {
    let manager = create_test_manager();
    let (_, bill) = open_bill_with_lines(
        &manager,
        None,
        vec![
            line_input("item-ramen", "Shoyu Ramen", 1, 800, TaxBucket::Standard),
            line_input("item-bento", "Takeout Bento", 1, 1000, TaxBucket::Reduced),
        ],
    );
    let lines = manager.lines(&bill.id).unwrap();
    let ramen = line_by_ref(&lines, "item-ramen");
    let bento = line_by_ref(&lines, "item-bento");

    let child = manager
        .settle(&itemized_request(
            &bill.id,
            &[(&ramen.id, 1), (&bento.id, 1)],
            2000,
            0,
        ))
        .unwrap();

    // 800 * 1.10 + 1000 * 1.08
    assert_eq!(child.total, 1960);
    assert_eq!(child.status, BillStatus::Completed);
}
