mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::faults::{faulty_handle, Faults};
use lubetrack_api::errors::ServiceError;
use lubetrack_api::events::ChangeFeed;
use lubetrack_api::models::{
    Direction, InventoryItem, ItemUpdate, NewItem, NewTransaction, Quantity, TransactionFilter,
};
use lubetrack_api::services::ledger::StockLedger;
use lubetrack_api::store::StoreHandle;
use rstest::rstest;

#[derive(Debug, Clone, Copy)]
enum Backing {
    Local,
    Sqlite,
}

async fn ledger(backing: Backing) -> StockLedger {
    let store: StoreHandle = match backing {
        Backing::Local => common::local_handle(),
        Backing::Sqlite => common::sqlite_handle().await,
    };
    StockLedger::new(store, ChangeFeed::default(), common::clock_on("2024-06-02"))
}

fn q(value: f64) -> Quantity {
    Quantity::from_f64(value).expect("finite quantity")
}

async fn oil(ledger: &StockLedger, name: &str, opening: f64) -> InventoryItem {
    ledger
        .create_item(NewItem {
            name: name.to_string(),
            item_type: "Oil".into(),
            opening_stock: q(opening),
            unit: "L".into(),
            min_threshold: q(20.0),
        })
        .await
        .expect("create item")
}

fn movement(item: &InventoryItem, direction: Direction, amount: f64) -> NewTransaction {
    NewTransaction {
        inventory_id: item.id.clone(),
        direction,
        amount: q(amount),
        user: "Zhang".into(),
    }
}

async fn stock_of(ledger: &StockLedger, id: &str) -> Quantity {
    ledger
        .list_items()
        .await
        .expect("list items")
        .into_iter()
        .find(|item| item.id == id)
        .map(|item| item.stock)
        .expect("item present")
}

#[rstest]
#[case::local(Backing::Local)]
#[case::sqlite(Backing::Sqlite)]
#[tokio::test]
async fn record_edit_delete_keeps_stock_in_step(#[case] backing: Backing) {
    let ledger = ledger(backing).await;
    let item = oil(&ledger, "ISO VG 68", 100.0).await;

    let tx = ledger
        .record_transaction(movement(&item, Direction::Out, 30.0))
        .await
        .unwrap();
    assert_eq!(stock_of(&ledger, &item.id).await, q(70.0));
    assert_eq!(tx.inventory_name, "ISO VG 68");

    ledger
        .edit_transaction(&tx.id, movement(&item, Direction::Out, 10.0))
        .await
        .unwrap();
    assert_eq!(stock_of(&ledger, &item.id).await, q(90.0));

    ledger.delete_transaction(&tx.id).await.unwrap();
    assert_eq!(stock_of(&ledger, &item.id).await, q(100.0));

    let report = ledger.reconcile(&item.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.transaction_count, 0);
}

#[rstest]
#[case::local(Backing::Local)]
#[case::sqlite(Backing::Sqlite)]
#[tokio::test]
async fn editing_with_identical_values_changes_nothing(#[case] backing: Backing) {
    let ledger = ledger(backing).await;
    let item = oil(&ledger, "EP2 grease", 50.0).await;
    let tx = ledger
        .record_transaction(movement(&item, Direction::In, 12.5))
        .await
        .unwrap();

    for _ in 0..3 {
        ledger
            .edit_transaction(&tx.id, movement(&item, Direction::In, 12.5))
            .await
            .unwrap();
    }
    assert_eq!(stock_of(&ledger, &item.id).await, q(62.5));
    assert!(ledger.reconcile(&item.id).await.unwrap().consistent);
}

#[rstest]
#[case::local(Backing::Local)]
#[case::sqlite(Backing::Sqlite)]
#[tokio::test]
async fn delete_then_re_add_returns_to_the_same_stock(#[case] backing: Backing) {
    let ledger = ledger(backing).await;
    let item = oil(&ledger, "Gear oil", 40.0).await;

    let tx = ledger
        .record_transaction(movement(&item, Direction::Out, 15.25))
        .await
        .unwrap();
    let after_first = stock_of(&ledger, &item.id).await;

    ledger.delete_transaction(&tx.id).await.unwrap();
    assert_eq!(stock_of(&ledger, &item.id).await, q(40.0));

    ledger
        .record_transaction(movement(&item, Direction::Out, 15.25))
        .await
        .unwrap();
    assert_eq!(stock_of(&ledger, &item.id).await, after_first);
}

#[rstest]
#[case::local(Backing::Local)]
#[case::sqlite(Backing::Sqlite)]
#[tokio::test]
async fn moving_a_transaction_to_another_item(#[case] backing: Backing) {
    let ledger = ledger(backing).await;
    let hydraulic = oil(&ledger, "Hydraulic oil", 100.0).await;
    let turbine = oil(&ledger, "Turbine oil", 50.0).await;

    let tx = ledger
        .record_transaction(movement(&hydraulic, Direction::Out, 30.0))
        .await
        .unwrap();
    let moved = ledger
        .edit_transaction(&tx.id, movement(&turbine, Direction::In, 5.0))
        .await
        .unwrap();

    assert_eq!(moved.inventory_id, turbine.id);
    assert_eq!(moved.inventory_name, "Turbine oil");
    assert_eq!(stock_of(&ledger, &hydraulic.id).await, q(100.0));
    assert_eq!(stock_of(&ledger, &turbine.id).await, q(55.0));
    assert!(ledger.reconcile(&hydraulic.id).await.unwrap().consistent);
    assert!(ledger.reconcile(&turbine.id).await.unwrap().consistent);
}

#[rstest]
#[case::local(Backing::Local)]
#[case::sqlite(Backing::Sqlite)]
#[tokio::test]
async fn editing_or_deleting_unknown_transactions_is_not_found(#[case] backing: Backing) {
    let ledger = ledger(backing).await;
    let item = oil(&ledger, "Spindle oil", 10.0).await;

    assert_matches!(
        ledger
            .edit_transaction("missing", movement(&item, Direction::In, 1.0))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        ledger.delete_transaction("missing").await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(stock_of(&ledger, &item.id).await, q(10.0));
}

#[tokio::test]
async fn items_with_history_cannot_be_deleted() {
    let ledger = ledger(Backing::Local).await;
    let item = oil(&ledger, "Chain oil", 10.0).await;
    let tx = ledger
        .record_transaction(movement(&item, Direction::Out, 2.0))
        .await
        .unwrap();

    assert_matches!(
        ledger.delete_item(&item.id).await,
        Err(ServiceError::Conflict(_))
    );

    ledger.delete_transaction(&tx.id).await.unwrap();
    ledger.delete_item(&item.id).await.unwrap();
    assert!(ledger.list_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn metadata_edits_leave_stock_alone() {
    let ledger = ledger(Backing::Local).await;
    let item = oil(&ledger, "Compressor oil", 30.0).await;
    ledger
        .record_transaction(movement(&item, Direction::Out, 5.0))
        .await
        .unwrap();

    let updated = ledger
        .update_item(
            &item.id,
            ItemUpdate {
                name: "Compressor oil 46".into(),
                item_type: "Oil".into(),
                unit: "L".into(),
                min_threshold: q(30.0),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.stock, q(25.0));
    assert_eq!(updated.opening_stock, q(30.0));

    let low: Vec<_> = ledger
        .low_stock_items()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(low, vec![item.id]);
}

#[tokio::test]
async fn transactions_filter_by_item() {
    let ledger = ledger(Backing::Sqlite).await;
    let a = oil(&ledger, "A", 10.0).await;
    let b = oil(&ledger, "B", 10.0).await;
    ledger
        .record_transaction(movement(&a, Direction::In, 1.0))
        .await
        .unwrap();
    ledger
        .record_transaction(movement(&b, Direction::In, 2.0))
        .await
        .unwrap();

    let only_b = ledger
        .list_transactions(TransactionFilter {
            inventory_id: Some(b.id.clone()),
        })
        .await
        .unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].amount, q(2.0));
    assert_eq!(
        ledger
            .list_transactions(TransactionFilter::default())
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn concurrent_movements_on_one_item_all_land() {
    let ledger = ledger(Backing::Local).await;
    let item = oil(&ledger, "Bearing grease", 0.0).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let ledger = ledger.clone();
        let input = movement(&item, Direction::In, 1.5);
        tasks.push(tokio::spawn(async move {
            ledger.record_transaction(input).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(stock_of(&ledger, &item.id).await, q(30.0));
    assert!(ledger.reconcile(&item.id).await.unwrap().consistent);
}

#[rstest]
#[case::local(Backing::Local)]
#[case::sqlite(Backing::Sqlite)]
#[tokio::test]
async fn movements_past_the_stock_maximum_are_rejected(#[case] backing: Backing) {
    let ledger = ledger(backing).await;
    let item = oil(&ledger, "Bulk base oil", 9.0e11).await;

    assert_matches!(
        ledger
            .record_transaction(movement(&item, Direction::In, 9.0e11))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(stock_of(&ledger, &item.id).await, q(9.0e11));
    assert!(ledger
        .list_transactions(TransactionFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(ledger.reconcile(&item.id).await.unwrap().consistent);
}

fn faulty_ledger() -> (StockLedger, Arc<Faults>) {
    let (store, faults) = faulty_handle();
    let ledger = StockLedger::new(store, ChangeFeed::default(), common::clock_on("2024-06-02"));
    (ledger, faults)
}

#[tokio::test]
async fn failed_transaction_write_restores_stock() {
    let (ledger, faults) = faulty_ledger();
    let item = oil(&ledger, "ISO VG 68", 100.0).await;

    faults.fail_transaction_writes(true);
    assert_matches!(
        ledger
            .record_transaction(movement(&item, Direction::Out, 30.0))
            .await,
        Err(ServiceError::DatabaseError(_))
    );

    assert_eq!(stock_of(&ledger, &item.id).await, q(100.0));
    assert!(ledger
        .list_transactions(TransactionFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(ledger.reconcile(&item.id).await.unwrap().consistent);
}

#[tokio::test]
async fn failed_move_restores_both_items() {
    let (ledger, faults) = faulty_ledger();
    let hydraulic = oil(&ledger, "Hydraulic oil", 100.0).await;
    let turbine = oil(&ledger, "Turbine oil", 50.0).await;
    let tx = ledger
        .record_transaction(movement(&hydraulic, Direction::Out, 30.0))
        .await
        .unwrap();

    faults.fail_transaction_writes(true);
    assert_matches!(
        ledger
            .edit_transaction(&tx.id, movement(&turbine, Direction::In, 5.0))
            .await,
        Err(ServiceError::DatabaseError(_))
    );

    assert_eq!(stock_of(&ledger, &hydraulic.id).await, q(70.0));
    assert_eq!(stock_of(&ledger, &turbine.id).await, q(50.0));
    assert!(ledger.reconcile(&hydraulic.id).await.unwrap().consistent);
    assert!(ledger.reconcile(&turbine.id).await.unwrap().consistent);
}

#[tokio::test]
async fn refused_undo_of_a_move_is_reported_as_ledger_inconsistent() {
    let (ledger, faults) = faulty_ledger();
    let hydraulic = oil(&ledger, "Hydraulic oil", 100.0).await;
    let turbine = oil(&ledger, "Turbine oil", 50.0).await;
    let tx = ledger
        .record_transaction(movement(&hydraulic, Direction::Out, 30.0))
        .await
        .unwrap();

    // the old item is credited back, then every later adjustment fails
    faults.allow_adjustments(1);
    let result = ledger
        .edit_transaction(&tx.id, movement(&turbine, Direction::In, 5.0))
        .await;
    assert_matches!(result, Err(ServiceError::LedgerInconsistent(_)));
    faults.allow_adjustments(usize::MAX);

    assert_eq!(stock_of(&ledger, &hydraulic.id).await, q(100.0));
    assert_eq!(stock_of(&ledger, &turbine.id).await, q(50.0));
    assert!(!ledger.reconcile(&hydraulic.id).await.unwrap().consistent);
}

#[tokio::test]
async fn failed_delete_keeps_transaction_and_stock() {
    let (ledger, faults) = faulty_ledger();
    let item = oil(&ledger, "Gear oil", 100.0).await;
    let tx = ledger
        .record_transaction(movement(&item, Direction::Out, 30.0))
        .await
        .unwrap();

    faults.fail_transaction_writes(true);
    assert_matches!(
        ledger.delete_transaction(&tx.id).await,
        Err(ServiceError::DatabaseError(_))
    );

    assert_eq!(stock_of(&ledger, &item.id).await, q(70.0));
    assert_eq!(
        ledger
            .list_transactions(TransactionFilter::default())
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(ledger.reconcile(&item.id).await.unwrap().consistent);
}

#[tokio::test]
async fn failed_reversal_is_reported_as_ledger_inconsistent() {
    let (ledger, faults) = faulty_ledger();
    let item = oil(&ledger, "Chain oil", 100.0).await;

    faults.fail_transaction_writes(true);
    faults.allow_adjustments(1);
    assert_matches!(
        ledger
            .record_transaction(movement(&item, Direction::Out, 30.0))
            .await,
        Err(ServiceError::LedgerInconsistent(_))
    );

    let report = ledger.reconcile(&item.id).await.unwrap();
    assert!(!report.consistent);
    assert_eq!(report.expected, q(100.0));
    assert_eq!(report.actual, q(70.0));
}
