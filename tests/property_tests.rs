//! Property-based tests for the stock ledger.
//!
//! Random record/edit/delete sequences must always leave every item's stock
//! equal to its opening stock plus the signed amounts still on the books.

mod common;

use lubetrack_api::events::ChangeFeed;
use lubetrack_api::models::{Direction, NewItem, NewTransaction, Quantity};
use lubetrack_api::services::ledger::StockLedger;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Record { item: usize, inbound: bool, cents: i64 },
    Edit { pick: usize, item: usize, inbound: bool, cents: i64 },
    Delete { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..2, any::<bool>(), 1i64..50_000)
            .prop_map(|(item, inbound, cents)| Op::Record { item, inbound, cents }),
        (any::<usize>(), 0usize..2, any::<bool>(), 1i64..50_000).prop_map(
            |(pick, item, inbound, cents)| Op::Edit {
                pick,
                item,
                inbound,
                cents
            }
        ),
        any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

fn movement(item_id: &str, inbound: bool, cents: i64) -> NewTransaction {
    NewTransaction {
        inventory_id: item_id.to_string(),
        direction: if inbound { Direction::In } else { Direction::Out },
        amount: Quantity::from_hundredths(cents),
        user: "prop".into(),
    }
}

fn signed(inbound: bool, cents: i64) -> i64 {
    if inbound {
        cents
    } else {
        -cents
    }
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let ledger = StockLedger::new(
        common::local_handle(),
        ChangeFeed::default(),
        common::clock_on("2024-06-02"),
    );
    let openings = [10_000i64, 2_500];
    let mut item_ids = Vec::new();
    for (n, opening) in openings.iter().enumerate() {
        let item = ledger
            .create_item(NewItem {
                name: format!("Oil {}", n),
                item_type: "Oil".into(),
                opening_stock: Quantity::from_hundredths(*opening),
                unit: "L".into(),
                min_threshold: Quantity::ZERO,
            })
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        item_ids.push(item.id);
    }

    // (transaction id, item index, signed hundredths)
    let mut books: Vec<(String, usize, i64)> = Vec::new();

    for op in ops {
        match op {
            Op::Record {
                item,
                inbound,
                cents,
            } => {
                let tx = ledger
                    .record_transaction(movement(&item_ids[item], inbound, cents))
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                books.push((tx.id, item, signed(inbound, cents)));
            }
            Op::Edit {
                pick,
                item,
                inbound,
                cents,
            } => {
                if books.is_empty() {
                    continue;
                }
                let slot = pick % books.len();
                ledger
                    .edit_transaction(&books[slot].0, movement(&item_ids[item], inbound, cents))
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                books[slot].1 = item;
                books[slot].2 = signed(inbound, cents);
            }
            Op::Delete { pick } => {
                if books.is_empty() {
                    continue;
                }
                let (id, _, _) = books.remove(pick % books.len());
                ledger
                    .delete_transaction(&id)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
        }
    }

    let items = ledger
        .list_items()
        .await
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    for (index, id) in item_ids.iter().enumerate() {
        let expected = openings[index]
            + books
                .iter()
                .filter(|(_, item, _)| *item == index)
                .map(|(_, _, amount)| amount)
                .sum::<i64>();
        let stock = items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.stock.hundredths());
        prop_assert_eq!(stock, Some(expected));

        let report = ledger
            .reconcile(id)
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(report.consistent);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stock_always_matches_the_books(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        runtime.block_on(run(ops))?;
    }
}
