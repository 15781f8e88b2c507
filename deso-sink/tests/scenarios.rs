// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end ingestion scenarios, driven through the engine callbacks.

use std::sync::Arc;

use deso_base::{
    codec::BinaryCodec as _,
    crypto::{
        test_utils::{test_hash, test_pkid},
        CryptoHash,
    },
    data_types::Uint256,
    entries::{BalanceEntry, OperationType},
    prefixes,
    spending_limit::TransactionSpendingLimit,
    state_change::{Encoder, RecordKind, StateChangeEntry, StateSyncerOperation},
};
use deso_sink::{
    db::memory::MemoryDatabase,
    schema::{
        tables::{
            AFFECTED_PUBLIC_KEY, BALANCE, BLOCK, DAO_COIN_LIMIT_ORDER, DERIVED_KEY,
            SNAPSHOT_VALIDATOR, TRANSACTION, UTXO_OPERATION, VALIDATOR,
        },
        Row, SqlValue, Table,
    },
    test_utils::*,
    SinkEngine, StateChangeHandler as _,
};
use serde_json::json;

const ASK: u8 = 1;
const BID: u8 = 2;

fn engine(database: &MemoryDatabase) -> SinkEngine<MemoryDatabase> {
    SinkEngine::new(Arc::new(database.clone()), params())
}

fn value<'a>(table: &Table, row: &'a Row, column: &str) -> &'a SqlValue {
    row.get(table.row_index(column).unwrap()).unwrap()
}

fn pkid_address(byte: u8) -> String {
    test_pkid(byte).to_base58_check(&params())
}

fn dao_balance(hodler: u8, creator: u8, nanos: u64) -> StateChangeEntry {
    upsert(
        key(
            prefixes::HODLER_PKID_CREATOR_PKID_TO_DAO_COIN_BALANCE,
            &[test_pkid(hodler).as_bytes(), test_pkid(creator).as_bytes()],
        ),
        Encoder::Balance(BalanceEntry {
            hodler_pkid: test_pkid(hodler),
            creator_pkid: test_pkid(creator),
            balance_nanos: Uint256::from(nanos),
            has_purchased: false,
        }),
    )
}

fn order(id: &CryptoHash, transactor: u8, selling: u8, operation_type: u8) -> StateChangeEntry {
    upsert(
        dao_coin_limit_order_key(id),
        Encoder::DaoCoinLimitOrder(dao_coin_limit_order_entry(
            id,
            transactor,
            selling,
            Uint256::from(1_000_000_000u64),
            operation_type,
        )),
    )
}

fn filled(id: &CryptoHash) -> StateChangeEntry {
    StateChangeEntry::delete(
        RecordKind::DaoCoinLimitOrder,
        dao_coin_limit_order_key(id),
        11,
    )
}

#[tokio::test]
async fn test_filled_limit_orders_disappear() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let (coin, bidder, asker) = (1, 2, 3);

    engine
        .handle_entry_batch(&[dao_balance(coin, coin, 1_000_000_000_000)])
        .await
        .unwrap();
    engine
        .handle_entry_batch(&[
            dao_balance(coin, coin, 990_000_000_000),
            dao_balance(asker, coin, 10_000_000_000),
        ])
        .await
        .unwrap();
    assert_eq!(database.row_count(&BALANCE), 2);

    let ask = test_hash(10);
    engine
        .handle_entry_batch(&[order(&ask, asker, coin, ASK)])
        .await
        .unwrap();
    let rows = database.rows(&DAO_COIN_LIMIT_ORDER);
    assert_eq!(rows.len(), 1);
    let table = &DAO_COIN_LIMIT_ORDER;
    assert_eq!(
        value(table, &rows[0], "selling_dao_coin_creator_pkid").as_text(),
        Some(pkid_address(coin).as_str())
    );
    assert_eq!(
        value(table, &rows[0], "transactor_pkid").as_text(),
        Some(pkid_address(asker).as_str())
    );
    assert_eq!(
        value(table, &rows[0], "quantity_to_fill_base_units_hex").as_text(),
        Some("0x3b9aca00")
    );
    assert_eq!(value(table, &rows[0], "operation_type").as_i64(), Some(1));

    // The matching bid fills both orders within one upstream transaction.
    let bid = test_hash(11);
    engine.begin_transaction().await.unwrap();
    engine
        .handle_entry_batch(&[order(&bid, bidder, bidder, BID)])
        .await
        .unwrap();
    engine
        .handle_entry_batch(&[
            filled(&ask),
            filled(&bid),
        ])
        .await
        .unwrap();
    engine.commit_transaction().await.unwrap();
    assert_eq!(database.committed_rows(&DAO_COIN_LIMIT_ORDER).len(), 0);
}

#[tokio::test]
async fn test_reorganized_blocks_take_their_transactions_along() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let (t1, t2, t3) = (transfer(1, 1), transfer(1, 2), transfer(2, 3));
    let first = block(100, 0, vec![t1, t2]);
    let second = block(100, 1, vec![t3.clone()]);

    engine
        .handle_entry_batch(&[block_entry(&first, StateSyncerOperation::Upsert)])
        .await
        .unwrap();
    engine
        .handle_entry_batch(&[block_bundle_entry(
            &first,
            vec![
                vec![utxo_operation(OperationType::SPEND_BALANCE)],
                vec![utxo_operation(OperationType::SPEND_BALANCE)],
            ],
        )])
        .await
        .unwrap();
    assert_eq!(database.row_count(&TRANSACTION), 2);
    assert_eq!(database.row_count(&UTXO_OPERATION), 2);

    engine
        .handle_entry_batch(&[block_entry(&second, StateSyncerOperation::Upsert)])
        .await
        .unwrap();
    engine
        .handle_entry_batch(&[block_bundle_entry(
            &second,
            vec![vec![
                utxo_operation(OperationType::SPEND_BALANCE),
                utxo_operation(OperationType::ADD_BALANCE),
            ]],
        )])
        .await
        .unwrap();

    let second_hash = SqlValue::Text(block_hash(&second).to_hex());
    assert_eq!(database.column(&BLOCK, "block_hash"), vec![second_hash.clone()]);
    assert_eq!(
        database.column(&TRANSACTION, "transaction_hash"),
        vec![SqlValue::Text(t3.hash().unwrap().to_hex())]
    );
    assert_eq!(
        database.column(&UTXO_OPERATION, "block_hash"),
        vec![second_hash.clone(), second_hash]
    );
}

#[tokio::test]
async fn test_derived_keys_project_their_spending_limit() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let limit = TransactionSpendingLimit {
        global_deso_limit: 1_000_000,
        is_unlimited: false,
        ..TransactionSpendingLimit::default()
    };
    let entry = upsert(
        key(
            prefixes::OWNER_DERIVED_KEY_TO_DERIVED_KEY,
            &[public_key(1).as_bytes(), public_key(2).as_bytes()],
        ),
        Encoder::DerivedKey(derived_key_entry(1, 2, 2_000, Some(limit.clone()))),
    );
    engine.handle_entry_batch(&[entry]).await.unwrap();

    let rows = database.rows(&DERIVED_KEY);
    let table = &DERIVED_KEY;
    assert_eq!(value(table, &rows[0], "expiration_block").as_i64(), Some(2_000));
    assert_eq!(value(table, &rows[0], "is_unlimited").as_bool(), Some(false));
    assert_eq!(
        value(table, &rows[0], "global_deso_limit").as_i64(),
        Some(1_000_000)
    );
    assert_eq!(
        value(table, &rows[0], "transaction_spending_limit_bytes").as_bytes(),
        Some(limit.to_bytes().unwrap().as_slice())
    );
}

#[tokio::test]
async fn test_snapshot_validators_are_routed_by_prefix() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let live = upsert(
        key(prefixes::VALIDATOR_BY_PKID, &[test_pkid(5).as_bytes()]),
        Encoder::Validator(validator_entry(5, Uint256::from(10u64))),
    );
    engine.handle_entry_batch(&[live]).await.unwrap();
    let validators = database.rows(&VALIDATOR);

    let snapshot = upsert(
        snapshot_key(
            prefixes::SNAPSHOT_VALIDATOR_SET_BY_PKID,
            42,
            test_pkid(5).as_bytes(),
        ),
        Encoder::Validator(validator_entry(5, Uint256::from(20u64))),
    );
    engine.handle_entry_batch(&[snapshot]).await.unwrap();

    let snapshots = database.rows(&SNAPSHOT_VALIDATOR);
    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        value(&SNAPSHOT_VALIDATOR, &snapshots[0], "snapshot_at_epoch_number").as_i64(),
        Some(42)
    );
    assert_eq!(database.rows(&VALIDATOR), validators);
}

#[tokio::test]
async fn test_atomic_wrappers_expand_into_their_inner_transactions() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let inner = vec![transfer(2, 1), transfer(3, 2), transfer(4, 3)];
    let wrapper = atomic_wrapper(1, inner.clone());
    let block = block(7, 0, vec![transfer(9, 9), wrapper.clone()]);
    engine
        .handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)])
        .await
        .unwrap();

    let wrapper_hash = wrapper.hash().unwrap().to_hex();
    let wrapper_rows = database.find(&TRANSACTION, "transaction_hash", wrapper_hash.as_str());
    assert_eq!(wrapper_rows.len(), 1);
    assert!(value(&TRANSACTION, &wrapper_rows[0], "wrapper_transaction_hash").is_null());
    assert_eq!(
        value(&TRANSACTION, &wrapper_rows[0], "index_in_block").as_i64(),
        Some(1)
    );

    let inner_rows = database.find(&TRANSACTION, "wrapper_transaction_hash", wrapper_hash.as_str());
    assert_eq!(inner_rows.len(), 3);
    for (index, transaction) in inner.iter().enumerate() {
        let rows = database.find(
            &TRANSACTION,
            "transaction_hash",
            transaction.hash().unwrap().to_hex(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(
            value(&TRANSACTION, &rows[0], "index_in_wrapper_transaction").as_i64(),
            Some(index as i64)
        );
        assert!(value(&TRANSACTION, &rows[0], "index_in_block").is_null());
    }
    assert_eq!(database.row_count(&TRANSACTION), 5);
}

#[tokio::test]
async fn test_like_metadata_names_the_post_and_its_author() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let post = test_hash(20);
    let like = like_transaction(1, &post);
    let block = block(8, 0, vec![like.clone()]);
    engine
        .handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)])
        .await
        .unwrap();

    let mut operation = utxo_operation(OperationType::LIKE);
    operation.prev_post_entry = Some(post_entry(&post, 2, "gm"));
    engine
        .handle_entry_batch(&[block_bundle_entry(&block, vec![vec![operation]])])
        .await
        .unwrap();

    let hash = like.hash().unwrap().to_hex();
    let rows = database.find(&TRANSACTION, "transaction_hash", hash.as_str());
    let metadata = value(&TRANSACTION, &rows[0], "tx_index_metadata")
        .as_json()
        .unwrap();
    assert_eq!(metadata["PostHashHex"], json!(post.to_hex()));

    let affected = database
        .find(&AFFECTED_PUBLIC_KEY, "transaction_hash", hash.as_str())
        .into_iter()
        .filter_map(|row| row.get(0).and_then(SqlValue::as_text).map(str::to_string))
        .collect::<Vec<_>>();
    assert!(affected.contains(&address_of(1)));
    assert!(affected.contains(&address_of(2)));

    // Re-ingesting the block keeps the metadata written by the index.
    engine
        .handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)])
        .await
        .unwrap();
    let rows = database.find(&TRANSACTION, "transaction_hash", hash.as_str());
    assert!(!value(&TRANSACTION, &rows[0], "tx_index_metadata").is_null());
}
