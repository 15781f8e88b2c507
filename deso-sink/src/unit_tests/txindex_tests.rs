// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use assert_matches::assert_matches;
use deso_base::{
    crypto::test_utils::{test_hash, test_pkid},
    data_types::Uint256,
    entries::{StakeRewardStateChangeMetadata, UtxoOperationBundle},
    prefixes::TXN_HASH_TO_UTXO_OPERATIONS,
    txn_meta::UnjailValidatorMetadata,
};
use serde_json::{json, Value};

use super::*;
use crate::{
    adapters::{transaction_rows, Placement},
    db::memory::MemoryDatabase,
    test_utils::*,
};

async fn index(
    database: &MemoryDatabase,
    entries: &[StateChangeEntry],
) -> Result<BatchSummary, BatchError> {
    index_bundles(database, StateSyncerOperation::Upsert, entries, &params()).await
}

fn stored_column(database: &MemoryDatabase, hash: &str, column: &str) -> Value {
    let rows = database.find(&TRANSACTION, "transaction_hash", hash);
    let index = TRANSACTION.row_index(column).unwrap();
    match rows[0].get(index) {
        Some(SqlValue::Json(value)) => value.clone(),
        other => panic!("unexpected {column}: {other:?}"),
    }
}

fn affected_addresses(database: &MemoryDatabase, hash: &str) -> Vec<SqlValue> {
    database
        .find(&AFFECTED_PUBLIC_KEY, "transaction_hash", hash)
        .into_iter()
        .filter_map(|row| row.get(0).cloned())
        .collect()
}

fn transaction_bundle_entry(hash: &str, operations: Vec<UtxoOperation>) -> StateChangeEntry {
    let hash = hex::decode(hash).unwrap();
    upsert(
        key(TXN_HASH_TO_UTXO_OPERATIONS, &[&hash]),
        Encoder::UtxoOperationBundle(UtxoOperationBundle {
            utxo_op_bundle: vec![operations],
        }),
    )
}

#[tokio::test]
async fn test_likes_record_the_post_and_its_author() {
    let database = MemoryDatabase::new();
    let post = test_hash(7);
    let like = like_transaction(1, &post);
    let block = block(10, 0, vec![like.clone()]);
    let mut operation = utxo_operation(OperationType::LIKE);
    operation.prev_post_entry = Some(post_entry(&post, 2, "hello"));
    let entry = block_bundle_entry(&block, vec![vec![operation]]);

    index(&database, &[entry]).await.unwrap();

    let hash = like.hash().unwrap().to_hex();
    let metadata = stored_column(&database, &hash, "tx_index_metadata");
    assert_eq!(metadata["PostHashHex"], json!(post.to_hex()));
    assert_eq!(metadata["PosterPublicKeyBase58Check"], json!(address_of(2)));
    let affected = affected_addresses(&database, &hash);
    assert_eq!(affected.len(), 2);
    assert!(affected.contains(&SqlValue::Text(address_of(1))));
    assert!(affected.contains(&SqlValue::Text(address_of(2))));
    assert_eq!(database.row_count(&UTXO_OPERATION), 1);
}

#[tokio::test]
async fn test_reindexing_a_block_replaces_its_operations() {
    let database = MemoryDatabase::new();
    let block = block(10, 0, vec![transfer(1, 1), transfer(2, 2)]);
    let entry = block_bundle_entry(
        &block,
        vec![
            vec![utxo_operation(OperationType::SPEND_BALANCE)],
            vec![
                utxo_operation(OperationType::SPEND_BALANCE),
                utxo_operation(OperationType::ADD_BALANCE),
            ],
        ],
    );
    index(&database, &[entry.clone()]).await.unwrap();
    assert_eq!(database.row_count(&UTXO_OPERATION), 3);

    index(&database, &[entry]).await.unwrap();
    assert_eq!(database.row_count(&UTXO_OPERATION), 3);
    assert_eq!(
        database.column(&UTXO_OPERATION, "operation_type"),
        vec![SqlValue::Int(37), SqlValue::Int(37), SqlValue::Int(36)]
    );
}

#[tokio::test]
async fn test_inner_transactions_use_the_operations_of_their_wrapper() {
    let database = MemoryDatabase::new();
    let inner = vec![transfer(2, 1), transfer(3, 2)];
    let wrapper = atomic_wrapper(1, inner.clone());
    let block = block(11, 0, vec![wrapper.clone()]);
    let mut operation = utxo_operation(OperationType::ATOMIC_TXNS_WRAPPER);
    operation.atomic_txns_inner_utxo_ops = vec![
        vec![utxo_operation(OperationType::SPEND_BALANCE)],
        vec![utxo_operation(OperationType::ADD_BALANCE)],
    ];
    let entry = block_bundle_entry(&block, vec![vec![operation]]);

    index(&database, &[entry]).await.unwrap();

    let inner_hashes = inner
        .iter()
        .map(|transaction| transaction.hash().unwrap().to_hex())
        .collect::<Vec<_>>();
    let wrapper_hash = wrapper.hash().unwrap().to_hex();
    assert_eq!(
        stored_column(&database, &wrapper_hash, "tx_index_metadata")["InnerTransactionHashes"],
        json!(inner_hashes)
    );
    assert_eq!(
        stored_column(&database, &inner_hashes[0], "tx_index_basic_transfer_metadata")
            ["UtxoOpTypes"],
        json!([37])
    );
    assert_eq!(
        stored_column(&database, &inner_hashes[1], "tx_index_basic_transfer_metadata")
            ["UtxoOpTypes"],
        json!([36])
    );
    assert_eq!(
        affected_addresses(&database, &inner_hashes[1]),
        vec![SqlValue::Text(address_of(3))]
    );
}

#[tokio::test]
async fn test_block_level_operations_record_stake_rewards() {
    let database = MemoryDatabase::new();
    let block = block(12, 0, vec![transfer(1, 1)]);
    let reward = |staker: u8, nanos: u64| {
        let mut operation = utxo_operation(OperationType::STAKE_DISTRIBUTION_PAY_TO_BALANCE);
        operation.state_change_metadata = Some(StateChangeMetadata::StakeReward(
            StakeRewardStateChangeMetadata {
                validator_pkid: test_pkid(5),
                staker_pkid: test_pkid(staker),
                reward_method: 0,
                staking_reward_nanos: nanos,
                is_validator_commission: false,
            },
        ));
        operation
    };
    let entry = block_bundle_entry(
        &block,
        vec![
            vec![],
            vec![
                utxo_operation(OperationType::ADD_BALANCE),
                reward(6, 1_000),
                reward(7, 2_000),
            ],
        ],
    );

    index(&database, &[entry]).await.unwrap();

    assert_eq!(
        database.column(&STAKE_REWARD, "reward_nanos"),
        vec![SqlValue::BigInt(1_000), SqlValue::BigInt(2_000)]
    );
    assert_eq!(
        database.column(&STAKE_REWARD, "utxo_op_index"),
        vec![SqlValue::BigInt(1), SqlValue::BigInt(2)]
    );
    assert_eq!(
        database.column(&UTXO_OPERATION, "transaction_index"),
        vec![SqlValue::Int(1), SqlValue::Int(1), SqlValue::Int(1)]
    );
}

#[tokio::test]
async fn test_unjailing_is_recorded_in_the_epoch_of_the_block() {
    let database = MemoryDatabase::new();
    database
        .insert_rows(
            &EPOCH,
            vec![
                row![2u64, 200u64, 200u64, 299u64, 0u64, 0i64, 1u64],
                row![3u64, 300u64, 300u64, 399u64, 0u64, 0i64, 2u64],
            ],
            InsertMode::Insert,
        )
        .await
        .unwrap();
    let unjail = Transaction::new(
        test_pkid(5).as_public_key(),
        TxnMeta::from(UnjailValidatorMetadata {}),
    );
    let block = block(350, 0, vec![unjail]);
    let mut validator = validator_entry(5, Uint256::from(10u64));
    validator.jailed_at_epoch_number = 2;
    let mut operation = utxo_operation(OperationType::UNJAIL_VALIDATOR);
    operation.prev_validator_entry = Some(validator);
    let entry = block_bundle_entry(&block, vec![vec![operation]]);

    index(&database, &[entry]).await.unwrap();

    assert_eq!(
        database.rows(&JAILED_HISTORY),
        vec![row![
            test_pkid(5).to_base58_check(&params()),
            2u64,
            3u64
        ]]
    );
}

#[tokio::test]
async fn test_unjailing_without_epochs_is_skipped() {
    let database = MemoryDatabase::new();
    let unjail = Transaction::new(
        test_pkid(5).as_public_key(),
        TxnMeta::from(UnjailValidatorMetadata {}),
    );
    let block = block(350, 0, vec![unjail]);
    let mut operation = utxo_operation(OperationType::UNJAIL_VALIDATOR);
    operation.prev_validator_entry = Some(validator_entry(5, Uint256::from(10u64)));
    let entry = block_bundle_entry(&block, vec![vec![operation]]);

    index(&database, &[entry]).await.unwrap();
    assert_eq!(database.row_count(&JAILED_HISTORY), 0);
}

#[tokio::test]
async fn test_mempool_transactions_are_indexed_by_hash() {
    let database = MemoryDatabase::new();
    let transaction = transfer(1, 9);
    let hash = transaction.hash().unwrap().to_hex();
    let rows = transaction_rows(&transaction, &Placement::mempool(20), None, &params()).unwrap();
    database
        .insert_rows(&TRANSACTION, rows, InsertMode::Upsert)
        .await
        .unwrap();
    let mut operation = utxo_operation(OperationType::SPEND_BALANCE);
    operation.balance_public_key = Some(public_key(1));
    operation.balance_amount_nanos = 250;

    index(&database, &[transaction_bundle_entry(&hash, vec![operation])])
        .await
        .unwrap();

    assert_eq!(
        stored_column(&database, &hash, "tx_index_basic_transfer_metadata")["TotalInputNanos"],
        json!(250)
    );
    assert_eq!(database.row_count(&UTXO_OPERATION), 0);
}

#[tokio::test]
async fn test_bundles_of_unknown_transactions_fail() {
    let database = MemoryDatabase::new();
    let hash = test_hash(3).to_hex();
    assert_matches!(
        index(&database, &[transaction_bundle_entry(&hash, vec![])]).await,
        Err(BatchError::Index(IndexError::MissingTransaction(missing))) if missing == hash
    );
}

#[tokio::test]
async fn test_unknown_bundle_prefixes_fail() {
    let database = MemoryDatabase::new();
    let entry = upsert(
        key(0x42, &[test_hash(3).as_bytes()]),
        Encoder::UtxoOperationBundle(UtxoOperationBundle::default()),
    );
    assert_matches!(
        index(&database, &[entry]).await,
        Err(BatchError::Index(IndexError::UnknownBundlePrefix(0x42)))
    );
}

#[tokio::test]
async fn test_deleted_bundles_are_ignored() {
    let database = MemoryDatabase::new();
    let block = block(10, 0, vec![transfer(1, 1)]);
    index(&database, &[block_bundle_entry(&block, vec![vec![]])])
        .await
        .unwrap();
    let delete = StateChangeEntry::delete(
        RecordKind::UtxoOperationBundle,
        block_bundle_entry(&block, vec![]).key_bytes,
        11,
    );
    let summary = index_bundles(
        &database,
        StateSyncerOperation::Delete,
        &[delete],
        &params(),
    )
    .await
    .unwrap();
    assert_eq!(summary.rows, 0);
    assert_eq!(database.row_count(&TRANSACTION), 1);
}
