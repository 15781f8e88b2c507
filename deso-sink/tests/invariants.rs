// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Properties of the materialized store that hold for any stream.

use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    sync::Arc,
};

use deso_base::{
    crypto::test_utils::{test_hash, test_pkid},
    data_types::Uint256,
    entries::BalanceEntry,
    prefixes,
    state_change::{Encoder, RecordKind, StateChangeEntry, StateSyncerOperation, SyncEvent},
    transaction::Transaction,
};
use deso_sink::{
    db::memory::MemoryDatabase,
    schema::{
        tables::{self, BALANCE, BLOCK, BLOCK_SIGNER, FOLLOW, PUBLIC_KEY, TRANSACTION},
        Row, SqlValue, Table,
    },
    test_utils::*,
    SinkEngine, StateChangeHandler as _,
};
use proptest::prelude::*;

fn engine(database: &MemoryDatabase) -> SinkEngine<MemoryDatabase> {
    SinkEngine::new(Arc::new(database.clone()), params())
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn value<'a>(table: &Table, row: &'a Row, column: &str) -> &'a SqlValue {
    row.get(table.row_index(column).unwrap()).unwrap()
}

fn texts(table: &'static Table, database: &MemoryDatabase, column: &str) -> BTreeSet<String> {
    database
        .column(table, column)
        .iter()
        .filter_map(|value| value.as_text().map(str::to_string))
        .collect()
}

fn follow_change(follower: u8, followed: u8, exists: bool) -> StateChangeEntry {
    if exists {
        upsert(
            follow_key(follower, followed),
            Encoder::Follow(follow_entry(follower, followed)),
        )
    } else {
        StateChangeEntry::delete(RecordKind::Follow, follow_key(follower, followed), 1)
    }
}

fn balance(hodler: u8, creator: u8, nanos: u128) -> StateChangeEntry {
    upsert(
        key(
            prefixes::HODLER_PKID_CREATOR_PKID_TO_BALANCE,
            &[test_pkid(hodler).as_bytes(), test_pkid(creator).as_bytes()],
        ),
        Encoder::Balance(BalanceEntry {
            hodler_pkid: test_pkid(hodler),
            creator_pkid: test_pkid(creator),
            balance_nanos: Uint256::from(nanos),
            has_purchased: true,
        }),
    )
}

fn like(liker: u8, post: u8) -> StateChangeEntry {
    let post = test_hash(post);
    upsert(
        key(
            prefixes::LIKER_PUBLIC_KEY_TO_LIKED_POST_HASH,
            &[public_key(liker).as_bytes(), post.as_bytes()],
        ),
        Encoder::Like(like_entry(liker, &post)),
    )
}

/// Transactions of the block at (`height`, `nonce`), distinct across blocks.
fn block_transactions(height: u64, nonce: u64, count: usize) -> Vec<Transaction> {
    (0..count as u64)
        .map(|index| transfer(height as u8, height * 1_000 + nonce * 10 + index))
        .collect()
}

/// The block at (`height`, `nonce`). Its content only depends on both.
fn competing_block(height: u64, nonce: u64) -> (deso_base::entries::Block, usize) {
    let count = ((height + nonce) % 3) as usize;
    (
        block(height, nonce, block_transactions(height, nonce, count)),
        count,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replaying_a_stream_is_idempotent(
        changes in prop::collection::vec((1u8..4, 1u8..4, any::<bool>()), 1..24),
    ) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        let mut expected = BTreeSet::new();
        block_on(async {
            for &(follower, followed, exists) in &changes {
                engine
                    .handle_entry_batch(&[follow_change(follower, followed, exists)])
                    .await
                    .unwrap();
            }
        });
        for &(follower, followed, exists) in &changes {
            if exists {
                expected.insert((follower, followed));
            } else {
                expected.remove(&(follower, followed));
            }
        }
        let first = database.rows(&FOLLOW);
        prop_assert_eq!(first.len(), expected.len());

        let mut replayed = self::engine(&database);
        block_on(async {
            for &(follower, followed, exists) in &changes {
                replayed
                    .handle_entry_batch(&[follow_change(follower, followed, exists)])
                    .await
                    .unwrap();
            }
        });
        prop_assert_eq!(database.rows(&FOLLOW), first);
    }

    #[test]
    fn the_last_write_of_a_batch_wins(amounts in prop::collection::vec(any::<u64>(), 1..8)) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        let batch = amounts
            .iter()
            .map(|amount| balance(1, 2, u128::from(*amount)))
            .collect::<Vec<_>>();
        block_on(engine.handle_entry_batch(&batch)).unwrap();

        let rows = database.rows(&BALANCE);
        prop_assert_eq!(rows.len(), 1);
        let last = amounts.last().unwrap().to_string();
        prop_assert_eq!(value(&BALANCE, &rows[0], "balance_nanos").as_text(), Some(last.as_str()));
    }

    #[test]
    fn wide_balances_keep_every_digit(nanos in any::<u128>()) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        block_on(engine.handle_entry_batch(&[balance(3, 4, nanos)])).unwrap();

        let rows = database.rows(&BALANCE);
        let expected = nanos.to_string();
        prop_assert_eq!(
            value(&BALANCE, &rows[0], "balance_nanos").as_text(),
            Some(expected.as_str())
        );
    }

    #[test]
    fn each_height_keeps_its_last_block(
        blocks in prop::collection::vec((1u64..4, 0u64..3), 1..10),
    ) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        let mut expected = BTreeMap::new();
        block_on(async {
            for &(height, nonce) in &blocks {
                let (block, _) = competing_block(height, nonce);
                engine
                    .handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)])
                    .await
                    .unwrap();
            }
        });
        for &(height, nonce) in &blocks {
            let (block, count) = competing_block(height, nonce);
            expected.insert(height, (block_hash(&block).to_hex(), count));
        }

        let hashes = texts(&BLOCK, &database, "block_hash");
        let expected_hashes = expected
            .values()
            .map(|(hash, _)| hash.clone())
            .collect::<BTreeSet<_>>();
        prop_assert_eq!(&hashes, &expected_hashes);

        let transaction_blocks = database.column(&TRANSACTION, "block_hash");
        let expected_count: usize = expected.values().map(|(_, count)| count).sum();
        prop_assert_eq!(transaction_blocks.len(), expected_count);
        for block_hash in transaction_blocks {
            prop_assert!(hashes.contains(block_hash.as_text().unwrap()));
        }
    }

    #[test]
    fn transactions_land_in_their_type_partition(likes in prop::collection::vec(any::<bool>(), 1..8)) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        let txns = likes
            .iter()
            .enumerate()
            .map(|(index, &is_like)| {
                if is_like {
                    like_transaction(index as u8 + 1, &test_hash(index as u8))
                } else {
                    transfer(index as u8 + 1, index as u64)
                }
            })
            .collect::<Vec<_>>();
        let block = block(5, 0, txns.clone());
        block_on(engine.handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)]))
            .unwrap();

        for transaction in &txns {
            let hash = transaction.hash().unwrap().to_hex();
            let rows = database.find(&TRANSACTION, "transaction_hash", hash);
            prop_assert_eq!(rows.len(), 1);
            prop_assert_eq!(
                value(&TRANSACTION, &rows[0], "kind_tag").as_i64(),
                Some(i64::from(transaction.txn_type().as_u8()))
            );
        }
    }

    #[test]
    fn atomic_wrappers_expand_into_one_row_per_inner_transaction(count in 0usize..5) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        let inner = (0..count as u64).map(|nonce| transfer(7, nonce)).collect::<Vec<_>>();
        let wrapper = atomic_wrapper(6, inner);
        let block = block(9, 0, vec![wrapper.clone()]);
        block_on(engine.handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)]))
            .unwrap();

        prop_assert_eq!(database.row_count(&TRANSACTION), count + 1);
        let wrapper_hash = wrapper.hash().unwrap().to_hex();
        prop_assert_eq!(
            database
                .find(&TRANSACTION, "wrapper_transaction_hash", wrapper_hash)
                .len(),
            count
        );
    }

    #[test]
    fn every_public_key_is_registered(
        before in prop::collection::vec((1u8..6, 0u8..4), 0..6),
        after in prop::collection::vec((1u8..6, 0u8..4), 0..6),
    ) {
        let database = MemoryDatabase::new();
        let mut engine = engine(&database);
        block_on(async {
            engine.handle_sync_event(SyncEvent::Start).await.unwrap();
            for &(liker, post) in &before {
                engine.handle_entry_batch(&[like(liker, post)]).await.unwrap();
            }
            engine.handle_sync_event(SyncEvent::BulkSyncEnd).await.unwrap();
            for &(liker, post) in &after {
                engine.handle_entry_batch(&[like(liker, post)]).await.unwrap();
            }
            let block = block(3, 0, vec![transfer(9, 1)]);
            engine
                .handle_entry_batch(&[block_entry(&block, StateSyncerOperation::Upsert)])
                .await
                .unwrap();
            engine.shutdown().await;
        });

        let registered = texts(&PUBLIC_KEY, &database, "public_key");
        for table in tables::ALL {
            for column in table.public_key_columns() {
                for key in texts(table, &database, column.name) {
                    prop_assert!(
                        key.is_empty() || registered.contains(&key),
                        "{}.{} holds the unregistered key {}",
                        table.name,
                        column.name,
                        key
                    );
                }
            }
        }
    }
}

#[tokio::test]
async fn test_failed_block_replacement_keeps_the_previous_block() {
    let database = MemoryDatabase::new();
    let mut engine = engine(&database);
    let previous = block(50, 0, block_transactions(50, 0, 2));
    engine
        .handle_entry_batch(&[block_entry(&previous, StateSyncerOperation::Upsert)])
        .await
        .unwrap();

    database.fail_inserts_into(&BLOCK_SIGNER);
    let competing = block(50, 1, block_transactions(50, 1, 1));
    engine.begin_transaction().await.unwrap();
    assert!(engine
        .handle_entry_batch(&[block_entry(&competing, StateSyncerOperation::Upsert)])
        .await
        .is_err());
    engine.commit_transaction().await.unwrap();
    database.clear_failures();

    assert_eq!(
        texts(&BLOCK, &database, "block_hash"),
        BTreeSet::from([block_hash(&previous).to_hex()])
    );
    assert_eq!(database.committed_rows(&TRANSACTION).len(), 2);
    assert_eq!(database.committed_rows(&BLOCK_SIGNER).len(), 2);
}
