// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use assert_matches::assert_matches;
use deso_base::{
    codec::BinaryCodec as _,
    crypto::test_utils::{test_hash, test_pkid, test_public_key},
    data_types::Uint256,
    entries::{
        AccessGroupMemberEntry, BalanceEntry, DesoBalanceEntry, LeaderScheduleEntry,
        NewMessageEntry,
    },
    prefixes,
    spending_limit::TransactionSpendingLimit,
    transaction::TxnType,
};
use test_case::test_case;

use super::*;
use crate::{
    schema::tables,
    test_utils::{self, address_of, key, params, snapshot_key},
};

fn value<'a>(table: &Table, row: &'a Row, column: &str) -> &'a SqlValue {
    let index = table
        .row_index(column)
        .unwrap_or_else(|| panic!("{} has no column {column}", table.name));
    row.get(index).expect("row is shorter than its table")
}

#[test]
fn test_profile_pkid_comes_from_the_key() {
    let mut profile = test_utils::profile_entry(1, "alice");
    profile.dao_coin_entry.coins_in_circulation_nanos = Uint256::from(1_000_000_000u64);
    profile.creator_coin_entry.coins_in_circulation_nanos = Uint256::from(u128::MAX);
    let encoder = Encoder::Profile(profile);
    let swapped = key(prefixes::PKID_TO_PROFILE, &[test_pkid(2).as_bytes()]);

    let row = profile_row(&encoder, &swapped, &params()).unwrap();
    assert_eq!(row.len(), tables::PROFILE.insert_arity());
    assert_eq!(value(&tables::PROFILE, &row, "public_key").as_text(), Some(address_of(1).as_str()));
    assert_eq!(value(&tables::PROFILE, &row, "pkid").as_text(), Some(address_of(2).as_str()));
    assert_eq!(value(&tables::PROFILE, &row, "username").as_text(), Some("alice"));
    assert_eq!(
        value(&tables::PROFILE, &row, "dao_coins_in_circulation_nanos_hex").as_text(),
        Some("0x3b9aca00")
    );
    assert_eq!(
        value(&tables::PROFILE, &row, "cc_coins_in_circulation_nanos").as_text(),
        Some(u128::MAX.to_string().as_str())
    );

    assert_matches!(
        profile_row(&encoder, &[prefixes::PKID_TO_PROFILE], &params()),
        Err(AdapterError::KeyTooShort { needed: 34, actual: 1 })
    );
    assert_matches!(
        profile_row(&encoder, &[], &params()),
        Err(AdapterError::KeyTooShort { needed: 34, actual: 0 })
    );
}

#[test]
fn test_deso_balance_public_key_comes_from_the_key() {
    let encoder = Encoder::DesoBalance(DesoBalanceEntry {
        pkid: test_pkid(3),
        balance_nanos: 42,
    });
    let balance_key = key(
        prefixes::PUBLIC_KEY_TO_DESO_BALANCE,
        &[test_public_key(4).as_bytes()],
    );
    let row = deso_balance_row(&encoder, &balance_key, &params()).unwrap();
    assert_eq!(row.len(), tables::DESO_BALANCE.insert_arity());
    assert_eq!(
        value(&tables::DESO_BALANCE, &row, "public_key").as_text(),
        Some(address_of(4).as_str())
    );

    let truncated = &balance_key[..20];
    assert_matches!(
        deso_balance_row(&encoder, truncated, &params()),
        Err(AdapterError::KeyTooShort { needed: 34, actual: 20 })
    );
    assert_matches!(
        deso_balance_row(&encoder, &[], &params()),
        Err(AdapterError::KeyTooShort { needed: 34, actual: 0 })
    );
}

#[test]
fn test_post_body_documents_are_unpacked() {
    let post_hash = test_hash(7);
    let document = r#"{"Body":"gm","ImageURLs":["https://images.example/1.png"]}"#;
    let mut post = test_utils::post_entry(&post_hash, 3, document);
    post.additional_nft_royalties_to_creators_basis_points
        .insert(test_pkid(4), 250);
    let row = post_row(&Encoder::Post(post), &[prefixes::POST_HASH_TO_POST], &params()).unwrap();
    assert_eq!(row.len(), tables::POST.insert_arity());
    assert_eq!(value(&tables::POST, &row, "body").as_text(), Some("gm"));
    assert_eq!(
        value(&tables::POST, &row, "image_urls"),
        &SqlValue::TextArray(vec!["https://images.example/1.png".to_string()])
    );
    assert_eq!(value(&tables::POST, &row, "video_urls"), &SqlValue::TextArray(Vec::new()));
    assert!(value(&tables::POST, &row, "parent_post_hash").is_null());
    let mut royalties = serde_json::Map::new();
    royalties.insert(address_of(4), 250.into());
    assert_eq!(
        value(&tables::POST, &row, "additional_nft_royalties_to_creators_basis_points").as_json(),
        Some(&serde_json::Value::Object(royalties))
    );
}

#[test]
fn test_post_plain_bodies_are_kept() {
    let post = test_utils::post_entry(&test_hash(7), 3, "not a document");
    let row = post_row(&Encoder::Post(post), &[prefixes::POST_HASH_TO_POST], &params()).unwrap();
    assert_eq!(value(&tables::POST, &row, "body").as_text(), Some("not a document"));
    assert_eq!(value(&tables::POST, &row, "image_urls"), &SqlValue::TextArray(Vec::new()));
}

#[test_case(prefixes::HODLER_PKID_CREATOR_PKID_TO_BALANCE, false ; "creator coin")]
#[test_case(prefixes::HODLER_PKID_CREATOR_PKID_TO_DAO_COIN_BALANCE, true ; "dao coin")]
fn test_balance_flavor_follows_key_prefix(prefix: u8, is_dao_coin: bool) {
    let encoder = Encoder::Balance(BalanceEntry {
        hodler_pkid: test_pkid(1),
        creator_pkid: test_pkid(2),
        balance_nanos: Uint256::from(u128::MAX),
        has_purchased: true,
    });
    let row = balance_row(&encoder, &[prefix], &params()).unwrap();
    assert_eq!(
        value(&tables::BALANCE, &row, "is_dao_coin").as_bool(),
        Some(is_dao_coin)
    );
    assert_eq!(
        value(&tables::BALANCE, &row, "balance_nanos"),
        &SqlValue::Numeric(u128::MAX.to_string())
    );
}

#[test]
fn test_balance_without_key_is_rejected() {
    let encoder = Encoder::Balance(BalanceEntry {
        hodler_pkid: test_pkid(1),
        creator_pkid: test_pkid(2),
        balance_nanos: Uint256::ZERO,
        has_purchased: false,
    });
    assert_matches!(
        balance_row(&encoder, &[], &params()),
        Err(AdapterError::KeyTooShort { needed: 1, actual: 0 })
    );
}

#[test]
fn test_validator_snapshots_record_their_epoch() {
    let encoder = Encoder::Validator(test_utils::validator_entry(5, Uint256::from(10u64)));
    let live = key(prefixes::VALIDATOR_BY_PKID, &[test_pkid(5).as_bytes()]);
    let snapshot = snapshot_key(
        prefixes::SNAPSHOT_VALIDATOR_SET_BY_PKID,
        42,
        test_pkid(5).as_bytes(),
    );

    assert!(std::ptr::eq(validator_route(&live).unwrap(), &tables::VALIDATOR));
    let row = validator_row(&encoder, &live, &params()).unwrap();
    assert_eq!(row.len(), tables::VALIDATOR.insert_arity());
    assert_eq!(
        value(&tables::VALIDATOR, &row, "voting_public_key").as_text(),
        Some("aaaaaaaa")
    );

    assert!(std::ptr::eq(
        validator_route(&snapshot).unwrap(),
        &tables::SNAPSHOT_VALIDATOR
    ));
    let row = validator_row(&encoder, &snapshot, &params()).unwrap();
    assert_eq!(row.len(), tables::SNAPSHOT_VALIDATOR.insert_arity());
    assert_eq!(
        value(&tables::SNAPSHOT_VALIDATOR, &row, "snapshot_at_epoch_number").as_i64(),
        Some(42)
    );
}

#[test]
fn test_validator_with_foreign_prefix_is_rejected() {
    let encoder = Encoder::Validator(test_utils::validator_entry(5, Uint256::ZERO));
    assert_matches!(
        validator_row(&encoder, &[prefixes::STAKE_BY_VALIDATOR_AND_STAKER], &params()),
        Err(AdapterError::UnknownKeyPrefix {
            kind: RecordKind::Validator,
            prefix: prefixes::STAKE_BY_VALIDATOR_AND_STAKER,
        })
    );
}

#[test]
fn test_leader_schedule_slot_comes_from_the_key() {
    let encoder = Encoder::LeaderSchedule(LeaderScheduleEntry {
        validator_pkid: test_pkid(9),
    });
    let slot = snapshot_key(prefixes::SNAPSHOT_LEADER_SCHEDULE, 12, &3u16.to_be_bytes());
    let row = leader_schedule_row(&encoder, &slot, &params()).unwrap();
    assert_eq!(
        value(&tables::LEADER_SCHEDULE, &row, "snapshot_at_epoch_number").as_i64(),
        Some(12)
    );
    assert_eq!(
        value(&tables::LEADER_SCHEDULE, &row, "leader_index").as_i64(),
        Some(3)
    );
    assert_matches!(
        leader_schedule_row(&encoder, &slot[..9], &params()),
        Err(AdapterError::KeyTooShort { needed: 11, actual: 9 })
    );
}

#[test_case(prefixes::GROUP_CHAT_MESSAGES_INDEX, true ; "group chat")]
#[test_case(prefixes::DM_MESSAGES_INDEX, false ; "direct message")]
fn test_new_message_thread_kind_follows_key_prefix(prefix: u8, is_group_chat: bool) {
    let encoder = Encoder::NewMessage(NewMessageEntry {
        sender_access_group_owner_public_key: test_public_key(1),
        sender_access_group_key_name: b"default-key".to_vec(),
        sender_access_group_public_key: test_public_key(2),
        recipient_access_group_owner_public_key: test_public_key(3),
        recipient_access_group_key_name: b"default-key".to_vec(),
        recipient_access_group_public_key: test_public_key(4),
        encrypted_text: vec![1, 2, 3],
        timestamp_nanos: 5,
        extra_data: Default::default(),
    });
    let row = new_message_row(&encoder, &[prefix], &params()).unwrap();
    assert_eq!(row.len(), tables::NEW_MESSAGE.insert_arity());
    assert_eq!(
        value(&tables::NEW_MESSAGE, &row, "is_group_chat").as_bool(),
        Some(is_group_chat)
    );
}

#[test]
fn test_access_group_member_reads_group_from_key() {
    let encoder = Encoder::AccessGroupMember(AccessGroupMemberEntry {
        access_group_member_public_key: test_public_key(6),
        access_group_member_key_name: b"member".to_vec(),
        encrypted_key: vec![7; 4],
        extra_data: Default::default(),
    });
    let mut group_name = [0u8; prefixes::ACCESS_GROUP_KEY_NAME_LENGTH];
    group_name[..6].copy_from_slice(b"family");
    let member_key = key(
        prefixes::ACCESS_GROUP_MEMBER_ENTRY,
        &[test_public_key(1).as_bytes(), &group_name, test_public_key(6).as_bytes()],
    );
    let row = access_group_member_row(&encoder, &member_key, &params()).unwrap();
    let table = &tables::ACCESS_GROUP_MEMBER;
    assert_eq!(row.len(), table.insert_arity());
    assert_eq!(
        value(table, &row, "access_group_owner_public_key").as_text(),
        Some(address_of(1).as_str())
    );
    assert_eq!(
        value(table, &row, "access_group_key_name").as_text(),
        Some("family")
    );

    assert_matches!(
        access_group_member_row(&encoder, &member_key[..20], &params()),
        Err(AdapterError::KeyTooShort { needed: 34, actual: 20 })
    );
}

#[test]
fn test_derived_key_keeps_the_limit_encoding() {
    let mut limit = TransactionSpendingLimit {
        global_deso_limit: 1_000_000,
        ..Default::default()
    };
    limit.transaction_count_limit_map.insert(TxnType::Like, 3);
    let encoder = Encoder::DerivedKey(test_utils::derived_key_entry(1, 2, 2_000, Some(limit.clone())));
    let row = derived_key_row(&encoder, &[prefixes::OWNER_DERIVED_KEY_TO_DERIVED_KEY], &params())
        .unwrap();
    let table = &tables::DERIVED_KEY;
    assert_eq!(row.len(), table.insert_arity());
    assert_eq!(value(table, &row, "expiration_block").as_i64(), Some(2_000));
    assert_eq!(value(table, &row, "global_deso_limit").as_i64(), Some(1_000_000));
    assert_eq!(value(table, &row, "is_unlimited").as_bool(), Some(false));
    assert_eq!(
        value(table, &row, "transaction_spending_limit_bytes").as_bytes(),
        Some(limit.to_bytes().unwrap().as_slice())
    );

    let encoder = Encoder::DerivedKey(test_utils::derived_key_entry(1, 2, 2_000, None));
    let row = derived_key_row(&encoder, &[prefixes::OWNER_DERIVED_KEY_TO_DERIVED_KEY], &params())
        .unwrap();
    assert!(value(table, &row, "transaction_spending_limit_tracker").is_null());
    assert!(value(table, &row, "is_unlimited").is_null());
}

#[test]
fn test_mismatched_encoder_is_rejected() {
    let encoder = Encoder::Follow(test_utils::follow_entry(1, 2));
    assert_matches!(
        like_row(&encoder, &[prefixes::LIKER_PUBLIC_KEY_TO_LIKED_POST_HASH], &params()),
        Err(AdapterError::UnexpectedEncoder {
            expected: RecordKind::Like,
            actual: RecordKind::Follow,
        })
    );
}

#[test]
fn test_atomic_wrapper_expands_inner_transactions() {
    let inners = vec![
        test_utils::transfer(1, 1),
        test_utils::transfer(1, 2),
        test_utils::transfer(1, 3),
    ];
    let wrapper = test_utils::atomic_wrapper(1, inners.clone());
    let block = test_utils::block(100, 0, vec![wrapper.clone()]);
    let hash = test_utils::block_hash(&block);
    let placement = Placement::in_block(&hash, &block, 4);

    let rows = transaction_rows(&wrapper, &placement, None, &params()).unwrap();
    assert_eq!(rows.len(), 4);
    let table = &tables::TRANSACTION;
    let wrapper_hash = wrapper.hash().unwrap().to_hex();
    assert_eq!(
        value(table, &rows[0], "transaction_hash").as_text(),
        Some(wrapper_hash.as_str())
    );
    assert_eq!(value(table, &rows[0], "index_in_block").as_i64(), Some(4));
    assert!(value(table, &rows[0], "wrapper_transaction_hash").is_null());
    for (index, (row, inner)) in rows[1..].iter().zip(&inners).enumerate() {
        assert_eq!(row.len(), table.insert_arity());
        assert_eq!(
            value(table, row, "transaction_hash").as_text(),
            Some(inner.hash().unwrap().to_hex().as_str())
        );
        assert_eq!(
            value(table, row, "wrapper_transaction_hash").as_text(),
            Some(wrapper_hash.as_str())
        );
        assert_eq!(
            value(table, row, "index_in_wrapper_transaction").as_i64(),
            Some(index as i64)
        );
        assert!(value(table, row, "index_in_block").is_null());
        assert_eq!(
            value(table, row, "block_hash").as_text(),
            Some(hash.to_hex().as_str())
        );
    }
}

#[test]
fn test_unversioned_transactions_have_no_fee_columns() {
    let mut transaction = test_utils::transfer(1, 1);
    transaction.version = 0;
    transaction.nonce = None;
    let rows = transaction_rows(&transaction, &Placement::mempool(9), Some(&[38u8, 1][..]), &params())
        .unwrap();
    let table = &tables::TRANSACTION;
    assert!(value(table, &rows[0], "fee_nanos").is_null());
    assert!(value(table, &rows[0], "nonce_partial_id").is_null());
    assert!(value(table, &rows[0], "timestamp").is_null());
    assert_eq!(value(table, &rows[0], "block_hash").as_text(), Some(""));
    assert_eq!(
        value(table, &rows[0], "kind_tag").as_i64(),
        Some(i64::from(TxnType::BasicTransfer.as_u8()))
    );
    assert_eq!(value(table, &rows[0], "natural_key").as_bytes(), Some(&[38u8, 1][..]));
}

#[test]
fn test_block_signers_follow_the_quorum_bitset() {
    let block = test_utils::block(100, 0, Vec::new());
    let hash = test_utils::block_hash(&block);
    let signers = block_signer_rows(&hash, &block);
    let indices = signers
        .iter()
        .map(|row| value(&tables::BLOCK_SIGNER, row, "signer_index").as_i64())
        .collect::<Vec<_>>();
    assert_eq!(indices, vec![Some(0), Some(2)]);

    let row = block_row(&hash, &block, block_key(&hash));
    assert_eq!(row.len(), tables::BLOCK.insert_arity());
    assert_eq!(value(&tables::BLOCK, &row, "height").as_i64(), Some(100));
    assert_eq!(
        value(&tables::BLOCK, &row, "natural_key").as_bytes(),
        Some(block_key(&hash).as_slice())
    );
}

#[test]
fn test_extra_data_values_are_text() {
    let mut extra_data = deso_base::data_types::ExtraData::new();
    extra_data.insert("app".to_string(), b"sink\0".to_vec());
    assert_eq!(
        extra_data_json(&extra_data),
        serde_json::json!({ "app": "sink" })
    );
}
