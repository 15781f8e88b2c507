// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use assert_matches::assert_matches;
use proptest::prelude::*;

use super::*;
use crate::{
    crypto::test_utils::{test_hash, test_public_key},
    txn_meta::{
        AtomicTxnsWrapperMetadata, BasicTransferMetadata, BlockRewardMetadata,
        CreateUserAssociationMetadata, LikeMetadata, SubmitPostMetadata,
        MAX_ASSOCIATION_TYPE_LENGTH,
    },
};

fn basic_transfer() -> Transaction {
    Transaction {
        inputs: vec![TxInput {
            txid: test_hash(1),
            index: 3,
        }],
        outputs: vec![TxOutput {
            public_key: test_public_key(2),
            amount_nanos: 1_000,
        }],
        metadata: BasicTransferMetadata {}.into(),
        public_key: Some(test_public_key(4)),
        extra_data: [("DiamondLevel".to_string(), b"2".to_vec())].into(),
        signature: vec![0x30, 0x44, 0x02],
        version: 0,
        fee_nanos: 0,
        nonce: None,
    }
}

#[test]
fn test_version_zero_layout() {
    let txn = basic_transfer();
    let bytes = txn.to_bytes().unwrap();
    // One input: 32-byte txid, uvarint index.
    assert_eq!(bytes[0], 1);
    assert_eq!(&bytes[1..33], test_hash(1).as_bytes());
    assert_eq!(bytes[33], 3);
    // One output: 33-byte key, uvarint amount.
    assert_eq!(bytes[34], 1);
    assert_eq!(&bytes[35..68], test_public_key(2).as_bytes());
    assert_eq!(&bytes[68..70], &[0xe8, 0x07]);
    // Type 2 with empty metadata, then the 33-byte transactor key.
    assert_eq!(&bytes[70..73], &[2, 0, 33]);
    assert_eq!(Transaction::from_bytes(&bytes).unwrap(), txn);
}

#[test]
fn test_version_one_carries_fee_and_nonce() {
    let mut txn = basic_transfer();
    txn.version = 1;
    txn.fee_nanos = 168;
    txn.nonce = Some(TxnNonce {
        expiration_block_height: 500,
        partial_id: 77,
    });
    let bytes = txn.to_bytes().unwrap();
    let decoded = Transaction::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.fee_nanos, 168);
    assert_eq!(decoded.nonce.as_ref().unwrap().partial_id, 77);
    assert_eq!(decoded.effective_fee_nanos(0), 168);
}

#[test]
fn test_version_zero_fee_is_input_minus_output() {
    let txn = basic_transfer();
    assert_eq!(txn.effective_fee_nanos(1_250), 250);
    assert_eq!(txn.effective_fee_nanos(10), 0);
}

#[test]
fn test_hash_is_double_sha256_of_bytes() {
    let txn = basic_transfer();
    let bytes = txn.to_bytes().unwrap();
    assert_eq!(txn.hash().unwrap(), CryptoHash::digest(&bytes));
    let mut other = txn.clone();
    other.signature.clear();
    assert_ne!(other.hash().unwrap(), txn.hash().unwrap());
}

#[test]
fn test_block_reward_without_public_key() {
    let txn = Transaction {
        public_key: None,
        metadata: BlockRewardMetadata {
            extra_data: vec![1, 2, 3],
        }
        .into(),
        ..basic_transfer()
    };
    let decoded = Transaction::from_bytes(&txn.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.public_key, None);
    assert_eq!(decoded.txn_type(), TxnType::BlockReward);
}

#[test]
fn test_unknown_type_is_rejected() {
    let mut bytes = vec![0, 0];
    bytes.push(7);
    bytes.push(0);
    assert_matches!(
        Transaction::from_bytes(&bytes),
        Err(EncodingError::UnknownTxnType(7))
    );
}

#[test]
fn test_atomic_wrapper_nests_transactions() {
    let inner_like = Transaction::new(
        test_public_key(5),
        LikeMetadata {
            liked_post_hash: test_hash(9),
            is_unlike: false,
        }
        .into(),
    );
    let wrapper = Transaction::new(
        test_public_key(5),
        AtomicTxnsWrapperMetadata {
            txns: vec![inner_like.clone(), basic_transfer()],
        }
        .into(),
    );
    let decoded = Transaction::from_bytes(&wrapper.to_bytes().unwrap()).unwrap();
    assert_matches!(&decoded.metadata, TxnMeta::AtomicTxnsWrapper(meta) => {
        assert_eq!(meta.txns.len(), 2);
        assert_eq!(meta.txns[0], inner_like);
    });
}

#[test]
fn test_long_association_type_fails_to_encode() {
    let metadata = CreateUserAssociationMetadata {
        association_type: vec![b'x'; MAX_ASSOCIATION_TYPE_LENGTH + 1],
        ..Default::default()
    };
    assert_matches!(
        TxnMeta::from(metadata).to_bytes(),
        Err(EncodingError::FieldTooLong {
            field: "association type",
            ..
        })
    );
}

#[test]
fn test_metadata_json_uses_pascal_case() {
    let metadata = TxnMeta::from(SubmitPostMetadata {
        body: br#"{"Body":"gm"}"#.to_vec(),
        timestamp_nanos: 12,
        ..Default::default()
    });
    let json = serde_json::to_value(&metadata).unwrap();
    assert_eq!(json["TimestampNanos"], 12);
    assert_eq!(json["Body"], r#"{"Body":"gm"}"#);
    assert!(json["PostHashToModify"].is_null());
}

#[test]
fn test_transaction_serde_uses_hex_bytes() {
    let txn = basic_transfer();
    let json = serde_json::to_string(&txn).unwrap();
    assert_eq!(json, format!("\"{}\"", hex::encode(txn.to_bytes().unwrap())));
    let back: Transaction = serde_json::from_str(&json).unwrap();
    assert_eq!(back, txn);
}

proptest! {
    #[test]
    fn test_submit_post_survives_encoding(
        body in proptest::collection::vec(any::<u8>(), 0..200),
        post_hash in proptest::option::of(any::<CryptoHash>()),
        timestamp in any::<u64>(),
        fee in any::<u64>(),
    ) {
        let mut txn = Transaction::new(
            test_public_key(1),
            SubmitPostMetadata {
                post_hash_to_modify: post_hash,
                body,
                timestamp_nanos: timestamp,
                ..Default::default()
            }
            .into(),
        );
        txn.fee_nanos = fee;
        let decoded = Transaction::from_bytes(&txn.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(decoded, txn);
    }
}
