// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Entry and block fixtures shared by unit and integration tests.

use std::collections::BTreeMap;

use deso_base::{
    crypto::{
        test_utils::{test_hash, test_pkid, test_public_key},
        CryptoHash, Pkid, PublicKey,
    },
    data_types::{ExtraData, Uint256},
    entries::{
        Block, BlockHeader, CoinEntry, DaoCoinLimitOrderEntry, DerivedKeyEntry, FollowEntry,
        LikeEntry, PostEntry, ProfileEntry, QuorumCertificate, UtxoOperation,
        UtxoOperationBundle, ValidatorEntry,
    },
    network::NetworkParams,
    prefixes,
    spending_limit::TransactionSpendingLimit,
    state_change::{Encoder, StateChangeEntry, StateSyncerOperation},
    transaction::Transaction,
    txn_meta::{AtomicTxnsWrapperMetadata, BasicTransferMetadata, LikeMetadata, TxnMeta},
};

pub fn params() -> NetworkParams {
    NetworkParams::mainnet()
}

/// The base58 address of `test_public_key(byte)`.
pub fn address_of(byte: u8) -> String {
    test_public_key(byte).to_base58_check(&params())
}

/// A key made of `prefix` followed by the concatenated `parts`.
pub fn key(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let mut key = vec![prefix];
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// A snapshot key: `prefix`, the big-endian epoch, then `rest`.
pub fn snapshot_key(prefix: u8, epoch: u64, rest: &[u8]) -> Vec<u8> {
    key(prefix, &[&epoch.to_be_bytes(), rest])
}

pub fn upsert(key: Vec<u8>, encoder: Encoder) -> StateChangeEntry {
    StateChangeEntry::new(StateSyncerOperation::Upsert, key, encoder, 0)
}

pub fn insert(key: Vec<u8>, encoder: Encoder) -> StateChangeEntry {
    StateChangeEntry::new(StateSyncerOperation::Insert, key, encoder, 0)
}

pub fn follow_entry(follower: u8, followed: u8) -> FollowEntry {
    FollowEntry {
        follower_pkid: test_pkid(follower),
        followed_pkid: test_pkid(followed),
    }
}

pub fn follow_key(follower: u8, followed: u8) -> Vec<u8> {
    key(
        prefixes::FOLLOWER_PKID_TO_FOLLOWED_PKID,
        &[test_pkid(follower).as_bytes(), test_pkid(followed).as_bytes()],
    )
}

pub fn like_entry(liker: u8, post: &CryptoHash) -> LikeEntry {
    LikeEntry {
        liker_public_key: test_public_key(liker),
        liked_post_hash: *post,
        is_deleted: false,
    }
}

pub fn coin_entry(coins_in_circulation_nanos: Uint256) -> CoinEntry {
    CoinEntry {
        creator_basis_points: 1_000,
        deso_locked_nanos: 0,
        number_of_holders: 0,
        coins_in_circulation_nanos,
        coin_watermark_nanos: 0,
        minting_disabled: false,
        transfer_restriction_status: 0,
    }
}

pub fn profile_entry(owner: u8, username: &str) -> ProfileEntry {
    ProfileEntry {
        public_key: test_public_key(owner),
        username: username.as_bytes().to_vec(),
        description: Vec::new(),
        profile_pic: Vec::new(),
        is_hidden: false,
        creator_coin_entry: coin_entry(Uint256::ZERO),
        dao_coin_entry: coin_entry(Uint256::ZERO),
        extra_data: ExtraData::new(),
        is_deleted: false,
    }
}

pub fn post_entry(post: &CryptoHash, poster: u8, body: &str) -> PostEntry {
    PostEntry {
        post_hash: *post,
        poster_public_key: test_public_key(poster),
        parent_stake_id: Vec::new(),
        body: body.as_bytes().to_vec(),
        reposted_post_hash: None,
        is_quoted_repost: false,
        creator_basis_points: 0,
        stake_multiple_basis_points: 0,
        confirmation_block_height: 0,
        timestamp_nanos: 1_700_000_000_000_000_000,
        is_hidden: false,
        like_count: 0,
        repost_count: 0,
        quote_repost_count: 0,
        diamond_count: 0,
        comment_count: 0,
        is_pinned: false,
        is_nft: false,
        num_nft_copies: 0,
        num_nft_copies_for_sale: 0,
        num_nft_copies_burned: 0,
        has_unlockable: false,
        nft_royalty_to_creator_basis_points: 0,
        nft_royalty_to_coin_basis_points: 0,
        additional_nft_royalties_to_creators_basis_points: BTreeMap::new(),
        additional_nft_royalties_to_coins_basis_points: BTreeMap::new(),
        extra_data: ExtraData::new(),
        is_frozen: false,
    }
}

pub fn derived_key_entry(
    owner: u8,
    derived: u8,
    expiration_block: u64,
    limit: Option<TransactionSpendingLimit>,
) -> DerivedKeyEntry {
    DerivedKeyEntry {
        owner_public_key: test_public_key(owner),
        derived_public_key: test_public_key(derived),
        expiration_block,
        operation_type: 1,
        extra_data: ExtraData::new(),
        transaction_spending_limit: limit,
        is_deleted: false,
    }
}

pub fn validator_entry(validator: u8, total_stake_amount_nanos: Uint256) -> ValidatorEntry {
    ValidatorEntry {
        validator_pkid: test_pkid(validator),
        domains: vec![b"validator.example:18000".to_vec()],
        disable_delegated_stake: false,
        delegated_stake_commission_basis_points: 500,
        voting_public_key: vec![0xaa; 4],
        voting_authorization: vec![0xbb; 4],
        total_stake_amount_nanos,
        last_active_at_epoch_number: 7,
        jailed_at_epoch_number: 0,
        extra_data: ExtraData::new(),
    }
}

/// A resting order selling `selling`'s coin placed by `transactor`.
pub fn dao_coin_limit_order_entry(
    order: &CryptoHash,
    transactor: u8,
    selling: u8,
    quantity: Uint256,
    operation_type: u8,
) -> DaoCoinLimitOrderEntry {
    DaoCoinLimitOrderEntry {
        order_id: *order,
        transactor_pkid: test_pkid(transactor),
        buying_dao_coin_creator_pkid: Pkid::default(),
        selling_dao_coin_creator_pkid: test_pkid(selling),
        scaled_exchange_rate_coins_to_sell_per_coin_to_buy: Uint256::from(1u64),
        quantity_to_fill_in_base_units: quantity,
        operation_type,
        fill_type: 1,
        block_height: 10,
    }
}

pub fn dao_coin_limit_order_key(order: &CryptoHash) -> Vec<u8> {
    key(prefixes::DAO_COIN_LIMIT_ORDER, &[order.as_bytes()])
}

/// A version-1 basic transfer from `sender` with a distinguishing `nonce`.
pub fn transfer(sender: u8, nonce: u64) -> Transaction {
    let mut transaction = Transaction::new(
        test_public_key(sender),
        TxnMeta::from(BasicTransferMetadata::default()),
    );
    transaction.nonce = Some(deso_base::transaction::TxnNonce {
        expiration_block_height: 1_000,
        partial_id: nonce,
    });
    transaction
}

pub fn like_transaction(liker: u8, post: &CryptoHash) -> Transaction {
    Transaction::new(
        test_public_key(liker),
        TxnMeta::from(LikeMetadata {
            liked_post_hash: *post,
            is_unlike: false,
        }),
    )
}

pub fn atomic_wrapper(sender: u8, txns: Vec<Transaction>) -> Transaction {
    Transaction::new(
        test_public_key(sender),
        TxnMeta::from(AtomicTxnsWrapperMetadata { txns }),
    )
}

/// A block at `height`; `nonce` distinguishes competing blocks at the same height.
pub fn block(height: u64, nonce: u64, txns: Vec<Transaction>) -> Block {
    Block {
        header: BlockHeader {
            version: 2,
            prev_block_hash: test_hash(0),
            txn_merkle_root: test_hash(1),
            timestamp_nano_secs: 1_700_000_000_000_000_000,
            height,
            nonce,
            validators_vote_qc: Some(QuorumCertificate {
                block_hash: test_hash(0),
                proposed_in_view: height,
                signers: vec![0b0000_0101],
                aggregated_signature: Vec::new(),
            }),
            ..BlockHeader::default()
        },
        txns,
    }
}

/// Blocks are identified by a hash of their header fields in fixtures.
pub fn block_hash(block: &Block) -> CryptoHash {
    let mut bytes = block.header.height.to_be_bytes().to_vec();
    bytes.extend_from_slice(&block.header.nonce.to_be_bytes());
    CryptoHash::digest(&bytes)
}

pub fn block_entry(block: &Block, operation: StateSyncerOperation) -> StateChangeEntry {
    let hash = block_hash(block);
    StateChangeEntry::new(
        operation,
        key(prefixes::BLOCK_HASH_TO_BLOCK, &[hash.as_bytes()]),
        Encoder::Block(block.clone()),
        block.header.height,
    )
}

/// A bundle with `operations` utxo operations per transaction of `block`.
pub fn block_bundle_entry(block: &Block, bundle: Vec<Vec<UtxoOperation>>) -> StateChangeEntry {
    let hash = block_hash(block);
    StateChangeEntry::new(
        StateSyncerOperation::Upsert,
        key(prefixes::BLOCK_HASH_TO_UTXO_OPERATIONS, &[hash.as_bytes()]),
        Encoder::UtxoOperationBundle(UtxoOperationBundle {
            utxo_op_bundle: bundle,
        }),
        block.header.height,
    )
    .with_block(block.clone())
}

/// A mempool transaction entry, keyed by the transaction hash.
pub fn mempool_entry(transaction: &Transaction, operation: StateSyncerOperation) -> StateChangeEntry {
    let hash = transaction.hash().expect("fixture transactions encode");
    StateChangeEntry::new(
        operation,
        key(prefixes::MEMPOOL_TXN_HASH_TO_TXN, &[hash.as_bytes()]),
        Encoder::Transaction(transaction.clone()),
        0,
    )
}

pub fn utxo_operation(operation_type: deso_base::entries::OperationType) -> UtxoOperation {
    UtxoOperation {
        operation_type,
        ..UtxoOperation::default()
    }
}

pub fn public_key(byte: u8) -> PublicKey {
    test_public_key(byte)
}
