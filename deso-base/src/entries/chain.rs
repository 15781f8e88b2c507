// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::{NftEntry, PostEntry, ProfileEntry, ValidatorEntry};
use crate::{
    crypto::{CryptoHash, Pkid, PublicKey},
    data_types::Uint256,
    transaction::Transaction,
};

/// A vote quorum certificate; `signers` is a big-endian bit set over the validator list.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumCertificate {
    pub block_hash: CryptoHash,
    pub proposed_in_view: u64,
    #[serde_as(as = "Hex")]
    pub signers: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub aggregated_signature: Vec<u8>,
}

impl QuorumCertificate {
    /// Indices of the set bits, in ascending order.
    pub fn signer_indices(&self) -> Vec<u64> {
        let mut indices = Vec::new();
        for (position, byte) in self.signers.iter().rev().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    indices.push(position as u64 * 8 + bit);
                }
            }
        }
        indices
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: CryptoHash,
    pub txn_merkle_root: CryptoHash,
    pub timestamp_nano_secs: i64,
    pub height: u64,
    pub nonce: u64,
    pub extra_nonce: u64,
    #[serde_as(as = "Hex")]
    pub proposer_voting_public_key: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub proposer_random_seed_signature: Vec<u8>,
    pub proposed_in_view: u64,
    #[serde_as(as = "Hex")]
    pub proposer_vote_partial_signature: Vec<u8>,
    pub validators_vote_qc: Option<QuorumCertificate>,
}

/// A block as stored by the node. The block hash is carried by the entry key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub txns: Vec<Transaction>,
}

/// Identifies a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtxoKey {
    pub txid: CryptoHash,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub amount_nanos: u64,
    pub public_key: PublicKey,
    pub block_height: u32,
    /// 0 output, 1 block reward, 2 bitcoin burn, 3 staking reward, ...
    #[serde(default)]
    pub utxo_type: u8,
    #[serde(default)]
    pub utxo_key: Option<UtxoKey>,
}

/// The type id of a utxo operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationType(pub u32);

impl OperationType {
    pub const ADD_UTXO: Self = Self(0);
    pub const SPEND_UTXO: Self = Self(1);
    pub const SUBMIT_POST: Self = Self(4);
    pub const LIKE: Self = Self(10);
    pub const CREATOR_COIN: Self = Self(11);
    pub const ACCEPT_NFT_BID: Self = Self(17);
    pub const DESO_DIAMOND: Self = Self(19);
    pub const DAO_COIN_LIMIT_ORDER: Self = Self(28);
    pub const ADD_BALANCE: Self = Self(36);
    pub const SPEND_BALANCE: Self = Self(37);
    pub const UNJAIL_VALIDATOR: Self = Self(44);
    pub const STAKE_DISTRIBUTION_RESTAKE: Self = Self(49);
    pub const STAKE_DISTRIBUTION_PAY_TO_BALANCE: Self = Self(50);
    pub const ATOMIC_TXNS_WRAPPER: Self = Self(52);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledDaoCoinLimitOrder {
    pub order_id: CryptoHash,
    pub transactor_pkid: Pkid,
    pub buying_dao_coin_creator_pkid: Pkid,
    pub selling_dao_coin_creator_pkid: Pkid,
    pub coin_quantity_in_base_units_bought: Uint256,
    pub coin_quantity_in_base_units_sold: Uint256,
    pub is_fulfilled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRewardStateChangeMetadata {
    pub validator_pkid: Pkid,
    pub staker_pkid: Pkid,
    pub reward_method: u8,
    pub staking_reward_nanos: u64,
    pub is_validator_commission: bool,
}

/// Extra context some operations attach for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StateChangeMetadata {
    StakeReward(StakeRewardStateChangeMetadata),
}

/// Everything needed to undo one step of connecting a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtxoOperation {
    pub operation_type: OperationType,
    pub entry: Option<UtxoEntry>,
    pub prev_post_entry: Option<PostEntry>,
    pub prev_parent_post_entry: Option<PostEntry>,
    pub prev_profile_entry: Option<ProfileEntry>,
    pub prev_nft_entry: Option<NftEntry>,
    pub prev_validator_entry: Option<ValidatorEntry>,
    pub creator_coin_deso_locked_nanos_diff: i64,
    pub accept_nft_bid_creator_public_key: Option<PublicKey>,
    pub accept_nft_bid_bidder_public_key: Option<PublicKey>,
    pub accept_nft_bid_creator_royalty_nanos: u64,
    pub accept_nft_bid_creator_deso_sales_nanos: u64,
    pub accept_nft_bid_bidder_change_nanos: u64,
    pub filled_dao_coin_limit_orders: Vec<FilledDaoCoinLimitOrder>,
    pub balance_public_key: Option<PublicKey>,
    pub balance_amount_nanos: u64,
    pub state_change_metadata: Option<StateChangeMetadata>,
    pub atomic_txns_inner_utxo_ops: Vec<Vec<UtxoOperation>>,
}

/// Operation lists of every transaction in a block, in block order, followed by any
/// block-level operation lists (stake rewards).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOperationBundle {
    pub utxo_op_bundle: Vec<Vec<UtxoOperation>>,
}

/// A (public key, transaction) pair of the affected-party index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedPublicKeyEntry {
    pub public_key: PublicKey,
    pub txn_hash: CryptoHash,
    #[serde(default)]
    pub metadata: String,
}
