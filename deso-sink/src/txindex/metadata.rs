// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Kind-specific summaries of transactions, and the parties they affect.

use deso_base::{
    codec::{EncodingError, Reader},
    crypto::{Pkid, PublicKey},
    data_types::Uint256,
    entries::{OperationType, UtxoOperation},
    network::NetworkParams,
    text::lossy_string,
    transaction::Transaction,
    txn_meta::TxnMeta,
};
use serde_json::{json, Map, Value};

/// Extra data keys of basic transfers that send a diamond.
pub const DIAMOND_LEVEL_KEY: &str = "DiamondLevel";
pub const DIAMOND_POST_HASH_KEY: &str = "DiamondPostHash";

/// A party of a transaction, with the role it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedKey {
    pub public_key: PublicKey,
    pub role: &'static str,
}

/// What the index records about one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionIndex {
    pub metadata: Value,
    pub basic_transfer: Value,
    /// Each public key once, with the first role it was seen in.
    pub affected: Vec<AffectedKey>,
}

struct Builder<'a> {
    params: &'a NetworkParams,
    affected: Vec<AffectedKey>,
}

impl Builder<'_> {
    /// Records `public_key` and returns its address.
    fn key(&mut self, public_key: &PublicKey, role: &'static str) -> Value {
        if !self
            .affected
            .iter()
            .any(|affected| affected.public_key == *public_key)
        {
            self.affected.push(AffectedKey {
                public_key: *public_key,
                role,
            });
        }
        Value::String(public_key.to_base58_check(self.params))
    }

    fn pkid(&mut self, pkid: &Pkid, role: &'static str) -> Value {
        self.key(&pkid.as_public_key(), role)
    }

    fn optional_key(&mut self, public_key: Option<&PublicKey>, role: &'static str) -> Value {
        public_key.map_or(Value::Null, |public_key| self.key(public_key, role))
    }
}

fn find_operation(operations: &[UtxoOperation], kind: OperationType) -> Option<&UtxoOperation> {
    operations
        .iter()
        .find(|operation| operation.operation_type == kind)
}

fn hex_amount(value: &Uint256) -> Value {
    Value::String(value.to_hex_string())
}

fn total_input_nanos(operations: &[UtxoOperation]) -> u64 {
    operations
        .iter()
        .map(|operation| match operation.operation_type {
            OperationType::SPEND_UTXO => operation
                .entry
                .as_ref()
                .map_or(0, |entry| entry.amount_nanos),
            OperationType::SPEND_BALANCE => operation.balance_amount_nanos,
            _ => 0,
        })
        .fold(0u64, u64::saturating_add)
}

fn basic_transfer(
    transaction: &Transaction,
    operations: &[UtxoOperation],
    builder: &mut Builder<'_>,
) -> Value {
    let total_input = total_input_nanos(operations);
    let mut metadata = Map::new();
    metadata.insert("TotalInputNanos".into(), json!(total_input));
    metadata.insert(
        "TotalOutputNanos".into(),
        json!(transaction.total_output_nanos()),
    );
    metadata.insert(
        "FeeNanos".into(),
        json!(transaction.effective_fee_nanos(total_input)),
    );
    metadata.insert(
        "UtxoOpTypes".into(),
        Value::Array(
            operations
                .iter()
                .map(|operation| json!(operation.operation_type.0))
                .collect(),
        ),
    );
    if let Some(level) = transaction.extra_data.get(DIAMOND_LEVEL_KEY) {
        if let Ok(level) = Reader::new(level).read_varint() {
            metadata.insert("DiamondLevel".into(), json!(level));
        }
    }
    if let Some(post_hash) = transaction.extra_data.get(DIAMOND_POST_HASH_KEY) {
        metadata.insert("PostHashHex".into(), json!(hex::encode(post_hash)));
    }
    for output in &transaction.outputs {
        builder.key(&output.public_key, "BasicTransferOutput");
    }
    Value::Object(metadata)
}

fn creator_coin_operation(operation_type: u8) -> &'static str {
    match operation_type {
        0 => "buy",
        1 => "sell",
        2 => "add",
        _ => "unknown",
    }
}

fn dao_coin_operation(operation_type: u8) -> &'static str {
    match operation_type {
        0 => "mint",
        1 => "burn",
        2 => "disable_minting",
        3 => "update_transfer_restriction_status",
        _ => "unknown",
    }
}

/// The summary specific to the kind of `transaction`.
fn kind_metadata(
    transaction: &Transaction,
    hash: &str,
    operations: &[UtxoOperation],
    builder: &mut Builder<'_>,
) -> Result<Value, EncodingError> {
    let value = match &transaction.metadata {
        TxnMeta::BlockReward(_)
        | TxnMeta::BasicTransfer(_)
        | TxnMeta::UpdateGlobalParams(_)
        | TxnMeta::UnregisterAsValidator(_)
        | TxnMeta::UnjailValidator(_) => json!({}),
        TxnMeta::BitcoinExchange(metadata) => json!({
            "BitcoinBlockHashHex": metadata.bitcoin_block_hash.to_hex(),
            "BitcoinMerkleRootHex": metadata.bitcoin_merkle_root.to_hex(),
        }),
        TxnMeta::PrivateMessage(metadata) => json!({
            "RecipientPublicKeyBase58Check":
                builder.key(&metadata.recipient_public_key, "PrivateMessageRecipient"),
            "TimestampNanos": metadata.timestamp_nanos,
        }),
        TxnMeta::SubmitPost(metadata) => {
            let post_hash = metadata
                .post_hash_to_modify
                .map_or_else(|| hash.to_string(), |hash| hash.to_hex());
            let parent_poster = find_operation(operations, OperationType::SUBMIT_POST)
                .and_then(|operation| operation.prev_parent_post_entry.as_ref())
                .map(|parent| builder.key(&parent.poster_public_key, "ParentPosterPublicKeyBase58Check"))
                .unwrap_or(Value::Null);
            json!({
                "PostHashHex": post_hash,
                "PostHashBeingModifiedHex": metadata.post_hash_to_modify.map(|hash| hash.to_hex()),
                "ParentPostHashHex": (!metadata.parent_stake_id.is_empty())
                    .then(|| hex::encode(&metadata.parent_stake_id)),
                "ParentPosterPublicKeyBase58Check": parent_poster,
            })
        }
        TxnMeta::UpdateProfile(metadata) => json!({
            "ProfilePublicKeyBase58Check": builder.optional_key(
                metadata.profile_public_key.as_ref(),
                "UpdatedProfilePublicKeyBase58Check",
            ),
            "NewUsername": lossy_string(&metadata.new_username),
            "NewCreatorBasisPoints": metadata.new_creator_basis_points,
            "IsHidden": metadata.is_hidden,
        }),
        TxnMeta::UpdateBitcoinUsdExchangeRate(metadata) => json!({
            "USDCentsPerBitcoin": metadata.usd_cents_per_bitcoin,
        }),
        TxnMeta::Follow(metadata) => json!({
            "FollowedPublicKeyBase58Check":
                builder.key(&metadata.followed_public_key, "FollowedPublicKeyBase58Check"),
            "IsUnfollow": metadata.is_unfollow,
        }),
        TxnMeta::Like(metadata) => {
            let poster = find_operation(operations, OperationType::LIKE)
                .and_then(|operation| operation.prev_post_entry.as_ref())
                .map(|post| builder.key(&post.poster_public_key, "PosterPublicKeyBase58Check"))
                .unwrap_or(Value::Null);
            json!({
                "PostHashHex": metadata.liked_post_hash.to_hex(),
                "IsUnlike": metadata.is_unlike,
                "PosterPublicKeyBase58Check": poster,
            })
        }
        TxnMeta::CreatorCoin(metadata) => {
            let diff = find_operation(operations, OperationType::CREATOR_COIN)
                .map_or(0, |operation| operation.creator_coin_deso_locked_nanos_diff);
            json!({
                "CreatorPublicKeyBase58Check":
                    builder.key(&metadata.profile_public_key, "CreatorPublicKeyBase58Check"),
                "OperationType": creator_coin_operation(metadata.operation_type),
                "DeSoToSellNanos": metadata.deso_to_sell_nanos,
                "CreatorCoinToSellNanos": metadata.creator_coin_to_sell_nanos,
                "DeSoToAddNanos": metadata.deso_to_add_nanos,
                "DESOLockedNanosDiff": diff,
            })
        }
        TxnMeta::SwapIdentity(metadata) => json!({
            "FromPublicKeyBase58Check":
                builder.key(&metadata.from_public_key, "SwapIdentityFromPublicKeyBase58Check"),
            "ToPublicKeyBase58Check":
                builder.key(&metadata.to_public_key, "SwapIdentityToPublicKeyBase58Check"),
        }),
        TxnMeta::CreatorCoinTransfer(metadata) => json!({
            "CreatorPublicKeyBase58Check":
                builder.key(&metadata.profile_public_key, "CreatorPublicKeyBase58Check"),
            "ReceiverPublicKeyBase58Check":
                builder.key(&metadata.receiver_public_key, "ReceiverPublicKeyBase58Check"),
            "CreatorCoinToTransferNanos": metadata.creator_coin_to_transfer_nanos,
        }),
        TxnMeta::CreateNft(metadata) => json!({
            "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
            "NumCopies": metadata.num_copies,
            "IsForSale": metadata.is_for_sale,
            "MinBidAmountNanos": metadata.min_bid_amount_nanos,
            "NFTRoyaltyToCreatorBasisPoints": metadata.nft_royalty_to_creator_basis_points,
            "NFTRoyaltyToCoinBasisPoints": metadata.nft_royalty_to_coin_basis_points,
        }),
        TxnMeta::UpdateNft(metadata) => json!({
            "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
            "SerialNumber": metadata.serial_number,
            "IsForSale": metadata.is_for_sale,
            "MinBidAmountNanos": metadata.min_bid_amount_nanos,
        }),
        TxnMeta::AcceptNftBid(metadata) => {
            let operation = find_operation(operations, OperationType::ACCEPT_NFT_BID);
            let bidder = match operation.and_then(|operation| operation.accept_nft_bid_bidder_public_key.as_ref()) {
                Some(bidder) => builder.key(bidder, "NFTBidderPublicKeyBase58Check"),
                None => builder.pkid(&metadata.bidder_pkid, "NFTBidderPublicKeyBase58Check"),
            };
            let creator = builder.optional_key(
                operation.and_then(|operation| operation.accept_nft_bid_creator_public_key.as_ref()),
                "NFTCreatorPublicKeyBase58Check",
            );
            json!({
                "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
                "SerialNumber": metadata.serial_number,
                "BidderPublicKeyBase58Check": bidder,
                "BidAmountNanos": metadata.bid_amount_nanos,
                "CreatorPublicKeyBase58Check": creator,
                "CreatorRoyaltyNanos": operation.map_or(0, |operation| operation.accept_nft_bid_creator_royalty_nanos),
                "CreatorDeSoSalesNanos": operation.map_or(0, |operation| operation.accept_nft_bid_creator_deso_sales_nanos),
            })
        }
        TxnMeta::NftBid(metadata) => {
            let owner = operations
                .iter()
                .find_map(|operation| operation.prev_nft_entry.as_ref())
                .map(|nft| builder.pkid(&nft.owner_pkid, "NFTOwnerPublicKeyBase58Check"))
                .unwrap_or(Value::Null);
            json!({
                "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
                "SerialNumber": metadata.serial_number,
                "BidAmountNanos": metadata.bid_amount_nanos,
                "OwnerPublicKeyBase58Check": owner,
            })
        }
        TxnMeta::NftTransfer(metadata) => json!({
            "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
            "SerialNumber": metadata.serial_number,
            "ReceiverPublicKeyBase58Check":
                builder.key(&metadata.receiver_public_key, "NFTTransferRecipientPublicKeyBase58Check"),
        }),
        TxnMeta::AcceptNftTransfer(metadata) => json!({
            "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
            "SerialNumber": metadata.serial_number,
        }),
        TxnMeta::BurnNft(metadata) => json!({
            "NFTPostHashHex": metadata.nft_post_hash.to_hex(),
            "SerialNumber": metadata.serial_number,
        }),
        TxnMeta::AuthorizeDerivedKey(metadata) => json!({
            "DerivedKeyPublicKeyBase58Check":
                builder.key(&metadata.derived_public_key, "AuthorizedDerivedPublicKeyBase58Check"),
            "ExpirationBlock": metadata.expiration_block,
            "OperationType": metadata.operation_type,
        }),
        TxnMeta::MessagingGroup(metadata) => json!({
            "MessagingPublicKeyBase58Check": metadata.messaging_public_key.to_base58_check(builder.params),
            "MessagingGroupKeyName": lossy_string(&metadata.messaging_group_key_name),
            "GroupMembersPublicKeyBase58Check": metadata
                .messaging_group_members
                .iter()
                .map(|member| builder.key(&member.group_member_public_key, "MessagingGroupMemberPublicKeyBase58Check"))
                .collect::<Vec<_>>(),
        }),
        TxnMeta::DaoCoin(metadata) => json!({
            "CreatorPublicKeyBase58Check":
                builder.key(&metadata.profile_public_key, "CreatorPublicKeyBase58Check"),
            "OperationType": dao_coin_operation(metadata.operation_type),
            "CoinsToMintNanos": hex_amount(&metadata.coins_to_mint_nanos),
            "CoinsToBurnNanos": hex_amount(&metadata.coins_to_burn_nanos),
            "TransferRestrictionStatus": metadata.transfer_restriction_status,
        }),
        TxnMeta::DaoCoinTransfer(metadata) => json!({
            "CreatorPublicKeyBase58Check":
                builder.key(&metadata.profile_public_key, "CreatorPublicKeyBase58Check"),
            "ReceiverPublicKeyBase58Check":
                builder.key(&metadata.receiver_public_key, "ReceiverPublicKeyBase58Check"),
            "DAOCoinToTransferNanos": hex_amount(&metadata.dao_coin_to_transfer_nanos),
        }),
        TxnMeta::DaoCoinLimitOrder(metadata) => {
            let filled = find_operation(operations, OperationType::DAO_COIN_LIMIT_ORDER)
                .map(|operation| operation.filled_dao_coin_limit_orders.as_slice())
                .unwrap_or_default()
                .iter()
                .map(|order| {
                    json!({
                        "OrderIdHex": order.order_id.to_hex(),
                        "TransactorPublicKeyBase58Check":
                            builder.pkid(&order.transactor_pkid, "FilledDAOCoinLimitOrderTransactor"),
                        "BuyingDAOCoinCreatorPublicKey":
                            order.buying_dao_coin_creator_pkid.to_base58_check(builder.params),
                        "SellingDAOCoinCreatorPublicKey":
                            order.selling_dao_coin_creator_pkid.to_base58_check(builder.params),
                        "CoinQuantityInBaseUnitsBought": hex_amount(&order.coin_quantity_in_base_units_bought),
                        "CoinQuantityInBaseUnitsSold": hex_amount(&order.coin_quantity_in_base_units_sold),
                        "IsFulfilled": order.is_fulfilled,
                    })
                })
                .collect::<Vec<_>>();
            json!({
                "BuyingDAOCoinCreatorPublicKey": builder.optional_key(
                    metadata.buying_dao_coin_creator_public_key.as_ref(),
                    "BuyingDAOCoinCreatorPublicKey",
                ),
                "SellingDAOCoinCreatorPublicKey": builder.optional_key(
                    metadata.selling_dao_coin_creator_public_key.as_ref(),
                    "SellingDAOCoinCreatorPublicKey",
                ),
                "ScaledExchangeRateCoinsToSellPerCoinToBuy":
                    hex_amount(&metadata.scaled_exchange_rate_coins_to_sell_per_coin_to_buy),
                "QuantityToFillInBaseUnits": hex_amount(&metadata.quantity_to_fill_in_base_units),
                "OperationType": metadata.operation_type,
                "FillType": metadata.fill_type,
                "CancelOrderIdHex": metadata.cancel_order_id.map(|order| order.to_hex()),
                "FilledDAOCoinLimitOrdersMetadata": filled,
            })
        }
        TxnMeta::CreateUserAssociation(metadata) => json!({
            "TargetUserPublicKeyBase58Check":
                builder.key(&metadata.target_user_public_key, "AssociationTargetUserPublicKeyBase58Check"),
            "AppPublicKeyBase58Check":
                builder.key(&metadata.app_public_key, "AssociationAppPublicKeyBase58Check"),
            "AssociationType": lossy_string(&metadata.association_type),
            "AssociationValue": lossy_string(&metadata.association_value),
        }),
        TxnMeta::DeleteUserAssociation(metadata) => json!({
            "AssociationIdHex": metadata.association_id.to_hex(),
        }),
        TxnMeta::CreatePostAssociation(metadata) => json!({
            "PostHashHex": metadata.post_hash.to_hex(),
            "AppPublicKeyBase58Check":
                builder.key(&metadata.app_public_key, "AssociationAppPublicKeyBase58Check"),
            "AssociationType": lossy_string(&metadata.association_type),
            "AssociationValue": lossy_string(&metadata.association_value),
        }),
        TxnMeta::DeletePostAssociation(metadata) => json!({
            "AssociationIdHex": metadata.association_id.to_hex(),
        }),
        TxnMeta::AccessGroup(metadata) => json!({
            "AccessGroupOwnerPublicKeyBase58Check":
                builder.key(&metadata.access_group_owner_public_key, "AccessGroupOwnerPublicKeyBase58Check"),
            "AccessGroupPublicKeyBase58Check":
                metadata.access_group_public_key.to_base58_check(builder.params),
            "AccessGroupKeyName": lossy_string(&metadata.access_group_key_name),
            "AccessGroupOperationType": metadata.access_group_operation_type,
        }),
        TxnMeta::AccessGroupMembers(metadata) => json!({
            "AccessGroupOwnerPublicKeyBase58Check":
                builder.key(&metadata.access_group_owner_public_key, "AccessGroupOwnerPublicKeyBase58Check"),
            "AccessGroupKeyName": lossy_string(&metadata.access_group_key_name),
            "AccessGroupMembersList": metadata
                .access_group_members_list
                .iter()
                .map(|member| builder.key(&member.access_group_member_public_key, "AccessGroupMemberPublicKeyBase58Check"))
                .collect::<Vec<_>>(),
            "AccessGroupMemberOperationType": metadata.access_group_member_operation_type,
        }),
        TxnMeta::NewMessage(metadata) => json!({
            "SenderAccessGroupOwnerPublicKeyBase58Check":
                metadata.sender_access_group_owner_public_key.to_base58_check(builder.params),
            "RecipientAccessGroupOwnerPublicKeyBase58Check":
                builder.key(&metadata.recipient_access_group_owner_public_key, "NewMessageRecipientPublicKeyBase58Check"),
            "RecipientAccessGroupKeyName": lossy_string(&metadata.recipient_access_group_key_name),
            "TimestampNanos": metadata.timestamp_nanos,
            "NewMessageType": metadata.new_message_type,
            "NewMessageOperation": metadata.new_message_operation,
        }),
        TxnMeta::RegisterAsValidator(metadata) => json!({
            "Domains": metadata.domains.iter().map(|domain| lossy_string(domain)).collect::<Vec<_>>(),
            "DisableDelegatedStake": metadata.disable_delegated_stake,
            "DelegatedStakeCommissionBasisPoints": metadata.delegated_stake_commission_basis_points,
            "VotingPublicKey": hex::encode(&metadata.voting_public_key),
        }),
        TxnMeta::Stake(metadata) => json!({
            "ValidatorPublicKeyBase58Check":
                builder.key(&metadata.validator_public_key, "StakeValidatorPublicKeyBase58Check"),
            "RewardMethod": metadata.reward_method,
            "StakeAmountNanos": hex_amount(&metadata.stake_amount_nanos),
        }),
        TxnMeta::Unstake(metadata) => json!({
            "ValidatorPublicKeyBase58Check":
                builder.key(&metadata.validator_public_key, "UnstakeValidatorPublicKeyBase58Check"),
            "UnstakeAmountNanos": hex_amount(&metadata.unstake_amount_nanos),
        }),
        TxnMeta::UnlockStake(metadata) => json!({
            "ValidatorPublicKeyBase58Check":
                builder.key(&metadata.validator_public_key, "UnlockStakeValidatorPublicKeyBase58Check"),
            "StartEpochNumber": metadata.start_epoch_number,
            "EndEpochNumber": metadata.end_epoch_number,
        }),
        TxnMeta::CoinLockup(metadata) => json!({
            "ProfilePublicKeyBase58Check":
                builder.key(&metadata.profile_public_key, "CoinLockupProfilePublicKeyBase58Check"),
            "RecipientPublicKeyBase58Check":
                builder.key(&metadata.recipient_public_key, "CoinLockupRecipientPublicKeyBase58Check"),
            "UnlockTimestampNanoSecs": metadata.unlock_timestamp_nano_secs,
            "VestingEndTimestampNanoSecs": metadata.vesting_end_timestamp_nano_secs,
            "LockupAmountBaseUnits": hex_amount(&metadata.lockup_amount_base_units),
        }),
        TxnMeta::UpdateCoinLockupParams(metadata) => json!({
            "LockupYieldDurationNanoSecs": metadata.lockup_yield_duration_nano_secs,
            "LockupYieldAPYBasisPoints": metadata.lockup_yield_apy_basis_points,
            "RemoveYieldCurvePoint": metadata.remove_yield_curve_point,
            "NewLockupTransferRestrictions": metadata.new_lockup_transfer_restrictions,
            "LockupTransferRestrictionStatus": metadata.lockup_transfer_restriction_status,
        }),
        TxnMeta::CoinLockupTransfer(metadata) => json!({
            "RecipientPublicKeyBase58Check":
                builder.key(&metadata.recipient_public_key, "CoinLockupTransferRecipientPublicKeyBase58Check"),
            "ProfilePublicKeyBase58Check":
                builder.key(&metadata.profile_public_key, "CoinLockupTransferProfilePublicKeyBase58Check"),
            "UnlockTimestampNanoSecs": metadata.unlock_timestamp_nano_secs,
            "LockedCoinsToTransferBaseUnits": hex_amount(&metadata.locked_coins_to_transfer_base_units),
        }),
        TxnMeta::CoinUnlock(metadata) => json!({
            "ProfilePublicKeyBase58Check":
                builder.key(&metadata.profile_public_key, "CoinUnlockProfilePublicKeyBase58Check"),
        }),
        TxnMeta::AtomicTxnsWrapper(metadata) => {
            let hashes = metadata
                .txns
                .iter()
                .map(|inner| inner.hash().map(|hash| hash.to_hex()))
                .collect::<Result<Vec<_>, _>>()?;
            json!({ "InnerTransactionHashes": hashes })
        }
    };
    Ok(value)
}

/// Builds the index of `transaction`, whose hash is `hash`, from the operations
/// connecting it.
pub fn transaction_index(
    transaction: &Transaction,
    hash: &str,
    operations: &[UtxoOperation],
    params: &NetworkParams,
) -> Result<TransactionIndex, EncodingError> {
    let mut builder = Builder {
        params,
        affected: Vec::new(),
    };
    if let Some(public_key) = &transaction.public_key {
        builder.key(public_key, "TransactorPublicKeyBase58Check");
    }
    let basic_transfer = basic_transfer(transaction, operations, &mut builder);
    let mut metadata = match kind_metadata(transaction, hash, operations, &mut builder)? {
        Value::Object(metadata) => metadata,
        _ => Map::new(),
    };
    metadata.insert(
        "TxnType".into(),
        json!(transaction.txn_type().name()),
    );
    if let Some(public_key) = &transaction.public_key {
        metadata.insert(
            "TransactorPublicKeyBase58Check".into(),
            json!(public_key.to_base58_check(params)),
        );
    }
    Ok(TransactionIndex {
        metadata: Value::Object(metadata),
        basic_transfer,
        affected: builder.affected,
    })
}
