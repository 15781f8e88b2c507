// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-kind transaction metadata and its binary layout.
//!
//! Public keys inside metadata are length-prefixed; post hashes are raw 32-byte values
//! unless noted otherwise.

use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

use crate::{
    codec::{BinaryCodec, EncodingError, Reader, WriteExt as _},
    crypto::{CryptoHash, Pkid, PublicKey},
    data_types::{read_extra_data, write_extra_data, ExtraData, Uint256},
    text::{utf8_lossy, utf8_lossy_vec},
    transaction::{Transaction, TxInput, TxnType},
};

/// Maximum length of an association type, in bytes.
pub const MAX_ASSOCIATION_TYPE_LENGTH: usize = 64;

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockRewardMetadata {
    #[serde_as(as = "Hex")]
    pub extra_data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BasicTransferMetadata {}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MerkleProofStep {
    pub hash: CryptoHash,
    pub is_left: bool,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BitcoinExchangeMetadata {
    #[serde_as(as = "Hex")]
    pub bitcoin_transaction: Vec<u8>,
    pub bitcoin_block_hash: CryptoHash,
    pub bitcoin_merkle_root: CryptoHash,
    pub bitcoin_merkle_proof: Vec<MerkleProofStep>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrivateMessageMetadata {
    pub recipient_public_key: PublicKey,
    #[serde_as(as = "Hex")]
    pub encrypted_text: Vec<u8>,
    pub timestamp_nanos: u64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubmitPostMetadata {
    pub post_hash_to_modify: Option<CryptoHash>,
    #[serde_as(as = "Hex")]
    pub parent_stake_id: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub body: Vec<u8>,
    pub creator_basis_points: u64,
    pub stake_multiple_basis_points: u64,
    pub timestamp_nanos: u64,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateProfileMetadata {
    pub profile_public_key: Option<PublicKey>,
    #[serde(with = "utf8_lossy")]
    pub new_username: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub new_description: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub new_profile_pic: Vec<u8>,
    pub new_creator_basis_points: u64,
    pub new_stake_multiple_basis_points: u64,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateBitcoinUsdExchangeRateMetadata {
    pub usd_cents_per_bitcoin: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FollowMetadata {
    pub followed_public_key: PublicKey,
    pub is_unfollow: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LikeMetadata {
    pub liked_post_hash: CryptoHash,
    pub is_unlike: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatorCoinMetadata {
    pub profile_public_key: PublicKey,
    /// 0 buy, 1 sell, 2 add.
    pub operation_type: u8,
    pub deso_to_sell_nanos: u64,
    pub creator_coin_to_sell_nanos: u64,
    pub deso_to_add_nanos: u64,
    pub min_deso_expected_nanos: u64,
    pub min_creator_coin_expected_nanos: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwapIdentityMetadata {
    pub from_public_key: PublicKey,
    pub to_public_key: PublicKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateGlobalParamsMetadata {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatorCoinTransferMetadata {
    pub profile_public_key: PublicKey,
    pub creator_coin_to_transfer_nanos: u64,
    pub receiver_public_key: PublicKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateNftMetadata {
    pub nft_post_hash: CryptoHash,
    pub num_copies: u64,
    pub has_unlockable: bool,
    pub is_for_sale: bool,
    pub min_bid_amount_nanos: u64,
    pub nft_royalty_to_creator_basis_points: u64,
    pub nft_royalty_to_coin_basis_points: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateNftMetadata {
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
    pub is_for_sale: bool,
    pub min_bid_amount_nanos: u64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcceptNftBidMetadata {
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
    pub bidder_pkid: Pkid,
    pub bid_amount_nanos: u64,
    #[serde_as(as = "Hex")]
    pub unlockable_text: Vec<u8>,
    pub bidder_inputs: Vec<TxInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NftBidMetadata {
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
    pub bid_amount_nanos: u64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NftTransferMetadata {
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
    pub receiver_public_key: PublicKey,
    #[serde_as(as = "Hex")]
    pub unlockable_text: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcceptNftTransferMetadata {
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BurnNftMetadata {
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorizeDerivedKeyMetadata {
    pub derived_public_key: PublicKey,
    pub expiration_block: u64,
    /// 0 revokes the key, 1 authorizes it.
    pub operation_type: u8,
    #[serde_as(as = "Hex")]
    pub access_signature: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessagingGroupMember {
    pub group_member_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub group_member_key_name: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub encrypted_key: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessagingGroupMetadata {
    pub messaging_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub messaging_group_key_name: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub group_owner_signature: Vec<u8>,
    pub messaging_group_members: Vec<MessagingGroupMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaoCoinMetadata {
    pub profile_public_key: PublicKey,
    /// 0 mint, 1 burn, 2 disable minting, 3 update transfer restriction.
    pub operation_type: u8,
    pub coins_to_mint_nanos: Uint256,
    pub coins_to_burn_nanos: Uint256,
    pub transfer_restriction_status: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaoCoinTransferMetadata {
    pub profile_public_key: PublicKey,
    pub dao_coin_to_transfer_nanos: Uint256,
    pub receiver_public_key: PublicKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DaoCoinLimitOrderMetadata {
    /// `None` stands for DESO.
    pub buying_dao_coin_creator_public_key: Option<PublicKey>,
    pub selling_dao_coin_creator_public_key: Option<PublicKey>,
    pub scaled_exchange_rate_coins_to_sell_per_coin_to_buy: Uint256,
    pub quantity_to_fill_in_base_units: Uint256,
    /// 1 ask, 2 bid.
    pub operation_type: u64,
    /// 1 good-till-cancelled, 2 immediate-or-cancel, 3 fill-or-kill.
    pub fill_type: u64,
    pub cancel_order_id: Option<CryptoHash>,
    pub fee_nanos: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateUserAssociationMetadata {
    pub target_user_public_key: PublicKey,
    pub app_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub association_type: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub association_value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteUserAssociationMetadata {
    pub association_id: CryptoHash,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatePostAssociationMetadata {
    pub post_hash: CryptoHash,
    pub app_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub association_type: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub association_value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeletePostAssociationMetadata {
    pub association_id: CryptoHash,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessGroupMetadata {
    pub access_group_owner_public_key: PublicKey,
    pub access_group_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub access_group_key_name: Vec<u8>,
    /// 2 create, 3 update.
    pub access_group_operation_type: u8,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessGroupMember {
    pub access_group_member_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub access_group_member_key_name: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub encrypted_key: Vec<u8>,
    #[serde_as(as = "std::collections::BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessGroupMembersMetadata {
    pub access_group_owner_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub access_group_key_name: Vec<u8>,
    pub access_group_members_list: Vec<AccessGroupMember>,
    /// 2 add, 3 remove, 4 update.
    pub access_group_member_operation_type: u8,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewMessageMetadata {
    pub sender_access_group_owner_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub sender_access_group_key_name: Vec<u8>,
    pub sender_access_group_public_key: PublicKey,
    pub recipient_access_group_owner_public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub recipient_access_group_key_name: Vec<u8>,
    pub recipient_access_group_public_key: PublicKey,
    #[serde_as(as = "Hex")]
    pub encrypted_text: Vec<u8>,
    pub timestamp_nanos: u64,
    /// 0 direct message, 1 group chat.
    pub new_message_type: u8,
    /// 0 create, 1 update.
    pub new_message_operation: u8,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterAsValidatorMetadata {
    #[serde(with = "utf8_lossy_vec")]
    pub domains: Vec<Vec<u8>>,
    pub disable_delegated_stake: bool,
    pub delegated_stake_commission_basis_points: u64,
    #[serde_as(as = "Hex")]
    pub voting_public_key: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub voting_authorization: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnregisterAsValidatorMetadata {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StakeMetadata {
    pub validator_public_key: PublicKey,
    /// 0 pay to balance, 1 restake.
    pub reward_method: u8,
    pub stake_amount_nanos: Uint256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnstakeMetadata {
    pub validator_public_key: PublicKey,
    pub unstake_amount_nanos: Uint256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnlockStakeMetadata {
    pub validator_public_key: PublicKey,
    pub start_epoch_number: u64,
    pub end_epoch_number: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnjailValidatorMetadata {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoinLockupMetadata {
    pub profile_public_key: PublicKey,
    pub recipient_public_key: PublicKey,
    pub unlock_timestamp_nano_secs: i64,
    pub vesting_end_timestamp_nano_secs: i64,
    pub lockup_amount_base_units: Uint256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateCoinLockupParamsMetadata {
    pub lockup_yield_duration_nano_secs: i64,
    pub lockup_yield_apy_basis_points: u64,
    pub remove_yield_curve_point: bool,
    pub new_lockup_transfer_restrictions: bool,
    pub lockup_transfer_restriction_status: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoinLockupTransferMetadata {
    pub recipient_public_key: PublicKey,
    pub profile_public_key: PublicKey,
    pub unlock_timestamp_nano_secs: i64,
    pub locked_coins_to_transfer_base_units: Uint256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoinUnlockMetadata {
    pub profile_public_key: PublicKey,
}

/// Groups inner transactions that must be connected all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AtomicTxnsWrapperMetadata {
    pub txns: Vec<Transaction>,
}

macro_rules! txn_meta {
    ($($variant:ident($metadata:ident),)*) => {
        /// The decoded metadata of a transaction.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(untagged)]
        pub enum TxnMeta {
            $($variant($metadata),)*
        }

        impl TxnMeta {
            pub fn txn_type(&self) -> TxnType {
                match self {
                    $(TxnMeta::$variant(_) => TxnType::$variant,)*
                }
            }

            pub fn to_bytes(&self) -> Result<Vec<u8>, EncodingError> {
                match self {
                    $(TxnMeta::$variant(metadata) => metadata.to_bytes(),)*
                }
            }

            /// Decodes the metadata bytes of a transaction of type `txn_type`.
            pub fn decode(txn_type: TxnType, bytes: &[u8]) -> Result<Self, EncodingError> {
                match txn_type {
                    $(TxnType::$variant => Ok(TxnMeta::$variant($metadata::from_bytes(bytes)?)),)*
                }
            }
        }

        $(
            impl From<$metadata> for TxnMeta {
                fn from(metadata: $metadata) -> Self {
                    TxnMeta::$variant(metadata)
                }
            }
        )*
    };
}

txn_meta! {
    BlockReward(BlockRewardMetadata),
    BasicTransfer(BasicTransferMetadata),
    BitcoinExchange(BitcoinExchangeMetadata),
    PrivateMessage(PrivateMessageMetadata),
    SubmitPost(SubmitPostMetadata),
    UpdateProfile(UpdateProfileMetadata),
    UpdateBitcoinUsdExchangeRate(UpdateBitcoinUsdExchangeRateMetadata),
    Follow(FollowMetadata),
    Like(LikeMetadata),
    CreatorCoin(CreatorCoinMetadata),
    SwapIdentity(SwapIdentityMetadata),
    UpdateGlobalParams(UpdateGlobalParamsMetadata),
    CreatorCoinTransfer(CreatorCoinTransferMetadata),
    CreateNft(CreateNftMetadata),
    UpdateNft(UpdateNftMetadata),
    AcceptNftBid(AcceptNftBidMetadata),
    NftBid(NftBidMetadata),
    NftTransfer(NftTransferMetadata),
    AcceptNftTransfer(AcceptNftTransferMetadata),
    BurnNft(BurnNftMetadata),
    AuthorizeDerivedKey(AuthorizeDerivedKeyMetadata),
    MessagingGroup(MessagingGroupMetadata),
    DaoCoin(DaoCoinMetadata),
    DaoCoinTransfer(DaoCoinTransferMetadata),
    DaoCoinLimitOrder(DaoCoinLimitOrderMetadata),
    CreateUserAssociation(CreateUserAssociationMetadata),
    DeleteUserAssociation(DeleteUserAssociationMetadata),
    CreatePostAssociation(CreatePostAssociationMetadata),
    DeletePostAssociation(DeletePostAssociationMetadata),
    AccessGroup(AccessGroupMetadata),
    AccessGroupMembers(AccessGroupMembersMetadata),
    NewMessage(NewMessageMetadata),
    RegisterAsValidator(RegisterAsValidatorMetadata),
    UnregisterAsValidator(UnregisterAsValidatorMetadata),
    Stake(StakeMetadata),
    Unstake(UnstakeMetadata),
    UnlockStake(UnlockStakeMetadata),
    UnjailValidator(UnjailValidatorMetadata),
    CoinLockup(CoinLockupMetadata),
    UpdateCoinLockupParams(UpdateCoinLockupParamsMetadata),
    CoinLockupTransfer(CoinLockupTransferMetadata),
    CoinUnlock(CoinUnlockMetadata),
    AtomicTxnsWrapper(AtomicTxnsWrapperMetadata),
}

fn check_association_type(association_type: &[u8]) -> Result<(), EncodingError> {
    if association_type.len() > MAX_ASSOCIATION_TYPE_LENGTH {
        return Err(EncodingError::FieldTooLong {
            field: "association type",
            length: association_type.len(),
            max: MAX_ASSOCIATION_TYPE_LENGTH,
        });
    }
    Ok(())
}

impl BinaryCodec for BlockRewardMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_var_bytes(&self.extra_data);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            extra_data: reader.read_var_bytes()?,
        })
    }
}

macro_rules! empty_metadata_codec {
    ($($metadata:ident),*) => {
        $(
            impl BinaryCodec for $metadata {
                fn encode_to(&self, _out: &mut Vec<u8>) -> Result<(), EncodingError> {
                    Ok(())
                }

                fn decode_from(_reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
                    Ok(Self {})
                }
            }
        )*
    };
}

empty_metadata_codec!(
    BasicTransferMetadata,
    UpdateGlobalParamsMetadata,
    UnregisterAsValidatorMetadata,
    UnjailValidatorMetadata
);

impl BinaryCodec for BitcoinExchangeMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_var_bytes(&self.bitcoin_transaction);
        out.put_slice(self.bitcoin_block_hash.as_bytes());
        out.put_slice(self.bitcoin_merkle_root.as_bytes());
        out.put_uvarint(self.bitcoin_merkle_proof.len() as u64);
        for step in &self.bitcoin_merkle_proof {
            out.put_slice(step.hash.as_bytes());
            out.put_bool(step.is_left);
        }
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            bitcoin_transaction: reader.read_var_bytes()?,
            bitcoin_block_hash: CryptoHash::decode_from(reader)?,
            bitcoin_merkle_root: CryptoHash::decode_from(reader)?,
            bitcoin_merkle_proof: reader.read_vec(|reader| {
                Ok(MerkleProofStep {
                    hash: CryptoHash::decode_from(reader)?,
                    is_left: reader.read_bool()?,
                })
            })?,
        })
    }
}

impl BinaryCodec for PrivateMessageMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.recipient_public_key.write_prefixed(out);
        out.put_var_bytes(&self.encrypted_text);
        out.put_uvarint(self.timestamp_nanos);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            recipient_public_key: PublicKey::read_prefixed(reader, "recipient public key")?,
            encrypted_text: reader.read_var_bytes()?,
            timestamp_nanos: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for SubmitPostMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        CryptoHash::write_prefixed_optional(self.post_hash_to_modify.as_ref(), out);
        out.put_var_bytes(&self.parent_stake_id);
        out.put_var_bytes(&self.body);
        out.put_uvarint(self.creator_basis_points);
        out.put_uvarint(self.stake_multiple_basis_points);
        out.put_uvarint(self.timestamp_nanos);
        out.put_bool(self.is_hidden);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            post_hash_to_modify: CryptoHash::read_prefixed_optional(
                reader,
                "post hash to modify",
            )?,
            parent_stake_id: reader.read_var_bytes()?,
            body: reader.read_var_bytes()?,
            creator_basis_points: reader.read_uvarint()?,
            stake_multiple_basis_points: reader.read_uvarint()?,
            timestamp_nanos: reader.read_uvarint()?,
            is_hidden: reader.read_bool()?,
        })
    }
}

impl BinaryCodec for UpdateProfileMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        PublicKey::write_prefixed_optional(self.profile_public_key.as_ref(), out);
        out.put_var_bytes(&self.new_username);
        out.put_var_bytes(&self.new_description);
        out.put_var_bytes(&self.new_profile_pic);
        out.put_uvarint(self.new_creator_basis_points);
        out.put_uvarint(self.new_stake_multiple_basis_points);
        out.put_bool(self.is_hidden);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed_optional(reader, "profile public key")?,
            new_username: reader.read_var_bytes()?,
            new_description: reader.read_var_bytes()?,
            new_profile_pic: reader.read_var_bytes()?,
            new_creator_basis_points: reader.read_uvarint()?,
            new_stake_multiple_basis_points: reader.read_uvarint()?,
            is_hidden: reader.read_bool()?,
        })
    }
}

impl BinaryCodec for UpdateBitcoinUsdExchangeRateMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_uvarint(self.usd_cents_per_bitcoin);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            usd_cents_per_bitcoin: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for FollowMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.followed_public_key.write_prefixed(out);
        out.put_bool(self.is_unfollow);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            followed_public_key: PublicKey::read_prefixed(reader, "followed public key")?,
            is_unfollow: reader.read_bool()?,
        })
    }
}

impl BinaryCodec for LikeMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.liked_post_hash.as_bytes());
        out.put_bool(self.is_unlike);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            liked_post_hash: CryptoHash::decode_from(reader)?,
            is_unlike: reader.read_bool()?,
        })
    }
}

impl BinaryCodec for CreatorCoinMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.profile_public_key.write_prefixed(out);
        out.put_u8(self.operation_type);
        out.put_uvarint(self.deso_to_sell_nanos);
        out.put_uvarint(self.creator_coin_to_sell_nanos);
        out.put_uvarint(self.deso_to_add_nanos);
        out.put_uvarint(self.min_deso_expected_nanos);
        out.put_uvarint(self.min_creator_coin_expected_nanos);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
            operation_type: reader.read_u8()?,
            deso_to_sell_nanos: reader.read_uvarint()?,
            creator_coin_to_sell_nanos: reader.read_uvarint()?,
            deso_to_add_nanos: reader.read_uvarint()?,
            min_deso_expected_nanos: reader.read_uvarint()?,
            min_creator_coin_expected_nanos: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for SwapIdentityMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.from_public_key.write_prefixed(out);
        self.to_public_key.write_prefixed(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            from_public_key: PublicKey::read_prefixed(reader, "from public key")?,
            to_public_key: PublicKey::read_prefixed(reader, "to public key")?,
        })
    }
}

impl BinaryCodec for CreatorCoinTransferMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.profile_public_key.write_prefixed(out);
        out.put_uvarint(self.creator_coin_to_transfer_nanos);
        self.receiver_public_key.write_prefixed(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
            creator_coin_to_transfer_nanos: reader.read_uvarint()?,
            receiver_public_key: PublicKey::read_prefixed(reader, "receiver public key")?,
        })
    }
}

impl BinaryCodec for CreateNftMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.nft_post_hash.as_bytes());
        out.put_uvarint(self.num_copies);
        out.put_bool(self.has_unlockable);
        out.put_bool(self.is_for_sale);
        out.put_uvarint(self.min_bid_amount_nanos);
        out.put_uvarint(self.nft_royalty_to_creator_basis_points);
        out.put_uvarint(self.nft_royalty_to_coin_basis_points);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            nft_post_hash: CryptoHash::decode_from(reader)?,
            num_copies: reader.read_uvarint()?,
            has_unlockable: reader.read_bool()?,
            is_for_sale: reader.read_bool()?,
            min_bid_amount_nanos: reader.read_uvarint()?,
            nft_royalty_to_creator_basis_points: reader.read_uvarint()?,
            nft_royalty_to_coin_basis_points: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for UpdateNftMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.nft_post_hash.as_bytes());
        out.put_uvarint(self.serial_number);
        out.put_bool(self.is_for_sale);
        out.put_uvarint(self.min_bid_amount_nanos);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            nft_post_hash: CryptoHash::decode_from(reader)?,
            serial_number: reader.read_uvarint()?,
            is_for_sale: reader.read_bool()?,
            min_bid_amount_nanos: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for AcceptNftBidMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.nft_post_hash.as_bytes());
        out.put_uvarint(self.serial_number);
        self.bidder_pkid.write_prefixed(out);
        out.put_uvarint(self.bid_amount_nanos);
        out.put_var_bytes(&self.unlockable_text);
        out.put_uvarint(self.bidder_inputs.len() as u64);
        for input in &self.bidder_inputs {
            input.encode_to(out)?;
        }
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            nft_post_hash: CryptoHash::decode_from(reader)?,
            serial_number: reader.read_uvarint()?,
            bidder_pkid: Pkid::read_prefixed(reader, "bidder PKID")?,
            bid_amount_nanos: reader.read_uvarint()?,
            unlockable_text: reader.read_var_bytes()?,
            bidder_inputs: reader.read_vec(TxInput::decode_from)?,
        })
    }
}

impl BinaryCodec for NftBidMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.nft_post_hash.as_bytes());
        out.put_uvarint(self.serial_number);
        out.put_uvarint(self.bid_amount_nanos);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            nft_post_hash: CryptoHash::decode_from(reader)?,
            serial_number: reader.read_uvarint()?,
            bid_amount_nanos: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for NftTransferMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.nft_post_hash.as_bytes());
        out.put_uvarint(self.serial_number);
        self.receiver_public_key.write_prefixed(out);
        out.put_var_bytes(&self.unlockable_text);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            nft_post_hash: CryptoHash::decode_from(reader)?,
            serial_number: reader.read_uvarint()?,
            receiver_public_key: PublicKey::read_prefixed(reader, "receiver public key")?,
            unlockable_text: reader.read_var_bytes()?,
        })
    }
}

macro_rules! nft_serial_codec {
    ($($metadata:ident),*) => {
        $(
            impl BinaryCodec for $metadata {
                fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
                    out.put_slice(self.nft_post_hash.as_bytes());
                    out.put_uvarint(self.serial_number);
                    Ok(())
                }

                fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
                    Ok(Self {
                        nft_post_hash: CryptoHash::decode_from(reader)?,
                        serial_number: reader.read_uvarint()?,
                    })
                }
            }
        )*
    };
}

nft_serial_codec!(AcceptNftTransferMetadata, BurnNftMetadata);

impl BinaryCodec for AuthorizeDerivedKeyMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.derived_public_key.write_prefixed(out);
        out.put_uvarint(self.expiration_block);
        out.put_u8(self.operation_type);
        out.put_var_bytes(&self.access_signature);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            derived_public_key: PublicKey::read_prefixed(reader, "derived public key")?,
            expiration_block: reader.read_uvarint()?,
            operation_type: reader.read_u8()?,
            access_signature: reader.read_var_bytes()?,
        })
    }
}

impl BinaryCodec for MessagingGroupMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.messaging_public_key.write_prefixed(out);
        out.put_var_bytes(&self.messaging_group_key_name);
        out.put_var_bytes(&self.group_owner_signature);
        out.put_uvarint(self.messaging_group_members.len() as u64);
        for member in &self.messaging_group_members {
            member.group_member_public_key.write_prefixed(out);
            out.put_var_bytes(&member.group_member_key_name);
            out.put_var_bytes(&member.encrypted_key);
        }
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            messaging_public_key: PublicKey::read_prefixed(reader, "messaging public key")?,
            messaging_group_key_name: reader.read_var_bytes()?,
            group_owner_signature: reader.read_var_bytes()?,
            messaging_group_members: reader.read_vec(|reader| {
                Ok(MessagingGroupMember {
                    group_member_public_key: PublicKey::read_prefixed(
                        reader,
                        "group member public key",
                    )?,
                    group_member_key_name: reader.read_var_bytes()?,
                    encrypted_key: reader.read_var_bytes()?,
                })
            })?,
        })
    }
}

impl BinaryCodec for DaoCoinMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.profile_public_key.write_prefixed(out);
        out.put_u8(self.operation_type);
        self.coins_to_mint_nanos.write_to(out);
        self.coins_to_burn_nanos.write_to(out);
        out.put_u8(self.transfer_restriction_status);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
            operation_type: reader.read_u8()?,
            coins_to_mint_nanos: Uint256::read_from(reader)?,
            coins_to_burn_nanos: Uint256::read_from(reader)?,
            transfer_restriction_status: reader.read_u8()?,
        })
    }
}

impl BinaryCodec for DaoCoinTransferMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.profile_public_key.write_prefixed(out);
        self.dao_coin_to_transfer_nanos.write_to(out);
        self.receiver_public_key.write_prefixed(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
            dao_coin_to_transfer_nanos: Uint256::read_from(reader)?,
            receiver_public_key: PublicKey::read_prefixed(reader, "receiver public key")?,
        })
    }
}

impl BinaryCodec for DaoCoinLimitOrderMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        PublicKey::write_prefixed_optional(self.buying_dao_coin_creator_public_key.as_ref(), out);
        PublicKey::write_prefixed_optional(self.selling_dao_coin_creator_public_key.as_ref(), out);
        self.scaled_exchange_rate_coins_to_sell_per_coin_to_buy
            .write_to(out);
        self.quantity_to_fill_in_base_units.write_to(out);
        out.put_uvarint(self.operation_type);
        out.put_uvarint(self.fill_type);
        CryptoHash::write_prefixed_optional(self.cancel_order_id.as_ref(), out);
        out.put_uvarint(self.fee_nanos);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            buying_dao_coin_creator_public_key: PublicKey::read_prefixed_optional(
                reader,
                "buying creator public key",
            )?,
            selling_dao_coin_creator_public_key: PublicKey::read_prefixed_optional(
                reader,
                "selling creator public key",
            )?,
            scaled_exchange_rate_coins_to_sell_per_coin_to_buy: Uint256::read_from(reader)?,
            quantity_to_fill_in_base_units: Uint256::read_from(reader)?,
            operation_type: reader.read_uvarint()?,
            fill_type: reader.read_uvarint()?,
            cancel_order_id: CryptoHash::read_prefixed_optional(reader, "cancel order id")?,
            fee_nanos: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for CreateUserAssociationMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        check_association_type(&self.association_type)?;
        self.target_user_public_key.write_prefixed(out);
        self.app_public_key.write_prefixed(out);
        out.put_var_bytes(&self.association_type);
        out.put_var_bytes(&self.association_value);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        let metadata = Self {
            target_user_public_key: PublicKey::read_prefixed(reader, "target user public key")?,
            app_public_key: PublicKey::read_prefixed(reader, "app public key")?,
            association_type: reader.read_var_bytes()?,
            association_value: reader.read_var_bytes()?,
        };
        check_association_type(&metadata.association_type)?;
        Ok(metadata)
    }
}

impl BinaryCodec for CreatePostAssociationMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        check_association_type(&self.association_type)?;
        self.post_hash.write_prefixed(out);
        self.app_public_key.write_prefixed(out);
        out.put_var_bytes(&self.association_type);
        out.put_var_bytes(&self.association_value);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        let metadata = Self {
            post_hash: CryptoHash::read_prefixed(reader, "post hash")?,
            app_public_key: PublicKey::read_prefixed(reader, "app public key")?,
            association_type: reader.read_var_bytes()?,
            association_value: reader.read_var_bytes()?,
        };
        check_association_type(&metadata.association_type)?;
        Ok(metadata)
    }
}

macro_rules! delete_association_codec {
    ($($metadata:ident),*) => {
        $(
            impl BinaryCodec for $metadata {
                fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
                    self.association_id.write_prefixed(out);
                    Ok(())
                }

                fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
                    Ok(Self {
                        association_id: CryptoHash::read_prefixed(reader, "association id")?,
                    })
                }
            }
        )*
    };
}

delete_association_codec!(DeleteUserAssociationMetadata, DeletePostAssociationMetadata);

impl BinaryCodec for AccessGroupMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.access_group_owner_public_key.write_prefixed(out);
        self.access_group_public_key.write_prefixed(out);
        out.put_var_bytes(&self.access_group_key_name);
        out.put_u8(self.access_group_operation_type);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            access_group_owner_public_key: PublicKey::read_prefixed(
                reader,
                "access group owner public key",
            )?,
            access_group_public_key: PublicKey::read_prefixed(reader, "access group public key")?,
            access_group_key_name: reader.read_var_bytes()?,
            access_group_operation_type: reader.read_u8()?,
        })
    }
}

impl BinaryCodec for AccessGroupMembersMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.access_group_owner_public_key.write_prefixed(out);
        out.put_var_bytes(&self.access_group_key_name);
        out.put_uvarint(self.access_group_members_list.len() as u64);
        for member in &self.access_group_members_list {
            member.access_group_member_public_key.write_prefixed(out);
            out.put_var_bytes(&member.access_group_member_key_name);
            out.put_var_bytes(&member.encrypted_key);
            write_extra_data(&member.extra_data, out);
        }
        out.put_u8(self.access_group_member_operation_type);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            access_group_owner_public_key: PublicKey::read_prefixed(
                reader,
                "access group owner public key",
            )?,
            access_group_key_name: reader.read_var_bytes()?,
            access_group_members_list: reader.read_vec(|reader| {
                Ok(AccessGroupMember {
                    access_group_member_public_key: PublicKey::read_prefixed(
                        reader,
                        "access group member public key",
                    )?,
                    access_group_member_key_name: reader.read_var_bytes()?,
                    encrypted_key: reader.read_var_bytes()?,
                    extra_data: read_extra_data(reader)?,
                })
            })?,
            access_group_member_operation_type: reader.read_u8()?,
        })
    }
}

impl BinaryCodec for NewMessageMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.sender_access_group_owner_public_key
            .write_prefixed(out);
        out.put_var_bytes(&self.sender_access_group_key_name);
        self.sender_access_group_public_key.write_prefixed(out);
        self.recipient_access_group_owner_public_key
            .write_prefixed(out);
        out.put_var_bytes(&self.recipient_access_group_key_name);
        self.recipient_access_group_public_key.write_prefixed(out);
        out.put_var_bytes(&self.encrypted_text);
        out.put_uvarint(self.timestamp_nanos);
        out.put_u8(self.new_message_type);
        out.put_u8(self.new_message_operation);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            sender_access_group_owner_public_key: PublicKey::read_prefixed(
                reader,
                "sender access group owner public key",
            )?,
            sender_access_group_key_name: reader.read_var_bytes()?,
            sender_access_group_public_key: PublicKey::read_prefixed(
                reader,
                "sender access group public key",
            )?,
            recipient_access_group_owner_public_key: PublicKey::read_prefixed(
                reader,
                "recipient access group owner public key",
            )?,
            recipient_access_group_key_name: reader.read_var_bytes()?,
            recipient_access_group_public_key: PublicKey::read_prefixed(
                reader,
                "recipient access group public key",
            )?,
            encrypted_text: reader.read_var_bytes()?,
            timestamp_nanos: reader.read_uvarint()?,
            new_message_type: reader.read_u8()?,
            new_message_operation: reader.read_u8()?,
        })
    }
}

impl BinaryCodec for RegisterAsValidatorMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_uvarint(self.domains.len() as u64);
        for domain in &self.domains {
            out.put_var_bytes(domain);
        }
        out.put_bool(self.disable_delegated_stake);
        out.put_uvarint(self.delegated_stake_commission_basis_points);
        out.put_var_bytes(&self.voting_public_key);
        out.put_var_bytes(&self.voting_authorization);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            domains: reader.read_vec(Reader::read_var_bytes)?,
            disable_delegated_stake: reader.read_bool()?,
            delegated_stake_commission_basis_points: reader.read_uvarint()?,
            voting_public_key: reader.read_var_bytes()?,
            voting_authorization: reader.read_var_bytes()?,
        })
    }
}

impl BinaryCodec for StakeMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.validator_public_key.write_prefixed(out);
        out.put_u8(self.reward_method);
        self.stake_amount_nanos.write_to(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            validator_public_key: PublicKey::read_prefixed(reader, "validator public key")?,
            reward_method: reader.read_u8()?,
            stake_amount_nanos: Uint256::read_from(reader)?,
        })
    }
}

impl BinaryCodec for UnstakeMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.validator_public_key.write_prefixed(out);
        self.unstake_amount_nanos.write_to(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            validator_public_key: PublicKey::read_prefixed(reader, "validator public key")?,
            unstake_amount_nanos: Uint256::read_from(reader)?,
        })
    }
}

impl BinaryCodec for UnlockStakeMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.validator_public_key.write_prefixed(out);
        out.put_uvarint(self.start_epoch_number);
        out.put_uvarint(self.end_epoch_number);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            validator_public_key: PublicKey::read_prefixed(reader, "validator public key")?,
            start_epoch_number: reader.read_uvarint()?,
            end_epoch_number: reader.read_uvarint()?,
        })
    }
}

impl BinaryCodec for CoinLockupMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.profile_public_key.write_prefixed(out);
        self.recipient_public_key.write_prefixed(out);
        out.put_varint(self.unlock_timestamp_nano_secs);
        out.put_varint(self.vesting_end_timestamp_nano_secs);
        self.lockup_amount_base_units.write_to(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
            recipient_public_key: PublicKey::read_prefixed(reader, "recipient public key")?,
            unlock_timestamp_nano_secs: reader.read_varint()?,
            vesting_end_timestamp_nano_secs: reader.read_varint()?,
            lockup_amount_base_units: Uint256::read_from(reader)?,
        })
    }
}

impl BinaryCodec for UpdateCoinLockupParamsMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_varint(self.lockup_yield_duration_nano_secs);
        out.put_uvarint(self.lockup_yield_apy_basis_points);
        out.put_bool(self.remove_yield_curve_point);
        out.put_bool(self.new_lockup_transfer_restrictions);
        out.put_u8(self.lockup_transfer_restriction_status);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            lockup_yield_duration_nano_secs: reader.read_varint()?,
            lockup_yield_apy_basis_points: reader.read_uvarint()?,
            remove_yield_curve_point: reader.read_bool()?,
            new_lockup_transfer_restrictions: reader.read_bool()?,
            lockup_transfer_restriction_status: reader.read_u8()?,
        })
    }
}

impl BinaryCodec for CoinLockupTransferMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.recipient_public_key.write_prefixed(out);
        self.profile_public_key.write_prefixed(out);
        out.put_varint(self.unlock_timestamp_nano_secs);
        self.locked_coins_to_transfer_base_units.write_to(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            recipient_public_key: PublicKey::read_prefixed(reader, "recipient public key")?,
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
            unlock_timestamp_nano_secs: reader.read_varint()?,
            locked_coins_to_transfer_base_units: Uint256::read_from(reader)?,
        })
    }
}

impl BinaryCodec for CoinUnlockMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.profile_public_key.write_prefixed(out);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            profile_public_key: PublicKey::read_prefixed(reader, "profile public key")?,
        })
    }
}

impl BinaryCodec for AtomicTxnsWrapperMetadata {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_uvarint(self.txns.len() as u64);
        for txn in &self.txns {
            out.put_var_bytes(&txn.to_bytes()?);
        }
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            txns: reader.read_vec(|reader| Transaction::from_bytes(&reader.read_var_bytes()?))?,
        })
    }
}
