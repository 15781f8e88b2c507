// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{
    crypto::{CryptoHash, Pkid, PublicKey},
    data_types::{ExtraData, Uint256},
    text::utf8_lossy,
};

/// The economic state of a creator coin or a DAO coin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinEntry {
    pub creator_basis_points: u64,
    pub deso_locked_nanos: u64,
    pub number_of_holders: u64,
    /// Wider than 64 bits for DAO coins.
    pub coins_in_circulation_nanos: Uint256,
    pub coin_watermark_nanos: u64,
    pub minting_disabled: bool,
    pub transfer_restriction_status: u8,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub public_key: PublicKey,
    #[serde(with = "utf8_lossy")]
    pub username: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub description: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub profile_pic: Vec<u8>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub creator_coin_entry: CoinEntry,
    #[serde(default)]
    pub dao_coin_entry: CoinEntry,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
    #[serde(default)]
    pub is_deleted: bool,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostEntry {
    pub post_hash: CryptoHash,
    pub poster_public_key: PublicKey,
    /// A post hash when the post is a comment, empty otherwise.
    #[serde_as(as = "Hex")]
    pub parent_stake_id: Vec<u8>,
    /// JSON `{"Body", "ImageURLs", "VideoURLs"}` by convention, arbitrary bytes in practice.
    #[serde(with = "utf8_lossy")]
    pub body: Vec<u8>,
    pub reposted_post_hash: Option<CryptoHash>,
    pub is_quoted_repost: bool,
    pub creator_basis_points: u64,
    pub stake_multiple_basis_points: u64,
    pub confirmation_block_height: u32,
    pub timestamp_nanos: u64,
    pub is_hidden: bool,
    pub like_count: u64,
    pub repost_count: u64,
    pub quote_repost_count: u64,
    pub diamond_count: u64,
    pub comment_count: u64,
    pub is_pinned: bool,
    pub is_nft: bool,
    pub num_nft_copies: u64,
    pub num_nft_copies_for_sale: u64,
    pub num_nft_copies_burned: u64,
    pub has_unlockable: bool,
    pub nft_royalty_to_creator_basis_points: u64,
    pub nft_royalty_to_coin_basis_points: u64,
    pub additional_nft_royalties_to_creators_basis_points: BTreeMap<Pkid, u64>,
    pub additional_nft_royalties_to_coins_basis_points: BTreeMap<Pkid, u64>,
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
    pub is_frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeEntry {
    pub liker_public_key: PublicKey,
    pub liked_post_hash: CryptoHash,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondEntry {
    pub sender_pkid: Pkid,
    pub receiver_pkid: Pkid,
    pub diamond_post_hash: CryptoHash,
    pub diamond_level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEntry {
    pub follower_pkid: Pkid,
    pub followed_pkid: Pkid,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssociationEntry {
    pub association_id: CryptoHash,
    pub transactor_pkid: Pkid,
    pub target_user_pkid: Pkid,
    pub app_pkid: Pkid,
    #[serde(with = "utf8_lossy")]
    pub association_type: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub association_value: Vec<u8>,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
    pub block_height: u32,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAssociationEntry {
    pub association_id: CryptoHash,
    pub transactor_pkid: Pkid,
    pub post_hash: CryptoHash,
    pub app_pkid: Pkid,
    #[serde(with = "utf8_lossy")]
    pub association_type: Vec<u8>,
    #[serde(with = "utf8_lossy")]
    pub association_value: Vec<u8>,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
    pub block_height: u32,
}
