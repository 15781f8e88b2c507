// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{
    crypto::{CryptoHash, Pkid},
    data_types::ExtraData,
};

/// One serial number of an NFT post.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftEntry {
    #[serde(default)]
    pub last_owner_pkid: Option<Pkid>,
    pub owner_pkid: Pkid,
    pub nft_post_hash: CryptoHash,
    pub serial_number: u64,
    pub is_for_sale: bool,
    pub min_bid_amount_nanos: u64,
    #[serde(default)]
    #[serde_as(as = "Hex")]
    pub unlockable_text: Vec<u8>,
    #[serde(default)]
    pub last_accepted_bid_amount_nanos: u64,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_buy_now: bool,
    #[serde(default)]
    pub buy_now_price_nanos: u64,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftBidEntry {
    pub bidder_pkid: Pkid,
    pub nft_post_hash: CryptoHash,
    /// 0 bids on every serial number.
    pub serial_number: u64,
    pub bid_amount_nanos: u64,
    #[serde(default)]
    pub accepted_block_height: Option<u32>,
}
