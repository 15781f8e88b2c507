// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{
    crypto::{Pkid, PublicKey},
    data_types::ExtraData,
    spending_limit::TransactionSpendingLimit,
};

/// Maps a public key to its permanent PKID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkidEntry {
    pub pkid: Pkid,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesoBalanceEntry {
    pub pkid: Pkid,
    pub balance_nanos: u64,
}

/// The authorization of a derived key to sign on behalf of its owner.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedKeyEntry {
    pub owner_public_key: PublicKey,
    pub derived_public_key: PublicKey,
    pub expiration_block: u64,
    /// 0 revoked, 1 valid.
    pub operation_type: u8,
    #[serde(default)]
    #[serde_as(as = "std::collections::BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
    #[serde(default)]
    pub transaction_spending_limit: Option<TransactionSpendingLimit>,
    #[serde(default)]
    pub is_deleted: bool,
}
