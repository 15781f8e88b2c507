// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    crypto::{CryptoHash, Pkid},
    data_types::Uint256,
};

/// A holder's balance of a creator coin or a DAO coin.
///
/// The two flavors share this encoder and are told apart by key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub hodler_pkid: Pkid,
    pub creator_pkid: Pkid,
    pub balance_nanos: Uint256,
    #[serde(default)]
    pub has_purchased: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoCoinLimitOrderEntry {
    pub order_id: CryptoHash,
    pub transactor_pkid: Pkid,
    /// The zero PKID stands for DESO.
    pub buying_dao_coin_creator_pkid: Pkid,
    pub selling_dao_coin_creator_pkid: Pkid,
    pub scaled_exchange_rate_coins_to_sell_per_coin_to_buy: Uint256,
    pub quantity_to_fill_in_base_units: Uint256,
    /// 1 ask, 2 bid.
    pub operation_type: u8,
    /// 1 good-till-cancelled, 2 immediate-or-cancel, 3 fill-or-kill.
    pub fill_type: u8,
    pub block_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBalanceEntry {
    pub hodler_pkid: Pkid,
    pub profile_pkid: Pkid,
    pub unlock_timestamp_nano_secs: i64,
    pub vesting_end_timestamp_nano_secs: i64,
    pub balance_base_units: Uint256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupYieldCurvePoint {
    pub profile_pkid: Pkid,
    pub lockup_duration_nano_secs: i64,
    pub lockup_yield_apy_basis_points: u64,
}
