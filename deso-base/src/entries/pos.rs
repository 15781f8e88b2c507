// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{
    crypto::Pkid,
    data_types::{ExtraData, Uint256},
    text::utf8_lossy_vec,
};

/// Number of epochs between a snapshot being taken and it becoming active.
pub const SNAPSHOT_LOOKBACK_EPOCHS: u64 = 2;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub validator_pkid: Pkid,
    #[serde(with = "utf8_lossy_vec")]
    pub domains: Vec<Vec<u8>>,
    pub disable_delegated_stake: bool,
    pub delegated_stake_commission_basis_points: u64,
    #[serde_as(as = "Hex")]
    pub voting_public_key: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub voting_authorization: Vec<u8>,
    pub total_stake_amount_nanos: Uint256,
    pub last_active_at_epoch_number: u64,
    pub jailed_at_epoch_number: u64,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub staker_pkid: Pkid,
    pub validator_pkid: Pkid,
    /// 0 pay to balance, 1 restake.
    pub reward_method: u8,
    pub stake_amount_nanos: Uint256,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedStakeEntry {
    pub staker_pkid: Pkid,
    pub validator_pkid: Pkid,
    pub locked_amount_nanos: Uint256,
    pub locked_at_epoch_number: u64,
    #[serde(default)]
    #[serde_as(as = "BTreeMap<_, Hex>")]
    pub extra_data: ExtraData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochEntry {
    pub epoch_number: u64,
    pub initial_block_height: u64,
    pub initial_view: u64,
    pub final_block_height: u64,
    #[serde(default)]
    pub initial_leader_index_offset: u64,
    #[serde(default)]
    pub created_at_block_timestamp_nano_secs: i64,
}

impl EpochEntry {
    /// The epoch whose snapshot governs this epoch.
    pub fn snapshot_at_epoch_number(&self) -> u64 {
        self.epoch_number.saturating_sub(SNAPSHOT_LOOKBACK_EPOCHS)
    }
}

/// Chain-wide parameters updated by `UPDATE_GLOBAL_PARAMS` transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalParamsEntry {
    pub usd_cents_per_bitcoin: u64,
    pub create_profile_fee_nanos: u64,
    pub create_nft_fee_nanos: u64,
    pub max_copies_per_nft: u64,
    pub minimum_network_fee_nanos_per_kb: u64,
    pub max_nonce_expiration_block_height_offset: u64,
    pub stake_lockup_epoch_duration: u64,
    pub validator_jail_epoch_duration: u64,
    pub leader_schedule_max_num_validators: u64,
    pub validator_set_max_num_validators: u64,
    pub staking_rewards_max_num_stakes: u64,
    pub staking_rewards_apy_basis_points: u64,
    pub epoch_duration_num_blocks: u64,
    pub jail_inactive_validator_grace_period_epochs: u64,
    pub maximum_vested_intersections_per_lockup_transaction: u64,
    pub fee_bucket_growth_rate_basis_points: u64,
    pub failing_transaction_bmf_multiplier_basis_points: u64,
    pub block_timestamp_drift_nano_secs: i64,
    pub mempool_max_size_bytes: u64,
    pub mempool_fee_estimator_num_mempool_blocks: u64,
    pub mempool_fee_estimator_num_past_blocks: u64,
    pub mempool_congestion_factor_basis_points: u64,
    pub mempool_priority_percentile_basis_points: u64,
    pub past_blocks_congestion_factor_basis_points: u64,
    pub past_blocks_priority_percentile_basis_points: u64,
    pub max_block_size_bytes_pos: u64,
    pub soft_max_block_size_bytes_pos: u64,
    pub max_txn_size_bytes_pos: u64,
    pub block_production_interval_milliseconds_pos: u64,
    pub timeout_interval_milliseconds_pos: u64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlsPublicKeyPkidPairEntry {
    pub pkid: Pkid,
    #[serde_as(as = "Hex")]
    pub bls_public_key: Vec<u8>,
}

/// A slot of the leader schedule; the epoch and slot index live in the entry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderScheduleEntry {
    pub validator_pkid: Pkid,
}
