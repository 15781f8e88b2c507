// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use deso_base::{
    entries::ValidatorEntry,
    network::NetworkParams,
    prefixes::{
        SNAPSHOT_EPOCH_LENGTH, SNAPSHOT_VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR,
        SNAPSHOT_VALIDATOR_SET_BY_PKID, VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR, VALIDATOR_BY_PKID,
    },
    state_change::{Encoder, RecordKind},
    text::lossy_string,
};

use super::{
    expect_encoder, extra_data_json, key_prefix, key_slice, pkid_address, snapshot_epoch,
    AdapterError,
};
use crate::schema::{
    tables::{
        BLS_PUBLIC_KEY_PKID_PAIR, BLS_PUBLIC_KEY_PKID_PAIR_SNAPSHOT, SNAPSHOT_VALIDATOR,
        VALIDATOR,
    },
    Row, Table,
};

/// Live validators and per-epoch snapshots share the encoder.
pub fn validator_route(key: &[u8]) -> Result<&'static Table, AdapterError> {
    match key_prefix(key)? {
        VALIDATOR_BY_PKID => Ok(&VALIDATOR),
        SNAPSHOT_VALIDATOR_SET_BY_PKID => Ok(&SNAPSHOT_VALIDATOR),
        prefix => Err(AdapterError::UnknownKeyPrefix {
            kind: RecordKind::Validator,
            prefix,
        }),
    }
}

fn push_validator(row: &mut Row, entry: &ValidatorEntry, params: &NetworkParams) {
    row.push(pkid_address(&entry.validator_pkid, params));
    row.push(
        entry
            .domains
            .iter()
            .map(|domain| lossy_string(domain))
            .collect::<Vec<_>>(),
    );
    row.push(entry.disable_delegated_stake);
    row.push(entry.delegated_stake_commission_basis_points);
    row.push(hex::encode(&entry.voting_public_key));
    row.push(hex::encode(&entry.voting_authorization));
    row.push(&entry.total_stake_amount_nanos);
    row.push(entry.last_active_at_epoch_number);
    row.push(entry.jailed_at_epoch_number);
    row.push(extra_data_json(&entry.extra_data));
}

/// Snapshot rows also record the epoch found in their key.
pub fn validator_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Validator);
    let table = validator_route(key)?;
    let mut row = Row::with_capacity(12);
    push_validator(&mut row, entry, params);
    if std::ptr::eq(table, &SNAPSHOT_VALIDATOR) {
        row.push(snapshot_epoch(key)?);
    }
    row.push(key.to_vec());
    Ok(row)
}

pub fn stake_row(encoder: &Encoder, key: &[u8], params: &NetworkParams) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Stake);
    Ok(crate::row![
        pkid_address(&entry.staker_pkid, params),
        pkid_address(&entry.validator_pkid, params),
        entry.reward_method,
        &entry.stake_amount_nanos,
        extra_data_json(&entry.extra_data),
        key.to_vec(),
    ])
}

pub fn locked_stake_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, LockedStake);
    Ok(crate::row![
        pkid_address(&entry.staker_pkid, params),
        pkid_address(&entry.validator_pkid, params),
        &entry.locked_amount_nanos,
        entry.locked_at_epoch_number,
        extra_data_json(&entry.extra_data),
        key.to_vec(),
    ])
}

/// Epochs are keyed by their number; the key bytes are not stored.
pub fn epoch_row(encoder: &Encoder, _key: &[u8], _: &NetworkParams) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Epoch);
    Ok(crate::row![
        entry.epoch_number,
        entry.initial_block_height,
        entry.initial_view,
        entry.final_block_height,
        entry.initial_leader_index_offset,
        entry.created_at_block_timestamp_nano_secs,
        entry.snapshot_at_epoch_number(),
    ])
}

pub fn global_params_row(
    encoder: &Encoder,
    key: &[u8],
    _: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, GlobalParams);
    Ok(crate::row![
        entry.usd_cents_per_bitcoin,
        entry.create_profile_fee_nanos,
        entry.create_nft_fee_nanos,
        entry.max_copies_per_nft,
        entry.minimum_network_fee_nanos_per_kb,
        entry.max_nonce_expiration_block_height_offset,
        entry.stake_lockup_epoch_duration,
        entry.validator_jail_epoch_duration,
        entry.leader_schedule_max_num_validators,
        entry.validator_set_max_num_validators,
        entry.staking_rewards_max_num_stakes,
        entry.staking_rewards_apy_basis_points,
        entry.epoch_duration_num_blocks,
        entry.jail_inactive_validator_grace_period_epochs,
        entry.maximum_vested_intersections_per_lockup_transaction,
        entry.fee_bucket_growth_rate_basis_points,
        entry.failing_transaction_bmf_multiplier_basis_points,
        entry.block_timestamp_drift_nano_secs,
        entry.mempool_max_size_bytes,
        entry.mempool_fee_estimator_num_mempool_blocks,
        entry.mempool_fee_estimator_num_past_blocks,
        entry.mempool_congestion_factor_basis_points,
        entry.mempool_priority_percentile_basis_points,
        entry.past_blocks_congestion_factor_basis_points,
        entry.past_blocks_priority_percentile_basis_points,
        entry.max_block_size_bytes_pos,
        entry.soft_max_block_size_bytes_pos,
        entry.max_txn_size_bytes_pos,
        entry.block_production_interval_milliseconds_pos,
        entry.timeout_interval_milliseconds_pos,
        key.to_vec(),
    ])
}

pub fn bls_public_key_pkid_pair_route(key: &[u8]) -> Result<&'static Table, AdapterError> {
    match key_prefix(key)? {
        VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR => Ok(&BLS_PUBLIC_KEY_PKID_PAIR),
        SNAPSHOT_VALIDATOR_BLS_PUBLIC_KEY_PKID_PAIR => Ok(&BLS_PUBLIC_KEY_PKID_PAIR_SNAPSHOT),
        prefix => Err(AdapterError::UnknownKeyPrefix {
            kind: RecordKind::BlsPublicKeyPkidPair,
            prefix,
        }),
    }
}

pub fn bls_public_key_pkid_pair_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, BlsPublicKeyPkidPair);
    let table = bls_public_key_pkid_pair_route(key)?;
    let mut row = Row::with_capacity(4);
    row.push(pkid_address(&entry.pkid, params));
    row.push(hex::encode(&entry.bls_public_key));
    if std::ptr::eq(table, &BLS_PUBLIC_KEY_PKID_PAIR_SNAPSHOT) {
        row.push(snapshot_epoch(key)?);
    }
    row.push(key.to_vec());
    Ok(row)
}

/// The snapshot epoch and the slot index follow the prefix byte of the key.
pub fn leader_schedule_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, LeaderSchedule);
    let epoch = snapshot_epoch(key)?;
    let index_start = 1 + SNAPSHOT_EPOCH_LENGTH;
    let index = key_slice(key, index_start..index_start + 2)?;
    let leader_index = u16::from_be_bytes([index[0], index[1]]);
    Ok(crate::row![
        pkid_address(&entry.validator_pkid, params),
        epoch,
        leader_index,
        key.to_vec(),
    ])
}
