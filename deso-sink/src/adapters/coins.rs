// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use deso_base::{
    network::NetworkParams, prefixes::HODLER_PKID_CREATOR_PKID_TO_DAO_COIN_BALANCE,
    state_change::Encoder,
};

use super::{
    expect_encoder, extra_data_json, hash_hex, key_prefix, pkid_address, text, AdapterError,
};
use crate::schema::{Row, SqlValue};

/// Creator coin and DAO coin balances share the encoder; the key prefix tells them apart.
pub fn balance_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Balance);
    let is_dao_coin = key_prefix(key)? == HODLER_PKID_CREATOR_PKID_TO_DAO_COIN_BALANCE;
    Ok(crate::row![
        pkid_address(&entry.hodler_pkid, params),
        pkid_address(&entry.creator_pkid, params),
        &entry.balance_nanos,
        entry.has_purchased,
        is_dao_coin,
        key.to_vec(),
    ])
}

/// Amounts are kept as hex strings; the numeric columns are derived by the store.
pub fn dao_coin_limit_order_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, DaoCoinLimitOrder);
    Ok(crate::row![
        hash_hex(&entry.order_id),
        pkid_address(&entry.transactor_pkid, params),
        pkid_address(&entry.buying_dao_coin_creator_pkid, params),
        pkid_address(&entry.selling_dao_coin_creator_pkid, params),
        entry
            .scaled_exchange_rate_coins_to_sell_per_coin_to_buy
            .to_hex_string(),
        entry.quantity_to_fill_in_base_units.to_hex_string(),
        entry.operation_type,
        entry.fill_type,
        entry.block_height,
        key.to_vec(),
    ])
}

pub fn nft_row(encoder: &Encoder, key: &[u8], params: &NetworkParams) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Nft);
    let mut row = Row::with_capacity(13);
    row.push(
        entry
            .last_owner_pkid
            .as_ref()
            .map_or(SqlValue::Null, |pkid| pkid_address(pkid, params)),
    );
    row.push(pkid_address(&entry.owner_pkid, params));
    row.push(hash_hex(&entry.nft_post_hash));
    row.push(entry.serial_number);
    row.push(entry.is_for_sale);
    row.push(entry.min_bid_amount_nanos);
    row.push(text(&entry.unlockable_text));
    row.push(entry.last_accepted_bid_amount_nanos);
    row.push(entry.is_pending);
    row.push(entry.is_buy_now);
    row.push(entry.buy_now_price_nanos);
    row.push(extra_data_json(&entry.extra_data));
    row.push(key.to_vec());
    Ok(row)
}

pub fn nft_bid_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, NftBid);
    Ok(crate::row![
        pkid_address(&entry.bidder_pkid, params),
        hash_hex(&entry.nft_post_hash),
        entry.serial_number,
        entry.bid_amount_nanos,
        SqlValue::optional(entry.accepted_block_height),
        key.to_vec(),
    ])
}

pub fn locked_balance_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, LockedBalance);
    Ok(crate::row![
        pkid_address(&entry.hodler_pkid, params),
        pkid_address(&entry.profile_pkid, params),
        entry.unlock_timestamp_nano_secs,
        entry.vesting_end_timestamp_nano_secs,
        &entry.balance_base_units,
        key.to_vec(),
    ])
}

pub fn yield_curve_point_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, LockupYieldCurvePoint);
    Ok(crate::row![
        pkid_address(&entry.profile_pkid, params),
        entry.lockup_duration_nano_secs,
        entry.lockup_yield_apy_basis_points,
        key.to_vec(),
    ])
}
