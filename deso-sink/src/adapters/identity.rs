// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use deso_base::{
    codec::BinaryCodec as _, crypto::PublicKey, network::NetworkParams, state_change::Encoder,
};

use super::{address, expect_encoder, extra_data_json, key_slice, pkid_address, AdapterError};
use crate::schema::{Row, SqlValue};

pub fn pkid_row(encoder: &Encoder, key: &[u8], params: &NetworkParams) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, Pkid);
    let mut row = Row::with_capacity(3);
    row.push(pkid_address(&entry.pkid, params));
    row.push(address(&entry.public_key, params));
    row.push(key.to_vec());
    Ok(row)
}

/// The balance is keyed by the holder's public key, which follows the prefix byte.
pub fn deso_balance_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, DesoBalance);
    let public_key =
        PublicKey::from_slice(key_slice(key, 1..34)?).map_err(|_| AdapterError::KeyTooShort {
            needed: 34,
            actual: key.len(),
        })?;
    let mut row = Row::with_capacity(3);
    row.push(address(&public_key, params));
    row.push(entry.balance_nanos);
    row.push(key.to_vec());
    Ok(row)
}

/// The spending limit is stored verbatim and its top-level fields are projected next
/// to it. Encoding failures of the limit propagate.
pub fn derived_key_row(
    encoder: &Encoder,
    key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, DerivedKey);
    let mut row = Row::with_capacity(10);
    row.push(address(&entry.owner_public_key, params));
    row.push(address(&entry.derived_public_key, params));
    row.push(entry.expiration_block);
    row.push(entry.operation_type);
    row.push(extra_data_json(&entry.extra_data));
    match &entry.transaction_spending_limit {
        Some(limit) => {
            row.push(serde_json::to_value(limit)?);
            row.push(limit.to_bytes()?);
            row.push(limit.global_deso_limit);
            row.push(limit.is_unlimited);
        }
        None => {
            for _ in 0..4 {
                row.push(SqlValue::Null);
            }
        }
    }
    row.push(key.to_vec());
    Ok(row)
}
