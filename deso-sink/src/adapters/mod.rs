// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Encoder to row adapters.
//!
//! An adapter is a pure function projecting one decoded upstream value, together with
//! its key bytes, into a [`Row`] of its destination table. Kinds whose encoder backs
//! several tables also provide a route that picks the table from the key prefix.

mod chain;
mod coins;
mod identity;
mod pos;
mod social;

pub use chain::*;
pub use coins::*;
pub use identity::*;
pub use pos::*;
pub use social::*;

use std::ops::Range;

use deso_base::{
    codec::EncodingError,
    crypto::{CryptoHash, Pkid, PublicKey, HASH_LENGTH},
    data_types::ExtraData,
    network::NetworkParams,
    prefixes::SNAPSHOT_EPOCH_LENGTH,
    state_change::{Encoder, RecordKind},
    text::lossy_string,
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{Row, SqlValue, Table};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("expected a {expected} encoder, got {actual}")]
    UnexpectedEncoder {
        expected: RecordKind,
        actual: RecordKind,
    },
    #[error("{0} entry carries no encoder")]
    MissingEncoder(RecordKind),
    #[error("unknown key prefix {prefix} for {kind}")]
    UnknownKeyPrefix { kind: RecordKind, prefix: u8 },
    #[error("key of {actual} bytes is too short, {needed} needed")]
    KeyTooShort { needed: usize, actual: usize },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Projects an encoder and its key bytes into a row.
pub type Adapter = fn(&Encoder, &[u8], &NetworkParams) -> Result<Row, AdapterError>;

/// Picks the destination table of an entry from its key bytes.
pub type Route = fn(&[u8]) -> Result<&'static Table, AdapterError>;

/// Extracts the variant of `kind` from an encoder, or returns `UnexpectedEncoder`.
macro_rules! expect_encoder {
    ($encoder:expr, $kind:ident) => {
        match $encoder {
            deso_base::state_change::Encoder::$kind(entry) => entry,
            other => {
                return Err($crate::adapters::AdapterError::UnexpectedEncoder {
                    expected: deso_base::state_change::RecordKind::$kind,
                    actual: other.record_kind(),
                })
            }
        }
    };
}
pub(crate) use expect_encoder;

pub(crate) fn address(public_key: &PublicKey, params: &NetworkParams) -> SqlValue {
    SqlValue::Text(public_key.to_base58_check(params))
}

pub(crate) fn pkid_address(pkid: &Pkid, params: &NetworkParams) -> SqlValue {
    SqlValue::Text(pkid.to_base58_check(params))
}

pub(crate) fn optional_address(public_key: Option<&PublicKey>, params: &NetworkParams) -> SqlValue {
    public_key.map_or(SqlValue::Null, |public_key| address(public_key, params))
}

pub(crate) fn hash_hex(hash: &CryptoHash) -> SqlValue {
    SqlValue::Text(hash.to_hex())
}

pub(crate) fn text(bytes: &[u8]) -> SqlValue {
    SqlValue::Text(lossy_string(bytes))
}

/// Extra data as a JSON object of text values.
pub fn extra_data_json(extra_data: &ExtraData) -> Value {
    Value::Object(
        extra_data
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(lossy_string(value))))
            .collect::<Map<_, _>>(),
    )
}

/// The bytes of `key` within `range`.
pub fn key_slice(key: &[u8], range: Range<usize>) -> Result<&[u8], AdapterError> {
    key.get(range.clone()).ok_or(AdapterError::KeyTooShort {
        needed: range.end,
        actual: key.len(),
    })
}

/// The prefix byte of `key`.
pub fn key_prefix(key: &[u8]) -> Result<u8, AdapterError> {
    Ok(key_slice(key, 0..1)?[0])
}

/// The epoch number following the prefix byte of snapshot keys.
pub fn snapshot_epoch(key: &[u8]) -> Result<u64, AdapterError> {
    let bytes = key_slice(key, 1..1 + SNAPSHOT_EPOCH_LENGTH)?;
    let mut epoch = [0u8; SNAPSHOT_EPOCH_LENGTH];
    epoch.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(epoch))
}

/// The hash following the prefix byte of block and bundle keys.
pub fn key_hash(key: &[u8]) -> Result<CryptoHash, AdapterError> {
    let bytes = key_slice(key, 1..1 + HASH_LENGTH)?;
    let mut hash = [0u8; HASH_LENGTH];
    hash.copy_from_slice(bytes);
    Ok(CryptoHash::new(hash))
}

#[cfg(test)]
#[path = "../unit_tests/adapters_tests.rs"]
mod unit_tests;
