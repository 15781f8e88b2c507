// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use deso_base::{
    codec::BinaryCodec as _,
    crypto::CryptoHash,
    entries::Block,
    network::NetworkParams,
    prefixes::BLOCK_HASH_TO_BLOCK,
    state_change::Encoder,
    transaction::Transaction,
    txn_meta::TxnMeta,
};
use serde_json::{json, Value};

use super::{address, expect_encoder, extra_data_json, optional_address, AdapterError};
use crate::schema::{Row, SqlValue};

/// The natural key of a block row: the block prefix followed by its hash.
pub fn block_key(hash: &CryptoHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + hash.as_bytes().len());
    key.push(BLOCK_HASH_TO_BLOCK);
    key.extend_from_slice(hash.as_bytes());
    key
}

pub fn block_row(hash: &CryptoHash, block: &Block, natural_key: Vec<u8>) -> Row {
    let header = &block.header;
    // Timestamps before the epoch are clamped.
    let timestamp = u64::try_from(header.timestamp_nano_secs).unwrap_or(0);
    crate::row![
        hash.to_hex(),
        header.prev_block_hash.to_hex(),
        header.txn_merkle_root.to_hex(),
        SqlValue::timestamp_nanos(timestamp),
        header.height,
        header.nonce,
        header.extra_nonce,
        header.version,
        hex::encode(&header.proposer_voting_public_key),
        hex::encode(&header.proposer_random_seed_signature),
        header.proposed_in_view,
        hex::encode(&header.proposer_vote_partial_signature),
        natural_key,
    ]
}

/// One row per set bit of the vote quorum certificate.
pub fn block_signer_rows(hash: &CryptoHash, block: &Block) -> Vec<Row> {
    let Some(qc) = &block.header.validators_vote_qc else {
        return Vec::new();
    };
    qc.signer_indices()
        .into_iter()
        .map(|index| crate::row![hash.to_hex(), index])
        .collect()
}

/// Where a transaction sits on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Empty for mempool transactions.
    pub block_hash: String,
    pub block_height: u64,
    pub index_in_block: Option<u32>,
    pub timestamp_nanos: Option<u64>,
}

impl Placement {
    pub fn in_block(hash: &CryptoHash, block: &Block, index: u32) -> Self {
        Self {
            block_hash: hash.to_hex(),
            block_height: block.header.height,
            index_in_block: Some(index),
            timestamp_nanos: Some(u64::try_from(block.header.timestamp_nano_secs).unwrap_or(0)),
        }
    }

    pub fn mempool(block_height: u64) -> Self {
        Self {
            block_hash: crate::schema::tables::MEMPOOL_BLOCK_HASH.to_string(),
            block_height,
            index_in_block: None,
            timestamp_nanos: None,
        }
    }
}

fn inputs_json(transaction: &Transaction) -> Value {
    Value::Array(
        transaction
            .inputs
            .iter()
            .map(|input| json!({ "TxID": input.txid.to_hex(), "Index": input.index }))
            .collect(),
    )
}

fn outputs_json(transaction: &Transaction, params: &NetworkParams) -> Value {
    Value::Array(
        transaction
            .outputs
            .iter()
            .map(|output| {
                json!({
                    "PublicKey": output.public_key.to_base58_check(params),
                    "AmountNanos": output.amount_nanos,
                })
            })
            .collect(),
    )
}

struct Wrapping<'a> {
    hash: &'a str,
    index: u32,
}

fn transaction_row(
    transaction: &Transaction,
    placement: &Placement,
    index_in_block: Option<u32>,
    wrapping: Option<Wrapping<'_>>,
    natural_key: Option<&[u8]>,
    params: &NetworkParams,
) -> Result<(String, Row), AdapterError> {
    let bytes = transaction.to_bytes()?;
    let hash = CryptoHash::digest(&bytes).to_hex();
    let versioned = transaction.version >= 1;
    let nonce = transaction.nonce.clone().unwrap_or_default();
    let mut row = Row::with_capacity(23);
    row.push(hash.clone());
    row.push(transaction.txn_type().as_u8());
    row.push(placement.block_hash.clone());
    row.push(transaction.version);
    row.push(inputs_json(transaction));
    row.push(outputs_json(transaction, params));
    row.push(SqlValue::optional(versioned.then_some(transaction.fee_nanos)));
    row.push(SqlValue::optional(
        versioned.then_some(nonce.expiration_block_height),
    ));
    row.push(SqlValue::optional(versioned.then_some(nonce.partial_id)));
    row.push(serde_json::to_value(&transaction.metadata)?);
    row.push(SqlValue::Null);
    row.push(SqlValue::Null);
    row.push(transaction.metadata.to_bytes()?);
    row.push(bytes);
    row.push(optional_address(transaction.public_key.as_ref(), params));
    row.push(extra_data_json(&transaction.extra_data));
    row.push(transaction.signature.clone());
    row.push(SqlValue::optional(index_in_block));
    row.push(placement.block_height);
    row.push(SqlValue::optional(
        placement.timestamp_nanos.map(SqlValue::timestamp_nanos),
    ));
    match wrapping {
        Some(wrapping) => {
            row.push(wrapping.hash);
            row.push(SqlValue::Int(i32::try_from(wrapping.index).unwrap_or(i32::MAX)));
        }
        None => {
            row.push(SqlValue::Null);
            row.push(SqlValue::Null);
        }
    }
    row.push(SqlValue::optional(natural_key.map(<[u8]>::to_vec)));
    Ok((hash, row))
}

/// The rows of a transaction: the transaction itself, then the inner transactions of
/// an atomic wrapper. Inner rows point at the wrapper and have no block index.
pub fn transaction_rows(
    transaction: &Transaction,
    placement: &Placement,
    natural_key: Option<&[u8]>,
    params: &NetworkParams,
) -> Result<Vec<Row>, AdapterError> {
    let (hash, row) = transaction_row(
        transaction,
        placement,
        placement.index_in_block,
        None,
        natural_key,
        params,
    )?;
    let mut rows = vec![row];
    if let TxnMeta::AtomicTxnsWrapper(wrapper) = &transaction.metadata {
        for (index, inner) in wrapper.txns.iter().enumerate() {
            let wrapping = Wrapping {
                hash: &hash,
                index: u32::try_from(index).unwrap_or(u32::MAX),
            };
            let (_, row) = transaction_row(inner, placement, None, Some(wrapping), None, params)?;
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Mempool transactions arrive as their own entries.
pub fn mempool_transaction_rows(
    encoder: &Encoder,
    key: &[u8],
    block_height: u64,
    params: &NetworkParams,
) -> Result<Vec<Row>, AdapterError> {
    let transaction = expect_encoder!(encoder, Transaction);
    transaction_rows(
        transaction,
        &Placement::mempool(block_height),
        Some(key),
        params,
    )
}

pub fn affected_public_key_row(
    encoder: &Encoder,
    _key: &[u8],
    params: &NetworkParams,
) -> Result<Row, AdapterError> {
    let entry = expect_encoder!(encoder, AffectedPublicKey);
    Ok(crate::row![
        address(&entry.public_key, params),
        entry.txn_hash.to_hex(),
        entry.metadata.clone(),
    ])
}
