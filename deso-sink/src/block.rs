// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Replay of blocks, including the replacement of blocks by reorganizations, and of
//! mempool transactions.

use std::collections::HashSet;

use deso_base::{
    crypto::CryptoHash,
    entries::Block,
    network::NetworkParams,
    state_change::{Encoder, RecordKind, StateChangeEntry, StateSyncerOperation},
};
use tracing::{debug, info};

use crate::{
    adapters::{
        block_key, block_row, block_signer_rows, key_hash, mempool_transaction_rows,
        transaction_rows, AdapterError, Placement,
    },
    db::{DatabaseError, Filter, InsertMode, Query, SinkDatabase},
    materializer::{dedupe, insert_mode, BatchError, BatchSummary},
    schema::{
        tables::{
            BLOCK, BLOCK_SIGNER, MEMPOOL_BLOCK_HASH, STAKE_REWARD, TRANSACTION, UTXO_OPERATION,
        },
        Row, SqlValue, Table,
    },
};

/// A block together with its hash.
pub struct ConnectedBlock<'a> {
    pub hash: CryptoHash,
    pub block: &'a Block,
    pub natural_key: Vec<u8>,
}

impl<'a> ConnectedBlock<'a> {
    /// A block known only through its hash, as attached to operation bundles.
    pub fn from_hash(hash: CryptoHash, block: &'a Block) -> Self {
        Self {
            hash,
            block,
            natural_key: block_key(&hash),
        }
    }
}

fn block_of<'a>(entry: &'a StateChangeEntry) -> Result<ConnectedBlock<'a>, BatchError> {
    let adapter_error = |error| BatchError::adapter(&entry.key_bytes, error);
    let hash = key_hash(&entry.key_bytes).map_err(adapter_error)?;
    let block = match &entry.encoder {
        Some(Encoder::Block(block)) => block,
        Some(other) => {
            return Err(adapter_error(AdapterError::UnexpectedEncoder {
                expected: RecordKind::Block,
                actual: other.record_kind(),
            }))
        }
        None => return Err(adapter_error(AdapterError::MissingEncoder(RecordKind::Block))),
    };
    Ok(ConnectedBlock {
        hash,
        block,
        natural_key: entry.key_bytes.clone(),
    })
}

/// Materializes a batch of block entries.
pub async fn materialize_blocks<D>(
    database: &D,
    operation: StateSyncerOperation,
    entries: &[StateChangeEntry],
    params: &NetworkParams,
) -> Result<BatchSummary, BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let unique = dedupe(entries);
    let mut summary = BatchSummary {
        entries: unique.len(),
        ..BatchSummary::default()
    };
    match operation {
        // Blocks of the bulk sync are connected through their operation bundles.
        StateSyncerOperation::Insert => {
            debug!(entries = unique.len(), "deferring inserted blocks to their bundles");
        }
        StateSyncerOperation::Upsert => {
            let blocks = unique
                .into_iter()
                .map(block_of)
                .collect::<Result<Vec<_>, _>>()?;
            summary.rows = upsert_blocks(database, &blocks, params).await?;
        }
        StateSyncerOperation::Delete => {
            let hashes = unique
                .iter()
                .map(|entry| {
                    key_hash(&entry.key_bytes)
                        .map(|hash| SqlValue::Text(hash.to_hex()))
                        .map_err(|error| BatchError::adapter(&entry.key_bytes, error))
                })
                .collect::<Result<Vec<_>, _>>()?;
            summary.rows = delete_blocks(database, hashes).await?;
        }
    }
    Ok(summary)
}

/// Writes blocks with their signers and transactions, first removing the blocks they
/// replace. Returns the number of rows written or deleted.
pub async fn upsert_blocks<D>(
    database: &D,
    blocks: &[ConnectedBlock<'_>],
    params: &NetworkParams,
) -> Result<u64, BatchError>
where
    D: SinkDatabase + ?Sized,
{
    if blocks.is_empty() {
        return Ok(0);
    }
    let heights = blocks
        .iter()
        .map(|connected| SqlValue::from(connected.block.header.height))
        .collect();
    let hashes = blocks
        .iter()
        .map(|connected| SqlValue::Text(connected.hash.to_hex()))
        .collect();
    let query = Query::select(&["block_hash"])
        .filter(Filter::In("height", heights))
        .filter(Filter::NotIn("block_hash", hashes));
    let stale = database
        .select_rows(&BLOCK, query)
        .await?
        .into_iter()
        .filter_map(|row| row.into_values().into_iter().next())
        .collect::<Vec<_>>();
    let mut rows = 0;
    if !stale.is_empty() {
        info!(blocks = stale.len(), "replacing blocks");
        rows += delete_blocks(database, stale).await?;
    }

    let mut block_rows = Vec::with_capacity(blocks.len());
    let mut signer_rows = Vec::new();
    let mut transactions = Vec::new();
    for connected in blocks {
        let ConnectedBlock {
            hash,
            block,
            natural_key,
        } = connected;
        block_rows.push(block_row(hash, block, natural_key.clone()));
        signer_rows.extend(block_signer_rows(hash, block));
        for (index, transaction) in block.txns.iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            let placement = Placement::in_block(hash, block, index);
            transactions.extend(
                transaction_rows(transaction, &placement, None, params)
                    .map_err(|error| BatchError::adapter(natural_key, error))?,
            );
        }
    }
    rows += database
        .insert_rows(&BLOCK, block_rows, InsertMode::Upsert)
        .await?;
    if !signer_rows.is_empty() {
        rows += database
            .insert_rows(&BLOCK_SIGNER, signer_rows, InsertMode::Upsert)
            .await?;
    }
    if !transactions.is_empty() {
        rows += database
            .insert_rows(&TRANSACTION, transactions, InsertMode::Upsert)
            .await?;
    }
    Ok(rows)
}

/// Deletes blocks and every row that depends on them.
pub async fn delete_blocks<D>(database: &D, hashes: Vec<SqlValue>) -> Result<u64, DatabaseError>
where
    D: SinkDatabase + ?Sized,
{
    if hashes.is_empty() {
        return Ok(0);
    }
    let dependents: [&'static Table; 5] = [
        &BLOCK,
        &TRANSACTION,
        &UTXO_OPERATION,
        &BLOCK_SIGNER,
        &STAKE_REWARD,
    ];
    let mut rows = 0;
    for table in dependents {
        rows += database
            .delete_rows(table, vec![Filter::In("block_hash", hashes.clone())])
            .await?;
    }
    Ok(rows)
}

fn transaction_hash(row: &Row) -> Option<&str> {
    TRANSACTION
        .row_index("transaction_hash")
        .and_then(|index| row.get(index))
        .and_then(SqlValue::as_text)
}

/// Materializes a batch of mempool transactions.
pub async fn materialize_mempool_transactions<D>(
    database: &D,
    operation: StateSyncerOperation,
    entries: &[StateChangeEntry],
    params: &NetworkParams,
) -> Result<BatchSummary, BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let unique = dedupe(entries);
    let mut summary = BatchSummary {
        entries: unique.len(),
        ..BatchSummary::default()
    };
    if operation == StateSyncerOperation::Delete {
        let hashes = unique
            .iter()
            .map(|entry| {
                key_hash(&entry.key_bytes)
                    .map(|hash| SqlValue::Text(hash.to_hex()))
                    .map_err(|error| BatchError::adapter(&entry.key_bytes, error))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for column in ["transaction_hash", "wrapper_transaction_hash"] {
            summary.rows += database
                .delete_rows(
                    &TRANSACTION,
                    vec![
                        Filter::In(column, hashes.clone()),
                        Filter::Eq("block_hash", SqlValue::from(MEMPOOL_BLOCK_HASH)),
                    ],
                )
                .await?;
        }
        return Ok(summary);
    }

    let mut rows = Vec::new();
    for entry in unique {
        let encoder = entry
            .encoder
            .as_ref()
            .ok_or(AdapterError::MissingEncoder(RecordKind::Transaction))
            .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?;
        rows.extend(
            mempool_transaction_rows(encoder, &entry.key_bytes, entry.block_height, params)
                .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?,
        );
    }
    // Transactions already mined keep their block.
    let hashes = rows
        .iter()
        .filter_map(transaction_hash)
        .map(SqlValue::from)
        .collect::<Vec<_>>();
    let mined = database
        .select_rows(
            &TRANSACTION,
            Query::select(&["transaction_hash", "block_hash"])
                .filter(Filter::In("transaction_hash", hashes)),
        )
        .await?
        .into_iter()
        .filter(|row| row.get(1).and_then(SqlValue::as_text) != Some(MEMPOOL_BLOCK_HASH))
        .filter_map(|row| row.get(0).and_then(SqlValue::as_text).map(str::to_string))
        .collect::<HashSet<_>>();
    rows.retain(|row| transaction_hash(row).map_or(true, |hash| !mined.contains(hash)));
    if !rows.is_empty() {
        summary.rows = database
            .insert_rows(&TRANSACTION, rows, insert_mode(operation))
            .await?;
    }
    Ok(summary)
}
