// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The transaction index.
//!
//! Utxo operation bundles arrive after the transactions they belong to. Each bundle
//! is paired with the stored transaction rows, which are re-decoded to derive their
//! index metadata and the parties they affect. Bundles keyed by block hash also
//! produce the per-operation rows, stake rewards and jail history of the block.

pub mod metadata;

use deso_base::{
    codec::{BinaryCodec as _, EncodingError},
    entries::{OperationType, StateChangeMetadata, UtxoOperation, UtxoOperationBundle},
    network::NetworkParams,
    prefixes::{BLOCK_HASH_TO_UTXO_OPERATIONS, TXN_HASH_TO_UTXO_OPERATIONS},
    state_change::{Encoder, RecordKind, StateChangeEntry, StateSyncerOperation},
    transaction::{Transaction, TxnType},
    txn_meta::TxnMeta,
};
use thiserror::Error;
use tracing::{debug, warn};

use self::metadata::{transaction_index, TransactionIndex};
use crate::{
    adapters::{key_hash, key_prefix, AdapterError},
    block::{upsert_blocks, ConnectedBlock},
    db::{Filter, InsertMode, Order, Query, SinkDatabase, Update},
    materializer::{dedupe, BatchError, BatchSummary},
    row,
    schema::{
        tables::{
            AFFECTED_PUBLIC_KEY, EPOCH, JAILED_HISTORY, STAKE_REWARD, TRANSACTION, UTXO_OPERATION,
        },
        Row, SqlValue,
    },
};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot decode transaction {hash}: {source}")]
    Decode {
        hash: String,
        #[source]
        source: EncodingError,
    },
    #[error("unknown utxo operation bundle prefix {0}")]
    UnknownBundlePrefix(u8),
    #[error("transaction {0} is not stored")]
    MissingTransaction(String),
    #[error("malformed transaction row: {0}")]
    MalformedRow(&'static str),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A transaction row selected for indexing.
struct StoredTransaction {
    hash: String,
    kind_tag: SqlValue,
    bytes: Vec<u8>,
    block_height: u64,
}

const STORED_COLUMNS: [&str; 4] = ["transaction_hash", "kind_tag", "txn_bytes", "block_height"];

impl StoredTransaction {
    fn from_row(row: Row) -> Result<Self, IndexError> {
        let mut values = row.into_values().into_iter();
        let (Some(hash), Some(kind_tag), Some(bytes), Some(block_height)) =
            (values.next(), values.next(), values.next(), values.next())
        else {
            return Err(IndexError::MalformedRow("missing columns"));
        };
        let SqlValue::Text(hash) = hash else {
            return Err(IndexError::MalformedRow("transaction_hash"));
        };
        let SqlValue::Bytes(bytes) = bytes else {
            return Err(IndexError::MalformedRow("txn_bytes"));
        };
        let block_height = block_height
            .as_i64()
            .and_then(|height| u64::try_from(height).ok())
            .ok_or(IndexError::MalformedRow("block_height"))?;
        Ok(Self {
            hash,
            kind_tag,
            bytes,
            block_height,
        })
    }

    fn decode(&self) -> Result<Transaction, IndexError> {
        Transaction::from_bytes(&self.bytes).map_err(|source| IndexError::Decode {
            hash: self.hash.clone(),
            source,
        })
    }
}

/// Rows derived from a batch of bundles, written together at the end.
#[derive(Default)]
struct IndexRows {
    updates: Vec<Vec<SqlValue>>,
    affected: Vec<Row>,
    utxo_operations: Vec<Row>,
    stake_rewards: Vec<Row>,
    jailed_history: Vec<Row>,
    /// Blocks whose derived rows are replaced.
    blocks: Vec<SqlValue>,
}

impl IndexRows {
    fn push_index(
        &mut self,
        hash: &str,
        kind_tag: SqlValue,
        index: TransactionIndex,
        params: &NetworkParams,
    ) {
        self.updates.push(vec![
            SqlValue::Text(hash.to_string()),
            kind_tag,
            SqlValue::Json(index.metadata),
            SqlValue::Json(index.basic_transfer),
        ]);
        for affected in index.affected {
            self.affected.push(row![
                affected.public_key.to_base58_check(params),
                hash,
                affected.role,
            ]);
        }
    }
}

fn bundle_of(entry: &StateChangeEntry) -> Result<&UtxoOperationBundle, BatchError> {
    match &entry.encoder {
        Some(Encoder::UtxoOperationBundle(bundle)) => Ok(bundle),
        Some(other) => Err(BatchError::adapter(
            &entry.key_bytes,
            AdapterError::UnexpectedEncoder {
                expected: RecordKind::UtxoOperationBundle,
                actual: other.record_kind(),
            },
        )),
        None => Err(BatchError::adapter(
            &entry.key_bytes,
            AdapterError::MissingEncoder(RecordKind::UtxoOperationBundle),
        )),
    }
}

fn to_i32(value: usize) -> SqlValue {
    SqlValue::Int(i32::try_from(value).unwrap_or(i32::MAX))
}

/// Indexes `transaction`, then the inner transactions of an atomic wrapper with the
/// operation lists the wrapper's own operation carries for them.
fn index_transaction(
    rows: &mut IndexRows,
    transaction: &Transaction,
    hash: &str,
    kind_tag: SqlValue,
    operations: &[UtxoOperation],
    params: &NetworkParams,
) -> Result<(), IndexError> {
    let index = transaction_index(transaction, hash, operations, params).map_err(|source| {
        IndexError::Decode {
            hash: hash.to_string(),
            source,
        }
    })?;
    rows.push_index(hash, kind_tag, index, params);
    let TxnMeta::AtomicTxnsWrapper(wrapper) = &transaction.metadata else {
        return Ok(());
    };
    let inner_operations = operations
        .iter()
        .find(|operation| operation.operation_type == OperationType::ATOMIC_TXNS_WRAPPER)
        .map(|operation| operation.atomic_txns_inner_utxo_ops.as_slice())
        .unwrap_or_default();
    for (position, inner) in wrapper.txns.iter().enumerate() {
        let inner_hash = inner
            .hash()
            .map_err(|source| IndexError::Decode {
                hash: hash.to_string(),
                source,
            })?
            .to_hex();
        let operations = inner_operations
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or_default();
        index_transaction(
            rows,
            inner,
            &inner_hash,
            SqlValue::from(inner.txn_type().as_u8()),
            operations,
            params,
        )?;
    }
    Ok(())
}

/// The number of the epoch containing `height`.
async fn epoch_at<D>(database: &D, height: u64) -> Result<Option<i64>, BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let query = Query::select(&["epoch_number"])
        .filter(Filter::Le("initial_block_height", SqlValue::from(height)))
        .order_by("epoch_number", Order::Descending)
        .limit(1);
    let rows = database.select_rows(&EPOCH, query).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.get(0).and_then(SqlValue::as_i64)))
}

async fn record_unjailing<D>(
    database: &D,
    rows: &mut IndexRows,
    operations: &[UtxoOperation],
    height: u64,
    params: &NetworkParams,
) -> Result<(), BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let Some(validator) = operations
        .iter()
        .filter(|operation| operation.operation_type == OperationType::UNJAIL_VALIDATOR)
        .find_map(|operation| operation.prev_validator_entry.as_ref())
    else {
        return Ok(());
    };
    let Some(epoch) = epoch_at(database, height).await? else {
        warn!(height, "no epoch contains the unjailing block");
        return Ok(());
    };
    rows.jailed_history.push(row![
        validator.validator_pkid.to_base58_check(params),
        validator.jailed_at_epoch_number,
        epoch,
    ]);
    Ok(())
}

fn utxo_operation_row(
    block_hash: &str,
    transaction_index: usize,
    position: usize,
    operation: &UtxoOperation,
    params: &NetworkParams,
) -> Result<Row, IndexError> {
    let amount = operation
        .entry
        .as_ref()
        .map(|entry| SqlValue::from(entry.amount_nanos))
        .unwrap_or(SqlValue::Null);
    let public_key = operation
        .entry
        .as_ref()
        .map(|entry| &entry.public_key)
        .or(operation.balance_public_key.as_ref())
        .map(|public_key| SqlValue::Text(public_key.to_base58_check(params)))
        .unwrap_or(SqlValue::Null);
    Ok(row![
        block_hash,
        to_i32(transaction_index),
        to_i32(position),
        SqlValue::Int(i32::try_from(operation.operation_type.0).unwrap_or(i32::MAX)),
        amount,
        public_key,
        SqlValue::Json(serde_json::to_value(operation)?),
    ])
}

fn stake_reward_rows(
    block_hash: &str,
    operations: &[UtxoOperation],
    params: &NetworkParams,
) -> Vec<Row> {
    let mut rows = Vec::new();
    for (index, operation) in operations.iter().enumerate() {
        let Some(StateChangeMetadata::StakeReward(reward)) = &operation.state_change_metadata
        else {
            continue;
        };
        rows.push(row![
            reward.staker_pkid.to_base58_check(params),
            reward.validator_pkid.to_base58_check(params),
            reward.reward_method,
            reward.staking_reward_nanos,
            reward.is_validator_commission,
            block_hash,
            i64::try_from(index).unwrap_or(i64::MAX),
        ]);
    }
    rows
}

async fn index_block_bundle<D>(
    database: &D,
    rows: &mut IndexRows,
    entry: &StateChangeEntry,
    bundle: &UtxoOperationBundle,
    params: &NetworkParams,
) -> Result<(), BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let hash = key_hash(&entry.key_bytes)
        .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?;
    let block_hash = hash.to_hex();
    if let Some(block) = &entry.block {
        upsert_blocks(database, &[ConnectedBlock::from_hash(hash, block)], params).await?;
    }
    let query = Query::select(&STORED_COLUMNS)
        .filter(Filter::Eq("block_hash", SqlValue::Text(block_hash.clone())))
        .filter(Filter::IsNull("wrapper_transaction_hash"))
        .order_by("index_in_block", Order::Ascending);
    let stored = database
        .select_rows(&TRANSACTION, query)
        .await?
        .into_iter()
        .map(StoredTransaction::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    if stored.len() > bundle.utxo_op_bundle.len() {
        warn!(
            block = %block_hash,
            transactions = stored.len(),
            lists = bundle.utxo_op_bundle.len(),
            "bundle is missing operation lists"
        );
    }

    rows.blocks.push(SqlValue::Text(block_hash.clone()));
    for (position, operations) in bundle.utxo_op_bundle.iter().enumerate() {
        for (index, operation) in operations.iter().enumerate() {
            rows.utxo_operations.push(utxo_operation_row(
                &block_hash,
                position,
                index,
                operation,
                params,
            )?);
        }
        match stored.get(position) {
            Some(transaction) => {
                let decoded = transaction.decode()?;
                index_transaction(
                    rows,
                    &decoded,
                    &transaction.hash,
                    transaction.kind_tag.clone(),
                    operations,
                    params,
                )?;
                if decoded.txn_type() == TxnType::UnjailValidator {
                    record_unjailing(database, rows, operations, transaction.block_height, params)
                        .await?;
                }
            }
            None => rows.stake_rewards.extend(stake_reward_rows(
                &block_hash,
                operations,
                params,
            )),
        }
    }
    Ok(())
}

async fn index_transaction_bundle<D>(
    database: &D,
    rows: &mut IndexRows,
    entry: &StateChangeEntry,
    bundle: &UtxoOperationBundle,
    params: &NetworkParams,
) -> Result<(), BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let hash = key_hash(&entry.key_bytes)
        .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?
        .to_hex();
    let query = Query::select(&STORED_COLUMNS)
        .filter(Filter::Eq("transaction_hash", SqlValue::Text(hash.clone())))
        .filter(Filter::IsNull("wrapper_transaction_hash"))
        .limit(1);
    let stored = database
        .select_rows(&TRANSACTION, query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| IndexError::MissingTransaction(hash.clone()))?;
    let stored = StoredTransaction::from_row(stored)?;
    let operations = bundle
        .utxo_op_bundle
        .first()
        .map(Vec::as_slice)
        .unwrap_or_default();
    let decoded = stored.decode()?;
    index_transaction(rows, &decoded, &stored.hash, stored.kind_tag, operations, params)?;
    Ok(())
}

async fn write_rows<D>(database: &D, rows: IndexRows) -> Result<u64, BatchError>
where
    D: SinkDatabase + ?Sized,
{
    let mut written = 0;
    if !rows.blocks.is_empty() {
        for table in [&UTXO_OPERATION, &STAKE_REWARD] {
            written += database
                .delete_rows(table, vec![Filter::In("block_hash", rows.blocks.clone())])
                .await?;
        }
    }
    for (table, table_rows) in [
        (&UTXO_OPERATION, rows.utxo_operations),
        (&STAKE_REWARD, rows.stake_rewards),
        (&JAILED_HISTORY, rows.jailed_history),
        (&AFFECTED_PUBLIC_KEY, rows.affected),
    ] {
        if !table_rows.is_empty() {
            written += database
                .insert_rows(table, table_rows, InsertMode::Upsert)
                .await?;
        }
    }
    if !rows.updates.is_empty() {
        written += database
            .update_rows(
                &TRANSACTION,
                Update {
                    key_columns: vec!["transaction_hash", "kind_tag"],
                    columns: vec!["tx_index_metadata", "tx_index_basic_transfer_metadata"],
                    rows: rows.updates,
                },
            )
            .await?;
    }
    Ok(written)
}

/// Indexes the transactions of a batch of utxo operation bundles.
pub async fn index_bundles<D>(
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
        // Deleted bundles leave the index of their transactions to the block cascade.
        debug!(entries = unique.len(), "ignoring deleted utxo operation bundles");
        return Ok(summary);
    }
    let mut rows = IndexRows::default();
    for entry in unique {
        let bundle = bundle_of(entry)?;
        let prefix = key_prefix(&entry.key_bytes)
            .map_err(|error| BatchError::adapter(&entry.key_bytes, error))?;
        match prefix {
            BLOCK_HASH_TO_UTXO_OPERATIONS => {
                index_block_bundle(database, &mut rows, entry, bundle, params).await?
            }
            TXN_HASH_TO_UTXO_OPERATIONS => {
                index_transaction_bundle(database, &mut rows, entry, bundle, params).await?
            }
            other => return Err(IndexError::UnknownBundlePrefix(other).into()),
        }
    }
    summary.rows = write_rows(database, rows).await?;
    Ok(summary)
}

#[cfg(test)]
#[path = "../unit_tests/txindex_tests.rs"]
mod unit_tests;
