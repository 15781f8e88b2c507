// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Upstream value types of the DeSo state-change stream: hashes and addresses, the
//! binary codec, transactions and their metadata, state entries and the entry
//! envelope. Also hosts the tracing setup shared by the sink binaries.

pub mod codec;
pub mod crypto;
pub mod data_types;
pub mod entries;
pub mod network;
pub mod prefixes;
pub mod spending_limit;
pub mod state_change;
pub mod text;
pub mod tracing;
pub mod transaction;
pub mod txn_meta;
