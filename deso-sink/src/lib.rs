// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This module defines the deso-sink library including:
//! - the relational schema and its migrations (schema)
//! - the stores the sink writes to (db)
//! - the encoder-to-row adapters and the catalog of record kinds (adapters, catalog)
//! - the materializers of generic rows, blocks and transaction indexes (materializer,
//!   block, txindex)
//! - the engine driving them from the stream callbacks (engine, savepoint, cache, sync)
//! - the capture consumer and the configuration of the binary (capture, config)

pub mod adapters;
pub mod block;
pub mod cache;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod db;
pub mod engine;
pub mod materializer;
pub mod savepoint;
pub mod schema;
pub mod sync;
pub mod txindex;

#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use engine::{SinkEngine, SinkError, StateChangeHandler};
