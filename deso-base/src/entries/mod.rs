// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Decoded state entries, one type per upstream encoder.
//!
//! These are plain values: they own all their data and hold no references to each
//! other, so adapters can project them into rows independently.

mod chain;
mod coins;
mod identity;
mod messaging;
mod nft;
mod pos;
mod social;

pub use chain::*;
pub use coins::*;
pub use identity::*;
pub use messaging::*;
pub use nft::*;
pub use pos::*;
pub use social::*;
