// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Network selection and the base58check address format.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::double_sha256;

/// Length of the base58check checksum suffix.
const CHECKSUM_LENGTH: usize = 4;

/// Address prefix of mainnet public keys (`BC1YL...`).
pub const MAINNET_PUBLIC_KEY_PREFIX: [u8; 3] = [0xcd, 0x14, 0x00];
/// Address prefix of testnet and regtest public keys (`tBCK...`).
pub const TESTNET_PUBLIC_KEY_PREFIX: [u8; 3] = [0x11, 0xc2, 0x00];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58 string: {0}")]
    Base58(String),
    #[error("address is too short to hold a prefix and a checksum")]
    TooShort,
    #[error("address checksum mismatch")]
    Checksum,
    #[error("address prefix {0:02x?} does not belong to this network")]
    WrongPrefix(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        f.write_str(name)
    }
}

/// Parameters that change how chain values are rendered for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub network: Network,
    pub public_key_prefix: [u8; 3],
    /// Regtest with shortened epochs and block times.
    pub accelerated: bool,
}

impl NetworkParams {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            public_key_prefix: MAINNET_PUBLIC_KEY_PREFIX,
            accelerated: false,
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            public_key_prefix: TESTNET_PUBLIC_KEY_PREFIX,
            accelerated: false,
        }
    }

    pub fn regtest(accelerated: bool) -> Self {
        Self {
            network: Network::Regtest,
            public_key_prefix: TESTNET_PUBLIC_KEY_PREFIX,
            accelerated,
        }
    }

    /// Renders raw public key or PKID bytes with this network's prefix.
    pub fn encode_public_key(&self, bytes: &[u8]) -> String {
        base58_check_encode(&self.public_key_prefix, bytes)
    }

    /// Parses an address produced by [`Self::encode_public_key`].
    pub fn decode_public_key(&self, address: &str) -> Result<Vec<u8>, AddressError> {
        let (prefix, payload) = base58_check_decode(address, self.public_key_prefix.len())?;
        if prefix != self.public_key_prefix {
            return Err(AddressError::WrongPrefix(prefix));
        }
        Ok(payload)
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Encodes `prefix || payload || checksum` in base58, where the checksum is the first
/// four bytes of the double SHA-256 of `prefix || payload`.
pub fn base58_check_encode(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len() + CHECKSUM_LENGTH);
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    let checksum = double_sha256(&data);
    data.extend_from_slice(&checksum[..CHECKSUM_LENGTH]);
    bs58::encode(data).into_string()
}

/// Splits a base58check string into its prefix and payload after verifying the checksum.
pub fn base58_check_decode(
    encoded: &str,
    prefix_length: usize,
) -> Result<(Vec<u8>, Vec<u8>), AddressError> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|error| AddressError::Base58(error.to_string()))?;
    if data.len() < prefix_length + CHECKSUM_LENGTH {
        return Err(AddressError::TooShort);
    }
    let (body, checksum) = data.split_at(data.len() - CHECKSUM_LENGTH);
    if double_sha256(body)[..CHECKSUM_LENGTH] != *checksum {
        return Err(AddressError::Checksum);
    }
    let (prefix, payload) = body.split_at(prefix_length);
    Ok((prefix.to_vec(), payload.to_vec()))
}
