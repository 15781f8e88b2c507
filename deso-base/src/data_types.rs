// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core numeric and map types shared by transactions and state entries.

use std::{collections::BTreeMap, fmt, str::FromStr};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{EncodingError, Reader, WriteExt as _};

/// Free-form key-value metadata attached to transactions and entries.
pub type ExtraData = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Uint256Error {
    #[error("value does not fit in 256 bits")]
    Overflow,
    #[error("invalid number literal: {0}")]
    Parse(String),
}

/// An unsigned 256-bit integer, stored big-endian.
#[derive(Default, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash)]
pub struct Uint256([u8; 32]);

impl Uint256 {
    pub const ZERO: Self = Self([0; 32]);

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Accepts up to 32 big-endian bytes, left-padding with zeros.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, Uint256Error> {
        if bytes.len() > 32 {
            return Err(Uint256Error::Overflow);
        }
        let mut value = [0u8; 32];
        value[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(value))
    }

    pub fn from_biguint(value: &BigUint) -> Result<Self, Uint256Error> {
        Self::from_be_slice(&value.to_bytes_be())
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 32]
    }

    /// The big-endian bytes without leading zeros.
    pub fn to_minimal_be_bytes(&self) -> &[u8] {
        let start = self.0.iter().position(|byte| *byte != 0).unwrap_or(32);
        &self.0[start..]
    }

    /// Base-10 rendering, as stored in numeric columns.
    pub fn to_decimal_string(&self) -> String {
        self.to_biguint().to_str_radix(10)
    }

    /// `0x`-prefixed minimal hex rendering.
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", self.to_biguint().to_str_radix(16))
    }

    /// Length-prefixed minimal big-endian encoding.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.put_var_bytes(self.to_minimal_be_bytes());
    }

    pub fn read_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        let bytes = reader.read_var_bytes()?;
        Self::from_be_slice(&bytes).map_err(|_| EncodingError::FieldTooLong {
            field: "uint256",
            length: bytes.len(),
            max: 32,
        })
    }
}

impl From<u64> for Uint256 {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<u128> for Uint256 {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl FromStr for Uint256 {
    type Err = Uint256Error;

    /// Parses decimal, or hex when prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x") {
            Some(digits) => BigUint::parse_bytes(digits.as_bytes(), 16),
            None => BigUint::parse_bytes(s.as_bytes(), 10),
        };
        let value = parsed.ok_or_else(|| Uint256Error::Parse(s.to_string()))?;
        Self::from_biguint(&value)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self.to_hex_string())
    }
}

impl Serialize for Uint256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_str(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            Self::from_be_slice(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

/// Writes extra data as a count followed by key-sorted `(key, value)` pairs.
pub fn write_extra_data(extra_data: &ExtraData, out: &mut Vec<u8>) {
    out.put_uvarint(extra_data.len() as u64);
    for (key, value) in extra_data {
        out.put_var_bytes(key.as_bytes());
        out.put_var_bytes(value);
    }
}

pub fn read_extra_data(reader: &mut Reader<'_>) -> Result<ExtraData, EncodingError> {
    let pairs = reader.read_vec(|reader| {
        let key = reader.read_string("extra data key")?;
        let value = reader.read_var_bytes()?;
        Ok((key, value))
    })?;
    Ok(pairs.into_iter().collect())
}

#[cfg(any(test, feature = "test"))]
impl proptest::arbitrary::Arbitrary for Uint256 {
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
        use proptest::prelude::*;
        prop_oneof![
            any::<u64>().prop_map(Uint256::from),
            any::<u128>().prop_map(Uint256::from),
            any::<[u8; 32]>().prop_map(Uint256::from_be_bytes),
        ]
        .boxed()
    }
}
