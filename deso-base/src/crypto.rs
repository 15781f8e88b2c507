// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hashes and key identifiers used on the DeSo chain.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    codec::{BinaryCodec, EncodingError, Reader, WriteExt as _},
    network::NetworkParams,
};

/// Length of a block or transaction hash.
pub const HASH_LENGTH: usize = 32;
/// Length of a compressed secp256k1 public key.
pub const PUBLIC_KEY_LENGTH: usize = 33;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("expected {expected} bytes, got {actual}")]
    IncorrectLength { expected: usize, actual: usize },
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Computes SHA-256 applied twice, as used for transaction ids and checksums.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $length:expr) => {
        $(#[$meta])*
        #[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash)]
        pub struct $name([u8; $length]);

        impl $name {
            pub const fn new(bytes: [u8; $length]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $length] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Builds a value from a slice of exactly the right length.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
                let array = <[u8; $length]>::try_from(bytes).map_err(|_| {
                    CryptoError::IncorrectLength {
                        expected: $length,
                        actual: bytes.len(),
                    }
                })?;
                Ok(Self(array))
            }

            /// Decodes a uvarint-length-prefixed field that must hold exactly one value.
            pub fn read_prefixed(
                reader: &mut Reader<'_>,
                field: &'static str,
            ) -> Result<Self, EncodingError> {
                let bytes = reader.read_var_bytes()?;
                Self::from_slice(&bytes).map_err(|_| EncodingError::InvalidLength {
                    field,
                    expected: $length,
                    actual: bytes.len(),
                })
            }

            /// Decodes a length-prefixed field that is either empty or one value.
            pub fn read_prefixed_optional(
                reader: &mut Reader<'_>,
                field: &'static str,
            ) -> Result<Option<Self>, EncodingError> {
                let bytes = reader.read_var_bytes()?;
                if bytes.is_empty() {
                    return Ok(None);
                }
                Self::from_slice(&bytes)
                    .map(Some)
                    .map_err(|_| EncodingError::InvalidLength {
                        field,
                        expected: $length,
                        actual: bytes.len(),
                    })
            }

            pub fn write_prefixed(&self, out: &mut Vec<u8>) {
                out.put_var_bytes(&self.0);
            }

            pub fn write_prefixed_optional(value: Option<&Self>, out: &mut Vec<u8>) {
                match value {
                    Some(value) => value.write_prefixed(out),
                    None => out.put_uvarint(0),
                }
            }
        }

        impl BinaryCodec for $name {
            fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
                out.put_slice(&self.0);
                Ok(())
            }

            fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
                Ok(Self(reader.read_array()?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $length])
            }
        }

        impl From<[u8; $length]> for $name {
            fn from(bytes: [u8; $length]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = CryptoError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                Self::from_slice(bytes)
            }
        }

        impl FromStr for $name {
            type Err = CryptoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_slice(&hex::decode(s)?)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                hex::encode(self.0).fmt(f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..8]))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::ser::Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::de::Deserializer<'de>,
            {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    Self::from_str(&s).map_err(serde::de::Error::custom)
                } else {
                    let bytes = Vec::<u8>::deserialize(deserializer)?;
                    Self::from_slice(&bytes).map_err(serde::de::Error::custom)
                }
            }
        }
    };
}

fixed_bytes!(
    /// A double-SHA-256 block or transaction hash.
    CryptoHash,
    HASH_LENGTH
);

fixed_bytes!(
    /// A compressed secp256k1 public key.
    PublicKey,
    PUBLIC_KEY_LENGTH
);

fixed_bytes!(
    /// A permanent account identifier. Starts out equal to the account's first public key
    /// and survives identity swaps.
    Pkid,
    PUBLIC_KEY_LENGTH
);

impl CryptoHash {
    /// Hashes `data` with double SHA-256.
    pub fn digest(data: &[u8]) -> Self {
        Self(double_sha256(data))
    }
}

impl PublicKey {
    /// The prefixed base58check form used in the relational store.
    pub fn to_base58_check(&self, params: &NetworkParams) -> String {
        params.encode_public_key(&self.0)
    }
}

impl Pkid {
    /// PKIDs share the public key address format.
    pub fn to_base58_check(&self, params: &NetworkParams) -> String {
        params.encode_public_key(&self.0)
    }

    pub fn as_public_key(&self) -> PublicKey {
        PublicKey(self.0)
    }
}

impl From<PublicKey> for Pkid {
    fn from(public_key: PublicKey) -> Self {
        Pkid(public_key.0)
    }
}

#[cfg(any(test, feature = "test"))]
mod arbitrary {
    use proptest::prelude::*;

    use super::{CryptoHash, Pkid, PublicKey};

    impl Arbitrary for CryptoHash {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            any::<[u8; 32]>().prop_map(CryptoHash).boxed()
        }
    }

    impl Arbitrary for PublicKey {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            (any::<[u8; 32]>(), prop_oneof![Just(2u8), Just(3u8)])
                .prop_map(|(tail, parity)| {
                    let mut bytes = [0u8; 33];
                    bytes[0] = parity;
                    bytes[1..].copy_from_slice(&tail);
                    PublicKey(bytes)
                })
                .boxed()
        }
    }

    impl Arbitrary for Pkid {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            any::<PublicKey>().prop_map(Pkid::from).boxed()
        }
    }
}

/// Helpers for building deterministic values in tests.
#[cfg(any(test, feature = "test"))]
pub mod test_utils {
    use super::{CryptoHash, Pkid, PublicKey};

    /// A hash whose bytes are all `byte`.
    pub fn test_hash(byte: u8) -> CryptoHash {
        CryptoHash::new([byte; 32])
    }

    /// A public key with a valid compressed-point tag and every other byte set to `byte`.
    pub fn test_public_key(byte: u8) -> PublicKey {
        let mut bytes = [byte; 33];
        bytes[0] = 2;
        PublicKey::new(bytes)
    }

    pub fn test_pkid(byte: u8) -> Pkid {
        Pkid::from(test_public_key(byte))
    }
}
