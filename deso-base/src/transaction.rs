// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The signed transaction message and its wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    codec::{BinaryCodec, EncodingError, Reader, WriteExt as _},
    crypto::{CryptoHash, PublicKey},
    data_types::{read_extra_data, write_extra_data, ExtraData},
    txn_meta::TxnMeta,
};

macro_rules! txn_types {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// The kind of a transaction, selecting its metadata layout.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum TxnType {
            $($variant = $value,)*
        }

        impl TxnType {
            /// Every known transaction type, in ascending order.
            pub const ALL: &'static [TxnType] = &[$(TxnType::$variant,)*];

            pub fn from_u64(value: u64) -> Result<Self, EncodingError> {
                match value {
                    $($value => Ok(TxnType::$variant),)*
                    _ => Err(EncodingError::UnknownTxnType(value)),
                }
            }

            /// The upper-case name used in reference tables.
            pub fn name(&self) -> &'static str {
                match self {
                    $(TxnType::$variant => $name,)*
                }
            }
        }
    };
}

txn_types! {
    BlockReward = 1 => "BLOCK_REWARD",
    BasicTransfer = 2 => "BASIC_TRANSFER",
    BitcoinExchange = 3 => "BITCOIN_EXCHANGE",
    PrivateMessage = 4 => "PRIVATE_MESSAGE",
    SubmitPost = 5 => "SUBMIT_POST",
    UpdateProfile = 6 => "UPDATE_PROFILE",
    UpdateBitcoinUsdExchangeRate = 8 => "UPDATE_BITCOIN_USD_EXCHANGE_RATE",
    Follow = 9 => "FOLLOW",
    Like = 10 => "LIKE",
    CreatorCoin = 11 => "CREATOR_COIN",
    SwapIdentity = 12 => "SWAP_IDENTITY",
    UpdateGlobalParams = 13 => "UPDATE_GLOBAL_PARAMS",
    CreatorCoinTransfer = 14 => "CREATOR_COIN_TRANSFER",
    CreateNft = 15 => "CREATE_NFT",
    UpdateNft = 16 => "UPDATE_NFT",
    AcceptNftBid = 17 => "ACCEPT_NFT_BID",
    NftBid = 18 => "NFT_BID",
    NftTransfer = 19 => "NFT_TRANSFER",
    AcceptNftTransfer = 20 => "ACCEPT_NFT_TRANSFER",
    BurnNft = 21 => "BURN_NFT",
    AuthorizeDerivedKey = 22 => "AUTHORIZE_DERIVED_KEY",
    MessagingGroup = 23 => "MESSAGING_GROUP",
    DaoCoin = 24 => "DAO_COIN",
    DaoCoinTransfer = 25 => "DAO_COIN_TRANSFER",
    DaoCoinLimitOrder = 26 => "DAO_COIN_LIMIT_ORDER",
    CreateUserAssociation = 27 => "CREATE_USER_ASSOCIATION",
    DeleteUserAssociation = 28 => "DELETE_USER_ASSOCIATION",
    CreatePostAssociation = 29 => "CREATE_POST_ASSOCIATION",
    DeletePostAssociation = 30 => "DELETE_POST_ASSOCIATION",
    AccessGroup = 31 => "ACCESS_GROUP",
    AccessGroupMembers = 32 => "ACCESS_GROUP_MEMBERS",
    NewMessage = 33 => "NEW_MESSAGE",
    RegisterAsValidator = 34 => "REGISTER_AS_VALIDATOR",
    UnregisterAsValidator = 35 => "UNREGISTER_AS_VALIDATOR",
    Stake = 36 => "STAKE",
    Unstake = 37 => "UNSTAKE",
    UnlockStake = 38 => "UNLOCK_STAKE",
    UnjailValidator = 39 => "UNJAIL_VALIDATOR",
    CoinLockup = 40 => "COIN_LOCKUP",
    UpdateCoinLockupParams = 41 => "UPDATE_COIN_LOCKUP_PARAMS",
    CoinLockupTransfer = 42 => "COIN_LOCKUP_TRANSFER",
    CoinUnlock = 43 => "COIN_UNLOCK",
    AtomicTxnsWrapper = 44 => "ATOMIC_TXNS_WRAPPER",
}

impl TxnType {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A reference to an output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: CryptoHash,
    pub index: u32,
}

impl BinaryCodec for TxInput {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.txid.as_bytes());
        out.put_uvarint(u64::from(self.index));
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            txid: CryptoHash::decode_from(reader)?,
            index: reader.read_uvarint_u32("input index")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOutput {
    pub public_key: PublicKey,
    pub amount_nanos: u64,
}

impl BinaryCodec for TxOutput {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_slice(self.public_key.as_bytes());
        out.put_uvarint(self.amount_nanos);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        Ok(Self {
            public_key: PublicKey::decode_from(reader)?,
            amount_nanos: reader.read_uvarint()?,
        })
    }
}

/// Replay protection for balance-model transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxnNonce {
    pub expiration_block_height: u64,
    pub partial_id: u64,
}

/// A signed transaction.
///
/// Version 0 transactions end after the signature; later versions append the version,
/// an explicit fee and a nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub metadata: TxnMeta,
    /// Empty for block rewards.
    pub public_key: Option<PublicKey>,
    pub extra_data: ExtraData,
    /// DER-encoded signature, empty when unsigned.
    pub signature: Vec<u8>,
    pub version: u64,
    pub fee_nanos: u64,
    pub nonce: Option<TxnNonce>,
}

impl Transaction {
    /// An unsigned version-1 transaction from `public_key` with no inputs or outputs.
    pub fn new(public_key: PublicKey, metadata: TxnMeta) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            metadata,
            public_key: Some(public_key),
            extra_data: ExtraData::new(),
            signature: Vec::new(),
            version: 1,
            fee_nanos: 0,
            nonce: Some(TxnNonce::default()),
        }
    }

    pub fn txn_type(&self) -> TxnType {
        self.metadata.txn_type()
    }

    /// The transaction id: double SHA-256 of the full encoding.
    pub fn hash(&self) -> Result<CryptoHash, EncodingError> {
        Ok(CryptoHash::digest(&self.to_bytes()?))
    }

    /// The explicit fee, or the input/output difference for version 0.
    pub fn effective_fee_nanos(&self, total_input_nanos: u64) -> u64 {
        if self.version > 0 {
            return self.fee_nanos;
        }
        total_input_nanos.saturating_sub(self.total_output_nanos())
    }

    pub fn total_output_nanos(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.amount_nanos))
    }
}

impl BinaryCodec for Transaction {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_uvarint(self.inputs.len() as u64);
        for input in &self.inputs {
            input.encode_to(out)?;
        }
        out.put_uvarint(self.outputs.len() as u64);
        for output in &self.outputs {
            output.encode_to(out)?;
        }
        out.put_uvarint(u64::from(self.txn_type().as_u8()));
        let metadata = self.metadata.to_bytes()?;
        out.put_var_bytes(&metadata);
        PublicKey::write_prefixed_optional(self.public_key.as_ref(), out);
        write_extra_data(&self.extra_data, out);
        out.put_var_bytes(&self.signature);
        if self.version == 0 {
            return Ok(());
        }
        out.put_uvarint(self.version);
        out.put_uvarint(self.fee_nanos);
        let nonce = self.nonce.clone().unwrap_or_default();
        out.put_uvarint(nonce.expiration_block_height);
        out.put_uvarint(nonce.partial_id);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        let inputs = reader.read_vec(TxInput::decode_from)?;
        let outputs = reader.read_vec(TxOutput::decode_from)?;
        let txn_type = TxnType::from_u64(reader.read_uvarint()?)?;
        let metadata_bytes = reader.read_var_bytes()?;
        let metadata = TxnMeta::decode(txn_type, &metadata_bytes)?;
        let public_key = PublicKey::read_prefixed_optional(reader, "transactor public key")?;
        let extra_data = read_extra_data(reader)?;
        let signature = reader.read_var_bytes()?;
        let mut transaction = Self {
            inputs,
            outputs,
            metadata,
            public_key,
            extra_data,
            signature,
            version: 0,
            fee_nanos: 0,
            nonce: None,
        };
        if reader.is_empty() {
            return Ok(transaction);
        }
        transaction.version = reader.read_uvarint()?;
        transaction.fee_nanos = reader.read_uvarint()?;
        transaction.nonce = Some(TxnNonce {
            expiration_block_height: reader.read_uvarint()?,
            partial_id: reader.read_uvarint()?,
        });
        Ok(transaction)
    }
}

impl Serialize for Transaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let bytes = self.to_bytes().map_err(serde::ser::Error::custom)?;
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(&bytes)
        }
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(serde::de::Error::custom)?
        } else {
            Vec::<u8>::deserialize(deserializer)?
        };
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "unit_tests/transaction_tests.rs"]
mod unit_tests;
