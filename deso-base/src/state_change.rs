// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The envelope of the state-change stream.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::{entries::*, transaction::Transaction};

/// What happened to the keyed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateSyncerOperation {
    Insert,
    Upsert,
    Delete,
}

impl fmt::Display for StateSyncerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateSyncerOperation::Insert => "insert",
            StateSyncerOperation::Upsert => "upsert",
            StateSyncerOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Phases of the upstream's synchronization, signalled in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEvent {
    /// Emitted once, when consuming from an empty checkpoint.
    Start,
    BulkSyncBegin,
    BulkSyncEnd,
    TailFollowBegin,
}

/// The upstream's numeric encoder id. Unknown values are carried through and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderType(pub u32);

impl fmt::Display for EncoderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record_kind() {
            Some(kind) => f.write_str(kind.name()),
            None => write!(f, "unknown({})", self.0),
        }
    }
}

macro_rules! record_kinds {
    ($($kind:ident = $id:literal => $name:literal,)*) => {
        /// The materialized catalog of record kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum RecordKind {
            $($kind,)*
        }

        impl RecordKind {
            pub const ALL: &'static [RecordKind] = &[$(RecordKind::$kind,)*];

            pub fn name(&self) -> &'static str {
                match self {
                    $(RecordKind::$kind => $name,)*
                }
            }

            pub fn encoder_type(&self) -> EncoderType {
                match self {
                    $(RecordKind::$kind => EncoderType($id),)*
                }
            }
        }

        impl EncoderType {
            pub fn record_kind(&self) -> Option<RecordKind> {
                match self.0 {
                    $($id => Some(RecordKind::$kind),)*
                    _ => None,
                }
            }
        }
    };
}

record_kinds! {
    UtxoOperationBundle = 2 => "utxo_operation_bundle",
    Message = 3 => "message",
    Like = 8 => "like",
    Nft = 9 => "nft",
    NftBid = 10 => "nft_bid",
    DerivedKey = 12 => "derived_key",
    Diamond = 13 => "diamond",
    GlobalParams = 15 => "global_params",
    Post = 16 => "post",
    Balance = 17 => "balance",
    Pkid = 20 => "pkid",
    Profile = 21 => "profile",
    Follow = 22 => "follow",
    DesoBalance = 23 => "deso_balance",
    DaoCoinLimitOrder = 24 => "dao_coin_limit_order",
    UserAssociation = 26 => "user_association",
    PostAssociation = 27 => "post_association",
    AccessGroup = 28 => "access_group",
    AccessGroupMember = 29 => "access_group_member",
    NewMessage = 30 => "new_message",
    Validator = 31 => "validator",
    Stake = 32 => "stake",
    LockedStake = 33 => "locked_stake",
    Epoch = 34 => "epoch",
    LockedBalance = 35 => "locked_balance",
    LockupYieldCurvePoint = 36 => "yield_curve_point",
    BlsPublicKeyPkidPair = 37 => "bls_public_key_pkid_pair",
    LeaderSchedule = 38 => "leader_schedule",
    Block = 1_000_000 => "block",
    Transaction = 1_000_001 => "transaction",
    AffectedPublicKey = 1_000_002 => "affected_public_key",
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded upstream value, one variant per record kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoder {
    UtxoOperationBundle(UtxoOperationBundle),
    Message(MessageEntry),
    Like(LikeEntry),
    Nft(NftEntry),
    NftBid(NftBidEntry),
    DerivedKey(DerivedKeyEntry),
    Diamond(DiamondEntry),
    GlobalParams(GlobalParamsEntry),
    Post(PostEntry),
    Balance(BalanceEntry),
    Pkid(PkidEntry),
    Profile(ProfileEntry),
    Follow(FollowEntry),
    DesoBalance(DesoBalanceEntry),
    DaoCoinLimitOrder(DaoCoinLimitOrderEntry),
    UserAssociation(UserAssociationEntry),
    PostAssociation(PostAssociationEntry),
    AccessGroup(AccessGroupEntry),
    AccessGroupMember(AccessGroupMemberEntry),
    NewMessage(NewMessageEntry),
    Validator(ValidatorEntry),
    Stake(StakeEntry),
    LockedStake(LockedStakeEntry),
    Epoch(EpochEntry),
    LockedBalance(LockedBalanceEntry),
    LockupYieldCurvePoint(LockupYieldCurvePoint),
    BlsPublicKeyPkidPair(BlsPublicKeyPkidPairEntry),
    LeaderSchedule(LeaderScheduleEntry),
    Block(Block),
    Transaction(Transaction),
    AffectedPublicKey(AffectedPublicKeyEntry),
}

impl Encoder {
    pub fn record_kind(&self) -> RecordKind {
        match self {
            Encoder::UtxoOperationBundle(_) => RecordKind::UtxoOperationBundle,
            Encoder::Message(_) => RecordKind::Message,
            Encoder::Like(_) => RecordKind::Like,
            Encoder::Nft(_) => RecordKind::Nft,
            Encoder::NftBid(_) => RecordKind::NftBid,
            Encoder::DerivedKey(_) => RecordKind::DerivedKey,
            Encoder::Diamond(_) => RecordKind::Diamond,
            Encoder::GlobalParams(_) => RecordKind::GlobalParams,
            Encoder::Post(_) => RecordKind::Post,
            Encoder::Balance(_) => RecordKind::Balance,
            Encoder::Pkid(_) => RecordKind::Pkid,
            Encoder::Profile(_) => RecordKind::Profile,
            Encoder::Follow(_) => RecordKind::Follow,
            Encoder::DesoBalance(_) => RecordKind::DesoBalance,
            Encoder::DaoCoinLimitOrder(_) => RecordKind::DaoCoinLimitOrder,
            Encoder::UserAssociation(_) => RecordKind::UserAssociation,
            Encoder::PostAssociation(_) => RecordKind::PostAssociation,
            Encoder::AccessGroup(_) => RecordKind::AccessGroup,
            Encoder::AccessGroupMember(_) => RecordKind::AccessGroupMember,
            Encoder::NewMessage(_) => RecordKind::NewMessage,
            Encoder::Validator(_) => RecordKind::Validator,
            Encoder::Stake(_) => RecordKind::Stake,
            Encoder::LockedStake(_) => RecordKind::LockedStake,
            Encoder::Epoch(_) => RecordKind::Epoch,
            Encoder::LockedBalance(_) => RecordKind::LockedBalance,
            Encoder::LockupYieldCurvePoint(_) => RecordKind::LockupYieldCurvePoint,
            Encoder::BlsPublicKeyPkidPair(_) => RecordKind::BlsPublicKeyPkidPair,
            Encoder::LeaderSchedule(_) => RecordKind::LeaderSchedule,
            Encoder::Block(_) => RecordKind::Block,
            Encoder::Transaction(_) => RecordKind::Transaction,
            Encoder::AffectedPublicKey(_) => RecordKind::AffectedPublicKey,
        }
    }
}

/// One mutation of the upstream key-value state.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeEntry {
    pub operation: StateSyncerOperation,
    pub encoder_type: EncoderType,
    #[serde_as(as = "Hex")]
    pub key_bytes: Vec<u8>,
    /// Absent for deletes.
    #[serde(default)]
    pub encoder: Option<Encoder>,
    /// The encoder as the node serialized it.
    #[serde(default)]
    #[serde_as(as = "Hex")]
    pub encoder_bytes: Vec<u8>,
    pub block_height: u64,
    /// The connected block, attached to utxo operation bundles keyed by block hash.
    #[serde(default)]
    pub block: Option<Block>,
}

impl StateChangeEntry {
    /// Builds an insert or upsert entry. `encoder_bytes` is left to the caller.
    pub fn new(
        operation: StateSyncerOperation,
        key_bytes: Vec<u8>,
        encoder: Encoder,
        block_height: u64,
    ) -> Self {
        Self {
            operation,
            encoder_type: encoder.record_kind().encoder_type(),
            key_bytes,
            encoder: Some(encoder),
            encoder_bytes: Vec::new(),
            block_height,
            block: None,
        }
    }

    pub fn delete(kind: RecordKind, key_bytes: Vec<u8>, block_height: u64) -> Self {
        Self {
            operation: StateSyncerOperation::Delete,
            encoder_type: kind.encoder_type(),
            key_bytes,
            encoder: None,
            encoder_bytes: Vec::new(),
            block_height,
            block: None,
        }
    }

    pub fn with_encoder_bytes(mut self, encoder_bytes: Vec<u8>) -> Self {
        self.encoder_bytes = encoder_bytes;
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.block = Some(block);
        self
    }

    pub fn kind(&self) -> Option<RecordKind> {
        self.encoder_type.record_kind()
    }

    /// The first byte of the key, if any.
    pub fn prefix(&self) -> Option<u8> {
        self.key_bytes.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_utils::{test_pkid, test_public_key};

    #[test]
    fn test_encoder_types_are_distinct_and_round_trip() {
        let mut seen = std::collections::BTreeSet::new();
        for kind in RecordKind::ALL {
            assert!(seen.insert(kind.encoder_type()), "{kind} reuses an id");
            assert_eq!(kind.encoder_type().record_kind(), Some(*kind));
        }
        assert_eq!(EncoderType(999).record_kind(), None);
        assert_eq!(EncoderType(999).to_string(), "unknown(999)");
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = StateChangeEntry::new(
            StateSyncerOperation::Upsert,
            vec![36, 1, 2],
            Encoder::Pkid(PkidEntry {
                pkid: test_pkid(1),
                public_key: test_public_key(1),
            }),
            12,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["operation"], "upsert");
        assert_eq!(json["encoder_type"], 20);
        assert_eq!(json["key_bytes"], "240102");
        let back: StateChangeEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
