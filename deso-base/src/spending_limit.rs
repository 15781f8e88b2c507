// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The spending limits a derived key is authorized under.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    codec::{BinaryCodec, EncodingError, Reader, WriteExt as _},
    crypto::{CryptoHash, Pkid},
    data_types::Uint256,
    txn_meta::MAX_ASSOCIATION_TYPE_LENGTH,
    transaction::TxnType,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatorCoinOperationLimitKey {
    pub creator_pkid: Pkid,
    pub operation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DaoCoinOperationLimitKey {
    pub creator_pkid: Pkid,
    pub operation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NftOperationLimitKey {
    pub post_hash: CryptoHash,
    pub serial_number: u64,
    pub operation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DaoCoinLimitOrderLimitKey {
    pub buying_dao_coin_creator_pkid: Pkid,
    pub selling_dao_coin_creator_pkid: Pkid,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssociationLimitKey {
    /// 0 user, 1 post.
    pub association_class: u8,
    pub association_type: Vec<u8>,
    /// 0 any app, 1 scoped to `app_pkid`.
    pub app_scope_type: u8,
    pub app_pkid: Pkid,
    pub operation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessGroupLimitKey {
    pub access_group_owner_pkid: Pkid,
    pub scope_type: u8,
    pub access_group_key_name: Vec<u8>,
    pub operation: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StakeLimitKey {
    pub validator_pkid: Pkid,
    pub staker_pkid: Pkid,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockupLimitKey {
    pub profile_pkid: Pkid,
    pub scope_type: u8,
    pub operation: u8,
}

/// The tracker attached to an authorized derived key.
///
/// All maps are serialized in key order so the encoding is deterministic.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSpendingLimit {
    pub global_deso_limit: u64,
    #[serde_as(as = "Vec<(_, _)>")]
    pub transaction_count_limit_map: BTreeMap<TxnType, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub creator_coin_operation_limit_map: BTreeMap<CreatorCoinOperationLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub dao_coin_operation_limit_map: BTreeMap<DaoCoinOperationLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub nft_operation_limit_map: BTreeMap<NftOperationLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub dao_coin_limit_order_limit_map: BTreeMap<DaoCoinLimitOrderLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub association_limit_map: BTreeMap<AssociationLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub access_group_map: BTreeMap<AccessGroupLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub access_group_member_map: BTreeMap<AccessGroupLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub stake_limit_map: BTreeMap<StakeLimitKey, Uint256>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub unstake_limit_map: BTreeMap<StakeLimitKey, Uint256>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub unlock_stake_limit_map: BTreeMap<StakeLimitKey, u64>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub lockup_limit_map: BTreeMap<LockupLimitKey, u64>,
    pub is_unlimited: bool,
}

fn write_map<K, V>(
    out: &mut Vec<u8>,
    map: &BTreeMap<K, V>,
    mut write_entry: impl FnMut(&mut Vec<u8>, &K, &V) -> Result<(), EncodingError>,
) -> Result<(), EncodingError> {
    out.put_uvarint(map.len() as u64);
    for (key, value) in map {
        write_entry(out, key, value)?;
    }
    Ok(())
}

fn read_map<K: Ord, V>(
    reader: &mut Reader<'_>,
    read_entry: impl FnMut(&mut Reader<'_>) -> Result<(K, V), EncodingError>,
) -> Result<BTreeMap<K, V>, EncodingError> {
    Ok(reader.read_vec(read_entry)?.into_iter().collect())
}

fn read_small(reader: &mut Reader<'_>, field: &'static str) -> Result<u8, EncodingError> {
    let value = reader.read_uvarint()?;
    u8::try_from(value).map_err(|_| EncodingError::InvalidValue { field, value })
}

fn check_association_type(association_type: &[u8]) -> Result<(), EncodingError> {
    if association_type.len() > MAX_ASSOCIATION_TYPE_LENGTH {
        return Err(EncodingError::FieldTooLong {
            field: "association type",
            length: association_type.len(),
            max: MAX_ASSOCIATION_TYPE_LENGTH,
        });
    }
    Ok(())
}

fn write_access_group_key(out: &mut Vec<u8>, key: &AccessGroupLimitKey) {
    key.access_group_owner_pkid.write_prefixed(out);
    out.put_uvarint(u64::from(key.scope_type));
    out.put_var_bytes(&key.access_group_key_name);
    out.put_uvarint(u64::from(key.operation));
}

fn read_access_group_key(reader: &mut Reader<'_>) -> Result<AccessGroupLimitKey, EncodingError> {
    Ok(AccessGroupLimitKey {
        access_group_owner_pkid: Pkid::read_prefixed(reader, "access group owner PKID")?,
        scope_type: read_small(reader, "access group scope type")?,
        access_group_key_name: reader.read_var_bytes()?,
        operation: read_small(reader, "access group operation")?,
    })
}

fn write_stake_key(out: &mut Vec<u8>, key: &StakeLimitKey) {
    key.validator_pkid.write_prefixed(out);
    key.staker_pkid.write_prefixed(out);
}

fn read_stake_key(reader: &mut Reader<'_>) -> Result<StakeLimitKey, EncodingError> {
    Ok(StakeLimitKey {
        validator_pkid: Pkid::read_prefixed(reader, "validator PKID")?,
        staker_pkid: Pkid::read_prefixed(reader, "staker PKID")?,
    })
}

impl BinaryCodec for TransactionSpendingLimit {
    fn encode_to(&self, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        out.put_uvarint(self.global_deso_limit);
        write_map(out, &self.transaction_count_limit_map, |out, txn_type, count| {
            out.put_uvarint(u64::from(txn_type.as_u8()));
            out.put_uvarint(*count);
            Ok(())
        })?;
        write_map(out, &self.creator_coin_operation_limit_map, |out, key, count| {
            key.creator_pkid.write_prefixed(out);
            out.put_uvarint(u64::from(key.operation));
            out.put_uvarint(*count);
            Ok(())
        })?;
        write_map(out, &self.dao_coin_operation_limit_map, |out, key, count| {
            key.creator_pkid.write_prefixed(out);
            out.put_uvarint(u64::from(key.operation));
            out.put_uvarint(*count);
            Ok(())
        })?;
        write_map(out, &self.nft_operation_limit_map, |out, key, count| {
            key.post_hash.write_prefixed(out);
            out.put_uvarint(key.serial_number);
            out.put_uvarint(u64::from(key.operation));
            out.put_uvarint(*count);
            Ok(())
        })?;
        write_map(out, &self.dao_coin_limit_order_limit_map, |out, key, count| {
            key.buying_dao_coin_creator_pkid.write_prefixed(out);
            key.selling_dao_coin_creator_pkid.write_prefixed(out);
            out.put_uvarint(*count);
            Ok(())
        })?;
        write_map(out, &self.association_limit_map, |out, key, count| {
            check_association_type(&key.association_type)?;
            out.put_uvarint(u64::from(key.association_class));
            out.put_var_bytes(&key.association_type);
            out.put_uvarint(u64::from(key.app_scope_type));
            key.app_pkid.write_prefixed(out);
            out.put_uvarint(u64::from(key.operation));
            out.put_uvarint(*count);
            Ok(())
        })?;
        for map in [&self.access_group_map, &self.access_group_member_map] {
            write_map(out, map, |out, key, count| {
                write_access_group_key(out, key);
                out.put_uvarint(*count);
                Ok(())
            })?;
        }
        for map in [&self.stake_limit_map, &self.unstake_limit_map] {
            write_map(out, map, |out, key, amount| {
                write_stake_key(out, key);
                amount.write_to(out);
                Ok(())
            })?;
        }
        write_map(out, &self.unlock_stake_limit_map, |out, key, count| {
            write_stake_key(out, key);
            out.put_uvarint(*count);
            Ok(())
        })?;
        write_map(out, &self.lockup_limit_map, |out, key, count| {
            key.profile_pkid.write_prefixed(out);
            out.put_uvarint(u64::from(key.scope_type));
            out.put_uvarint(u64::from(key.operation));
            out.put_uvarint(*count);
            Ok(())
        })?;
        out.put_bool(self.is_unlimited);
        Ok(())
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, EncodingError> {
        let global_deso_limit = reader.read_uvarint()?;
        let transaction_count_limit_map = read_map(reader, |reader| {
            let txn_type = TxnType::from_u64(reader.read_uvarint()?)?;
            Ok((txn_type, reader.read_uvarint()?))
        })?;
        let creator_coin_operation_limit_map = read_map(reader, |reader| {
            let key = CreatorCoinOperationLimitKey {
                creator_pkid: Pkid::read_prefixed(reader, "creator PKID")?,
                operation: read_small(reader, "creator coin operation")?,
            };
            Ok((key, reader.read_uvarint()?))
        })?;
        let dao_coin_operation_limit_map = read_map(reader, |reader| {
            let key = DaoCoinOperationLimitKey {
                creator_pkid: Pkid::read_prefixed(reader, "creator PKID")?,
                operation: read_small(reader, "DAO coin operation")?,
            };
            Ok((key, reader.read_uvarint()?))
        })?;
        let nft_operation_limit_map = read_map(reader, |reader| {
            let key = NftOperationLimitKey {
                post_hash: CryptoHash::read_prefixed(reader, "NFT post hash")?,
                serial_number: reader.read_uvarint()?,
                operation: read_small(reader, "NFT operation")?,
            };
            Ok((key, reader.read_uvarint()?))
        })?;
        let dao_coin_limit_order_limit_map = read_map(reader, |reader| {
            let key = DaoCoinLimitOrderLimitKey {
                buying_dao_coin_creator_pkid: Pkid::read_prefixed(reader, "buying creator PKID")?,
                selling_dao_coin_creator_pkid: Pkid::read_prefixed(
                    reader,
                    "selling creator PKID",
                )?,
            };
            Ok((key, reader.read_uvarint()?))
        })?;
        let association_limit_map = read_map(reader, |reader| {
            let key = AssociationLimitKey {
                association_class: read_small(reader, "association class")?,
                association_type: reader.read_var_bytes()?,
                app_scope_type: read_small(reader, "association app scope")?,
                app_pkid: Pkid::read_prefixed(reader, "app PKID")?,
                operation: read_small(reader, "association operation")?,
            };
            check_association_type(&key.association_type)?;
            Ok((key, reader.read_uvarint()?))
        })?;
        let access_group_map = read_map(reader, |reader| {
            Ok((read_access_group_key(reader)?, reader.read_uvarint()?))
        })?;
        let access_group_member_map = read_map(reader, |reader| {
            Ok((read_access_group_key(reader)?, reader.read_uvarint()?))
        })?;
        let stake_limit_map = read_map(reader, |reader| {
            Ok((read_stake_key(reader)?, Uint256::read_from(reader)?))
        })?;
        let unstake_limit_map = read_map(reader, |reader| {
            Ok((read_stake_key(reader)?, Uint256::read_from(reader)?))
        })?;
        let unlock_stake_limit_map = read_map(reader, |reader| {
            Ok((read_stake_key(reader)?, reader.read_uvarint()?))
        })?;
        let lockup_limit_map = read_map(reader, |reader| {
            let key = LockupLimitKey {
                profile_pkid: Pkid::read_prefixed(reader, "profile PKID")?,
                scope_type: read_small(reader, "lockup scope type")?,
                operation: read_small(reader, "lockup operation")?,
            };
            Ok((key, reader.read_uvarint()?))
        })?;
        let is_unlimited = reader.read_bool()?;
        Ok(Self {
            global_deso_limit,
            transaction_count_limit_map,
            creator_coin_operation_limit_map,
            dao_coin_operation_limit_map,
            nft_operation_limit_map,
            dao_coin_limit_order_limit_map,
            association_limit_map,
            access_group_map,
            access_group_member_map,
            stake_limit_map,
            unstake_limit_map,
            unlock_stake_limit_map,
            lockup_limit_map,
            is_unlimited,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::crypto::test_utils::{test_hash, test_pkid};

    #[test]
    fn test_tracker_encoding_is_deterministic() {
        let mut limit = TransactionSpendingLimit {
            global_deso_limit: 1_000_000,
            ..Default::default()
        };
        limit
            .transaction_count_limit_map
            .insert(TxnType::SubmitPost, 10);
        limit
            .transaction_count_limit_map
            .insert(TxnType::Like, 5);
        limit.nft_operation_limit_map.insert(
            NftOperationLimitKey {
                post_hash: test_hash(3),
                serial_number: 1,
                operation: 2,
            },
            7,
        );
        limit.stake_limit_map.insert(
            StakeLimitKey {
                validator_pkid: test_pkid(1),
                staker_pkid: test_pkid(2),
            },
            Uint256::from(u128::MAX),
        );
        let bytes = limit.to_bytes().unwrap();
        assert_eq!(limit.clone().to_bytes().unwrap(), bytes);
        assert_eq!(TransactionSpendingLimit::from_bytes(&bytes).unwrap(), limit);
        // Global limit, then the type map in ascending type order.
        assert_eq!(&bytes[..3], &[0xc0, 0x84, 0x3d]);
        assert_eq!(&bytes[3..8], &[2, 5, 10, 10, 5]);
    }

    #[test]
    fn test_oversized_association_type_fails() {
        let mut limit = TransactionSpendingLimit::default();
        limit.association_limit_map.insert(
            AssociationLimitKey {
                association_class: 0,
                association_type: vec![b'a'; MAX_ASSOCIATION_TYPE_LENGTH + 1],
                app_scope_type: 0,
                app_pkid: test_pkid(4),
                operation: 0,
            },
            1,
        );
        assert_matches!(limit.to_bytes(), Err(EncodingError::FieldTooLong { .. }));
    }

    #[test]
    fn test_tracker_json_uses_pair_lists() {
        let mut limit = TransactionSpendingLimit::default();
        limit
            .transaction_count_limit_map
            .insert(TxnType::Follow, 3);
        let json = serde_json::to_value(&limit).unwrap();
        assert_eq!(json["transaction_count_limit_map"][0][1], 3);
        let back: TransactionSpendingLimit = serde_json::from_value(json).unwrap();
        assert_eq!(back, limit);
    }
}
