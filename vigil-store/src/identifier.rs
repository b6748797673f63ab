use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Index of a subscription partition, in `0..partitions_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(pub u16);

impl PartitionId {
    /// Routes a project to its partition.
    ///
    /// The routing hashes the decimal representation of the project id with
    /// CRC-32, so every process agrees on the placement of a subscription for
    /// a given partition count.
    pub fn for_project(project_id: u64, partitions_number: u16) -> Result<Self> {
        if partitions_number == 0 {
            return Err(StoreError::NoPartitions);
        }

        let hash = crc32fast::hash(project_id.to_string().as_bytes());

        Ok(Self(u16::try_from(hash % u32::from(partitions_number))?))
    }

    /// Every partition of a registry split in `partitions_number` parts.
    pub fn all(partitions_number: u16) -> impl Iterator<Item = PartitionId> {
        (0..partitions_number).map(PartitionId)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for PartitionId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Durable handle of a subscription, rendered as `<partition>/<key>` where the
/// key is a dash-less hexadecimal UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionIdentifier {
    pub partition: PartitionId,
    pub key: Uuid,
}

impl SubscriptionIdentifier {
    pub fn new(partition: PartitionId, key: Uuid) -> Self {
        Self { partition, key }
    }
}

impl fmt::Display for SubscriptionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.key.simple())
    }
}

impl FromStr for SubscriptionIdentifier {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || StoreError::InvalidIdentifier(value.to_owned());

        let (partition, key) = value.split_once('/').ok_or_else(invalid)?;

        // Only the form produced by `Display` is accepted.
        let canonical_partition = !partition.is_empty()
            && partition.bytes().all(|b| b.is_ascii_digit())
            && (partition == "0" || !partition.starts_with('0'));
        let canonical_key =
            key.len() == 32 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));

        if !canonical_partition || !canonical_key {
            return Err(invalid());
        }

        let partition = partition.parse::<u16>().map_err(|_| invalid())?;

        let key = Uuid::try_parse(key).map_err(|_| invalid())?;

        Ok(Self::new(PartitionId(partition), key))
    }
}

impl Serialize for SubscriptionIdentifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubscriptionIdentifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;

        value.parse().map_err(serde::de::Error::custom)
    }
}
