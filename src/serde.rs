//! Serialization and Deserialization implementation

use ::serde::{Deserialize, Deserializer, Serialize, Serializer};
use ipnet::IpNet;

use crate::LpmTrie;

impl<T: Serialize> Serialize for LpmTrie<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(&IpNet, &T)> = Vec::from_iter(self);
        entries.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for LpmTrie<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(IpNet, T)> = Vec::deserialize(deserializer)?;
        Ok(Self::from_iter(entries))
    }
}
