use std::collections::HashMap;

use crate::catalog_store::Flags;
use crate::error::{SyncError, SyncResult};

/// Symbolic flag names bound to single bits of a record's 16-bit mask.
///
/// Built once from its entries and never mutated afterwards. Every name owns
/// exactly one bit and no two names share a bit.
#[derive(Clone, Debug, Default)]
pub struct FlagRegistry {
    by_name: HashMap<String, Flags>,
}

impl FlagRegistry {
    pub fn from_entries<I, S>(entries: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut by_name: HashMap<String, Flags> = HashMap::new();
        for (name, value) in entries {
            let name = name.into();
            let bit = Flags::try_from(value)
                .ok()
                .filter(|bit| bit.is_power_of_two())
                .ok_or_else(|| SyncError::InvalidFlagValue {
                    name: name.clone(),
                    value,
                })?;
            if by_name.contains_key(&name) {
                return Err(SyncError::DuplicateFlagName(name));
            }
            if let Some((existing, _)) = by_name.iter().find(|(_, b)| **b == bit) {
                return Err(SyncError::DuplicateFlagBit {
                    name,
                    existing: existing.clone(),
                    value: bit,
                });
            }
            by_name.insert(name, bit);
        }
        Ok(Self { by_name })
    }

    /// Bit value registered under `name`.
    pub fn resolve(&self, name: &str) -> SyncResult<Flags> {
        self.get(name)
            .ok_or_else(|| SyncError::UnknownFlag(name.to_string()))
    }

    /// Like `resolve`, for callers where an unregistered flag simply means "not in use".
    pub fn get(&self, name: &str) -> Option<Flags> {
        self.by_name.get(name).copied()
    }

    /// Names of every registered flag set in `flags`, sorted by bit.
    pub fn describe(&self, flags: Flags) -> Vec<&str> {
        let mut set: Vec<(&str, Flags)> = self
            .by_name
            .iter()
            .filter(|(_, bit)| flags & **bit != 0)
            .map(|(name, bit)| (name.as_str(), *bit))
            .collect();
        set.sort_by_key(|(_, bit)| *bit);
        set.into_iter().map(|(name, _)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
