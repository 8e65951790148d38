use std::collections::HashMap;

/// Maps remote category names (e.g. `downloadable_game`) to local category ids.
#[derive(Clone, Debug, Default)]
pub struct CategoryRegistry {
    by_name: HashMap<String, i64>,
}

impl CategoryRegistry {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            by_name: entries
                .into_iter()
                .map(|(name, id)| (name.into(), id))
                .collect(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_exact() {
        let registry = CategoryRegistry::from_entries([("downloadable_game", 1), ("add_on", 2)]);
        assert_eq!(registry.resolve("add_on"), Some(2));
        assert_eq!(registry.resolve("ADD_ON"), None);
        assert_eq!(registry.resolve("add"), None);
        assert_eq!(registry.len(), 2);
    }
}
