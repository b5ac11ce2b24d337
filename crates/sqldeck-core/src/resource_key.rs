//! Resource keys addressing one, several or all entries of a resource

/// Addresses entries of a keyed resource.
///
/// Events and loads carry a `ResourceKey`; a bulk delete ("all connections of
/// a project") is a single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey<K> {
    All,
    One(K),
    List(Vec<K>),
}

impl<K: PartialEq> ResourceKey<K> {
    /// Whether `key` is addressed by this resource key
    pub fn includes(&self, key: &K) -> bool {
        match self {
            ResourceKey::All => true,
            ResourceKey::One(k) => k == key,
            ResourceKey::List(keys) => keys.contains(key),
        }
    }

    /// The explicit keys, or `None` for `All`
    pub fn keys(&self) -> Option<Vec<&K>> {
        match self {
            ResourceKey::All => None,
            ResourceKey::One(k) => Some(vec![k]),
            ResourceKey::List(keys) => Some(keys.iter().collect()),
        }
    }
}

impl<K> From<K> for ResourceKey<K> {
    fn from(key: K) -> Self {
        ResourceKey::One(key)
    }
}

impl<K> FromIterator<K> for ResourceKey<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        ResourceKey::List(iter.into_iter().collect())
    }
}
