use bytes::Bytes;
use std::collections::HashMap;

/// Origin -> (location -> raw bytes of the last fetch).
///
/// The raw bytes are scratch space for a refresh cycle. They are written
/// after the fetch join, read by the merge and cleared right after it.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    origins: HashMap<String, HashMap<String, Bytes>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sources<I, O, L>(sources: I) -> Self
    where
        I: IntoIterator<Item = (O, Vec<L>)>,
        O: Into<String>,
        L: Into<String>,
    {
        let mut registry = Self::new();
        for (origin, locations) in sources {
            let origin = origin.into();
            registry.add_origin(origin.clone());
            for location in locations {
                registry.insert(origin.clone(), location);
            }
        }
        registry
    }

    /// Registers an origin that may not have any location yet.
    pub fn add_origin(&mut self, origin: impl Into<String>) {
        self.origins.entry(origin.into()).or_default();
    }

    pub fn insert(&mut self, origin: impl Into<String>, location: impl Into<String>) {
        self.origins
            .entry(origin.into())
            .or_default()
            .insert(location.into(), Bytes::new());
    }

    /// Every (origin, location) pair: the fetch plan of one cycle.
    pub fn locations(&self) -> Vec<(String, String)> {
        self.origins
            .iter()
            .flat_map(|(origin, sources)| {
                sources
                    .keys()
                    .map(move |location| (origin.clone(), location.clone()))
            })
            .collect()
    }

    /// Stores fetched bytes. Unknown pairs are ignored.
    pub fn store(&mut self, origin: &str, location: &str, bytes: Bytes) -> bool {
        match self
            .origins
            .get_mut(origin)
            .and_then(|sources| sources.get_mut(location))
        {
            Some(slot) => {
                *slot = bytes;
                true
            }
            None => false,
        }
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.keys().map(String::as_str)
    }

    pub fn blobs<'a>(&'a self, origin: &str) -> impl Iterator<Item = &'a Bytes> + 'a {
        self.origins
            .get(origin)
            .into_iter()
            .flat_map(|sources| sources.values())
            .filter(|bytes| !bytes.is_empty())
    }

    pub fn clear_scratch(&mut self) {
        for sources in self.origins.values_mut() {
            for bytes in sources.values_mut() {
                *bytes = Bytes::new();
            }
        }
    }

    /// Number of registered locations across all origins.
    pub fn len(&self) -> usize {
        self.origins.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }
}
