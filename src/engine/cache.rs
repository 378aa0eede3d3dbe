use super::fetcher::HttpFetcher;
use super::parser::parse_cidrs;
use super::snapshot::Snapshot;
use super::traits::SourceFetcher;
use crate::config::Config;
use crate::error::{FetchError, LookupError};
use crate::registry::SourceRegistry;
use anyhow::{Context, Result};
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use futures::{stream, StreamExt};
use ipnet::IpNet;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// How long a snapshot is served before the next query refreshes it.
    pub cache_period: Duration,
    /// Upper bound for a single source fetch.
    pub fetch_timeout: Duration,
    /// `None` fetches every location at once.
    pub concurrent_downloads: Option<usize>,
    /// Sent as the `User-Agent` header of every fetch.
    pub user_agent: String,
}

impl CacheSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_period: config.cache_period(),
            fetch_timeout: config.fetch_timeout(),
            concurrent_downloads: config.fetch.concurrent_downloads,
            user_agent: config.fetch.user_agent.clone(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Shared cache of VPN subnets, refreshed on demand from the registered sources.
///
/// Queries read the current [`Snapshot`] without locking. A stale query
/// runs a refresh cycle first; concurrent stale queries wait for that one
/// cycle instead of starting their own.
pub struct SubnetCache {
    fetcher: Arc<dyn SourceFetcher>,
    settings: CacheSettings,
    // Also the single-flight guard: only the holder runs a refresh.
    registry: Mutex<SourceRegistry>,
    snapshot: ArcSwapOption<Snapshot>,
    invalidated: AtomicBool,
    // Bumped after every install, including installs of an empty snapshot.
    generation: AtomicU64,
    headers: HeaderMap,
}

impl SubnetCache {
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn SourceFetcher>,
        settings: CacheSettings,
    ) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&settings.user_agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(e) => warn!("Ignoring user agent {:?}: {}", settings.user_agent, e),
        }

        Self {
            fetcher,
            settings,
            registry: Mutex::new(registry),
            snapshot: ArcSwapOption::empty(),
            invalidated: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            headers,
        }
    }

    /// Builds a cache that fetches the configured sources over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher =
            HttpFetcher::from_config(&config.fetch).context("Failed to build HTTP client")?;
        let registry = SourceRegistry::from_sources(config.sources.clone());

        Ok(Self::new(
            registry,
            Arc::new(fetcher),
            CacheSettings::from_config(config),
        ))
    }

    /// Returns the origin whose subnets contain `address`.
    pub async fn check(&self, address: &str) -> Result<String, LookupError> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| LookupError::InvalidAddress(address.to_string()))?;

        self.ensure_fresh().await;

        let snapshot = self.snapshot.load();
        snapshot
            .as_deref()
            .and_then(|snap| snap.lookup(ip))
            .map(str::to_string)
            .ok_or(LookupError::NotFound)
    }

    /// Every known subnet across all origins, in no particular order.
    pub async fn all_subnets(&self) -> Vec<IpNet> {
        self.ensure_fresh().await;

        self.snapshot
            .load()
            .as_deref()
            .map(Snapshot::subnets)
            .unwrap_or_default()
    }

    /// The snapshot currently served, without triggering a refresh.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn last_refreshed(&self) -> Option<Instant> {
        self.snapshot.load().as_deref().map(Snapshot::refreshed_at)
    }

    /// Installs a new source registry.
    ///
    /// Waits for an in-flight refresh. The current snapshot keeps being
    /// served until the next query rebuilds it from the new sources.
    pub async fn replace_sources(&self, registry: SourceRegistry) {
        let mut guard = self.registry.lock().await;
        *guard = registry;
        self.invalidated.store(true, Ordering::Release);
        info!(
            "Source registry replaced: {} origins, {} locations",
            guard.origin_count(),
            guard.len()
        );
    }

    /// Runs a refresh cycle now, regardless of staleness.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let mut registry = self.registry.lock().await;
        self.refresh_locked(&mut registry).await
    }

    fn is_stale(&self) -> bool {
        if self.invalidated.load(Ordering::Acquire) {
            return true;
        }
        match self.snapshot.load().as_deref() {
            None => true,
            Some(snap) if snap.is_empty() => true,
            // A period too large to represent never expires.
            Some(snap) => snap
                .refreshed_at()
                .checked_add(self.settings.cache_period)
                .is_some_and(|due| Instant::now() >= due),
        }
    }

    async fn ensure_fresh(&self) {
        let seen = self.generation.load(Ordering::Acquire);
        if !self.is_stale() {
            return;
        }

        let mut registry = self.registry.lock().await;
        // Another caller finished a cycle while we waited for the lock. Its
        // result is used even when every source failed.
        if self.generation.load(Ordering::Acquire) != seen || !self.is_stale() {
            debug!("Snapshot refreshed by a concurrent caller");
            return;
        }
        self.refresh_locked(&mut registry).await;
    }

    async fn refresh_locked(&self, registry: &mut SourceRegistry) -> Arc<Snapshot> {
        let targets = registry.locations();
        info!(
            "Refreshing VPN subnets from {} sources across {} origins...",
            targets.len(),
            registry.origin_count()
        );

        let limit = self
            .settings
            .concurrent_downloads
            .unwrap_or(targets.len())
            .max(1);

        let tasks = targets.into_iter().map(|(origin, location)| {
            let fetcher = self.fetcher.clone();
            let headers = &self.headers;
            let timeout = self.settings.fetch_timeout;
            async move {
                let result =
                    fetch_with_timeout(fetcher.as_ref(), &location, headers, timeout).await;
                (origin, location, result)
            }
        });

        // Each task owns its result slot; the registry is only written after the join.
        let results: Vec<(String, String, Result<Bytes, FetchError>)> = stream::iter(tasks)
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut failed = 0;
        for (origin, location, result) in results {
            match result {
                Ok(bytes) => {
                    registry.store(&origin, &location, bytes);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Skipping source for '{}': {}", origin, e);
                }
            }
        }

        let mut subnets: FxHashMap<Box<str>, Vec<IpNet>> = FxHashMap::default();
        let mut dropped = 0;
        for origin in registry.origins() {
            let nets = subnets.entry(Box::from(origin)).or_default();
            for blob in registry.blobs(origin) {
                let parsed = parse_cidrs(blob);
                dropped += parsed.dropped;
                nets.extend(parsed.subnets);
            }
        }

        registry.clear_scratch();

        let snapshot = Arc::new(Snapshot::new(subnets, Instant::now()));
        self.snapshot.store(Some(snapshot.clone()));
        self.invalidated.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);

        for (origin, count) in snapshot.origin_counts() {
            info!("Origin '{}': {} subnets", origin, count);
        }
        if dropped > 0 {
            debug!("Dropped {} malformed entries", dropped);
        }
        info!(
            "Refresh complete. {} subnets installed ({} sources failed)",
            snapshot.len(),
            failed
        );

        snapshot
    }
}

async fn fetch_with_timeout(
    fetcher: &dyn SourceFetcher,
    location: &str,
    headers: &HeaderMap,
    timeout: Duration,
) -> Result<Bytes, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(location, headers)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            location: location.to_string(),
            after: timeout,
        }),
    }
}
