// 🔎 Identity Resolver - security identity code → trading symbol
//
// Tiered lookup:
//   exact-code cache → 6-char prefix cache → static table → placeholder
//
// Placeholders can be upgraded through an injected BatchLookup. Everything
// learned that way goes into the shared cache under a single write lock and
// is persisted through an injected CacheStore. Resolution never fails: a
// code nobody can map keeps its 6-character prefix as its symbol.

pub mod cache;
pub mod company_names;
#[cfg(feature = "openfigi")]
pub mod figi;
pub mod lookup;
pub mod static_table;
pub mod store;
pub mod throttle;

pub use cache::{issuer_prefix, normalize_code, CachedSymbol, SymbolCache};
pub use company_names::CompanyNameTable;
pub use lookup::{BatchLookup, LookupError, LookupMapping, MAX_BATCH_SIZE};
pub use static_table::StaticTable;
pub use store::{CacheStore, JsonFileStore, SqliteStore};
pub use throttle::{RetryPolicy, Throttle};

use anyhow::{Context as AnyhowContext, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionSource {
    ExactCache,
    PrefixCache,
    StaticTable,
    BatchLookup,
    /// Unresolved; the symbol is the code's 6-character prefix
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
    pub symbol: String,
    pub source: ResolutionSource,
    pub name: Option<String>,
}

impl Resolved {
    pub fn placeholder(code: &str) -> Self {
        Resolved {
            symbol: issuer_prefix(code).to_string(),
            source: ResolutionSource::Placeholder,
            name: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ResolutionSource::Placeholder
    }
}

/// A code whose batch lookup failed or stayed throttled past the retry
/// budget. Not an error: the code keeps its placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionUnavailable {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchResolution {
    /// Every requested code (normalized) → its resolution
    pub resolved: HashMap<String, Resolved>,

    /// Codes the lookup answered for but could not map
    pub unmapped: Vec<String>,

    /// Codes whose lookup call failed
    pub unavailable: Vec<ResolutionUnavailable>,

    /// Number of external lookup calls made (retries excluded)
    pub lookup_calls: usize,
}

impl BatchResolution {
    pub fn get(&self, code: &str) -> Option<&Resolved> {
        self.resolved.get(&normalize_code(code))
    }

    /// Resolution for `code`, falling back to its placeholder
    pub fn resolution_for(&self, code: &str) -> Resolved {
        self.get(code)
            .cloned()
            .unwrap_or_else(|| Resolved::placeholder(&normalize_code(code)))
    }

    pub fn placeholder_count(&self) -> usize {
        self.resolved.values().filter(|r| r.is_placeholder()).count()
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Codes per lookup call (clamped to 1..=100)
    pub batch_size: usize,

    /// Process-wide lookup rate
    pub requests_per_minute: u32,
    pub burst: u32,

    pub retry: RetryPolicy,

    /// `.db` / `.sqlite` → SQLite store, anything else → JSON file
    pub cache_path: Option<PathBuf>,

    /// `prefix,symbol[,name]` CSV replacing the built-in table
    pub static_table_path: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            batch_size: MAX_BATCH_SIZE,
            requests_per_minute: 25,
            burst: 5,
            retry: RetryPolicy::default(),
            cache_path: None,
            static_table_path: None,
        }
    }
}

impl ResolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read resolver config: {:?}", path.as_ref()))?;
        serde_json::from_str(&content).context("Failed to parse resolver config JSON")
    }
}

static SHARED_THROTTLE: Lazy<Arc<Throttle>> = Lazy::new(|| {
    let defaults = ResolverConfig::default();
    Arc::new(Throttle::new(defaults.requests_per_minute, defaults.burst))
});

/// The process-wide throttle used unless one is injected
pub fn shared_throttle() -> Arc<Throttle> {
    Arc::clone(&SHARED_THROTTLE)
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct IdentityResolver {
    cache: Arc<RwLock<SymbolCache>>,
    table: StaticTable,
    lookup: Option<Arc<dyn BatchLookup>>,
    store: Option<Arc<dyn CacheStore>>,
    throttle: Arc<Throttle>,
    retry: RetryPolicy,
    batch_size: usize,

    /// Held from snapshot to save so an older snapshot never lands last
    persist_lock: Mutex<()>,
}

impl IdentityResolver {
    /// Built-in static table, empty cache, no external lookup
    pub fn new() -> Self {
        IdentityResolver {
            cache: Arc::new(RwLock::new(SymbolCache::new())),
            table: StaticTable::default(),
            lookup: None,
            store: None,
            throttle: shared_throttle(),
            retry: RetryPolicy::default(),
            batch_size: MAX_BATCH_SIZE,
            persist_lock: Mutex::new(()),
        }
    }

    /// Build from config: static table and cache store are loaded from the
    /// configured paths. The throttle is created from the config and should
    /// be shared with any other resolver built afterwards.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut resolver = IdentityResolver::new()
            .with_throttle(Arc::new(Throttle::new(config.requests_per_minute, config.burst)))
            .with_retry(config.retry.clone())
            .with_batch_size(config.batch_size);

        if let Some(path) = &config.static_table_path {
            resolver = resolver.with_static_table(StaticTable::from_csv_path(path)?);
        }

        if let Some(path) = &config.cache_path {
            let is_sqlite = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("db") | Some("sqlite")
            );
            let store: Arc<dyn CacheStore> = if is_sqlite {
                Arc::new(SqliteStore::open(path)?)
            } else {
                Arc::new(JsonFileStore::new(path))
            };
            resolver = resolver.with_store(store)?;
        }

        Ok(resolver)
    }

    pub fn with_static_table(mut self, table: StaticTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn BatchLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_throttle(mut self, throttle: Arc<Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Attach a store and merge whatever it already holds into the cache
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Result<Self> {
        let persisted = store.load().context("Failed to load symbol cache")?;
        let loaded = persisted.len();
        {
            let mut cache = self.write_cache();
            cache.merge(
                persisted
                    .entries()
                    .map(|(code, entry)| (code.clone(), entry.clone())),
            );
        }
        tracing::info!(entries = loaded, "symbol cache loaded");
        self.store = Some(store);
        Ok(self)
    }

    pub fn throttle(&self) -> Arc<Throttle> {
        Arc::clone(&self.throttle)
    }

    pub fn cache_len(&self) -> usize {
        self.read_cache().len()
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, SymbolCache> {
        self.cache.read().unwrap_or_else(|poisoned| {
            tracing::warn!("symbol cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, SymbolCache> {
        self.cache.write().unwrap_or_else(|poisoned| {
            tracing::warn!("symbol cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // ========================================================================
    // LOCAL TIERS
    // ========================================================================

    /// Resolve without touching the network
    pub fn resolve(&self, code: &str) -> Resolved {
        let code = normalize_code(code);

        {
            let cache = self.read_cache();
            if let Some(hit) = cache.get_exact(&code) {
                return Resolved {
                    symbol: hit.symbol.clone(),
                    source: ResolutionSource::ExactCache,
                    name: hit.name.clone(),
                };
            }
            if let Some(hit) = cache.get_prefix(&code) {
                return Resolved {
                    symbol: hit.symbol.clone(),
                    source: ResolutionSource::PrefixCache,
                    name: hit.name.clone(),
                };
            }
        }

        if let Some(entry) = self.table.lookup(&code) {
            return Resolved {
                symbol: entry.symbol.clone(),
                source: ResolutionSource::StaticTable,
                name: entry.name.clone(),
            };
        }

        Resolved::placeholder(&code)
    }

    // ========================================================================
    // BATCH PATH
    // ========================================================================

    /// Resolve a whole document's codes at once. Placeholders go to the
    /// batch lookup in chunks; anything it confirms is cached and persisted.
    pub fn resolve_batch<S: AsRef<str>>(&self, codes: &[S]) -> BatchResolution {
        let mut batch = BatchResolution::default();
        let mut pending: Vec<String> = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();

        for raw in codes {
            let code = normalize_code(raw.as_ref());
            if batch.resolved.contains_key(&code) {
                continue;
            }
            let local = self.resolve(&code);
            if local.is_placeholder() && queued.insert(code.clone()) {
                pending.push(code.clone());
            }
            batch.resolved.insert(code, local);
        }

        let lookup = match (&self.lookup, pending.is_empty()) {
            (Some(lookup), false) => Arc::clone(lookup),
            _ => return batch,
        };

        tracing::debug!(
            pending = pending.len(),
            provider = lookup.name(),
            "resolving placeholders via batch lookup"
        );

        let mut confirmed: Vec<(String, CachedSymbol)> = Vec::new();

        for chunk in pending.chunks(self.batch_size) {
            batch.lookup_calls += 1;
            match self.lookup_chunk(lookup.as_ref(), chunk) {
                Ok(mapped) => {
                    let mapped: HashMap<String, LookupMapping> = mapped
                        .into_iter()
                        .map(|(code, m)| (normalize_code(&code), m))
                        .collect();

                    for code in chunk {
                        match mapped.get(code) {
                            Some(m) => {
                                batch.resolved.insert(
                                    code.clone(),
                                    Resolved {
                                        symbol: m.symbol.clone(),
                                        source: ResolutionSource::BatchLookup,
                                        name: m.name.clone(),
                                    },
                                );
                                confirmed.push((
                                    code.clone(),
                                    CachedSymbol {
                                        symbol: m.symbol.clone(),
                                        name: m.name.clone(),
                                    },
                                ));
                            }
                            None => batch.unmapped.push(code.clone()),
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(codes = chunk.len(), error = %e, "batch lookup gave up; keeping placeholders");
                    batch
                        .unavailable
                        .extend(chunk.iter().map(|code| ResolutionUnavailable {
                            code: code.clone(),
                            reason: e.to_string(),
                        }));
                }
            }
        }

        if !confirmed.is_empty() {
            let merged = self.write_cache().merge(confirmed);
            tracing::info!(merged, "cached new symbol mappings");

            if let Err(e) = self.persist() {
                tracing::warn!(error = %e, "failed to persist symbol cache");
            }
        }

        batch
    }

    /// One chunk with throttling and backoff on provider throttling
    fn lookup_chunk(
        &self,
        lookup: &dyn BatchLookup,
        chunk: &[String],
    ) -> Result<HashMap<String, LookupMapping>, LookupError> {
        let mut attempt = 0;
        loop {
            self.throttle.acquire();
            match lookup.lookup(chunk) {
                Ok(mapped) => return Ok(mapped),
                Err(LookupError::Throttled { retry_after }) if attempt < self.retry.max_retries => {
                    let wait = self.retry.delay_with_hint(attempt, retry_after);
                    tracing::warn!(
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "batch lookup throttled, backing off"
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Write the current cache through the attached store (no-op without one)
    pub fn persist(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("persist lock was poisoned, recovering");
            poisoned.into_inner()
        });
        let snapshot = self.read_cache().clone();
        store.save(&snapshot)
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        IdentityResolver::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Lookup that knows a fixed map and can be told to throttle
    pub(crate) struct FakeLookup {
        known: HashMap<String, LookupMapping>,
        throttle_first: Mutex<u32>,
        fail: bool,
        pub calls: Mutex<Vec<usize>>,
    }

    impl FakeLookup {
        pub(crate) fn new(known: &[(&str, &str)]) -> Self {
            FakeLookup {
                known: known
                    .iter()
                    .map(|(code, symbol)| {
                        (
                            code.to_string(),
                            LookupMapping {
                                symbol: symbol.to_string(),
                                name: Some(format!("{} CORP", symbol)),
                            },
                        )
                    })
                    .collect(),
                throttle_first: Mutex::new(0),
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn throttling(mut self, times: u32) -> Self {
            self.throttle_first = Mutex::new(times);
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl BatchLookup for FakeLookup {
        fn lookup(&self, codes: &[String]) -> Result<HashMap<String, LookupMapping>, LookupError> {
            self.calls.lock().unwrap().push(codes.len());

            let mut remaining = self.throttle_first.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LookupError::Throttled { retry_after: None });
            }
            if self.fail {
                return Err(LookupError::Unavailable("connection refused".to_string()));
            }

            Ok(codes
                .iter()
                .filter_map(|c| self.known.get(c).map(|m| (c.clone(), m.clone())))
                .collect())
        }
    }

    pub(crate) fn test_resolver() -> IdentityResolver {
        IdentityResolver::new()
            .with_throttle(Arc::new(Throttle::unlimited()))
            .with_retry(RetryPolicy::immediate(2))
    }

    #[test]
    fn test_local_tiers() {
        let resolver = test_resolver();

        let aapl = resolver.resolve(" 037833100 ");
        assert_eq!(aapl.symbol, "AAPL");
        assert_eq!(aapl.source, ResolutionSource::StaticTable);

        let unknown = resolver.resolve("g5960l103");
        assert_eq!(unknown.symbol, "G5960L");
        assert_eq!(unknown.source, ResolutionSource::Placeholder);
    }

    #[test]
    fn test_cache_tiers_take_precedence() {
        let resolver = test_resolver();
        resolver.write_cache().insert(
            "037833100",
            CachedSymbol {
                symbol: "AAPL.X".to_string(),
                name: None,
            },
        );

        assert_eq!(resolver.resolve("037833100").source, ResolutionSource::ExactCache);
        let sibling = resolver.resolve("037833999");
        assert_eq!(sibling.source, ResolutionSource::PrefixCache);
        assert_eq!(sibling.symbol, "AAPL.X");
    }

    #[test]
    fn test_batch_without_lookup_keeps_placeholders() {
        let resolver = test_resolver();
        let batch = resolver.resolve_batch(&["037833100", "G5960L103"]);
        assert_eq!(batch.lookup_calls, 0);
        assert_eq!(batch.placeholder_count(), 1);
        assert!(batch.unavailable.is_empty());
    }

    #[test]
    fn test_batch_chunks_and_dedup() {
        let fake = Arc::new(FakeLookup::new(&[("Z00007100", "ZZZ")]));
        let resolver = test_resolver().with_lookup(fake.clone());

        let mut codes: Vec<String> = (0..250).map(|i| format!("Z{:05}100", i)).collect();
        codes.extend((0..50).map(|i| format!("z{:05}100", i))); // duplicates, lowercase
        codes.push("037833100".to_string());

        let batch = resolver.resolve_batch(&codes);

        assert_eq!(*fake.calls.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(batch.lookup_calls, 3);
        assert_eq!(batch.resolved.len(), 251);
        assert_eq!(batch.get("Z00007100").unwrap().source, ResolutionSource::BatchLookup);
        assert_eq!(batch.unmapped.len(), 249);
        assert_eq!(batch.resolution_for("037833100").symbol, "AAPL");

        // now cached under both indexes
        assert_eq!(resolver.resolve("Z00007100").source, ResolutionSource::ExactCache);
        assert_eq!(resolver.resolve("Z00007999").source, ResolutionSource::PrefixCache);
    }

    #[test]
    fn test_throttled_then_recovers() {
        let fake = Arc::new(FakeLookup::new(&[("G5960L103", "MDT")]).throttling(2));
        let resolver = test_resolver().with_lookup(fake.clone());

        let batch = resolver.resolve_batch(&["G5960L103"]);

        assert_eq!(fake.calls.lock().unwrap().len(), 3);
        assert_eq!(batch.get("G5960L103").unwrap().symbol, "MDT");
        assert!(batch.unavailable.is_empty());
    }

    #[test]
    fn test_throttled_past_budget_is_unavailable() {
        let fake = Arc::new(FakeLookup::new(&[("G5960L103", "MDT")]).throttling(10));
        let resolver = test_resolver().with_lookup(fake.clone());

        let batch = resolver.resolve_batch(&["G5960L103"]);

        // first attempt + 2 retries
        assert_eq!(fake.calls.lock().unwrap().len(), 3);
        assert_eq!(batch.unavailable.len(), 1);
        assert_eq!(batch.unavailable[0].code, "G5960L103");
        let r = batch.get("G5960L103").unwrap();
        assert!(r.is_placeholder());
        assert_eq!(r.symbol, "G5960L");
    }

    #[test]
    fn test_unavailable_is_not_retried() {
        let fake = Arc::new(FakeLookup::new(&[]).failing());
        let resolver = test_resolver().with_lookup(fake.clone());

        let batch = resolver.resolve_batch(&["G5960L103", "H1467J104"]);
        assert_eq!(fake.calls.lock().unwrap().len(), 1);
        assert_eq!(batch.unavailable.len(), 2);
        assert!(batch.unavailable[0].reason.contains("connection refused"));
    }

    #[test]
    fn test_persisted_cache_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.json");

        {
            let store = Arc::new(JsonFileStore::new(&path));
            let fake = Arc::new(FakeLookup::new(&[("H1467J104", "CB")]));
            let resolver = test_resolver()
                .with_lookup(fake)
                .with_store(store)
                .unwrap();
            resolver.resolve_batch(&["H1467J104"]);
        }

        let restarted = test_resolver()
            .with_store(Arc::new(JsonFileStore::new(&path)))
            .unwrap();
        assert_eq!(restarted.cache_len(), 1);
        let cb = restarted.resolve("H1467J104");
        assert_eq!(cb.symbol, "CB");
        assert_eq!(cb.source, ResolutionSource::ExactCache);
    }

    #[test]
    fn test_concurrent_batches_share_cache() {
        let fake = Arc::new(FakeLookup::new(&[("G5960L103", "MDT"), ("H1467J104", "CB")]));
        let resolver = Arc::new(test_resolver().with_lookup(fake));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let r = Arc::clone(&resolver);
                std::thread::spawn(move || r.resolve_batch(&["G5960L103", "H1467J104"]))
            })
            .collect();

        for h in handles {
            let batch = h.join().unwrap();
            assert_eq!(batch.placeholder_count(), 0);
        }
        assert_eq!(resolver.cache_len(), 2);
    }

    /// JSON store whose first save stalls, so a later save can overtake it
    struct StallingStore {
        inner: JsonFileStore,
        stalled: std::sync::atomic::AtomicBool,
    }

    impl CacheStore for StallingStore {
        fn load(&self) -> Result<SymbolCache> {
            self.inner.load()
        }

        fn save(&self, cache: &SymbolCache) -> Result<()> {
            use std::sync::atomic::Ordering;
            if !self.stalled.swap(true, Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(300));
            }
            self.inner.save(cache)
        }
    }

    #[test]
    fn test_overlapping_persists_keep_every_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.json");
        let store = Arc::new(StallingStore {
            inner: JsonFileStore::new(&path),
            stalled: std::sync::atomic::AtomicBool::new(false),
        });
        let fake = Arc::new(FakeLookup::new(&[("G5960L103", "MDT"), ("H1467J104", "CB")]));
        let resolver = Arc::new(test_resolver().with_lookup(fake).with_store(store).unwrap());

        let first = {
            let r = Arc::clone(&resolver);
            std::thread::spawn(move || r.resolve_batch(&["G5960L103"]))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        let second = {
            let r = Arc::clone(&resolver);
            std::thread::spawn(move || r.resolve_batch(&["H1467J104"]))
        };
        first.join().unwrap();
        second.join().unwrap();

        let on_disk = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(on_disk.len(), 2);
        println!("✅ Both mappings persisted: {} entries on disk", on_disk.len());
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("resolver.json");
        let table_path = dir.path().join("table.csv");
        fs::write(&table_path, "prefix,symbol\nG5960L,MDT\n").unwrap();
        fs::write(
            &config_path,
            format!(
                r#"{{"batch_size": 500, "static_table_path": {:?}, "cache_path": {:?}}}"#,
                table_path,
                dir.path().join("cache.db")
            ),
        )
        .unwrap();

        let config = ResolverConfig::from_file(&config_path).unwrap();
        assert_eq!(config.requests_per_minute, 25);
        assert_eq!(config.retry, RetryPolicy::default());

        let resolver = IdentityResolver::from_config(&config).unwrap();
        assert_eq!(resolver.batch_size, MAX_BATCH_SIZE);
        assert_eq!(resolver.resolve("G5960L103").symbol, "MDT");
        // replaced table no longer knows the built-ins
        assert!(resolver.resolve("037833100").is_placeholder());
        resolver.persist().unwrap();
    }
}
