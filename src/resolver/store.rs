// 💾 Cache Stores - where learned symbol mappings survive restarts

use super::cache::{CachedSymbol, SymbolCache};
use anyhow::{Context as AnyhowContext, Result};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait CacheStore: Send + Sync {
    /// Load everything persisted so far (empty cache when nothing is)
    fn load(&self) -> Result<SymbolCache>;

    /// Persist the full cache
    fn save(&self, cache: &SymbolCache) -> Result<()>;
}

// ============================================================================
// JSON FILE
// ============================================================================

pub struct JsonFileStore {
    path: PathBuf,
    // one writer at a time on the shared temp file
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileStore {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<SymbolCache> {
        if !self.path.exists() {
            return Ok(SymbolCache::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read symbol cache: {:?}", self.path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse symbol cache: {:?}", self.path))
    }

    /// Written to a sibling temp file and renamed into place, so readers
    /// never observe a half-written cache
    fn save(&self, cache: &SymbolCache) -> Result<()> {
        let json = serde_json::to_string_pretty(cache)?;
        let tmp = self.path.with_extension("json.tmp");

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("symbol cache file lock was poisoned, recovering");
            poisoned.into_inner()
        });

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
            }
        }

        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move symbol cache into place: {:?}", self.path))?;
        Ok(())
    }
}

// ============================================================================
// SQLITE
// ============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open symbol cache db: {:?}", path.as_ref()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        setup_cache_table(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("symbol cache connection mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn setup_cache_table(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS symbol_cache (
            code TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            name TEXT,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

impl CacheStore for SqliteStore {
    fn load(&self) -> Result<SymbolCache> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT code, symbol, name FROM symbol_cache")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    CachedSymbol {
                        symbol: row.get(1)?,
                        name: row.get(2)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read symbol_cache rows")?;

        let mut cache = SymbolCache::new();
        cache.merge(rows);
        Ok(cache)
    }

    fn save(&self, cache: &SymbolCache) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO symbol_cache (code, symbol, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(code) DO UPDATE SET
                    symbol = excluded.symbol,
                    name = excluded.name,
                    updated_at = CURRENT_TIMESTAMP",
            )?;
            for (code, entry) in cache.entries() {
                stmt.execute(params![code, entry.symbol, entry.name])?;
            }
        }
        tx.commit().context("Failed to commit symbol cache")?;
        Ok(())
    }
}
