use crate::db::Store;
use crate::error::Result;
use crate::facets::BASELINE_FOLDERS;
use crate::scanner::ScanRoot;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directories scanned for Markdown documents on every listing.
    pub scan_roots: Vec<ScanRoot>,

    /// Directory names never descended into (hidden entries are always skipped).
    pub skip_dirs: Vec<String>,

    /// Folders always offered as facets.
    #[serde(default)]
    pub baseline_folders: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let scan_roots = directories::BaseDirs::new()
            .map(|dirs| default_scan_roots(dirs.home_dir()))
            .unwrap_or_default();

        Self {
            scan_roots,
            skip_dirs: vec!["node_modules".to_string()],
            baseline_folders: BASELINE_FOLDERS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Second-brain notes plus the assistant workspace. The workspace itself is
/// flat; its memory directory is configured separately as a deep root.
pub fn default_scan_roots(home: &Path) -> Vec<ScanRoot> {
    let workspace = home.join(".openclaw").join("workspace");
    vec![
        ScanRoot::deep(home.join("Documents").join("SecondBrain")),
        ScanRoot::flat(&workspace),
        ScanRoot::deep(workspace.join("memory")),
    ]
}

pub struct ConfigManager {
    store: Store,
    config: Arc<Mutex<AppConfig>>,
}

impl ConfigManager {
    pub fn new(store: Store) -> Result<Self> {
        let config = Arc::new(Mutex::new(AppConfig::default()));
        let manager = Self { store, config };

        // Initialize database table if needed
        manager.init_table()?;

        Ok(manager)
    }

    fn init_table(&self) -> Result<()> {
        let conn = self.store.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                scan_roots TEXT NOT NULL,
                skip_dirs TEXT NOT NULL,
                baseline_folders TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Load settings from database
    pub async fn load(&self) -> Result<AppConfig> {
        let conn = self.store.connection()?;

        let result: std::result::Result<(String, String, String), rusqlite::Error> = conn
            .query_row(
                "SELECT scan_roots, skip_dirs, baseline_folders FROM settings WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            );

        match result {
            Ok((roots_json, skip_json, baseline_json)) => {
                let defaults = AppConfig::default();

                let config = AppConfig {
                    scan_roots: serde_json::from_str(&roots_json).unwrap_or_else(|e| {
                        log::warn!("Invalid scan_roots setting, using defaults: {}", e);
                        defaults.scan_roots
                    }),
                    skip_dirs: serde_json::from_str(&skip_json).unwrap_or(defaults.skip_dirs),
                    baseline_folders: serde_json::from_str(&baseline_json)
                        .unwrap_or(defaults.baseline_folders),
                };

                *self.config.lock().await = config.clone();
                Ok(config)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                // First time - insert default settings
                let default_config = AppConfig::default();
                self.save(&default_config).await?;
                Ok(default_config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings to database
    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        let conn = self.store.connection()?;

        let roots_json = serde_json::to_string(&config.scan_roots)?;
        let skip_json = serde_json::to_string(&config.skip_dirs)?;
        let baseline_json = serde_json::to_string(&config.baseline_folders)?;
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO settings (id, scan_roots, skip_dirs, baseline_folders, created_at, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
                scan_roots = excluded.scan_roots,
                skip_dirs = excluded.skip_dirs,
                baseline_folders = excluded.baseline_folders,
                updated_at = excluded.updated_at",
            params![roots_json, skip_json, baseline_json, now],
        )?;

        // Update in-memory config
        *self.config.lock().await = config.clone();

        log::info!("Saved settings ({} scan roots)", config.scan_roots.len());
        Ok(())
    }

    /// Get current config (from memory)
    pub async fn get(&self) -> AppConfig {
        self.config.lock().await.clone()
    }
}
