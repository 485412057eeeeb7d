use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "NoteHub";
const APP_NAME: &str = "notehub";

pub const DEFAULT_BASE_URL: &str = "https://notehub-public.goit.study/api";
pub const MIN_DEBOUNCE_MS: u64 = 300;
pub const MAX_DEBOUNCE_MS: u64 = 500;
pub const MAX_PER_PAGE: u32 = 50;
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 120_000;

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            default_cfg.post_load();
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("NOTEHUB_CONFIG").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dirs.data_dir().join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            log_dir,
            state_dir,
        })
    }

    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let state_dir = root.join("state");
        Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("notehub.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.log_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiOptions,
    pub listing: ListingOptions,
    pub search: SearchOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self) {
        if let Ok(url) = env::var("NOTEHUB_API_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self.api.clamp();
        self.search.clamp();
        self.listing.clamp();
        if self.api.base_url.trim().is_empty() {
            tracing::warn!("empty api.base_url in config, falling back to default");
            self.api.base_url = DEFAULT_BASE_URL.to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiOptions {
    fn clamp(&mut self) {
        let clamped = self.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);
        if clamped != self.timeout_ms {
            tracing::warn!(
                timeout_ms = self.timeout_ms,
                clamped,
                "api.timeout_ms out of range"
            );
            self.timeout_ms = clamped;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingOptions {
    pub per_page: u32,
    /// How long a fetched page counts as fresh (0 = refetch on every key change)
    pub stale_time_ms: u64,
    /// Cached pages older than this are dropped from memory
    pub cache_gc_ms: u64,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            per_page: 12,
            stale_time_ms: 0,
            cache_gc_ms: 5 * 60 * 1000,
        }
    }
}

impl ListingOptions {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn cache_gc(&self) -> Duration {
        Duration::from_millis(self.cache_gc_ms)
    }

    fn clamp(&mut self) {
        let clamped = self.per_page.clamp(1, MAX_PER_PAGE);
        if clamped != self.per_page {
            tracing::warn!(
                per_page = self.per_page,
                clamped,
                "listing.per_page out of range"
            );
            self.per_page = clamped;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub debounce_ms: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl SearchOptions {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn clamp(&mut self) {
        let clamped = self.debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        if clamped != self.debounce_ms {
            tracing::warn!(
                debounce_ms = self.debounce_ms,
                clamped,
                "search.debounce_ms out of range"
            );
            self.debounce_ms = clamped;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub toast_ms: u64,
    pub confirm_delete: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            toast_ms: 4_000,
            confirm_delete: true,
        }
    }
}

impl UiOptions {
    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(ConfigPaths::rooted_at(temp.path()));
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.listing.per_page, 12);
        assert_eq!(cfg.search.debounce_ms, 500);

        let written = fs::read_to_string(&loader.paths().config_file)?;
        assert!(written.contains("[listing]"));
        assert!(written.contains("per_page = 12"));
        Ok(())
    }

    #[test]
    fn out_of_range_values_are_clamped() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[api]\ntimeout_ms = 0\n\n[search]\ndebounce_ms = 50\n\n[listing]\nper_page = 500\n",
        )?;
        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.api.timeout_ms, MIN_TIMEOUT_MS);
        assert_eq!(cfg.search.debounce_ms, MIN_DEBOUNCE_MS);
        assert_eq!(cfg.listing.per_page, MAX_PER_PAGE);
        assert!(cfg.ui.confirm_delete);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_sections() -> anyhow::Result<()> {
        let cfg: AppConfig = toml::from_str("[ui]\nconfirm_delete = false\n")?;
        assert!(!cfg.ui.confirm_delete);
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.listing.stale_time(), Duration::ZERO);
        Ok(())
    }
}
