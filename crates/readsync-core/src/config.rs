//! TOML-based sync configuration.
//!
//! Holds everything a run needs to talk to both sides:
//! - the tracked shelf name and its timezone
//! - Notion token and database / block identifiers
//! - WeRead cookie and endpoints
//! - heatmap output folder and public URL context
//! - ISBN catalog endpoint and retry policy
//!
//! Configuration is read from `--config`, else `~/.config/readsync/config.toml`
//! if it exists, else defaults. Environment variables are applied on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Notion connection and target identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,
    /// Book metadata database ("书架").
    #[serde(default)]
    pub book_database_id: String,
    /// Per-book reading-duration database.
    #[serde(default)]
    pub read_database_id: String,
    /// Aggregate per-day reading-duration database.
    #[serde(default)]
    pub daily_database_id: String,
    #[serde(default)]
    pub author_database_id: String,
    #[serde(default)]
    pub category_database_id: String,
    #[serde(default)]
    pub year_database_id: Option<String>,
    #[serde(default)]
    pub month_database_id: Option<String>,
    #[serde(default)]
    pub week_database_id: Option<String>,
    #[serde(default)]
    pub date_database_id: Option<String>,
    /// Embed block that shows the reading heatmap.
    #[serde(default)]
    pub heatmap_block_id: Option<String>,
}

/// WeRead connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeReadConfig {
    #[serde(default)]
    pub cookie: String,
    #[serde(default = "default_weread_base_url")]
    pub base_url: String,
    #[serde(default = "default_weread_api_base_url")]
    pub api_base_url: String,
}

/// Heatmap image location and URL context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapConfig {
    #[serde(default = "default_out_folder")]
    pub out_folder: PathBuf,
    #[serde(default = "default_heatmap_service_url")]
    pub service_url: String,
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,
    /// `owner/name` of the repository that hosts the image.
    #[serde(default)]
    pub repository: Option<String>,
    /// Git ref, either a bare branch name or `refs/heads/<branch>`.
    #[serde(default)]
    pub git_ref: Option<String>,
}

/// ISBN catalog lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name of the WeRead shelf archive that scopes the sync.
    #[serde(default = "default_shelf_name")]
    pub shelf_name: String,
    /// UTC offset of the shelf timezone, in hours.
    #[serde(default = "default_timezone_offset_hours")]
    pub timezone_offset_hours: i32,
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub weread: WeReadConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

// Default functions
fn default_shelf_name() -> String {
    "ll的书架".into()
}
fn default_timezone_offset_hours() -> i32 {
    8
}
fn default_notion_base_url() -> String {
    "https://api.notion.com/v1/".into()
}
fn default_weread_base_url() -> String {
    "https://weread.qq.com/".into()
}
fn default_weread_api_base_url() -> String {
    "https://i.weread.qq.com/".into()
}
fn default_out_folder() -> PathBuf {
    PathBuf::from("./OUT_FOLDER")
}
fn default_heatmap_service_url() -> String {
    "https://heatmap.malinkang.com/".into()
}
fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".into()
}
fn default_catalog_base_url() -> String {
    "https://neodb.social/api/catalog/search".into()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    5000
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_notion_base_url(),
            book_database_id: String::new(),
            read_database_id: String::new(),
            daily_database_id: String::new(),
            author_database_id: String::new(),
            category_database_id: String::new(),
            year_database_id: None,
            month_database_id: None,
            week_database_id: None,
            date_database_id: None,
            heatmap_block_id: None,
        }
    }
}

impl Default for WeReadConfig {
    fn default() -> Self {
        Self {
            cookie: String::new(),
            base_url: default_weread_base_url(),
            api_base_url: default_weread_api_base_url(),
        }
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            out_folder: default_out_folder(),
            service_url: default_heatmap_service_url(),
            raw_base_url: default_raw_base_url(),
            repository: None,
            git_ref: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shelf_name: default_shelf_name(),
            timezone_offset_hours: default_timezone_offset_hours(),
            notion: NotionConfig::default(),
            weread: WeReadConfig::default(),
            heatmap: HeatmapConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

/// Which entry point a config is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Book metadata pass plus per-book reading days.
    Books,
    /// Heatmap update plus aggregate daily pass.
    ReadTime,
}

impl Config {
    /// Default config location (`~/.config/readsync/config.toml`), if it exists.
    pub fn find_config_file() -> Option<PathBuf> {
        let path = dirs::home_dir()?
            .join(".config")
            .join("readsync")
            .join("config.toml");
        path.exists().then_some(path)
    }

    /// Parse a config file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve config from an explicit path or the default location, then
    /// apply process environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path
            .map(Path::to_path_buf)
            .or_else(Self::find_config_file)
        {
            Some(p) => Self::load(&p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from environment-style lookups. Unset or empty
    /// variables leave the current value untouched.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("NOTION_TOKEN") {
            self.notion.token = v;
        }
        if let Some(v) = get("WEREAD_COOKIE") {
            self.weread.cookie = v;
        }
        if let Some(v) = get("READSYNC_SHELF") {
            self.shelf_name = v;
        }
        if let Some(v) = get("READSYNC_TZ_OFFSET") {
            self.timezone_offset_hours =
                v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "READSYNC_TZ_OFFSET".to_string(),
                    message: format!("cannot parse '{v}' as hours"),
                })?;
        }
        if let Some(v) = get("NOTION_BOOK_DATABASE_ID") {
            self.notion.book_database_id = v;
        }
        if let Some(v) = get("NOTION_READ_DATABASE_ID") {
            self.notion.read_database_id = v;
        }
        if let Some(v) = get("NOTION_DAILY_DATABASE_ID") {
            self.notion.daily_database_id = v;
        }
        if let Some(v) = get("NOTION_AUTHOR_DATABASE_ID") {
            self.notion.author_database_id = v;
        }
        if let Some(v) = get("NOTION_CATEGORY_DATABASE_ID") {
            self.notion.category_database_id = v;
        }
        if let Some(v) = get("NOTION_YEAR_DATABASE_ID") {
            self.notion.year_database_id = Some(v);
        }
        if let Some(v) = get("NOTION_MONTH_DATABASE_ID") {
            self.notion.month_database_id = Some(v);
        }
        if let Some(v) = get("NOTION_WEEK_DATABASE_ID") {
            self.notion.week_database_id = Some(v);
        }
        if let Some(v) = get("NOTION_DATE_DATABASE_ID") {
            self.notion.date_database_id = Some(v);
        }
        if let Some(v) = get("HEATMAP_BLOCK_ID") {
            self.notion.heatmap_block_id = Some(v);
        }
        if let Some(v) = get("READSYNC_OUT_FOLDER") {
            self.heatmap.out_folder = PathBuf::from(v);
        }
        if let Some(v) = get("REPOSITORY") {
            self.heatmap.repository = Some(v);
        }
        if let Some(v) = get("REF") {
            self.heatmap.git_ref = Some(v);
        }
        Ok(())
    }

    /// Check that every key the given entry point needs is present.
    pub fn validate(&self, kind: RunKind) -> Result<(), ConfigError> {
        let mut required = vec![
            ("notion.token", self.notion.token.as_str()),
            ("weread.cookie", self.weread.cookie.as_str()),
        ];
        match kind {
            RunKind::Books => {
                required.extend([
                    ("notion.book_database_id", self.notion.book_database_id.as_str()),
                    ("notion.read_database_id", self.notion.read_database_id.as_str()),
                    ("notion.author_database_id", self.notion.author_database_id.as_str()),
                    (
                        "notion.category_database_id",
                        self.notion.category_database_id.as_str(),
                    ),
                ]);
            }
            RunKind::ReadTime => {
                required.push((
                    "notion.daily_database_id",
                    self.notion.daily_database_id.as_str(),
                ));
            }
        }

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingKey(key.to_string()));
            }
        }

        if !(-12..=14).contains(&self.timezone_offset_hours) {
            return Err(ConfigError::InvalidValue {
                key: "timezone_offset_hours".to_string(),
                message: format!("{} is outside -12..=14", self.timezone_offset_hours),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_tracked_shelf() {
        let config = Config::default();
        assert_eq!(config.shelf_name, "ll的书架");
        assert_eq!(config.timezone_offset_hours, 8);
        assert_eq!(config.catalog.max_attempts, 3);
        assert_eq!(config.catalog.retry_delay_ms, 5000);
        assert_eq!(config.heatmap.out_folder, PathBuf::from("./OUT_FOLDER"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            shelf_name = "Fiction"

            [notion]
            token = "secret"
            book_database_id = "books"
            "#,
        )
        .unwrap();
        assert_eq!(config.shelf_name, "Fiction");
        assert_eq!(config.notion.token, "secret");
        assert_eq!(config.notion.base_url, "https://api.notion.com/v1/");
        assert_eq!(config.weread.base_url, "https://weread.qq.com/");
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = Config::from_toml("shelf_name = [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timezone_offset_hours = 9\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timezone_offset_hours, 9);

        let missing = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::LoadFailed { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config.notion.token = "from-file".to_string();
        config
            .apply_env(env(&[
                ("NOTION_TOKEN", "from-env"),
                ("WEREAD_COOKIE", "wr_vid=1"),
                ("HEATMAP_BLOCK_ID", "block-1"),
                ("REF", "refs/heads/main"),
                ("READSYNC_SHELF", ""),
            ]))
            .unwrap();

        assert_eq!(config.notion.token, "from-env");
        assert_eq!(config.weread.cookie, "wr_vid=1");
        assert_eq!(config.notion.heatmap_block_id.as_deref(), Some("block-1"));
        assert_eq!(config.heatmap.git_ref.as_deref(), Some("refs/heads/main"));
        // Empty values do not clobber.
        assert_eq!(config.shelf_name, "ll的书架");
    }

    #[test]
    fn env_rejects_bad_offset() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("READSYNC_TZ_OFFSET", "eight")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn validate_reports_first_missing_key() {
        let mut config = Config::default();
        let err = config.validate(RunKind::Books).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref k) if k == "notion.token"));

        config.notion.token = "t".into();
        config.weread.cookie = "c".into();
        let err = config.validate(RunKind::ReadTime).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(ref k) if k == "notion.daily_database_id"));

        config.notion.daily_database_id = "daily".into();
        assert!(config.validate(RunKind::ReadTime).is_ok());
        assert!(config.validate(RunKind::Books).is_err());
    }
}
