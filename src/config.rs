//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--base-url`, `--api-key`, `--max-files`, etc.)
//! 2. `--config` file
//! 3. `$RFX_API_KEY` environment variable (API key only)
//! 4. `$RFX_CONFIG` environment variable (path to config file)
//! 5. Project-local `.rfx.toml` in the current working directory
//! 6. Global `~/.config/rfx/config.toml`
//! 7. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::explorer::accumulator::{DEFAULT_MAX_STALLED_FETCHES, MAX_FILES};
use crate::remote::client::DEFAULT_TIMEOUT_SECS;
use crate::remote::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS};
use crate::remote::{RetryPolicy, ServiceConfig};

// ── Section configs ──────────────────────────────────────────────────────────

/// Backend location and credentials.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Origin serving `/api/file` and `/api/cdn`.
    pub base_url: Option<String>,
    /// Value of the `X-API-Key` header.
    pub api_key: Option<String>,
}

/// Transport retry and timeout settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TransportConfig {
    /// Retries after the first failed attempt.
    pub max_retries: Option<u32>,
    /// Base delay; retry `n` waits `n` times this.
    pub retry_base_delay_ms: Option<u64>,
    /// Per-request timeout.
    pub timeout_secs: Option<u64>,
}

/// Accumulation loop settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// Number of files to collect before the tree is shown.
    pub max_files: Option<usize>,
    /// Consecutive invalid or duplicate responses tolerated (0 = unlimited).
    pub max_stalled_fetches: Option<u32>,
}

/// Tree panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Use nerd font icons (false = ASCII fallback).
    pub use_icons: Option<bool>,
    /// Open every folder when the tree is first shown.
    pub expand_all: Option<bool>,
}

/// Preview panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PreviewConfig {
    /// Whether the preview panel is enabled.
    pub enabled: Option<bool>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. `"info"` or `"rfx=debug"`.
    pub level: Option<String>,
    /// Log file used while the terminal UI is running.
    pub file: Option<PathBuf>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub tree_selected_fg: Option<String>,
    pub tree_dir_fg: Option<String>,
    pub tree_file_fg: Option<String>,
    pub preview_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub accumulator: AccumulatorConfig,
    pub tree: TreeConfig,
    pub preview: PreviewConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Backend origin used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Environment variable overriding the API key.
pub const API_KEY_ENV: &str = "RFX_API_KEY";
/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "RFX_CONFIG";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that one is applied separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".rfx.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("rfx").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: other.server.base_url.clone().or(self.server.base_url),
                api_key: other.server.api_key.clone().or(self.server.api_key),
            },
            transport: TransportConfig {
                max_retries: other.transport.max_retries.or(self.transport.max_retries),
                retry_base_delay_ms: other
                    .transport
                    .retry_base_delay_ms
                    .or(self.transport.retry_base_delay_ms),
                timeout_secs: other.transport.timeout_secs.or(self.transport.timeout_secs),
            },
            accumulator: AccumulatorConfig {
                max_files: other.accumulator.max_files.or(self.accumulator.max_files),
                max_stalled_fetches: other
                    .accumulator
                    .max_stalled_fetches
                    .or(self.accumulator.max_stalled_fetches),
            },
            tree: TreeConfig {
                use_icons: other.tree.use_icons.or(self.tree.use_icons),
                expand_all: other.tree.expand_all.or(self.tree.expand_all),
            },
            preview: PreviewConfig {
                enabled: other.preview.enabled.or(self.preview.enabled),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
                file: other.logging.file.clone().or(self.logging.file),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: other.theme.custom.clone().or(self.theme.custom),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.server.api_key = Some(key);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn base_url(&self) -> &str {
        self.server.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn api_key(&self) -> &str {
        self.server.api_key.as_deref().unwrap_or("")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.transport.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            base_delay: Duration::from_millis(
                self.transport
                    .retry_base_delay_ms
                    .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            ),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Everything the HTTP client needs, gathered in one place.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: self.base_url().to_string(),
            api_key: self.api_key().to_string(),
            retry: self.retry_policy(),
            timeout: self.request_timeout(),
        }
    }

    pub fn max_files(&self) -> usize {
        self.accumulator.max_files.unwrap_or(MAX_FILES)
    }

    pub fn max_stalled_fetches(&self) -> u32 {
        self.accumulator
            .max_stalled_fetches
            .unwrap_or(DEFAULT_MAX_STALLED_FETCHES)
    }

    /// Whether to use nerd font icons.
    pub fn use_icons(&self) -> bool {
        self.tree.use_icons.unwrap_or(true)
    }

    pub fn expand_all(&self) -> bool {
        self.tree.expand_all.unwrap_or(true)
    }

    /// Whether the preview panel is enabled.
    pub fn preview_enabled(&self) -> bool {
        self.preview.enabled.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or("info")
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.base_url(), "http://localhost:8000");
        assert_eq!(cfg.api_key(), "");
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_files(), 30);
        assert_eq!(cfg.max_stalled_fetches(), 100);
        assert!(cfg.use_icons());
        assert!(cfg.expand_all());
        assert!(cfg.preview_enabled());
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[server]
base_url = "https://files.example.com"
api_key = "abc"

[transport]
max_retries = 5
retry_base_delay_ms = 250
timeout_secs = 10

[accumulator]
max_files = 12
max_stalled_fetches = 0

[tree]
use_icons = false
expand_all = false

[preview]
enabled = false

[logging]
level = "debug"
file = "/tmp/rfx.log"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.base_url(), "https://files.example.com");
        assert_eq!(cfg.api_key(), "abc");
        assert_eq!(
            cfg.retry_policy(),
            RetryPolicy {
                max_retries: 5,
                base_delay: Duration::from_millis(250),
            }
        );
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.max_files(), 12);
        assert_eq!(cfg.max_stalled_fetches(), 0);
        assert!(!cfg.use_icons());
        assert!(!cfg.expand_all());
        assert!(!cfg.preview_enabled());
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.logging.file.as_deref(), Some(Path::new("/tmp/rfx.log")));
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let cfg: AppConfig = toml::from_str("[server]\napi_key = \"k\"\n").expect("parse failed");
        assert_eq!(cfg.api_key(), "k");
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.max_files(), 30);
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert_eq!(cfg.max_files(), 30);
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            server: ServerConfig {
                base_url: Some("http://a".into()),
                api_key: Some("base-key".into()),
            },
            accumulator: AccumulatorConfig {
                max_files: Some(10),
                max_stalled_fetches: Some(5),
            },
            ..Default::default()
        };
        let over = AppConfig {
            server: ServerConfig {
                base_url: Some("http://b".into()),
                ..Default::default()
            },
            accumulator: AccumulatorConfig {
                max_files: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert_eq!(merged.base_url(), "http://b");
        assert_eq!(merged.api_key(), "base-key");
        assert_eq!(merged.max_files(), 20);
        assert_eq!(merged.max_stalled_fetches(), 5);
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            transport: TransportConfig {
                max_retries: Some(1),
                retry_base_delay_ms: Some(10),
                timeout_secs: None,
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.retry_policy().max_retries, 1);
        assert_eq!(merged.retry_policy().base_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[server]
base_url = "http://backend:9000"

[tree]
use_icons = false
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.base_url(), "http://backend:9000");
        assert!(!cfg.use_icons());
        assert_eq!(cfg.max_files(), 30);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[server]
base_url = "http://from-file"

[accumulator]
max_files = 7
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            accumulator: AccumulatorConfig {
                max_files: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.max_files(), 3);
        assert_eq!(cfg.base_url(), "http://from-file");
    }

    /// Set or clear an environment variable, returning its previous value.
    fn swap_env(name: &str, value: Option<&str>) -> Option<String> {
        let previous = std::env::var(name).ok();
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
        previous
    }

    #[test]
    fn test_api_key_env_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let discovered = dir.path().join("discovered.toml");
        std::fs::write(&discovered, "[server]\napi_key = \"from-discovered\"\n").expect("write");
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&explicit, "[server]\napi_key = \"from-config-flag\"\n").expect("write");

        let old_config = swap_env(CONFIG_ENV, discovered.to_str());
        let old_key = swap_env(API_KEY_ENV, None);

        let from_files = AppConfig::load(None, None);
        swap_env(API_KEY_ENV, Some("from-env"));
        let from_env = AppConfig::load(None, None);
        let from_config_flag = AppConfig::load(Some(&explicit), None);
        let cli = AppConfig {
            server: ServerConfig {
                api_key: Some("from-cli".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let from_cli = AppConfig::load(Some(&explicit), Some(&cli));

        swap_env(CONFIG_ENV, old_config.as_deref());
        swap_env(API_KEY_ENV, old_key.as_deref());

        assert_eq!(from_files.api_key(), "from-discovered");
        assert_eq!(from_env.api_key(), "from-env");
        assert_eq!(from_config_flag.api_key(), "from-config-flag");
        assert_eq!(from_cli.api_key(), "from-cli");
    }

    #[test]
    fn test_service_config_collects_transport_settings() {
        let cfg: AppConfig = toml::from_str(
            r#"
[server]
base_url = "http://x"
api_key = "t"

[transport]
max_retries = 2
"#,
        )
        .expect("parse");
        let svc = cfg.service_config();
        assert_eq!(svc.base_url, "http://x");
        assert_eq!(svc.api_key, "t");
        assert_eq!(svc.retry.max_retries, 2);
        assert_eq!(svc.retry.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_theme_custom_colors() {
        let toml = r##"
[theme]
scheme = "custom"

[theme.custom]
tree_fg = "#c0caf5"
border_fg = "#565f89"
"##;
        let cfg: AppConfig = toml::from_str(toml).expect("parse");
        assert_eq!(cfg.theme_scheme(), "custom");
        let custom = cfg.theme.custom.as_ref().expect("custom present");
        assert_eq!(custom.tree_fg.as_deref(), Some("#c0caf5"));
        assert_eq!(custom.border_fg.as_deref(), Some("#565f89"));
        assert!(custom.status_bg.is_none());
    }
}
