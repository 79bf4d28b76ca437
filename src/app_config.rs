//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use episode_dl::download::DispatchMode;
use episode_dl::download::throttle::{RECOMMENDED_MAX_INTERVAL, RECOMMENDED_MIN_INTERVAL};
use episode_dl::settings::{Quality, Settings};

const APP_DIR: &str = "episode-dl";
const CONFIG_FILE: &str = "config.toml";
const PINS_DB_FILE: &str = "pins.db";

/// Key = value file configuration for episode-dl defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default quality label.
    pub quality: Option<Quality>,
    /// Default site mirror.
    pub base_url: Option<String>,
    /// Default dispatch mode.
    pub mode: Option<DispatchMode>,
    /// Delay between episodes in milliseconds.
    pub request_interval_ms: Option<u64>,
    /// Root directory for local downloads.
    pub output_dir: Option<PathBuf>,
    /// Folder created under the output directory.
    pub container: Option<String>,
    /// Pinned list database path.
    pub pins_db: Option<PathBuf>,
    /// Optional resolver client connect timeout in seconds.
    pub resolver_connect_timeout_secs: Option<u64>,
    /// Optional resolver client read timeout in seconds.
    pub resolver_read_timeout_secs: Option<u64>,
    /// Optional download client connect timeout in seconds.
    pub download_connect_timeout_secs: Option<u64>,
    /// Optional download client read timeout in seconds.
    pub download_read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(interval) = self.request_interval_ms
            && interval > 60_000
        {
            bail!(
                "Invalid config value for `request_interval_ms`: {interval}. Expected range: 0..=60000"
            );
        }
        if let Some(base_url) = &self.base_url
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            bail!("Invalid config value for `base_url`: '{base_url}'. Expected an http(s) URL");
        }
        validate_timeout_secs(
            "resolver_connect_timeout_secs",
            self.resolver_connect_timeout_secs,
        )?;
        validate_timeout_secs("resolver_read_timeout_secs", self.resolver_read_timeout_secs)?;
        validate_timeout_secs(
            "download_connect_timeout_secs",
            self.download_connect_timeout_secs,
        )?;
        validate_timeout_secs("download_read_timeout_secs", self.download_read_timeout_secs)?;

        Ok(())
    }

    /// Returns true if an interval is set outside the recommended 2-5s range.
    #[must_use]
    pub fn interval_outside_recommended(&self) -> bool {
        self.request_interval_ms.is_some_and(|ms| {
            !(RECOMMENDED_MIN_INTERVAL..=RECOMMENDED_MAX_INTERVAL)
                .contains(&Duration::from_millis(ms))
        })
    }

    /// Overlays the file values onto `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(quality) = self.quality {
            settings.quality = quality;
        }
        if let Some(base_url) = &self.base_url {
            settings.base_url.clone_from(base_url);
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(ms) = self.request_interval_ms {
            settings.request_interval = Duration::from_millis(ms);
        }
        if let Some(output_dir) = &self.output_dir {
            settings.output_dir.clone_from(output_dir);
        }
        if let Some(container) = &self.container {
            settings.container.clone_from(container);
        }
        if let Some(secs) = self.resolver_connect_timeout_secs {
            settings.resolver_timeouts.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.resolver_read_timeout_secs {
            settings.resolver_timeouts.read_timeout_secs = secs;
        }
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Returns the parsed config, or an empty one.
    #[must_use]
    pub fn file_config(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Resolves the application config directory.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/episode-dl`
/// 2. `$HOME/.config/episode-dl`
#[must_use]
pub fn resolve_config_dir() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(PathBuf::from(home).join(".config").join(APP_DIR))
}

/// Resolves the default config file path.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    resolve_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Resolves the pinned list database path: config value, else `<config dir>/pins.db`,
/// else `./pins.db`.
#[must_use]
pub fn resolve_pins_db_path(config: &FileConfig) -> PathBuf {
    if let Some(path) = &config.pins_db {
        return path.clone();
    }
    resolve_config_dir().map_or_else(|| PathBuf::from(PINS_DB_FILE), |dir| dir.join(PINS_DB_FILE))
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` if given (must exist), otherwise from the
/// default path if present.
pub fn load_file_config_from(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        match key {
            "quality" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `quality` value on line {line_no}"))?;
                let quality = parsed
                    .parse::<Quality>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid `quality` value on line {line_no}"))?;
                cfg.quality = Some(quality);
            }
            "base_url" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `base_url` value on line {line_no}"))?;
                cfg.base_url = Some(parsed);
            }
            "mode" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `mode` value on line {line_no}"))?;
                let mode = parsed
                    .parse::<DispatchMode>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid `mode` value on line {line_no}"))?;
                cfg.mode = Some(mode);
            }
            "request_interval_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `request_interval_ms` value on line {line_no}")
                })?;
                cfg.request_interval_ms = Some(parsed);
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "container" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `container` value on line {line_no}"))?;
                cfg.container = Some(parsed);
            }
            "pins_db" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `pins_db` value on line {line_no}"))?;
                cfg.pins_db = Some(PathBuf::from(parsed));
            }
            "resolver_connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `resolver_connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.resolver_connect_timeout_secs = Some(parsed);
            }
            "resolver_read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `resolver_read_timeout_secs` value on line {line_no}")
                })?;
                cfg.resolver_read_timeout_secs = Some(parsed);
            }
            "download_connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `download_connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.download_connect_timeout_secs = Some(parsed);
            }
            "download_read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `download_read_timeout_secs` value on line {line_no}")
                })?;
                cfg.download_read_timeout_secs = Some(parsed);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
quality = "720p"
mode = "external"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.quality, Some(Quality::P720));
        assert_eq!(cfg.mode, Some(DispatchMode::External));
        assert!(cfg.output_dir.is_none());
    }

    #[test]
    fn test_parse_config_accepts_browser_mode_alias() {
        let cfg = parse_config_str(r#"mode = "browser""#).expect("browser alias should parse");
        assert_eq!(cfg.mode, Some(DispatchMode::Local));
    }

    #[test]
    fn test_parse_config_rejects_unknown_quality() {
        let err = parse_config_str(r#"quality = "4k""#).expect_err("invalid quality expected");
        assert!(format!("{err:#}").contains("quality"));
    }

    #[test]
    fn test_parse_config_rejects_interval_over_max() {
        let err = parse_config_str("request_interval_ms = 60001")
            .expect_err("invalid interval expected");
        assert!(err.to_string().contains("request_interval_ms"));
    }

    #[test]
    fn test_interval_outside_recommended() {
        let fast = parse_config_str("request_interval_ms = 500").expect("should parse");
        assert!(fast.interval_outside_recommended());
        let ok = parse_config_str("request_interval_ms = 3000").expect("should parse");
        assert!(!ok.interval_outside_recommended());
        assert!(!FileConfig::default().interval_outside_recommended());
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
request_interval_ms = 2500 # be polite
container = "Anime # Collection" # hash inside string is kept
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.request_interval_ms, Some(2500));
        assert_eq!(cfg.container.as_deref(), Some("Anime # Collection"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout_value() {
        let err = parse_config_str("resolver_connect_timeout_secs = 0")
            .expect_err("invalid timeout expected");
        assert!(err.to_string().contains("resolver_connect_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_non_http_base_url() {
        let err = parse_config_str(r#"base_url = "ftp://9anime.to""#)
            .expect_err("invalid base url expected");
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_apply_to_overrides_only_set_fields() {
        let cfg = parse_config_str(
            r#"
quality = "1080p"
request_interval_ms = 2000
resolver_read_timeout_secs = 60
"#,
        )
        .expect("should parse");
        let mut settings = Settings::default();
        cfg.apply_to(&mut settings);
        assert_eq!(settings.quality, Quality::P1080);
        assert_eq!(settings.request_interval, Duration::from_millis(2000));
        assert_eq!(settings.resolver_timeouts.read_timeout_secs, 60);
        assert_eq!(settings.base_url, "https://9anime.to");
    }

    #[test]
    fn test_resolve_pins_db_prefers_config_value() {
        let cfg = FileConfig {
            pins_db: Some(PathBuf::from("/tmp/custom.db")),
            ..FileConfig::default()
        };
        assert_eq!(resolve_pins_db_path(&cfg), PathBuf::from("/tmp/custom.db"));
    }
}
