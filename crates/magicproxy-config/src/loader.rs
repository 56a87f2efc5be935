//! Config file loading and layering.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file, if one was given
//! 3. Apply `MAGICPROXY_*` environment overrides
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration from defaults, an optional file, and the process
/// environment.
///
/// An explicitly named file must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is unreadable or malformed, an
/// environment override is unparseable, or the result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Same as [`load`] with an explicit environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(path: Option<&Path>, env: &HashMap<String, String>) -> ConfigResult<Config> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    // 2. Config file.
    if let Some(path) = path {
        let overlay = read_file(path)?;
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
    }

    // 3. Environment overrides.
    let env_count = apply_env_overrides(&mut merged, env)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment overrides");
    }

    // 4. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 5. Validate.
    validate::validate(&config)?;
    Ok(config)
}

/// Load a config from a single file over the defaults, ignoring the environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    load_with_env(Some(path), &HashMap::new())
}

/// Read and parse a TOML file, enforcing the size limit.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("magicproxy.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.upstream.base_url, "https://api.github.com");
        assert_eq!(config.token.query_param, "key");
        assert_eq!(config.token.clock_skew_secs, 0);
    }

    #[test]
    fn test_load_without_file() {
        let config = load_with_env(None, &HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"
            [server]
            port = 9000

            [sanitize]
            query_params = ["access_token"]
            "#,
        );
        let config = load_file(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.sanitize.query_params, vec!["access_token".to_owned()]);
    }

    #[test]
    fn test_env_beats_file() {
        let (_dir, path) = write_config("[server]\nport = 9000\n");
        let env: HashMap<String, String> = [
            ("MAGICPROXY_SERVER_PORT".to_owned(), "7000".to_owned()),
            ("MAGICPROXY_TOKEN_CLOCK_SKEW_SECS".to_owned(), "30".to_owned()),
        ]
        .into_iter()
        .collect();

        let config = load_with_env(Some(&path), &env).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.token.clock_skew_secs, 30);
    }

    #[test]
    fn test_env_out_of_range_port() {
        let env: HashMap<String, String> =
            [("MAGICPROXY_SERVER_PORT".to_owned(), "70000".to_owned())]
                .into_iter()
                .collect();
        let result = load_with_env(None, &env);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/magicproxy.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let (_dir, path) = write_config("[servr]\nport = 1\n");
        let result = load_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_validation_runs_after_merge() {
        let (_dir, path) = write_config("[logging]\nlevel = \"loud\"\n");
        let result = load_file(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_oversized_config_rejected() {
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        let (_dir, path) = write_config(&data);

        let result = read_file(&path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "Expected ValidationError for oversized config, got: {result:?}"
        );
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut base: toml::Value = toml::from_str("a = [1, 2]\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("a = [3]\n[t]\ny = 5\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["a"].as_array().unwrap().len(), 1);
        assert_eq!(base["t"]["x"].as_integer(), Some(1));
        assert_eq!(base["t"]["y"].as_integer(), Some(5));
    }
}
