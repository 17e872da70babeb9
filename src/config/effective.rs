//! Effective configuration with provenance
//!
//! The merged configuration plus a record of which layers contributed to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::ClientConfig;
use crate::tail::TailPolicy;

use super::defaults::BuiltinDefaults;
use super::merge::{merge_layers, nest};

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "runlog/effective_config@1";

/// Environment variables and the key paths they set.
pub const ENV_VARS: &[(&str, &str)] = &[
    ("RUNLOG_BASE_URL", "backend.base_url"),
    ("RUNLOG_REQUEST_TIMEOUT_SECONDS", "backend.request_timeout_seconds"),
    ("RUNLOG_POLL_INTERVAL_MS", "tail.poll_interval_ms"),
    ("RUNLOG_MAX_CONSECUTIVE_FAILURES", "tail.max_consecutive_failures"),
];

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (user layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (user layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Key paths this layer set (env and cli layers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl ConfigSource {
    fn new(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
            keys: Vec::new(),
        }
    }
}

/// Effective configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,

    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers.
    ///
    /// A missing user file is skipped; an unreadable or malformed one is an
    /// error.
    pub fn build(
        user_config_path: Option<&Path>,
        env_overrides: Option<Value>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource::new(ConfigOrigin::Builtin));

        // Layer 2: User config file
        if let Some(path) = user_config_path {
            if path.exists() {
                let (value, digest) = load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                    ..ConfigSource::new(ConfigOrigin::User)
                });
            }
        }

        // Layer 3: Environment
        if let Some(env) = env_overrides {
            sources.push(ConfigSource {
                keys: leaf_paths(&env),
                ..ConfigSource::new(ConfigOrigin::Env)
            });
            layers.push(env);
        }

        // Layer 4: CLI flags
        if let Some(cli) = cli_overrides {
            sources.push(ConfigSource {
                keys: leaf_paths(&cli),
                ..ConfigSource::new(ConfigOrigin::Cli)
            });
            layers.push(cli);
        }

        let merged = merge_layers(layers);
        validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    // === Typed views ===

    pub fn base_url(&self) -> &str {
        self.get_str("backend.base_url").unwrap_or("http://127.0.0.1:8000")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("backend.request_timeout_seconds").unwrap_or(10))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url().to_string(),
            request_timeout: self.request_timeout(),
        }
    }

    pub fn tail_policy(&self) -> TailPolicy {
        TailPolicy::from_config(
            self.get_u64("tail.poll_interval_ms"),
            self.get_u64("tail.max_consecutive_failures")
                .and_then(|n| u32::try_from(n).ok()),
        )
    }
}

/// Default user config location: `$XDG_CONFIG_HOME/runlog/config.toml`,
/// falling back to `~/.config/runlog/config.toml`.
pub fn default_user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("runlog").join("config.toml"))
}

/// Build the environment layer from a variable lookup.
///
/// Returns `None` when no `RUNLOG_*` variable is set.
pub fn env_overrides<F>(lookup: F) -> Result<Option<Value>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut layers = Vec::new();

    for (var, path) in ENV_VARS {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        let value = if *path == "backend.base_url" {
            Value::String(raw.to_string())
        } else {
            let n: u64 = raw.parse().map_err(|_| {
                ConfigError::ParseError(format!("{var} must be a non-negative integer, got {raw:?}"))
            })?;
            Value::from(n)
        };
        layers.push(nest(path, value));
    }

    if layers.is_empty() {
        return Ok(None);
    }
    Ok(Some(merge_layers(layers)))
}

/// Environment layer from the process environment.
pub fn process_env_overrides() -> Result<Option<Value>, ConfigError> {
    env_overrides(|var| std::env::var(var).ok())
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

    let table: toml::Table = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    Ok((toml_to_json(toml::Value::Table(table)), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Dotted paths of every non-object value.
fn leaf_paths(value: &Value) -> Vec<String> {
    fn walk(value: &Value, prefix: &str, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(val, &path, out);
                }
            }
            _ => out.push(prefix.to_string()),
        }
    }

    let mut out = Vec::new();
    walk(value, "", &mut out);
    out
}

fn bounded_u64(config: &Value, section: &str, key: &str, min: u64, max: u64) -> Result<(), ConfigError> {
    let Some(value) = config.get(section).and_then(|s| s.get(key)) else {
        return Ok(());
    };
    match value.as_u64() {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        _ => Err(ConfigError::ValidationError(format!(
            "{section}.{key} must be an integer in [{min}, {max}], got {value}"
        ))),
    }
}

/// Validate configuration values
fn validate_config(config: &Value) -> Result<(), ConfigError> {
    // base_url must be an http(s) URL
    if let Some(url) = config.get("backend").and_then(|b| b.get("base_url")) {
        let ok = url
            .as_str()
            .is_some_and(|u| u.starts_with("http://") || u.starts_with("https://"));
        if !ok {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must start with http:// or https://, got {url}"
            )));
        }
    }

    bounded_u64(config, "backend", "request_timeout_seconds", 1, 300)?;
    bounded_u64(config, "tail", "poll_interval_ms", 100, 3_600_000)?;
    bounded_u64(config, "tail", "max_consecutive_failures", 1, 1000)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None, None).unwrap();

        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.base_url(), "http://127.0.0.1:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.tail_policy(), TailPolicy::default());
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_layer_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[backend]").unwrap();
        writeln!(file, "base_url = \"http://from-file:8000\"").unwrap();
        writeln!(file, "request_timeout_seconds = 30").unwrap();
        writeln!(file, "[tail]").unwrap();
        writeln!(file, "poll_interval_ms = 2000").unwrap();
        writeln!(file, "max_consecutive_failures = 9").unwrap();

        let env_layer = env_overrides(env(&[
            ("RUNLOG_BASE_URL", "http://from-env:8000"),
            ("RUNLOG_POLL_INTERVAL_MS", "1000"),
        ]))
        .unwrap();
        let cli = json!({"tail": {"poll_interval_ms": 250}});

        let config = EffectiveConfig::build(Some(file.path()), env_layer, Some(cli)).unwrap();

        assert_eq!(config.base_url(), "http://from-env:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        let policy = config.tail_policy();
        assert_eq!(policy.poll_interval, Duration::from_millis(250));
        assert_eq!(policy.max_consecutive_failures, 9);

        let origins: Vec<_> = config.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![
                ConfigOrigin::Builtin,
                ConfigOrigin::User,
                ConfigOrigin::Env,
                ConfigOrigin::Cli
            ]
        );
        assert_eq!(config.sources[1].digest.as_ref().map(String::len), Some(64));
        assert_eq!(config.sources[3].keys, vec!["tail.poll_interval_ms".to_string()]);
    }

    #[test]
    fn test_missing_user_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = EffectiveConfig::build(Some(&path), None, None).unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_malformed_user_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[tail").unwrap();
        let err = EffectiveConfig::build(Some(file.path()), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_layer_absent_when_unset() {
        assert!(env_overrides(env(&[])).unwrap().is_none());
    }

    #[test]
    fn test_env_layer_rejects_non_numeric() {
        let err = env_overrides(env(&[("RUNLOG_MAX_CONSECUTIVE_FAILURES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("RUNLOG_MAX_CONSECUTIVE_FAILURES"));
    }

    #[test]
    fn test_validation_bounds() {
        let cases = [
            json!({"tail": {"poll_interval_ms": 99}}),
            json!({"tail": {"poll_interval_ms": 3_600_001}}),
            json!({"tail": {"max_consecutive_failures": 0}}),
            json!({"tail": {"max_consecutive_failures": 1001}}),
            json!({"backend": {"request_timeout_seconds": 0}}),
            json!({"backend": {"request_timeout_seconds": 301}}),
            json!({"backend": {"base_url": "ftp://nope"}}),
            json!({"tail": {"poll_interval_ms": "fast"}}),
        ];
        for cli in cases {
            let result = EffectiveConfig::build(None, None, Some(cli.clone()));
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "expected rejection of {cli}"
            );
        }

        let edge = json!({"tail": {"poll_interval_ms": 100, "max_consecutive_failures": 1000}});
        assert!(EffectiveConfig::build(None, None, Some(edge)).is_ok());
    }

    #[test]
    fn test_client_config_view() {
        let cli = json!({"backend": {"base_url": "https://runner.example"}});
        let config = EffectiveConfig::build(None, None, Some(cli)).unwrap();
        let client = config.client_config();
        assert_eq!(client.base_url, "https://runner.example");
        assert_eq!(client.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_to_json_round_trips_sources() {
        let config = EffectiveConfig::build(None, None, None).unwrap();
        let parsed: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed["schema_id"], SCHEMA_ID);
        assert_eq!(parsed["sources"][0]["origin"], "builtin");
        assert_eq!(parsed["config"]["tail"]["poll_interval_ms"], 5000);
    }
}
