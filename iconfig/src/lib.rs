
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use toml::Value;

use lazydi::Container;

/// Files merged by [`load`], lowest priority first.
pub const DEFAULT_LAYERS: [&str; 3] = [
    "/etc/lazydi/config.toml",
    "config/config.toml",
    "./config.toml",
];

/// A flexible configuration container that can hold any valid TOML data
/// and supports merging configurations.
///
/// # Examples
///
/// ```
/// use iconfig::ApplicationConfig;
///
/// let mut base: ApplicationConfig = r#"
///     [server]
///     host = "localhost"
///     port = 8080
/// "#.parse().unwrap();
///
/// let overlay: ApplicationConfig = r#"
///     [server]
///     port = 9090
///     [database]
///     url = "postgres://localhost"
/// "#.parse().unwrap();
///
/// base.merge(overlay);
///
/// assert_eq!(base.get("server.host").unwrap().as_str(), Some("localhost"));
/// assert_eq!(base.get("server.port").unwrap().as_integer(), Some(9090));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(flatten)]
    value: Value,
}

impl fmt::Display for ApplicationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            value: Value::Table(toml::Table::new()),
        }
    }
}

impl FromStr for ApplicationConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = toml::from_str(s)?;
        Ok(Self { value })
    }
}

impl ApplicationConfig {
    pub fn from_file<P: AsRef<Path>>(fname: P) -> Result<Self, anyhow::Error> {
        let path = fname.as_ref();
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        config
            .parse()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Merge another config into this one
    ///
    /// This performs a deep merge where:
    /// - Tables are merged recursively
    /// - Arrays are concatenated
    /// - Other values are overwritten by the new config
    pub fn merge(&mut self, other: Self) {
        merge_values(&mut self.value, other.value);
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Get a value by dotted path (e.g., "server.port")
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.value, |current, part| current.get(part))
    }

    /// Deserialize the section at `prefix`; an empty prefix means the whole document.
    pub fn section<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, anyhow::Error> {
        let part = if prefix.is_empty() {
            &self.value
        } else {
            self.get(prefix)
                .with_context(|| format!("no config found for {}", prefix))?
        };
        part.clone()
            .try_into()
            .with_context(|| format!("invalid config section '{}'", prefix))
    }

    pub fn to_json(&self) -> Result<String, anyhow::Error> {
        serde_json::to_string(self).context("failed to convert config to json")
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay),
        (base, overlay) => *base = overlay,
    }
}

/// Merge every existing file of `paths` in order. Missing files are skipped;
/// a file that exists but does not parse is an error.
pub fn load_layers<I, P>(paths: I) -> Result<ApplicationConfig, anyhow::Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut merged: Option<ApplicationConfig> = None;
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            continue;
        }
        let layer = ApplicationConfig::from_file(path)?;
        match merged.as_mut() {
            Some(config) => config.merge(layer),
            None => merged = Some(layer),
        }
    }
    merged.ok_or_else(|| anyhow::anyhow!("No config file found"))
}

pub fn load() -> Result<ApplicationConfig, anyhow::Error> {
    load_layers(DEFAULT_LAYERS)
}

/// Register the whole config as `Arc<ApplicationConfig>`.
pub fn provide_config(container: &Container<'_>, config: ApplicationConfig) -> Result<(), anyhow::Error> {
    container
        .provide_value(Arc::new(config))
        .context("failed to provide application config")
}

/// Deserialize the section at `prefix` and register it as a value of type `T`.
pub fn provide_section<T>(
    container: &Container<'_>,
    config: &ApplicationConfig,
    prefix: &str,
) -> Result<(), anyhow::Error>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let section: T = config.section(prefix)?;
    container
        .provide_value(section)
        .with_context(|| format!("failed to provide config section '{}'", prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct ServerConfig {
        host: String,
        port: u16,
    }

    #[test]
    fn test_merge_tables() {
        let mut config1: ApplicationConfig = r#"
            [server]
            host = "localhost"
            port = 8080
        "#.parse().unwrap();

        let config2: ApplicationConfig = r#"
            [server]
            port = 9090
            [database]
            url = "postgres://localhost"
        "#.parse().unwrap();

        config1.merge(config2);

        let merged = config1.value();
        assert_eq!(merged["server"]["host"].as_str(), Some("localhost"));
        assert_eq!(merged["server"]["port"].as_integer(), Some(9090));
        assert_eq!(merged["database"]["url"].as_str(), Some("postgres://localhost"));
    }

    #[test]
    fn test_merge_arrays() {
        let mut config1: ApplicationConfig = "items = [1, 2, 3]".parse().unwrap();
        let config2: ApplicationConfig = "items = [4, 5]".parse().unwrap();

        config1.merge(config2);

        let items = config1.value()["items"].as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].as_integer(), Some(1));
        assert_eq!(items[4].as_integer(), Some(5));
    }

    #[test]
    fn test_get_by_path() {
        let config: ApplicationConfig = r#"
            [server]
            host = "localhost"
            port = 8080
        "#.parse().unwrap();

        assert_eq!(config.get("server.host").unwrap().as_str(), Some("localhost"));
        assert_eq!(config.get("server.port").unwrap().as_integer(), Some(8080));
        assert!(config.get("nonexistent.key").is_none());
    }

    #[test]
    fn test_serialization() {
        let config: ApplicationConfig = r#"key = "value""#.parse().unwrap();
        assert_eq!(config.to_json().unwrap(), r#"{"key":"value"}"#);
    }

    #[test]
    fn test_section() {
        let config: ApplicationConfig = r#"
            [server]
            host = "localhost"
            port = 8080
        "#.parse().unwrap();

        let server: ServerConfig = config.section("server").unwrap();
        assert_eq!(server, ServerConfig { host: "localhost".into(), port: 8080 });
        assert!(config.section::<ServerConfig>("database").is_err());
    }

    #[test]
    fn test_load_layers() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.toml");
        let local = dir.path().join("local.toml");
        let missing = dir.path().join("missing.toml");

        let mut file = std::fs::File::create(&base).unwrap();
        writeln!(file, "[server]\nhost = \"localhost\"\nport = 8080").unwrap();
        let mut file = std::fs::File::create(&local).unwrap();
        writeln!(file, "[server]\nport = 9090").unwrap();

        let config = load_layers([&base, &missing, &local]).unwrap();
        assert_eq!(config.get("server.host").unwrap().as_str(), Some("localhost"));
        assert_eq!(config.get("server.port").unwrap().as_integer(), Some(9090));

        assert!(load_layers([&missing]).is_err());
    }

    #[test]
    fn test_load_layers_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not = [valid").unwrap();
        assert!(load_layers([file.path()]).is_err());
    }

    #[test]
    fn test_provide_section() {
        let config: ApplicationConfig = r#"
            [server]
            host = "localhost"
            port = 8080
        "#.parse().unwrap();

        let container = Container::new();
        provide_section::<ServerConfig>(&container, &config, "server").unwrap();
        provide_config(&container, config).unwrap();

        container
            .invoke(|server: ServerConfig, whole: Arc<ApplicationConfig>| {
                assert_eq!(server.port, 8080);
                assert_eq!(whole.get("server.host").unwrap().as_str(), Some("localhost"));
            })
            .unwrap();
    }

    #[test]
    fn test_provide_section_twice_fails() {
        let config: ApplicationConfig = "[server]\nhost = \"a\"\nport = 1".parse().unwrap();
        let container = Container::new();

        provide_section::<ServerConfig>(&container, &config, "server").unwrap();
        assert!(provide_section::<ServerConfig>(&container, &config, "server").is_err());
        assert_eq!(container.len(), 1);
    }
}
