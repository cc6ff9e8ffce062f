//! `[env]` table of `<config_home>/<app>/config.toml`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `$XDG_CONFIG_HOME` when set and non-empty, else the platform config dir.
pub fn default_config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

/// `<config_home>/<app_name>/config.toml`.
pub fn config_file(config_home: &Path, app_name: &str) -> PathBuf {
    config_home.join(app_name).join("config.toml")
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, toml::Value>,
}

/// Scalar TOML values as env strings: `block = 500` and `block = "500"` read the same.
fn scalar(key: &str, value: toml::Value) -> Result<String, LoadError> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(LoadError::NotScalar {
            key: key.to_string(),
            kind: other.type_str().to_string(),
        }),
    }
}

/// Key/value pairs of the `[env]` table. A missing file or section yields an empty map.
pub fn load_env_map(
    config_home: &Path,
    app_name: &str,
) -> Result<HashMap<String, String>, LoadError> {
    let path = config_file(config_home, app_name);
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&content)?;
    file.env
        .into_iter()
        .map(|(k, v)| scalar(&k, v).map(|s| (k, s)))
        .collect()
}
