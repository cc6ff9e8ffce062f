//! Layered configuration: merge the process environment, a project `.env`, and the
//! `[env]` table of `$XDG_CONFIG_HOME/<app>/config.toml` into one key/value map.
//!
//! Priority per key: **process env > .env > XDG**. The process environment is only read,
//! never written, so callers can resolve several times (or in parallel tests) without
//! side effects.

mod dotenv;
mod xdg_toml;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub use dotenv::parse_dotenv;
pub use xdg_toml::{config_file, default_config_home};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse xdg toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("[env].{key} must be a string, number or boolean, got {kind}")]
    NotScalar { key: String, kind: String },
}

/// Where a resolved value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Env,
    Dotenv,
    Xdg,
}

/// Inputs to [`resolve`]. `None` skips that layer.
#[derive(Clone, Debug, Default)]
pub struct Sources {
    /// Base directory holding `<app>/config.toml`.
    pub config_home: Option<PathBuf>,
    /// Directory holding `.env`.
    pub dotenv_dir: Option<PathBuf>,
}

impl Sources {
    /// XDG config home from the environment and `.env` from `dotenv_dir` or the current
    /// directory.
    pub fn discover(dotenv_dir: Option<&Path>) -> Self {
        Self {
            config_home: default_config_home(),
            dotenv_dir: dotenv_dir
                .map(Path::to_path_buf)
                .or_else(|| std::env::current_dir().ok()),
        }
    }
}

/// Merged key/value map plus the layer each key was taken from.
#[derive(Clone, Debug, Default)]
pub struct Resolved {
    pub values: HashMap<String, String>,
    pub origins: HashMap<String, Source>,
}

impl Resolved {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn origin(&self, key: &str) -> Option<Source> {
        self.origins.get(key).copied()
    }

    fn insert_if_absent(&mut self, key: String, value: String, source: Source) {
        if !self.values.contains_key(&key) {
            self.origins.insert(key.clone(), source);
            self.values.insert(key, value);
        }
    }
}

/// Merges `env`, `.env` and XDG, keeping only keys that start with `prefix`.
///
/// `env` is passed in so the process environment stays a caller decision
/// (`std::env::vars()` in production, a fixed list in tests).
pub fn resolve<I>(
    app_name: &str,
    prefix: &str,
    sources: &Sources,
    env: I,
) -> Result<Resolved, LoadError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let dotenv_map = match &sources.dotenv_dir {
        Some(dir) => dotenv::load_env_map(dir)?,
        None => HashMap::new(),
    };
    let xdg_map = match &sources.config_home {
        Some(home) => xdg_toml::load_env_map(home, app_name)?,
        None => HashMap::new(),
    };

    let mut out = Resolved::default();
    let layers = [
        (Source::Env, env.into_iter().collect::<Vec<_>>()),
        (Source::Dotenv, dotenv_map.into_iter().collect()),
        (Source::Xdg, xdg_map.into_iter().collect()),
    ];
    for (source, pairs) in layers {
        for (k, v) in pairs {
            if k.starts_with(prefix) {
                out.insert_if_absent(k, v, source);
            }
        }
    }
    Ok(out)
}

/// [`resolve`] over the real process environment and discovered sources.
pub fn load(
    app_name: &str,
    prefix: &str,
    dotenv_dir: Option<&Path>,
) -> Result<Resolved, LoadError> {
    resolve(app_name, prefix, &Sources::discover(dotenv_dir), std::env::vars())
}
